use crate::error::SourceLoc;
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    One,      // exactly one
    Optional, // ?
    Star,     // *
    Plus,     // +
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Digit,      // \d
    Word,       // \w
    Whitespace, // \s
}

#[derive(Debug, Clone, Copy)]
pub enum Atom<'a> {
    /// Literal string match: "hello"
    Literal(&'a str),

    /// Character set: [a-z], [^0-9]
    CharSet {
        ranges: &'a [(char, char)], // inclusive ranges
        negated: bool,
    },

    /// Character class: \d, \w, \s
    CharClass(CharClass),

    /// Any single character: .
    Any,

    /// Group with ordered alternation: (a | b | c)
    Group {
        alternatives: &'a [&'a [AtomWithQuant<'a>]],
    },

    /// Reference to another rule by name
    RuleRef(&'a str), // interned
}

#[derive(Debug, Clone, Copy)]
pub struct AtomWithQuant<'a> {
    pub atom: Atom<'a>,
    pub quant: Quantifier,
}

/// A named rule: ordered alternatives of atom sequences.
#[derive(Debug)]
pub struct Rule<'a> {
    pub name: &'a str, // interned
    pub alternatives: &'a [&'a [AtomWithQuant<'a>]],
    pub loc: SourceLoc,
}

/// Rule storage in definition order with O(1) name lookup.
///
/// The first rule added is the start rule.
#[derive(Debug)]
pub struct RuleSet<'a> {
    rules: Vec<&'a Rule<'a>>,
    by_name: HashMap<&'a str, usize>,
}

impl<'a> RuleSet<'a> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Add a rule. Returns false if a rule with the same name exists.
    pub fn add(&mut self, rule: &'a Rule<'a>) -> bool {
        if self.by_name.contains_key(rule.name) {
            return false;
        }
        self.by_name.insert(rule.name, self.rules.len());
        self.rules.push(rule);
        true
    }

    pub fn get(&self, name: &str) -> Option<&'a Rule<'a>> {
        self.by_name.get(name).map(|&i| self.rules[i])
    }

    pub fn start(&self) -> Option<&'a Rule<'a>> {
        self.rules.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Rule<'a>> + '_ {
        self.rules.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> Default for RuleSet<'a> {
    fn default() -> Self {
        Self::new()
    }
}
