//! Reader for grammar source: turns rule definitions into [`Rule`]s.
//!
//! Grammar source is line oriented. Each non-blank, non-comment line defines
//! one rule:
//!
//! ```text
//! name = atoms... | atoms...
//! ```
//!
//! Atoms: `"literal"`, `[a-z0-9]` / `[^...]` charsets, `\d` `\w` `\s`
//! classes, `.` (any character), `( ... )` groups, and references to other
//! rules. Postfix quantifiers `?` `*` `+`. `#` starts a comment.

use bumpalo::Bump;
use pegvm_common::StringInterner;

use crate::error::{ParseError, SourceLoc};
use crate::syntax::{Atom, AtomWithQuant, CharClass, Quantifier, Rule, RuleSet};

/// Parse grammar source into a rule set. The first rule is the start rule.
pub fn parse_grammar<'a>(
    arena: &'a Bump,
    strings: &mut StringInterner<'a>,
    source: &str,
) -> Result<RuleSet<'a>, ParseError> {
    let mut reader = Reader::new(arena, source);
    let mut rules = RuleSet::new();

    loop {
        reader.skip_blank();
        if reader.at_eof() {
            break;
        }

        let loc = reader.loc();
        let name = reader.ident().ok_or_else(|| {
            reader.error_at(loc, "expected rule name".to_string())
        })?;
        let name = strings.intern(name);

        reader.skip_inline_ws();
        if !reader.eat('=') {
            return Err(reader.error("expected `=` after rule name".to_string()));
        }

        let alternatives = reader.alternatives(strings, None)?;

        reader.skip_inline_ws();
        if !reader.at_line_end() {
            return Err(reader.error("unexpected trailing input after rule".to_string()));
        }

        let rule = arena.alloc(Rule {
            name,
            alternatives,
            loc,
        });
        if !rules.add(rule) {
            return Err(reader.error_at(loc, format!("duplicate rule `{}`", name)));
        }
    }

    if rules.is_empty() {
        return Err(ParseError::new(
            "grammar defines no rules".to_string(),
            SourceLoc::new(0, 1, 1),
            source,
        ));
    }

    check_references(&rules, source)?;
    Ok(rules)
}

/// Reject references to rules that were never defined.
fn check_references<'a>(rules: &RuleSet<'a>, source: &str) -> Result<(), ParseError> {
    fn walk<'a>(
        seqs: &[&[AtomWithQuant<'a>]],
        rules: &RuleSet<'a>,
        owner: &Rule<'a>,
        source: &str,
    ) -> Result<(), ParseError> {
        for seq in seqs {
            for aq in *seq {
                match aq.atom {
                    Atom::RuleRef(name) if rules.get(name).is_none() => {
                        return Err(ParseError::new(
                            format!("rule `{}` references undefined rule `{}`", owner.name, name),
                            owner.loc,
                            source,
                        ));
                    }
                    Atom::Group { alternatives } => walk(alternatives, rules, owner, source)?,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    for rule in rules.iter() {
        walk(rule.alternatives, rules, rule, source)?;
    }
    Ok(())
}

struct Reader<'a, 'src> {
    arena: &'a Bump,
    source: &'src str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a, 'src> Reader<'a, 'src> {
    fn new(arena: &'a Bump, source: &'src str) -> Self {
        Self {
            arena,
            source,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.pos as u32, self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// End of the current rule definition: newline, comment, or EOF.
    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some('\n') | Some('#'))
    }

    fn skip_inline_ws(&mut self) {
        while let Some(' ') | Some('\t') = self.peek() {
            self.advance();
        }
    }

    /// Skip whitespace, newlines, and comment lines between rules.
    fn skip_blank(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&self, msg: String) -> ParseError {
        self.error_at(self.loc(), msg)
    }

    fn error_at(&self, loc: SourceLoc, msg: String) -> ParseError {
        ParseError::new(msg, loc, self.source)
    }

    // -------------------------------------------------------------------------
    // Productions
    // -------------------------------------------------------------------------

    fn ident(&mut self) -> Option<&'src str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.advance();
            }
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Some(&self.source[start..self.pos])
    }

    /// `closing` is `Some(')')` inside a group, `None` at rule top level.
    fn alternatives(
        &mut self,
        strings: &mut StringInterner<'a>,
        closing: Option<char>,
    ) -> Result<&'a [&'a [AtomWithQuant<'a>]], ParseError> {
        let mut alts: Vec<&'a [AtomWithQuant<'a>]> = Vec::new();
        loop {
            let seq = self.sequence(strings, closing)?;
            alts.push(seq);
            self.skip_inline_ws();
            if !self.eat('|') {
                break;
            }
        }
        Ok(self.arena.alloc_slice_copy(&alts))
    }

    fn sequence(
        &mut self,
        strings: &mut StringInterner<'a>,
        closing: Option<char>,
    ) -> Result<&'a [AtomWithQuant<'a>], ParseError> {
        let mut atoms: Vec<AtomWithQuant<'a>> = Vec::new();
        loop {
            self.skip_inline_ws();
            if self.at_line_end() || self.peek() == Some('|') || self.peek() == closing {
                break;
            }
            let atom = self.atom(strings)?;
            let quant = self.quantifier();
            atoms.push(AtomWithQuant { atom, quant });
        }
        if atoms.is_empty() {
            return Err(self.error("expected pattern".to_string()));
        }
        Ok(self.arena.alloc_slice_copy(&atoms))
    }

    fn quantifier(&mut self) -> Quantifier {
        match self.peek() {
            Some('?') => {
                self.advance();
                Quantifier::Optional
            }
            Some('*') => {
                self.advance();
                Quantifier::Star
            }
            Some('+') => {
                self.advance();
                Quantifier::Plus
            }
            _ => Quantifier::One,
        }
    }

    fn atom(&mut self, strings: &mut StringInterner<'a>) -> Result<Atom<'a>, ParseError> {
        let loc = self.loc();
        match self.peek() {
            Some('"') => self.literal(strings, loc),
            Some('[') => self.charset(loc),
            Some('\\') => self.char_class(loc),
            Some('.') => {
                self.advance();
                Ok(Atom::Any)
            }
            Some('(') => {
                self.advance();
                let alternatives = self.alternatives(strings, Some(')'))?;
                self.skip_inline_ws();
                if !self.eat(')') {
                    return Err(self.error_at(loc, "unclosed group".to_string()));
                }
                Ok(Atom::Group { alternatives })
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.ident().unwrap_or_default();
                Ok(Atom::RuleRef(strings.intern(name)))
            }
            Some(c) => Err(self.error(format!("unexpected character `{}`", c))),
            None => Err(self.error("unexpected end of grammar".to_string())),
        }
    }

    fn literal(
        &mut self,
        strings: &mut StringInterner<'a>,
        loc: SourceLoc,
    ) -> Result<Atom<'a>, ParseError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let c = self.escape_char()?;
                    text.push(c);
                }
                Some('\n') | None => {
                    return Err(self.error_at(loc, "unterminated literal".to_string()));
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }
        Ok(Atom::Literal(strings.intern(&text)))
    }

    fn char_class(&mut self, loc: SourceLoc) -> Result<Atom<'a>, ParseError> {
        self.advance(); // backslash
        match self.advance() {
            Some('d') => Ok(Atom::CharClass(CharClass::Digit)),
            Some('w') => Ok(Atom::CharClass(CharClass::Word)),
            Some('s') => Ok(Atom::CharClass(CharClass::Whitespace)),
            Some(c) => Err(self.error_at(loc, format!("unknown character class `\\{}`", c))),
            None => Err(self.error_at(loc, "unexpected end of grammar".to_string())),
        }
    }

    fn charset(&mut self, loc: SourceLoc) -> Result<Atom<'a>, ParseError> {
        self.advance(); // opening bracket
        let negated = self.eat('^');
        let mut ranges: Vec<(char, char)> = Vec::new();
        loop {
            match self.peek() {
                Some(']') => {
                    self.advance();
                    break;
                }
                Some('\n') | None => {
                    return Err(self.error_at(loc, "unterminated character set".to_string()));
                }
                Some(_) => {
                    let lo = self.set_char()?;
                    // `a-z` range when a `-` follows and is not the closer
                    if self.peek() == Some('-') && {
                        let mut ahead = self.source[self.pos..].chars();
                        ahead.next();
                        ahead.next() != Some(']')
                    } {
                        self.advance(); // dash
                        let hi = self.set_char()?;
                        if hi < lo {
                            return Err(
                                self.error_at(loc, format!("invalid range `{}-{}`", lo, hi))
                            );
                        }
                        ranges.push((lo, hi));
                    } else {
                        ranges.push((lo, lo));
                    }
                }
            }
        }
        if ranges.is_empty() {
            return Err(self.error_at(loc, "empty character set".to_string()));
        }
        Ok(Atom::CharSet {
            ranges: self.arena.alloc_slice_copy(&ranges),
            negated,
        })
    }

    fn set_char(&mut self) -> Result<char, ParseError> {
        match self.advance() {
            Some('\\') => self.escape_char(),
            Some(c) => Ok(c),
            None => Err(self.error("unexpected end of grammar".to_string())),
        }
    }

    fn escape_char(&mut self) -> Result<char, ParseError> {
        let loc = self.loc();
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some(c @ ('"' | '\\' | ']' | '-' | '^')) => Ok(c),
            Some(c) => Err(self.error_at(loc, format!("unknown escape `\\{}`", c))),
            None => Err(self.error_at(loc, "unexpected end of grammar".to_string())),
        }
    }
}
