//! Bytecode compiler for grammar rules.

use crate::syntax::{Atom, AtomWithQuant, CharClass, Quantifier, RuleSet};

use super::grammar::{CompiledGrammar, CompiledRule};
use super::instruction::{encode, encode_signed, op};

/// Compile grammar rules into bytecode
pub struct Compiler<'a> {
    grammar: CompiledGrammar<'a>,
}

impl<'a> Compiler<'a> {
    pub fn new() -> Self {
        Self {
            grammar: CompiledGrammar::new(),
        }
    }

    /// Compile a whole rule set. Rule ids follow definition order, so the
    /// start rule is rule 0. References must already be checked.
    pub fn compile_rules(&mut self, rules: &RuleSet<'a>) {
        // Register ids first so CALL operands resolve forward references
        for rule in rules.iter() {
            self.grammar.rules.push(CompiledRule {
                name: rule.name,
                bytecode_offset: 0,
            });
        }

        for (idx, rule) in rules.iter().enumerate() {
            self.grammar.rules[idx].bytecode_offset = self.grammar.current_offset();
            self.compile_alternatives(rule.alternatives);
            self.grammar.emit(encode(op::END, 0));
        }
    }

    /// Ordered choice:
    /// ```text
    /// CHOICE alt2
    /// <alt1>
    /// COMMIT done
    /// alt2:
    /// ...
    /// <altN>
    /// done:
    /// ```
    fn compile_alternatives(&mut self, alternatives: &[&[AtomWithQuant<'a>]]) {
        if alternatives.len() == 1 {
            self.compile_pattern(alternatives[0]);
            return;
        }

        let mut commit_offsets = Vec::new();
        for (i, alt) in alternatives.iter().enumerate() {
            if i < alternatives.len() - 1 {
                let choice_offset = self.grammar.emit(encode(op::CHOICE, 0));
                self.compile_pattern(alt);
                commit_offsets.push(self.grammar.emit(encode(op::COMMIT, 0)));
                let next_alt_offset = self.grammar.current_offset();
                self.grammar.patch_jump(choice_offset, next_alt_offset);
            } else {
                self.compile_pattern(alt);
            }
        }

        let done_offset = self.grammar.current_offset();
        for commit_off in commit_offsets {
            self.grammar.patch_jump(commit_off, done_offset);
        }
    }

    fn compile_pattern(&mut self, pattern: &[AtomWithQuant<'a>]) {
        for atom_quant in pattern {
            self.compile_atom_with_quant(atom_quant);
        }
    }

    fn compile_atom_with_quant(&mut self, aq: &AtomWithQuant<'a>) {
        match aq.quant {
            Quantifier::One => {
                self.compile_atom(&aq.atom);
            }

            Quantifier::Optional => {
                // CHOICE skip
                // <atom>
                // COMMIT skip
                // skip:
                let choice_offset = self.grammar.emit(encode(op::CHOICE, 0));
                self.compile_atom(&aq.atom);
                let commit_offset = self.grammar.emit(encode(op::COMMIT, 0));
                let skip_offset = self.grammar.current_offset();
                self.grammar.patch_jump(choice_offset, skip_offset);
                self.grammar.patch_jump(commit_offset, skip_offset);
            }

            Quantifier::Star => {
                self.compile_star(&aq.atom);
            }

            Quantifier::Plus => {
                // <atom> then the star loop
                self.compile_atom(&aq.atom);
                self.compile_star(&aq.atom);
            }
        }
    }

    /// Greedy loop:
    /// ```text
    /// loop:
    ///   CHOICE done
    ///   <atom>
    ///   COMMIT loop
    /// done:
    /// ```
    /// COMMIT pops the iteration's backtrack point before looping, so the
    /// stack stays flat no matter how many times the atom matches.
    fn compile_star(&mut self, atom: &Atom<'a>) {
        let loop_offset = self.grammar.current_offset();
        let choice_offset = self.grammar.emit(encode(op::CHOICE, 0));
        self.compile_atom(atom);
        let rel_offset = (loop_offset as i32) - (self.grammar.current_offset() as i32);
        self.grammar.emit(encode(op::COMMIT, encode_signed(rel_offset)));
        let done_offset = self.grammar.current_offset();
        self.grammar.patch_jump(choice_offset, done_offset);
    }

    fn compile_atom(&mut self, atom: &Atom<'a>) {
        match atom {
            Atom::Literal(lit) => {
                let str_id = self.grammar.intern_string(lit);
                self.grammar.emit(encode(op::LITERAL, str_id));
            }

            Atom::CharClass(class) => {
                let class_id = match class {
                    CharClass::Digit => 0,
                    CharClass::Word => 1,
                    CharClass::Whitespace => 2,
                };
                self.grammar.emit(encode(op::CHAR_CLASS, class_id));
            }

            Atom::CharSet { ranges, negated } => {
                let charset_id = self.grammar.add_charset(ranges, *negated);
                self.grammar.emit(encode(op::CHAR_SET, charset_id));
            }

            Atom::Any => {
                self.grammar.emit(encode(op::ANY, 0));
            }

            Atom::Group { alternatives } => {
                self.compile_alternatives(alternatives);
            }

            Atom::RuleRef(name) => {
                let rule_id = self
                    .grammar
                    .get_rule(name)
                    .expect("rule references are checked before compilation");
                self.grammar.emit(encode(op::CALL, rule_id));
            }
        }
    }

    /// Finish compilation and return the grammar
    pub fn finish(self) -> CompiledGrammar<'a> {
        self.grammar
    }
}

impl<'a> Default for Compiler<'a> {
    fn default() -> Self {
        Self::new()
    }
}
