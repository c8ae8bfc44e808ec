//! pegvm grammar engine
//!
//! Compiles grammar source into bytecode and runs it against input with a
//! backtracking virtual machine.
//!
//! # Overview
//!
//! A grammar is a sequence of rule definitions, one per line:
//!
//! ```text
//! number = digit+
//! digit  = \d
//! ```
//!
//! The first rule is the start rule. A run succeeds when the start rule
//! matches the entire input; the matched text is the result. On failure the
//! engine reports the furthest position reached and what was expected there.
//!
//! # Pipeline
//!
//! 1. [`parse_grammar`] reads grammar source into [`Rule`]s (arena-allocated).
//! 2. [`Compiler`] lowers rules to 32-bit bytecode ([`CompiledGrammar`]).
//! 3. [`VM`] executes the bytecode against input with explicit backtracking.
//!
//! [`compile`] and [`run`] wrap the pipeline for callers that do not need
//! the intermediate forms.

mod error;
mod grammar_lang;
pub mod parser_vm;
mod syntax;

use bumpalo::Bump;
use pegvm_common::StringInterner;

pub use error::{ParseError, SourceLoc};
pub use grammar_lang::parse_grammar;
pub use parser_vm::{CompiledGrammar, CompiledRule, Compiler, VM};
pub use syntax::{Atom, AtomWithQuant, CharClass, Quantifier, Rule, RuleSet};

/// Compile grammar source all the way to bytecode.
pub fn compile<'a>(
    arena: &'a Bump,
    strings: &mut StringInterner<'a>,
    grammar_src: &str,
) -> Result<CompiledGrammar<'a>, ParseError> {
    let rules = parse_grammar(arena, strings, grammar_src)?;
    let mut compiler = Compiler::new();
    compiler.compile_rules(&rules);
    Ok(compiler.finish())
}

/// Run a compiled grammar against input.
///
/// Returns the matched text (the whole input) on success.
pub fn run<'a, 'src>(
    grammar: &'a CompiledGrammar<'a>,
    input: &'src str,
) -> Result<&'src str, ParseError> {
    let mut vm = VM::new(grammar, input);
    vm.run()
}
