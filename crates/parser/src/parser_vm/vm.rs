//! Parsing Virtual Machine execution.

use pegvm_common::debug::{create_logger, Logger};
use pegvm_common::{log, log_fail, log_success};

use crate::error::{ParseError, SourceLoc};

use super::grammar::CompiledGrammar;
use super::instruction::{op, opcode, operand, operand_signed};

/// Guard against unbounded recursion through rule references
const MAX_CALL_DEPTH: usize = 200;

/// Backtrack point
#[derive(Clone)]
struct BacktrackPoint {
    pc: usize,
    pos: usize,
    line: u32,
    col: u32,
}

/// Parsing Virtual Machine
pub struct VM<'a, 'src> {
    // Bytecode
    grammar: &'a CompiledGrammar<'a>,

    // Input
    source: &'src str,
    pub pos: usize,
    pub line: u32,
    pub col: u32,

    // Backtrack stack
    backtrack_stack: Vec<BacktrackPoint>,

    // Rule call depth
    call_depth: usize,

    // Error tracking
    pub furthest_pos: usize,
    pub furthest_loc: SourceLoc,
    pub furthest_expected: Vec<String>,

    // Logger
    log: Logger,
}

impl<'a, 'src> VM<'a, 'src> {
    pub fn new(grammar: &'a CompiledGrammar<'a>, source: &'src str) -> Self {
        Self {
            grammar,
            source,
            pos: 0,
            line: 1,
            col: 1,
            backtrack_stack: Vec::new(),
            call_depth: 0,
            furthest_pos: 0,
            furthest_loc: SourceLoc::new(0, 1, 1),
            furthest_expected: Vec::new(),
            log: create_logger("parsevm"),
        }
    }

    /// Run the start rule against the whole input.
    ///
    /// Succeeds only when the start rule consumes every input byte; the
    /// matched text (the whole input) is returned.
    pub fn run(&mut self) -> Result<&'src str, ParseError> {
        if self.grammar.rules.is_empty() {
            return Err(ParseError::new(
                "grammar has no rules".to_string(),
                SourceLoc::new(0, 1, 1),
                self.source,
            ));
        }

        if self.run_rule(0) {
            if self.pos == self.source.len() {
                log_success!(self.log, "matched {} bytes", self.pos);
                return Ok(self.source);
            }
            self.record_expected("end of input");
        }

        log_fail!(self.log, "no match, furthest pos {}", self.furthest_pos);
        Err(self.failure())
    }

    // -------------------------------------------------------------------------
    // Input Navigation
    // -------------------------------------------------------------------------

    #[inline]
    fn remaining(&self) -> &'src str {
        &self.source[self.pos..]
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    #[inline]
    fn advance(&mut self) -> Option<char> {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            Some(c)
        } else {
            None
        }
    }

    fn current_loc(&self) -> SourceLoc {
        SourceLoc::new(self.pos as u32, self.line, self.col)
    }

    // -------------------------------------------------------------------------
    // Error Tracking
    // -------------------------------------------------------------------------

    fn record_expected(&mut self, expected: &str) {
        if self.pos > self.furthest_pos {
            self.furthest_pos = self.pos;
            self.furthest_loc = self.current_loc();
            self.furthest_expected.clear();
            self.furthest_expected.push(expected.to_string());
        } else if self.pos == self.furthest_pos {
            if self.furthest_expected.iter().all(|e| e != expected) {
                self.furthest_expected.push(expected.to_string());
            }
            if self.furthest_expected.len() == 1 {
                self.furthest_loc = self.current_loc();
            }
        }
    }

    fn failure(&self) -> ParseError {
        let msg = if self.furthest_expected.is_empty() {
            "parse failed".to_string()
        } else {
            format!("expected {}", self.furthest_expected.join(" or "))
        };
        ParseError::new(msg, self.furthest_loc, self.source)
    }

    // -------------------------------------------------------------------------
    // Matching
    // -------------------------------------------------------------------------

    fn match_literal(&mut self, str_id: u32) -> bool {
        let lit = self.grammar.strings[str_id as usize];
        if self.remaining().starts_with(lit) {
            for _ in lit.chars() {
                self.advance();
            }
            true
        } else {
            let expected = format!("{:?}", lit);
            self.record_expected(&expected);
            false
        }
    }

    fn match_char_class(&mut self, class_id: u32) -> bool {
        let c = self.peek();
        let matches = match c {
            Some(c) => match class_id {
                0 => c.is_ascii_digit(),
                1 => c.is_ascii_alphanumeric() || c == '_',
                2 => c.is_ascii_whitespace(),
                _ => false,
            },
            None => false,
        };
        if matches {
            self.advance();
            true
        } else {
            let expected = match class_id {
                0 => "digit",
                1 => "word character",
                2 => "whitespace",
                _ => "character",
            };
            self.record_expected(expected);
            false
        }
    }

    fn match_char_set(&mut self, charset_id: u32) -> bool {
        let charset = &self.grammar.charsets[charset_id as usize];
        match self.peek() {
            Some(c) if charset.matches(c) => {
                self.advance();
                true
            }
            _ => {
                self.record_expected("character");
                false
            }
        }
    }

    fn match_any(&mut self) -> bool {
        if self.advance().is_some() {
            true
        } else {
            self.record_expected("any character");
            false
        }
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Execute a single rule's bytecode. Restores input position via the
    /// backtrack stack on failure; the caller handles position restore when
    /// the whole rule fails.
    fn run_rule(&mut self, rule_id: u32) -> bool {
        let rule = &self.grammar.rules[rule_id as usize];
        let mut pc = rule.bytecode_offset;

        log!(self.log, "match {} at {}:{}", rule.name, self.line, self.col);
        self.log.push_indent();

        // Backtrack points below this belong to enclosing rules
        let initial_backtrack_depth = self.backtrack_stack.len();

        macro_rules! handle_failure {
            () => {
                if self.backtrack_stack.len() > initial_backtrack_depth {
                    if let Some(bp) = self.backtrack_stack.pop() {
                        pc = bp.pc;
                        self.pos = bp.pos;
                        self.line = bp.line;
                        self.col = bp.col;
                        continue;
                    }
                }
                // No backtrack point - rule fails
                self.backtrack_stack.truncate(initial_backtrack_depth);
                self.log.pop_indent();
                return false;
            };
        }

        loop {
            if pc >= self.grammar.code.len() {
                break;
            }

            let instr = self.grammar.code[pc];
            let opc = opcode(instr);
            let oper = operand(instr);

            match opc {
                op::LITERAL => {
                    if self.match_literal(oper) {
                        pc += 1;
                    } else {
                        handle_failure!();
                    }
                }

                op::CHAR_CLASS => {
                    if self.match_char_class(oper) {
                        pc += 1;
                    } else {
                        handle_failure!();
                    }
                }

                op::CHAR_SET => {
                    if self.match_char_set(oper) {
                        pc += 1;
                    } else {
                        handle_failure!();
                    }
                }

                op::ANY => {
                    if self.match_any() {
                        pc += 1;
                    } else {
                        handle_failure!();
                    }
                }

                op::CALL => {
                    if self.call_depth >= MAX_CALL_DEPTH {
                        self.record_expected("non-recursive rule");
                        handle_failure!();
                    }
                    let saved_pos = self.pos;
                    let saved_line = self.line;
                    let saved_col = self.col;
                    self.call_depth += 1;
                    let matched = self.run_rule(oper);
                    self.call_depth -= 1;
                    if matched {
                        pc += 1;
                    } else {
                        self.pos = saved_pos;
                        self.line = saved_line;
                        self.col = saved_col;
                        handle_failure!();
                    }
                }

                op::CHOICE => {
                    let offset = operand_signed(instr);
                    self.backtrack_stack.push(BacktrackPoint {
                        pc: ((pc as i32) + offset) as usize,
                        pos: self.pos,
                        line: self.line,
                        col: self.col,
                    });
                    pc += 1;
                }

                op::COMMIT => {
                    // Pop the matching CHOICE point and jump
                    let bp = self.backtrack_stack.pop();
                    let offset = operand_signed(instr);
                    match bp {
                        // A backward commit closes a repetition. An
                        // iteration that consumed nothing would repeat
                        // forever, so leave through the loop's exit (the
                        // CHOICE point's target) instead
                        Some(bp) if offset < 0 && bp.pos == self.pos => {
                            pc = bp.pc;
                        }
                        _ => {
                            pc = ((pc as i32) + offset) as usize;
                        }
                    }
                }

                op::JUMP => {
                    let offset = operand_signed(instr);
                    pc = ((pc as i32) + offset) as usize;
                }

                op::FAIL => {
                    handle_failure!();
                }

                op::END => {
                    break;
                }

                _ => {
                    pc += 1;
                }
            }
        }

        self.backtrack_stack.truncate(initial_backtrack_depth);
        self.log.pop_indent();
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, run};
    use bumpalo::Bump;
    use pegvm_common::StringInterner;

    fn try_parse(grammar_src: &str, input: &str) -> Result<String, String> {
        let arena = Bump::new();
        let mut strings = StringInterner::new(&arena);
        let grammar = compile(&arena, &mut strings, grammar_src).map_err(|e| e.render())?;
        run(&grammar, input)
            .map(|m| m.to_string())
            .map_err(|e| e.render())
    }

    #[test]
    fn literal_match() {
        assert_eq!(try_parse(r#"a = "hello""#, "hello").unwrap(), "hello");
    }

    #[test]
    fn literal_mismatch_names_expectation() {
        let err = try_parse(r#"a = "hello""#, "help").unwrap_err();
        assert!(err.contains("expected \"hello\""), "got: {}", err);
    }

    #[test]
    fn digits_plus_matches_all_digits() {
        assert_eq!(try_parse("digits = \\d+", "123").unwrap(), "123");
    }

    #[test]
    fn digits_plus_rejects_letters() {
        let err = try_parse("digits = \\d+", "abc").unwrap_err();
        assert!(err.contains("expected digit"), "got: {}", err);
        assert!(err.contains("1:1"), "got: {}", err);
    }

    #[test]
    fn trailing_input_is_an_error() {
        let err = try_parse("digits = \\d+", "12x").unwrap_err();
        assert!(err.contains("end of input"), "got: {}", err);
        assert!(err.contains("1:3"), "got: {}", err);
    }

    #[test]
    fn ordered_choice_prefers_first_alternative() {
        assert_eq!(try_parse(r#"a = "ab" | "a""#, "ab").unwrap(), "ab");
        assert_eq!(try_parse(r#"a = "ab" | "a""#, "a").unwrap(), "a");
    }

    #[test]
    fn ordered_choice_is_committed() {
        // PEG semantics: once "a" matches, the "ab" alternative is gone
        let err = try_parse(r#"a = ("a" | "ab") "c""#, "abc").unwrap_err();
        assert!(err.contains("expected \"c\""), "got: {}", err);
    }

    #[test]
    fn star_matches_zero_occurrences() {
        assert_eq!(try_parse("a = \\d* \"x\"", "x").unwrap(), "x");
    }

    #[test]
    fn optional_atom() {
        assert_eq!(try_parse(r#"a = "-"? \d+"#, "-42").unwrap(), "-42");
        assert_eq!(try_parse(r#"a = "-"? \d+"#, "42").unwrap(), "42");
    }

    #[test]
    fn rule_references() {
        let src = "pair = num \",\" num\nnum = \\d+";
        assert_eq!(try_parse(src, "12,34").unwrap(), "12,34");
        assert!(try_parse(src, "12,").is_err());
    }

    #[test]
    fn charset_negation() {
        assert_eq!(try_parse("a = [^,]+", "xyz").unwrap(), "xyz");
        assert!(try_parse("a = [^,]+", ",").is_err());
    }

    #[test]
    fn any_matches_multibyte() {
        assert_eq!(try_parse("a = .+", "héllo").unwrap(), "héllo");
    }

    #[test]
    fn whitespace_class() {
        assert_eq!(try_parse("a = \\w+ \\s \\w+", "ab cd").unwrap(), "ab cd");
    }

    #[test]
    fn empty_repetition_terminates() {
        assert_eq!(try_parse("a = (\\d*)* \"x\"", "x").unwrap(), "x");
        assert_eq!(try_parse("a = (\\d*)* \"x\"", "12x").unwrap(), "12x");
    }

    #[test]
    fn left_recursion_fails_instead_of_hanging() {
        let err = try_parse("a = a \"x\"", "x").unwrap_err();
        assert!(err.contains("expected"), "got: {}", err);
    }

    #[test]
    fn failure_reports_furthest_position() {
        // The parse gets through "ab" before failing, so the error points
        // at column 3, not at the start
        let err = try_parse(r#"a = "ab" "cd""#, "abxd").unwrap_err();
        assert!(err.contains("1:3"), "got: {}", err);
        assert!(err.contains("\"cd\""), "got: {}", err);
    }

    #[test]
    fn alternation_collects_expectations() {
        let err = try_parse(r#"a = "x" | \d"#, "?").unwrap_err();
        assert!(err.contains("\"x\""), "got: {}", err);
        assert!(err.contains("digit"), "got: {}", err);
    }

    #[test]
    fn empty_input_against_plus_fails() {
        assert!(try_parse("digits = \\d+", "").is_err());
    }

    #[test]
    fn empty_input_against_star_matches() {
        assert_eq!(try_parse("digits = \\d*", "").unwrap(), "");
    }
}
