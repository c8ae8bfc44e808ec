//! Integration tests running realistic grammars through the public API.

use bumpalo::Bump;
use pegvm_common::StringInterner;
use pegvm_parser::{compile, run};

fn parse(grammar_src: &str, input: &str) -> Result<String, String> {
    let arena = Bump::new();
    let mut strings = StringInterner::new(&arena);
    let grammar = compile(&arena, &mut strings, grammar_src).map_err(|e| e.render())?;
    run(&grammar, input)
        .map(|m| m.to_string())
        .map_err(|e| e.render())
}

const CSV_ROW: &str = "\
# one row of comma-separated fields
row   = field (\",\" field)*
field = [^,]*
";

#[test]
fn csv_row_grammar() {
    assert_eq!(parse(CSV_ROW, "a,b,c").unwrap(), "a,b,c");
    assert_eq!(parse(CSV_ROW, "one").unwrap(), "one");
    assert_eq!(parse(CSV_ROW, "a,,c").unwrap(), "a,,c");
}

const IDENT_LIST: &str = "\
list  = ident (sep ident)*
ident = [a-zA-Z_] \\w*
sep   = \\s* \",\" \\s*
";

#[test]
fn identifier_list_grammar() {
    assert_eq!(parse(IDENT_LIST, "foo, bar,baz").unwrap(), "foo, bar,baz");
    assert!(parse(IDENT_LIST, "foo, 9bar").is_err());
}

const NUMBER: &str = "\
number   = \"-\"? \\d+ fraction? exponent?
fraction = \".\" \\d+
exponent = (\"e\" | \"E\") (\"+\" | \"-\")? \\d+
";

#[test]
fn number_grammar() {
    for ok in ["0", "-17", "3.14", "-2.5e10", "6E-3"] {
        assert_eq!(parse(NUMBER, ok).unwrap(), ok, "input: {}", ok);
    }
    for bad in ["", "-", "1.", ".5", "1e", "--2"] {
        assert!(parse(NUMBER, bad).is_err(), "input: {}", bad);
    }
}

const NESTED: &str = "\
expr = term (\"+\" term)*
term = \\d+ | \"(\" expr \")\"
";

#[test]
fn nested_expression_grammar() {
    assert_eq!(parse(NESTED, "1+2+3").unwrap(), "1+2+3");
    assert_eq!(parse(NESTED, "(1+2)+(3+(4+5))").unwrap(), "(1+2)+(3+(4+5))");
    assert!(parse(NESTED, "(1+2").is_err());
}

#[test]
fn quoted_string_grammar() {
    let grammar = r#"str = "\"" ([^"\\] | "\\" .)* "\"""#;
    assert_eq!(parse(grammar, r#""hi""#).unwrap(), r#""hi""#);
    assert_eq!(parse(grammar, r#""a\"b""#).unwrap(), r#""a\"b""#);
    assert!(parse(grammar, r#""open"#).is_err());
}

#[test]
fn error_messages_point_into_the_input() {
    let err = parse(NUMBER, "12.x5").unwrap_err();
    assert!(err.contains("1:4"), "got: {}", err);
    assert!(err.contains("12.x5"), "got: {}", err);
    assert!(err.contains('^'), "got: {}", err);
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let grammar = "\n# leading comment\n\na = \"ok\"  # trailing comment\n\n";
    assert_eq!(parse(grammar, "ok").unwrap(), "ok");
}
