use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLoc {
    pub offset: u32,
    pub line: u32,
    pub col: u32,
}

impl SourceLoc {
    pub fn new(offset: u32, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Error with location and context information, produced both by the
/// grammar reader and by a failed parse.
#[derive(Debug)]
pub struct ParseError {
    pub msg: String,
    pub loc: SourceLoc,
    pub source_line: String,
}

impl ParseError {
    pub fn new(msg: String, loc: SourceLoc, source: &str) -> Self {
        Self {
            msg,
            loc,
            source_line: line_at(source, loc.line),
        }
    }

    /// Render as a multi-line diagnostic with a caret under the column.
    pub fn render(&self) -> String {
        let spaces = self.loc.col.saturating_sub(1) as usize;
        format!(
            "{}:{}: {}\n  {}\n  {}^",
            self.loc.line,
            self.loc.col,
            self.msg,
            self.source_line,
            " ".repeat(spaces)
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.loc.line, self.loc.col, self.msg)
    }
}

fn line_at(source: &str, line: u32) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .unwrap_or("")
        .to_string()
}
