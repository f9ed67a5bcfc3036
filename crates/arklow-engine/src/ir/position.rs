//! Source positions attached to IR statements and values

use serde::Serialize;
use std::fmt;

/// A 1-based line/column range in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Position {
    /// Placeholder for values that do not come from source text.
    pub const UNKNOWN: Position = Position {
        line: 0,
        column: 0,
        end_line: 0,
        end_column: 0,
    };

    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "?")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Source snapshot kept on the first statement emitted for a syntax node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginText {
    pub text: String,
    pub line: u32,
    pub column: u32,
}
