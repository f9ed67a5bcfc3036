//! Source files as a position oracle.
//!
//! Spans produced by the lexer are byte ranges. [`SourceFile`] converts them
//! into 1-based line/column [`Position`]s and slices of original text, which
//! the lowering engine attaches to the statements it emits.

use crate::ir::Position;
use crate::parser::token::Span;

/// A named source text with a precomputed line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    text: String,
    /// Byte offset at which each line starts
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line and column of a byte offset. Columns count characters.
    pub fn line_column(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        (line as u32 + 1, column as u32 + 1)
    }

    /// Byte offset of a 1-based line/column, clamped to the text.
    pub fn offset(&self, line: u32, column: u32) -> usize {
        let Some(&line_start) = self.line_starts.get((line.max(1) - 1) as usize) else {
            return self.text.len();
        };
        let rest = &self.text[line_start..];
        let skip = column.max(1) as usize - 1;
        let within = rest
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        line_start + within
    }

    /// Start and end position of a span.
    pub fn position(&self, span: &Span) -> Position {
        let (line, column) = self.line_column(span.start);
        let (end_line, end_column) = self.line_column(span.end);
        Position {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Original text covered by a span; empty when out of range.
    pub fn snippet(&self, span: &Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let file = SourceFile::new("a.ts", "let a = 1;\nlet b = a;\n");
        assert_eq!(file.line_column(0), (1, 1));
        assert_eq!(file.line_column(4), (1, 5));
        assert_eq!(file.line_column(11), (2, 1));
        assert_eq!(file.line_count(), 3);
    }

    #[test]
    fn test_position_and_snippet() {
        let file = SourceFile::new("a.ts", "let a = 1;\nlet b = a;\n");
        let span = Span::new(15, 20, 2, 5);
        let position = file.position(&span);
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 5);
        assert_eq!(position.end_column, 10);
        assert_eq!(file.snippet(&span), "b = a");
    }

    #[test]
    fn test_offset_inverts_line_column() {
        let file = SourceFile::new("a.ts", "let a = 1;\nlet é = a;\n");
        assert_eq!(file.offset(1, 5), 4);
        assert_eq!(file.offset(2, 1), 11);
        assert_eq!(file.offset(2, 7), 18);
        assert_eq!(file.offset(9, 1), file.text().len());
    }

    #[test]
    fn test_columns_count_characters() {
        let file = SourceFile::new("a.ts", "let é = 1;");
        assert_eq!(file.line_column(7), (1, 7));
    }
}
