//! Diagnostic rendering for parse errors and lowering failures
//!
//! Lowering never reports to the user synchronously; failed methods are
//! collected on the [`FileModel`](crate::model::FileModel). The CLI turns
//! those records, and parse errors, into codespan diagnostics.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle, Severity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use serde::Serialize;
use std::ops::Range;
use termcolor::{Buffer, ColorChoice, StandardStream};

use crate::model::LowerFailure;
use crate::parser::{ParseError, ParseErrorKind, SourceFile};

/// Error code for a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
pub struct Diagnostic {
    inner: CsDiagnostic<usize>,
    code: Option<ErrorCode>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner = self.inner.with_code(code.0);
        self.code = Some(code);
        self
    }

    /// Add a primary label (main error location)
    pub fn with_primary_label(
        mut self,
        file_id: usize,
        range: Range<usize>,
        message: impl Into<String>,
    ) -> Self {
        let label = Label::primary(file_id, range).with_message(message);
        self.inner.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.notes.push(format!("help: {}", help.into()));
        self
    }

    pub fn severity(&self) -> Severity {
        self.inner.severity
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Create diagnostic from a ParseError
    pub fn from_parse_error(error: &ParseError, file_id: usize) -> Self {
        let code = match error.kind {
            ParseErrorKind::Lex => ErrorCode("E1001"),
            ParseErrorKind::UnexpectedToken { .. } => ErrorCode("E1002"),
            ParseErrorKind::UnexpectedEof { .. } => ErrorCode("E1003"),
            ParseErrorKind::InvalidSyntax { .. } => ErrorCode("E1004"),
            ParseErrorKind::ParserLimitExceeded { .. } => ErrorCode("E1005"),
        };
        let mut diag = Diagnostic::error(error.message.clone())
            .with_code(code)
            .with_primary_label(file_id, error.span.start..error.span.end, "here");
        if let Some(suggestion) = &error.suggestion {
            diag = diag.with_help(suggestion.clone());
        }
        diag
    }

    /// Create a warning from a method whose lowering failed
    pub fn from_lower_failure(failure: &LowerFailure, file_id: usize, source: &SourceFile) -> Self {
        let diag = Diagnostic::warning(format!("Method {} was left without a body", failure.method))
            .with_code(ErrorCode("W2001"))
            .with_note(failure.error.to_string());
        match failure.error.position() {
            Some(position) if !position.is_unknown() => {
                let start = source.offset(position.line, position.column);
                let end = source.offset(position.end_line, position.end_column).max(start);
                diag.with_primary_label(file_id, start..end, "could not be lowered")
            }
            _ => diag,
        }
    }

    /// Emit the diagnostic to stderr
    pub fn emit(
        &self,
        files: &SimpleFiles<String, String>,
        color: ColorChoice,
    ) -> Result<(), codespan_reporting::files::Error> {
        let mut writer = StandardStream::stderr(color);
        let config = term::Config::default();
        term::emit(&mut writer, &config, files, &self.inner)
    }

    /// Render without colors, for tests and logs
    pub fn render(&self, files: &SimpleFiles<String, String>) -> String {
        let mut buffer = Buffer::no_color();
        let config = term::Config::default();
        match term::emit(&mut buffer, &config, files, &self.inner) {
            Ok(()) => String::from_utf8_lossy(buffer.as_slice()).into_owned(),
            Err(err) => format!("{}: {}", self.inner.message, err),
        }
    }

    pub fn to_json(&self, files: &SimpleFiles<String, String>) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonDiagnostic::from_diagnostic(self, files))
    }
}

/// JSON representation of a diagnostic
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub code: Option<String>,
    pub severity: String,
    pub message: String,
    pub labels: Vec<JsonLabel>,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonLabel {
    pub file: String,
    /// 1-indexed
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: String,
    pub primary: bool,
}

impl JsonDiagnostic {
    pub fn from_diagnostic(diag: &Diagnostic, files: &SimpleFiles<String, String>) -> Self {
        let severity = match diag.inner.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
            Severity::Bug => "bug",
        };

        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file = files.get(label.file_id).ok()?;
                let start = file.location((), label.range.start).ok()?;
                let end = file.location((), label.range.end).ok()?;
                Some(JsonLabel {
                    file: file.name().to_string(),
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: label.message.clone(),
                    primary: label.style == LabelStyle::Primary,
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.as_ref().map(|c| c.0.to_string()),
            severity: severity.to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// A `SimpleFiles` holding one source, which gets file id 0.
pub fn create_files(source: &SourceFile) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(source.name().to_string(), source.text().to_string());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LowerError;
    use crate::ir::Position;
    use crate::parser::Parser;

    #[test]
    fn test_parse_error_diagnostic() {
        let source = SourceFile::new("bad.ts", "let = 1;");
        let errors = Parser::new(source.text()).unwrap().parse().unwrap_err();
        let diag = Diagnostic::from_parse_error(&errors[0], 0);
        assert_eq!(diag.severity(), Severity::Error);
        assert_eq!(diag.code(), Some(&ErrorCode("E1002")));

        let files = create_files(&source);
        let rendered = diag.render(&files);
        assert!(rendered.contains("bad.ts:1:5"));
    }

    #[test]
    fn test_lower_failure_json() {
        let source = SourceFile::new("m.ts", "function f() {\n  x;\n}\n");
        let failure = LowerFailure {
            method: "f".to_string(),
            error: LowerError::unsupported("thing", Position::new(2, 3, 2, 4)),
        };
        let diag = Diagnostic::from_lower_failure(&failure, 0, &source);
        assert_eq!(diag.severity(), Severity::Warning);
        assert_eq!(diag.message(), "Method f was left without a body");

        let json = diag.to_json(&create_files(&source)).unwrap();
        assert!(json.contains("\"W2001\""));
        assert!(json.contains("\"start_line\": 2"));
        assert!(json.contains("\"start_column\": 3"));
    }
}
