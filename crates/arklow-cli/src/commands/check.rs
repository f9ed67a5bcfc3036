//! `arklow check`: parse and lower without printing IR.
//!
//! Parse errors are reported as errors, methods left without a body as
//! warnings. Either makes the command fail.

use std::path::PathBuf;

use arklow_engine::diagnostic::{create_files, Diagnostic, JsonDiagnostic};
use arklow_engine::error::LoadError;
use arklow_engine::lower_source;
use termcolor::ColorChoice;

use super::lower::read_source;
use super::{collect_source_files, Format, ProjectOptions};
use crate::output::StyledOutput;

pub fn execute(
    inputs: &[PathBuf],
    format: Format,
    project: &ProjectOptions,
    color: ColorChoice,
) -> anyhow::Result<bool> {
    let config = project.load_config(inputs)?;
    let files = collect_source_files(inputs)?;
    let mut out = StyledOutput::new(color);
    if files.is_empty() {
        out.error("no .ts or .ets files found");
        return Ok(false);
    }

    let mut parse_errors = 0usize;
    let mut failures = 0usize;
    let mut lowered = 0usize;
    let mut json = Vec::new();

    for path in &files {
        let source = read_source(path)?;
        let diagnostics = match lower_source(&source, &config) {
            Ok(model) => {
                lowered += model.methods().filter(|method| method.body.is_some()).count();
                failures += model.failures.len();
                model
                    .failures
                    .iter()
                    .map(|failure| Diagnostic::from_lower_failure(failure, 0, &source))
                    .collect::<Vec<_>>()
            }
            Err(LoadError::Parse { errors, .. }) => {
                parse_errors += errors.len();
                errors
                    .iter()
                    .map(|error| Diagnostic::from_parse_error(error, 0))
                    .collect()
            }
            Err(error) => return Err(error.into()),
        };

        let source_files = create_files(&source);
        for diagnostic in &diagnostics {
            match format {
                Format::Text => diagnostic.emit(&source_files, color)?,
                Format::Json => json.push(JsonDiagnostic::from_diagnostic(diagnostic, &source_files)),
            }
        }
    }

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    let summary = format!(
        "{} file(s), {} method(s) lowered",
        files.len(),
        lowered
    );
    if parse_errors > 0 {
        out.error(&format!("{}: {} parse error(s)", summary, parse_errors));
    } else if failures > 0 {
        out.warning(&format!("{}: {} method(s) left without a body", summary, failures));
    } else {
        out.success(&summary);
    }
    Ok(parse_errors == 0 && failures == 0)
}
