//! `arklow lower`: print the lowered IR of each file.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arklow_engine::diagnostic::{create_files, Diagnostic};
use arklow_engine::error::LoadError;
use arklow_engine::model::MethodModel;
use arklow_engine::{lower_source, ArklowConfig, FileModel, PrettyPrint, SourceFile};
use termcolor::ColorChoice;

use super::{collect_source_files, Format, ProjectOptions};
use crate::output::StyledOutput;

pub fn execute(
    inputs: &[PathBuf],
    format: Format,
    method: Option<&str>,
    project: &ProjectOptions,
    color: ColorChoice,
) -> anyhow::Result<bool> {
    let config = project.load_config(inputs)?;
    let files = collect_source_files(inputs)?;
    if files.is_empty() {
        StyledOutput::new(color).error("no .ts or .ets files found");
        return Ok(false);
    }

    let mut models = Vec::with_capacity(files.len());
    let mut success = true;
    for path in &files {
        let source = read_source(path)?;
        match lower_or_report(&source, &config, color)? {
            Some(model) => models.push(model),
            None => success = false,
        }
    }

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    match format {
        Format::Text => {
            for model in &models {
                match method {
                    Some(name) => {
                        for selected in select(model, name) {
                            write!(stdout, "{}", selected.pretty_print())?;
                        }
                    }
                    None => write!(stdout, "{}", model.pretty_print())?,
                }
            }
        }
        Format::Json => {
            let json = match method {
                Some(name) => {
                    let selected: Vec<&MethodModel> =
                        models.iter().flat_map(|model| select(model, name)).collect();
                    serde_json::to_string_pretty(&selected)?
                }
                None => serde_json::to_string_pretty(&models)?,
            };
            writeln!(stdout, "{}", json)?;
        }
    }
    stdout.flush()?;
    Ok(success)
}

fn select<'m>(model: &'m FileModel, name: &'m str) -> impl Iterator<Item = &'m MethodModel> {
    model
        .methods()
        .filter(move |method| method.signature.name() == name)
}

pub(crate) fn read_source(path: &Path) -> anyhow::Result<SourceFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SourceFile::new(path.display().to_string(), text))
}

/// Lower one file, emitting its parse errors to stderr when it does not parse.
pub(crate) fn lower_or_report(
    source: &SourceFile,
    config: &ArklowConfig,
    color: ColorChoice,
) -> anyhow::Result<Option<FileModel>> {
    match lower_source(source, config) {
        Ok(model) => Ok(Some(model)),
        Err(LoadError::Parse { errors, .. }) => {
            let files = create_files(source);
            for error in &errors {
                Diagnostic::from_parse_error(error, 0).emit(&files, color)?;
            }
            Ok(None)
        }
        Err(error) => Err(error).with_context(|| format!("failed to lower {}", source.name())),
    }
}
