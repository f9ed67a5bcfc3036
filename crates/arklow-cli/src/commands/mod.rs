//! Subcommand implementations.

pub mod check;
pub mod lower;

use anyhow::Context;
use arklow_engine::config::CONFIG_FILE;
use arklow_engine::ArklowConfig;
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source extensions picked up from directories.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "ets"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Options shared by commands that lower files.
#[derive(Debug, Args)]
pub struct ProjectOptions {
    /// Worker threads (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Configuration file (default: nearest arklow.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ProjectOptions {
    /// Load the configuration and apply command-line overrides.
    ///
    /// Without `--config`, `arklow.toml` is searched for from the directory
    /// of the first input upwards.
    pub fn load_config(&self, inputs: &[PathBuf]) -> anyhow::Result<ArklowConfig> {
        let mut config = match &self.config {
            Some(path) => ArklowConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                let start = inputs
                    .first()
                    .map(|input| search_root(input))
                    .unwrap_or_else(|| PathBuf::from("."));
                ArklowConfig::discover(&start)
                    .with_context(|| format!("failed to load {} above {}", CONFIG_FILE, start.display()))?
            }
        };
        if let Some(jobs) = self.jobs {
            config.lower.jobs = jobs;
        }
        debug!(project = %config.project.name, jobs = config.lower.jobs, "configuration loaded");
        Ok(config)
    }
}

fn search_root(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.to_path_buf();
    }
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Expand the command-line inputs into source files.
///
/// Files are taken as given; directories are searched recursively for
/// `.ts` and `.ets` files, skipping hidden directories and `node_modules`.
pub fn collect_source_files(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_in_dir(input, &mut files)?;
        } else {
            files.push(input.clone());
        }
    }
    debug!(count = files.len(), "collected source files");
    Ok(files)
}

fn collect_in_dir(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name == "node_modules" || name == "dist" {
                continue;
            }
            collect_in_dir(&path, files)?;
        } else if is_source(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collect_skips_hidden_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "").unwrap();
        std::fs::write(dir.path().join("b.ets"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join(".cache/c.ts"), "").unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/d.ts"), "").unwrap();

        let files = collect_source_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.ts", "b.ets", "lib/d.ts"]);
    }

    #[test]
    fn test_jobs_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[lower]\njobs = 2\n").unwrap();
        let input = dir.path().join("main.ts");

        let options = ProjectOptions { jobs: None, config: None };
        assert_eq!(options.load_config(&[input.clone()]).unwrap().lower.jobs, 2);

        let options = ProjectOptions { jobs: Some(5), config: None };
        assert_eq!(options.load_config(&[input]).unwrap().lower.jobs, 5);
    }
}
