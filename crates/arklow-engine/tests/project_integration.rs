//! Tests for loading files and project configuration from disk

use arklow_engine::config::{ArklowConfig, CONFIG_FILE};
use arklow_engine::error::LoadError;
use arklow_engine::ir::signature::DEFAULT_METHOD;
use arklow_engine::{lower_file, PrettyPrint};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_lower_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("entry.ets");
    fs::write(&path, "function twice(n: number) { return n * 2; }\nlet four = twice(2);\n").unwrap();

    let mut config = ArklowConfig::default();
    config.project.name = "demo".to_string();
    let model = lower_file(&path, &config).unwrap();

    assert_eq!(model.signature.project, "demo");
    assert!(model.signature.file.ends_with("entry.ets"));
    let defaults = model.default_class().unwrap();
    assert!(defaults.method(DEFAULT_METHOD).unwrap().body.is_some());
    assert!(model.pretty_print().contains("method <"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.ets");
    match lower_file(&path, &ArklowConfig::default()) {
        Err(LoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected IO error, got {:?}", other.map(|m| m.classes.len())),
    }
}

#[test]
fn test_config_discovered_from_nested_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        "[project]\nname = \"shop\"\n\n[lower]\njobs = 3\norigin_text = false\n",
    )
    .unwrap();
    let nested = dir.path().join("src").join("pages");
    fs::create_dir_all(&nested).unwrap();

    let found = ArklowConfig::find(&nested).unwrap();
    assert_eq!(found, dir.path().join(CONFIG_FILE));

    let config = ArklowConfig::discover(&nested).unwrap();
    assert_eq!(config.project.name, "shop");
    assert_eq!(config.lower.worker_count(), 3);
    assert!(!config.lower.origin_text);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), "[lower]\nprototype_root = \"\"\n").unwrap();
    assert!(ArklowConfig::discover(dir.path()).is_err());
}
