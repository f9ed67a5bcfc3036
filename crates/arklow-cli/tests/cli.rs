//! End-to-end tests for the `arklow` binary.

use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::{Command, Output};

fn arklow(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arklow"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run arklow")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const SOURCE: &str = "function add(a: number, b: number): number { return a + b; }\nlet x = add(1, 2);\n";

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.ts"), SOURCE).unwrap();
    dir
}

// ── lower ────────────────────────────────────────────────────────────

#[test]
fn test_lower_prints_text_model() {
    let dir = project();
    let output = arklow(dir.path(), &["lower", "main.ts"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("file @default/"));
    assert!(text.contains("class %dflt"));
    assert!(text.contains("%0 = a + b"));
    assert!(text.contains("x = staticinvoke"));
}

#[test]
fn test_lower_selects_method() {
    let dir = project();
    let output = arklow(dir.path(), &["lower", "main.ts", "--method", "add"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("add(number, number)"));
    assert!(!text.contains("class %dflt"));
    assert!(!text.contains("x = staticinvoke"));
}

#[test]
fn test_lower_json() {
    let dir = project();
    let output = arklow(dir.path(), &["lower", "main.ts", "--format", "json", "--jobs", "2"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let files = json.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0]["classes"].as_array().is_some_and(|c| !c.is_empty()));
    assert!(files[0]["failures"].as_array().is_some_and(|f| f.is_empty()));
}

#[test]
fn test_lower_reads_project_config() {
    let dir = project();
    std::fs::write(dir.path().join("arklow.toml"), "[project]\nname = \"shop\"\n").unwrap();
    let output = arklow(dir.path(), &["lower", "main.ts"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("file @shop/"));
}

#[test]
fn test_lower_directory() {
    let dir = project();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/util.ets"), "let y = 2;\n").unwrap();
    let output = arklow(dir.path(), &["lower", "."]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert_eq!(text.matches("file @default/").count(), 2);
    assert!(text.contains("y = 2"));
}

// ── check ────────────────────────────────────────────────────────────

#[test]
fn test_check_clean_file() {
    let dir = project();
    let output = arklow(dir.path(), &["check", "main.ts"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("1 file(s)"));
}

#[test]
fn test_check_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.ts"), "let = ;\n").unwrap();
    let output = arklow(dir.path(), &["check", "bad.ts"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error"));
}

#[test]
fn test_check_reports_methods_without_body() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("assign.ts"), "let x = 1;\n1 = x;\n").unwrap();
    let output = arklow(dir.path(), &["check", "assign.ts", "--format", "json"]);
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let diagnostics = json.as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["code"], "W2001");
    assert_eq!(diagnostics[0]["severity"], "warning");
}

#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = arklow(dir.path(), &["lower", "nope.ts"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("nope.ts"));
}
