//! `tyro codegen` command integration tests

use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn tyro(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tyro"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn run_codegen(input: &Path, output: &Path, extra: &[&str]) -> Output {
    let mut args = vec![
        "codegen",
        "--in",
        input.to_str().unwrap(),
        "--out",
        output.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    tyro(&args)
}

fn write_manifest(dir: &TempDir) -> std::path::PathBuf {
    let manifest = json!({
        "version": 1,
        "methods": [
            {
                "name": "double",
                "params": {"x": {"type": "number"}},
                "optionalParams": {"factor": {"type": "number"}},
                "returns": {"type": "number"}
            },
            {
                "name": "upload",
                "params": {},
                "optionalParams": {},
                "metadata": {"noBatch": true}
            },
            {
                "name": "bad-name",
                "params": {},
                "optionalParams": {}
            }
        ]
    });
    let path = dir.path().join("manifest.json");
    fs::write(&path, manifest.to_string()).unwrap();
    path
}

#[test]
fn test_codegen_writes_client() {
    let dir = TempDir::new().unwrap();
    let input = write_manifest(&dir);
    let output = dir.path().join("client.ts");

    let result = run_codegen(&input, &output, &[]);

    assert!(result.status.success());
    let code = fs::read_to_string(&output).unwrap();
    assert!(code.starts_with("/* eslint-disable @typescript-eslint/no-unused-vars */\n"));
    assert!(code.contains("export function double(params: { x: number; factor?: number }): Promise<number> {"));
    assert!(code.contains("export function upload(): Promise<void> {"));
    assert!(!code.contains("bad-name"));

    let stdout = String::from_utf8(result.stdout).unwrap();
    let lines = code.split('\n').count();
    assert!(stdout.starts_with(&format!("Wrote {} lines of code to ", lines)));
    assert!(stdout.trim_end().ends_with("client.ts"));

    let stderr = String::from_utf8(result.stderr).unwrap();
    assert!(stderr.contains("`bad-name' is not a valid method name. Skipping"));
}

#[test]
fn test_codegen_dataloader_and_endpoint() {
    let dir = TempDir::new().unwrap();
    let input = write_manifest(&dir);
    let output = dir.path().join("client.ts");

    let result = run_codegen(
        &input,
        &output,
        &["--dataloader", "--endpoint", "http://localhost:3000/rpc"],
    );

    assert!(result.status.success());
    let code = fs::read_to_string(&output).unwrap();
    assert!(code.contains("import DataLoader from \"dataloader\";"));
    assert!(code.contains("fetch(\"http://localhost:3000/rpc\", {"));
    assert!(code.contains("  return callSingle({\n    method: \"upload\""));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("client.ts");

    let result = run_codegen(&dir.path().join("absent.json"), &output, &[]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8(result.stderr).unwrap().contains("Error: The input file doesn't exist"));
    assert!(!output.exists());
}

#[test]
fn test_empty_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("client.ts");

    for content in ["", "null"] {
        let input = dir.path().join("manifest.json");
        fs::write(&input, content).unwrap();

        let result = run_codegen(&input, &output, &[]);

        assert_eq!(result.status.code(), Some(1));
        assert!(String::from_utf8(result.stderr).unwrap().contains("Error: "));
    }
    assert!(!output.exists());
}

#[test]
fn test_not_a_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("manifest.json");
    fs::write(&input, r#"{"handler": "default"}"#).unwrap();
    let output = dir.path().join("client.ts");

    let result = run_codegen(&input, &output, &[]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8(result.stderr)
        .unwrap()
        .contains("Error: The input file isn't a spec manifest"));
}
