//! tyro command-line tool
//!
//! # Usage
//!
//! ```bash
//! # Dump the manifest from your server, then generate a client from it
//! tyro codegen --in rpc-manifest.json --out src/rpc.ts
//!
//! # Custom endpoint, with DataLoader batching
//! tyro codegen --in rpc-manifest.json --out src/rpc.ts --endpoint https://api.example.com/rpc --dataloader
//! ```
//!
//! Failures are printed as `Error: <reason>` and exit with status 1.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tyro_codegen::{generate_client, CodegenOptions};
use tyro_core::SpecManifest;

#[derive(Parser, Debug)]
#[command(name = "tyro", author, version, about = "Typed JSON-RPC tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a TypeScript client from a spec manifest
    Codegen(CodegenArgs),
}

#[derive(Args, Debug)]
struct CodegenArgs {
    /// Path to the JSON spec manifest exported by the server
    #[arg(long = "in", value_name = "FILE")]
    input: PathBuf,

    /// Path where the client code is written
    #[arg(long = "out", value_name = "FILE")]
    output: PathBuf,

    /// The JSON-RPC HTTP endpoint
    #[arg(long, default_value = "/rpc")]
    endpoint: String,

    /// Use DataLoader (requires the "dataloader" package)
    #[arg(long)]
    dataloader: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Codegen(args) => codegen(&args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn codegen(args: &CodegenArgs) -> Result<()> {
    let manifest = read_manifest(&args.input)?;

    let options = CodegenOptions {
        endpoint: args.endpoint.clone(),
        with_dataloader: args.dataloader,
    };
    let client =
        generate_client(&manifest.methods, &options).context("Failed to generate client code")?;

    fs::write(&args.output, &client.code)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let out_path = fs::canonicalize(&args.output).unwrap_or_else(|_| args.output.clone());
    println!(
        "Wrote {} lines of code to {}",
        client.line_count(),
        out_path.display()
    );
    Ok(())
}

fn read_manifest(path: &Path) -> Result<SpecManifest> {
    if !path.exists() {
        bail!("The input file doesn't exist: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("The input file is not valid JSON: {}", path.display()))?;

    if document.is_null() {
        bail!("The input file has no manifest: {}", path.display());
    }

    serde_json::from_value(document)
        .with_context(|| format!("The input file isn't a spec manifest: {}", path.display()))
}
