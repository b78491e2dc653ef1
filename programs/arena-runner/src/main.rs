//! Arena Runner
//!
//! Reads a JSON run description from a file (or stdin with `-`), runs it on
//! the engine and prints the JSON result to stdout. Logs go to stderr and
//! follow `RUST_LOG`.

mod request;

use std::io::Read;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use request::RunRequest;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: arena-runner <run.json | ->");
    };

    let json = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?
    };

    let output = RunRequest::from_json(&json)?.execute()?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
