//! parlance-shell: read command lines from stdin and run them against the demo tree.
//!
//! ```text
//! $ echo 'greet --times 2 world' | parlance-shell
//! hello, world
//! hello, world
//! $ printf 'mode set v\ngr' | parlance-shell --complete
//! VERBOSE
//! greet
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`, e.g.
//! `RUST_LOG=parlance=debug` to watch routing and binding.

mod demo;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use parlance::{CommandSource, Invocation, Settings};
use tracing_subscriber::EnvFilter;

use crate::demo::{ConsoleSource, ShellState};

/// Line-oriented console for the parlance demo commands.
#[derive(Parser, Debug)]
#[command(name = "parlance-shell", version, about)]
struct Cli {
    /// Settings file, JSON if it ends in `.json`, YAML otherwise
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print completions for each line instead of executing it
    #[arg(long)]
    complete: bool,

    /// Grant a permission to the console source (repeatable, `*` for all)
    #[arg(long = "allow", value_name = "PERMISSION")]
    permissions: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    tracing::debug!(?settings, "settings loaded");

    let state = Arc::new(ShellState::default());
    let tree = demo::build_tree(settings, Arc::clone(&state))
        .context("failed to build the command tree")?;

    let source: Arc<dyn CommandSource> = Arc::new(
        cli.permissions
            .iter()
            .fold(ConsoleSource::from_env(), |source, node| source.with_permission(node.as_str())),
    );

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;

        if cli.complete {
            writeln!(out, "{}", tree.complete_line(Arc::clone(&source), &line).join(" "))?;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let mut invocation = Invocation::new(Arc::clone(&source), &line);
        match tree.execute(&mut invocation) {
            Ok(true) => {}
            Ok(false) => match invocation.command() {
                Some(command) => writeln!(out, "usage: {}", command.usage())?,
                None => writeln!(out, "nothing to do")?,
            },
            Err(err) => writeln!(out, "error: {}", err)?,
        }
        for produced in state.drain() {
            writeln!(out, "{}", produced)?;
        }
        if state.is_stopped() {
            break;
        }
    }

    Ok(())
}

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let settings = if path.extension().is_some_and(|ext| ext == "json") {
        Settings::from_json_str(&text)
    } else {
        Settings::from_yaml_str(&text)
    };
    settings.with_context(|| format!("invalid settings in {}", path.display()))
}
