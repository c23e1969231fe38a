//! Arbor CLI
//!
//! Smoke-test tool for handle trees. Serves a scripted object model through
//! the in-memory provider, walks a property path and reports what was read
//! and the order handles were released in.

use anyhow::Result;
use arbor_core::TreeConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod path;

use commands::{tree, walk};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Arbor - walk handle trees served from scripted object models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Tree config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a path of children from a root and read properties on the last one
    Walk(walk::WalkArgs),

    /// Print the object graph of a model
    Tree {
        /// Object model (TOML)
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => TreeConfig::load_from_file(path)?,
        None => TreeConfig::default(),
    };

    match cli.command {
        Commands::Walk(args) => walk::run(args, config)?,
        Commands::Tree { model } => tree::run(&model)?,
    }

    Ok(())
}
