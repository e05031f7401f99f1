//! CLI module — command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod common;
pub mod config;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "apphost")]
#[command(version)]
#[command(about = "Application host: wires modules and drives runnables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that loads configuration.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file (.json, .toml, .yaml); defaults to ~/.apphost/config.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Override a value, e.g. --set log.level=debug (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// Read PREFIX_A__B=value environment variables as a.b overrides
    #[arg(long, value_name = "PREFIX")]
    pub env_prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host and run until Ctrl-C
    Run {
        #[command(flatten)]
        args: ConfigArgs,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        args: ConfigArgs,
        /// Only print the value at this dotted path
        #[arg(long)]
        path: Option<String>,
    },
    /// Show version information
    Version,
}

/// Entry point for the CLI — called from main().
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Run { args }) => {
            run::cmd_run(args).await?;
        }
        Some(Commands::Config { args, path }) => {
            config::cmd_config(args, path)?;
        }
    }

    Ok(())
}

/// Display version information
fn cmd_version() {
    println!("apphost {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Application host for modules and runnables");
}
