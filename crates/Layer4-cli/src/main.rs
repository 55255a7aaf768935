//! Codepad CLI - Main entry point

mod cli;
mod editor;
mod init;
mod tasks;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Codepad - task board and Python editor for the terminal
#[derive(Parser, Debug)]
#[command(name = "codepad")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the task service (overrides env and config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Python interpreter to run editor code with
    #[arg(long, global = true)]
    python: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage tasks on the task service
    Tasks {
        #[command(subcommand)]
        action: tasks::TaskCommand,
    },
    /// Run Python code: a file, `-` for stdin, or an interactive prompt
    Editor {
        /// Source file to run (omit for the interactive prompt)
        file: Option<PathBuf>,

        /// Print the execution outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write a default project config to ./.codepad/config.json
        #[arg(long)]
        init: bool,

        /// With --init, write the user-wide config instead
        #[arg(long, requires = "init")]
        global: bool,

        /// Overwrite an existing project config
        #[arg(short, long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so captured program output stays clean on stdout
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Command::Config {
        init: true,
        global,
        force,
    } = &args.command
    {
        init::init_config(*global, *force)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli::load_config(args.api_url.as_deref(), args.python.as_deref())?;

    match args.command {
        Command::Tasks { action } => tasks::run(&config, action).await,
        Command::Editor { file, json } => editor::run(&config, file.as_deref(), json).await,
        Command::Config { .. } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
