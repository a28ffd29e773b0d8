//! JNU-EXAM downloader command-line interface.
//!
//! ```text
//! jnuexam tree [PATH] [--depth N] [--dirs-only]
//! jnuexam search <QUERY>
//! jnuexam info <PATH>
//! jnuexam download <PATH> [-o OUTPUT]
//! jnuexam source get|set <ID>|list
//! jnuexam config get|set|list|path
//! ```

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use jnuexam::logging::{self, LoggingConfig};
use tracing::Level;

use commands::common::{load_config, open_session};
use commands::config::ConfigCommands;
use commands::source::SourceCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "jnuexam", version, about = "Browse and download files from the JNU-EXAM archive")]
struct Cli {
    /// Use this source for this run only (github, gitee, cloudflare)
    #[arg(short, long, global = true)]
    source: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write logs to this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the directory tree
    Tree {
        /// Start below this directory
        path: Option<String>,

        /// Maximum depth to print
        #[arg(short, long)]
        depth: Option<usize>,

        /// Only print directories
        #[arg(long)]
        dirs_only: bool,
    },

    /// Find files by name (case-insensitive)
    Search {
        /// Text to look for in file names
        query: String,
    },

    /// Show a file's size and which sources host it
    Info {
        /// File path as shown by `tree` or `search`
        path: String,
    },

    /// Download a file
    Download {
        /// File path as shown by `tree` or `search`
        path: String,

        /// Destination file or directory (default: download.directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change the download source
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// View or modify settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = LoggingConfig {
        level: if cli.verbose { Level::DEBUG } else { Level::WARN },
        log_dir: cli.log_dir.clone(),
    };
    let _guard = match logging::init(logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow().bold(), e);
            None
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config();

    match cli.command {
        Commands::Source { command } => commands::source::run(command, &mut config),
        Commands::Config { command } => commands::config::run(command, &mut config),
        Commands::Tree {
            path,
            depth,
            dirs_only,
        } => {
            let session = open_session(&config, cli.source.as_deref())?;
            commands::browse::run_tree(&session, path.as_deref(), depth, !dirs_only).await
        }
        Commands::Search { query } => {
            let session = open_session(&config, cli.source.as_deref())?;
            commands::browse::run_search(&session, &query).await
        }
        Commands::Info { path } => {
            let session = open_session(&config, cli.source.as_deref())?;
            commands::browse::run_info(&session, &path).await
        }
        Commands::Download { path, output } => {
            let session = open_session(&config, cli.source.as_deref())?;
            commands::download::run(&session, &config, &path, output, cli.quiet).await
        }
    }
}
