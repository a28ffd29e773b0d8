//! Source (mirror) selection commands.

use clap::Subcommand;
use jnuexam::config::ConfigFile;
use jnuexam::source::SourceTable;

use crate::error::CliError;

/// Source subcommands.
#[derive(Debug, Subcommand)]
pub enum SourceCommands {
    /// Show the current source
    Get,

    /// Switch to another source and remember it
    Set {
        /// Source id (github, gitee, cloudflare)
        id: String,
    },

    /// List available sources
    List,
}

/// Run a source subcommand.
pub fn run(command: SourceCommands, config: &mut ConfigFile) -> Result<(), CliError> {
    let sources = SourceTable::builtin();
    match command {
        SourceCommands::Get => {
            let source = current(&sources, config);
            println!("{}", source);
            Ok(())
        }
        SourceCommands::Set { id } => {
            let source = sources.resolve(&id).map_err(|e| {
                CliError::Config(format!(
                    "{}. Use 'jnuexam source list' to see available sources.",
                    e
                ))
            })?;
            config.source.current = Some(source.id.clone());
            config.save()?;
            println!("Source set to {}", source);
            Ok(())
        }
        SourceCommands::List => {
            print!("{}", render_list(&sources, config));
            Ok(())
        }
    }
}

fn current<'a>(sources: &'a SourceTable, config: &ConfigFile) -> &'a jnuexam::source::Source {
    match config.source.current.as_deref() {
        Some(id) => sources.resolve_or_default(id),
        None => sources.default_source(),
    }
}

fn render_list(sources: &SourceTable, config: &ConfigFile) -> String {
    let active = current(sources, config).id.clone();
    let default = sources.default_source().id.clone();
    let mut out = String::new();
    for source in sources.iter() {
        let marker = if source.id == active { "*" } else { " " };
        let note = if source.id == default { " (default)" } else { "" };
        out.push_str(&format!(
            "{} {:<11} {}{}\n    {}\n",
            marker, source.id, source.display_name, note, source.manifest_url
        ));
    }
    out
}
