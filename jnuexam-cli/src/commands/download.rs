//! Download command.

use std::path::{Path, PathBuf};

use jnuexam::config::ConfigFile;
use jnuexam::download::TransferHandle;
use jnuexam::session::Session;

use super::common::load_catalog;
use crate::error::CliError;
use crate::progress::TransferBar;

/// Download the file at `path`.
///
/// Without `--output` the file goes to the configured download directory
/// under its own name. An existing directory given as `--output` is treated
/// the same way; anything else is the exact destination.
pub async fn run(
    session: &Session,
    config: &ConfigFile,
    path: &str,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    load_catalog(session, !quiet).await?;
    let entry = session.select(path)?;

    let handle = begin(session, config, output.as_deref())?;
    let mut bar = if quiet {
        TransferBar::hidden()
    } else {
        TransferBar::new(format!("{} ({})", entry.name, entry.display_size()))
    };

    match session.complete_download(handle, |p| bar.update(p)).await {
        Ok(saved) => {
            bar.finish(format!("Saved {}", entry.name));
            println!("{}", saved.display());
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}

fn begin(
    session: &Session,
    config: &ConfigFile,
    output: Option<&Path>,
) -> Result<TransferHandle<PathBuf>, CliError> {
    let handle = match output {
        Some(dest) if dest.is_dir() => session.begin_quick_download(dest)?,
        Some(dest) => session.begin_download(dest)?,
        None => session.begin_quick_download(&config.download.directory)?,
    };
    Ok(handle)
}
