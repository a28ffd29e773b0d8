//! Common types and utilities shared across CLI commands.

use std::sync::Arc;

use jnuexam::config::ConfigFile;
use jnuexam::download::{DownloadCoordinator, ReqwestTransport};
use jnuexam::manifest::Catalog;
use jnuexam::session::{RefreshOutcome, Session, SessionError};
use jnuexam::source::SourceTable;

use crate::error::CliError;
use crate::progress::TransferBar;

/// Load settings, falling back to defaults if the file is unreadable.
pub fn load_config() -> ConfigFile {
    match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            ConfigFile::default()
        }
    }
}

/// Build a session from settings. `--source` takes precedence over the
/// stored source.
pub fn open_session(config: &ConfigFile, source_override: Option<&str>) -> Result<Session, CliError> {
    let transport = ReqwestTransport::with_timeouts(
        config.network.connect_timeout(),
        config.network.read_timeout(),
    )
    .map_err(SessionError::from)?;

    let sources = SourceTable::builtin();
    if let Some(id) = source_override {
        if !sources.contains(id) {
            return Err(CliError::Config(format!(
                "Unknown source '{}'. Use 'jnuexam source list' to see available sources.",
                id
            )));
        }
    }

    let initial = source_override.or(config.source.current.as_deref());
    let coordinator = DownloadCoordinator::new(Arc::new(transport));
    Ok(Session::new(coordinator, sources, initial))
}

/// Fetch the manifest and return the installed catalog.
pub async fn load_catalog(session: &Session, show_progress: bool) -> Result<Arc<Catalog>, CliError> {
    let source = session.current_source();
    let mut bar = if show_progress {
        TransferBar::new(format!("Fetching file list from {}", source.display_name))
    } else {
        TransferBar::hidden()
    };

    match session.refresh(|p| bar.update(p)).await {
        Ok(RefreshOutcome::Applied(catalog)) => {
            bar.finish(format!(
                "Loaded {} files from {}",
                catalog.index().len(),
                source.display_name
            ));
            Ok(catalog)
        }
        Ok(RefreshOutcome::Discarded { .. }) => {
            bar.abandon();
            Err(CliError::Config("Source changed while loading the file list".to_string()))
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}
