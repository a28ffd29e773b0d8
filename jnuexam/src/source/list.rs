//! Remote source list parsing.
//!
//! Publishers can announce mirrors with a small JSON document:
//!
//! ```text
//! {
//!   "Github":        { "json_url": "https://...", "file_key": "github_raw_url" },
//!   "CloudFlare R2": { "dir_url":  "https://...", "file_key": "cf_url" }
//! }
//! ```
//!
//! Older lists use `dir_url` for the manifest location; it is used whenever
//! `json_url` is empty or absent.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use super::{Source, SourceTable};

/// Errors raised while parsing a remote source list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceListError {
    /// The document is not a JSON object of source records.
    #[error("malformed source list: {0}")]
    Malformed(String),

    /// A source has neither `json_url` nor `dir_url`.
    #[error("source '{0}' has no manifest URL")]
    MissingManifestUrl(String),

    /// A source has no `file_key`.
    #[error("source '{0}' has no file key")]
    MissingFileKey(String),

    /// The list contains no sources.
    #[error("source list is empty")]
    Empty,
}

#[derive(Deserialize)]
struct SourceRecord {
    #[serde(default)]
    json_url: String,
    #[serde(default)]
    file_key: String,
    #[serde(default)]
    dir_url: Option<String>,
}

impl SourceTable {
    /// Parse a remote source list.
    ///
    /// Display names are the list's keys; ids are their lowercase form with
    /// spaces removed. `default_id` picks the default source when present.
    pub fn from_source_list(bytes: &[u8], default_id: &str) -> Result<Self, SourceListError> {
        let records: BTreeMap<String, SourceRecord> =
            serde_json::from_slice(bytes).map_err(|e| SourceListError::Malformed(e.to_string()))?;

        let mut sources = Vec::with_capacity(records.len());
        for (name, record) in records {
            let manifest_url = if record.json_url.is_empty() {
                record
                    .dir_url
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| SourceListError::MissingManifestUrl(name.clone()))?
            } else {
                record.json_url
            };
            if record.file_key.is_empty() {
                return Err(SourceListError::MissingFileKey(name));
            }

            let id: String = name.split_whitespace().collect();
            sources.push(Source::new(id, name, manifest_url, record.file_key));
        }

        SourceTable::new(sources, default_id).ok_or(SourceListError::Empty)
    }
}
