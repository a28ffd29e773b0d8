//! Mirror source resolution.
//!
//! Every mirror hosts the same file set. A [`Source`] names the manifest URL
//! for that mirror and the attribute key under which each file records its
//! download URL on that mirror.
//!
//! ```text
//! github      raw.githubusercontent.com   github_raw_url
//! gitee       gitee.com                   gitee_raw_url
//! cloudflare  jnuexam.xyz (R2 bucket)     cf_url          (default)
//! ```

mod list;

pub use list::SourceListError;

use std::fmt;

use thiserror::Error;

use crate::manifest::FileEntry;

/// Id of the source used when nothing else is configured.
pub const DEFAULT_SOURCE_ID: &str = "cloudflare";

/// A source id that is not present in the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source '{0}'")]
pub struct UnknownSource(pub String);

/// One mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Stable lowercase id, e.g. `github`.
    pub id: String,
    /// Name shown to users, e.g. `GitHub`.
    pub display_name: String,
    /// Where this mirror publishes the manifest.
    pub manifest_url: String,
    /// File attribute holding the download URL on this mirror.
    pub url_key: String,
}

impl Source {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        manifest_url: impl Into<String>,
        url_key: impl Into<String>,
    ) -> Self {
        Self {
            id: normalize_id(&id.into()),
            display_name: display_name.into(),
            manifest_url: manifest_url.into(),
            url_key: url_key.into(),
        }
    }

    /// Download URL for `entry` on this mirror.
    ///
    /// `None` means the mirror does not host the file. The URL key is tried
    /// first, then the bare source id.
    pub fn file_url<'a>(&self, entry: &'a FileEntry) -> Option<&'a str> {
        entry.url(&self.url_key).or_else(|| entry.url(&self.id))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Lookup table from source id to [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    sources: Vec<Source>,
    default_id: String,
}

impl Default for SourceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SourceTable {
    /// The mirrors the archive is published to.
    pub fn builtin() -> Self {
        Self {
            sources: vec![
                Source::new(
                    "github",
                    "GitHub",
                    "https://raw.githubusercontent.com/gubaiovo/JNU-EXAM/main/directory_structure.json",
                    "github_raw_url",
                ),
                Source::new(
                    "gitee",
                    "Gitee",
                    "https://gitee.com/gubaiovo/jnu-exam/raw/main/directory_structure.json",
                    "gitee_raw_url",
                ),
                Source::new(
                    "cloudflare",
                    "CloudFlare R2",
                    "https://jnuexam.xyz/directory_structure.json",
                    "cf_url",
                ),
            ],
            default_id: DEFAULT_SOURCE_ID.to_string(),
        }
    }

    /// Build a table from explicit sources.
    ///
    /// If `default_id` is not among them, the first source becomes the
    /// default. Returns `None` for an empty list.
    pub fn new(sources: Vec<Source>, default_id: &str) -> Option<Self> {
        let first = sources.first()?.id.clone();
        let wanted = normalize_id(default_id);
        let default_id = if sources.iter().any(|s| s.id == wanted) {
            wanted
        } else {
            first
        };
        Some(Self {
            sources,
            default_id,
        })
    }

    /// Look up a source by id (case-insensitive).
    pub fn resolve(&self, id: &str) -> Result<&Source, UnknownSource> {
        let wanted = normalize_id(id);
        self.sources
            .iter()
            .find(|s| s.id == wanted)
            .ok_or_else(|| UnknownSource(id.to_string()))
    }

    /// Look up a source, falling back to the default for unknown ids.
    pub fn resolve_or_default(&self, id: &str) -> &Source {
        match self.resolve(id) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(error = %err, fallback = %self.default_id, "falling back to default source");
                self.default_source()
            }
        }
    }

    /// The configured default source.
    pub fn default_source(&self) -> &Source {
        self.sources
            .iter()
            .find(|s| s.id == self.default_id)
            .unwrap_or(&self.sources[0])
    }

    /// Download URL for `entry` on the mirror `id`.
    pub fn file_url<'a>(&self, entry: &'a FileEntry, id: &str) -> Result<Option<&'a str>, UnknownSource> {
        Ok(self.resolve(id)?.file_url(entry))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}
