//! Typed manifest model and JSON ingestion.
//!
//! The published manifest is a flat document:
//!
//! ```text
//! {
//!   "dirs":  [ { "path": "a/b", "name": "b", "files": [ <file>, ... ] }, ... ],
//!   "files": [ <file>, ... ]
//! }
//!
//! <file> = { "name": "x.pdf", "path": "a/b/x.pdf", "size": 2097152,
//!            "github_raw_url": "...", "gitee_raw_url": "...", "cf_url": "..." }
//! ```
//!
//! Per-mirror URLs arrive as flat `*_url` keys. A nested `urls` object is also
//! accepted and merged into the same map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ManifestError, ManifestResult};
use super::format_size;

/// Suffix shared by every flat per-mirror URL key.
const URL_KEY_SUFFIX: &str = "_url";

/// A single downloadable file listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// File name as shown to the user.
    pub name: String,
    /// Slash-separated path relative to the manifest root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Download URLs keyed by mirror URL key (or bare source id).
    pub urls: BTreeMap<String, String>,
}

impl FileEntry {
    /// Create an entry without any mirror URLs.
    pub fn new(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            urls: BTreeMap::new(),
        }
    }

    /// Add a mirror URL under the given key.
    pub fn with_url(mut self, key: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(key.into(), url.into());
        self
    }

    /// Look up the URL stored under `key`.
    pub fn url(&self, key: &str) -> Option<&str> {
        self.urls.get(key).map(String::as_str)
    }

    /// Human-readable size, e.g. `2.00 MB`.
    pub fn display_size(&self) -> String {
        format_size(self.size)
    }

    /// Lowercase file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// One directory as declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub path: String,
    pub name: String,
    pub files: Vec<FileEntry>,
}

/// The parsed manifest for one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Files attached directly to the manifest root.
    pub root_files: Vec<FileEntry>,
    /// Flat directory list, in manifest order.
    pub dirs: Vec<DirRecord>,
}

impl Manifest {
    /// Parse a manifest from raw bytes.
    pub fn parse(bytes: &[u8]) -> ManifestResult<Self> {
        let raw: RawManifest =
            serde_json::from_slice(bytes).map_err(|e| ManifestError::Malformed(e.to_string()))?;
        Ok(raw.into())
    }

    /// Parse a manifest from already-decoded text.
    pub fn parse_str(text: &str) -> ManifestResult<Self> {
        Self::parse(text.as_bytes())
    }

    /// Every file in manifest order: root files first, then each directory's.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.root_files
            .iter()
            .chain(self.dirs.iter().flat_map(|d| d.files.iter()))
    }

    /// Total number of files across the root and all directories.
    pub fn file_count(&self) -> usize {
        self.root_files.len() + self.dirs.iter().map(|d| d.files.len()).sum::<usize>()
    }
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    dirs: Option<Vec<RawDir>>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
}

#[derive(Deserialize)]
struct RawDir {
    path: String,
    name: String,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
}

#[derive(Deserialize)]
struct RawFile {
    name: String,
    path: String,
    size: u64,
    #[serde(default)]
    urls: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl From<RawManifest> for Manifest {
    fn from(raw: RawManifest) -> Self {
        Self {
            root_files: convert_files(raw.files),
            dirs: raw
                .dirs
                .unwrap_or_default()
                .into_iter()
                .map(|d| DirRecord {
                    path: d.path,
                    name: d.name,
                    files: convert_files(d.files),
                })
                .collect(),
        }
    }
}

impl From<RawFile> for FileEntry {
    fn from(raw: RawFile) -> Self {
        let mut urls = raw.urls.unwrap_or_default();
        for (key, value) in raw.extra {
            if !key.ends_with(URL_KEY_SUFFIX) {
                continue;
            }
            if let serde_json::Value::String(url) = value {
                if !url.is_empty() {
                    urls.entry(key).or_insert(url);
                }
            }
        }

        Self {
            name: raw.name,
            path: raw.path,
            size: raw.size,
            urls,
        }
    }
}

fn convert_files(files: Option<Vec<RawFile>>) -> Vec<FileEntry> {
    files
        .unwrap_or_default()
        .into_iter()
        .map(FileEntry::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "dirs": [
            {
                "path": "math/calculus",
                "name": "calculus",
                "files": [
                    {
                        "name": "final-2023.pdf",
                        "path": "math/calculus/final-2023.pdf",
                        "size": 2097152,
                        "github_raw_url": "https://gh.example/final-2023.pdf",
                        "gitee_raw_url": "https://gitee.example/final-2023.pdf",
                        "cf_url": "https://cf.example/final-2023.pdf"
                    }
                ]
            },
            { "path": "physics", "name": "physics" }
        ],
        "files": [
            { "name": "README.md", "path": "README.md", "size": 12, "cf_url": "https://cf.example/README.md" }
        ]
    }"#;

    #[test]
    fn test_parse_sample_manifest() {
        let manifest = Manifest::parse_str(SAMPLE).unwrap();

        assert_eq!(manifest.root_files.len(), 1);
        assert_eq!(manifest.dirs.len(), 2);
        assert_eq!(manifest.file_count(), 2);

        let file = &manifest.dirs[0].files[0];
        assert_eq!(file.name, "final-2023.pdf");
        assert_eq!(file.size, 2_097_152);
        assert_eq!(file.urls.len(), 3);
        assert_eq!(file.url("cf_url"), Some("https://cf.example/final-2023.pdf"));
        assert!(manifest.dirs[1].files.is_empty());
    }

    #[test]
    fn test_nested_urls_object_is_merged() {
        let json = r#"{"files": [{"name": "x.pdf", "path": "x.pdf", "size": 1,
            "urls": {"github": "http://u1"}, "gitee_raw_url": "http://u2"}]}"#;
        let manifest = Manifest::parse_str(json).unwrap();
        let file = &manifest.root_files[0];

        assert_eq!(file.url("github"), Some("http://u1"));
        assert_eq!(file.url("gitee_raw_url"), Some("http://u2"));
    }

    #[test]
    fn test_non_url_extra_keys_are_ignored() {
        let json = r#"{"files": [{"name": "x", "path": "x", "size": 1, "mtime": 17, "note": "hi"}]}"#;
        let manifest = Manifest::parse_str(json).unwrap();
        assert!(manifest.root_files[0].urls.is_empty());
    }

    #[test]
    fn test_empty_object_is_empty_manifest() {
        let manifest = Manifest::parse_str("{}").unwrap();
        assert_eq!(manifest, Manifest::default());
    }

    #[test]
    fn test_null_lists_are_empty() {
        let manifest =
            Manifest::parse_str(r#"{"dirs": [{"path": "a", "name": "a", "files": null}], "files": null}"#)
                .unwrap();
        assert!(manifest.root_files.is_empty());
        assert!(manifest.dirs[0].files.is_empty());
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = Manifest::parse(b"{not json").unwrap_err();
        assert!(matches!(err, ManifestError::Malformed(_)));
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert!(Manifest::parse_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_rejects_negative_size() {
        let json = r#"{"files": [{"name": "x", "path": "x", "size": -5}]}"#;
        assert!(Manifest::parse_str(json).is_err());
    }

    #[test]
    fn test_rejects_fractional_size() {
        let json = r#"{"files": [{"name": "x", "path": "x", "size": 1.5}]}"#;
        assert!(Manifest::parse_str(json).is_err());
    }

    #[test]
    fn test_rejects_missing_file_fields() {
        for json in [
            r#"{"files": [{"path": "x", "size": 1}]}"#,
            r#"{"files": [{"name": "x", "size": 1}]}"#,
            r#"{"files": [{"name": "x", "path": "x"}]}"#,
        ] {
            assert!(Manifest::parse_str(json).is_err(), "accepted {}", json);
        }
    }

    #[test]
    fn test_rejects_missing_dir_fields() {
        assert!(Manifest::parse_str(r#"{"dirs": [{"name": "a"}]}"#).is_err());
        assert!(Manifest::parse_str(r#"{"dirs": [{"path": "a"}]}"#).is_err());
    }

    #[test]
    fn test_rejects_wrong_field_types() {
        assert!(Manifest::parse_str(r#"{"dirs": [{"path": 3, "name": "a"}]}"#).is_err());
        assert!(Manifest::parse_str(r#"{"files": [{"name": "x", "path": "x", "size": "1"}]}"#).is_err());
    }

    #[test]
    fn test_files_iterates_in_manifest_order() {
        let manifest = Manifest::parse_str(SAMPLE).unwrap();
        let names: Vec<_> = manifest.files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "final-2023.pdf"]);
    }

    #[test]
    fn test_extension() {
        assert_eq!(FileEntry::new("a.PDF", "a.PDF", 0).extension().as_deref(), Some("pdf"));
        assert_eq!(FileEntry::new(".bashrc", ".bashrc", 0).extension(), None);
        assert_eq!(FileEntry::new("Makefile", "Makefile", 0).extension(), None);
    }
}
