//! The manifest, tree and search index for one refresh, kept together.

use super::model::{FileEntry, Manifest};
use super::search::SearchIndex;
use super::tree::{synthesize, DirNode};

/// Browsing structures derived from a single manifest.
///
/// A catalog is immutable. A refresh builds a fresh one and replaces the old
/// catalog wholesale, so a tree is never paired with another manifest's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    manifest: Manifest,
    tree: DirNode,
    index: SearchIndex,
}

impl Catalog {
    /// Synthesize the tree and build the index for `manifest`.
    pub fn build(manifest: Manifest) -> Self {
        let tree = synthesize(&manifest);
        let index = SearchIndex::build(&manifest);
        tracing::debug!(
            dirs = tree.dir_count(),
            files = index.len(),
            "built catalog"
        );
        Self {
            manifest,
            tree,
            index,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn tree(&self) -> &DirNode {
        &self.tree
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Look up a file by manifest path.
    pub fn find_file(&self, path: &str) -> Option<&FileEntry> {
        let path = path.trim_matches('/');
        self.tree
            .find_file(path)
            .or_else(|| self.index.entries().iter().find(|f| f.path == path))
    }

    /// Shorthand for [`SearchIndex::search`].
    pub fn search(&self, query: &str) -> Vec<&FileEntry> {
        self.index.search(query)
    }
}
