//! Flat file index for name search.
//!
//! The index is built straight from the manifest rather than from the tree,
//! so it stays usable even if tree synthesis is skipped.

use super::model::{FileEntry, Manifest};

/// Every file in a manifest, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    entries: Vec<FileEntry>,
}

impl SearchIndex {
    /// Flatten the root files and every directory's files.
    pub fn build(manifest: &Manifest) -> Self {
        Self {
            entries: manifest.files().cloned().collect(),
        }
    }

    /// All indexed entries.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring search on file names.
    ///
    /// Surrounding whitespace in the query is ignored. An empty query returns
    /// the whole index, which is what clearing a search box should show.
    pub fn search(&self, query: &str) -> Vec<&FileEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().collect();
        }

        self.entries
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DirRecord;
    use proptest::prelude::*;

    fn sample() -> Manifest {
        Manifest {
            root_files: vec![FileEntry::new("Syllabus.PDF", "Syllabus.PDF", 10)],
            dirs: vec![
                DirRecord {
                    path: "z/deep".to_string(),
                    name: "deep".to_string(),
                    files: vec![FileEntry::new("final.pdf", "z/deep/final.pdf", 20)],
                },
                DirRecord {
                    path: "a".to_string(),
                    name: "a".to_string(),
                    files: vec![
                        FileEntry::new("midterm.docx", "a/midterm.docx", 30),
                        FileEntry::new("Final-answers.pdf", "a/Final-answers.pdf", 40),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_index_preserves_manifest_order() {
        let index = SearchIndex::build(&sample());
        let paths: Vec<_> = index.entries().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Syllabus.PDF", "z/deep/final.pdf", "a/midterm.docx", "a/Final-answers.pdf"]
        );
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let index = SearchIndex::build(&sample());
        assert_eq!(index.search("").len(), 4);
        assert_eq!(index.search("   ").len(), 4);
    }

    #[test]
    fn test_search_is_case_insensitive_and_stable() {
        let index = SearchIndex::build(&sample());
        let hits: Vec<_> = index.search("FINAL").iter().map(|f| f.path.as_str()).collect();
        assert_eq!(hits, vec!["z/deep/final.pdf", "a/Final-answers.pdf"]);
    }

    #[test]
    fn test_search_matches_names_not_paths() {
        let index = SearchIndex::build(&sample());
        assert!(index.search("deep").is_empty());
    }

    #[test]
    fn test_no_results() {
        let index = SearchIndex::build(&sample());
        assert!(index.search("nothing-like-this").is_empty());
    }

    proptest! {
        #[test]
        fn prop_empty_query_is_identity(names in proptest::collection::vec("[a-zA-Z0-9._-]{1,12}", 0..20)) {
            let manifest = Manifest {
                root_files: names.iter().map(|n| FileEntry::new(n.clone(), n.clone(), 1)).collect(),
                dirs: Vec::new(),
            };
            let index = SearchIndex::build(&manifest);
            let all: Vec<_> = index.search("").into_iter().cloned().collect();
            prop_assert_eq!(all, manifest.root_files);
        }

        #[test]
        fn prop_results_contain_query(
            names in proptest::collection::vec("[a-zA-Z]{1,8}", 0..20),
            query in "[a-zA-Z]{1,3}",
        ) {
            let manifest = Manifest {
                root_files: names.iter().map(|n| FileEntry::new(n.clone(), n.clone(), 1)).collect(),
                dirs: Vec::new(),
            };
            let index = SearchIndex::build(&manifest);
            let hits = index.search(&query);
            let needle = query.to_lowercase();

            for hit in &hits {
                prop_assert!(hit.name.to_lowercase().contains(&needle));
            }
            let expected = names.iter().filter(|n| n.to_lowercase().contains(&needle)).count();
            prop_assert_eq!(hits.len(), expected);
        }
    }
}
