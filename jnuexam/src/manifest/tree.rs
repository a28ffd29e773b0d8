//! Directory tree synthesis.
//!
//! The manifest declares directories as a flat list that may skip ancestors
//! (`a/b/c` without `a/b`). Synthesis builds nodes in an arena keyed by full
//! path, creating any missing ancestor on the way down, and then converts the
//! arena into an owned tree with every level sorted by name.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::model::{FileEntry, Manifest};

/// Path separator used by manifest paths.
const SEPARATOR: char = '/';

/// A directory node in the synthesized tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNode {
    /// Last path segment (empty for the root).
    pub name: String,
    /// Slash-joined path from the root (empty for the root).
    pub full_path: String,
    /// Child directories, sorted by name (case-insensitive).
    pub children: Vec<DirNode>,
    /// Files in this directory, sorted by name (case-insensitive).
    pub files: Vec<FileEntry>,
}

impl DirNode {
    fn root() -> Self {
        Self {
            name: String::new(),
            full_path: String::new(),
            children: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Whether this is the tree root.
    pub fn is_root(&self) -> bool {
        self.full_path.is_empty()
    }

    /// Find a directory by its full path. An empty path yields this node.
    pub fn find_dir(&self, path: &str) -> Option<&DirNode> {
        let mut node = self;
        for segment in segments(path) {
            node = node.children.iter().find(|c| c.name == segment)?;
        }
        Some(node)
    }

    /// Find a file by its manifest path.
    pub fn find_file(&self, path: &str) -> Option<&FileEntry> {
        let (dir, _) = path.rsplit_once(SEPARATOR).unwrap_or(("", path));
        self.find_dir(dir)?.files.iter().find(|f| f.path == path)
    }

    /// Number of directory nodes below this one.
    pub fn dir_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.dir_count()).sum()
    }

    /// Number of files in this subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.children.iter().map(DirNode::file_count).sum::<usize>()
    }

    /// Sum of file sizes in this subtree.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum::<u64>()
            + self.children.iter().map(DirNode::total_size).sum::<u64>()
    }

    /// Depth-first, pre-order walk. The visitor receives each node and its
    /// depth (0 for this node).
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&DirNode, usize),
    {
        self.walk_inner(0, &mut visit);
    }

    fn walk_inner<F>(&self, depth: usize, visit: &mut F)
    where
        F: FnMut(&DirNode, usize),
    {
        visit(self, depth);
        for child in &self.children {
            child.walk_inner(depth + 1, visit);
        }
    }
}

/// Arena slot used while linking the tree.
struct ArenaNode {
    name: String,
    full_path: String,
    children: Vec<usize>,
    files: Vec<FileEntry>,
}

/// Index 0 is always the root.
struct Arena {
    nodes: Vec<ArenaNode>,
    by_path: HashMap<String, usize>,
}

impl Arena {
    fn new() -> Self {
        let mut by_path = HashMap::new();
        by_path.insert(String::new(), 0);
        Self {
            nodes: vec![ArenaNode {
                name: String::new(),
                full_path: String::new(),
                children: Vec::new(),
                files: Vec::new(),
            }],
            by_path,
        }
    }

    /// Return the node for `path`, creating it and any missing ancestors.
    fn ensure(&mut self, path: &str) -> usize {
        let mut parent = 0;
        let mut cumulative = String::new();

        for segment in segments(path) {
            if !cumulative.is_empty() {
                cumulative.push(SEPARATOR);
            }
            cumulative.push_str(segment);

            parent = match self.by_path.get(&cumulative) {
                Some(&idx) => idx,
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(ArenaNode {
                        name: segment.to_string(),
                        full_path: cumulative.clone(),
                        children: Vec::new(),
                        files: Vec::new(),
                    });
                    self.nodes[parent].children.push(idx);
                    self.by_path.insert(cumulative.clone(), idx);
                    idx
                }
            };
        }

        parent
    }

    fn into_tree(mut self) -> DirNode {
        let mut slots: Vec<Option<ArenaNode>> = self.nodes.drain(..).map(Some).collect();
        build_node(&mut slots, 0).unwrap_or_else(DirNode::root)
    }
}

fn build_node(slots: &mut [Option<ArenaNode>], idx: usize) -> Option<DirNode> {
    let node = slots.get_mut(idx)?.take()?;

    let mut children: Vec<DirNode> = node
        .children
        .iter()
        .filter_map(|&child| build_node(slots, child))
        .collect();
    children.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut files = node.files;
    files.sort_by(|a, b| compare_names(&a.name, &b.name));

    Some(DirNode {
        name: node.name,
        full_path: node.full_path,
        children,
        files,
    })
}

/// Case-insensitive name order, falling back to the exact name so that the
/// result does not depend on input order.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Non-empty path segments.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

fn depth(path: &str) -> usize {
    path.matches(SEPARATOR).count()
}

/// Build the directory tree for a manifest.
///
/// Directories are processed shallowest first (ties broken by path) so that
/// declared ancestors exist before their descendants. A repeated declaration
/// adds its files to the existing node.
pub fn synthesize(manifest: &Manifest) -> DirNode {
    let mut order: Vec<_> = manifest.dirs.iter().collect();
    order.sort_by(|a, b| {
        depth(&a.path)
            .cmp(&depth(&b.path))
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut arena = Arena::new();
    for record in order {
        let idx = arena.ensure(&record.path);
        arena.nodes[idx].files.extend(record.files.iter().cloned());
    }
    arena.nodes[0]
        .files
        .extend(manifest.root_files.iter().cloned());

    arena.into_tree()
}
