//! In-memory directory tree for decompressed template archives.
//!
//! A flat map from absolute path to node, not a linked tree. Enumeration
//! order is lexicographic over full paths, which is what gives the pipeline
//! its deterministic traversal.

use std::collections::BTreeMap;

/// Root prefix for the main template subtree.
pub const MAIN_PREFIX: &str = "/template/main";

/// Root prefix for extend template subtrees; each extend lives under
/// `/template/extends/<id>`.
pub const EXTENDS_PREFIX: &str = "/template/extends";

/// Leading bytes inspected by the binary-content heuristic.
const BINARY_SNIFF_LEN: usize = 8000;

#[derive(Debug, Clone)]
enum Node {
    Directory,
    File(Vec<u8>),
}

/// Path-keyed virtual filesystem holding downloaded template trees.
#[derive(Debug, Default)]
pub struct VirtualTree {
    nodes: BTreeMap<String, Node>,
}

/// One entity yielded by recursive enumeration.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub absolute_path: String,
    /// Final path segment.
    pub name: String,
    pub is_directory: bool,
    pub is_binary: bool,
    /// Directory part relative to the enumerated prefix, `""` at the root.
    pub relative_directory_path: String,
}

impl VirtualTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise to `/`-rooted form without a trailing slash.
    fn normalize(path: &str) -> String {
        let trimmed = path.trim_matches('/');
        format!("/{trimmed}")
    }

    /// Create the directory and every missing ancestor.
    pub fn mkdir_all(&mut self, path: &str) {
        let normalized = Self::normalize(path);
        let mut current = String::new();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            self.nodes
                .entry(current.clone())
                .or_insert(Node::Directory);
        }
    }

    /// Write a file, creating parent directories as needed. An existing
    /// file at the path is replaced.
    pub fn write_file(&mut self, path: &str, bytes: Vec<u8>) {
        let normalized = Self::normalize(path);
        if let Some((parent, _)) = normalized.rsplit_once('/') {
            if !parent.is_empty() {
                self.mkdir_all(parent);
            }
        }
        self.nodes.insert(normalized, Node::File(bytes));
    }

    pub fn read_file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(&Self::normalize(path)) {
            Some(Node::File(bytes)) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(&Self::normalize(path))
    }

    pub fn is_file(&self, path: &str) -> bool {
        matches!(self.nodes.get(&Self::normalize(path)), Some(Node::File(_)))
    }

    /// Enumerate everything strictly under `prefix`, in lexicographic path
    /// order.
    pub fn entries_under(&self, prefix: &str) -> Vec<TreeEntry> {
        let root = Self::normalize(prefix);
        let subtree = format!("{root}/");

        self.nodes
            .range(subtree.clone()..)
            .take_while(|(path, _)| path.starts_with(&subtree))
            .map(|(path, node)| {
                let relative = &path[subtree.len()..];
                let (relative_dir, name) = match relative.rsplit_once('/') {
                    Some((dir, name)) => (dir.to_string(), name.to_string()),
                    None => (String::new(), relative.to_string()),
                };
                let (is_directory, is_binary) = match node {
                    Node::Directory => (true, false),
                    Node::File(bytes) => (false, looks_binary(bytes)),
                };
                TreeEntry {
                    absolute_path: path.clone(),
                    name,
                    is_directory,
                    is_binary,
                    relative_directory_path: relative_dir,
                }
            })
            .collect()
    }
}

/// NUL byte in the leading region means binary.
fn looks_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(BINARY_SNIFF_LEN)
        .any(|&byte| byte == 0)
}
