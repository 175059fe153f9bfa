//! Per-file policy resolved from template-declared glob lists.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScaffoldError};

/// Glob lists a template declares for file handling. Absent lists behave
/// as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilePolicy {
    #[serde(default)]
    pub merge: Vec<String>,

    #[serde(default)]
    pub delete: Vec<String>,
}

impl FilePolicy {
    /// Fold another policy's globs into this one.
    pub fn extend_from(&mut self, other: &FilePolicy) {
        self.merge.extend(other.merge.iter().cloned());
        self.delete.extend(other.delete.iter().cloned());
    }
}

/// Which policy list to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Merge,
    Delete,
}

/// Compiled matcher over the union of every contributing template's policy.
#[derive(Debug)]
pub struct GlobMatcher {
    merge: GlobSet,
    delete: GlobSet,
}

impl GlobMatcher {
    pub fn new(policy: &FilePolicy) -> Result<Self> {
        Ok(Self {
            merge: compile(&policy.merge)?,
            delete: compile(&policy.delete)?,
        })
    }

    /// True when any glob of the kind's list matches the pathname.
    pub fn matches(&self, pathname: &str, kind: PolicyKind) -> bool {
        match kind {
            PolicyKind::Merge => self.merge.is_match(pathname),
            PolicyKind::Delete => self.delete.is_match(pathname),
        }
    }
}

fn compile(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ScaffoldError::Template(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ScaffoldError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(merge: &[&str], delete: &[&str]) -> FilePolicy {
        FilePolicy {
            merge: merge.iter().map(|s| s.to_string()).collect(),
            delete: delete.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_merge_and_delete_match_independently() {
        let matcher = GlobMatcher::new(&policy(&["src/**/*.rs"], &["**/*.tmp"])).unwrap();

        assert!(matcher.matches("src/deep/mod.rs", PolicyKind::Merge));
        assert!(!matcher.matches("src/deep/mod.rs", PolicyKind::Delete));
        assert!(matcher.matches("build/cache.tmp", PolicyKind::Delete));
        assert!(!matcher.matches("build/cache.tmp", PolicyKind::Merge));
    }

    #[test]
    fn test_empty_lists_match_nothing() {
        let matcher = GlobMatcher::new(&FilePolicy::default()).unwrap();
        assert!(!matcher.matches("anything.txt", PolicyKind::Merge));
        assert!(!matcher.matches("anything.txt", PolicyKind::Delete));
    }

    #[test]
    fn test_any_glob_in_the_list_matches() {
        let matcher =
            GlobMatcher::new(&policy(&["package.json", "*.lock"], &[])).unwrap();
        assert!(matcher.matches("package.json", PolicyKind::Merge));
        assert!(matcher.matches("yarn.lock", PolicyKind::Merge));
        assert!(!matcher.matches("README.md", PolicyKind::Merge));
    }

    #[test]
    fn test_invalid_glob_is_a_template_error() {
        let result = GlobMatcher::new(&policy(&["a[unclosed"], &[]));
        assert!(matches!(result, Err(ScaffoldError::Template(_))));
    }

    #[test]
    fn test_policies_union_across_templates() {
        let mut combined = policy(&["a.txt"], &[]);
        combined.extend_from(&policy(&["b.txt"], &["*.bak"]));

        let matcher = GlobMatcher::new(&combined).unwrap();
        assert!(matcher.matches("a.txt", PolicyKind::Merge));
        assert!(matcher.matches("b.txt", PolicyKind::Merge));
        assert!(matcher.matches("old.bak", PolicyKind::Delete));
    }
}
