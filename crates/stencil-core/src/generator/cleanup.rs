//! Post-merge cleanup hooks.
//!
//! Hooks run against cloned tables: reads see the original pipeline
//! output, writes and deletions accumulate in the clones and replace the
//! live tables only after every hook has returned. A failing hook aborts
//! the run.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::diff::blocks::{self, MergeBlock};
use crate::diff::changes::diff;

/// A cleanup callback mutating the merged output through [`CleanupContext`].
pub type CleanupHook =
    Arc<dyn Fn(&mut CleanupContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Mutable view over cloned merge/binary tables handed to cleanup hooks.
pub struct CleanupContext<'a> {
    original_merged: &'a IndexMap<String, Vec<MergeBlock>>,
    original_binary: &'a IndexMap<String, Vec<u8>>,
    merged: IndexMap<String, Option<Vec<MergeBlock>>>,
    binary: IndexMap<String, Option<Vec<u8>>>,
}

impl<'a> CleanupContext<'a> {
    fn new(
        merged: &'a IndexMap<String, Vec<MergeBlock>>,
        binary: &'a IndexMap<String, Vec<u8>>,
    ) -> Self {
        Self {
            original_merged: merged,
            original_binary: binary,
            merged: merged
                .iter()
                .map(|(path, blocks)| (path.clone(), Some(blocks.clone())))
                .collect(),
            binary: binary
                .iter()
                .map(|(path, bytes)| (path.clone(), Some(bytes.clone())))
                .collect(),
        }
    }

    fn occupied(&self, pathname: &str) -> bool {
        self.merged.get(pathname).is_some_and(|slot| slot.is_some())
            || self.binary.get(pathname).is_some_and(|slot| slot.is_some())
    }

    /// Insert a fresh text file; no-op when the path is already present.
    pub fn add_file(&mut self, pathname: &str, content: &str) {
        if self.occupied(pathname) {
            return;
        }
        self.merged.insert(
            pathname.to_string(),
            Some(blocks::to_blocks(&diff(content, None))),
        );
    }

    /// Alias of [`CleanupContext::add_file`].
    pub fn add_text_file(&mut self, pathname: &str, content: &str) {
        self.add_file(pathname, content);
    }

    /// Insert a fresh binary file; no-op when the path is already present.
    pub fn add_binary_file(&mut self, pathname: &str, bytes: Vec<u8>) {
        if self.occupied(pathname) {
            return;
        }
        self.binary.insert(pathname.to_string(), Some(bytes));
    }

    /// Mark entries deleted; the deletion commits after all hooks run.
    pub fn delete_files(&mut self, pathnames: &[&str]) {
        for pathname in pathnames {
            if let Some(slot) = self.merged.get_mut(*pathname) {
                *slot = None;
            }
            if let Some(slot) = self.binary.get_mut(*pathname) {
                *slot = None;
            }
        }
    }

    /// Presence in the original merge table.
    pub fn exists(&self, pathname: &str) -> bool {
        self.original_merged.contains_key(pathname)
    }

    /// Serialise an original merge entry, conflict fences included.
    pub fn get_text_file_content(&self, pathname: &str) -> Option<String> {
        self.original_merged
            .get(pathname)
            .map(|blocks| blocks::to_text(blocks))
    }

    /// Read an original binary entry.
    pub fn get_binary_file_buffer(&self, pathname: &str) -> Option<&[u8]> {
        self.original_binary
            .get(pathname)
            .map(|bytes| bytes.as_slice())
    }

    fn commit(
        self,
    ) -> (
        IndexMap<String, Vec<MergeBlock>>,
        IndexMap<String, Vec<u8>>,
    ) {
        (
            self.merged
                .into_iter()
                .filter_map(|(path, slot)| slot.map(|blocks| (path, blocks)))
                .collect(),
            self.binary
                .into_iter()
                .filter_map(|(path, slot)| slot.map(|bytes| (path, bytes)))
                .collect(),
        )
    }
}

/// Run hooks in declaration order and commit the surviving entries back
/// into the live tables.
pub fn run_cleanups(
    hooks: &[CleanupHook],
    merged: &mut IndexMap<String, Vec<MergeBlock>>,
    binary: &mut IndexMap<String, Vec<u8>>,
) -> anyhow::Result<()> {
    if hooks.is_empty() {
        return Ok(());
    }

    let mut context = CleanupContext::new(merged, binary);
    for hook in hooks {
        hook(&mut context)?;
    }
    let (committed_merged, committed_binary) = context.commit();
    *merged = committed_merged;
    *binary = committed_binary;
    Ok(())
}
