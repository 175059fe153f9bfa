//! Interactive conflict resolution over the merge table.
//!
//! Conflict blocks are queued in merge-table order (pathname insertion
//! order, then block index) and fed to the solver one at a time. A
//! deferred item goes back to the head of the queue.

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::diff::blocks::{self, MergeBlock};

/// What the solver decided for one conflict block.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Defer; the block comes back later.
    Skipped,
    /// Keep the conflict, fence and all, but stop asking about it. The
    /// pathname stays in the final conflict report.
    Ignored,
    /// Replace the block; forced to OK on application. A conflict value
    /// collapses to its `current` group.
    Replaced(MergeBlock),
}

/// Everything a solver sees for one conflict.
#[derive(Debug)]
pub struct ConflictContext<'a> {
    pub pathname: &'a str,
    /// Conflict blocks queued when the loop started.
    pub total: usize,
    /// 1-based sequence number of this prompt; grows past `total` when
    /// items are deferred.
    pub index: usize,
    /// Index of the block within the file's block list.
    pub block_index: usize,
    pub block: &'a MergeBlock,
    /// The whole file as currently rendered, fences included.
    pub content: String,
}

/// Callback deciding conflicts one at a time.
pub trait ConflictSolver: Send + Sync {
    fn solve(&self, context: &ConflictContext<'_>) -> anyhow::Result<Verdict>;
}

/// Feed every unresolved conflict block to the solver. Without a solver
/// this is a no-op and conflicts remain.
pub fn resolve_conflicts(
    merged: &mut IndexMap<String, Vec<MergeBlock>>,
    solver: Option<&dyn ConflictSolver>,
) -> anyhow::Result<()> {
    let Some(solver) = solver else {
        return Ok(());
    };

    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    for (pathname, block_list) in merged.iter() {
        for (block_index, block) in block_list.iter().enumerate() {
            if matches!(block, MergeBlock::Conflict { ignored: false, .. }) {
                queue.push_back((pathname.clone(), block_index));
            }
        }
    }

    let total = queue.len();
    let mut prompt_index = 0usize;

    while let Some((pathname, block_index)) = queue.pop_front() {
        prompt_index += 1;

        let Some(block_list) = merged.get(&pathname) else {
            continue;
        };
        let Some(block) = block_list.get(block_index) else {
            continue;
        };
        let context = ConflictContext {
            pathname: &pathname,
            total,
            index: prompt_index,
            block_index,
            block,
            content: blocks::to_text(block_list),
        };

        match solver.solve(&context)? {
            Verdict::Skipped => {
                queue.push_front((pathname, block_index));
            }
            Verdict::Ignored => {
                if let Some(MergeBlock::Conflict { ignored, .. }) = merged
                    .get_mut(&pathname)
                    .and_then(|blocks| blocks.get_mut(block_index))
                {
                    *ignored = true;
                }
            }
            Verdict::Replaced(replacement) => {
                let lines = match replacement {
                    MergeBlock::Ok { lines } => lines,
                    MergeBlock::Conflict { current, .. } => current,
                };
                if let Some(slot) = merged
                    .get_mut(&pathname)
                    .and_then(|blocks| blocks.get_mut(block_index))
                {
                    *slot = MergeBlock::Ok { lines };
                }
            }
        }
    }

    Ok(())
}
