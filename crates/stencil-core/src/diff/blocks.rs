//! OK/CONFLICT merge blocks and their textual form.
//!
//! Conflict fences follow the Git marker shape, every marker column-0 on
//! its own line:
//!
//! ```text
//! <<<<<<< former
//! ...
//! =======
//! ...
//! >>>>>>> current
//! ```

use serde::{Deserialize, Serialize};

use crate::diff::changes::{diff, ChangeList, ConflictSide};

const FENCE_OPEN: &str = "<<<<<<< former\n";
const FENCE_SEPARATOR: &str = "=======\n";
const FENCE_CLOSE: &str = ">>>>>>> current\n";

/// A run of output lines, either clean or a two-group conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeBlock {
    Ok {
        lines: Vec<String>,
    },
    Conflict {
        former: Vec<String>,
        current: Vec<String>,
        /// Set by the resolver loop when the user chose to leave the
        /// conflict in place; the block stays a conflict in the report.
        #[serde(default)]
        ignored: bool,
    },
}

impl MergeBlock {
    pub fn is_conflict(&self) -> bool {
        matches!(self, MergeBlock::Conflict { .. })
    }
}

/// Convert a change list into alternating OK/CONFLICT block runs.
///
/// Removed changes are dropped. Conflicted changes accumulate into the open
/// conflict block's `former`/`current` group by their side; everything else
/// goes into the open OK block. Consecutive lines of the same kind share a
/// block.
pub fn to_blocks(changes: &ChangeList) -> Vec<MergeBlock> {
    let mut blocks: Vec<MergeBlock> = Vec::new();

    for change in changes {
        if change.removed {
            continue;
        }
        if change.conflicted {
            if !matches!(blocks.last(), Some(MergeBlock::Conflict { .. })) {
                blocks.push(MergeBlock::Conflict {
                    former: Vec::new(),
                    current: Vec::new(),
                    ignored: false,
                });
            }
            if let Some(MergeBlock::Conflict {
                former, current, ..
            }) = blocks.last_mut()
            {
                match change.side {
                    ConflictSide::Former => former.push(change.value.clone()),
                    ConflictSide::Current => current.push(change.value.clone()),
                }
            }
        } else {
            if !matches!(blocks.last(), Some(MergeBlock::Ok { .. })) {
                blocks.push(MergeBlock::Ok { lines: Vec::new() });
            }
            if let Some(MergeBlock::Ok { lines }) = blocks.last_mut() {
                lines.push(change.value.clone());
            }
        }
    }

    blocks
}

/// Serialise blocks to text. Conflict blocks keep their fence, ignored or
/// not, so the emitted file always shows both groups.
pub fn to_text(blocks: &[MergeBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            MergeBlock::Ok { lines } => {
                for line in lines {
                    out.push_str(line);
                }
            }
            MergeBlock::Conflict {
                former, current, ..
            } => {
                out.push_str(FENCE_OPEN);
                for line in former {
                    out.push_str(line);
                }
                out.push_str(FENCE_SEPARATOR);
                for line in current {
                    out.push_str(line);
                }
                out.push_str(FENCE_CLOSE);
            }
        }
    }
    out
}

/// Parse plain text into blocks: the block form of its self-diff.
pub fn from_text(content: &str) -> Vec<MergeBlock> {
    to_blocks(&diff(content, None))
}
