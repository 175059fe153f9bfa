//! Overlay merging with line-conflict detection.
//!
//! Overlays are change lists computed against the same baseline. Insertions
//! are gathered into a patch table keyed by their baseline anchor; removals
//! flag baseline lines directly. An anchor touched by more than one overlay
//! is a conflict: every insertion stored there survives into the output
//! flagged `conflicted`, with the first contributing overlay's group
//! labelled `former` and later overlays `current`.

use std::collections::{BTreeMap, BTreeSet};

use crate::diff::changes::{Change, ChangeList, ConflictSide};

#[derive(Debug, Default)]
struct PatchEntry {
    /// Insertions at this anchor, paired with their overlay index.
    changes: Vec<(usize, Change)>,
    /// Number of distinct overlays that inserted at this anchor.
    modify_count: usize,
}

/// Merge `overlays` onto `baseline`.
///
/// Empty overlays return the baseline unchanged; an empty baseline returns
/// empty. Overlay changes anchored outside the baseline range are dropped
/// silently.
pub fn merge(baseline: &ChangeList, overlays: &[ChangeList]) -> ChangeList {
    if baseline.is_empty() {
        return Vec::new();
    }
    if overlays.is_empty() {
        return baseline.clone();
    }

    let len = baseline.len() as i64;
    let mut base: Vec<Change> = baseline.clone();
    let mut patches: BTreeMap<i64, PatchEntry> = BTreeMap::new();

    for (overlay_index, overlay) in overlays.iter().enumerate() {
        let mut touched: BTreeSet<i64> = BTreeSet::new();
        for change in overlay {
            if change.added {
                if change.line_number < -1 || change.line_number >= len {
                    continue;
                }
                let entry = patches.entry(change.line_number).or_default();
                entry.changes.push((overlay_index, change.clone()));
                touched.insert(change.line_number);
            } else if change.removed {
                if change.line_number < 0 || change.line_number >= len {
                    continue;
                }
                base[change.line_number as usize].removed = true;
            }
        }
        for anchor in touched {
            if let Some(entry) = patches.get_mut(&anchor) {
                entry.modify_count += 1;
            }
        }
    }

    let mut merged = Vec::with_capacity(base.len() + patches.len());
    let mut cursor: i64 = -1;

    for (anchor, entry) in &patches {
        for index in (cursor + 1)..=*anchor {
            merged.push(base[index as usize].clone());
        }
        cursor = *anchor;

        let conflicted = entry.modify_count > 1;
        let first_overlay = entry.changes.first().map(|(index, _)| *index);
        for (overlay_index, change) in &entry.changes {
            let mut change = change.clone();
            if conflicted {
                change.conflicted = true;
                change.side = if Some(*overlay_index) == first_overlay {
                    ConflictSide::Former
                } else {
                    ConflictSide::Current
                };
            }
            merged.push(change);
        }
    }
    for index in (cursor + 1)..len {
        merged.push(base[index as usize].clone());
    }

    merged
}
