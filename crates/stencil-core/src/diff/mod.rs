//! Line-level diffing, overlay merging, and conflict blocks.
//!
//! This module is the core of the engine:
//! - `changes`: per-line [`Change`](changes::Change) records between two texts
//! - `merger`: overlay application with line-conflict detection
//! - `blocks`: OK/CONFLICT block runs and their conflict-fence text form

pub mod blocks;
pub mod changes;
pub mod merger;
