//! stencil-core - multi-template overlay scaffolding engine.
//!
//! One "main" template plus any activated "extend" templates are fetched
//! as zip archives into an in-memory tree, rendered file by file, and
//! merged line-by-line into a single output tree. Overlays that touch the
//! same baseline line produce conflict-fenced blocks that an interactive
//! resolver can accept, reject, or skip.
//!
//! # Architecture
//!
//! - **diff** - per-line change lists, overlay merging, OK/CONFLICT blocks
//! - **vfs** - virtual tree holding decompressed template archives
//! - **templates** - origins, archive fetching, config, questions/props
//! - **policy** - merge/delete glob policy
//! - **render** - `__template.`-marked file rendering
//! - **generator** - the pipeline, conflict resolver loop, cleanup hooks
//!
//! # Example (wiring a run)
//!
//! ```ignore
//! use std::sync::Arc;
//! use stencil_core::{Generator, GeneratorConfig};
//!
//! let config = GeneratorConfig::new(Arc::new(MyPrompter));
//! let output = Generator::new("my-app", "acme/starter", config)?
//!     .run()
//!     .await?;
//! for (path, _content) in &output.files {
//!     println!("{path}");
//! }
//! ```

pub mod diff;
pub mod error;
pub mod generator;
pub mod policy;
pub mod render;
pub mod templates;
pub mod vfs;

pub use diff::blocks::{from_text, to_blocks, to_text, MergeBlock};
pub use diff::changes::{diff, Change, ChangeList, ConflictSide};
pub use diff::merger::merge;
pub use error::ScaffoldError;
pub use generator::cleanup::{CleanupContext, CleanupHook};
pub use generator::resolver::{ConflictContext, ConflictSolver, Verdict};
pub use generator::{
    FileContent, Generator, GeneratorConfig, PropsProvider, Reporter, ScaffoldOutput,
};
pub use policy::{FilePolicy, GlobMatcher, PolicyKind};
pub use templates::config::{ExtendConfig, Question, QuestionKind, TemplateConfig};
pub use templates::fetcher::{ArchiveCache, LoaderOptions};
pub use templates::origin::{ArchiveLocation, Origin, OriginHandler};
pub use templates::props::{AnswerMap, TemplatePropsEntry};
pub use vfs::{TreeEntry, VirtualTree};
