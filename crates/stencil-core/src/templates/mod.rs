//! Template acquisition and description.
//!
//! This module provides:
//! - Origin handlers resolving template references to archive URLs
//! - Archive fetching with a byte-level cache hook and zip decompression
//! - The template config schema (`.stencil.json` / `.stencil.yaml`)
//! - Question/answer plumbing, including extend-template activation
//! - Engine/template compatibility checking

pub mod config;
pub mod fetcher;
pub mod origin;
pub mod props;
pub mod version;

pub use config::{ExtendConfig, Question, QuestionKind, TemplateConfig};
pub use fetcher::{ArchiveCache, ArchiveFetcher, LoaderOptions};
pub use origin::{ArchiveLocation, Origin, OriginHandler, OriginRegistry};
pub use props::{AnswerMap, TemplatePropsEntry};
