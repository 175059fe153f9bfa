//! Error types for the stencil engine.

use thiserror::Error;

/// Errors surfaced by the scaffolding pipeline.
///
/// Every kind is fatal to the run once raised; partial results are never
/// returned to the caller.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Missing or empty caller-supplied input, raised before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inconsistent engine state: duplicated origin names, unknown origins,
    /// empty archives, bad handler output.
    #[error("{0}")]
    Context(String),

    /// Archive fetch failure or timeout.
    #[error("failed to load template archive: {0}")]
    Loader(String),

    /// Fatal template processing failure: glob compilation, rendering.
    /// Config parse failures are not fatal and never reach this variant.
    #[error("template error: {0}")]
    Template(String),

    /// A user callback (props provider, conflict solver, cleanup hook)
    /// returned an error.
    #[error("callback failed: {0}")]
    Callback(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ScaffoldError {
    fn from(err: reqwest::Error) -> Self {
        ScaffoldError::Loader(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;
