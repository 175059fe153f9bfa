//! Template origins: named resolvers from template names to archive URLs.
//!
//! Built-ins cover GitHub and GitLab; callers may register additional
//! origins or override lookup entirely with their own handler.

use std::sync::Arc;

use url::Url;

use crate::error::{Result, ScaffoldError};

/// Where an origin says a template archive lives.
#[derive(Debug, Clone)]
pub struct ArchiveLocation {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Resolves a template name to a fetchable archive location. The URL must
/// dereference to a zip archive.
pub trait OriginHandler: Send + Sync {
    fn resolve(&self, template_name: &str, options: &serde_json::Value)
        -> Result<ArchiveLocation>;
}

/// A named origin plus its handler.
#[derive(Clone)]
pub struct Origin {
    pub name: String,
    pub handler: Arc<dyn OriginHandler>,
}

impl Origin {
    pub fn new(name: impl Into<String>, handler: Arc<dyn OriginHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

/// Registry of built-in and caller-supplied origins.
pub struct OriginRegistry {
    origins: Vec<Origin>,
}

impl OriginRegistry {
    /// Built-ins (`github`, `gitlab`) plus extras; duplicated names are
    /// rejected.
    pub fn with_extras(extras: &[Origin]) -> Result<Self> {
        let mut origins = vec![
            Origin::new("github", Arc::new(GithubOrigin) as Arc<dyn OriginHandler>),
            Origin::new("gitlab", Arc::new(GitlabOrigin) as Arc<dyn OriginHandler>),
        ];
        for extra in extras {
            if origins.iter().any(|origin| origin.name == extra.name) {
                return Err(ScaffoldError::Context(format!(
                    "duplicated origin name: {}",
                    extra.name
                )));
            }
            origins.push(extra.clone());
        }
        Ok(Self { origins })
    }

    pub fn lookup(&self, name: &str) -> Result<&Origin> {
        self.origins
            .iter()
            .find(|origin| origin.name == name)
            .ok_or_else(|| ScaffoldError::Context(format!("unknown origin: {name}")))
    }
}

/// Parse `owner/repo` with an optional `#ref` suffix (defaults to `main`).
fn split_repo_ref(template_name: &str) -> Result<(&str, &str)> {
    let (repo, git_ref) = match template_name.split_once('#') {
        Some((repo, r)) if !r.is_empty() => (repo, r),
        Some((repo, _)) => (repo, "main"),
        None => (template_name, "main"),
    };
    if repo.split('/').filter(|segment| !segment.is_empty()).count() != 2 {
        return Err(ScaffoldError::Context(format!(
            "template name must be owner/repo, got '{repo}'"
        )));
    }
    Ok((repo, git_ref))
}

/// Public GitHub archives via codeload.
pub struct GithubOrigin;

impl OriginHandler for GithubOrigin {
    fn resolve(
        &self,
        template_name: &str,
        _options: &serde_json::Value,
    ) -> Result<ArchiveLocation> {
        let (repo, git_ref) = split_repo_ref(template_name)?;
        let url = Url::parse(&format!(
            "https://codeload.github.com/{repo}/zip/refs/heads/{git_ref}"
        ))
        .map_err(|e| ScaffoldError::Context(format!("bad archive url: {e}")))?;
        Ok(ArchiveLocation {
            url: url.into(),
            headers: Vec::new(),
        })
    }
}

/// GitLab archives; a `token` origin option becomes the PRIVATE-TOKEN
/// header for private projects.
pub struct GitlabOrigin;

impl OriginHandler for GitlabOrigin {
    fn resolve(
        &self,
        template_name: &str,
        options: &serde_json::Value,
    ) -> Result<ArchiveLocation> {
        let (repo, git_ref) = split_repo_ref(template_name)?;
        let project = repo.rsplit('/').next().unwrap_or(repo);
        let url = Url::parse(&format!(
            "https://gitlab.com/{repo}/-/archive/{git_ref}/{project}-{git_ref}.zip"
        ))
        .map_err(|e| ScaffoldError::Context(format!("bad archive url: {e}")))?;

        let mut headers = Vec::new();
        if let Some(token) = options.get("token").and_then(|t| t.as_str()) {
            headers.push(("PRIVATE-TOKEN".to_string(), token.to_string()));
        }
        Ok(ArchiveLocation {
            url: url.into(),
            headers,
        })
    }
}
