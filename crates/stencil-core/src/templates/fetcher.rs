//! Archive download and decompression into the virtual tree.

use std::io::{Cursor, Read, Seek};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Result, ScaffoldError};
use crate::templates::origin::ArchiveLocation;
use crate::vfs::VirtualTree;

/// Byte-level archive cache consulted before any network fetch. Hits skip
/// the network entirely; misses are stored after download.
pub trait ArchiveCache: Send + Sync {
    fn get(&self, url: &str) -> Option<Vec<u8>>;
    fn set(&self, url: &str, bytes: &[u8]);
}

/// HTTP options for archive fetching.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub timeout: Duration,
    /// Extra headers sent with every archive request, before any
    /// origin-supplied ones.
    pub headers: Vec<(String, String)>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            headers: Vec::new(),
        }
    }
}

/// Downloads template archives, consulting the byte cache when present.
pub struct ArchiveFetcher {
    client: reqwest::Client,
    options: LoaderOptions,
    cache: Option<Arc<dyn ArchiveCache>>,
}

impl ArchiveFetcher {
    pub fn new(options: LoaderOptions, cache: Option<Arc<dyn ArchiveCache>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("stencil/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            options,
            cache,
        }
    }

    /// Fetch the archive bytes for a resolved location.
    pub async fn fetch(&self, location: &ArchiveLocation) -> Result<Vec<u8>> {
        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(&location.url) {
                debug!(url = %location.url, "archive cache hit");
                return Ok(bytes);
            }
        }

        let mut request = self.client.get(&location.url);
        for (name, value) in self
            .options
            .headers
            .iter()
            .chain(location.headers.iter())
        {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ScaffoldError::Loader(format!(
                "HTTP {} fetching {}",
                response.status(),
                location.url
            )));
        }
        let bytes = response.bytes().await?.to_vec();

        if let Some(cache) = &self.cache {
            cache.set(&location.url, &bytes);
        }
        Ok(bytes)
    }
}

/// Unzip `bytes` under `prefix` in the tree. Git forges wrap the tree in a
/// `{repo}-{ref}/` directory; when every entry shares one top-level
/// component it is stripped. Returns the number of files written; an
/// archive yielding none is a Context error.
pub fn unpack_archive(tree: &mut VirtualTree, prefix: &str, bytes: &[u8]) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ScaffoldError::Loader(format!("unreadable archive: {e}")))?;

    let shared_root = shared_top_level(&mut archive)?;

    let mut written = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ScaffoldError::Loader(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let full_name = entry.name().to_string();
        let relative = match &shared_root {
            Some(root) => full_name
                .strip_prefix(root.as_str())
                .unwrap_or(&full_name)
                .to_string(),
            None => full_name,
        };
        if relative.is_empty() {
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| ScaffoldError::Loader(e.to_string()))?;
        tree.write_file(&format!("{prefix}/{relative}"), contents);
        written += 1;
    }

    if written == 0 {
        return Err(ScaffoldError::Context(
            "template archive contains no files".to_string(),
        ));
    }
    debug!(prefix, files = written, "template archive unpacked");
    Ok(written)
}

/// The single first path component shared by every entry, if there is one.
/// Any root-level file disqualifies stripping.
fn shared_top_level<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<String>> {
    let mut shared: Option<String> = None;
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ScaffoldError::Loader(e.to_string()))?;
        let name = entry.name();
        if !name.contains('/') {
            return Ok(None);
        }
        let first = name.split('/').next().unwrap_or_default();
        match &shared {
            Some(existing) if existing.as_str() == first => {}
            Some(_) => return Ok(None),
            None => shared = Some(first.to_string()),
        }
    }
    Ok(shared.map(|root| format!("{root}/")))
}
