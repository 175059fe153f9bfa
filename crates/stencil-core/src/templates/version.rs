//! Engine/template compatibility checking.

use semver::Version;

/// Engine version templates are checked against.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Warn when the template expects a newer engine. Unparseable versions
/// skip the check; the engine never hard-fails on compatibility.
pub fn compatibility_warning(engine_version: &str, min_engine_version: &str) -> Option<String> {
    let engine = Version::parse(engine_version.strip_prefix('v').unwrap_or(engine_version)).ok()?;
    let wanted =
        Version::parse(min_engine_version.strip_prefix('v').unwrap_or(min_engine_version)).ok()?;

    if engine < wanted {
        Some(format!(
            "template expects stencil {min_engine_version} or newer, running {engine_version}"
        ))
    } else {
        None
    }
}
