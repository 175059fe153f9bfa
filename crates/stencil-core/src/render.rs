//! Text templating for marker-prefixed files.
//!
//! Only files whose name starts with `__template.` go through the engine;
//! everything else is copied verbatim. The marker is stripped from the
//! output file name.

use indexmap::IndexMap;
use minijinja::Environment;

use crate::error::{Result, ScaffoldError};

/// File-name prefix that opts a file into templating.
pub const TEMPLATE_MARKER: &str = "__template.";

/// True when the file name (not the whole path) carries the marker.
pub fn is_template_entry(name: &str) -> bool {
    name.starts_with(TEMPLATE_MARKER)
}

/// Drop the marker from the final path segment.
pub fn strip_marker(pathname: &str) -> String {
    match pathname.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/{}", strip_name(name)),
        None => strip_name(pathname).to_string(),
    }
}

fn strip_name(name: &str) -> &str {
    name.strip_prefix(TEMPLATE_MARKER).unwrap_or(name)
}

/// Render `source` with the given props. Rendering errors are fatal to the
/// run; there is no per-file quarantine.
pub fn render_template(
    pathname: &str,
    source: &str,
    props: &IndexMap<String, serde_json::Value>,
) -> Result<String> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.render_str(source, minijinja::Value::from_serialize(props))
        .map_err(|e| ScaffoldError::Template(format!("rendering {pathname}: {e}")))
}
