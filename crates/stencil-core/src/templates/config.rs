//! Template configuration schema and discovery.
//!
//! A template declares its questions, extend templates, file policy, and
//! engine compatibility in a config file at the template root. JSON and
//! YAML variants are recognised; the first existing file wins. A file that
//! fails to parse degrades to the empty config (reported, not fatal).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::generator::cleanup::CleanupHook;
use crate::policy::FilePolicy;
use crate::vfs::VirtualTree;

/// Recognised config file names at the template root, tried in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".stencil.json", ".stencil.yaml"];

/// How a question is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Input,
    Confirm,
    Select,
    Multiselect,
}

/// One prompt shown while collecting template props.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub name: String,

    #[serde(default)]
    pub message: String,

    #[serde(default, rename = "type")]
    pub kind: QuestionKind,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    /// Options for select/multiselect kinds.
    #[serde(default)]
    pub choices: Vec<String>,
}

/// Configuration of one extend template, declared in the main config.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtendConfig {
    pub questions: Vec<Question>,

    pub files: FilePolicy,

    /// Programmatic hooks; JSON/YAML configs cannot carry these.
    #[serde(skip)]
    pub cleanups: Vec<CleanupHook>,
}

/// The main template's configuration.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub questions: Vec<Question>,

    pub extend_templates: IndexMap<String, ExtendConfig>,

    pub files: FilePolicy,

    /// Minimum engine version the template expects; older engines warn.
    pub min_engine_version: Option<String>,

    /// Programmatic hooks; JSON/YAML configs cannot carry these.
    #[serde(skip)]
    pub cleanups: Vec<CleanupHook>,
}

impl fmt::Debug for ExtendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendConfig")
            .field("questions", &self.questions)
            .field("files", &self.files)
            .field("cleanups", &self.cleanups.len())
            .finish()
    }
}

impl fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("questions", &self.questions)
            .field("extend_templates", &self.extend_templates)
            .field("files", &self.files)
            .field("min_engine_version", &self.min_engine_version)
            .field("cleanups", &self.cleanups.len())
            .finish()
    }
}

/// Load the template config from the first config file present under
/// `root`. Parse failures degrade to the empty config and are reported
/// through `warn`.
pub fn load_template_config(
    tree: &VirtualTree,
    root: &str,
    warn: &dyn Fn(&str),
) -> TemplateConfig {
    for file_name in CONFIG_FILE_NAMES {
        let path = format!("{root}/{file_name}");
        let Some(bytes) = tree.read_file(&path) else {
            continue;
        };
        let text = String::from_utf8_lossy(bytes);
        let parsed = if file_name.ends_with(".json") {
            serde_json::from_str::<TemplateConfig>(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<TemplateConfig>(&text).map_err(|e| e.to_string())
        };
        return match parsed {
            Ok(config) => config,
            Err(error) => {
                warn(&format!("ignoring malformed {file_name}: {error}"));
                TemplateConfig::default()
            }
        };
    }
    TemplateConfig::default()
}
