//! The scaffolding pipeline.
//!
//! A run walks eleven steps over owned, mutable tables: validate inputs,
//! fetch the main template, parse its config, collect props (activating and
//! fetching extend templates along the way), build the glob policy, render
//! and diff every file, apply the delete policy, merge overlays, resolve
//! conflicts, run cleanups, emit. Control never leaves the pipeline except
//! at archive fetches and user callbacks.

pub mod cleanup;
pub mod resolver;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::diff::blocks::{self, MergeBlock};
use crate::diff::changes::{diff, ChangeList};
use crate::diff::merger::merge;
use crate::error::{Result, ScaffoldError};
use crate::generator::cleanup::{run_cleanups, CleanupHook};
use crate::generator::resolver::{resolve_conflicts, ConflictSolver};
use crate::policy::{FilePolicy, GlobMatcher, PolicyKind};
use crate::render;
use crate::templates::config::{self, TemplateConfig};
use crate::templates::fetcher::{unpack_archive, ArchiveCache, ArchiveFetcher, LoaderOptions};
use crate::templates::origin::{Origin, OriginHandler, OriginRegistry};
use crate::templates::props::{
    parse_answers, AnswerMap, NamePostfixer, TemplatePropsEntry,
};
use crate::templates::version;
use crate::vfs::{VirtualTree, EXTENDS_PREFIX, MAIN_PREFIX};

/// Collects answers for one template's questions. `label` is `"main"` or
/// `"extend:<id>"`; implementations typically prompt the user.
pub trait PropsProvider: Send + Sync {
    fn collect(
        &self,
        label: &str,
        questions: &[config::Question],
    ) -> anyhow::Result<AnswerMap>;
}

/// Progress reporter; messages are human-oriented one-liners.
pub type Reporter = Arc<dyn Fn(&str) + Send + Sync>;

/// Everything the embedding application wires into a run.
pub struct GeneratorConfig {
    /// Additional origins, appended to the built-in `github`/`gitlab` pair.
    pub origins: Vec<Origin>,
    /// Per-origin options handed to the handler (credentials, hosts).
    pub origin_options: HashMap<String, serde_json::Value>,
    /// When set, overrides origin lookup entirely.
    pub origin_handler: Option<Arc<dyn OriginHandler>>,
    pub loader: LoaderOptions,
    pub archive_cache: Option<Arc<dyn ArchiveCache>>,
    pub props_provider: Arc<dyn PropsProvider>,
    pub conflict_solver: Option<Arc<dyn ConflictSolver>>,
    /// Run-level cleanup hooks, appended after template-config hooks.
    pub cleanups: Vec<CleanupHook>,
    pub reporter: Option<Reporter>,
}

impl GeneratorConfig {
    pub fn new(props_provider: Arc<dyn PropsProvider>) -> Self {
        Self {
            origins: Vec::new(),
            origin_options: HashMap::new(),
            origin_handler: None,
            loader: LoaderOptions::default(),
            archive_cache: None,
            props_provider,
            conflict_solver: None,
            cleanups: Vec::new(),
            reporter: None,
        }
    }
}

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

/// Final result of a run.
#[derive(Debug, Clone)]
pub struct ScaffoldOutput {
    pub files: IndexMap<String, FileContent>,
    /// Pathnames whose merge blocks still contain a conflict, ignored ones
    /// included. Each pathname appears once.
    pub conflicts: Vec<String>,
}

type CacheTable = IndexMap<String, Vec<ChangeList>>;
type MergeTable = IndexMap<String, Vec<MergeBlock>>;
type BinaryTable = IndexMap<String, Vec<u8>>;

/// Drives one scaffolding run.
pub struct Generator {
    project_name: String,
    template_reference: String,
    config: GeneratorConfig,
}

impl Generator {
    /// Validate inputs; no I/O happens here.
    pub fn new(
        project_name: &str,
        template_reference: &str,
        config: GeneratorConfig,
    ) -> Result<Self> {
        if project_name.trim().is_empty() {
            return Err(ScaffoldError::InvalidInput(
                "project name must be a non-empty string".to_string(),
            ));
        }
        if template_reference.trim().is_empty() {
            return Err(ScaffoldError::InvalidInput(
                "template reference must be a non-empty string".to_string(),
            ));
        }
        Ok(Self {
            project_name: project_name.to_string(),
            template_reference: template_reference.to_string(),
            config,
        })
    }

    /// Run the pipeline to completion.
    pub async fn run(self) -> Result<ScaffoldOutput> {
        let mut tree = VirtualTree::new();
        let registry = OriginRegistry::with_extras(&self.config.origins)?;
        let fetcher =
            ArchiveFetcher::new(self.config.loader.clone(), self.config.archive_cache.clone());

        let (origin_name, template_name) = split_reference(&self.template_reference);
        self.report(&format!(
            "fetching template {template_name} from {origin_name}"
        ));
        self.fetch_template(&registry, &fetcher, &self.template_reference, MAIN_PREFIX, &mut tree)
            .await?;

        let template_config =
            config::load_template_config(&tree, MAIN_PREFIX, &|message| self.report(message));
        if let Some(wanted) = &template_config.min_engine_version {
            if let Some(warning) = version::compatibility_warning(version::ENGINE_VERSION, wanted)
            {
                self.report(&warning);
            }
        }

        let (props_entries, activated) = self
            .collect_props(&registry, &fetcher, &template_config, &mut tree)
            .await?;
        debug!(
            templates = props_entries.len(),
            extends = activated.len(),
            "props collected"
        );

        let matcher = self.build_matcher(&template_config, &activated)?;

        let (mut cache, mut binary) = self.render_and_diff(&tree, &props_entries)?;
        debug!(files = cache.len(), binary = binary.len(), "templates diffed");

        cache.retain(|pathname, _| !matcher.matches(pathname, PolicyKind::Delete));
        binary.retain(|pathname, _| !matcher.matches(pathname, PolicyKind::Delete));

        let mut merged = merge_cache(&cache, &matcher);
        let conflict_count = merged
            .values()
            .flat_map(|blocks| blocks.iter())
            .filter(|block| block.is_conflict())
            .count();
        if conflict_count > 0 {
            self.report(&format!("{conflict_count} merge conflict(s) detected"));
        }

        resolve_conflicts(&mut merged, self.config.conflict_solver.as_deref())?;

        let hooks = self.collect_cleanups(&template_config, &activated);
        run_cleanups(&hooks, &mut merged, &mut binary)?;

        Ok(emit(merged, binary))
    }

    fn report(&self, message: &str) {
        if let Some(reporter) = &self.config.reporter {
            reporter(message);
        }
    }

    /// Resolve, fetch, and unpack one template archive under `prefix`.
    async fn fetch_template(
        &self,
        registry: &OriginRegistry,
        fetcher: &ArchiveFetcher,
        reference: &str,
        prefix: &str,
        tree: &mut VirtualTree,
    ) -> Result<()> {
        let (origin_name, template_name) = split_reference(reference);
        let options = self
            .config
            .origin_options
            .get(origin_name)
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let location = match &self.config.origin_handler {
            Some(handler) => handler.resolve(template_name, &options)?,
            None => registry
                .lookup(origin_name)?
                .handler
                .resolve(template_name, &options)?,
        };
        if location.url.trim().is_empty() {
            return Err(ScaffoldError::Context(format!(
                "origin '{origin_name}' returned an empty archive url"
            )));
        }

        let bytes = fetcher.fetch(&location).await?;
        unpack_archive(tree, prefix, &bytes)?;
        Ok(())
    }

    /// FIFO walk over template labels, prompting for answers and activating
    /// extend templates as they are discovered.
    async fn collect_props(
        &self,
        registry: &OriginRegistry,
        fetcher: &ArchiveFetcher,
        template_config: &TemplateConfig,
        tree: &mut VirtualTree,
    ) -> Result<(Vec<TemplatePropsEntry>, Vec<String>)> {
        let mut entries: Vec<TemplatePropsEntry> = Vec::new();
        let mut activated: Vec<String> = Vec::new();
        let mut postfixer = NamePostfixer::default();
        let mut pending: VecDeque<String> = VecDeque::from(["main".to_string()]);

        while let Some(label) = pending.pop_front() {
            let questions = match label.strip_prefix("extend:") {
                None => template_config.questions.as_slice(),
                Some(id) => template_config
                    .extend_templates
                    .get(id)
                    .map(|extend| extend.questions.as_slice())
                    .unwrap_or(&[]),
            };

            let answers = if questions.is_empty() {
                AnswerMap::new()
            } else {
                let rewritten = postfixer.rewrite(questions);
                self.config
                    .props_provider
                    .collect(&label, &rewritten)
                    .map_err(ScaffoldError::Callback)?
            };

            let parsed = parse_answers(answers);
            entries.push(TemplatePropsEntry {
                label,
                props: parsed.props,
            });

            for id in parsed.pending_extend_ids {
                if activated.contains(&id) {
                    continue;
                }
                self.report(&format!("activating extend template {id}"));
                self.fetch_template(
                    registry,
                    fetcher,
                    &id,
                    &format!("{EXTENDS_PREFIX}/{id}"),
                    tree,
                )
                .await?;
                pending.push_back(format!("extend:{id}"));
                activated.push(id);
            }
        }

        // The project name is available to templates as `name` unless a
        // question already claimed it.
        if let Some(main_entry) = entries.first_mut() {
            if !main_entry.props.contains_key("name") {
                main_entry.props.insert(
                    "name".to_string(),
                    serde_json::Value::String(self.project_name.clone()),
                );
            }
        }

        Ok((entries, activated))
    }

    /// Union of the main policy and every activated extend's policy.
    fn build_matcher(
        &self,
        template_config: &TemplateConfig,
        activated: &[String],
    ) -> Result<GlobMatcher> {
        let mut policy: FilePolicy = template_config.files.clone();
        for id in activated {
            if let Some(extend) = template_config.extend_templates.get(id) {
                policy.extend_from(&extend.files);
            }
        }
        GlobMatcher::new(&policy)
    }

    /// Visit templates in overlay order, rendering marked files and
    /// appending a change list per file to the cache table.
    fn render_and_diff(
        &self,
        tree: &VirtualTree,
        entries: &[TemplatePropsEntry],
    ) -> Result<(CacheTable, BinaryTable)> {
        let mut cache = CacheTable::new();
        let mut binary = BinaryTable::new();
        let main_props = entries
            .first()
            .map(|entry| entry.props.clone())
            .unwrap_or_default();

        for entry in entries {
            let root = match entry.label.strip_prefix("extend:") {
                None => MAIN_PREFIX.to_string(),
                Some(id) => format!("{EXTENDS_PREFIX}/{id}"),
            };

            // Right-biased: the current template's props win over main's.
            let mut props = main_props.clone();
            for (key, value) in &entry.props {
                props.insert(key.clone(), value.clone());
            }

            for tree_entry in tree.entries_under(&root) {
                if tree_entry.is_directory {
                    continue;
                }
                // Config files describe the template; they are not output.
                if tree_entry.relative_directory_path.is_empty()
                    && config::CONFIG_FILE_NAMES.contains(&tree_entry.name.as_str())
                {
                    continue;
                }

                let relative = if tree_entry.relative_directory_path.is_empty() {
                    tree_entry.name.clone()
                } else {
                    format!(
                        "{}/{}",
                        tree_entry.relative_directory_path, tree_entry.name
                    )
                };
                let Some(bytes) = tree.read_file(&tree_entry.absolute_path) else {
                    continue;
                };

                if tree_entry.is_binary {
                    binary.insert(relative, bytes.to_vec());
                    continue;
                }

                let text = String::from_utf8_lossy(bytes).into_owned();
                let (pathname, rendered) = if render::is_template_entry(&tree_entry.name) {
                    let rendered = render::render_template(&relative, &text, &props)?;
                    (render::strip_marker(&relative), rendered)
                } else {
                    (relative, text)
                };

                let lists = cache.entry(pathname).or_default();
                let change_list = match lists.first() {
                    None => diff(&rendered, None),
                    Some(baseline) => {
                        let baseline_text: String = baseline
                            .iter()
                            .map(|change| change.value.as_str())
                            .collect();
                        diff(&baseline_text, Some(&rendered))
                    }
                };
                lists.push(change_list);
            }
        }

        Ok((cache, binary))
    }

    /// Main config hooks, then each activated extend's, then run-level.
    fn collect_cleanups(
        &self,
        template_config: &TemplateConfig,
        activated: &[String],
    ) -> Vec<CleanupHook> {
        let mut hooks: Vec<CleanupHook> = template_config.cleanups.clone();
        for id in activated {
            if let Some(extend) = template_config.extend_templates.get(id) {
                hooks.extend(extend.cleanups.iter().cloned());
            }
        }
        hooks.extend(self.config.cleanups.iter().cloned());
        hooks
    }
}

/// `origin:name` with `github` as the default origin.
fn split_reference(reference: &str) -> (&str, &str) {
    match reference.split_once(':') {
        Some((origin, name)) if !origin.is_empty() && !name.is_empty() => (origin, name),
        _ => ("github", reference),
    }
}

/// Produce the merge table: merge-policy files run the full merger,
/// everything else takes the last contributed version.
fn merge_cache(cache: &CacheTable, matcher: &GlobMatcher) -> MergeTable {
    let mut merged = MergeTable::new();
    for (pathname, lists) in cache {
        let block_list = if matcher.matches(pathname, PolicyKind::Merge) {
            match lists.split_first() {
                None => continue,
                Some((baseline, [])) => blocks::to_blocks(baseline),
                Some((baseline, overlays)) => blocks::to_blocks(&merge(baseline, overlays)),
            }
        } else {
            match lists.last() {
                None => continue,
                Some(last) => blocks::to_blocks(last),
            }
        };
        merged.insert(pathname.clone(), block_list);
    }
    merged
}

/// Union the tables into the final output. On a pathname collision the
/// merge entry wins; binary entries never shadow text.
fn emit(merged: MergeTable, binary: BinaryTable) -> ScaffoldOutput {
    let mut files = IndexMap::new();
    let mut conflicts = Vec::new();

    for (pathname, block_list) in &merged {
        if block_list.iter().any(|block| block.is_conflict()) {
            conflicts.push(pathname.clone());
        }
        files.insert(
            pathname.clone(),
            FileContent::Text(blocks::to_text(block_list)),
        );
    }
    for (pathname, bytes) in binary {
        files.entry(pathname).or_insert(FileContent::Binary(bytes));
    }

    ScaffoldOutput { files, conflicts }
}
