//! End-to-end pipeline scenarios.
//!
//! Template archives are built in memory and served through the archive
//! cache hook, so no run here touches the network.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use stencil_core::{
    AnswerMap, ArchiveCache, ConflictContext, ConflictSolver, FileContent, Generator,
    GeneratorConfig, MergeBlock, PropsProvider, Question, ScaffoldError, Verdict,
};

fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (path, bytes) in files {
            zip.start_file(*path, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

fn github_url(repo: &str) -> String {
    format!("https://codeload.github.com/{repo}/zip/refs/heads/main")
}

/// Serves preloaded archives; never stores anything new.
#[derive(Default)]
struct PreloadedArchives {
    archives: Mutex<HashMap<String, Vec<u8>>>,
}

impl PreloadedArchives {
    fn with(repos: &[(&str, Vec<u8>)]) -> Arc<Self> {
        let archives = repos
            .iter()
            .map(|(repo, bytes)| (github_url(repo), bytes.clone()))
            .collect();
        Arc::new(Self {
            archives: Mutex::new(archives),
        })
    }
}

impl ArchiveCache for PreloadedArchives {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.archives.lock().unwrap().get(url).cloned()
    }

    fn set(&self, _url: &str, _bytes: &[u8]) {}
}

/// Answers questions from a per-label script, matching on the question
/// name with any uniquing postfix stripped.
struct ScriptedProps {
    by_label: HashMap<String, Vec<(String, serde_json::Value)>>,
}

impl ScriptedProps {
    fn new(entries: &[(&str, &[(&str, serde_json::Value)])]) -> Arc<Self> {
        let by_label = entries
            .iter()
            .map(|(label, answers)| {
                (
                    label.to_string(),
                    answers
                        .iter()
                        .map(|(name, value)| (name.to_string(), value.clone()))
                        .collect(),
                )
            })
            .collect();
        Arc::new(Self { by_label })
    }

    fn none() -> Arc<Self> {
        Arc::new(Self {
            by_label: HashMap::new(),
        })
    }
}

impl PropsProvider for ScriptedProps {
    fn collect(&self, label: &str, questions: &[Question]) -> anyhow::Result<AnswerMap> {
        let mut answers = AnswerMap::new();
        let Some(scripted) = self.by_label.get(label) else {
            return Ok(answers);
        };
        for question in questions {
            let stripped = question.name.split("$__").next().unwrap_or(&question.name);
            if let Some((_, value)) = scripted.iter().find(|(name, _)| name == stripped) {
                answers.insert(question.name.clone(), value.clone());
            }
        }
        Ok(answers)
    }
}

/// Returns the same verdict for every conflict.
struct FixedSolver(Verdict);

impl ConflictSolver for FixedSolver {
    fn solve(&self, _context: &ConflictContext<'_>) -> anyhow::Result<Verdict> {
        Ok(self.0.clone())
    }
}

fn config_with(
    cache: Arc<PreloadedArchives>,
    props: Arc<ScriptedProps>,
) -> GeneratorConfig {
    let mut config = GeneratorConfig::new(props);
    config.archive_cache = Some(cache);
    config
}

fn text(output: &stencil_core::ScaffoldOutput, path: &str) -> String {
    match output.files.get(path) {
        Some(FileContent::Text(text)) => text.clone(),
        other => panic!("expected text file at {path}, got {other:?}"),
    }
}

/// Main template declaring two conflicting extends over `a.txt`.
fn conflicting_fixture() -> (Arc<PreloadedArchives>, Arc<ScriptedProps>) {
    let main_zip = build_zip(&[
        ("a.txt", b"A\nB\n"),
        (
            ".stencil.json",
            br#"{
                "questions": [
                    { "name": "$EXTEND$acme/x", "type": "confirm", "message": "add x?" },
                    { "name": "$EXTEND$acme/y", "type": "confirm", "message": "add y?" }
                ],
                "extend_templates": { "acme/x": {}, "acme/y": {} },
                "files": { "merge": ["a.txt"] }
            }"#,
        ),
    ]);
    let x_zip = build_zip(&[("a.txt", b"A\nX\nB\n")]);
    let y_zip = build_zip(&[("a.txt", b"A\nY\nB\n")]);

    let cache = PreloadedArchives::with(&[
        ("acme/app", main_zip),
        ("acme/x", x_zip),
        ("acme/y", y_zip),
    ]);
    let props = ScriptedProps::new(&[(
        "main",
        &[
            ("$EXTEND$acme/x", serde_json::json!(true)),
            ("$EXTEND$acme/y", serde_json::json!(true)),
        ],
    )]);
    (cache, props)
}

#[tokio::test]
async fn trivial_single_template() {
    let main_zip = build_zip(&[("a.txt", b"hello\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);

    let output = Generator::new(
        "demo",
        "acme/app",
        config_with(cache, ScriptedProps::none()),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert_eq!(output.files.len(), 1);
    assert_eq!(text(&output, "a.txt"), "hello\n");
    assert!(output.conflicts.is_empty());
}

#[tokio::test]
async fn non_conflicting_overlay_inserts_at_its_anchor() {
    let main_zip = build_zip(&[
        ("a.txt", b"1\n2\n3\n"),
        (
            ".stencil.json",
            br#"{
                "questions": [{ "name": "$EXTEND$acme/plus", "type": "confirm", "message": "?" }],
                "extend_templates": { "acme/plus": {} },
                "files": { "merge": ["a.txt"] }
            }"#,
        ),
    ]);
    let plus_zip = build_zip(&[("a.txt", b"1\n1.5\n2\n3\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip), ("acme/plus", plus_zip)]);
    let props = ScriptedProps::new(&[(
        "main",
        &[("$EXTEND$acme/plus", serde_json::json!(true))],
    )]);

    let output = Generator::new("demo", "acme/app", config_with(cache, props))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "a.txt"), "1\n1.5\n2\n3\n");
    assert!(output.conflicts.is_empty());
}

#[tokio::test]
async fn conflicting_overlays_fence_both_groups() {
    let (cache, props) = conflicting_fixture();

    let output = Generator::new("demo", "acme/app", config_with(cache, props))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(
        text(&output, "a.txt"),
        "A\n<<<<<<< former\nX\n=======\nY\n>>>>>>> current\nB\n"
    );
    assert_eq!(output.conflicts, vec!["a.txt"]);
}

#[tokio::test]
async fn overlay_removal_drops_the_line_without_conflict() {
    let main_zip = build_zip(&[
        ("a.txt", b"1\n2\n3\n"),
        (
            ".stencil.json",
            br#"{
                "questions": [{ "name": "$EXTEND$acme/trim", "type": "confirm", "message": "?" }],
                "extend_templates": { "acme/trim": {} },
                "files": { "merge": ["a.txt"] }
            }"#,
        ),
    ]);
    let trim_zip = build_zip(&[("a.txt", b"1\n3\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip), ("acme/trim", trim_zip)]);
    let props = ScriptedProps::new(&[(
        "main",
        &[("$EXTEND$acme/trim", serde_json::json!(true))],
    )]);

    let output = Generator::new("demo", "acme/app", config_with(cache, props))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "a.txt"), "1\n3\n");
    assert!(output.conflicts.is_empty());
}

#[tokio::test]
async fn template_marker_renders_and_strips() {
    let main_zip = build_zip(&[
        ("__template.greeting.txt", b"Hello, {{ name }}!"),
        (
            ".stencil.json",
            br#"{ "questions": [{ "name": "name", "message": "name?" }] }"#,
        ),
    ]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);
    let props = ScriptedProps::new(&[("main", &[("name", serde_json::json!("World"))])]);

    let output = Generator::new("demo", "acme/app", config_with(cache, props))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(!output.files.contains_key("__template.greeting.txt"));
    assert_eq!(text(&output, "greeting.txt"), "Hello, World!");
}

#[tokio::test]
async fn project_name_is_injected_as_a_prop() {
    let main_zip = build_zip(&[("__template.intro.md", b"# {{ name }}\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);

    let output = Generator::new(
        "demo-app",
        "acme/app",
        config_with(cache, ScriptedProps::none()),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert_eq!(text(&output, "intro.md"), "# demo-app\n");
}

#[tokio::test]
async fn delete_policy_prunes_matching_files() {
    let main_zip = build_zip(&[
        ("x.tmp", b"scratch\n"),
        ("keep.txt", b"kept\n"),
        (
            ".stencil.json",
            br#"{ "files": { "delete": ["**/*.tmp"] } }"#,
        ),
    ]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);

    let output = Generator::new(
        "demo",
        "acme/app",
        config_with(cache, ScriptedProps::none()),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert!(!output.files.contains_key("x.tmp"));
    assert_eq!(text(&output, "keep.txt"), "kept\n");
}

#[tokio::test]
async fn ignored_conflicts_stay_in_the_report_with_both_groups() {
    let (cache, props) = conflicting_fixture();
    let mut config = config_with(cache, props);
    config.conflict_solver = Some(Arc::new(FixedSolver(Verdict::Ignored)));

    let output = Generator::new("demo", "acme/app", config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(output.conflicts, vec!["a.txt"]);
    let content = text(&output, "a.txt");
    assert!(content.contains("X\n"));
    assert!(content.contains("Y\n"));
    assert!(content.contains("<<<<<<< former"));
}

#[tokio::test]
async fn resolved_conflicts_take_the_replacement() {
    let (cache, props) = conflicting_fixture();
    let mut config = config_with(cache, props);
    config.conflict_solver = Some(Arc::new(FixedSolver(Verdict::Replaced(MergeBlock::Ok {
        lines: vec!["Z\n".to_string()],
    }))));

    let output = Generator::new("demo", "acme/app", config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "a.txt"), "A\nZ\nB\n");
    assert!(output.conflicts.is_empty());
}

#[tokio::test]
async fn non_merge_files_take_the_last_contribution() {
    let main_zip = build_zip(&[
        ("config.json", b"{}\n"),
        (
            ".stencil.json",
            br#"{
                "questions": [{ "name": "$EXTEND$acme/over", "type": "confirm", "message": "?" }],
                "extend_templates": { "acme/over": {} }
            }"#,
        ),
    ]);
    let over_zip = build_zip(&[("config.json", b"{\"a\":1}\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip), ("acme/over", over_zip)]);
    let props = ScriptedProps::new(&[(
        "main",
        &[("$EXTEND$acme/over", serde_json::json!(true))],
    )]);

    let output = Generator::new("demo", "acme/app", config_with(cache, props))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "config.json"), "{\"a\":1}\n");
}

#[tokio::test]
async fn binary_files_pass_through_untouched() {
    let blob = [0x89u8, 0x50, 0x4e, 0x47, 0x00, 0x01];
    let main_zip = build_zip(&[("logo.png", &blob), ("readme.txt", b"text\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);

    let output = Generator::new(
        "demo",
        "acme/app",
        config_with(cache, ScriptedProps::none()),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert_eq!(
        output.files.get("logo.png"),
        Some(&FileContent::Binary(blob.to_vec()))
    );
    assert_eq!(text(&output, "readme.txt"), "text\n");
}

#[tokio::test]
async fn run_level_cleanups_mutate_the_output() {
    let main_zip = build_zip(&[("a.txt", b"a\n"), ("drop.me", b"bye\n")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);
    let mut config = config_with(cache, ScriptedProps::none());
    let hook: stencil_core::CleanupHook =
        Arc::new(|ctx: &mut stencil_core::CleanupContext<'_>| {
            ctx.add_file("extra.txt", "added\n");
            ctx.delete_files(&["drop.me"]);
            Ok(())
        });
    config.cleanups.push(hook);

    let output = Generator::new("demo", "acme/app", config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "extra.txt"), "added\n");
    assert!(!output.files.contains_key("drop.me"));
    assert_eq!(text(&output, "a.txt"), "a\n");
}

#[tokio::test]
async fn unknown_origin_is_a_context_error() {
    let cache = PreloadedArchives::with(&[]);
    let result = Generator::new(
        "demo",
        "bitbucket:acme/app",
        config_with(cache, ScriptedProps::none()),
    )
    .unwrap()
    .run()
    .await;

    assert!(matches!(result, Err(ScaffoldError::Context(_))));
}

#[tokio::test]
async fn malformed_config_degrades_to_empty() {
    let main_zip = build_zip(&[("a.txt", b"a\n"), (".stencil.json", b"{ nope")]);
    let cache = PreloadedArchives::with(&[("acme/app", main_zip)]);
    let warnings: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let mut config = config_with(cache, ScriptedProps::none());
    let sink = warnings.clone();
    config.reporter = Some(Arc::new(move |message: &str| {
        sink.lock().unwrap().push(message.to_string());
    }));

    let output = Generator::new("demo", "acme/app", config)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(text(&output, "a.txt"), "a\n");
    assert!(warnings
        .lock()
        .unwrap()
        .iter()
        .any(|message| message.contains(".stencil.json")));
}
