//! Interactive create flow using cliclack prompts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use stencil_core::{
    AnswerMap, ConflictContext, ConflictSolver, FileContent, Generator, GeneratorConfig,
    MergeBlock, PropsProvider, Question, QuestionKind, ScaffoldOutput, Verdict,
};

use crate::CreateArgs;

/// Run the create command end to end: prompt, generate, write, report.
pub async fn run_create(args: CreateArgs) -> Result<()> {
    cliclack::intro("stencil")?;

    let target_dir = select_directory(&args)?;

    let mut config = GeneratorConfig::new(Arc::new(InteractivePrompter { yes: args.yes }));
    config.conflict_solver = Some(Arc::new(InteractiveSolver { yes: args.yes }));
    config.reporter = Some(Arc::new(|message: &str| {
        let _ = cliclack::log::info(message);
    }));

    if let Some(token) = &args.token {
        let origin = args
            .template
            .split_once(':')
            .map(|(origin, _)| origin)
            .unwrap_or("github");
        config
            .origin_options
            .insert(origin.to_string(), serde_json::json!({ "token": token }));
    }

    let output = Generator::new(&args.name, &args.template, config)?
        .run()
        .await?;

    write_output(&target_dir, &output).await?;

    cliclack::log::success(format!(
        "Created {} file(s) in {}",
        output.files.len(),
        target_dir.display()
    ))?;

    if output.conflicts.is_empty() {
        cliclack::outro("Happy coding!")?;
    } else {
        println!();
        println!(
            "  {} {} file(s) still carry conflict fences:",
            "Warning:".yellow().bold(),
            output.conflicts.len()
        );
        for pathname in &output.conflicts {
            println!("    {}", pathname.yellow());
        }
        cliclack::outro("Resolve the fences above before building.")?;
    }

    Ok(())
}

fn select_directory(args: &CreateArgs) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let path = match &args.directory {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => current_dir.join(dir),
        None => current_dir.join(&args.name),
    };

    // Warn if directory exists and has files
    if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(&path) {
            let count = entries.count();
            if count > 0 {
                cliclack::log::warning(format!(
                    "{} has {} existing item(s)",
                    path.display(),
                    count
                ))?;
                let proceed = if args.yes {
                    true
                } else {
                    cliclack::confirm("Continue anyway?")
                        .initial_value(false)
                        .interact()?
                };
                if !proceed {
                    anyhow::bail!("Setup cancelled.");
                }
            }
        }
    }

    Ok(path)
}

/// Asks template questions through cliclack; `--yes` takes defaults.
struct InteractivePrompter {
    yes: bool,
}

impl InteractivePrompter {
    fn default_answer(question: &Question) -> serde_json::Value {
        match question.kind {
            QuestionKind::Confirm => question
                .default
                .clone()
                .unwrap_or(serde_json::Value::Bool(false)),
            QuestionKind::Select => question
                .choices
                .first()
                .map(|choice| serde_json::Value::String(choice.clone()))
                .unwrap_or(serde_json::Value::Null),
            QuestionKind::Multiselect => serde_json::Value::Array(Vec::new()),
            QuestionKind::Input => question
                .default
                .clone()
                .unwrap_or(serde_json::Value::String(String::new())),
        }
    }

    fn ask(question: &Question) -> Result<serde_json::Value> {
        let message = if question.message.is_empty() {
            question.name.as_str()
        } else {
            question.message.as_str()
        };

        let value = match question.kind {
            QuestionKind::Confirm => {
                let initial = question
                    .default
                    .as_ref()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let answer: bool = cliclack::confirm(message).initial_value(initial).interact()?;
                serde_json::Value::Bool(answer)
            }
            QuestionKind::Select => {
                let mut select = cliclack::select(message);
                for choice in &question.choices {
                    select = select.item(choice.clone(), choice, "");
                }
                let answer: String = select.interact()?;
                serde_json::Value::String(answer)
            }
            QuestionKind::Multiselect => {
                let mut multi = cliclack::multiselect(message);
                for choice in &question.choices {
                    multi = multi.item(choice.clone(), choice, "");
                }
                let answers: Vec<String> = multi.required(false).interact()?;
                serde_json::Value::Array(
                    answers.into_iter().map(serde_json::Value::String).collect(),
                )
            }
            QuestionKind::Input => {
                let mut input = cliclack::input(message);
                if let Some(default) = question.default.as_ref().and_then(|v| v.as_str()) {
                    input = input.default_input(default);
                }
                let answer: String = input.interact()?;
                serde_json::Value::String(answer)
            }
        };
        Ok(value)
    }
}

impl PropsProvider for InteractivePrompter {
    fn collect(&self, label: &str, questions: &[Question]) -> anyhow::Result<AnswerMap> {
        if !self.yes {
            cliclack::log::step(format!("Questions for {label}"))?;
        }

        let mut answers = AnswerMap::new();
        for question in questions {
            let value = if self.yes {
                Self::default_answer(question)
            } else {
                Self::ask(question)?
            };
            answers.insert(question.name.clone(), value);
        }
        Ok(answers)
    }
}

/// Walks the user through each conflict; `--yes` leaves fences in place.
struct InteractiveSolver {
    yes: bool,
}

impl ConflictSolver for InteractiveSolver {
    fn solve(&self, context: &ConflictContext<'_>) -> anyhow::Result<Verdict> {
        if self.yes {
            return Ok(Verdict::Ignored);
        }

        let MergeBlock::Conflict {
            former, current, ..
        } = context.block
        else {
            return Ok(Verdict::Ignored);
        };

        cliclack::note(
            format!(
                "Conflict {}/{} in {}",
                context.index, context.total, context.pathname
            ),
            format!(
                "<<<<<<< former\n{}=======\n{}>>>>>>> current",
                former.concat(),
                current.concat()
            ),
        )?;

        let action: &str = cliclack::select("How should this conflict resolve?")
            .item("former", "Keep the first group", "")
            .item("current", "Keep the second group", "")
            .item("both", "Keep both groups", "")
            .item("ignore", "Leave the fence in the file", "")
            .item("skip", "Decide later", "")
            .interact()?;

        let verdict = match action {
            "former" => Verdict::Replaced(MergeBlock::Ok {
                lines: former.clone(),
            }),
            "current" => Verdict::Replaced(MergeBlock::Ok {
                lines: current.clone(),
            }),
            "both" => {
                let mut lines = former.clone();
                lines.extend(current.iter().cloned());
                Verdict::Replaced(MergeBlock::Ok { lines })
            }
            "ignore" => Verdict::Ignored,
            _ => Verdict::Skipped,
        };
        Ok(verdict)
    }
}

/// Write every emitted file under the target directory.
async fn write_output(target_dir: &Path, output: &ScaffoldOutput) -> Result<()> {
    for (pathname, content) in &output.files {
        let relative = safe_relative(pathname)
            .with_context(|| format!("refusing to write outside target: {pathname}"))?;
        let path = target_dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        match content {
            FileContent::Text(text) => tokio::fs::write(&path, text)
                .await
                .with_context(|| format!("Failed to write file: {}", path.display()))?,
            FileContent::Binary(bytes) => tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write file: {}", path.display()))?,
        }
    }
    Ok(())
}

/// Reject absolute paths and parent traversal in emitted pathnames.
fn safe_relative(pathname: &str) -> Option<PathBuf> {
    let path = Path::new(pathname);
    if path.is_absolute() {
        return None;
    }
    if path
        .components()
        .any(|component| matches!(component, std::path::Component::ParentDir))
    {
        return None;
    }
    Some(path.to_path_buf())
}
