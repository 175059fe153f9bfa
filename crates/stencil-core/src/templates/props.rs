//! Prop collection plumbing: answers, extend activation, name uniquing.
//!
//! Questions whose name starts with the `$EXTEND$` prefix do not produce
//! props; their answers activate extend templates instead. Because several
//! templates may declare the same extend question, names are rewritten with
//! a per-run counter postfix before prompting and stripped back during
//! answer parsing.

use indexmap::IndexMap;

use crate::templates::config::Question;

/// Question-name prefix that routes answers to extend activation.
pub const EXTEND_QUESTION_PREFIX: &str = "$EXTEND$";

/// Separator between the original question name and the uniquing postfix.
const POSTFIX_SEPARATOR: &str = "$__";

/// Answers returned by the props provider, keyed by (rewritten) question
/// name.
pub type AnswerMap = IndexMap<String, serde_json::Value>;

/// One template's collected props.
#[derive(Debug, Clone)]
pub struct TemplatePropsEntry {
    /// `"main"` or `"extend:<id>"`.
    pub label: String,
    pub props: IndexMap<String, serde_json::Value>,
}

/// Parsed answers: plain props plus extend ids awaiting activation.
#[derive(Debug, Default)]
pub struct ParsedAnswers {
    pub props: IndexMap<String, serde_json::Value>,
    pub pending_extend_ids: Vec<String>,
}

/// Monotonic postfix source keeping rewritten question names unique within
/// a run. A counter, deliberately not an RNG.
#[derive(Debug, Default)]
pub struct NamePostfixer {
    next: u32,
}

impl NamePostfixer {
    /// Copy the questions, rewriting `$EXTEND$` names with a unique postfix.
    pub fn rewrite(&mut self, questions: &[Question]) -> Vec<Question> {
        questions
            .iter()
            .cloned()
            .map(|mut question| {
                if question.name.starts_with(EXTEND_QUESTION_PREFIX) {
                    question.name =
                        format!("{}{}{}", question.name, POSTFIX_SEPARATOR, self.next);
                    self.next += 1;
                }
                question
            })
            .collect()
    }
}

/// Split raw answers into plain props and extend activations.
///
/// For `$EXTEND$<id>` answers: a `true` boolean activates `<id>` from the
/// question name; a non-empty string activates the named template; an array
/// activates each string element. Everything else is inert.
pub fn parse_answers(answers: AnswerMap) -> ParsedAnswers {
    let mut parsed = ParsedAnswers::default();

    for (name, value) in answers {
        let Some(rest) = name.strip_prefix(EXTEND_QUESTION_PREFIX) else {
            parsed.props.insert(name, value);
            continue;
        };
        let id = rest.split(POSTFIX_SEPARATOR).next().unwrap_or(rest);
        match value {
            serde_json::Value::Bool(true) => {
                parsed.pending_extend_ids.push(id.to_string());
            }
            serde_json::Value::String(template) if !template.is_empty() => {
                parsed.pending_extend_ids.push(template);
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    if let serde_json::Value::String(template) = item {
                        parsed.pending_extend_ids.push(template);
                    }
                }
            }
            _ => {}
        }
    }

    parsed
}
