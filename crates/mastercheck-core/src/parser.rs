//! TOML question set parser.
//!
//! Loads question sets from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Choice, Question, QuestionSet};

/// Intermediate TOML structure for question set files.
#[derive(Debug, Deserialize)]
struct TomlQuestionFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    module_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    topic: String,
    #[serde(default)]
    sub_topic: String,
    correct: String,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    choices: Vec<TomlChoice>,
}

#[derive(Debug, Deserialize)]
struct TomlChoice {
    id: String,
    text: String,
}

/// Parse a single TOML file into a `QuestionSet`.
pub fn parse_question_set(path: &Path) -> Result<QuestionSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question set file: {}", path.display()))?;

    parse_question_set_str(&content, path)
}

/// Parse a TOML string into a `QuestionSet`.
pub fn parse_question_set_str(content: &str, source_path: &Path) -> Result<QuestionSet> {
    let parsed: TomlQuestionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            prompt: q.prompt,
            choices: q
                .choices
                .into_iter()
                .map(|c| Choice { id: c.id, text: c.text })
                .collect(),
            correct_choice_id: q.correct,
            topic: q.topic,
            sub_topic: q.sub_topic,
            hint: q.hint.filter(|h| !h.trim().is_empty()),
        })
        .collect();

    Ok(QuestionSet {
        module_id: parsed.quiz.module_id,
        title: parsed.quiz.title,
        description: parsed.quiz.description,
        questions,
    })
}

/// Recursively load all `.toml` question sets from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_question_bank(dir: &Path) -> Result<Vec<QuestionSet>> {
    let mut sets = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            sets.extend(load_question_bank(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_set(&path) {
                Ok(set) => sets.push(set),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(sets)
}

/// A warning from question set validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The question id, when the warning is about one question.
    pub question_id: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.question_id {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Validate a question set for problems that would stop a session from
/// starting or make grading ambiguous.
pub fn validate_question_set(set: &QuestionSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if set.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: format!("module '{}' has no questions", set.module_id),
        });
    }

    let mut seen_ids = HashSet::new();
    for q in &set.questions {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message,
            })
        };

        if !seen_ids.insert(q.id.as_str()) {
            warn(format!("duplicate question ID: {}", q.id));
        }
        if q.prompt.trim().is_empty() {
            warn("prompt is empty".into());
        }
        if q.choices.len() < 2 {
            warn(format!("needs at least 2 choices, has {}", q.choices.len()));
        }

        let mut seen_choices = HashSet::new();
        for c in &q.choices {
            if !seen_choices.insert(c.id.as_str()) {
                warn(format!("duplicate choice ID: {}", c.id));
            }
        }
        if q.choice(&q.correct_choice_id).is_none() {
            warn(format!(
                "correct choice '{}' is not among the choices",
                q.correct_choice_id
            ));
        }
        if q.topic.trim().is_empty() {
            warn("topic is empty".into());
        }
    }

    warnings
}
