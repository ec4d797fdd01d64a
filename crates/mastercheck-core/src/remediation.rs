//! Remediation resources for missed questions.
//!
//! A catalog maps module id → question id → reference URLs. Lookups for
//! unknown ids return an empty list; they are never an error.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Attempt;

/// Reference links registered per module and question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemediationCatalog {
    #[serde(default)]
    resources: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Links to review for one missed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub question_id: String,
    pub prompt: String,
    pub urls: Vec<String>,
}

impl RemediationCatalog {
    pub fn new(resources: HashMap<String, HashMap<String, Vec<String>>>) -> Self {
        Self { resources }
    }

    /// Register links for a question, replacing any previous entry.
    pub fn insert(
        &mut self,
        module_id: impl Into<String>,
        question_id: impl Into<String>,
        urls: Vec<String>,
    ) {
        self.resources
            .entry(module_id.into())
            .or_default()
            .insert(question_id.into(), urls);
    }

    /// Links for a question, in registration order.
    pub fn resources_for(&self, module_id: &str, question_id: &str) -> &[String] {
        self.resources
            .get(module_id)
            .and_then(|questions| questions.get(question_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Recommendations for every wrong answer in a finished attempt, in
    /// question order. Questions without registered links are skipped.
    pub fn recommendations(&self, attempt: &Attempt) -> Vec<Recommendation> {
        if !attempt.completed() {
            return Vec::new();
        }
        let wrong = attempt.incorrect_question_ids();
        attempt
            .questions()
            .iter()
            .filter(|q| wrong.contains(&q.id.as_str()))
            .filter_map(|q| {
                let urls = self.resources_for(attempt.module_id(), &q.id);
                (!urls.is_empty()).then(|| Recommendation {
                    question_id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    urls: urls.to_vec(),
                })
            })
            .collect()
    }

    pub fn module_count(&self) -> usize {
        self.resources.len()
    }

    /// Parse a TOML catalog of the form:
    ///
    /// ```toml
    /// [resources."1"]
    /// "5" = ["https://en.wikipedia.org/wiki/Amdahl%27s_law"]
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse remediation catalog")
    }

    /// Load a TOML catalog from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read remediation catalog: {}", path.display()))?;
        let catalog = Self::from_toml_str(&content)
            .with_context(|| format!("in {}", path.display()))?;
        tracing::debug!(
            modules = catalog.module_count(),
            path = %path.display(),
            "remediation catalog loaded"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, Question};
    use crate::session::QuizSession;

    const CATALOG: &str = r#"
[resources."1"]
"1" = ["https://en.wikipedia.org/wiki/Moore%27s_law"]
"5" = [
    "https://en.wikipedia.org/wiki/Amdahl%27s_law",
    "https://www.cs.ucr.edu/~zhiyunq/teaching/cs145/Amdahl.pdf",
]
"#;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            prompt: format!("Q{id}"),
            choices: vec![
                Choice {
                    id: "a".into(),
                    text: "A".into(),
                },
                Choice {
                    id: "b".into(),
                    text: "B".into(),
                },
            ],
            correct_choice_id: "a".into(),
            topic: "Performance".into(),
            sub_topic: String::new(),
            hint: None,
        }
    }

    #[test]
    fn lookup_preserves_order() {
        let catalog = RemediationCatalog::from_toml_str(CATALOG).unwrap();
        let urls = catalog.resources_for("1", "5");
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("wikipedia"));
    }

    #[test]
    fn unknown_ids_return_empty() {
        let catalog = RemediationCatalog::from_toml_str(CATALOG).unwrap();
        assert!(catalog.resources_for("1", "99").is_empty());
        assert!(catalog.resources_for("42", "1").is_empty());
        assert!(RemediationCatalog::default().resources_for("1", "1").is_empty());
    }

    #[test]
    fn recommendations_cover_wrong_answers_only() {
        let catalog = RemediationCatalog::from_toml_str(CATALOG).unwrap();
        let mut session =
            QuizSession::new("1", vec![question("1"), question("5"), question("7")], 1).unwrap();
        for (i, choice) in ["a", "b", "b"].iter().enumerate() {
            session.go_to(i);
            let id = session.current_question().id.clone();
            session.select_choice(&id, choice).unwrap();
            session.submit_current().unwrap();
        }
        let attempt = session.finalize().unwrap();

        // "1" was right, "7" has no links.
        let recs = catalog.recommendations(&attempt);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].question_id, "5");
        assert_eq!(recs[0].urls.len(), 2);
    }

    #[test]
    fn insert_replaces_entry() {
        let mut catalog = RemediationCatalog::default();
        catalog.insert("2", "6", vec!["https://a".into()]);
        catalog.insert("2", "6", vec!["https://b".into()]);
        assert_eq!(catalog.resources_for("2", "6"), ["https://b".to_string()]);
    }

    #[test]
    fn malformed_catalog_is_an_error() {
        assert!(RemediationCatalog::from_toml_str("resources = 3").is_err());
    }
}
