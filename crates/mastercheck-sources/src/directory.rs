//! Question sets served from a local directory of TOML files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use mastercheck_core::error::SourceError;
use mastercheck_core::model::QuestionSet;
use mastercheck_core::parser::load_question_bank;
use mastercheck_core::session::prioritize_missed_topics;
use mastercheck_core::traits::{QuestionRequest, QuestionSource};

/// A question bank loaded once from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    sets: BTreeMap<String, QuestionSet>,
}

impl DirectorySource {
    /// Load every question set under `root`. When two files declare the
    /// same module, the first one in path order wins.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let mut sets = BTreeMap::new();
        for set in load_question_bank(root)? {
            if sets.contains_key(&set.module_id) {
                tracing::warn!(
                    module = %set.module_id,
                    root = %root.display(),
                    "duplicate module in question bank, keeping the first"
                );
                continue;
            }
            sets.insert(set.module_id.clone(), set);
        }
        tracing::info!(root = %root.display(), modules = sets.len(), "question bank loaded");
        Ok(Self {
            root: root.to_path_buf(),
            sets,
        })
    }

    pub fn from_sets(sets: impl IntoIterator<Item = QuestionSet>) -> Self {
        Self {
            root: PathBuf::new(),
            sets: sets
                .into_iter()
                .map(|s| (s.module_id.clone(), s))
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Module ids in the bank, sorted.
    pub fn module_ids(&self) -> Vec<String> {
        self.sets.keys().cloned().collect()
    }

    pub fn get(&self, module_id: &str) -> Option<&QuestionSet> {
        self.sets.get(module_id)
    }
}

#[async_trait]
impl QuestionSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch(&self, request: &QuestionRequest) -> anyhow::Result<QuestionSet> {
        let set = self
            .sets
            .get(&request.module_id)
            .ok_or_else(|| SourceError::ModuleNotFound(request.module_id.clone()))?;

        let focus: BTreeSet<String> = request.focus_topics.iter().cloned().collect();
        Ok(QuestionSet {
            questions: prioritize_missed_topics(&set.questions, &focus, request.max_questions),
            ..set.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_toml(module: &str, topics: &[&str]) -> String {
        let mut s = format!("[quiz]\nmodule_id = \"{module}\"\ntitle = \"Module {module}\"\n");
        for (i, topic) in topics.iter().enumerate() {
            s.push_str(&format!(
                r#"
[[questions]]
id = "{i}"
prompt = "Q{i}"
topic = "{topic}"
correct = "a"
choices = [{{ id = "a", text = "A" }}, {{ id = "b", text = "B" }}]
"#
            ));
        }
        s
    }

    fn bank() -> (tempfile::TempDir, DirectorySource) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            set_toml("1", &["ISA", "Caches", "ISA", "Pipelining"]),
        )
        .unwrap();
        std::fs::write(dir.path().join("b.toml"), set_toml("2", &["Memory"])).unwrap();
        std::fs::write(dir.path().join("c.toml"), set_toml("2", &["Duplicate"])).unwrap();
        let source = DirectorySource::open(dir.path()).unwrap();
        (dir, source)
    }

    #[tokio::test]
    async fn serves_whole_set_for_first_attempt() {
        let (_dir, source) = bank();
        assert_eq!(source.module_ids(), vec!["1", "2"]);

        let set = source
            .fetch(&QuestionRequest::first_attempt("1"))
            .await
            .unwrap();
        assert_eq!(set.title, "Module 1");
        let ids: Vec<&str> = set.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn duplicate_module_keeps_first_file() {
        let (_dir, source) = bank();
        assert_eq!(source.get("2").unwrap().questions[0].topic, "Memory");
    }

    #[tokio::test]
    async fn focus_topics_come_first_and_cap_applies() {
        let (_dir, source) = bank();
        let request = QuestionRequest {
            module_id: "1".into(),
            attempt_number: 2,
            focus_topics: vec!["Pipelining".into(), "Caches".into()],
            max_questions: Some(3),
        };
        let set = source.fetch(&request).await.unwrap();
        let ids: Vec<&str> = set.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "0"]);
    }

    #[tokio::test]
    async fn unknown_module_is_permanent() {
        let (_dir, source) = bank();
        let err = source
            .fetch(&QuestionRequest::first_attempt("42"))
            .await
            .unwrap_err();
        let source_err = err.downcast_ref::<SourceError>().unwrap();
        assert!(source_err.is_permanent());
    }
}
