//! Append-only attempt store keyed by (learner, module).
//!
//! Each key owns its own lock, so appends for one learner's module are
//! serialized while unrelated keys never contend. There is no update or
//! delete: a correction is a new attempt.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MasteryResult;
use crate::model::{Attempt, Question};
use crate::session::QuizSession;

type AttemptLog = Arc<Mutex<Vec<Attempt>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AttemptKey {
    learner: String,
    module_id: String,
}

/// Thread-safe, append-only attempt log.
#[derive(Debug, Default)]
pub struct AttemptStore {
    logs: RwLock<HashMap<AttemptKey, AttemptLog>>,
}

/// On-disk layout: learner → module → attempts in chronological order.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    learners: BTreeMap<String, BTreeMap<String, Vec<Attempt>>>,
}

impl AttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, learner: &str, module_id: &str) -> AttemptLog {
        let key = AttemptKey {
            learner: learner.to_string(),
            module_id: module_id.to_string(),
        };
        if let Some(log) = self
            .logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(log);
        }
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(logs.entry(key).or_default())
    }

    /// Append an attempt and return the stored record.
    ///
    /// The attempt number is assigned under the key's lock as the number
    /// of completed attempts so far plus one, so two sessions finalized
    /// concurrently still get consecutive numbers.
    pub fn append(&self, learner: &str, attempt: Attempt) -> Attempt {
        let log = self.log(learner, attempt.module_id());
        let mut entries = log.lock().unwrap_or_else(PoisonError::into_inner);

        let expected = entries.iter().filter(|a| a.completed()).count() as u32 + 1;
        let stored = if attempt.attempt_number() == expected {
            attempt
        } else {
            tracing::debug!(
                learner,
                module = attempt.module_id(),
                requested = attempt.attempt_number(),
                assigned = expected,
                "attempt renumbered on append"
            );
            attempt.renumbered(expected)
        };

        tracing::debug!(
            learner,
            module = stored.module_id(),
            attempt = stored.attempt_number(),
            completed = stored.completed(),
            "attempt appended"
        );
        entries.push(stored.clone());
        stored
    }

    /// Every attempt for a module, oldest first.
    pub fn all_attempts(&self, learner: &str, module_id: &str) -> Vec<Attempt> {
        let log = self.log(learner, module_id);
        let entries = log.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clone()
    }

    pub fn latest_attempt(&self, learner: &str, module_id: &str) -> Option<Attempt> {
        let log = self.log(learner, module_id);
        let entries = log.lock().unwrap_or_else(PoisonError::into_inner);
        entries.last().cloned()
    }

    /// Attempt number the next session for this module should carry.
    pub fn next_attempt_number(&self, learner: &str, module_id: &str) -> u32 {
        let log = self.log(learner, module_id);
        let entries = log.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|a| a.completed()).count() as u32 + 1
    }

    /// Start a session numbered after the learner's completed attempts.
    pub fn start_session(
        &self,
        learner: &str,
        module_id: &str,
        questions: Vec<Question>,
    ) -> MasteryResult<QuizSession> {
        let number = self.next_attempt_number(learner, module_id);
        QuizSession::new(module_id, questions, number)
    }

    /// Immutable snapshot of one learner's attempts across all modules.
    pub fn history(&self, learner: &str) -> LearnerHistory {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        let modules = logs
            .iter()
            .filter(|(key, _)| key.learner == learner)
            .map(|(key, log)| {
                let entries = log.lock().unwrap_or_else(PoisonError::into_inner);
                (key.module_id.clone(), entries.clone())
            })
            .filter(|(_, entries)| !entries.is_empty())
            .collect();
        LearnerHistory::new(learner, modules)
    }

    /// Learners with at least one stored attempt, sorted.
    pub fn learners(&self) -> Vec<String> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        let mut learners: Vec<String> = logs
            .iter()
            .filter(|(_, log)| !log.lock().unwrap_or_else(PoisonError::into_inner).is_empty())
            .map(|(key, _)| key.learner.clone())
            .collect();
        learners.sort();
        learners.dedup();
        learners
    }

    /// Save the whole store as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let mut file = StoreFile::default();
        for learner in self.learners() {
            let history = self.history(&learner);
            file.learners.insert(learner, history.into_modules());
        }

        let json = serde_json::to_string_pretty(&file).context("failed to serialize attempt store")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write attempt store to {}", path.display()))?;
        Ok(())
    }

    /// Load a store saved with [`save_json`](Self::save_json).
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt store from {}", path.display()))?;
        let file: StoreFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse attempt store {}", path.display()))?;

        let mut logs = HashMap::new();
        for (learner, modules) in file.learners {
            for (module_id, attempts) in modules {
                if let Some(stray) = attempts.iter().find(|a| a.module_id() != module_id) {
                    anyhow::bail!(
                        "attempt store {}: learner {learner} has an attempt for module {} filed under module {module_id}",
                        path.display(),
                        stray.module_id()
                    );
                }
                logs.insert(
                    AttemptKey {
                        learner: learner.clone(),
                        module_id,
                    },
                    Arc::new(Mutex::new(attempts)),
                );
            }
        }
        tracing::debug!(keys = logs.len(), "attempt store loaded");

        Ok(Self {
            logs: RwLock::new(logs),
        })
    }

    /// Load the store at `path`, or start empty when the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_json(path)
        } else {
            Ok(Self::new())
        }
    }
}

/// A learner's attempts per module, frozen at the time it was taken.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerHistory {
    learner: String,
    modules: BTreeMap<String, Vec<Attempt>>,
}

impl LearnerHistory {
    pub fn new(learner: impl Into<String>, modules: BTreeMap<String, Vec<Attempt>>) -> Self {
        Self {
            learner: learner.into(),
            modules,
        }
    }

    pub fn learner(&self) -> &str {
        &self.learner
    }

    /// Attempts for a module, oldest first; empty if none exist.
    pub fn attempts(&self, module_id: &str) -> &[Attempt] {
        self.modules.get(module_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest_attempt(&self, module_id: &str) -> Option<&Attempt> {
        self.attempts(module_id).last()
    }

    /// Modules with at least one attempt.
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    fn into_modules(self) -> BTreeMap<String, Vec<Attempt>> {
        self.modules
    }
}
