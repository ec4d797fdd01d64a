//! Question source trait.
//!
//! Implemented by the `mastercheck-sources` crate. The engine never builds
//! questions itself; it asks a source for a set and validates what comes
//! back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::QuestionSet;

// ---------------------------------------------------------------------------
// Question source trait
// ---------------------------------------------------------------------------

/// A supplier of question sets (a local bank, a generation service, ...).
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name (e.g. "directory").
    fn name(&self) -> &str;

    /// Fetch a question set for a module.
    ///
    /// Failures at the transport level should be returned as
    /// [`SourceError`](crate::error::SourceError) so the engine can tell
    /// transient errors from permanent ones.
    async fn fetch(&self, request: &QuestionRequest) -> anyhow::Result<QuestionSet>;
}

/// What the engine asks a source for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub module_id: String,
    /// Attempt number the set is for; retakes are 2 and up.
    pub attempt_number: u32,
    /// Topics missed on the previous attempt, to be served first.
    #[serde(default)]
    pub focus_topics: Vec<String>,
    /// Upper bound on the number of questions.
    #[serde(default)]
    pub max_questions: Option<usize>,
}

impl QuestionRequest {
    pub fn first_attempt(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            attempt_number: 1,
            focus_topics: Vec::new(),
            max_questions: None,
        }
    }
}
