//! Mock source for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use mastercheck_core::error::SourceError;
use mastercheck_core::model::QuestionSet;
use mastercheck_core::traits::{QuestionRequest, QuestionSource};

/// A source that serves fixed question sets and records what it was asked.
pub struct MockSource {
    /// Module id → set.
    sets: HashMap<String, QuestionSet>,
    call_count: AtomicU32,
    last_request: Mutex<Option<QuestionRequest>>,
}

impl MockSource {
    pub fn new(sets: impl IntoIterator<Item = QuestionSet>) -> Self {
        Self {
            sets: sets
                .into_iter()
                .map(|s| (s.module_id.clone(), s))
                .collect(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of fetches made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<QuestionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QuestionSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: &QuestionRequest) -> anyhow::Result<QuestionSet> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        let mut set = self
            .sets
            .get(&request.module_id)
            .cloned()
            .ok_or_else(|| SourceError::ModuleNotFound(request.module_id.clone()))?;
        if let Some(limit) = request.max_questions {
            set.questions.truncate(limit);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastercheck_core::model::{Choice, Question};

    fn set(module: &str, n: usize) -> QuestionSet {
        QuestionSet {
            module_id: module.into(),
            title: format!("Module {module}"),
            description: String::new(),
            questions: (1..=n)
                .map(|i| Question {
                    id: i.to_string(),
                    prompt: format!("Q{i}"),
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
                    topic: "t".into(),
                    sub_topic: String::new(),
                    hint: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn serves_and_records() {
        let source = MockSource::new([set("1", 5), set("2", 2)]);
        let request = QuestionRequest {
            max_questions: Some(3),
            ..QuestionRequest::first_attempt("1")
        };

        let served = source.fetch(&request).await.unwrap();
        assert_eq!(served.questions.len(), 3);
        assert_eq!(source.call_count(), 1);
        assert_eq!(source.last_request(), Some(request));
    }

    #[tokio::test]
    async fn unknown_module() {
        let source = MockSource::new([set("1", 1)]);
        let err = source
            .fetch(&QuestionRequest::first_attempt("9"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("module not found: 9"));
        assert_eq!(source.call_count(), 1);
    }
}
