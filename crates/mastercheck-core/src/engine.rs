//! Central mastery engine orchestrator.
//!
//! Fetches question sets from a [`QuestionSource`], opens quiz sessions
//! numbered by the [`AttemptStore`], and records finished sessions together
//! with their remediation recommendations.
//!
//! Retries apply only to fetching a question set from the source. Session
//! operations (select, submit, finalize, retake checks) fail once and are
//! never retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::{MasteryError, SourceError};
use crate::model::{Attempt, ModuleMasteryStatus, QuestionSet};
use crate::remediation::{Recommendation, RemediationCatalog};
use crate::session::{prioritize_missed_topics, QuizSession, SessionState};
use crate::store::AttemptStore;
use crate::traits::{QuestionRequest, QuestionSource};

/// Configuration for the mastery engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cap on questions per session; `None` serves the whole set.
    pub max_questions: Option<usize>,
    /// Retries on transient source errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_questions: None,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Outcome of finishing a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedQuiz {
    /// The attempt as stored, with its final attempt number.
    pub attempt: Attempt,
    /// Module status after this attempt.
    pub status: ModuleMasteryStatus,
    pub recommendations: Vec<Recommendation>,
}

type TicketKey = (String, String);

/// The central mastery engine.
pub struct MasteryEngine {
    source: Arc<dyn QuestionSource>,
    store: Arc<AttemptStore>,
    catalog: RemediationCatalog,
    config: EngineConfig,
    tickets: Mutex<HashMap<TicketKey, u64>>,
}

impl MasteryEngine {
    pub fn new(
        source: Arc<dyn QuestionSource>,
        store: Arc<AttemptStore>,
        catalog: RemediationCatalog,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            config,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<AttemptStore> {
        &self.store
    }

    pub fn catalog(&self) -> &RemediationCatalog {
        &self.catalog
    }

    /// Open a fresh session for a module.
    pub async fn start_quiz(&self, learner: &str, module_id: &str) -> Result<QuizSession> {
        let request = QuestionRequest {
            module_id: module_id.to_string(),
            attempt_number: self.store.next_attempt_number(learner, module_id),
            focus_topics: Vec::new(),
            max_questions: self.config.max_questions,
        };
        let set = self.fetch_current(learner, &request).await?;
        let questions = truncate(set.questions, self.config.max_questions);
        Ok(QuizSession::new(module_id, questions, request.attempt_number)?)
    }

    /// Open a retake after a failed, finalized session. Questions from the
    /// topics missed last time are served first.
    pub async fn start_retake(&self, learner: &str, failed: &QuizSession) -> Result<QuizSession> {
        match failed.attempt() {
            Some(attempt) if failed.state() == SessionState::Finalized => {
                if attempt.passed() {
                    return Err(MasteryError::RetakeNotAllowed(format!(
                        "attempt {} passed with {}%",
                        attempt.attempt_number(),
                        attempt.percentage()
                    ))
                    .into());
                }
            }
            _ => {
                return Err(
                    MasteryError::RetakeNotAllowed("session has not been finalized".into()).into(),
                )
            }
        }

        let missed = failed.missed_topics();
        let request = QuestionRequest {
            module_id: failed.module_id().to_string(),
            attempt_number: failed.attempt_number() + 1,
            focus_topics: missed.iter().cloned().collect(),
            max_questions: self.config.max_questions,
        };
        let set = self.fetch_current(learner, &request).await?;
        let questions = prioritize_missed_topics(&set.questions, &missed, self.config.max_questions);
        Ok(failed.retake(questions)?)
    }

    /// Finalize a session, append it to the store and work out what the
    /// learner should review next.
    pub fn complete(&self, learner: &str, session: &mut QuizSession) -> Result<CompletedQuiz> {
        let attempt = session.finalize()?;
        let attempt = self.store.append(learner, attempt);
        let status = self
            .store
            .history(learner)
            .module_status(attempt.module_id());
        let recommendations = self.catalog.recommendations(&attempt);

        tracing::info!(
            learner,
            module = attempt.module_id(),
            attempt = attempt.attempt_number(),
            status = %status,
            recommendations = recommendations.len(),
            "quiz completed"
        );

        Ok(CompletedQuiz {
            attempt,
            status,
            recommendations,
        })
    }

    /// Persist an unfinished session as an incomplete attempt.
    pub fn save_checkpoint(&self, learner: &str, session: &QuizSession) -> Result<Attempt> {
        let attempt = session.checkpoint()?;
        Ok(self.store.append(learner, attempt))
    }

    /// Fetch under a fresh ticket and drop the result if a newer request
    /// for the same learner and module was issued meanwhile.
    async fn fetch_current(&self, learner: &str, request: &QuestionRequest) -> Result<QuestionSet> {
        let key = (learner.to_string(), request.module_id.clone());
        let ticket = self.issue_ticket(&key);

        let set = self.fetch_with_retry(request).await?;

        let latest = self.latest_ticket(&key);
        if latest != ticket {
            tracing::warn!(
                learner,
                module = %request.module_id,
                ticket,
                latest,
                "discarding stale question set"
            );
            return Err(MasteryError::StaleQuestionSet {
                module_id: request.module_id.clone(),
                ticket,
                latest,
            }
            .into());
        }

        if set.module_id != request.module_id {
            anyhow::bail!(
                "source '{}' returned module '{}' for request '{}'",
                self.source.name(),
                set.module_id,
                request.module_id
            );
        }

        tracing::info!(
            source = self.source.name(),
            module = %set.module_id,
            questions = set.questions.len(),
            "question set loaded"
        );
        Ok(set)
    }

    async fn fetch_with_retry(&self, request: &QuestionRequest) -> Result<QuestionSet> {
        let mut retry_delay = self.config.retry_delay;
        let mut attempt = 0;
        loop {
            let err = match self.source.fetch(request).await {
                Ok(set) => return Ok(set),
                Err(e) => e,
            };

            let source_err = err.downcast_ref::<SourceError>();
            if source_err.is_some_and(SourceError::is_permanent) || attempt >= self.config.max_retries {
                tracing::error!(
                    source = self.source.name(),
                    module = %request.module_id,
                    attempts = attempt + 1,
                    "question fetch failed: {err:#}"
                );
                return Err(err);
            }

            let delay = source_err
                .and_then(SourceError::retry_after_ms)
                .map(Duration::from_millis)
                .unwrap_or(retry_delay);
            tracing::warn!(
                source = self.source.name(),
                module = %request.module_id,
                retry = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "question fetch failed, retrying: {err:#}"
            );
            tokio::time::sleep(delay).await;
            retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            attempt += 1;
        }
    }

    fn issue_ticket(&self, key: &TicketKey) -> u64 {
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = tickets.entry(key.clone()).or_insert(0);
        *ticket += 1;
        *ticket
    }

    fn latest_ticket(&self, key: &TicketKey) -> u64 {
        let tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        tickets.get(key).copied().unwrap_or(0)
    }
}

fn truncate<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}
