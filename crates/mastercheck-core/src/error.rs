//! Engine and question-source error types.
//!
//! Every `MasteryError` variant is a rejected operation: the session or
//! store that raised it is left exactly as it was before the call.
//! `SourceError` lives here too so the engine can downcast source failures
//! and decide whether to retry.

use thiserror::Error;

/// Errors raised by quiz sessions, the attempt store and the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasteryError {
    /// `submit_current` was called before a choice was selected.
    #[error("no answer selected for question {question_id}")]
    NoAnswerSelected { question_id: String },

    /// `finalize` was called while some questions are still unlocked.
    #[error("attempt incomplete: {locked} of {total} questions submitted")]
    IncompleteAttempt { locked: usize, total: usize },

    /// A mutating operation was attempted on a finalized or reviewed session.
    #[error("session is locked; only navigation is allowed")]
    SessionLocked,

    /// A session was constructed without any questions.
    #[error("question set for module {0} is empty")]
    EmptyQuestionSet(String),

    /// `retake` was called on a passing or non-finalized session.
    #[error("retake not allowed: {0}")]
    RetakeNotAllowed(String),

    /// The question id is not part of this session.
    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    /// The choice id does not belong to the question.
    #[error("unknown choice {choice_id} for question {question_id}")]
    UnknownChoice {
        question_id: String,
        choice_id: String,
    },

    /// A question violates the model invariants.
    #[error("invalid question {question_id}: {reason}")]
    InvalidQuestion { question_id: String, reason: String },

    /// A question set arrived after a newer request for the same module.
    #[error("stale question set for module {module_id} (request {ticket}, latest {latest})")]
    StaleQuestionSet {
        module_id: String,
        ticket: u64,
        latest: u64,
    },
}

impl MasteryError {
    /// Returns `true` if the caller can re-prompt and keep using the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            MasteryError::EmptyQuestionSet(_) | MasteryError::InvalidQuestion { .. }
        )
    }
}

/// Convenience alias for engine results.
pub type MasteryResult<T> = Result<T, MasteryError>;

/// Failures at the question-source boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source answered 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Credentials were missing or rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The source has no questions for this module.
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    /// Any other non-success response.
    #[error("source error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl SourceError {
    /// Returns `true` if retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SourceError::AuthenticationFailed(_) | SourceError::ModuleNotFound(_)
        )
    }

    /// Server-requested delay before the next try, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SourceError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
