//! Quiz session state machine.
//!
//! A [`QuizSession`] runs one attempt at a module quiz:
//!
//! ```text
//! Active ──(all questions locked)──▶ ReadyToFinish ──finalize──▶ Finalized ──begin_review──▶ Reviewing
//! ```
//!
//! Answers are keyed by question id, never by position. A locked question
//! never changes again. Failing operations leave the session untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MasteryError, MasteryResult};
use crate::model::{Attempt, Question, HINT_BUDGET};

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// At least one question is still unlocked.
    Active,
    /// Every question is locked; `finalize` will succeed.
    ReadyToFinish,
    /// An attempt has been produced.
    Finalized,
    /// Read-only replay of a finalized attempt.
    Reviewing,
}

#[derive(Debug, Clone)]
enum Phase {
    Open,
    Finalized(Attempt),
    Reviewing(Attempt),
}

/// Correctness of a locked answer, exposed for immediate feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub question_id: String,
    pub selected_choice_id: String,
    pub correct_choice_id: String,
    pub correct: bool,
}

/// Everything a view needs to render the current step of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub module_id: String,
    pub attempt_number: u32,
    pub state: SessionState,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: Question,
    pub selected_choice_id: Option<String>,
    pub locked: bool,
    pub feedback: Option<AnswerFeedback>,
    pub hints_remaining: u32,
    pub revealed_hint: Option<String>,
    pub answered: usize,
    pub score: u32,
}

/// One learner's run through a module quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    module_id: String,
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<String, String>,
    locked: BTreeSet<String>,
    hints_remaining: u32,
    revealed_hints: BTreeSet<String>,
    attempt_number: u32,
    phase: Phase,
}

impl QuizSession {
    /// Start a new session. Fails with `EmptyQuestionSet` when `questions`
    /// is empty and `InvalidQuestion` when any question breaks the model
    /// invariants or ids repeat.
    pub fn new(
        module_id: impl Into<String>,
        questions: Vec<Question>,
        attempt_number: u32,
    ) -> MasteryResult<Self> {
        let module_id = module_id.into();
        if questions.is_empty() {
            return Err(MasteryError::EmptyQuestionSet(module_id));
        }

        let mut ids = HashSet::new();
        for q in &questions {
            q.validate()?;
            if !ids.insert(q.id.as_str()) {
                return Err(MasteryError::InvalidQuestion {
                    question_id: q.id.clone(),
                    reason: "duplicate question id in set".into(),
                });
            }
        }

        tracing::debug!(
            module = %module_id,
            attempt = attempt_number,
            questions = questions.len(),
            "quiz session started"
        );

        Ok(Self {
            module_id,
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
            locked: BTreeSet::new(),
            hints_remaining: HINT_BUDGET,
            revealed_hints: BTreeSet::new(),
            attempt_number: attempt_number.max(1),
            phase: Phase::Open,
        })
    }

    /// Open a stored attempt for read-only replay.
    pub fn review(attempt: &Attempt) -> MasteryResult<Self> {
        if attempt.questions().is_empty() {
            return Err(MasteryError::EmptyQuestionSet(attempt.module_id().to_string()));
        }

        let locked = attempt.answers().keys().cloned().collect();
        Ok(Self {
            module_id: attempt.module_id().to_string(),
            questions: attempt.questions().to_vec(),
            current_index: 0,
            answers: attempt.answers().clone(),
            locked,
            hints_remaining: HINT_BUDGET.saturating_sub(attempt.hints_used()),
            revealed_hints: BTreeSet::new(),
            attempt_number: attempt.attempt_number(),
            phase: Phase::Reviewing(attempt.clone()),
        })
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Finalized(_) => SessionState::Finalized,
            Phase::Reviewing(_) => SessionState::Reviewing,
            Phase::Open if self.locked.len() == self.questions.len() => {
                SessionState::ReadyToFinish
            }
            Phase::Open => SessionState::Active,
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn is_locked(&self, question_id: &str) -> bool {
        self.locked.contains(question_id)
    }

    pub fn locked_count(&self) -> usize {
        self.locked.len()
    }

    pub fn hints_remaining(&self) -> u32 {
        self.hints_remaining
    }

    /// The attempt produced by `finalize`, if any.
    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.phase {
            Phase::Finalized(a) | Phase::Reviewing(a) => Some(a),
            Phase::Open => None,
        }
    }

    /// Correct answers among locked questions.
    pub fn running_score(&self) -> u32 {
        self.questions
            .iter()
            .filter(|q| self.locked.contains(&q.id))
            .filter(|q| self.answers.get(&q.id).is_some_and(|c| q.is_correct(c)))
            .count() as u32
    }

    fn ensure_open(&self) -> MasteryResult<()> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Finalized(_) | Phase::Reviewing(_) => Err(MasteryError::SessionLocked),
        }
    }

    fn position(&self, question_id: &str) -> MasteryResult<usize> {
        self.questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| MasteryError::UnknownQuestion(question_id.to_string()))
    }

    /// Record a choice for a question. Returns `Ok(false)` without touching
    /// anything when the question is already locked.
    pub fn select_choice(&mut self, question_id: &str, choice_id: &str) -> MasteryResult<bool> {
        self.ensure_open()?;
        let idx = self.position(question_id)?;

        if self.locked.contains(question_id) {
            tracing::debug!(question = question_id, "selection ignored, question locked");
            return Ok(false);
        }

        if self.questions[idx].choice(choice_id).is_none() {
            return Err(MasteryError::UnknownChoice {
                question_id: question_id.to_string(),
                choice_id: choice_id.to_string(),
            });
        }

        self.answers
            .insert(question_id.to_string(), choice_id.to_string());
        Ok(true)
    }

    /// Lock the current question's answer. Resubmitting a locked question
    /// returns its existing feedback unchanged.
    pub fn submit_current(&mut self) -> MasteryResult<AnswerFeedback> {
        self.ensure_open()?;
        let question_id = self.current_question().id.clone();

        if !self.answers.contains_key(&question_id) {
            return Err(MasteryError::NoAnswerSelected { question_id });
        }

        if self.locked.insert(question_id.clone()) {
            tracing::debug!(
                module = %self.module_id,
                question = %question_id,
                locked = self.locked.len(),
                total = self.questions.len(),
                "answer locked"
            );
        }

        self.feedback(&question_id)
            .ok_or(MasteryError::UnknownQuestion(question_id))
    }

    /// Feedback for a locked question; `None` while it is still open.
    pub fn feedback(&self, question_id: &str) -> Option<AnswerFeedback> {
        if !self.locked.contains(question_id) {
            return None;
        }
        let question = self.questions.iter().find(|q| q.id == question_id)?;
        let selected = self.answers.get(question_id)?;
        Some(AnswerFeedback {
            question_id: question_id.to_string(),
            selected_choice_id: selected.clone(),
            correct_choice_id: question.correct_choice_id.clone(),
            correct: question.is_correct(selected),
        })
    }

    /// Move to the next question, staying on the last one.
    pub fn go_next(&mut self) -> usize {
        self.go_to(self.current_index.saturating_add(1))
    }

    /// Move to the previous question, staying on the first one.
    pub fn go_previous(&mut self) -> usize {
        self.go_to(self.current_index.saturating_sub(1))
    }

    /// Jump to a question index, clamped to the question range.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.current_index = index.min(self.questions.len().saturating_sub(1));
        self.current_index
    }

    /// Spend one hint on a question. Returns the hint text when a hint was
    /// consumed, `None` when the budget is exhausted or the question has no
    /// hint.
    pub fn use_hint(&mut self, question_id: &str) -> MasteryResult<Option<&str>> {
        self.ensure_open()?;
        let idx = self.position(question_id)?;

        if self.hints_remaining == 0 || self.questions[idx].hint.is_none() {
            return Ok(None);
        }

        self.hints_remaining -= 1;
        self.revealed_hints.insert(question_id.to_string());
        tracing::debug!(
            question = question_id,
            remaining = self.hints_remaining,
            "hint used"
        );
        Ok(self.questions[idx].hint.as_deref())
    }

    /// Turn a fully locked session into an immutable attempt.
    pub fn finalize(&mut self) -> MasteryResult<Attempt> {
        self.ensure_open()?;
        if self.locked.len() != self.questions.len() {
            return Err(MasteryError::IncompleteAttempt {
                locked: self.locked.len(),
                total: self.questions.len(),
            });
        }

        let attempt = Attempt::record(
            self.module_id.clone(),
            self.attempt_number,
            self.questions.clone(),
            self.answers.clone(),
            true,
            HINT_BUDGET - self.hints_remaining,
        );

        tracing::info!(
            module = %self.module_id,
            attempt = self.attempt_number,
            score = attempt.score(),
            percentage = attempt.percentage(),
            passed = attempt.passed(),
            "quiz finalized"
        );

        self.phase = Phase::Finalized(attempt.clone());
        Ok(attempt)
    }

    /// Snapshot an unfinished session as an incomplete attempt. Only locked
    /// answers are recorded.
    pub fn checkpoint(&self) -> MasteryResult<Attempt> {
        self.ensure_open()?;
        let answers = self
            .answers
            .iter()
            .filter(|(id, _)| self.locked.contains(*id))
            .map(|(id, choice)| (id.clone(), choice.clone()))
            .collect();

        Ok(Attempt::record(
            self.module_id.clone(),
            self.attempt_number,
            self.questions.clone(),
            answers,
            false,
            HINT_BUDGET - self.hints_remaining,
        ))
    }

    /// Switch a finalized session to read-only review.
    pub fn begin_review(&mut self) -> MasteryResult<()> {
        match &self.phase {
            Phase::Open => Err(MasteryError::IncompleteAttempt {
                locked: self.locked.len(),
                total: self.questions.len(),
            }),
            Phase::Reviewing(_) => Ok(()),
            Phase::Finalized(attempt) => {
                self.phase = Phase::Reviewing(attempt.clone());
                self.current_index = 0;
                Ok(())
            }
        }
    }

    /// Topics missed in the finalized attempt, for biasing retake supply.
    pub fn missed_topics(&self) -> BTreeSet<String> {
        self.attempt()
            .map(|a| a.incorrect_topics().clone())
            .unwrap_or_default()
    }

    /// Start a new session for the same module after a failed attempt.
    ///
    /// The new session starts clean: no answers, no locks and a fresh hint
    /// budget, whatever question set it is given.
    pub fn retake(&self, questions: Vec<Question>) -> MasteryResult<QuizSession> {
        let attempt = match &self.phase {
            Phase::Finalized(attempt) => attempt,
            Phase::Open => {
                return Err(MasteryError::RetakeNotAllowed(
                    "session has not been finalized".into(),
                ))
            }
            Phase::Reviewing(_) => {
                return Err(MasteryError::RetakeNotAllowed(
                    "session is in review mode".into(),
                ))
            }
        };

        if attempt.passed() {
            return Err(MasteryError::RetakeNotAllowed(format!(
                "attempt {} passed with {}%",
                attempt.attempt_number(),
                attempt.percentage()
            )));
        }

        QuizSession::new(self.module_id.clone(), questions, self.attempt_number + 1)
    }

    /// Current state for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question().clone();
        let revealed_hint = if self.revealed_hints.contains(&question.id) {
            question.hint.clone()
        } else {
            None
        };
        SessionSnapshot {
            module_id: self.module_id.clone(),
            attempt_number: self.attempt_number,
            state: self.state(),
            current_index: self.current_index,
            total_questions: self.questions.len(),
            selected_choice_id: self.answers.get(&question.id).cloned(),
            locked: self.locked.contains(&question.id),
            feedback: self.feedback(&question.id),
            hints_remaining: self.hints_remaining,
            revealed_hint,
            answered: self.locked.len(),
            score: self.running_score(),
            question,
        }
    }
}

/// Order a question pool so questions from missed topics come first,
/// keeping the pool's order within each group, and cap the result.
pub fn prioritize_missed_topics(
    pool: &[Question],
    missed: &BTreeSet<String>,
    limit: Option<usize>,
) -> Vec<Question> {
    let (focus, rest): (Vec<&Question>, Vec<&Question>) =
        pool.iter().partition(|q| missed.contains(&q.topic));
    focus
        .into_iter()
        .chain(rest)
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}
