//! Core data model types for mastercheck.
//!
//! Questions and choices are immutable value objects; an [`Attempt`] is the
//! frozen record a finished quiz session leaves behind.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MasteryError, MasteryResult};
use crate::statistics::percentage;

/// Percentage at or above which an attempt passes.
pub const MASTERY_THRESHOLD: u32 = 70;

/// Per-question accuracy below which a topic is reported as weak.
pub const WEAK_TOPIC_THRESHOLD: f64 = 60.0;

/// Hints available to one quiz session.
pub const HINT_BUDGET: u32 = 3;

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Stable identifier within the question (e.g. "a").
    pub id: String,
    /// Display text.
    pub text: String,
}

/// A single multiple-choice assessment item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within a question set.
    pub id: String,
    /// The question text shown to the learner.
    pub prompt: String,
    /// Choices in display order.
    pub choices: Vec<Choice>,
    /// Id of the correct choice.
    pub correct_choice_id: String,
    /// Topic used for mastery and remediation grouping.
    pub topic: String,
    /// Finer-grained topic label.
    #[serde(default)]
    pub sub_topic: String,
    /// Optional hint text.
    #[serde(default)]
    pub hint: Option<String>,
}

impl Question {
    /// Check the question invariants: at least two choices, unique choice
    /// ids, and a correct choice that exists.
    pub fn validate(&self) -> MasteryResult<()> {
        let invalid = |reason: String| MasteryError::InvalidQuestion {
            question_id: self.id.clone(),
            reason,
        };

        if self.choices.len() < 2 {
            return Err(invalid(format!(
                "needs at least 2 choices, has {}",
                self.choices.len()
            )));
        }

        let mut seen = HashSet::new();
        for choice in &self.choices {
            if !seen.insert(choice.id.as_str()) {
                return Err(invalid(format!("duplicate choice id {}", choice.id)));
            }
        }

        if !seen.contains(self.correct_choice_id.as_str()) {
            return Err(invalid(format!(
                "correct choice {} is not among the choices",
                self.correct_choice_id
            )));
        }

        Ok(())
    }

    /// Look up a choice by id.
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    /// Whether `choice_id` is the correct answer.
    pub fn is_correct(&self, choice_id: &str) -> bool {
        self.correct_choice_id == choice_id
    }
}

/// A question set for one module, as supplied by a question source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    /// Module the questions belong to.
    pub module_id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Description of the module.
    #[serde(default)]
    pub description: String,
    /// The questions, in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Derived mastery status of a module for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleMasteryStatus {
    NotStarted,
    InProgress,
    Passed,
    Failed,
}

impl ModuleMasteryStatus {
    /// What the learner is offered next for a module in this status.
    pub fn next_action(self) -> LearnerAction {
        match self {
            ModuleMasteryStatus::NotStarted => LearnerAction::Start,
            ModuleMasteryStatus::InProgress => LearnerAction::Continue,
            ModuleMasteryStatus::Failed => LearnerAction::Retake,
            ModuleMasteryStatus::Passed => LearnerAction::Review,
        }
    }
}

impl fmt::Display for ModuleMasteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleMasteryStatus::NotStarted => write!(f, "not-started"),
            ModuleMasteryStatus::InProgress => write!(f, "in-progress"),
            ModuleMasteryStatus::Passed => write!(f, "passed"),
            ModuleMasteryStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ModuleMasteryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "not-started" => Ok(ModuleMasteryStatus::NotStarted),
            "in-progress" => Ok(ModuleMasteryStatus::InProgress),
            "passed" => Ok(ModuleMasteryStatus::Passed),
            "failed" => Ok(ModuleMasteryStatus::Failed),
            other => Err(format!("unknown mastery status: {other}")),
        }
    }
}

/// The action a learner dashboard offers for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerAction {
    Start,
    Continue,
    Retake,
    Review,
}

impl fmt::Display for LearnerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnerAction::Start => write!(f, "Start Quiz"),
            LearnerAction::Continue => write!(f, "Continue Quiz"),
            LearnerAction::Retake => write!(f, "Retake Quiz"),
            LearnerAction::Review => write!(f, "Review Quiz"),
        }
    }
}

/// Immutable record of one quiz session.
///
/// Created only by finalizing or checkpointing a
/// [`QuizSession`](crate::session::QuizSession), or by loading a saved one,
/// which regrades it; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AttemptRecord")]
pub struct Attempt {
    id: Uuid,
    module_id: String,
    attempt_number: u32,
    questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    score: u32,
    completed: bool,
    incorrect_topics: BTreeSet<String>,
    #[serde(default)]
    hints_used: u32,
    created_at: DateTime<Utc>,
}

/// Score and missed topics for a set of answers. Unanswered questions only
/// count as missed once the attempt is completed.
fn grade(
    questions: &[Question],
    answers: &BTreeMap<String, String>,
    completed: bool,
) -> (u32, BTreeSet<String>) {
    let mut score = 0;
    let mut incorrect_topics = BTreeSet::new();
    for q in questions {
        match answers.get(&q.id) {
            Some(choice) if q.is_correct(choice) => score += 1,
            Some(_) => {
                incorrect_topics.insert(q.topic.clone());
            }
            None if completed => {
                incorrect_topics.insert(q.topic.clone());
            }
            None => {}
        }
    }
    (score, incorrect_topics)
}

/// Persisted form of an [`Attempt`]. Stored score and incorrect topics are
/// ignored; both are regraded from the answers on load.
#[derive(Deserialize)]
struct AttemptRecord {
    id: Uuid,
    module_id: String,
    attempt_number: u32,
    questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    completed: bool,
    #[serde(default)]
    hints_used: u32,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttemptRecord> for Attempt {
    type Error = MasteryError;

    fn try_from(record: AttemptRecord) -> MasteryResult<Self> {
        if record.questions.is_empty() {
            return Err(MasteryError::EmptyQuestionSet(record.module_id));
        }
        for question in &record.questions {
            question.validate()?;
        }

        let (score, incorrect_topics) =
            grade(&record.questions, &record.answers, record.completed);
        Ok(Self {
            id: record.id,
            module_id: record.module_id,
            attempt_number: record.attempt_number,
            questions: record.questions,
            answers: record.answers,
            score,
            completed: record.completed,
            incorrect_topics,
            hints_used: record.hints_used,
            created_at: record.created_at,
        })
    }
}

impl Attempt {
    /// Build an attempt from locked answers. Score and incorrect topics are
    /// derived here so they can never disagree with the answers.
    pub(crate) fn record(
        module_id: String,
        attempt_number: u32,
        questions: Vec<Question>,
        answers: BTreeMap<String, String>,
        completed: bool,
        hints_used: u32,
    ) -> Self {
        let (score, incorrect_topics) = grade(&questions, &answers, completed);
        Self {
            id: Uuid::new_v4(),
            module_id,
            attempt_number,
            questions,
            answers,
            score,
            completed,
            incorrect_topics,
            hints_used,
            created_at: Utc::now(),
        }
    }

    /// Copy of this attempt carrying a different attempt number. Used by the
    /// store when it serializes concurrent appends.
    pub(crate) fn renumbered(&self, attempt_number: u32) -> Self {
        Self {
            attempt_number,
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// 1-based attempt number within the module.
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Final answers keyed by question id.
    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    /// Number of correctly answered questions.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total_questions(&self) -> u32 {
        self.questions.len() as u32
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Topics of every question answered wrong.
    pub fn incorrect_topics(&self) -> &BTreeSet<String> {
        &self.incorrect_topics
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `round(100 * score / total)`, rounding half up.
    pub fn percentage(&self) -> u32 {
        percentage(self.score as u64, self.questions.len() as u64)
    }

    /// Whether the attempt is complete and at or above the mastery threshold.
    pub fn passed(&self) -> bool {
        self.completed && self.percentage() >= MASTERY_THRESHOLD
    }

    /// Ids of questions whose final answer is wrong, in question order.
    pub fn incorrect_question_ids(&self) -> Vec<&str> {
        self.questions
            .iter()
            .filter(|q| match self.answers.get(&q.id) {
                Some(choice) => !q.is_correct(choice),
                None => self.completed,
            })
            .map(|q| q.id.as_str())
            .collect()
    }

    /// Correct/total per (topic, sub-topic), in order of first appearance.
    pub fn topic_breakdown(&self) -> Vec<TopicPerformance> {
        let mut rows: Vec<TopicPerformance> = Vec::new();
        for q in &self.questions {
            let correct = self
                .answers
                .get(&q.id)
                .is_some_and(|choice| q.is_correct(choice));
            if let Some(row) = rows
                .iter_mut()
                .find(|r| r.topic == q.topic && r.sub_topic == q.sub_topic)
            {
                row.total += 1;
                row.correct += u32::from(correct);
                continue;
            }
            rows.push(TopicPerformance {
                topic: q.topic.clone(),
                sub_topic: q.sub_topic.clone(),
                correct: u32::from(correct),
                total: 1,
            });
        }
        rows
    }
}

/// Per-topic result within a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub sub_topic: String,
    pub correct: u32,
    pub total: u32,
}

impl TopicPerformance {
    pub fn percentage(&self) -> u32 {
        percentage(self.correct as u64, self.total as u64)
    }

    pub fn passed(&self) -> bool {
        self.percentage() >= MASTERY_THRESHOLD
    }

    /// "topic - sub-topic", or just the topic when there is no sub-topic.
    pub fn label(&self) -> String {
        if self.sub_topic.is_empty() {
            self.topic.clone()
        } else {
            format!("{} - {}", self.topic, self.sub_topic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, topic: &str, sub_topic: &str) -> Question {
        Question {
            id: id.into(),
            prompt: format!("Question {id}"),
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
            topic: topic.into(),
            sub_topic: sub_topic.into(),
            hint: None,
        }
    }

    #[test]
    fn validate_rejects_missing_correct_choice() {
        let mut q = question("1", "t", "");
        q.correct_choice_id = "z".into();
        let err = q.validate().unwrap_err();
        assert!(matches!(err, MasteryError::InvalidQuestion { .. }));
        assert!(err.to_string().contains("not among the choices"));
    }

    #[test]
    fn validate_rejects_duplicate_and_too_few_choices() {
        let mut q = question("1", "t", "");
        q.choices[1].id = "a".into();
        assert!(q.validate().is_err());

        q.choices.truncate(1);
        assert!(q.validate().unwrap_err().to_string().contains("at least 2"));
    }

    #[test]
    fn status_display_and_parse() {
        assert_eq!(ModuleMasteryStatus::NotStarted.to_string(), "not-started");
        assert_eq!(
            "in_progress".parse::<ModuleMasteryStatus>().unwrap(),
            ModuleMasteryStatus::InProgress
        );
        assert!("done".parse::<ModuleMasteryStatus>().is_err());
        assert_eq!(
            ModuleMasteryStatus::Failed.next_action(),
            LearnerAction::Retake
        );
    }

    #[test]
    fn attempt_derives_score_and_topics() {
        let questions = vec![
            question("1", "Performance", "CPI"),
            question("2", "Performance", "CPI"),
            question("3", "MIPS", "Branches"),
        ];
        let answers = BTreeMap::from([
            ("1".to_string(), "a".to_string()),
            ("2".to_string(), "b".to_string()),
            ("3".to_string(), "a".to_string()),
        ]);
        let attempt = Attempt::record("1".into(), 1, questions, answers, true, 0);

        assert_eq!(attempt.score(), 2);
        assert_eq!(attempt.percentage(), 67);
        assert!(!attempt.passed());
        assert_eq!(
            attempt.incorrect_topics().iter().collect::<Vec<_>>(),
            vec!["Performance"]
        );
        assert_eq!(attempt.incorrect_question_ids(), vec!["2"]);

        let breakdown = attempt.topic_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].label(), "Performance - CPI");
        assert_eq!((breakdown[0].correct, breakdown[0].total), (1, 2));
        assert_eq!(breakdown[1].percentage(), 100);
    }

    #[test]
    fn attempt_serde_roundtrip_keeps_answers() {
        let attempt = Attempt::record(
            "7".into(),
            2,
            vec![question("1", "t", "")],
            BTreeMap::from([("1".to_string(), "a".to_string())]),
            true,
            1,
        );
        let json = serde_json::to_string(&attempt).unwrap();
        let back: Attempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
        assert_eq!(back.answer_for("1"), Some("a"));
    }
}
