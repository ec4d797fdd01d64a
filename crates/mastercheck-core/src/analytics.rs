//! Instructor analytics over population-level question counters.
//!
//! This is a separate data path from learner attempts: a reporting source
//! supplies per-question accuracy counters for each module and the functions
//! here only read them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{MASTERY_THRESHOLD, WEAK_TOPIC_THRESHOLD};
use crate::statistics::percentage;

/// Aggregated outcomes for one question across a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalytics {
    #[serde(alias = "questionId")]
    pub question_id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    pub topic: String,
    #[serde(default, alias = "subTopic")]
    pub sub_topic: String,
    /// Percent of attempts answered correctly, as reported.
    pub accuracy: f64,
    #[serde(alias = "correctAnswers")]
    pub correct_answers: u64,
    #[serde(alias = "totalAttempts")]
    pub total_attempts: u64,
}

impl QuestionAnalytics {
    pub fn tier(&self) -> AccuracyTier {
        AccuracyTier::of(self.accuracy)
    }
}

/// Class-level counters for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAnalytics {
    #[serde(alias = "moduleName")]
    pub module_name: String,
    #[serde(default)]
    pub questions: Vec<QuestionAnalytics>,
    #[serde(alias = "completedStudents")]
    pub completed_students: u64,
    #[serde(alias = "totalStudents")]
    pub total_students: u64,
    #[serde(alias = "averageScore")]
    pub average_score: f64,
    #[serde(alias = "completionRate")]
    pub completion_rate: f64,
}

/// Performance band used to color questions and topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    High,
    Medium,
    Low,
}

impl AccuracyTier {
    pub fn of(accuracy: f64) -> Self {
        if accuracy >= MASTERY_THRESHOLD as f64 {
            AccuracyTier::High
        } else if accuracy >= WEAK_TOPIC_THRESHOLD {
            AccuracyTier::Medium
        } else {
            AccuracyTier::Low
        }
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccuracyTier::High => write!(f, "high"),
            AccuracyTier::Medium => write!(f, "medium"),
            AccuracyTier::Low => write!(f, "low"),
        }
    }
}

/// Count-weighted accuracy for one topic within a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAccuracy {
    pub topic: String,
    pub correct_answers: u64,
    pub total_attempts: u64,
    pub accuracy: u32,
}

impl TopicAccuracy {
    pub fn tier(&self) -> AccuracyTier {
        AccuracyTier::of(self.accuracy as f64)
    }
}

/// Headline numbers for a module's question analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleOverview {
    pub total_questions: usize,
    /// All correct answers over all attempts in the module.
    pub average_accuracy: u32,
    pub strong_questions: usize,
    pub weak_questions: usize,
    pub total_attempts: u64,
}

/// Roll-up across modules for the instructor dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassYield {
    pub total_modules: usize,
    pub avg_completion_rate: f64,
    pub avg_score: f64,
    pub high_performing_modules: usize,
    pub total_completed_students: u64,
}

/// A problem found in supplied analytics data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsWarning {
    pub module_name: String,
    pub message: String,
}

impl std::fmt::Display for AnalyticsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.module_name, self.message)
    }
}

/// Per-topic accuracy in order of first appearance.
///
/// Accuracy is `sum(correct) / sum(attempts)` over the topic's questions,
/// so a heavily attempted question weighs more than a rarely attempted one.
pub fn topic_accuracy(module: &ModuleAnalytics) -> Vec<TopicAccuracy> {
    let mut rows: Vec<TopicAccuracy> = Vec::new();
    for q in &module.questions {
        if let Some(row) = rows.iter_mut().find(|r| r.topic == q.topic) {
            row.correct_answers += q.correct_answers;
            row.total_attempts += q.total_attempts;
            continue;
        }
        rows.push(TopicAccuracy {
            topic: q.topic.clone(),
            correct_answers: q.correct_answers,
            total_attempts: q.total_attempts,
            accuracy: 0,
        });
    }
    for row in &mut rows {
        row.accuracy = percentage(row.correct_answers, row.total_attempts);
    }
    rows
}

/// Distinct topics with at least one question under the weak threshold,
/// weakest first.
pub fn weak_topics(module: &ModuleAnalytics) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for q in questions_by_accuracy(module) {
        if q.accuracy < WEAK_TOPIC_THRESHOLD && !topics.contains(&q.topic) {
            topics.push(q.topic.clone());
        }
    }
    topics
}

/// Questions sorted by accuracy ascending; ties keep input order.
pub fn questions_by_accuracy(module: &ModuleAnalytics) -> Vec<&QuestionAnalytics> {
    let mut questions: Vec<&QuestionAnalytics> = module.questions.iter().collect();
    questions.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
    questions
}

/// Questions in a given tier, in input order.
pub fn questions_in_tier(module: &ModuleAnalytics, tier: AccuracyTier) -> Vec<&QuestionAnalytics> {
    module.questions.iter().filter(|q| q.tier() == tier).collect()
}

pub fn module_overview(module: &ModuleAnalytics) -> ModuleOverview {
    let correct: u64 = module.questions.iter().map(|q| q.correct_answers).sum();
    let attempts: u64 = module.questions.iter().map(|q| q.total_attempts).sum();
    ModuleOverview {
        total_questions: module.questions.len(),
        average_accuracy: percentage(correct, attempts),
        strong_questions: questions_in_tier(module, AccuracyTier::High).len(),
        weak_questions: questions_in_tier(module, AccuracyTier::Low).len(),
        total_attempts: attempts,
    }
}

/// Class yield across modules. Each module is already a population
/// aggregate, so plain per-module means are used here.
pub fn class_yield(modules: &[ModuleAnalytics]) -> ClassYield {
    if modules.is_empty() {
        return ClassYield::default();
    }
    let n = modules.len() as f64;
    ClassYield {
        total_modules: modules.len(),
        avg_completion_rate: modules.iter().map(|m| m.completion_rate).sum::<f64>() / n,
        avg_score: modules.iter().map(|m| m.average_score).sum::<f64>() / n,
        high_performing_modules: modules
            .iter()
            .filter(|m| m.average_score >= MASTERY_THRESHOLD as f64)
            .count(),
        total_completed_students: modules.iter().map(|m| m.completed_students).sum(),
    }
}

/// Sanity checks on supplied counters.
pub fn validate_module_analytics(module: &ModuleAnalytics) -> Vec<AnalyticsWarning> {
    let mut warnings = Vec::new();
    let mut warn = |message: String| {
        warnings.push(AnalyticsWarning {
            module_name: module.module_name.clone(),
            message,
        })
    };

    if module.completed_students > module.total_students {
        warn(format!(
            "completed students ({}) exceed total students ({})",
            module.completed_students, module.total_students
        ));
    }
    if !(0.0..=100.0).contains(&module.average_score) {
        warn(format!("average score {} is outside 0-100", module.average_score));
    }
    if !(0.0..=100.0).contains(&module.completion_rate) {
        warn(format!("completion rate {} is outside 0-100", module.completion_rate));
    }
    for q in &module.questions {
        if !(0.0..=100.0).contains(&q.accuracy) {
            warn(format!("question '{}': accuracy {} is outside 0-100", q.question_id, q.accuracy));
        }
        if q.correct_answers > q.total_attempts {
            warn(format!(
                "question '{}': correct answers ({}) exceed attempts ({})",
                q.question_id, q.correct_answers, q.total_attempts
            ));
        }
    }
    warnings
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnalyticsFile {
    List(Vec<ModuleAnalytics>),
    Wrapped { modules: Vec<ModuleAnalytics> },
}

/// Parse analytics JSON: either a list of modules or `{"modules": [...]}`.
pub fn parse_analytics_str(content: &str) -> Result<Vec<ModuleAnalytics>> {
    let file: AnalyticsFile =
        serde_json::from_str(content).context("failed to parse analytics JSON")?;
    Ok(match file {
        AnalyticsFile::List(modules) | AnalyticsFile::Wrapped { modules } => modules,
    })
}

pub fn load_analytics(path: &Path) -> Result<Vec<ModuleAnalytics>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read analytics: {}", path.display()))?;
    let modules = parse_analytics_str(&content).with_context(|| format!("in {}", path.display()))?;
    for module in &modules {
        for warning in validate_module_analytics(module) {
            tracing::warn!("{warning}");
        }
    }
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, topic: &str, correct: u64, total: u64) -> QuestionAnalytics {
        QuestionAnalytics {
            question_id: id.into(),
            prompt: format!("Q{id}"),
            topic: topic.into(),
            sub_topic: String::new(),
            accuracy: if total == 0 {
                0.0
            } else {
                100.0 * correct as f64 / total as f64
            },
            correct_answers: correct,
            total_attempts: total,
        }
    }

    fn module(name: &str, questions: Vec<QuestionAnalytics>, score: f64) -> ModuleAnalytics {
        ModuleAnalytics {
            module_name: name.into(),
            questions,
            completed_students: 20,
            total_students: 25,
            average_score: score,
            completion_rate: 80.0,
        }
    }

    #[test]
    fn topic_accuracy_is_count_weighted() {
        // Per-question accuracies 90% and 10% would average to 50%;
        // weighting by attempts gives 82/100.
        let m = module(
            "Performance",
            vec![q("1", "CPU", 81, 90), q("2", "CPU", 1, 10), q("3", "Memory", 3, 4)],
            75.0,
        );
        let topics = topic_accuracy(&m);
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].topic, "CPU");
        assert_eq!(topics[0].accuracy, 82);
        assert_eq!(topics[0].tier(), AccuracyTier::High);
        assert_eq!(topics[1].accuracy, 75);
    }

    #[test]
    fn weak_topics_are_distinct_and_weakest_first() {
        let m = module(
            "M",
            vec![
                q("1", "Pipelining", 5, 10),
                q("2", "Caches", 2, 10),
                q("3", "Pipelining", 1, 10),
                q("4", "ISA", 9, 10),
            ],
            60.0,
        );
        assert_eq!(weak_topics(&m), vec!["Pipelining".to_string(), "Caches".to_string()]);
    }

    #[test]
    fn a_single_weak_question_marks_the_topic() {
        let m = module("M", vec![q("1", "ISA", 95, 100), q("2", "ISA", 5, 10)], 80.0);
        // Topic-level accuracy is still high.
        assert_eq!(topic_accuracy(&m)[0].accuracy, 91);
        assert_eq!(weak_topics(&m), vec!["ISA".to_string()]);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(AccuracyTier::of(70.0), AccuracyTier::High);
        assert_eq!(AccuracyTier::of(69.9), AccuracyTier::Medium);
        assert_eq!(AccuracyTier::of(60.0), AccuracyTier::Medium);
        assert_eq!(AccuracyTier::of(59.9), AccuracyTier::Low);
    }

    #[test]
    fn overview_and_ordering() {
        let m = module(
            "M",
            vec![q("1", "a", 9, 10), q("2", "b", 3, 10), q("3", "c", 13, 20)],
            60.0,
        );
        let overview = module_overview(&m);
        assert_eq!(overview.total_questions, 3);
        assert_eq!(overview.total_attempts, 40);
        assert_eq!(overview.average_accuracy, 63);
        assert_eq!(overview.strong_questions, 1);
        assert_eq!(overview.weak_questions, 1);

        let ids: Vec<&str> = questions_by_accuracy(&m)
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert_eq!(questions_in_tier(&m, AccuracyTier::Medium)[0].question_id, "3");
    }

    #[test]
    fn class_yield_uses_module_means() {
        let mut low = module("A", vec![], 50.0);
        low.completion_rate = 40.0;
        low.completed_students = 10;
        let high = module("B", vec![], 90.0);
        let y = class_yield(&[low, high]);
        assert_eq!(y.total_modules, 2);
        assert!((y.avg_score - 70.0).abs() < f64::EPSILON);
        assert!((y.avg_completion_rate - 60.0).abs() < f64::EPSILON);
        assert_eq!(y.high_performing_modules, 1);
        assert_eq!(y.total_completed_students, 30);

        assert_eq!(class_yield(&[]), ClassYield::default());
    }

    #[test]
    fn validation_flags_inconsistent_counters() {
        let mut m = module("M", vec![q("1", "a", 12, 10)], 120.0);
        m.completed_students = 30;
        let warnings = validate_module_analytics(&m);
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().any(|w| w.message.contains("exceed total students")));
        assert!(warnings.iter().any(|w| w.message.contains("average score")));

        assert!(validate_module_analytics(&module("ok", vec![q("1", "a", 1, 2)], 50.0)).is_empty());
    }

    #[test]
    fn parses_camel_case_input() {
        let json = r#"[{
            "moduleName": "Computer Abstractions",
            "questions": [{
                "questionId": "1",
                "question": "What is Moore's law?",
                "topic": "Technology",
                "subTopic": "Trends",
                "accuracy": 55.0,
                "correctAnswers": 11,
                "totalAttempts": 20
            }],
            "completedStudents": 18,
            "totalStudents": 24,
            "averageScore": 72.5,
            "completionRate": 75.0
        }]"#;
        let modules = parse_analytics_str(json).unwrap();
        assert_eq!(modules[0].module_name, "Computer Abstractions");
        assert_eq!(modules[0].questions[0].sub_topic, "Trends");
        assert_eq!(weak_topics(&modules[0]), vec!["Technology".to_string()]);
    }

    #[test]
    fn parses_wrapped_snake_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        let m = module("M", vec![q("1", "a", 1, 2)], 50.0);
        let body = serde_json::json!({ "modules": [m.clone()] });
        std::fs::write(&path, body.to_string()).unwrap();

        let loaded = load_analytics(&path).unwrap();
        assert_eq!(loaded, vec![m]);
    }
}
