//! Mastery aggregation over a learner's attempt history.
//!
//! Status follows the latest attempt only; best score looks across all
//! completed attempts; the overall percentage is weighted by question
//! count, never an average of per-module percentages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Attempt, ModuleMasteryStatus, MASTERY_THRESHOLD};
use crate::store::LearnerHistory;

/// `round(100 * part / whole)` with halves rounded up. Zero when `whole`
/// is zero.
pub fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    // floor((200 * part + whole) / (2 * whole)) == floor(100 * part / whole + 0.5)
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Status of a module given its attempts in chronological order.
pub fn module_status(attempts: &[Attempt]) -> ModuleMasteryStatus {
    match attempts.last() {
        None => ModuleMasteryStatus::NotStarted,
        Some(latest) if !latest.completed() => ModuleMasteryStatus::InProgress,
        Some(latest) if latest.percentage() >= MASTERY_THRESHOLD => ModuleMasteryStatus::Passed,
        Some(_) => ModuleMasteryStatus::Failed,
    }
}

/// Highest percentage among completed attempts, 0 if there are none.
pub fn best_score(attempts: &[Attempt]) -> u32 {
    attempts
        .iter()
        .filter(|a| a.completed())
        .map(Attempt::percentage)
        .max()
        .unwrap_or(0)
}

/// Dashboard card data for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub module_id: String,
    pub status: ModuleMasteryStatus,
    /// Number of completed attempts.
    pub completed_attempts: usize,
    pub best_score: u32,
}

/// Summarize one module's attempts.
pub fn module_summary(module_id: &str, attempts: &[Attempt]) -> ModuleSummary {
    ModuleSummary {
        module_id: module_id.to_string(),
        status: module_status(attempts),
        completed_attempts: attempts.iter().filter(|a| a.completed()).count(),
        best_score: best_score(attempts),
    }
}

/// Roll-up across every module offered to a learner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverallStatistics {
    pub total_modules: usize,
    pub passed_modules: usize,
    pub failed_modules: usize,
    pub not_started_modules: usize,
    pub in_progress_modules: usize,
    /// Completed attempts across all modules.
    pub total_attempts: usize,
    /// `round(100 * passed / total)`.
    pub completion_rate: u32,
    /// Correct answers over questions across all completed attempts.
    pub overall_percentage: u32,
    /// Every module passed.
    pub mastered: bool,
}

/// Compute overall statistics for `modules` from a learner history.
/// Modules without attempts count as not started; repeated ids count once.
pub fn overall_statistics<S: AsRef<str>>(modules: &[S], history: &LearnerHistory) -> OverallStatistics {
    let modules: BTreeSet<&str> = modules.iter().map(|m| m.as_ref()).collect();
    let mut stats = OverallStatistics {
        total_modules: modules.len(),
        ..Default::default()
    };
    let mut total_correct = 0u64;
    let mut total_questions = 0u64;

    for module in modules {
        let attempts = history.attempts(module);
        match module_status(attempts) {
            ModuleMasteryStatus::NotStarted => stats.not_started_modules += 1,
            ModuleMasteryStatus::InProgress => stats.in_progress_modules += 1,
            ModuleMasteryStatus::Passed => stats.passed_modules += 1,
            ModuleMasteryStatus::Failed => stats.failed_modules += 1,
        }

        for attempt in attempts.iter().filter(|a| a.completed()) {
            stats.total_attempts += 1;
            total_correct += attempt.score() as u64;
            total_questions += attempt.total_questions() as u64;
        }
    }

    stats.completion_rate = percentage(stats.passed_modules as u64, stats.total_modules as u64);
    stats.overall_percentage = percentage(total_correct, total_questions);
    stats.mastered = stats.total_modules > 0 && stats.passed_modules == stats.total_modules;
    stats
}

impl LearnerHistory {
    pub fn module_status(&self, module_id: &str) -> ModuleMasteryStatus {
        module_status(self.attempts(module_id))
    }

    pub fn best_score(&self, module_id: &str) -> u32 {
        best_score(self.attempts(module_id))
    }

    pub fn module_summary(&self, module_id: &str) -> ModuleSummary {
        module_summary(module_id, self.attempts(module_id))
    }

    pub fn overall_statistics<S: AsRef<str>>(&self, modules: &[S]) -> OverallStatistics {
        overall_statistics(modules, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::model::{Choice, Question};

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
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
            .collect()
    }

    fn attempt(module: &str, number: u32, correct: usize, total: usize, completed: bool) -> Attempt {
        let answers: BTreeMap<String, String> = (1..=total)
            .map(|i| {
                let choice = if i <= correct { "a" } else { "b" };
                (i.to_string(), choice.to_string())
            })
            .collect();
        Attempt::record(
            module.into(),
            number,
            questions(total),
            answers,
            completed,
            0,
        )
    }

    fn history(entries: Vec<Attempt>) -> LearnerHistory {
        let mut modules: BTreeMap<String, Vec<Attempt>> = BTreeMap::new();
        for a in entries {
            modules.entry(a.module_id().to_string()).or_default().push(a);
        }
        LearnerHistory::new("learner", modules)
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(7, 10), 70);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn status_with_no_attempts_is_not_started() {
        assert_eq!(module_status(&[]), ModuleMasteryStatus::NotStarted);
    }

    #[test]
    fn incomplete_latest_is_in_progress() {
        let attempts = vec![attempt("1", 1, 10, 10, true), attempt("1", 2, 0, 10, false)];
        assert_eq!(module_status(&attempts), ModuleMasteryStatus::InProgress);
    }

    #[test]
    fn latest_attempt_decides_status() {
        let fail_then_pass = vec![attempt("1", 1, 5, 10, true), attempt("1", 2, 8, 10, true)];
        assert_eq!(module_status(&fail_then_pass), ModuleMasteryStatus::Passed);

        let pass_then_fail = vec![attempt("1", 1, 8, 10, true), attempt("1", 2, 5, 10, true)];
        assert_eq!(module_status(&pass_then_fail), ModuleMasteryStatus::Failed);
    }

    #[test]
    fn best_score_ignores_order_and_incomplete() {
        let attempts = vec![
            attempt("1", 1, 5, 10, true),
            attempt("1", 2, 8, 10, true),
            attempt("1", 3, 6, 10, true),
            attempt("1", 4, 10, 10, false),
        ];
        assert_eq!(best_score(&attempts), 80);
        assert_eq!(best_score(&attempts[..1]), 50);
        assert_eq!(best_score(&[attempt("1", 1, 3, 3, false)]), 0);
    }

    #[test]
    fn overall_percentage_is_weighted_by_question_count() {
        let h = history(vec![attempt("A", 1, 8, 10, true), attempt("B", 1, 3, 5, true)]);
        let stats = h.overall_statistics(&["A", "B"]);
        assert_eq!(stats.overall_percentage, 73);
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.passed_modules, 1);
        assert_eq!(stats.failed_modules, 1);
        assert_eq!(stats.completion_rate, 50);
        assert!(!stats.mastered);
    }

    #[test]
    fn repeated_module_ids_count_once() {
        let h = history(vec![attempt("1", 1, 9, 10, true), attempt("2", 1, 2, 10, true)]);
        let stats = overall_statistics(&["1", "2", "1"], &h);
        assert_eq!(stats.total_modules, 2);
        assert_eq!(stats.passed_modules, 1);
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.completion_rate, 50);
        assert_eq!(stats.overall_percentage, 55);
    }

    #[test]
    fn statuses_partition_every_module() {
        let h = history(vec![
            attempt("1", 1, 9, 10, true),
            attempt("2", 1, 2, 10, true),
            attempt("3", 1, 1, 10, false),
        ]);
        let modules = ["1", "2", "3", "4", "5"];
        let stats = overall_statistics(&modules, &h);
        assert_eq!(stats.passed_modules, 1);
        assert_eq!(stats.failed_modules, 1);
        assert_eq!(stats.in_progress_modules, 1);
        assert_eq!(stats.not_started_modules, 2);
        assert_eq!(
            stats.passed_modules
                + stats.failed_modules
                + stats.in_progress_modules
                + stats.not_started_modules,
            stats.total_modules
        );
        // Incomplete attempts do not count toward totals.
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.overall_percentage, 55);
        assert_eq!(stats.completion_rate, 20);
    }

    #[test]
    fn empty_module_list() {
        let stats = overall_statistics::<&str>(&[], &history(vec![]));
        assert_eq!(stats.completion_rate, 0);
        assert_eq!(stats.overall_percentage, 0);
        assert!(!stats.mastered);
    }

    #[test]
    fn all_passed_is_mastered() {
        let h = history(vec![attempt("1", 1, 7, 10, true), attempt("2", 1, 3, 3, true)]);
        let stats = h.overall_statistics(&["1", "2"]);
        assert!(stats.mastered);
        assert_eq!(stats.completion_rate, 100);
    }

    #[test]
    fn summary_counts_completed_attempts() {
        let h = history(vec![
            attempt("1", 1, 4, 10, true),
            attempt("1", 2, 6, 10, true),
            attempt("1", 3, 0, 10, false),
        ]);
        let summary = h.module_summary("1");
        assert_eq!(summary.status, ModuleMasteryStatus::InProgress);
        assert_eq!(summary.completed_attempts, 2);
        assert_eq!(summary.best_score, 60);
        assert_eq!(h.best_score("missing"), 0);
    }
}
