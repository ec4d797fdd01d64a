//! Learner progress reports with JSON persistence and progress comparison.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ModuleMasteryStatus;
use crate::statistics::{ModuleSummary, OverallStatistics};
use crate::store::LearnerHistory;

/// A point-in-time snapshot of one learner's mastery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub learner: String,
    /// One summary per offered module, in the order they were offered.
    pub modules: Vec<ModuleSummary>,
    pub overall: OverallStatistics,
}

impl ProgressReport {
    /// Build a report for the given modules from a history snapshot.
    pub fn from_history<S: AsRef<str>>(history: &LearnerHistory, modules: &[S]) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            learner: history.learner().to_string(),
            modules: modules
                .iter()
                .map(|m| history.module_summary(m.as_ref()))
                .collect(),
            overall: history.overall_statistics(modules),
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleSummary> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Progress for {}\n\n", self.learner));
        md.push_str(&format!(
            "**Overall:** {}% across {} completed attempts, {} of {} modules passed ({}%)\n\n",
            self.overall.overall_percentage,
            self.overall.total_attempts,
            self.overall.passed_modules,
            self.overall.total_modules,
            self.overall.completion_rate,
        ));
        if self.overall.mastered {
            md.push_str("**Mastered** every module.\n\n");
        }

        md.push_str("| Module | Status | Attempts | Best | Next |\n");
        md.push_str("|--------|--------|----------|------|------|\n");
        for m in &self.modules {
            md.push_str(&format!(
                "| {} | {} | {} | {}% | {} |\n",
                m.module_id,
                m.status,
                m.completed_attempts,
                m.best_score,
                m.status.next_action(),
            ));
        }

        md
    }

    /// Compare this report against an earlier one for the same learner.
    ///
    /// A module missing from the baseline is listed in `new_modules`, and
    /// also in `newly_passed` when it is already passed.
    pub fn compare(&self, baseline: &ProgressReport) -> ProgressDelta {
        let mut delta = ProgressDelta::default();

        for current in &self.modules {
            let Some(before) = baseline.module(&current.module_id) else {
                delta.new_modules.push(current.module_id.clone());
                if current.status == ModuleMasteryStatus::Passed {
                    delta.newly_passed.push(current.module_id.clone());
                }
                continue;
            };

            let was_passed = before.status == ModuleMasteryStatus::Passed;
            let is_passed = current.status == ModuleMasteryStatus::Passed;
            if is_passed && !was_passed {
                delta.newly_passed.push(current.module_id.clone());
            } else if was_passed && !is_passed {
                delta.regressed.push(StatusChange {
                    module_id: current.module_id.clone(),
                    before: before.status,
                    after: current.status,
                });
            }

            if current.best_score != before.best_score {
                delta.score_changes.push(ScoreChange {
                    module_id: current.module_id.clone(),
                    before: before.best_score,
                    after: current.best_score,
                });
            }
        }

        delta.removed_modules = baseline
            .modules
            .iter()
            .filter(|m| self.module(&m.module_id).is_none())
            .map(|m| m.module_id.clone())
            .collect();
        delta.overall_before = baseline.overall.overall_percentage;
        delta.overall_after = self.overall.overall_percentage;

        delta
    }
}

/// Result of comparing two progress reports.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressDelta {
    /// Modules that are passed now and were not before.
    pub newly_passed: Vec<String>,
    /// Modules that were passed and no longer are.
    pub regressed: Vec<StatusChange>,
    /// Modules whose best score moved.
    pub score_changes: Vec<ScoreChange>,
    pub new_modules: Vec<String>,
    pub removed_modules: Vec<String>,
    pub overall_before: u32,
    pub overall_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub module_id: String,
    pub before: ModuleMasteryStatus,
    pub after: ModuleMasteryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub module_id: String,
    pub before: u32,
    pub after: u32,
}

impl ProgressDelta {
    pub fn has_regressions(&self) -> bool {
        !self.regressed.is_empty()
    }

    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} newly passed, {} regressed, overall {}% -> {}%\n\n",
            self.newly_passed.len(),
            self.regressed.len(),
            self.overall_before,
            self.overall_after,
        ));

        if !self.newly_passed.is_empty() {
            md.push_str(&format!("**Newly passed:** {}\n\n", self.newly_passed.join(", ")));
        }

        if !self.regressed.is_empty() {
            md.push_str("### Regressions\n\n");
            md.push_str("| Module | Before | After |\n");
            md.push_str("|--------|--------|-------|\n");
            for r in &self.regressed {
                md.push_str(&format!("| {} | {} | {} |\n", r.module_id, r.before, r.after));
            }
            md.push('\n');
        }

        if !self.score_changes.is_empty() {
            md.push_str("### Best score changes\n\n");
            md.push_str("| Module | Before | After |\n");
            md.push_str("|--------|--------|-------|\n");
            for c in &self.score_changes {
                md.push_str(&format!("| {} | {}% | {}% |\n", c.module_id, c.before, c.after));
            }
        }

        md
    }
}
