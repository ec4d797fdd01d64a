//! The `mastercheck status` command.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mastercheck_core::report::ProgressReport;
use mastercheck_core::store::AttemptStore;
use mastercheck_report::generate_progress_html;
use mastercheck_sources::{load_config_from, DirectorySource, MastercheckConfig, SourceConfig};

use super::learner_or_default;

pub fn execute(
    format: String,
    output: Option<PathBuf>,
    learner: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let learner = learner_or_default(learner, &config);
    let store = AttemptStore::open(&config.store_path)?;
    let history = store.history(&learner);

    let mut modules = known_modules(&config)?;
    modules.extend(history.module_ids().map(str::to_string));
    let modules: Vec<String> = modules.into_iter().collect();

    let report = ProgressReport::from_history(&history, &modules);

    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&report)?,
        "markdown" | "md" => report.to_markdown(),
        "html" => generate_progress_html(&report),
        _ => render_text(&report),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)?;
            eprintln!("Report saved to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

/// Module ids from every local question bank in the config.
fn known_modules(config: &MastercheckConfig) -> Result<BTreeSet<String>> {
    let mut modules = BTreeSet::new();
    for source in config.sources.values() {
        if let SourceConfig::Directory { path } = source {
            if path.is_dir() {
                modules.extend(DirectorySource::open(path)?.module_ids());
            }
        }
    }
    Ok(modules)
}

fn render_text(report: &ProgressReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Module", "Status", "Attempts", "Best Score", "Next"]);
    for m in &report.modules {
        table.add_row(vec![
            Cell::new(&m.module_id),
            Cell::new(m.status),
            Cell::new(m.completed_attempts),
            Cell::new(format!("{}%", m.best_score)),
            Cell::new(m.status.next_action()),
        ]);
    }

    let o = &report.overall;
    let mut text = format!("Progress for {}\n{table}\n", report.learner);
    text.push_str(&format!(
        "Overall: {}% | {} passed, {} failed, {} in progress, {} not started | completion {}%",
        o.overall_percentage,
        o.passed_modules,
        o.failed_modules,
        o.in_progress_modules,
        o.not_started_modules,
        o.completion_rate
    ));
    if o.mastered {
        text.push_str("\nAll modules mastered.");
    }
    text
}
