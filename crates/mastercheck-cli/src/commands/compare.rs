//! The `mastercheck compare` command.

use std::path::PathBuf;

use anyhow::Result;

use mastercheck_core::report::ProgressReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    let baseline = ProgressReport::load_json(&baseline_path)?;
    let current = ProgressReport::load_json(&current_path)?;

    let delta = current.compare(&baseline);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", delta.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&delta)?);
        }
        _ => {
            println!(
                "Comparison: {} newly passed, {} regressed, overall {}% -> {}%",
                delta.newly_passed.len(),
                delta.regressed.len(),
                delta.overall_before,
                delta.overall_after
            );

            if !delta.regressed.is_empty() {
                println!("\nRegressions:");
                for r in &delta.regressed {
                    println!("  module {}: {} -> {}", r.module_id, r.before, r.after);
                }
            }

            if !delta.newly_passed.is_empty() {
                println!("\nNewly passed:");
                for module in &delta.newly_passed {
                    println!("  module {module}");
                }
            }

            if !delta.score_changes.is_empty() {
                println!("\nBest score changes:");
                for s in &delta.score_changes {
                    println!(
                        "  module {}: {}% -> {}% ({:+})",
                        s.module_id,
                        s.before,
                        s.after,
                        i64::from(s.after) - i64::from(s.before)
                    );
                }
            }

            if !delta.new_modules.is_empty() {
                println!("\n{} new module(s)", delta.new_modules.len());
            }
            if !delta.removed_modules.is_empty() {
                println!("{} removed module(s)", delta.removed_modules.len());
            }
        }
    }

    if fail_on_regression && delta.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
