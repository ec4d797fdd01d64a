//! The `mastercheck analytics` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mastercheck_core::analytics::{self, ModuleAnalytics};
use mastercheck_report::write_analytics_html;

pub fn execute(input: PathBuf, html: Option<PathBuf>) -> Result<()> {
    let modules = analytics::load_analytics(&input)?;

    for module in &modules {
        print_module(module);
    }

    let yield_ = analytics::class_yield(&modules);
    println!("\nClass yield");
    println!("  Modules:               {}", yield_.total_modules);
    println!("  Avg completion rate:   {:.1}%", yield_.avg_completion_rate);
    println!("  Avg score:             {:.1}%", yield_.avg_score);
    println!("  High performing:       {}", yield_.high_performing_modules);
    println!("  Completed students:    {}", yield_.total_completed_students);

    if let Some(path) = html {
        write_analytics_html(&modules, &path)?;
        eprintln!("HTML report: {}", path.display());
    }

    Ok(())
}

fn print_module(module: &ModuleAnalytics) {
    let overview = analytics::module_overview(module);
    println!(
        "\n{}: {} questions, {}% average accuracy, {} of {} students completed",
        module.module_name,
        overview.total_questions,
        overview.average_accuracy,
        module.completed_students,
        module.total_students
    );

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Correct", "Attempts", "Accuracy", "Tier"]);
    for topic in analytics::topic_accuracy(module) {
        table.add_row(vec![
            Cell::new(&topic.topic),
            Cell::new(topic.correct_answers),
            Cell::new(topic.total_attempts),
            Cell::new(format!("{}%", topic.accuracy)),
            Cell::new(topic.tier()),
        ]);
    }
    println!("{table}");

    let weak = analytics::weak_topics(module);
    if weak.is_empty() {
        println!("No weak topics.");
    } else {
        println!("Weak topics: {}", weak.join(", "));
    }
}
