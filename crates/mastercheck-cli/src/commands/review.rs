//! The `mastercheck review` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use mastercheck_core::session::QuizSession;
use mastercheck_core::store::AttemptStore;
use mastercheck_sources::load_config_from;

use super::learner_or_default;

pub fn execute(
    module: String,
    attempt_number: Option<u32>,
    learner: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let learner = learner_or_default(learner, &config);
    let store = AttemptStore::open(&config.store_path)?;

    let completed: Vec<_> = store
        .all_attempts(&learner, &module)
        .into_iter()
        .filter(|a| a.completed())
        .collect();
    let attempt = match attempt_number {
        Some(n) => completed.iter().find(|a| a.attempt_number() == n),
        None => completed.last(),
    }
    .with_context(|| match attempt_number {
        Some(n) => format!("no completed attempt {n} for module {module} ({learner})"),
        None => format!("no completed attempts for module {module} ({learner})"),
    })?;

    let session = QuizSession::review(attempt)?;
    println!(
        "Module {} - attempt {} - {}/{} ({}%) {}",
        attempt.module_id(),
        attempt.attempt_number(),
        attempt.score(),
        attempt.total_questions(),
        attempt.percentage(),
        if attempt.passed() { "PASSED" } else { "FAILED" }
    );

    for (i, question) in session.questions().iter().enumerate() {
        let feedback = session.feedback(&question.id);
        let mark = match &feedback {
            Some(f) if f.correct => "correct",
            Some(_) => "incorrect",
            None => "unanswered",
        };
        println!("\n{}. {} [{mark}]", i + 1, question.prompt);
        for choice in &question.choices {
            let selected = session.answer_for(&question.id) == Some(choice.id.as_str());
            let tag = match (selected, choice.id == question.correct_choice_id) {
                (true, true) => " <- your answer, correct",
                (true, false) => " <- your answer",
                (false, true) => " <- correct",
                (false, false) => "",
            };
            println!("   {}) {}{tag}", choice.id, choice.text);
        }
    }

    println!("\nBy topic:");
    for topic in attempt.topic_breakdown() {
        println!(
            "  {}: {}/{} ({}%)",
            topic.label(),
            topic.correct,
            topic.total,
            topic.percentage()
        );
    }

    Ok(())
}
