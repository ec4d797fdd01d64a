//! The `mastercheck take` command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use mastercheck_core::engine::{CompletedQuiz, MasteryEngine};
use mastercheck_core::remediation::RemediationCatalog;
use mastercheck_core::session::{QuizSession, SessionState};
use mastercheck_core::store::AttemptStore;
use mastercheck_core::traits::QuestionSource;
use mastercheck_sources::{create_source, load_config_from};

use super::learner_or_default;

const HELP: &str = "Commands: <choice id> | submit | next | prev | goto N | hint | finish | retake | quit";

pub async fn execute(
    module: String,
    learner: Option<String>,
    source_name: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let learner = learner_or_default(learner, &config);

    let (name, source_config) = config.source(source_name.as_deref())?;
    let source: Arc<dyn QuestionSource> = Arc::from(create_source(name, source_config)?);
    let store = Arc::new(AttemptStore::open(&config.store_path)?);
    let catalog = match &config.resources_path {
        Some(path) if path.exists() => RemediationCatalog::load(path)?,
        Some(path) => {
            tracing::warn!(path = %path.display(), "remediation catalog not found");
            RemediationCatalog::default()
        }
        None => RemediationCatalog::default(),
    };
    let engine = MasteryEngine::new(source, Arc::clone(&store), catalog, config.engine_config());

    let mut session = engine.start_quiz(&learner, &module).await?;
    println!(
        "Module {} quiz, attempt {} ({} questions)",
        session.module_id(),
        session.attempt_number(),
        session.questions().len()
    );
    println!("{HELP}");
    print_question(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            save_progress(&engine, &learner, &session, &config.store_path)?;
            break;
        };

        let input = line.trim();
        match input {
            "" => {}
            "help" | "?" => println!("{HELP}"),
            "submit" => match session.submit_current() {
                Ok(feedback) if feedback.correct => println!("Correct!"),
                Ok(feedback) => println!(
                    "Incorrect. The correct answer is {}.",
                    feedback.correct_choice_id
                ),
                Err(e) => println!("{e}"),
            },
            "next" => {
                session.go_next();
                print_question(&session);
            }
            "prev" => {
                session.go_previous();
                print_question(&session);
            }
            "hint" => {
                let question_id = session.current_question().id.clone();
                match session
                    .use_hint(&question_id)
                    .map(|hint| hint.map(str::to_string))
                {
                    Ok(Some(hint)) => println!("Hint: {hint}"),
                    Ok(None) => println!(
                        "No hint available ({} remaining).",
                        session.hints_remaining()
                    ),
                    Err(e) => println!("{e}"),
                }
            }
            "finish" => match engine.complete(&learner, &mut session) {
                Ok(completed) => {
                    store.save_json(&config.store_path)?;
                    print_results(&completed);
                    if completed.attempt.passed() {
                        break;
                    }
                    println!("Type 'retake' to try again, or 'quit'.");
                }
                Err(e) => println!("{e:#}"),
            },
            "retake" => match engine.start_retake(&learner, &session).await {
                Ok(retake) => {
                    session = retake;
                    println!(
                        "\nRetake: attempt {} ({} questions)",
                        session.attempt_number(),
                        session.questions().len()
                    );
                    print_question(&session);
                }
                Err(e) => println!("{e:#}"),
            },
            "quit" | "exit" => {
                save_progress(&engine, &learner, &session, &config.store_path)?;
                break;
            }
            _ => {
                if let Some(n) = input.strip_prefix("goto ") {
                    match n.trim().parse::<usize>() {
                        Ok(n) if n >= 1 => {
                            session.go_to(n - 1);
                            print_question(&session);
                        }
                        _ => println!("goto expects a question number from 1"),
                    }
                    continue;
                }

                let question_id = session.current_question().id.clone();
                match session.select_choice(&question_id, input) {
                    Ok(true) => println!("Selected {input}. Type 'submit' to lock it in."),
                    Ok(false) => println!("This question is already answered."),
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    Ok(())
}

/// Record an unfinished session so it shows up as in progress.
fn save_progress(
    engine: &MasteryEngine,
    learner: &str,
    session: &QuizSession,
    store_path: &Path,
) -> Result<()> {
    if !matches!(
        session.state(),
        SessionState::Active | SessionState::ReadyToFinish
    ) {
        return Ok(());
    }
    let checkpoint = engine.save_checkpoint(learner, session)?;
    engine.store().save_json(store_path)?;
    println!(
        "Progress saved ({}/{} answered).",
        checkpoint.answers().len(),
        checkpoint.total_questions()
    );
    Ok(())
}

fn print_question(session: &QuizSession) {
    let snapshot = session.snapshot();
    let question = &snapshot.question;

    let topic = if question.sub_topic.is_empty() {
        question.topic.clone()
    } else {
        format!("{} - {}", question.topic, question.sub_topic)
    };
    println!(
        "\nQuestion {}/{} [{topic}]",
        snapshot.current_index + 1,
        snapshot.total_questions
    );
    println!("{}", question.prompt);
    for choice in &question.choices {
        let marker = if snapshot.selected_choice_id.as_deref() == Some(choice.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(" {marker} {}) {}", choice.id, choice.text);
    }
    if let Some(feedback) = &snapshot.feedback {
        let verdict = if feedback.correct { "correct" } else { "incorrect" };
        println!("   Answered: {} ({verdict})", feedback.selected_choice_id);
    }
    if let Some(hint) = &snapshot.revealed_hint {
        println!("   Hint: {hint}");
    }
    println!(
        "   Answered {}/{} | score {} | hints left {}",
        snapshot.answered, snapshot.total_questions, snapshot.score, snapshot.hints_remaining
    );
}

fn print_results(completed: &CompletedQuiz) {
    let attempt = &completed.attempt;
    println!(
        "\nScore: {}/{} ({}%) {}",
        attempt.score(),
        attempt.total_questions(),
        attempt.percentage(),
        if attempt.passed() { "PASSED" } else { "FAILED" }
    );
    println!("Module status: {}", completed.status);

    for topic in attempt.topic_breakdown() {
        println!(
            "  {}: {}/{} ({}%)",
            topic.label(),
            topic.correct,
            topic.total,
            topic.percentage()
        );
    }

    if !completed.recommendations.is_empty() {
        println!("\nRecommended review:");
        for rec in &completed.recommendations {
            println!("  {}", rec.prompt);
            for url in &rec.urls {
                println!("    {url}");
            }
        }
    }
}
