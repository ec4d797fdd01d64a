//! End-to-end tests: question bank -> engine -> store -> progress report.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mastercheck_core::engine::{EngineConfig, MasteryEngine};
use mastercheck_core::model::ModuleMasteryStatus;
use mastercheck_core::remediation::RemediationCatalog;
use mastercheck_core::report::ProgressReport;
use mastercheck_core::session::QuizSession;
use mastercheck_core::store::AttemptStore;
use mastercheck_sources::mock::MockSource;
use mastercheck_sources::DirectorySource;

fn make_engine() -> (MasteryEngine, Arc<AttemptStore>, Vec<String>) {
    let bank = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../question-sets");
    let source = DirectorySource::open(&bank).unwrap();
    let modules = source.module_ids();
    let store = Arc::new(AttemptStore::new());
    let catalog = RemediationCatalog::from_toml_str(
        r#"
[resources."1"]
"3" = ["https://en.wikipedia.org/wiki/Amdahl%27s_law"]
"#,
    )
    .unwrap();
    let config = EngineConfig {
        max_questions: None,
        max_retries: 0,
        retry_delay: Duration::from_millis(1),
    };
    let engine = MasteryEngine::new(Arc::new(source), Arc::clone(&store), catalog, config);
    (engine, store, modules)
}

/// Answer every question: correctly when `pick_correct` says so, otherwise
/// with the first wrong choice.
fn answer_all(session: &mut QuizSession, pick_correct: impl Fn(&str) -> bool) {
    for i in 0..session.questions().len() {
        session.go_to(i);
        let question = session.current_question().clone();
        let choice = if pick_correct(&question.id) {
            question.correct_choice_id.clone()
        } else {
            question
                .choices
                .iter()
                .find(|c| c.id != question.correct_choice_id)
                .unwrap()
                .id
                .clone()
        };
        session.select_choice(&question.id, &choice).unwrap();
        session.submit_current().unwrap();
    }
}

#[tokio::test]
async fn e2e_fail_then_retake_and_pass() {
    let (engine, store, modules) = make_engine();

    let mut first = engine.start_quiz("ada", "1").await.unwrap();
    assert_eq!(first.attempt_number(), 1);
    // Misses every Performance question.
    let performance: Vec<String> = first
        .questions()
        .iter()
        .filter(|q| q.topic == "Performance")
        .map(|q| q.id.clone())
        .collect();
    answer_all(&mut first, |id| !performance.iter().any(|p| p == id));

    let completed = engine.complete("ada", &mut first).unwrap();
    assert_eq!(completed.attempt.percentage(), 60);
    assert_eq!(completed.status, ModuleMasteryStatus::Failed);
    assert_eq!(completed.recommendations.len(), 1);
    assert_eq!(completed.recommendations[0].question_id, "3");

    let mut retake = engine.start_retake("ada", &first).await.unwrap();
    assert_eq!(retake.attempt_number(), 2);
    assert_eq!(retake.hints_remaining(), 3);
    // Missed topic comes first.
    assert_eq!(retake.questions()[0].topic, "Performance");
    assert_eq!(retake.questions()[1].topic, "Performance");

    answer_all(&mut retake, |_| true);
    let completed = engine.complete("ada", &mut retake).unwrap();
    assert_eq!(completed.status, ModuleMasteryStatus::Passed);
    assert!(completed.recommendations.is_empty());

    // Passing blocks further retakes.
    assert!(engine.start_retake("ada", &retake).await.is_err());

    let history = store.history("ada");
    let stats = history.overall_statistics(&modules);
    assert_eq!(stats.total_modules, 2);
    assert_eq!(stats.passed_modules, 1);
    assert_eq!(stats.not_started_modules, 1);
    assert_eq!(stats.total_attempts, 2);
    assert_eq!(stats.completion_rate, 50);
    // 3 + 5 correct out of 10.
    assert_eq!(stats.overall_percentage, 80);
    assert!(!stats.mastered);
    assert_eq!(history.best_score("1"), 100);
}

#[tokio::test]
async fn e2e_store_survives_reload() {
    let (engine, store, modules) = make_engine();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attempts.json");

    let mut session = engine.start_quiz("ada", "2").await.unwrap();
    answer_all(&mut session, |_| true);
    engine.complete("ada", &mut session).unwrap();

    let mut other = engine.start_quiz("grace", "1").await.unwrap();
    other.select_choice("1", "b").unwrap();
    other.submit_current().unwrap();
    engine.save_checkpoint("grace", &other).unwrap();

    store.save_json(&path).unwrap();
    let reloaded = AttemptStore::load_json(&path).unwrap();

    assert_eq!(reloaded.learners(), vec!["ada", "grace"]);
    assert_eq!(
        reloaded.history("ada").module_status("2"),
        ModuleMasteryStatus::Passed
    );
    assert_eq!(
        reloaded.history("grace").module_status("1"),
        ModuleMasteryStatus::InProgress
    );
    // Checkpoints do not consume attempt numbers.
    assert_eq!(reloaded.next_attempt_number("grace", "1"), 1);

    let report = ProgressReport::from_history(&reloaded.history("ada"), &modules);
    assert_eq!(report.module("2").unwrap().best_score, 100);
    assert_eq!(report.overall.passed_modules, 1);
}

#[tokio::test]
async fn e2e_progress_compare() {
    let (engine, store, modules) = make_engine();

    let baseline = ProgressReport::from_history(&store.history("ada"), &modules);

    let mut session = engine.start_quiz("ada", "1").await.unwrap();
    answer_all(&mut session, |_| true);
    engine.complete("ada", &mut session).unwrap();

    let current = ProgressReport::from_history(&store.history("ada"), &modules);
    let delta = current.compare(&baseline);
    assert_eq!(delta.newly_passed, vec!["1"]);
    assert!(!delta.has_regressions());
    assert_eq!(delta.overall_before, 0);
    assert_eq!(delta.overall_after, 100);
}

#[tokio::test]
async fn e2e_unknown_module_is_not_retried() {
    let (engine, _store, _modules) = make_engine();
    let err = engine.start_quiz("ada", "404").await.unwrap_err();
    assert!(err.to_string().contains("module not found: 404"));
}

#[tokio::test]
async fn e2e_retake_request_carries_missed_topics() {
    let bank = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../question-sets");
    let set = DirectorySource::open(&bank).unwrap().get("2").cloned().unwrap();
    let source = Arc::new(MockSource::new([set]));
    let engine = MasteryEngine::new(
        Arc::clone(&source) as Arc<dyn mastercheck_core::traits::QuestionSource>,
        Arc::new(AttemptStore::new()),
        RemediationCatalog::default(),
        EngineConfig {
            max_questions: Some(3),
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        },
    );

    let mut session = engine.start_quiz("ada", "2").await.unwrap();
    assert_eq!(session.questions().len(), 3);
    answer_all(&mut session, |id| id == "1");
    engine.complete("ada", &mut session).unwrap();

    engine.start_retake("ada", &session).await.unwrap();
    let request = source.last_request().unwrap();
    assert_eq!(request.attempt_number, 2);
    assert_eq!(request.focus_topics, vec!["Instruction Formats", "Procedures"]);
    assert_eq!(source.call_count(), 2);
}
