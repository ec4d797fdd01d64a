use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mastercheck_core::model::{Choice, Question};
use mastercheck_core::parser::parse_question_set_str;
use mastercheck_core::session::QuizSession;

fn question(i: usize) -> Question {
    Question {
        id: i.to_string(),
        prompt: format!("Question {i}?"),
        choices: ["a", "b", "c", "d"]
            .iter()
            .map(|c| Choice {
                id: (*c).to_string(),
                text: c.to_uppercase(),
            })
            .collect(),
        correct_choice_id: "a".into(),
        topic: format!("topic-{}", i % 5),
        sub_topic: String::new(),
        hint: Some("hint".into()),
    }
}

fn run_quiz(questions: Vec<Question>) -> u32 {
    let mut session = QuizSession::new("bench", questions, 1).expect("valid set");
    for i in 0..session.questions().len() {
        session.go_to(i);
        let id = session.current_question().id.clone();
        let choice = if i % 3 == 0 { "b" } else { "a" };
        session.select_choice(&id, choice).expect("select");
        session.submit_current().expect("submit");
    }
    session.finalize().expect("finalize").percentage()
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    for size in [10usize, 50, 200] {
        let questions: Vec<Question> = (1..=size).map(question).collect();
        group.bench_function(format!("{size}_questions"), |b| {
            b.iter(|| run_quiz(black_box(questions.clone())))
        });
    }

    group.finish();
}

fn bench_toml_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("toml_parsing");

    let small = generate_question_set_toml(10);
    let large = generate_question_set_toml(200);

    group.bench_function("10_questions", |b| {
        b.iter(|| parse_question_set_str(black_box(&small), std::path::Path::new("bench.toml")))
    });

    group.bench_function("200_questions", |b| {
        b.iter(|| parse_question_set_str(black_box(&large), std::path::Path::new("bench.toml")))
    });

    group.finish();
}

fn generate_question_set_toml(n: usize) -> String {
    let mut s = String::from("[quiz]\nmodule_id = \"bench\"\ntitle = \"Bench\"\n");
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
id = "{i}"
prompt = "Question {i}?"
topic = "topic-{t}"
correct = "a"
choices = [{{ id = "a", text = "A" }}, {{ id = "b", text = "B" }}, {{ id = "c", text = "C" }}]
"#,
            t = i % 5
        ));
    }
    s
}

criterion_group!(benches, bench_session, bench_toml_parsing);
criterion_main!(benches);
