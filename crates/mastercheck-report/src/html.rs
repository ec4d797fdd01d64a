//! HTML report generator.
//!
//! Produces self-contained HTML files with all CSS/JS inlined.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use mastercheck_core::analytics::{
    class_yield, module_overview, questions_by_accuracy, topic_accuracy, weak_topics,
    AccuracyTier, ModuleAnalytics,
};
use mastercheck_core::model::{ModuleMasteryStatus, MASTERY_THRESHOLD};
use mastercheck_core::report::ProgressReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn page_start(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

fn page_end(html: &mut String) {
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");
    html.push_str("</body>\n</html>");
}

fn status_class(status: ModuleMasteryStatus) -> &'static str {
    match status {
        ModuleMasteryStatus::Passed => "pass",
        ModuleMasteryStatus::Failed => "fail",
        ModuleMasteryStatus::InProgress => "progress",
        ModuleMasteryStatus::NotStarted => "idle",
    }
}

fn tier_class(tier: AccuracyTier) -> &'static str {
    match tier {
        AccuracyTier::High => "pass",
        AccuracyTier::Medium => "medium",
        AccuracyTier::Low => "fail",
    }
}

/// Generate the learner dashboard for a progress report.
pub fn generate_progress_html(report: &ProgressReport) -> String {
    let mut html = String::new();
    page_start(&mut html, &format!("mastercheck progress: {}", report.learner));

    html.push_str("<header>\n");
    html.push_str("<h1>Mastery progress</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Learner: <strong>{}</strong> | {} modules | {}</p>\n",
        html_escape(&report.learner),
        report.overall.total_modules,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if report.overall.mastered {
        html.push_str("<p class=\"badge\">Master</p>\n");
    }
    html.push_str("</header>\n");

    let o = &report.overall;
    html.push_str("<section class=\"dashboard\">\n<h2>Overall</h2>\n");
    html.push_str("<div class=\"cards\">\n");
    for (label, value) in [
        ("Overall score", format!("{}%", o.overall_percentage)),
        ("Completion", format!("{}%", o.completion_rate)),
        ("Passed", format!("{} / {}", o.passed_modules, o.total_modules)),
        ("Failed", o.failed_modules.to_string()),
        ("In progress", o.in_progress_modules.to_string()),
        ("Not started", o.not_started_modules.to_string()),
        ("Attempts", o.total_attempts.to_string()),
    ] {
        html.push_str(&format!(
            "<div class=\"card\"><span class=\"label\">{label}</span><span class=\"value\">{value}</span></div>\n"
        ));
    }
    html.push_str("</div>\n");

    let bars: Vec<(String, u32)> = report
        .modules
        .iter()
        .map(|m| (m.module_id.clone(), m.best_score))
        .collect();
    if !bars.is_empty() {
        html.push_str(&generate_bar_chart(&bars));
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"results\">\n<h2>Modules</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Module</th><th onclick=\"sortTable(1)\">Status</th><th onclick=\"sortTable(2)\">Attempts</th><th onclick=\"sortTable(3)\">Best</th><th>Next</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for m in &report.modules {
        html.push_str(&format!(
            "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}%</td><td>{}</td></tr>\n",
            html_escape(&m.module_id),
            status_class(m.status),
            m.status,
            m.completed_attempts,
            m.best_score,
            m.status.next_action(),
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    push_raw_json(&mut html, &serde_json::to_string_pretty(report).unwrap_or_default());
    page_end(&mut html);
    html
}

/// Generate the instructor view over class analytics.
pub fn generate_analytics_html(modules: &[ModuleAnalytics]) -> String {
    let mut html = String::new();
    page_start(&mut html, "mastercheck class analytics");

    let yield_ = class_yield(modules);
    html.push_str("<header>\n<h1>Class analytics</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} modules | generated {}</p>\n",
        yield_.total_modules,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"dashboard\">\n<h2>Class yield</h2>\n<div class=\"cards\">\n");
    for (label, value) in [
        ("Avg completion", format!("{:.1}%", yield_.avg_completion_rate)),
        ("Avg score", format!("{:.1}%", yield_.avg_score)),
        (
            "High performing",
            format!("{} / {}", yield_.high_performing_modules, yield_.total_modules),
        ),
        ("Students completed", yield_.total_completed_students.to_string()),
    ] {
        html.push_str(&format!(
            "<div class=\"card\"><span class=\"label\">{label}</span><span class=\"value\">{value}</span></div>\n"
        ));
    }
    html.push_str("</div>\n</section>\n");

    for module in modules {
        let overview = module_overview(module);
        html.push_str("<section class=\"module\">\n");
        html.push_str(&format!("<h2>{}</h2>\n", html_escape(&module.module_name)));
        html.push_str(&format!(
            "<p class=\"meta\">{} questions | {}% average accuracy | {} strong | {} weak | {} / {} students completed</p>\n",
            overview.total_questions,
            overview.average_accuracy,
            overview.strong_questions,
            overview.weak_questions,
            module.completed_students,
            module.total_students,
        ));

        let weak = weak_topics(module);
        if !weak.is_empty() {
            let escaped: Vec<String> = weak.iter().map(|t| html_escape(t)).collect();
            html.push_str(&format!(
                "<p class=\"weak\">Weak topics: {}</p>\n",
                escaped.join(", ")
            ));
        }

        html.push_str("<h3>Topics</h3>\n<table>\n");
        html.push_str("<thead><tr><th>Topic</th><th>Correct</th><th>Attempts</th><th>Accuracy</th></tr></thead>\n<tbody>\n");
        for t in topic_accuracy(module) {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}%</td></tr>\n",
                html_escape(&t.topic),
                t.correct_answers,
                t.total_attempts,
                tier_class(t.tier()),
                t.accuracy,
            ));
        }
        html.push_str("</tbody></table>\n");

        html.push_str("<h3>Questions, problem areas first</h3>\n<table>\n");
        html.push_str("<thead><tr><th>Question</th><th>Topic</th><th>Accuracy</th><th>Correct</th></tr></thead>\n<tbody>\n");
        for q in questions_by_accuracy(module) {
            let topic = if q.sub_topic.is_empty() {
                html_escape(&q.topic)
            } else {
                format!("{} - {}", html_escape(&q.topic), html_escape(&q.sub_topic))
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td class=\"{}\">{:.1}%</td><td>{} / {}</td></tr>\n",
                html_escape(&q.prompt),
                topic,
                tier_class(q.tier()),
                q.accuracy,
                q.correct_answers,
                q.total_attempts,
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    page_end(&mut html);
    html
}

fn push_raw_json(html: &mut String, json: &str) {
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&json.replace('<', "&lt;").replace('>', "&gt;"));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");
}

/// Write the learner dashboard to a file.
pub fn write_progress_html(report: &ProgressReport, path: &Path) -> Result<()> {
    write_file(path, &generate_progress_html(report))
}

/// Write the instructor view to a file.
pub fn write_analytics_html(modules: &[ModuleAnalytics], path: &Path) -> Result<()> {
    write_file(path, &generate_analytics_html(modules))
}

fn write_file(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))
}

/// Horizontal bars of best score per module, colored against the pass mark.
fn generate_bar_chart(bars: &[(String, u32)]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 120;

    let total_height = bars.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (label, score)) in bars.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (*score as usize).min(100) * max_width / 100;

        let color = if *score >= MASTERY_THRESHOLD {
            "#22c55e"
        } else if *score > 0 {
            "#ef4444"
        } else {
            "#9ca3af"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --medium: #fef9c3; --progress: #dbeafe; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --medium: #713f12; --progress: #1e3a8a; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.badge { display: inline-block; padding: 0.25rem 0.75rem; border-radius: 999px; background: #eab308; color: #1a1a1a; font-weight: bold; }
.cards { display: flex; flex-wrap: wrap; gap: 1rem; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 0.75rem 1rem; min-width: 8rem; }
.card .label { display: block; color: #6b7280; font-size: 0.8rem; }
.card .value { font-size: 1.4rem; font-weight: bold; }
.weak { color: #b91c1c; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.medium { background: var(--medium); }
.progress { background: var(--progress); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  if (!table) return;
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, { numeric: true }) : vb.localeCompare(va, undefined, { numeric: true });
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
