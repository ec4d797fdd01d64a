//! mastercheck-report: self-contained HTML views of learner progress and
//! class analytics.

pub mod html;

pub use html::{
    generate_analytics_html, generate_progress_html, write_analytics_html, write_progress_html,
};
