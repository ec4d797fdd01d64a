//! mastercheck-core: mastery assessment engine.
//!
//! Quiz sessions, the append-only attempt store, mastery aggregation,
//! remediation lookups and instructor analytics. Question sets come from a
//! [`traits::QuestionSource`] implemented in `mastercheck-sources`.

pub mod analytics;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod remediation;
pub mod report;
pub mod session;
pub mod statistics;
pub mod store;
pub mod traits;
