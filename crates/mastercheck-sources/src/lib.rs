//! mastercheck-sources: question-set suppliers and configuration.
//!
//! Implements the `QuestionSource` trait for a local TOML question bank and
//! for a remote quiz generation service, and loads `mastercheck.toml`.

pub mod config;
pub mod directory;
pub mod http;
pub mod mock;

pub use config::{create_source, load_config, load_config_from, MastercheckConfig, SourceConfig};
pub use directory::DirectorySource;
pub use http::HttpSource;
pub use mastercheck_core::error::SourceError;
