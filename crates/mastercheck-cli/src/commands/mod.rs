pub mod analytics;
pub mod compare;
pub mod init;
pub mod review;
pub mod status;
pub mod take;
pub mod validate;

use mastercheck_sources::MastercheckConfig;

/// Learner from the command line, or the configured default.
pub(crate) fn learner_or_default(learner: Option<String>, config: &MastercheckConfig) -> String {
    learner.unwrap_or_else(|| config.learner.clone())
}
