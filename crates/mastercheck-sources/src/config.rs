//! Configuration loading and source factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mastercheck_core::engine::EngineConfig;
use mastercheck_core::traits::QuestionSource;

use crate::directory::DirectorySource;
use crate::http::HttpSource;

/// Configuration for a single question source.
///
/// Debug output masks tokens.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A directory of TOML question sets.
    Directory { path: PathBuf },
    /// A question generation service.
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::Directory { path } => {
                f.debug_struct("Directory").field("path", path).finish()
            }
            SourceConfig::Http {
                base_url,
                token,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("token", &token.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Top-level mastercheck configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastercheckConfig {
    /// Question sources keyed by name.
    #[serde(default = "default_sources")]
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default = "default_source")]
    pub default_source: String,
    /// Learner id used when none is given on the command line.
    #[serde(default = "default_learner")]
    pub learner: String,
    /// JSON file holding the attempt log.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// TOML remediation catalog.
    #[serde(default)]
    pub resources_path: Option<PathBuf>,
    /// Cap on questions per quiz.
    #[serde(default)]
    pub max_questions: Option<usize>,
    /// Max retries on transient source errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_sources() -> HashMap<String, SourceConfig> {
    HashMap::from([(
        default_source(),
        SourceConfig::Directory {
            path: PathBuf::from("questions"),
        },
    )])
}
fn default_source() -> String {
    "local".to_string()
}
fn default_learner() -> String {
    "learner".to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from(".mastercheck/attempts.json")
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}

impl Default for MastercheckConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            default_source: default_source(),
            learner: default_learner(),
            store_path: default_store_path(),
            resources_path: None,
            max_questions: None,
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl MastercheckConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_questions: self.max_questions,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Look up a source by name, or the default source.
    pub fn source(&self, name: Option<&str>) -> Result<(&str, &SourceConfig)> {
        let name = name.unwrap_or(self.default_source.as_str());
        self.sources
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                let mut known: Vec<&str> = self.sources.keys().map(String::as_str).collect();
                known.sort();
                format!("unknown source '{name}' (configured: {})", known.join(", "))
            })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

fn resolve_source_config(config: &SourceConfig) -> SourceConfig {
    match config {
        SourceConfig::Directory { path } => SourceConfig::Directory {
            path: resolve_path(path),
        },
        SourceConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => SourceConfig::Http {
            base_url: resolve_env_vars(base_url),
            token: token
                .as_deref()
                .map(resolve_env_vars)
                .filter(|t| !t.is_empty()),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mastercheck.toml` in the current directory
/// 2. `~/.config/mastercheck/config.toml`
///
/// `MASTERCHECK_SOURCE_TOKEN` overrides the token of every HTTP source.
pub fn load_config() -> Result<MastercheckConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MastercheckConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("mastercheck.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), sources = config.sources.len(), "config loaded");
            config
        }
        None => MastercheckConfig::default(),
    };

    Ok(apply_environment(config, std::env::var("MASTERCHECK_SOURCE_TOKEN").ok()))
}

/// Parse a config file body without touching the environment overrides.
pub fn parse_config_str(content: &str) -> Result<MastercheckConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_environment(mut config: MastercheckConfig, token_override: Option<String>) -> MastercheckConfig {
    config.sources = config
        .sources
        .iter()
        .map(|(k, v)| (k.clone(), resolve_source_config(v)))
        .collect();
    config.store_path = resolve_path(&config.store_path);
    config.resources_path = config.resources_path.as_deref().map(resolve_path);

    if let Some(override_token) = token_override.filter(|t| !t.is_empty()) {
        for source in config.sources.values_mut() {
            if let SourceConfig::Http { token, .. } = source {
                *token = Some(override_token.clone());
            }
        }
    }
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mastercheck"))
}

/// Create a source instance from its configuration.
pub fn create_source(name: &str, config: &SourceConfig) -> Result<Box<dyn QuestionSource>> {
    match config {
        SourceConfig::Directory { path } => Ok(Box::new(
            DirectorySource::open(path)
                .with_context(|| format!("failed to open source '{name}'"))?,
        )),
        SourceConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => Ok(Box::new(HttpSource::new(
            base_url,
            token.clone(),
            *timeout_secs,
        )?)),
    }
}
