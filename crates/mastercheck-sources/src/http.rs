//! Question generation service client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mastercheck_core::error::SourceError;
use mastercheck_core::model::{Choice, Question, QuestionSet};
use mastercheck_core::traits::{QuestionRequest, QuestionSource};

const DEFAULT_RETRY_AFTER_MS: u64 = 1000;
const DEFAULT_TOPIC: &str = "General";

/// Fetches generated quizzes over HTTP.
pub struct HttpSource {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout_secs,
            client,
        })
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    module_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_questions: Option<usize>,
    attempt_number: u32,
    focus_topics: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuiz {
    #[serde(alias = "module_id")]
    module_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    questions: Vec<WireQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    id: String,
    prompt: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default, alias = "sub_topic")]
    sub_topic: String,
    #[serde(default)]
    hint: Option<String>,
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChoice {
    id: String,
    text: String,
    #[serde(default, alias = "is_correct")]
    is_correct: bool,
}

#[derive(Deserialize)]
struct WireErrorBody {
    detail: String,
}

impl WireQuiz {
    fn into_question_set(self) -> Result<QuestionSet, SourceError> {
        let fallback_topic = if self.title.trim().is_empty() {
            DEFAULT_TOPIC.to_string()
        } else {
            self.title.clone()
        };

        let questions = self
            .questions
            .into_iter()
            .map(|q| {
                let correct: Vec<&WireChoice> = q.choices.iter().filter(|c| c.is_correct).collect();
                let [correct] = correct.as_slice() else {
                    return Err(SourceError::ApiError {
                        status: 0,
                        message: format!(
                            "question '{}' has {} choices marked correct, expected 1",
                            q.id,
                            correct.len()
                        ),
                    });
                };
                let correct_choice_id = correct.id.clone();

                Ok(Question {
                    id: q.id,
                    prompt: q.prompt,
                    choices: q
                        .choices
                        .into_iter()
                        .map(|c| Choice { id: c.id, text: c.text })
                        .collect(),
                    correct_choice_id,
                    topic: q
                        .topic
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| fallback_topic.clone()),
                    sub_topic: q.sub_topic,
                    hint: q.hint.filter(|h| !h.trim().is_empty()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuestionSet {
            module_id: self.module_id,
            title: self.title,
            description: self.description,
            questions,
        })
    }
}

/// Prefer the service's `detail` field; fall back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<WireErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or(body)
}

#[async_trait]
impl QuestionSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(module = %request.module_id, attempt = request.attempt_number))]
    async fn fetch(&self, request: &QuestionRequest) -> anyhow::Result<QuestionSet> {
        let body = WireRequest {
            module_id: &request.module_id,
            num_questions: request.max_questions,
            attempt_number: request.attempt_number,
            focus_topics: &request.focus_topics,
        };

        let mut builder = self
            .client
            .post(format!("{}/fetch/quiz", self.base_url))
            .json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                SourceError::NetworkError(format!(
                    "question service not reachable at {}",
                    self.base_url
                ))
            } else {
                SourceError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            401 | 403 => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::AuthenticationFailed(error_message(body)).into());
            }
            404 => return Err(SourceError::ModuleNotFound(request.module_id.clone()).into()),
            429 => {
                let retry_after_ms = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(|secs| secs * 1000)
                    .unwrap_or(DEFAULT_RETRY_AFTER_MS);
                return Err(SourceError::RateLimited { retry_after_ms }.into());
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::ApiError {
                    status,
                    message: error_message(body),
                }
                .into());
            }
        }

        let quiz: WireQuiz = response.json().await.map_err(|e| SourceError::ApiError {
            status,
            message: format!("failed to parse quiz response: {e}"),
        })?;
        let set = quiz.into_question_set()?;
        tracing::debug!(questions = set.questions.len(), "quiz received");
        Ok(set)
    }
}
