//! Client for the remote prediction endpoint.
//!
//! Sends one free-form question as `POST {"message": text}` and maps the
//! outcome into an [`AnswerResult`]. No conversation context is sent and
//! nothing is retried; a failed request needs the visitor to ask again.

use std::time::Duration;

use async_trait::async_trait;
use mqa_core::config::RemoteConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;

/// Outcome of asking the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerResult {
    Answered(String),
    Failed(String),
    /// A well-formed response that carried no answer.
    Empty,
}

/// Anything that can answer a free-form question.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn ask(&self, text: &str) -> AnswerResult;
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// RemoteAnswerClient
// =============================================================================

pub struct RemoteAnswerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RemoteAnswerClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| RemoteError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the question and return the raw body of a 2xx response.
    async fn send(&self, text: &str) -> Result<String, RemoteError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&PredictRequest { message: text })
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AnswerSource for RemoteAnswerClient {
    async fn ask(&self, text: &str) -> AnswerResult {
        debug!(endpoint = %self.endpoint, len = text.len(), "Asking prediction endpoint");
        match self.send(text).await {
            Ok(body) => interpret_response(&body),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Prediction request failed");
                AnswerResult::Failed(e.to_string())
            }
        }
    }
}

/// Map a 2xx response body to an [`AnswerResult`].
///
/// An `error` field wins over `answer`; a blank answer counts as no answer.
pub fn interpret_response(body: &str) -> AnswerResult {
    let parsed: PredictResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => return AnswerResult::Failed(format!("malformed response: {e}")),
    };
    if let Some(error) = parsed.error {
        return AnswerResult::Failed(error);
    }
    match parsed.answer {
        Some(answer) if !answer.trim().is_empty() => AnswerResult::Answered(answer),
        _ => AnswerResult::Empty,
    }
}
