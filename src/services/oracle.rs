//! AI oracle client.
//! Single-shot text completion against an OpenAI-compatible chat endpoint
//! (OpenRouter in production). No streaming, no conversation state. The
//! round trip is bounded by a hard timeout; expiry is a retryable failure
//! for the caller, never retried here.

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle returned status {0}")]
    Status(u16),

    #[error("oracle call timed out after {0}s")]
    Timeout(u64),

    #[error("oracle returned no choices")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OracleClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.oracle_base_url.trim_end_matches('/').to_string(),
            api_key: config.oracle_key.clone(),
            model: config.oracle_model.clone(),
            timeout: Duration::from_secs(config.oracle_timeout_secs),
        }
    }

    /// One prompt in, one text completion out.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let call = async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(OracleError::Status(status.as_u16()));
            }

            let body: ChatResponse = response.json().await?;
            body.choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or(OracleError::EmptyResponse)
        };

        match timeout(self.timeout, call).await {
            Ok(result) => {
                if let Ok(text) = &result {
                    debug!("oracle returned {} bytes", text.len());
                }
                result
            }
            Err(_) => Err(OracleError::Timeout(self.timeout.as_secs())),
        }
    }
}
