//! LLM Client: the single point of entry for all text generation.
//!
//! ARCHITECTURAL RULE: sections and the final resume are produced through
//! `dyn TextGenerator` only. Two backends exist: the Anthropic Messages API
//! (`LlmClient`, used when an API key is configured) and the local `claude`
//! CLI (`ClaudeCli`).
//!
//! Model: claude-sonnet-4-5 (hardcoded, not configurable)

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::process::{ProcessError, ProcessRunner};

pub mod claude_cli;
pub mod prompts;

pub use claude_cli::ClaudeCli;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all HTTP generation calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("generation reported an error: {0}")]
    Reported(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Black-box text generation: one prompt in, plain text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name for progress output.
    fn name(&self) -> String;

    async fn generate(&self, prompt: &str, cwd: &Path) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the first non-empty text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    fn name(&self) -> String {
        format!("Anthropic API ({MODEL})")
    }

    async fn generate(&self, prompt: &str, _cwd: &Path) -> Result<String, LlmError> {
        let response = self.call(prompt, prompts::RESUME_WRITER_SYSTEM).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        non_empty(text)
    }
}

/// Picks the generation backend: the HTTP API when a key is configured,
/// otherwise the locally installed `claude` CLI.
pub fn from_config(
    config: &Config,
    runner: Arc<dyn ProcessRunner>,
) -> Result<Arc<dyn TextGenerator>, AppError> {
    if let Some(api_key) = &config.anthropic_api_key {
        let client = LlmClient::new(api_key.clone())
            .map_err(|e| AppError::GeneratorUnavailable(e.to_string()))?;
        info!("LLM client initialized (model: {MODEL})");
        return Ok(Arc::new(client));
    }

    let executable = claude_cli::find_claude_path(runner.as_ref(), config.claude_path.as_deref())
        .ok_or_else(|| AppError::GeneratorUnavailable("claude CLI not found".to_string()))?;
    info!("Using claude CLI at {}", executable.display());
    Ok(Arc::new(ClaudeCli::new(runner, executable)))
}

/// Cleans generated text; blank output counts as a failed generation.
pub(crate) fn non_empty(text: &str) -> Result<String, LlmError> {
    let cleaned = strip_markdown_fences(text);
    if cleaned.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(cleaned.to_string())
}

/// Strips a ```markdown / ```md / ``` fence wrapped around LLM output.
pub fn strip_markdown_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = ["markdown", "md"]
        .iter()
        .find_map(|tag| {
            rest.get(..tag.len())
                .filter(|head| head.eq_ignore_ascii_case(tag))
                .map(|_| &rest[tag.len()..])
        })
        .unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}
