//! OpenRouter chat completions client.
//!
//! ### Specification
//!
//! - **Endpoint**: `POST {base_url}/chat/completions`
//! - **Authentication**: `Authorization: Bearer` plus `HTTP-Referer`/`X-Title` attribution headers.
//! - **Request**: the instruction brief as the system message, the question as the user message,
//!   temperature 0.
//! - **Retries**: none. A failed call fails the request.

pub mod error;
pub mod types;

pub use error::TranslatorError;
pub use types::{ChatMessage, ChatRequest, ChatResponse};

use async_trait::async_trait;
use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tradex_core::{AppConfig, Translator};

/// Default base URL for OpenRouter.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model.
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Translator client configuration.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub api_key: String,
    /// Base URL (default: https://openrouter.ai/api/v1).
    pub base_url: String,
    pub model: String,
    /// Sent as `HTTP-Referer`.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            referer: "http://localhost:3000".to_string(),
            title: "TradeXchange AI Demo".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: "tradex/0.1".to_string(),
        }
    }
}

impl TranslatorConfig {
    /// Build from application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, TranslatorError> {
        let api_key = config
            .translator_api_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(TranslatorError::MissingApiKey)?;

        Ok(Self {
            api_key,
            base_url: config.translator_base_url.clone(),
            model: config.translator_model.clone(),
            referer: config.translator_referer.clone(),
            title: config.translator_title.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Turns a question plus instruction brief into query text.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: TranslatorConfig,
}

impl OpenRouterClient {
    pub fn new(config: TranslatorConfig) -> Result<Self, TranslatorError> {
        if config.api_key.is_empty() {
            return Err(TranslatorError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TranslatorError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Request one completion and return the first choice's content.
    pub async fn complete(&self, instructions: &str, question: &str) -> Result<String, TranslatorError> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage::system(instructions), ChatMessage::user(question)],
            temperature: 0.0,
        };

        tracing::debug!("requesting completion: model={}", self.config.model);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("translator response status: {}", status);

        if status == 401 || status == 403 {
            return Err(TranslatorError::AuthError);
        }

        if status == 429 {
            return Err(TranslatorError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<types::ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(TranslatorError::HttpError { status: status.as_u16(), message });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes).map_err(|e| TranslatorError::Parse(e.to_string()))?;

        let content = parsed.first_content().ok_or(TranslatorError::EmptyResponse)?;

        tracing::debug!(
            "completion received in {:?}, finish_reason={}",
            start.elapsed(),
            parsed.finish_reason().unwrap_or("unknown")
        );

        Ok(content.to_string())
    }
}

#[async_trait]
impl Translator for OpenRouterClient {
    async fn translate(&self, instructions: &str, question: &str) -> Result<String, tradex_core::Error> {
        Ok(self.complete(instructions, question).await?)
    }
}
