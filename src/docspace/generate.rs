use crate::config::GeminiConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const KEY_NOT_CONFIGURED_MESSAGE: &str =
    "API key is not configured; set gemini.api_key or DOCSPACE_GEMINI_API_KEY.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "AI service is temporarily unavailable.";
pub const DEFAULT_ERROR_MESSAGE: &str = "Unable to generate content, please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("API key is not configured")]
    KeyNotConfigured,
    #[error("generative service unavailable: {0}")]
    Unavailable(String),
    #[error("response carried no generated text")]
    EmptyResponse,
}

impl GenerateError {
    /// Fixed text shown in place of generated content.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerateError::KeyNotConfigured => KEY_NOT_CONFIGURED_MESSAGE,
            GenerateError::Unavailable(_) => SERVICE_UNAVAILABLE_MESSAGE,
            GenerateError::EmptyResponse => DEFAULT_ERROR_MESSAGE,
        }
    }
}

/// Text-in, text-out generative backend.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn try_generate(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Like `try_generate`, but every failure becomes its fixed user-facing text.
    async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(e) => e.user_message().to_string(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

/// Client for the Gemini `generateContent` endpoint. One POST per call:
/// no retries and no streaming.
pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn try_generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            tracing::error!("Gemini API key is not configured");
            return Err(GenerateError::KeyNotConfigured);
        }

        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {e}");
                GenerateError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Gemini API error: {detail}");
            return Err(GenerateError::Unavailable(format!("HTTP {status}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to decode Gemini response: {e}");
            GenerateError::Unavailable(e.to_string())
        })?;

        parsed.first_text().ok_or(GenerateError::EmptyResponse)
    }
}
