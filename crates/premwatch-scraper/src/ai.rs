//! Client for the AI text-understanding collaborator.
//!
//! The collaborator receives a bounded text snippet plus a JSON schema and
//! returns structured JSON. [`OpenAiClient`] speaks the OpenAI-compatible
//! chat-completions protocol; tests substitute their own [`AiExtractor`].

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{AiError, ScraperError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You extract premises licence records from UK local council \
licensing register pages. Return JSON matching the supplied schema. Only include premises \
that are explicitly listed on the page; never invent values. Use null for unknown fields.";

/// Shape the collaborator must return for licence extraction.
pub static LICENCE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    let nullable_string = json!({ "type": ["string", "null"] });
    json!({
        "type": "object",
        "properties": {
            "licences": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "premises_name": { "type": "string" },
                        "premises_address": nullable_string,
                        "postcode": nullable_string,
                        "licence_holder": nullable_string,
                        "licence_type": nullable_string,
                        "licence_status": nullable_string,
                        "granted_date": nullable_string,
                        "application_date": nullable_string,
                        "designated_premises_supervisor": nullable_string,
                        "licensable_activities": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "opening_hours": nullable_string,
                        "alcohol_hours": nullable_string,
                        "conditions": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "description": nullable_string,
                        "confidence": { "type": ["number", "null"] }
                    },
                    "required": ["premises_name"]
                }
            }
        },
        "required": ["licences"]
    })
});

#[async_trait]
pub trait AiExtractor: Send + Sync {
    /// Extract structured data from `snippet` according to `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] on transport failure, a non-success status, or a
    /// response that is not valid JSON.
    async fn extract_structured(&self, snippet: &str, schema: &Value) -> Result<Value, AiError>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    /// Creates a client pointed at the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, ScraperError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client for any OpenAI-compatible endpoint (or a mock server).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ScraperError::InvalidUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let trimmed = base_url.trim_end_matches('/');
        url::Url::parse(trimmed).map_err(|e| ScraperError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            endpoint: format!("{trimmed}/chat/completions"),
        })
    }

    fn request_body(&self, snippet: &str, schema: &Value) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "licence_extraction",
                    "schema": schema
                }
            },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Extract every licensed premises from this page text:\n\n{snippet}")
                }
            ]
        })
    }
}

#[async_trait]
impl AiExtractor for OpenAiClient {
    async fn extract_structured(&self, snippet: &str, schema: &Value) -> Result<Value, AiError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(snippet, schema))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(AiError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let envelope: Value = serde_json::from_str(&text).map_err(|e| AiError::Deserialize {
            context: "chat completion envelope".to_owned(),
            source: e,
        })?;
        let content = message_content(&envelope)?;

        serde_json::from_str(strip_code_fence(content)).map_err(|e| AiError::Deserialize {
            context: "chat completion content".to_owned(),
            source: e,
        })
    }
}

fn message_content(envelope: &Value) -> Result<&str, AiError> {
    envelope
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| AiError::MalformedResponse("missing choices[0].message.content".to_owned()))
}

/// Some models wrap JSON in a Markdown fence even when asked not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
