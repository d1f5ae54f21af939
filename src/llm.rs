use crate::config::LlmConfig;
use crate::error::{QueryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Natural-language understanding capability the pipeline depends on.
///
/// One call per need: `instructions` carries the fixed task description and
/// `prompt` the per-call content. Implementations return parsed JSON.
#[async_trait]
pub trait LanguageCapability: Send + Sync {
    async fn translate(&self, prompt: &str, instructions: &str) -> Result<Value>;
}

/// Run one capability call, bounded by `limit` when given
pub async fn translate_within(
    capability: &dyn LanguageCapability,
    prompt: &str,
    instructions: &str,
    limit: Option<Duration>,
) -> Result<Value> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, capability.translate(prompt, instructions))
            .await
            .map_err(|_| QueryError::Timeout(limit))?,
        None => capability.translate(prompt, instructions).await,
    }
}

/// Chat-completions client for OpenAI-compatible endpoints
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| QueryError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| QueryError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn call_llm(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(QueryError::Llm(format!("LLM API returned {}: {}", status, text)));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| QueryError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| QueryError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl LanguageCapability for LlmClient {
    async fn translate(&self, prompt: &str, instructions: &str) -> Result<Value> {
        let response = self.call_llm(instructions, prompt).await?;
        debug!("LLM response: {}", response);
        parse_json_reply(&response)
    }
}

/// Parse a model reply as JSON, tolerating markdown code fences
pub fn parse_json_reply(reply: &str) -> Result<Value> {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(cleaned)
        .map_err(|e| QueryError::Llm(format!("Failed to parse LLM response: {}. Response: {}", e, cleaned)))
}
