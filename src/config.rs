//! Settings read from the environment (and `.env`), overridable from the CLI.

use crate::error::{QueryError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATA_PATH: &str = "data/adae.csv";
pub const DEFAULT_SAMPLE_CAP: usize = 300;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            request_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum distinct values listed when asking for an alternative value
    pub sample_cap: usize,
    /// Upper bound on each capability call; `None` waits indefinitely
    pub call_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            call_timeout: Some(Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub data_path: PathBuf,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs: u64 = parse_or(get("ADAE_LLM_TIMEOUT_SECS"), "ADAE_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;
        let sample_cap: usize = parse_or(get("ADAE_SAMPLE_CAP"), "ADAE_SAMPLE_CAP", DEFAULT_SAMPLE_CAP)?;
        let temperature: f32 = parse_or(get("OPENAI_TEMPERATURE"), "OPENAI_TEMPERATURE", 0.0)?;

        let timeout = Duration::from_secs(timeout_secs);
        Ok(Self {
            data_path: get("ADAE_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            llm: LlmConfig {
                api_key: get("OPENAI_API_KEY"),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                temperature,
                request_timeout: timeout,
            },
            pipeline: PipelineConfig {
                sample_cap,
                call_timeout: Some(timeout),
            },
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| QueryError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/adae.csv"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.pipeline.sample_cap, 300);
        assert_eq!(config.pipeline.call_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("ADAE_SAMPLE_CAP", "50"),
            ("ADAE_LLM_TIMEOUT_SECS", "5"),
            ("ADAE_DATA_PATH", "/tmp/ae.csv"),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.pipeline.sample_cap, 50);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(5));
        assert_eq!(config.data_path, PathBuf::from("/tmp/ae.csv"));
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = AgentConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = AgentConfig::from_lookup(lookup(&[("ADAE_SAMPLE_CAP", "lots")])).unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }
}
