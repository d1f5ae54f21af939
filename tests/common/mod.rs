#![allow(dead_code)]

use async_trait::async_trait;
use clinical_query_agent::error::{QueryError, Result};
use clinical_query_agent::llm::LanguageCapability;
use clinical_query_agent::Dataset;
use polars::prelude::*;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Language capability that replays canned replies in order and records
/// every prompt it was given.
pub struct ScriptedCapability {
    replies: Mutex<VecDeque<Result<Value>>>,
    prompts: Mutex<Vec<String>>,
    stall_on: Option<usize>,
}

impl ScriptedCapability {
    pub fn new(replies: Vec<Result<Value>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            stall_on: None,
        }
    }

    /// Hang for a long time on the given zero-based call instead of replying
    pub fn stalling_on(mut self, call: usize) -> Self {
        self.stall_on = Some(call);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageCapability for ScriptedCapability {
    async fn translate(&self, prompt: &str, _instructions: &str) -> Result<Value> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QueryError::Llm("script exhausted".to_string())));
        if self.stall_on == Some(call) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        reply
    }
}

/// Small ADAE extract used across the integration tests
pub fn adae() -> Dataset {
    let df = df! [
        "usubjid" => ["01-701-1015", "01-701-1015", "01-701-1023", "01-701-1028", "01-701-1034", "01-701-1047"],
        "aesev" => ["MILD", "SEVERE", "MODERATE", "SEVERE", "MILD", "SEVERE"],
        "aeterm" => ["APPLICATION SITE PRURITUS", "DIARRHOEA", "ERYTHEMA", "PRURITUS", "HIP FRACTURE", "ERYTHEMA"],
        "aedecod" => ["Application site pruritus", "Diarrhoea", "Erythema", "Pruritus", "Hip fracture", "Erythema"],
        "aesdth" => ["N", "N", "N", "N", "N", "Y"],
        "aestdy" => [2i64, 7, 15, 3, 40, 22]
    ]
    .unwrap();
    Dataset::from_frame(df).unwrap()
}
