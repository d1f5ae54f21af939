//! Best-effort recovery for queries that matched nothing.
//!
//! Each text predicate, in order, gets one chance: the language capability
//! sees a sample of the values actually present in that column and proposes
//! a replacement. The first replacement that yields at least one subject wins.

use crate::dataset::{ColumnKind, Dataset};
use crate::error::{QueryError, Result};
use crate::filter_executor::{self, QueryResult};
use crate::intent::{FilterIntent, FilterPredicate};
use crate::llm::{translate_within, LanguageCapability};
use crate::schema::SchemaRegistry;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const ALTERNATIVE_VALUE_INSTRUCTIONS: &str = r#"You correct filter values for a clinical adverse-event dataset.
Suggest ONE alternative filter value that is the closest match or spelling variant (e.g. UK vs US spelling, MedDRA term) of the original value. Pick from the listed values if possible.
Return ONLY valid JSON: { "filter_value": "your_suggested_value" }"#;

/// The substitution that turned an empty result into a non-empty one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackOutcome {
    pub column: String,
    pub predicate_index: usize,
    pub original_value: String,
    pub substituted_value: String,
}

/// Intent and result after an accepted substitution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub intent: FilterIntent,
    pub result: QueryResult,
    pub outcome: FallbackOutcome,
}

pub struct FallbackResolver<'a> {
    schema: &'a SchemaRegistry,
    sample_cap: usize,
    call_timeout: Option<Duration>,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(schema: &'a SchemaRegistry, sample_cap: usize, call_timeout: Option<Duration>) -> Self {
        Self {
            schema,
            sample_cap,
            call_timeout,
        }
    }

    /// Try each eligible predicate once. Never fails: every error is logged
    /// and counts as "no improvement".
    pub async fn resolve(
        &self,
        capability: &dyn LanguageCapability,
        intent: &FilterIntent,
        dataset: &Dataset,
    ) -> Option<Resolution> {
        for (index, predicate) in intent.predicates().iter().enumerate() {
            if dataset.column_kind(&predicate.target_column) != Some(ColumnKind::Text) {
                continue;
            }

            match self.attempt(capability, intent, index, predicate, dataset).await {
                Ok(Some(resolution)) => {
                    info!(
                        "Fallback substituted {} value {:?} -> {:?} ({} subject(s))",
                        predicate.target_column,
                        predicate.value,
                        resolution.outcome.substituted_value,
                        resolution.result.subject_count()
                    );
                    return Some(resolution);
                }
                Ok(None) => {}
                Err(e) => warn!("Fallback for {} failed: {}", predicate.target_column, e),
            }
        }

        debug!("No fallback substitution improved the result");
        None
    }

    async fn attempt(
        &self,
        capability: &dyn LanguageCapability,
        intent: &FilterIntent,
        index: usize,
        predicate: &FilterPredicate,
        dataset: &Dataset,
    ) -> Result<Option<Resolution>> {
        let prompt = self.prompt(predicate, dataset)?;
        let reply = translate_within(capability, &prompt, ALTERNATIVE_VALUE_INSTRUCTIONS, self.call_timeout).await?;

        let suggestion = match suggested_value(&reply) {
            Some(s) => s,
            None => {
                debug!("No usable suggestion for {}: {}", predicate.target_column, reply);
                return Ok(None);
            }
        };
        if suggestion.to_uppercase() == predicate.value.to_uppercase() {
            debug!("Suggestion for {} repeats the original value", predicate.target_column);
            return Ok(None);
        }

        let retry = intent.with_value_at(index, suggestion.clone());
        let result = filter_executor::execute(&retry, dataset)?;
        if result.is_empty() {
            debug!(
                "Suggestion {:?} for {} still matched nothing",
                suggestion, predicate.target_column
            );
            return Ok(None);
        }

        Ok(Some(Resolution {
            intent: retry,
            result,
            outcome: FallbackOutcome {
                column: predicate.target_column.clone(),
                predicate_index: index,
                original_value: predicate.value.clone(),
                substituted_value: suggestion,
            },
        }))
    }

    pub fn prompt(&self, predicate: &FilterPredicate, dataset: &Dataset) -> Result<String> {
        let column = &predicate.target_column;
        if !dataset.has_column(column) {
            return Err(QueryError::InvalidColumn(column.clone()));
        }
        let sample = dataset.sample_values(column, self.sample_cap)?;

        Ok(format!(
            r#"No rows matched for column "{column}" ({description}) with value "{original}".

Here are actual values that appear in this column (sample):
{sample}

Suggest ONE alternative filter value that is the closest match or spelling variant for "{original}". Pick from the list above if possible."#,
            column = column,
            description = self.schema.describe(column),
            original = predicate.value,
            sample = sample,
        ))
    }
}

/// Trimmed, non-empty `filter_value` from a capability reply
fn suggested_value(reply: &Value) -> Option<String> {
    let value = match reply.get("filter_value")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::FilterOperator;
    use polars::prelude::*;
    use serde_json::json;

    #[test]
    fn test_suggested_value_extraction() {
        assert_eq!(suggested_value(&json!({"filter_value": " PRURITUS "})), Some("PRURITUS".to_string()));
        assert_eq!(suggested_value(&json!({"filter_value": 3})), Some("3".to_string()));
        assert_eq!(suggested_value(&json!({"filter_value": "  "})), None);
        assert_eq!(suggested_value(&json!({"filter_value": null})), None);
        assert_eq!(suggested_value(&json!({"value": "X"})), None);
        assert_eq!(suggested_value(&json!(["X"])), None);
    }

    #[test]
    fn test_prompt_carries_context_and_sample() {
        let df = df! [
            "USUBJID" => ["S1", "S2", "S3"],
            "AESEV" => ["MILD", "SEVERE", "MILD"],
            "AETERM" => ["PRURITUS", "ERYTHEMA", "DIARRHOEA"]
        ]
        .unwrap();
        let dataset = Dataset::from_frame(df).unwrap();
        let resolver = FallbackResolver::new(SchemaRegistry::adae(), 2, None);
        let predicate = FilterPredicate::new("AETERM", FilterOperator::Contains, "Diarrhea");

        let prompt = resolver.prompt(&predicate, &dataset).unwrap();
        assert!(prompt.contains("\"AETERM\" (Reported Term for the Adverse Event)"));
        assert!(prompt.contains("with value \"Diarrhea\""));
        assert!(prompt.contains("PRURITUS\nERYTHEMA\n... and 1 more"));
        assert!(!prompt.contains("DIARRHOEA"));
    }
}
