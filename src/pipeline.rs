//! Question → filters → records, with one best-effort correction pass.

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{QueryError, Result};
use crate::fallback_resolver::{FallbackOutcome, FallbackResolver};
use crate::filter_executor::{self, QueryResult};
use crate::intent::FilterIntent;
use crate::intent_parser::IntentParser;
use crate::llm::LanguageCapability;
use crate::schema::SchemaRegistry;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Parsed,
    Executed,
    Resolving,
    ReExecuted,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::Parsed => "PARSED",
            Stage::Executed => "EXECUTED",
            Stage::Resolving => "RESOLVING",
            Stage::ReExecuted => "RE-EXECUTED",
            Stage::Done => "DONE",
        };
        write!(f, "{}", name)
    }
}

/// Answer to one question, with provenance of the filters actually used
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub question: String,
    pub resolved_intent: FilterIntent,
    pub subjects: Vec<String>,
    pub subject_count: usize,
    pub record_count: usize,
    pub fallback: Option<FallbackOutcome>,
    #[serde(skip_serializing)]
    pub records: DataFrame,
}

impl QueryAnswer {
    fn new(question: &str, intent: FilterIntent, result: QueryResult, fallback: Option<FallbackOutcome>) -> Self {
        Self {
            question: question.to_string(),
            resolved_intent: intent,
            subject_count: result.subject_count(),
            record_count: result.record_count(),
            subjects: result.subjects,
            fallback,
            records: result.records,
        }
    }
}

pub struct QueryPipeline {
    capability: Arc<dyn LanguageCapability>,
    schema: SchemaRegistry,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(capability: Arc<dyn LanguageCapability>, schema: SchemaRegistry, config: PipelineConfig) -> Self {
        Self {
            capability,
            schema,
            config,
        }
    }

    /// Parse, execute and, on zero subjects, try one fallback substitution.
    ///
    /// Parse and initial execution errors are returned as-is; the fallback
    /// pass cannot fail the query.
    pub async fn answer(&self, question: &str, dataset: &Dataset) -> Result<QueryAnswer> {
        let mut stage = Stage::Start;
        info!("Question: {}", question);

        let parser = IntentParser::new(&self.schema, self.config.call_timeout);
        let intent = parser.parse(self.capability.as_ref(), question).await?;
        self.check_known_columns(&intent)?;
        advance(&mut stage, Stage::Parsed);

        let result = filter_executor::execute(&intent, dataset)?;
        advance(&mut stage, Stage::Executed);
        info!(
            "{} record(s), {} subject(s) for {}",
            result.record_count(),
            result.subject_count(),
            intent
        );

        if !result.is_empty() {
            advance(&mut stage, Stage::Done);
            return Ok(QueryAnswer::new(question, intent, result, None));
        }

        advance(&mut stage, Stage::Resolving);
        let resolver = FallbackResolver::new(&self.schema, self.config.sample_cap, self.config.call_timeout);
        let answer = match resolver.resolve(self.capability.as_ref(), &intent, dataset).await {
            Some(resolution) => {
                advance(&mut stage, Stage::ReExecuted);
                QueryAnswer::new(question, resolution.intent, resolution.result, Some(resolution.outcome))
            }
            None => QueryAnswer::new(question, intent, result, None),
        };
        advance(&mut stage, Stage::Done);
        Ok(answer)
    }

    fn check_known_columns(&self, intent: &FilterIntent) -> Result<()> {
        match intent
            .predicates()
            .iter()
            .find(|p| !self.schema.is_known(&p.target_column))
        {
            Some(p) => Err(QueryError::InvalidColumn(p.target_column.clone())),
            None => Ok(()),
        }
    }
}

fn advance(stage: &mut Stage, to: Stage) {
    debug!("{} -> {}", stage, to);
    *stage = to;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_moves_stage() {
        let mut stage = Stage::Start;
        advance(&mut stage, Stage::Executed);
        assert_eq!(stage, Stage::Executed);
        advance(&mut stage, Stage::ReExecuted);
        assert_eq!(stage, Stage::ReExecuted);
        assert_eq!(stage.to_string(), "RE-EXECUTED");
    }
}
