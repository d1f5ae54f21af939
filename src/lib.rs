pub mod config;
pub mod dataset;
pub mod error;
pub mod fallback_resolver;
pub mod filter_executor;
pub mod intent;
pub mod intent_parser;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod schema;

pub use dataset::Dataset;
pub use error::{QueryError, Result};
pub use intent::{FilterIntent, FilterOperator, FilterPredicate};
pub use llm::{LanguageCapability, LlmClient};
pub use pipeline::{QueryAnswer, QueryPipeline};
pub use schema::SchemaRegistry;
