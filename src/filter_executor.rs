//! Applies a [`FilterIntent`] to a [`Dataset`] with AND semantics.
//!
//! Every predicate is checked against the dataset before any row is
//! filtered, so a bad column, value or operator never yields partial results.

use crate::dataset::{ColumnKind, Dataset, SUBJECT_COLUMN};
use crate::error::{QueryError, Result};
use crate::intent::{FilterIntent, FilterOperator, FilterPredicate};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Records that survived every predicate, plus their distinct subjects
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub records: DataFrame,
    /// Sorted, unique `USUBJID` values of `records`
    pub subjects: Vec<String>,
}

impl QueryResult {
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.height()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Comparison {
    NumericEquals(f64),
    GreaterThan(f64),
    LessThan(f64),
    /// Uppercased operand
    TextEquals(String),
    /// Uppercased operand, matched as a literal substring
    TextContains(String),
}

#[derive(Debug, Clone)]
struct CompiledPredicate {
    column: String,
    comparison: Comparison,
}

impl CompiledPredicate {
    fn compile(predicate: &FilterPredicate, dataset: &Dataset) -> Result<Self> {
        let column = &predicate.target_column;
        let kind = dataset
            .column_kind(column)
            .ok_or_else(|| QueryError::InvalidColumn(column.clone()))?;

        let comparison = match kind {
            ColumnKind::Numeric => {
                let number = || {
                    predicate.value.trim().parse::<f64>().map_err(|_| {
                        QueryError::InvalidValue(format!(
                            "'{}' is not a number (column {} is numeric)",
                            predicate.value, column
                        ))
                    })
                };
                match predicate.operator {
                    FilterOperator::Equals => Comparison::NumericEquals(number()?),
                    FilterOperator::GreaterThan => Comparison::GreaterThan(number()?),
                    FilterOperator::LessThan => Comparison::LessThan(number()?),
                    FilterOperator::Contains => return Err(invalid_operator(predicate, kind)),
                }
            }
            ColumnKind::Text => {
                let operand = predicate.value.to_uppercase();
                match predicate.operator {
                    FilterOperator::Equals => Comparison::TextEquals(operand),
                    FilterOperator::Contains => Comparison::TextContains(operand),
                    FilterOperator::GreaterThan | FilterOperator::LessThan => {
                        return Err(invalid_operator(predicate, kind))
                    }
                }
            }
        };

        Ok(Self {
            column: column.clone(),
            comparison,
        })
    }

    /// Row mask over `frame`; null cells never match.
    fn mask(&self, frame: &DataFrame) -> Result<BooleanChunked> {
        let series = frame.column(&self.column)?;
        let mask = match &self.comparison {
            Comparison::NumericEquals(target) => numeric_mask(series, |v| v == *target)?,
            Comparison::GreaterThan(target) => numeric_mask(series, |v| v > *target)?,
            Comparison::LessThan(target) => numeric_mask(series, |v| v < *target)?,
            Comparison::TextEquals(target) => text_mask(series, |v| v.to_uppercase() == *target)?,
            Comparison::TextContains(target) => {
                text_mask(series, |v| v.to_uppercase().contains(target.as_str()))?
            }
        };
        Ok(mask)
    }
}

fn invalid_operator(predicate: &FilterPredicate, kind: ColumnKind) -> QueryError {
    QueryError::InvalidOperator(format!(
        "'{}' cannot be applied to {} column {}",
        predicate.operator, kind, predicate.target_column
    ))
}

fn numeric_mask<F>(series: &Series, keep: F) -> Result<BooleanChunked>
where
    F: Fn(f64) -> bool,
{
    let values = series.cast(&DataType::Float64)?;
    let mask = values
        .f64()?
        .into_iter()
        .map(|v| v.map_or(false, |v| keep(v)))
        .collect();
    Ok(mask)
}

fn text_mask<F>(series: &Series, keep: F) -> Result<BooleanChunked>
where
    F: Fn(&str) -> bool,
{
    let values = series.cast(&DataType::String)?;
    let mask = values
        .str()?
        .into_iter()
        .map(|v| v.map_or(false, |v| keep(v)))
        .collect();
    Ok(mask)
}

/// Sorted distinct non-null subject identifiers in `frame`
pub fn distinct_subjects(frame: &DataFrame) -> Result<Vec<String>> {
    let subjects = frame.column(SUBJECT_COLUMN)?.cast(&DataType::String)?;
    let unique: BTreeSet<String> = subjects
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect();
    Ok(unique.into_iter().collect())
}

/// Apply every predicate of `intent` to `dataset`, in order.
pub fn execute(intent: &FilterIntent, dataset: &Dataset) -> Result<QueryResult> {
    let plan = intent
        .predicates()
        .iter()
        .map(|p| CompiledPredicate::compile(p, dataset))
        .collect::<Result<Vec<_>>>()?;

    let mut records = dataset.frame().clone();
    for (predicate, step) in intent.predicates().iter().zip(&plan) {
        let mask = step.mask(&records)?;
        records = records.filter(&mask)?;
        debug!("{} -> {} row(s)", predicate, records.height());
    }

    let subjects = distinct_subjects(&records)?;
    Ok(QueryResult { records, subjects })
}
