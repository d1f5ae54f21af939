//! Filter predicates and the normalization of capability output into a
//! [`FilterIntent`].

use crate::error::{QueryError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::GreaterThan => "greater_than",
            FilterOperator::LessThan => "less_than",
        };
        write!(f, "{}", name)
    }
}

/// A single column/operator/value condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub target_column: String,
    #[serde(rename = "filter_operator")]
    pub operator: FilterOperator,
    #[serde(rename = "filter_value", deserialize_with = "literal_as_string")]
    pub value: String,
}

impl FilterPredicate {
    pub fn new(target_column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.target_column, self.operator, self.value)
    }
}

/// Numbers keep their decimal text; booleans become the "Y"/"N" flag literals.
fn literal_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("Y".to_string()),
        Value::Bool(false) => Ok("N".to_string()),
        other => Err(serde::de::Error::custom(format!(
            "filter_value must be a string, number or boolean, got {}",
            other
        ))),
    }
}

/// Ordered, non-empty, AND-combined list of predicates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterIntent {
    filters: Vec<FilterPredicate>,
}

impl FilterIntent {
    pub fn new(filters: Vec<FilterPredicate>) -> Result<Self> {
        if filters.is_empty() {
            return Err(QueryError::MalformedIntent(
                "At least one filter is required".to_string(),
            ));
        }
        Ok(Self { filters })
    }

    /// Normalize capability output into the list form.
    ///
    /// Accepts `{"filters": [...]}`, a bare array of predicates, or the
    /// legacy single predicate object `{"target_column", "filter_operator",
    /// "filter_value"}`. Column names are trimmed and uppercased.
    pub fn from_json(value: Value) -> Result<Self> {
        let items = match value {
            Value::Object(mut map) => match map.remove("filters") {
                Some(Value::Array(items)) => items,
                Some(_) | None if map.contains_key("target_column") => vec![Value::Object(map)],
                Some(other) => {
                    return Err(QueryError::MalformedIntent(format!(
                        "'filters' must be a list, got {}",
                        other
                    )))
                }
                None => {
                    return Err(QueryError::MalformedIntent(
                        "Expected a 'filters' list or a single target_column/filter_operator/filter_value object"
                            .to_string(),
                    ))
                }
            },
            Value::Array(items) => items,
            other => {
                return Err(QueryError::MalformedIntent(format!(
                    "Expected a JSON object, got {}",
                    other
                )))
            }
        };

        let filters = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                let mut predicate: FilterPredicate = serde_json::from_value(item).map_err(|e| {
                    QueryError::MalformedIntent(format!("Filter {} is malformed: {}", idx + 1, e))
                })?;
                predicate.target_column = predicate.target_column.trim().to_uppercase();
                Ok(predicate)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(filters)
    }

    pub fn predicates(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Copy of this intent with only the value at `index` replaced
    pub fn with_value_at(&self, index: usize, value: impl Into<String>) -> Self {
        let mut filters = self.filters.clone();
        if let Some(predicate) = filters.get_mut(index) {
            predicate.value = value.into();
        }
        Self { filters }
    }
}

impl fmt::Display for FilterIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.filters.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}
