//! Severity-weighted risk score per subject.

use crate::dataset::{Dataset, SEVERITY_COLUMN, SUBJECT_COLUMN};
use crate::error::{QueryError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=4 => RiskCategory::Low,
            5..=14 => RiskCategory::Medium,
            _ => RiskCategory::High,
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectRisk {
    pub subject_id: String,
    pub risk_score: u32,
    pub risk_category: RiskCategory,
}

/// MILD=1, MODERATE=3, SEVERE=5; anything else scores nothing.
pub fn severity_weight(severity: &str) -> u32 {
    match severity.trim().to_uppercase().as_str() {
        "MILD" => 1,
        "MODERATE" => 3,
        "SEVERE" => 5,
        _ => 0,
    }
}

/// Sum the severity weights of every adverse event recorded for `subject_id`.
pub fn subject_risk(dataset: &Dataset, subject_id: &str) -> Result<SubjectRisk> {
    let frame = dataset.frame();
    let subjects = frame.column(SUBJECT_COLUMN)?.cast(&DataType::String)?;
    let severities = frame.column(SEVERITY_COLUMN)?.cast(&DataType::String)?;

    let mut events = 0usize;
    let mut risk_score = 0u32;
    for (subject, severity) in subjects.str()?.into_iter().zip(severities.str()?.into_iter()) {
        if subject != Some(subject_id) {
            continue;
        }
        events += 1;
        risk_score += severity.map(severity_weight).unwrap_or(0);
    }

    if events == 0 {
        return Err(QueryError::SubjectNotFound(subject_id.to_string()));
    }

    Ok(SubjectRisk {
        subject_id: subject_id.to_string(),
        risk_score,
        risk_category: RiskCategory::from_score(risk_score),
    })
}
