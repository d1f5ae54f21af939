//! Plain-text rendering of answers for the terminal.

use crate::error::Result;
use crate::pipeline::QueryAnswer;
use crate::risk::SubjectRisk;
use polars::prelude::*;
use std::fmt;

/// Columns shown in the record table, when present
pub const TABLE_COLUMNS: [&str; 7] = ["USUBJID", "AETERM", "AELLT", "AESEV", "AESTDY", "AESEQ", "AEDECOD"];

pub const MAX_TABLE_ROWS: usize = 50;

/// Cap on subjects listed per question by the demo run
pub const DEMO_SUBJECT_LIMIT: usize = 15;

fn rule(c: char) -> String {
    c.to_string().repeat(60)
}

/// Key columns of the matched records with duplicate rows removed
pub fn record_table(records: &DataFrame) -> Result<DataFrame> {
    let present: Vec<Expr> = TABLE_COLUMNS
        .iter()
        .filter(|c| records.column(c).is_ok())
        .map(|c| col(c))
        .collect();
    let table = records
        .clone()
        .lazy()
        .select(present)
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    Ok(table)
}

/// Full report: header, substitution note, record table, sorted subjects
pub struct AnswerReport<'a> {
    answer: &'a QueryAnswer,
    /// De-duplicated record table; `None` when nothing matched
    table: Option<DataFrame>,
}

impl<'a> AnswerReport<'a> {
    pub fn new(answer: &'a QueryAnswer) -> Result<Self> {
        let table = if answer.record_count == 0 {
            None
        } else {
            Some(record_table(&answer.records)?)
        };
        Ok(Self { answer, table })
    }
}

impl fmt::Display for AnswerReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answer = self.answer;
        writeln!(f, "{}", rule('='))?;
        writeln!(f, "  {}", answer.question)?;
        if let Some(ref fallback) = answer.fallback {
            writeln!(
                f,
                "  (No exact {} match; used closest value from data: \"{}\")",
                fallback.column, fallback.substituted_value
            )?;
        }
        writeln!(f, "{}", rule('='))?;

        match self.table {
            None => writeln!(f, "  (No matching records)")?,
            Some(ref table) => {
                writeln!(f, "{}", table.head(Some(MAX_TABLE_ROWS)))?;
                if table.height() > MAX_TABLE_ROWS {
                    writeln!(f, "  ... and {} more rows", table.height() - MAX_TABLE_ROWS)?;
                }
            }
        }
        writeln!(f, "{}", rule('='))?;

        if !answer.subjects.is_empty() {
            writeln!(f, "\n  Unique subjects (sorted): {}", answer.subject_count)?;
            writeln!(f, "{}", rule('-'))?;
            for subject in &answer.subjects {
                writeln!(f, "  {}", subject)?;
            }
            writeln!(f, "{}", rule('-'))?;
        }
        Ok(())
    }
}

pub fn render_answer(answer: &QueryAnswer) -> Result<String> {
    Ok(AnswerReport::new(answer)?.to_string())
}

/// Compact per-question summary used by the demo run
pub struct AnswerSummary<'a>(pub &'a QueryAnswer);

impl fmt::Display for AnswerSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let answer = self.0;
        writeln!(
            f,
            "  Parsed filters: {} criterion/criteria",
            answer.resolved_intent.len()
        )?;
        for (i, predicate) in answer.resolved_intent.predicates().iter().enumerate() {
            writeln!(f, "    {}. {}", i + 1, predicate)?;
        }
        if let Some(ref fallback) = answer.fallback {
            writeln!(
                f,
                "  (Used alternative value from data: {:?})",
                fallback.substituted_value
            )?;
        }
        writeln!(f, "  Unique subjects: {}", answer.subject_count)?;
        if !answer.subjects.is_empty() {
            let mut shown: Vec<String> = answer
                .subjects
                .iter()
                .take(DEMO_SUBJECT_LIMIT)
                .cloned()
                .collect();
            if answer.subjects.len() > DEMO_SUBJECT_LIMIT {
                shown.push(format!("... and {} more", answer.subjects.len() - DEMO_SUBJECT_LIMIT));
            }
            writeln!(f, "  Subjects: {}", shown.join(", "))?;
        }
        Ok(())
    }
}

pub fn render_summary(answer: &QueryAnswer) -> String {
    AnswerSummary(answer).to_string()
}

pub fn render_risk(risk: &SubjectRisk) -> String {
    format!(
        "Subject {}: risk score {} ({})",
        risk.subject_id, risk.risk_score, risk.risk_category
    )
}
