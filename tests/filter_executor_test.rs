mod common;

use clinical_query_agent::error::QueryError;
use clinical_query_agent::filter_executor::execute;
use clinical_query_agent::{Dataset, FilterIntent, FilterOperator, FilterPredicate};
use polars::prelude::*;
use std::collections::BTreeSet;

fn intent(predicates: Vec<FilterPredicate>) -> FilterIntent {
    FilterIntent::new(predicates).unwrap()
}

fn two_rows() -> Dataset {
    let df = df! [
        "USUBJID" => ["S1", "S2"],
        "AESEV" => ["MILD", "SEVERE"]
    ]
    .unwrap();
    Dataset::from_frame(df).unwrap()
}

#[test]
fn test_single_equals_match() {
    let result = execute(
        &intent(vec![FilterPredicate::new("AESEV", FilterOperator::Equals, "SEVERE")]),
        &two_rows(),
    )
    .unwrap();
    assert_eq!(result.subjects, vec!["S2"]);
    assert_eq!(result.subject_count(), 1);
}

#[test]
fn test_no_match_is_empty_result() {
    let result = execute(
        &intent(vec![FilterPredicate::new("AESEV", FilterOperator::Equals, "MODERATE")]),
        &two_rows(),
    )
    .unwrap();
    assert!(result.subjects.is_empty());
    assert_eq!(result.subject_count(), 0);
}

#[test]
fn test_two_predicates_select_the_row_matching_both() {
    let df = df! [
        "USUBJID" => ["S1", "S2", "S3"],
        "AESEV" => ["SEVERE", "MILD", "SEVERE"],
        "AETERM" => ["PRURITUS", "PRURITUS", "ERYTHEMA"]
    ]
    .unwrap();
    let dataset = Dataset::from_frame(df).unwrap();
    let result = execute(
        &intent(vec![
            FilterPredicate::new("AESEV", FilterOperator::Equals, "SEVERE"),
            FilterPredicate::new("AETERM", FilterOperator::Contains, "Pruritus"),
        ]),
        &dataset,
    )
    .unwrap();
    assert_eq!(result.subjects, vec!["S1"]);
    assert_eq!(result.record_count(), 1);
}

#[test]
fn test_numeric_greater_than() {
    let df = df! [
        "USUBJID" => ["S1", "S2", "S3"],
        "AESEV" => ["MILD", "MILD", "MILD"],
        "AESTDY" => [5i64, 15, 20]
    ]
    .unwrap();
    let dataset = Dataset::from_frame(df).unwrap();
    let result = execute(
        &intent(vec![FilterPredicate::new("AESTDY", FilterOperator::GreaterThan, "10")]),
        &dataset,
    )
    .unwrap();
    assert_eq!(result.record_count(), 2);
    assert_eq!(result.subjects, vec!["S2", "S3"]);
}

#[test]
fn test_unknown_column_fails_before_filtering() {
    let err = execute(
        &intent(vec![
            FilterPredicate::new("AESEV", FilterOperator::Equals, "SEVERE"),
            FilterPredicate::new("NOTACOL", FilterOperator::Equals, "X"),
        ]),
        &two_rows(),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::InvalidColumn(ref c) if c == "NOTACOL"));
}

#[test]
fn test_and_semantics_is_intersection() {
    let dataset = common::adae();
    let predicates = vec![
        FilterPredicate::new("AESEV", FilterOperator::Equals, "SEVERE"),
        FilterPredicate::new("AETERM", FilterOperator::Contains, "E"),
        FilterPredicate::new("AESTDY", FilterOperator::GreaterThan, "5"),
    ];

    let combined: BTreeSet<String> = execute(&intent(predicates.clone()), &dataset)
        .unwrap()
        .subjects
        .into_iter()
        .collect();

    // Row-level intersection, expressed through a per-row key so that two
    // predicates matching different rows of one subject do not count.
    let row_keys = |p: &FilterPredicate| -> BTreeSet<(String, String)> {
        let result = execute(&intent(vec![p.clone()]), &dataset).unwrap();
        let ids = result.records.column("USUBJID").unwrap().str().unwrap();
        let terms = result.records.column("AETERM").unwrap().str().unwrap();
        let keys = ids
            .into_iter()
            .zip(terms.into_iter())
            .map(|(i, t)| (i.unwrap().to_string(), t.unwrap().to_string()))
            .collect();
        keys
    };
    let mut rows = row_keys(&predicates[0]);
    for p in &predicates[1..] {
        let other = row_keys(p);
        rows = rows.intersection(&other).cloned().collect();
    }
    let expected: BTreeSet<String> = rows.into_iter().map(|(id, _)| id).collect();

    assert_eq!(combined, expected);
    assert_eq!(
        combined.into_iter().collect::<Vec<_>>(),
        vec!["01-701-1015", "01-701-1047"]
    );
}

#[test]
fn test_idempotent() {
    let dataset = common::adae();
    let query = intent(vec![FilterPredicate::new("AETERM", FilterOperator::Contains, "pruritus")]);
    let first = execute(&query, &dataset).unwrap();
    let second = execute(&query, &dataset).unwrap();
    assert_eq!(first.subjects, second.subjects);
    assert!(first.records.equals(&second.records));
}

#[test]
fn test_case_insensitive_text() {
    let dataset = common::adae();
    let lower = execute(
        &intent(vec![FilterPredicate::new("AESEV", FilterOperator::Equals, "severe")]),
        &dataset,
    )
    .unwrap();
    let upper = execute(
        &intent(vec![FilterPredicate::new("AESEV", FilterOperator::Equals, "SEVERE")]),
        &dataset,
    )
    .unwrap();
    assert_eq!(lower.subjects, upper.subjects);
    assert_eq!(lower.subject_count(), 3);
}

#[test]
fn test_greater_than_on_text_is_rejected() {
    for value in ["5", "MILD"] {
        let err = execute(
            &intent(vec![FilterPredicate::new("AESEV", FilterOperator::GreaterThan, value)]),
            &common::adae(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator(_)));
    }
}

#[test]
fn test_pattern_characters_are_literal() {
    let df = df! [
        "USUBJID" => ["S1", "S2", "S3"],
        "AESEV" => ["MILD", "MILD", "MILD"],
        "AETERM" => ["A.B", "AXB", "A*B"]
    ]
    .unwrap();
    let dataset = Dataset::from_frame(df).unwrap();

    let dot = execute(&intent(vec![FilterPredicate::new("AETERM", FilterOperator::Contains, ".")]), &dataset).unwrap();
    assert_eq!(dot.subjects, vec!["S1"]);

    let star = execute(&intent(vec![FilterPredicate::new("AETERM", FilterOperator::Contains, "A*")]), &dataset).unwrap();
    assert_eq!(star.subjects, vec!["S3"]);
}
