//! Schema registry - the catalogue of ADAE columns a filter may reference.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Official ADAE column descriptions, in catalogue order.
    pub static ref ADAE_SCHEMA: SchemaRegistry = SchemaRegistry::new(vec![
        ("STUDYID", "Study Identifier"),
        ("DOMAIN", "Domain Abbreviation"),
        ("USUBJID", "Unique Subject Identifier"),
        ("AESEQ", "Sequence Number"),
        ("AESPID", "Sponsor-Defined Identifier"),
        ("AETERM", "Reported Term for the Adverse Event"),
        ("AELLT", "Lowest Level Term"),
        ("AELLTCD", "Lowest Level Term Code"),
        ("AEDECOD", "Dictionary-Derived Term"),
        ("AEPTCD", "Preferred Term Code"),
        ("AEHLT", "High Level Term"),
        ("AEHLTCD", "High Level Term Code"),
        ("AEHLGT", "High Level Group Term"),
        ("AEHLGTCD", "High Level Group Term Code"),
        ("AEBODSYS", "Body System or Organ Class"),
        ("AEBDSYCD", "Body System or Organ Class Code"),
        ("AESOC", "Primary System Organ Class"),
        ("AESOCCD", "Primary System Organ Class Code"),
        ("AESEV", "Severity/Intensity"),
        ("AESER", "Serious Event"),
        ("AEACN", "Action Taken with Study Treatment"),
        ("AEREL", "Causality"),
        ("AEOUT", "Outcome of Adverse Event"),
        ("AESCAN", "Involves Cancer"),
        ("AESCONG", "Congenital Anomaly or Birth Defect"),
        ("AESDISAB", "Persist or Significant Disability/Incapacity"),
        ("AESDTH", "Results in Death"),
        ("AESHOSP", "Requires or Prolongs Hospitalization"),
        ("AESLIFE", "Is Life Threatening"),
        ("AESOD", "Occurred with Overdose"),
        ("AEDTC", "Date/Time of Collection"),
        ("AESTDTC", "Start Date/Time of Adverse Event"),
        ("AEENDTC", "End Date/Time of Adverse Event"),
        ("AESTDY", "Study Day of Start of Adverse Event"),
        ("AEENDY", "Study Day of End of Adverse Event"),
    ]);
}

/// Immutable mapping of allowed column names to human-readable descriptions
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    columns: Vec<String>,
    descriptions: HashMap<String, String>,
}

impl SchemaRegistry {
    /// Build a registry from `(column, description)` pairs. Column names are
    /// stored uppercase; a repeated column keeps its first position and the
    /// last description.
    pub fn new<N, D>(entries: Vec<(N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        let mut columns = Vec::with_capacity(entries.len());
        let mut descriptions = HashMap::with_capacity(entries.len());
        for (name, description) in entries {
            let name = name.into().trim().to_uppercase();
            if !descriptions.contains_key(&name) {
                columns.push(name.clone());
            }
            descriptions.insert(name, description.into());
        }
        Self { columns, descriptions }
    }

    /// The default ADAE catalogue
    pub fn adae() -> &'static SchemaRegistry {
        &ADAE_SCHEMA
    }

    /// Description of a column; unknown columns describe themselves.
    pub fn describe<'a>(&'a self, column: &'a str) -> &'a str {
        self.descriptions
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.descriptions.contains_key(column)
    }

    pub fn known_columns(&self) -> &[String] {
        &self.columns
    }

    /// One `NAME: description` line per column, used as prompt context.
    pub fn render_catalogue(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("- {}: {}", c, self.describe(c)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adae_catalogue() {
        let schema = SchemaRegistry::adae();
        assert_eq!(schema.known_columns().len(), 35);
        assert_eq!(schema.known_columns()[0], "STUDYID");
        assert_eq!(schema.known_columns()[34], "AEENDY");
        assert!(schema.is_known("AESEV"));
        assert!(!schema.is_known("NOTACOL"));
        assert_eq!(schema.describe("AESDTH"), "Results in Death");
    }

    #[test]
    fn test_unknown_column_describes_itself() {
        let schema = SchemaRegistry::adae();
        assert_eq!(schema.describe("ACTARM"), "ACTARM");
    }

    #[test]
    fn test_custom_registry_uppercases_and_dedups() {
        let schema = SchemaRegistry::new(vec![
            ("usubjid", "Subject"),
            ("aesev", "Severity"),
            ("USUBJID", "Unique Subject Identifier"),
        ]);
        assert_eq!(schema.known_columns(), &["USUBJID".to_string(), "AESEV".to_string()]);
        assert_eq!(schema.describe("USUBJID"), "Unique Subject Identifier");
        assert!(schema.render_catalogue().contains("- AESEV: Severity"));
    }
}
