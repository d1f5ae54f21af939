use crate::error::Result;
use crate::intent::FilterIntent;
use crate::llm::{translate_within, LanguageCapability};
use crate::schema::SchemaRegistry;
use std::time::Duration;
use tracing::{debug, info};

/// Turns a question into a [`FilterIntent`] via the language capability
pub struct IntentParser<'a> {
    schema: &'a SchemaRegistry,
    call_timeout: Option<Duration>,
}

impl<'a> IntentParser<'a> {
    pub fn new(schema: &'a SchemaRegistry, call_timeout: Option<Duration>) -> Self {
        Self { schema, call_timeout }
    }

    pub async fn parse(&self, capability: &dyn LanguageCapability, question: &str) -> Result<FilterIntent> {
        let instructions = self.instructions();
        let reply = translate_within(capability, question, &instructions, self.call_timeout).await?;
        debug!("Parser reply: {}", reply);

        let intent = FilterIntent::from_json(reply)?;
        info!("Parsed {} filter(s): {}", intent.len(), intent);
        Ok(intent)
    }

    pub fn instructions(&self) -> String {
        format!(
            r#"You are a clinical trial data assistant.

Your task:
Parse the user's question into structured JSON describing how to filter the ADAE dataset.
If the question has TWO OR MORE criteria (e.g. severity AND a specific AE term), return ONE filter per criterion.
All filters are combined with AND (a subject must match every filter).

Return ONLY valid JSON in this format:
{{
  "filters": [
    {{
      "target_column": "COLUMN_NAME",
      "filter_operator": "equals | contains | greater_than | less_than",
      "filter_value": "VALUE"
    }}
  ]
}}

Rules:
- For "who has severe events involving Pruritus?" use two filters: one for AESEV equals "SEVERE", one for AETERM or AEDECOD contains "Pruritus".
- target_column for each filter MUST be one of these columns:
{}
- Use the column descriptions to determine the correct column(s).
- Extract the correct filter value from the question for each criterion.
- For Yes/No flags, use "Y" or "N".
- For numeric fields (e.g. AESEQ, AESTDY, AEENDY), use numeric comparison operators.
- For text fields (e.g. AETERM, AEDECOD, AESEV), use "contains" unless an exact match is clearly requested.
- Use "equals" for severity (AESEV) when the question specifies a single severity (e.g. severe, mild).
- If the question has only ONE criterion, return "filters" with a single element.
- Do NOT explain anything. Only return JSON."#,
            self.schema.render_catalogue()
        )
    }
}
