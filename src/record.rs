use serde::{Deserialize, Serialize};
use std::io::BufRead;

use crate::error::AnalysisError;

/// Question type used by quiz exports for category markers rather than questions.
pub const CATEGORY_TYPE: &str = "category";

/// One quiz question as handed over by the loading layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QuestionRecord {
    /// Originating container, usually the file the question was read from.
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Display name. Never part of the compared text.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub feedbacks: Vec<String>,
    #[serde(default)]
    pub general_feedback: Option<String>,
}

impl QuestionRecord {
    pub fn is_category(&self) -> bool {
        self.kind == CATEGORY_TYPE
    }
}

pub fn parse_input_line(line: &str, line_number: usize) -> Result<QuestionRecord, AnalysisError> {
    serde_json::from_str(line).map_err(|e| AnalysisError::InvalidRecord {
        line: line_number,
        message: e.to_string(),
    })
}

/// Reads JSON-lines records, skipping blank lines and category markers.
pub fn read_records<R: BufRead>(reader: R) -> anyhow::Result<Vec<QuestionRecord>> {
    let mut records = Vec::new();
    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_input_line(&line, idx + 1)?;
        if record.is_category() {
            tracing::debug!(line = idx + 1, name = %record.name, "Skipping category record");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}
