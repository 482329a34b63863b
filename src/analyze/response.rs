//! Model response handling: fence stripping, parsing and validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const FIELD_CATEGORY: &str = "MIA_Rubro";
pub const FIELD_SCORE: &str = "MIA_Score_IA";
pub const FIELD_SUMMARY: &str = "MIA_Resumen_Tecnico";
pub const FIELD_LINK: &str = "MIA_Link_al_Pliego";
pub const FIELD_ASSIGNEE: &str = "MIA_Empresa_Asignada";
pub const FIELD_QUESTIONS: &str = "MIA_Preguntas_Tecnicas";

/// Clarifying questions arrive either as one block of text or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Questions {
    Text(String),
    List(Vec<String>),
}

/// Validated classification of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(rename = "MIA_Rubro")]
    pub category: String,
    /// Expected 0–100; values outside are kept (and logged).
    #[serde(rename = "MIA_Score_IA")]
    pub score: f64,
    #[serde(rename = "MIA_Resumen_Tecnico")]
    pub summary: String,
    #[serde(rename = "MIA_Link_al_Pliego", default, skip_serializing_if = "Option::is_none")]
    pub document_link: Option<String>,
    #[serde(rename = "MIA_Empresa_Asignada", default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(rename = "MIA_Preguntas_Tecnicas", default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Questions>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ResponseError {
    #[error("response is not valid JSON: {0}")]
    Malformed(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("required field missing or empty: {0}")]
    MissingField(&'static str),

    #[error("MIA_Score_IA must be numeric, got {0}")]
    NonNumericScore(String),
}

impl ResponseError {
    /// Parse failures are distinct from validation failures for metrics and logs.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, ResponseError::Malformed(_))
    }
}

/// Remove markdown code-fence artifacts (```json / ```) and surrounding whitespace.
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Fence-strip, parse and validate a raw model reply.
pub fn parse_analysis(raw: &str) -> Result<Analysis, ResponseError> {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return Err(ResponseError::Malformed("empty response".to_string()));
    }
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ResponseError::Malformed(e.to_string()))?;
    validate(&value)
}

/// Check required fields and build the typed analysis.
pub fn validate(value: &Value) -> Result<Analysis, ResponseError> {
    let obj = value.as_object().ok_or(ResponseError::NotAnObject)?;

    let category = required_text(obj, FIELD_CATEGORY)?;
    let score = match obj.get(FIELD_SCORE) {
        None | Some(Value::Null) => return Err(ResponseError::MissingField(FIELD_SCORE)),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ResponseError::NonNumericScore(n.to_string()))?,
        Some(other) => return Err(ResponseError::NonNumericScore(type_name(other).to_string())),
    };
    let summary = required_text(obj, FIELD_SUMMARY)?;

    if !(0.0..=100.0).contains(&score) {
        warn!(score, "MIA_Score_IA out of range (0-100), keeping it");
    }

    for field in [FIELD_LINK, FIELD_ASSIGNEE, FIELD_QUESTIONS] {
        if !obj.contains_key(field) {
            debug!(field, "optional field missing");
        }
    }

    Ok(Analysis {
        category,
        score,
        summary,
        document_link: optional_text(obj, FIELD_LINK),
        assignee: optional_text(obj, FIELD_ASSIGNEE),
        questions: questions(obj.get(FIELD_QUESTIONS)),
    })
}

fn required_text(obj: &Map<String, Value>, field: &'static str) -> Result<String, ResponseError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ResponseError::MissingField(field)),
    }
}

fn optional_text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn questions(value: Option<&Value>) -> Option<Questions> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(Questions::Text(s.trim().to_string())),
        Value::Array(items) => {
            let list: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            (!list.is_empty()).then_some(Questions::List(list))
        }
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
