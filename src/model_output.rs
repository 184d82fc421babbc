//! Tolerant parsing of generative model output.
//!
//! Models are asked for a single JSON object but routinely wrap it in prose
//! or markdown fences. Parsing runs in three stages: strict parse of the
//! whole text, then the span between the first `{` and the last `}`, then
//! give up. Giving up is never fatal for a lookup: the caller treats the
//! source as having contributed nothing.

use crate::models::PartialProfile;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutputError {
    /// The model returned no text at all.
    Empty,
    /// No `{ ... }` span exists in the text.
    NoJsonObject,
    /// A span was found but it is not valid JSON.
    Malformed(String),
}

impl fmt::Display for ModelOutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelOutputError::Empty => write!(f, "model output is empty"),
            ModelOutputError::NoJsonObject => write!(f, "model output contains no JSON object"),
            ModelOutputError::Malformed(e) => write!(f, "model output is malformed JSON: {}", e),
        }
    }
}

impl std::error::Error for ModelOutputError {}

/// Extracts the JSON object a model was asked to produce.
pub fn extract_json_object(text: &str) -> Result<Value, ModelOutputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ModelOutputError::Empty);
    }

    strict_object(trimmed).or_else(|_| brace_span_object(trimmed))
}

fn strict_object(text: &str) -> Result<Value, ModelOutputError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ModelOutputError::NoJsonObject),
        Err(e) => Err(ModelOutputError::Malformed(e.to_string())),
    }
}

fn brace_span_object(text: &str) -> Result<Value, ModelOutputError> {
    let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) else {
        return Err(ModelOutputError::NoJsonObject);
    };
    if last < first {
        return Err(ModelOutputError::NoJsonObject);
    }

    strict_object(&text[first..=last])
}

/// Parses model text into a contribution, or an empty one when the text
/// holds no usable object.
pub fn parse_partial_profile(source: &str, text: &str) -> PartialProfile {
    match extract_json_object(text) {
        Ok(value) => PartialProfile::from_value(&value),
        Err(e) => {
            tracing::warn!(source, error = %e, "Discarding unparseable model output");
            PartialProfile::default()
        }
    }
}
