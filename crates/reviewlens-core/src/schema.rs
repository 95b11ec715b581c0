//! Output contracts for LLM responses.
//!
//! [`validate`] checks a decoded JSON object against the Phase-1 analysis
//! schema or the Phase-2 decision schema and stops at the first violation.
//! Nothing is repaired. A [`ValidatedObject`] can only be obtained from
//! [`validate`], so holding one means the object passed.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::decision::{EscalationLevel, IssueCategory};
use crate::review::{AnalysisResult, Provenance, SentimentDistribution, Urgency};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at {field}: {reason}")]
pub struct SchemaError {
    pub field: String,
    pub reason: String,
}

impl SchemaError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Analysis,
    Decision,
}

const SENTIMENT_FIELDS: [&str; 3] = ["positive", "negative", "neutral"];

const LIST_FIELDS: [&str; 4] = [
    "top_pain_points",
    "top_positive_drivers",
    "key_themes",
    "recommended_actions",
];

/// A JSON object that passed [`validate`] for its [`SchemaKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedObject {
    kind: SchemaKind,
    value: Value,
}

impl ValidatedObject {
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Convert a validated analysis object into a tagged [`AnalysisResult`].
    pub fn into_analysis(self, source: Provenance) -> Result<AnalysisResult, SchemaError> {
        if self.kind != SchemaKind::Analysis {
            return Err(SchemaError::new("$", "object was validated as a decision"));
        }
        let obj = as_object(&self.value, "$")?;
        let sentiment = as_object(field(obj, "sentiment_distribution")?, "sentiment_distribution")?;
        let pct = |name: &str| percentage(sentiment, name);
        let urgency_raw = as_str(field(obj, "urgency")?, "urgency")?;
        Ok(AnalysisResult {
            sentiment_distribution: SentimentDistribution {
                positive: pct("positive")?,
                negative: pct("negative")?,
                neutral: pct("neutral")?,
            },
            top_pain_points: string_list(obj, "top_pain_points")?,
            top_positive_drivers: string_list(obj, "top_positive_drivers")?,
            key_themes: string_list(obj, "key_themes")?,
            urgency: Urgency::parse(urgency_raw)
                .ok_or_else(|| SchemaError::new("urgency", "not one of low, medium, high"))?,
            recommended_actions: string_list(obj, "recommended_actions")?,
            source,
        })
    }
}

/// Check `value` against the schema for `kind`.
pub fn validate(value: Value, kind: SchemaKind) -> Result<ValidatedObject, SchemaError> {
    match kind {
        SchemaKind::Analysis => validate_analysis(&value)?,
        SchemaKind::Decision => validate_decision(&value)?,
    }
    Ok(ValidatedObject { kind, value })
}

fn validate_analysis(value: &Value) -> Result<(), SchemaError> {
    let obj = as_object(value, "$")?;

    let sentiment = as_object(field(obj, "sentiment_distribution")?, "sentiment_distribution")?;
    let mut sum = 0u64;
    for name in SENTIMENT_FIELDS {
        sum += u64::from(percentage(sentiment, name)?);
    }
    if sum != 100 {
        return Err(SchemaError::new(
            "sentiment_distribution",
            format!("percentages sum to {sum}, expected 100"),
        ));
    }

    for name in LIST_FIELDS {
        string_list(obj, name)?;
    }

    let urgency = as_str(field(obj, "urgency")?, "urgency")?;
    if Urgency::parse(urgency).is_none() {
        return Err(SchemaError::new(
            "urgency",
            format!("{urgency:?} is not one of low, medium, high"),
        ));
    }
    Ok(())
}

fn validate_decision(value: &Value) -> Result<(), SchemaError> {
    let obj = as_object(value, "$")?;

    let issue = as_object(field(obj, "issue_category")?, "issue_category")?;
    let category = as_str(
        field_at(issue, "category", "issue_category.category")?,
        "issue_category.category",
    )?;
    if !IssueCategory::ALL.iter().any(|c| c.as_str() == category) {
        return Err(SchemaError::new(
            "issue_category.category",
            format!("{category:?} is not in the category vocabulary"),
        ));
    }
    let confidence = field_at(issue, "confidence", "issue_category.confidence")?
        .as_f64()
        .ok_or_else(|| SchemaError::new("issue_category.confidence", "expected a number"))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(SchemaError::new(
            "issue_category.confidence",
            format!("{confidence} is outside [0, 1]"),
        ));
    }

    let escalation = as_object(field(obj, "escalation")?, "escalation")?;
    let level = as_str(
        field_at(escalation, "level", "escalation.level")?,
        "escalation.level",
    )?;
    if !EscalationLevel::ALL.iter().any(|l| l.as_str() == level) {
        return Err(SchemaError::new(
            "escalation.level",
            format!("{level:?} is not in the escalation vocabulary"),
        ));
    }
    as_str(
        field_at(escalation, "reason", "escalation.reason")?,
        "escalation.reason",
    )?;
    Ok(())
}

// ── Helpers ──

fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Value, SchemaError> {
    field_at(obj, name, name)
}

fn field_at<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
    path: &str,
) -> Result<&'a Value, SchemaError> {
    obj.get(name)
        .ok_or_else(|| SchemaError::new(path, "missing required key"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path, format!("expected an object, got {}", kind_of(value))))
}

fn as_str<'a>(value: &'a Value, path: &str) -> Result<&'a str, SchemaError> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::new(path, format!("expected a string, got {}", kind_of(value))))
}

/// A whole, non-negative percentage. `60` and `60.0` are both accepted.
fn percentage(sentiment: &Map<String, Value>, name: &str) -> Result<u32, SchemaError> {
    let path = format!("sentiment_distribution.{name}");
    let value = field_at(sentiment, name, &path)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n)
            .map_err(|_| SchemaError::new(path, format!("{n} is out of range")));
    }
    let Some(f) = value.as_f64() else {
        return Err(SchemaError::new(
            path,
            format!("expected a number, got {}", kind_of(value)),
        ));
    };
    if f < 0.0 || f.fract() != 0.0 || f > f64::from(u32::MAX) {
        return Err(SchemaError::new(
            path,
            format!("{f} is not a whole non-negative percentage"),
        ));
    }
    Ok(f as u32)
}

fn string_list(obj: &Map<String, Value>, name: &str) -> Result<Vec<String>, SchemaError> {
    let items = field(obj, name)?
        .as_array()
        .ok_or_else(|| SchemaError::new(name, "expected an array"))?;
    if items.is_empty() {
        return Err(SchemaError::new(name, "must contain at least one item"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| SchemaError::new(format!("{name}[{i}]"), "expected a string"))
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
