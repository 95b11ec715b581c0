//! Phase-2 types: issue category and escalation, each drawn from a closed vocabulary.
//!
//! Construction goes through [`categorize_issue`] and [`decide_escalation`],
//! which reject anything outside the vocabulary even when the input has
//! already passed schema validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {value:?} is not one of {allowed}")]
pub struct VocabularyError {
    pub field: &'static str,
    pub value: String,
    pub allowed: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Delivery,
    Product,
    Support,
    Billing,
    App,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 6] = [
        IssueCategory::Delivery,
        IssueCategory::Product,
        IssueCategory::Support,
        IssueCategory::Billing,
        IssueCategory::App,
        IssueCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Product => "product",
            Self::Support => "support",
            Self::Billing => "billing",
            Self::App => "app",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| VocabularyError {
                field: "issue_category.category",
                value: s.to_string(),
                allowed: join(Self::ALL.iter().map(|c| c.as_str())),
            })
    }
}

/// Escalation vocabulary.
///
/// Declared in intended severity order, but the state store does not rank
/// levels: the latest non-`none` decision always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationLevel {
    #[default]
    None,
    Monitor,
    Review,
    Escalate,
}

impl EscalationLevel {
    pub const ALL: [EscalationLevel; 4] = [
        EscalationLevel::None,
        EscalationLevel::Monitor,
        EscalationLevel::Review,
        EscalationLevel::Escalate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Monitor => "monitor",
            Self::Review => "review",
            Self::Escalate => "escalate",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for EscalationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationLevel {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| VocabularyError {
                field: "escalation.level",
                value: s.to_string(),
                allowed: join(Self::ALL.iter().map(|l| l.as_str())),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueClassification {
    pub category: IssueCategory,
    /// In `[0, 1]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub level: EscalationLevel,
    pub reason: String,
}

/// Validated Phase-2 output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub issue_category: IssueClassification,
    pub escalation: Escalation,
}

/// Build an [`IssueClassification`], rejecting unknown categories and
/// confidences outside `[0, 1]`.
pub fn categorize_issue(category: &str, confidence: f64) -> Result<IssueClassification, VocabularyError> {
    let category = category.parse::<IssueCategory>()?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(VocabularyError {
            field: "issue_category.confidence",
            value: confidence.to_string(),
            allowed: "[0, 1]".to_string(),
        });
    }
    Ok(IssueClassification {
        category,
        confidence,
    })
}

/// Build an [`Escalation`], rejecting unknown levels.
pub fn decide_escalation(level: &str, reason: impl Into<String>) -> Result<Escalation, VocabularyError> {
    Ok(Escalation {
        level: level.parse()?,
        reason: reason.into(),
    })
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}
