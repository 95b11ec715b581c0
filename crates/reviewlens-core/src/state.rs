//! Aggregate decision state and the audit log entry appended per decision.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::decision::{Decision, Escalation, EscalationLevel, IssueCategory, IssueClassification};

/// Per-category issue counters. Every category is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueCounts {
    pub billing: u64,
    pub delivery: u64,
    pub product: u64,
    pub support: u64,
    pub app: u64,
    pub other: u64,
}

impl IssueCounts {
    pub fn get(&self, category: IssueCategory) -> u64 {
        match category {
            IssueCategory::Billing => self.billing,
            IssueCategory::Delivery => self.delivery,
            IssueCategory::Product => self.product,
            IssueCategory::Support => self.support,
            IssueCategory::App => self.app,
            IssueCategory::Other => self.other,
        }
    }

    pub fn increment(&mut self, category: IssueCategory) {
        let slot = match category {
            IssueCategory::Billing => &mut self.billing,
            IssueCategory::Delivery => &mut self.delivery,
            IssueCategory::Product => &mut self.product,
            IssueCategory::Support => &mut self.support,
            IssueCategory::App => &mut self.app,
            IssueCategory::Other => &mut self.other,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        IssueCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStatus {
    pub has_been_escalated: bool,
    pub level: EscalationLevel,
}

/// Process-wide aggregate of every committed decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    #[serde(default)]
    pub issue_counts: IssueCounts,
    #[serde(default)]
    pub escalation: EscalationStatus,
    /// Stamped when the state is saved; `None` until the first save.
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SystemState {
    /// Fold a decision into the aggregate.
    ///
    /// Any non-`none` level marks the state escalated and overwrites the
    /// current level, last write wins. A `none` decision leaves escalation as is.
    pub fn apply(&mut self, decision: &Decision) {
        self.issue_counts
            .increment(decision.issue_category.category);
        let level = decision.escalation.level;
        if !level.is_none() {
            self.escalation.has_been_escalated = true;
            self.escalation.level = level;
        }
    }

    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }
}

/// Immutable audit record of one Phase-2 decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub issue_category: IssueClassification,
    pub escalation: Escalation,
}

impl DecisionLogEntry {
    pub fn new(decision: &Decision, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            issue_category: decision.issue_category.clone(),
            escalation: decision.escalation.clone(),
        }
    }
}

/// Parse an RFC 3339 timestamp. A value with no offset
/// (`2025-01-01T12:00:00.123456`, as older state files carry) is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(e) => raw
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
