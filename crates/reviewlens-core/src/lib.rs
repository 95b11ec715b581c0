pub mod decision;
pub mod heuristic;
pub mod review;
pub mod schema;
pub mod state;

pub use decision::{
    categorize_issue, decide_escalation, Decision, Escalation, EscalationLevel, IssueCategory,
    IssueClassification, VocabularyError,
};
pub use heuristic::estimate;
pub use review::{AnalysisResult, Provenance, ReviewBatch, SentimentDistribution, Urgency};
pub use schema::{validate, SchemaError, SchemaKind, ValidatedObject};
pub use state::{parse_timestamp, DecisionLogEntry, EscalationStatus, IssueCounts, SystemState};
