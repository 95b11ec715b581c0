//! Phase 2: classify the issue, choose an escalation level, fold into state.

use std::sync::Arc;

use reviewlens_core::{
    categorize_issue, decide_escalation, validate, AnalysisResult, Decision, SchemaError,
    SchemaKind, SystemState, VocabularyError,
};
use reviewlens_store::{StateStore, StoreError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::decision_prompt;
use crate::{extract_json, GenerationError, ParseError, TextGenerator};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("decision response unparseable: {0}")]
    Parse(#[from] ParseError),
    #[error("decision response invalid: {0}")]
    Schema(#[from] SchemaError),
    #[error("decision rejected: {0}")]
    Vocabulary(#[from] VocabularyError),
    #[error("decision not persisted: {0}")]
    Store(#[from] StoreError),
}

/// A committed decision and the state exactly as it was persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub state: SystemState,
}

/// Issue categorisation and escalation over a shared [`StateStore`].
///
/// No retry and no fallback: any failure before the commit is returned to
/// the caller and leaves the state and log untouched.
pub struct DecisionEngine {
    gateway: Arc<dyn TextGenerator>,
    store: Arc<StateStore>,
}

impl DecisionEngine {
    pub fn new(gateway: Arc<dyn TextGenerator>, store: Arc<StateStore>) -> Self {
        Self { gateway, store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub async fn decide(&self, analysis: &AnalysisResult) -> Result<DecisionOutcome, DecisionError> {
        let payload = serde_json::to_string_pretty(&analysis.to_payload())
            .map_err(ParseError::Invalid)?;
        let prompt = decision_prompt(&payload);

        let decision = match self.classify(&prompt).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "decision rejected, state left unchanged");
                return Err(e);
            }
        };
        info!(
            category = %decision.issue_category.category,
            confidence = decision.issue_category.confidence,
            level = %decision.escalation.level,
            "decision validated"
        );

        let store = Arc::clone(&self.store);
        let to_record = decision.clone();
        let state = tokio::task::spawn_blocking(move || store.record(&to_record))
            .await
            .map_err(|e| StoreError::Other(format!("state writer task failed: {e}")))??;

        Ok(DecisionOutcome { decision, state })
    }

    async fn classify(&self, prompt: &str) -> Result<Decision, DecisionError> {
        let raw = self.gateway.generate(prompt).await?;
        let value = extract_json(&raw)?;
        let validated = validate(value, SchemaKind::Decision)?;
        build_decision(validated.into_value())
    }
}

#[derive(Deserialize)]
struct RawDecision {
    issue_category: RawCategory,
    escalation: RawEscalation,
}

#[derive(Deserialize)]
struct RawCategory {
    category: String,
    confidence: f64,
}

#[derive(Deserialize)]
struct RawEscalation {
    level: String,
    reason: String,
}

/// Construct the typed decision, rejecting out-of-vocabulary values again.
fn build_decision(value: Value) -> Result<Decision, DecisionError> {
    let raw: RawDecision = serde_json::from_value(value).map_err(ParseError::Invalid)?;
    Ok(Decision {
        issue_category: categorize_issue(&raw.issue_category.category, raw.issue_category.confidence)?,
        escalation: decide_escalation(&raw.escalation.level, raw.escalation.reason)?,
    })
}
