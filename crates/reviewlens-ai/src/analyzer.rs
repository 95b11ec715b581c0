//! Phase 1: turn raw review text into a schema-valid [`AnalysisResult`].

use std::sync::Arc;

use reviewlens_core::{
    estimate, validate, AnalysisResult, Provenance, ReviewBatch, SchemaError, SchemaKind,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::{analysis_prompt, retry_prompt};
use crate::{extract_json, GenerationError, ParseError, TextGenerator};

/// Extra LLM attempts after the first one fails.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

pub const MAX_RETRIES_ENV: &str = "REVIEWLENS_MAX_RETRIES";

/// Why a single LLM attempt produced nothing usable.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Review analyzer with retry and heuristic fallback.
///
/// [`analyze`](Self::analyze) never fails. Each failed attempt is retried
/// with the error appended to the prompt; once attempts run out the lexicon
/// heuristic fills in and the result is tagged [`Provenance::Heuristic`].
pub struct ReviewAnalyzer {
    gateway: Option<Arc<dyn TextGenerator>>,
    max_retries: u32,
}

impl ReviewAnalyzer {
    pub fn new(gateway: Arc<dyn TextGenerator>) -> Self {
        Self {
            gateway: Some(gateway),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// An analyzer with no LLM configured. Every result is heuristic.
    pub fn heuristic_only() -> Self {
        Self {
            gateway: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn analyze_batch(&self, batch: &ReviewBatch) -> AnalysisResult {
        self.analyze(&batch.as_prompt_text()).await
    }

    pub async fn analyze(&self, reviews_text: &str) -> AnalysisResult {
        if let Some(gateway) = &self.gateway {
            let base = analysis_prompt(reviews_text);
            let mut prompt = base.clone();
            let attempts = self.max_retries + 1;

            for attempt in 1..=attempts {
                match attempt_once(gateway.as_ref(), &prompt).await {
                    Ok(result) => {
                        info!(attempt, "analysis produced by LLM");
                        return result;
                    }
                    Err(e) => {
                        warn!(attempt, attempts, error = %e, "LLM analysis attempt failed");
                        prompt = retry_prompt(&base, &e.to_string());
                    }
                }
            }
            warn!(attempts, "LLM analysis exhausted, using heuristic fallback");
        } else {
            info!("no LLM configured, using heuristic analysis");
        }

        AnalysisResult::heuristic(estimate(reviews_text))
    }
}

async fn attempt_once(
    gateway: &dyn TextGenerator,
    prompt: &str,
) -> Result<AnalysisResult, AttemptError> {
    let raw = gateway.generate(prompt).await?;
    let value = extract_json(&raw)?;
    let validated = validate(value, SchemaKind::Analysis)?;
    Ok(validated.into_analysis(Provenance::Llm)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unavailable, ScriptedGenerator, VALID_ANALYSIS};
    use reviewlens_core::Urgency;

    fn analyzer(script: ScriptedGenerator) -> (Arc<ScriptedGenerator>, ReviewAnalyzer) {
        let script = Arc::new(script);
        let analyzer = ReviewAnalyzer::new(script.clone());
        (script, analyzer)
    }

    fn assert_contract(result: &AnalysisResult) {
        assert_eq!(result.sentiment_distribution.total(), 100);
        assert!(!result.top_pain_points.is_empty());
        assert!(!result.top_positive_drivers.is_empty());
        assert!(!result.key_themes.is_empty());
        assert!(!result.recommended_actions.is_empty());
    }

    #[tokio::test]
    async fn first_attempt_succeeds() {
        let (script, analyzer) = analyzer(ScriptedGenerator::new().reply(VALID_ANALYSIS));
        let result = analyzer.analyze("Late again.\nGood quality though.").await;

        assert_eq!(result.source, Provenance::Llm);
        assert_eq!(result.urgency, Urgency::High);
        assert_eq!(result.top_pain_points[0], "late delivery");
        assert_contract(&result);
        assert_eq!(script.calls(), 1);
        assert!(script.prompts()[0].contains("Late again.\nGood quality though."));
    }

    #[tokio::test]
    async fn fenced_response_accepted() {
        let fenced = format!("```json\n{VALID_ANALYSIS}\n```");
        let (_, analyzer) = analyzer(ScriptedGenerator::new().reply(fenced));
        assert_eq!(analyzer.analyze("ok").await.source, Provenance::Llm);
    }

    #[tokio::test]
    async fn fails_once_then_succeeds() {
        let (script, analyzer) = analyzer(
            ScriptedGenerator::new()
                .reply("Sorry, I can't produce JSON right now.")
                .reply(VALID_ANALYSIS),
        );
        let result = analyzer.analyze("Great product").await;

        assert_eq!(result.source, Provenance::Llm);
        assert_contract(&result);
        let prompts = script.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].starts_with(&prompts[0]));
        assert!(prompts[1].contains("no JSON object found"));
        assert!(prompts[1].contains("Return ONLY valid JSON. No explanation."));
    }

    #[tokio::test]
    async fn schema_violation_is_retried_with_the_violation() {
        let bad_sum = VALID_ANALYSIS.replace("\"neutral\": 10", "\"neutral\": 20");
        let (script, analyzer) =
            analyzer(ScriptedGenerator::new().reply(bad_sum).reply(VALID_ANALYSIS));
        let result = analyzer.analyze("text").await;

        assert_eq!(result.source, Provenance::Llm);
        assert!(script.prompts()[1].contains("sum to 110"));
    }

    #[tokio::test]
    async fn retry_prompt_is_rebuilt_not_accumulated() {
        let (script, analyzer) = analyzer(
            ScriptedGenerator::new()
                .reply("first failure")
                .reply("second failure")
                .reply(VALID_ANALYSIS),
        );
        let analyzer = analyzer.with_max_retries(2);
        assert_eq!(analyzer.analyze("x").await.source, Provenance::Llm);

        let prompts = script.prompts();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[2].matches("IMPORTANT:").count(), 1);
    }

    #[tokio::test]
    async fn fails_twice_falls_back_to_heuristic() {
        let (script, analyzer) = analyzer(
            ScriptedGenerator::new()
                .fail(unavailable())
                .reply("{\"urgency\": \"high\"}"),
        );
        let result = analyzer.analyze("bad bad bad good").await;

        assert_eq!(result.source, Provenance::Heuristic);
        assert_contract(&result);
        assert_eq!(result.sentiment_distribution.positive, 25);
        assert_eq!(result.sentiment_distribution.negative, 75);
        assert_eq!(result.urgency, Urgency::Medium);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn timeout_feeds_fallback() {
        let (_, analyzer) = analyzer(
            ScriptedGenerator::new()
                .fail(GenerationError::Timeout)
                .fail(GenerationError::Timeout),
        );
        let result = analyzer.analyze("").await;
        assert_eq!(result.source, Provenance::Heuristic);
        assert_eq!(result.sentiment_distribution.positive, 34);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let (script, analyzer) = analyzer(
            ScriptedGenerator::new()
                .reply("nope")
                .reply(VALID_ANALYSIS),
        );
        let analyzer = analyzer.with_max_retries(0);
        assert_eq!(analyzer.analyze("x").await.source, Provenance::Heuristic);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn heuristic_only_never_calls_out() {
        let analyzer = ReviewAnalyzer::heuristic_only();
        let result = analyzer.analyze("love it, amazing").await;
        assert_eq!(result.source, Provenance::Heuristic);
        assert_eq!(result.sentiment_distribution.positive, 100);
        assert_contract(&result);
    }

    #[tokio::test]
    async fn batch_is_joined_by_newlines() {
        let (script, analyzer) = analyzer(ScriptedGenerator::new().reply(VALID_ANALYSIS));
        let batch = ReviewBatch::from_lines(["first review", "  ", "second review"]);
        analyzer.analyze_batch(&batch).await;
        assert!(script.prompts()[0].contains("first review\nsecond review"));
    }

    #[test]
    fn default_retry_count() {
        assert_eq!(ReviewAnalyzer::heuristic_only().max_retries(), 1);
    }
}
