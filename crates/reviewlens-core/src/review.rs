//! Phase-1 types: the raw review batch going in and the structured analysis coming out.

use serde::{Deserialize, Serialize};

/// An ordered batch of raw review lines.
///
/// Built per request from pasted text or a spreadsheet column and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewBatch {
    lines: Vec<String>,
}

impl ReviewBatch {
    /// Split newline-separated text into trimmed, non-blank review lines.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Build a batch from already-split rows, dropping blank ones.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rejoin the batch with `\n` for embedding in a prompt.
    pub fn as_prompt_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Percentage split of review sentiment. The three fields always sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

impl SentimentDistribution {
    pub fn total(&self) -> u32 {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Low, Urgency::Medium, Urgency::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

/// Where an [`AnalysisResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The LLM produced a schema-valid response.
    Llm,
    /// Every LLM attempt failed; the lexicon heuristic filled in.
    Heuristic,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Phase-1 output. Schema-valid whatever its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sentiment_distribution: SentimentDistribution,
    pub top_pain_points: Vec<String>,
    pub top_positive_drivers: Vec<String>,
    pub key_themes: Vec<String>,
    pub urgency: Urgency,
    pub recommended_actions: Vec<String>,
    pub source: Provenance,
}

impl AnalysisResult {
    /// Minimal schema-valid result around a heuristic sentiment split.
    pub fn heuristic(sentiment_distribution: SentimentDistribution) -> Self {
        Self {
            sentiment_distribution,
            top_pain_points: vec!["Insufficient data for detailed pain points".to_string()],
            top_positive_drivers: vec!["General customer feedback".to_string()],
            key_themes: vec!["Mixed feedback".to_string()],
            urgency: Urgency::Medium,
            recommended_actions: vec!["Collect more customer feedback".to_string()],
            source: Provenance::Heuristic,
        }
    }

    /// The analysis body as sent to Phase-2, without the provenance tag.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "sentiment_distribution": self.sentiment_distribution,
            "top_pain_points": self.top_pain_points,
            "top_positive_drivers": self.top_positive_drivers,
            "key_themes": self.key_themes,
            "urgency": self.urgency,
            "recommended_actions": self.recommended_actions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_drops_blank_lines_and_trims() {
        let batch = ReviewBatch::from_text("  Great product!  \n\n   \nShipping was slow.\r\n");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.lines()[0], "Great product!");
        assert_eq!(batch.lines()[1], "Shipping was slow.");
        assert_eq!(batch.as_prompt_text(), "Great product!\nShipping was slow.");
    }

    #[test]
    fn batch_from_blank_text_is_empty() {
        assert!(ReviewBatch::from_text(" \n\t\n").is_empty());
    }

    #[test]
    fn batch_from_rows_keeps_order() {
        let batch = ReviewBatch::from_lines(vec!["b", "a", "", "c"]);
        assert_eq!(batch.lines(), ["b", "a", "c"]);
    }

    #[test]
    fn heuristic_result_is_tagged_and_populated() {
        let result = AnalysisResult::heuristic(SentimentDistribution {
            positive: 34,
            negative: 33,
            neutral: 33,
        });
        assert_eq!(result.source, Provenance::Heuristic);
        assert_eq!(result.urgency, Urgency::Medium);
        assert_eq!(result.top_pain_points.len(), 1);
        assert_eq!(result.top_positive_drivers.len(), 1);
        assert_eq!(result.key_themes.len(), 1);
        assert_eq!(result.recommended_actions.len(), 1);
        assert_eq!(result.sentiment_distribution.total(), 100);
    }

    #[test]
    fn payload_omits_source() {
        let result = AnalysisResult::heuristic(SentimentDistribution {
            positive: 50,
            negative: 25,
            neutral: 25,
        });
        let payload = result.to_payload();
        assert!(payload.get("source").is_none());
        assert_eq!(payload["urgency"], "medium");
        assert_eq!(payload["sentiment_distribution"]["positive"], 50);
    }

    #[test]
    fn provenance_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Provenance::Llm).unwrap(), "\"llm\"");
        assert_eq!(
            serde_json::to_string(&Provenance::Heuristic).unwrap(),
            "\"heuristic\""
        );
    }

    #[test]
    fn urgency_parse() {
        assert_eq!(Urgency::parse("high"), Some(Urgency::High));
        assert_eq!(Urgency::parse("HIGH"), None);
        assert_eq!(Urgency::parse("critical"), None);
    }
}
