//! Scripted stand-in for the LLM provider.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{GenerationError, TextGenerator};

/// Replays queued replies in order and records every prompt it receives.
/// Once the script runs out it fails every call.
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub(crate) fn fail(self, err: GenerationError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

pub(crate) fn unavailable() -> GenerationError {
    GenerationError::Provider {
        status: 503,
        body: "model overloaded".to_string(),
    }
}

pub(crate) const VALID_ANALYSIS: &str = r#"{
    "sentiment_distribution": {"positive": 55, "negative": 35, "neutral": 10},
    "top_pain_points": ["late delivery", "damaged packaging"],
    "top_positive_drivers": ["product quality"],
    "key_themes": ["shipping", "quality"],
    "urgency": "high",
    "recommended_actions": ["audit courier SLAs"]
}"#;

pub(crate) fn decision_json(category: &str, level: &str) -> String {
    format!(
        r#"{{"issue_category": {{"category": "{category}", "confidence": 0.8}},
            "escalation": {{"level": "{level}", "reason": "recurring complaints"}}}}"#
    )
}
