//! LLM layer: the provider gateway and the two reasoning phases built on it.
//!
//! Phase 1 ([`ReviewAnalyzer`]) always produces a schema-valid analysis,
//! retrying the LLM and then falling back to the lexicon heuristic.
//! Phase 2 ([`DecisionEngine`]) classifies and escalates with no retry and
//! no fallback, and only touches the state store once the response is valid.

mod analyzer;
mod decision;
mod extract;
mod gateway;
mod prompt;

#[cfg(test)]
mod testing;

pub use analyzer::{AttemptError, ReviewAnalyzer, DEFAULT_MAX_RETRIES, MAX_RETRIES_ENV};
pub use decision::{DecisionEngine, DecisionError, DecisionOutcome};
pub use extract::{extract_json, ParseError};
pub use gateway::{
    GatewayConfig, GeminiGateway, GenerationError, TextGenerator, API_BASE_ENV, API_KEY_ENV,
    DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT, MODEL_ENV, TIMEOUT_ENV,
};
