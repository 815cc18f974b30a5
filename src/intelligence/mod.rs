//! AI-assisted intelligence: the trend comparator and the opaque per-report
//! analysis, both backed by an Ollama-compatible service behind the
//! [`LlmClient`] trait.
//!
//! Every failure mode of the AI path — connection refused, timeout, empty
//! body, malformed JSON — is recovered locally: the comparator falls through
//! to its deterministic path and the analysis falls back to sentinel values.
//! Callers never see an [`IntelligenceError`] out of the public operations.

pub mod analysis;
pub mod client;
pub mod comparator;
pub mod fallback;
pub mod parser;
pub mod prompt;

pub use analysis::analyze_report;
pub use client::{LlmClient, MockLlmClient, OllamaClient, UnreachableLlmClient};
pub use comparator::TrendComparator;
pub use fallback::fallback_comparison;
pub use parser::{parse_analysis_response, parse_comparison_response};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntelligenceError {
    #[error("AI service is not reachable at {0}")]
    Connection(String),

    #[error("AI service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Empty AI response")]
    EmptyResponse,

    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}
