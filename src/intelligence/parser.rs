//! Parsing of AI service responses.
//!
//! The service is asked for bare JSON but routinely wraps it in fenced code
//! blocks or surrounds it with prose. Parsing is an explicit
//! `Result`-returning step: strip fences, try the whole payload, then retry
//! on the outermost brace span. The caller decides what an `Err` means —
//! for the comparator it means "use the deterministic fallback".

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::IntelligenceError;
use crate::models::{AiAnalysis, ComparisonResult, TrendStatus};

static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern"));

const MISSING_EXPLANATION: &str = "Spiegazione non fornita dall'AI.";

/// Remove markdown code fences around a JSON payload.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("```json") {
        return trimmed.replace("```json", "").replace("```", "").trim().to_string();
    }
    if trimmed.contains("```") {
        let parts: Vec<&str> = trimmed.split("```").collect();
        if parts.len() >= 2 {
            let inner = parts[1].trim();
            let inner = inner.strip_prefix("json").unwrap_or(inner);
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

fn parse_json_lenient<T: for<'de> Deserialize<'de>>(
    payload: &str,
) -> Result<T, IntelligenceError> {
    match serde_json::from_str(payload) {
        Ok(parsed) => Ok(parsed),
        Err(first_error) => {
            // Prose around the object: retry on the outermost brace span.
            let Some(span) = BRACE_SPAN.find(payload) else {
                return Err(IntelligenceError::MalformedResponse(
                    "no JSON object in response".into(),
                ));
            };
            serde_json::from_str(span.as_str())
                .map_err(|_| IntelligenceError::JsonParsing(first_error.to_string()))
        }
    }
}

/// Parse the comparison response into a [`ComparisonResult`].
/// The status must come from the comparison vocabulary; anything else is a
/// malformed response and routes the caller to the fallback path.
pub fn parse_comparison_response(raw: &str) -> Result<ComparisonResult, IntelligenceError> {
    #[derive(Deserialize)]
    struct RawVerdict {
        status: Option<String>,
        explanation: Option<String>,
    }

    if raw.trim().is_empty() {
        return Err(IntelligenceError::EmptyResponse);
    }

    let payload = strip_code_fences(raw);
    let verdict: RawVerdict = parse_json_lenient(&payload)?;

    let status_text = verdict
        .status
        .ok_or_else(|| IntelligenceError::MalformedResponse("missing status".into()))?;
    let status = TrendStatus::from_str(status_text.trim().to_lowercase().as_str())
        .map_err(|_| IntelligenceError::MalformedResponse(format!("status '{status_text}'")))?;

    if !matches!(
        status,
        TrendStatus::Worsened | TrendStatus::Improved | TrendStatus::Unchanged
    ) {
        return Err(IntelligenceError::MalformedResponse(format!(
            "status '{status_text}' outside comparison vocabulary"
        )));
    }

    Ok(ComparisonResult {
        status,
        explanation: verdict
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| MISSING_EXPLANATION.to_string()),
    })
}

/// Parse the single-report analysis response. Lenient on the severity class,
/// strict on the presence of a diagnosis.
pub fn parse_analysis_response(raw: &str) -> Result<AiAnalysis, IntelligenceError> {
    #[derive(Deserialize)]
    struct RawAnalysis {
        diagnosis: Option<String>,
        classification: Option<String>,
    }

    if raw.trim().is_empty() {
        return Err(IntelligenceError::EmptyResponse);
    }

    let payload = strip_code_fences(raw);
    let analysis: RawAnalysis = parse_json_lenient(&payload)?;

    Ok(AiAnalysis {
        diagnosis: analysis
            .diagnosis
            .ok_or_else(|| IntelligenceError::MalformedResponse("missing diagnosis".into()))?,
        severity: analysis
            .classification
            .unwrap_or_else(|| "non disponibile".to_string()),
    })
}
