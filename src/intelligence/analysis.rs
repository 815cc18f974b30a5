//! Opaque single-report AI analysis: diagnosis text plus a coarse severity
//! class. The engine transports the result without interpreting it, and any
//! failure degrades to sentinel values instead of an error — an unreadable
//! analysis must never block a batch.

use super::client::LlmClient;
use super::parser::parse_analysis_response;
use super::prompt::build_analysis_prompt;
use crate::config::EngineConfig;
use crate::models::AiAnalysis;

const SEVERITY_UNAVAILABLE: &str = "non disponibile";

pub fn analyze_report(llm: &dyn LlmClient, config: &EngineConfig, text: &str) -> AiAnalysis {
    let prompt = build_analysis_prompt(text);
    match llm.generate(&config.model_name, &prompt) {
        Ok(response) => match parse_analysis_response(&response) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "AI analysis response unusable");
                AiAnalysis {
                    diagnosis: "Errore nel formato della risposta".into(),
                    severity: SEVERITY_UNAVAILABLE.into(),
                }
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "AI analysis call failed");
            AiAnalysis {
                diagnosis: "Errore nella comunicazione con il modello AI".into(),
                severity: SEVERITY_UNAVAILABLE.into(),
            }
        }
    }
}
