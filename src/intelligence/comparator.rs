//! Trend comparison between a document being submitted and the most recent
//! stored report of the same exam title.
//!
//! Prior selection is by medical exam date through the store's recency
//! ordering, never by submission order. When the submitted document is
//! chronologically older than the stored one, the pair is re-oriented so the
//! comparison always reads older → newer; the verdict therefore describes
//! the true clinical progression whatever order the documents arrived in.

use chrono::NaiveDate;

use super::client::LlmClient;
use super::fallback::fallback_comparison;
use super::parser::parse_comparison_response;
use super::prompt::build_comparison_prompt;
use crate::config::EngineConfig;
use crate::models::ComparisonResult;
use crate::store::ReportStore;

pub struct TrendComparator<'a> {
    store: &'a dyn ReportStore,
    llm: &'a dyn LlmClient,
    config: &'a EngineConfig,
}

impl<'a> TrendComparator<'a> {
    pub fn new(
        store: &'a dyn ReportStore,
        llm: &'a dyn LlmClient,
        config: &'a EngineConfig,
    ) -> Self {
        Self { store, llm, config }
    }

    /// Produce the trend verdict for a document that is about to be saved.
    ///
    /// Without a fiscal code the lookup degrades to latest-by-title-only so
    /// that un-identifiable documents still receive contextual framing; such
    /// verdicts must never drive patient-specific decisions.
    ///
    /// The AI service is contacted at most once and never retried: any
    /// failure or non-conforming response falls through to the deterministic
    /// comparison.
    pub fn compare(
        &self,
        fiscal_code: Option<&str>,
        exam_title: &str,
        current_text: &str,
        current_exam_date: Option<NaiveDate>,
    ) -> ComparisonResult {
        let _span = tracing::info_span!("compare_trend", title = exam_title).entered();

        let prior = match fiscal_code {
            Some(code) => self.store.find_latest(code, exam_title),
            None => self.store.find_latest_by_title_only(exam_title),
        };
        let prior = match prior {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "prior lookup failed, reporting no prior");
                None
            }
        };
        let Some(prior) = prior else {
            return ComparisonResult::no_prior();
        };

        // Orient the pair chronologically: the stored report is "previous"
        // unless the submitted document predates it.
        let (older, newer) = match (prior.exam_date, current_exam_date) {
            (Some(stored), Some(current)) if current < stored => {
                tracing::debug!(
                    stored = %stored,
                    current = %current,
                    "submitted document predates stored report, re-orienting comparison"
                );
                (current_text, prior.raw_text.as_str())
            }
            _ => (prior.raw_text.as_str(), current_text),
        };

        let prompt = build_comparison_prompt(older, newer);
        match self.llm.generate(&self.config.model_name, &prompt) {
            Ok(response) => match parse_comparison_response(&response) {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(error = %e, "unusable AI comparison response, falling back");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "AI comparison call failed, falling back");
            }
        }

        fallback_comparison(older, newer, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::client::{MockLlmClient, UnreachableLlmClient};
    use crate::models::{DocumentSource, TrendStatus};
    use crate::store::{InMemoryReportStore, ReportStore};

    fn seed(store: &InMemoryReportStore, code: Option<&str>, title: &str, date: &str, text: &str) {
        let config = EngineConfig::default();
        let mut meta =
            crate::extraction::extract_metadata(&DocumentSource::from_text(text), &config);
        meta.fiscal_code = code.map(str::to_string);
        meta.exam_title = title.to_string();
        meta.exam_date = Some(date.to_string());
        store.save(&meta, None).unwrap();
    }

    fn date(s: &str) -> Option<NaiveDate> {
        crate::extraction::dates::parse_flexible(s)
    }

    const CODE: &str = "RSSMRA85T10A562S";
    const TITLE: &str = "Esame Chimico Fisico Delle Urine";

    #[test]
    fn no_prior_short_circuits_without_ai_call() {
        struct PanickingLlm;
        impl LlmClient for PanickingLlm {
            fn generate(&self, _: &str, _: &str) -> Result<String, super::super::IntelligenceError> {
                panic!("the AI service must not be contacted on the no-prior path");
            }
        }

        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let comparator = TrendComparator::new(&store, &PanickingLlm, &config);

        let result = comparator.compare(Some(CODE), TITLE, "testo", date("01/05/2024"));
        assert_eq!(result.status, TrendStatus::NoPrior);
    }

    #[test]
    fn ai_verdict_is_used_when_well_formed() {
        let store = InMemoryReportStore::new();
        seed(&store, Some(CODE), TITLE, "01/02/2024", "Proteine: 15 mg/dl");

        let config = EngineConfig::default();
        let llm = MockLlmClient::new(
            r#"{"status": "peggiorata", "explanation": "Proteine aumentate da 15 a 45 mg/dl."}"#,
        );
        let comparator = TrendComparator::new(&store, &llm, &config);

        let result = comparator.compare(
            Some(CODE),
            TITLE,
            "Proteine: 45 mg/dl",
            date("01/05/2024"),
        );
        assert_eq!(result.status, TrendStatus::Worsened);
        assert!(result.explanation.contains("15"));
    }

    #[test]
    fn empty_ai_response_falls_back_and_never_errors() {
        let store = InMemoryReportStore::new();
        seed(&store, Some(CODE), TITLE, "01/02/2024", "Proteine: 15 mg/dl");

        let config = EngineConfig::default();
        let llm = MockLlmClient::new("");
        let comparator = TrendComparator::new(&store, &llm, &config);

        let result = comparator.compare(
            Some(CODE),
            TITLE,
            "Proteine: 45 mg/dl",
            date("01/05/2024"),
        );
        // Deterministic fallback verdict, not an error
        assert_eq!(result.status, TrendStatus::Worsened);
        assert!(result.explanation.contains("da 15 a 45"));
    }

    #[test]
    fn unreachable_service_falls_back() {
        let store = InMemoryReportStore::new();
        seed(&store, Some(CODE), TITLE, "01/02/2024", "Proteine: 45 mg/dl");

        let config = EngineConfig::default();
        let comparator = TrendComparator::new(&store, &UnreachableLlmClient, &config);

        let result = comparator.compare(
            Some(CODE),
            TITLE,
            "Proteine: 15 mg/dl",
            date("01/05/2024"),
        );
        assert_eq!(result.status, TrendStatus::Improved);
    }

    #[test]
    fn submission_order_does_not_change_the_verdict() {
        let config = EngineConfig::default();

        // Chronological submission: prior Feb (15), current May (45)
        let store_a = InMemoryReportStore::new();
        seed(&store_a, Some(CODE), TITLE, "01/02/2024", "Proteine: 15 mg/dl");
        let comparator = TrendComparator::new(&store_a, &UnreachableLlmClient, &config);
        let chronological = comparator.compare(
            Some(CODE),
            TITLE,
            "Proteine: 45 mg/dl",
            date("01/05/2024"),
        );

        // Reverse submission: May (45) already stored, Feb (15) arrives now
        let store_b = InMemoryReportStore::new();
        seed(&store_b, Some(CODE), TITLE, "01/05/2024", "Proteine: 45 mg/dl");
        let comparator = TrendComparator::new(&store_b, &UnreachableLlmClient, &config);
        let reversed = comparator.compare(
            Some(CODE),
            TITLE,
            "Proteine: 15 mg/dl",
            date("01/02/2024"),
        );

        // Both describe the same clinical progression 15 → 45
        assert_eq!(chronological.status, TrendStatus::Worsened);
        assert_eq!(reversed.status, TrendStatus::Worsened);
        assert!(chronological.explanation.contains("da 15 a 45"));
        assert!(reversed.explanation.contains("da 15 a 45"));
    }

    #[test]
    fn identifier_less_lookup_degrades_to_title_only() {
        let store = InMemoryReportStore::new();
        seed(&store, None, TITLE, "01/02/2024", "Proteine: 15 mg/dl");

        let config = EngineConfig::default();
        let comparator = TrendComparator::new(&store, &UnreachableLlmClient, &config);

        let result = comparator.compare(None, TITLE, "Proteine: 45 mg/dl", date("01/05/2024"));
        assert_eq!(result.status, TrendStatus::Worsened);
    }

    #[test]
    fn different_title_is_not_a_prior() {
        let store = InMemoryReportStore::new();
        seed(&store, Some(CODE), "Emocromo Completo", "01/02/2024", "HGB 12.5 g/dl");

        let config = EngineConfig::default();
        let comparator = TrendComparator::new(&store, &UnreachableLlmClient, &config);

        let result = comparator.compare(Some(CODE), TITLE, "Proteine: 45 mg/dl", date("01/05/2024"));
        assert_eq!(result.status, TrendStatus::NoPrior);
    }
}
