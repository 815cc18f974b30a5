//! Chronological batch processing.
//!
//! A batch is an ordered sequence, never parallel: later documents' trend
//! comparisons depend on earlier documents having been persisted. Readable
//! documents are sorted by medical exam date before processing, so the
//! verdicts describe clinical progression regardless of upload order; each
//! document re-queries the store rather than relying on any cached state.
//!
//! No per-document failure aborts the batch: unreadable documents, duplicate
//! submissions and storage errors all become result entries.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::duplicate::check_duplicate;
use crate::extraction::dates::parse_flexible;
use crate::extraction::{extract_metadata, DocumentReadError};
use crate::intelligence::{analyze_report, LlmClient, TrendComparator};
use crate::models::{BatchOutcome, DocumentSource, ExtractedMetadata};
use crate::store::ReportStore;

/// One submitted document: the rendering backend either produced a source or
/// failed for this document alone.
pub struct Submission {
    pub label: String,
    pub source: Result<DocumentSource, DocumentReadError>,
}

impl Submission {
    pub fn readable(label: impl Into<String>, source: DocumentSource) -> Self {
        Self {
            label: label.into(),
            source: Ok(source),
        }
    }

    pub fn unreadable(label: impl Into<String>, error: DocumentReadError) -> Self {
        Self {
            label: label.into(),
            source: Err(error),
        }
    }
}

pub struct BatchProcessor<'a> {
    store: &'a dyn ReportStore,
    llm: &'a dyn LlmClient,
    config: &'a EngineConfig,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        store: &'a dyn ReportStore,
        llm: &'a dyn LlmClient,
        config: &'a EngineConfig,
    ) -> Self {
        Self { store, llm, config }
    }

    pub fn process(&self, submissions: Vec<Submission>) -> Vec<BatchOutcome> {
        let _span = tracing::info_span!("process_batch", count = submissions.len()).entered();

        let mut outcomes = Vec::new();
        let mut readable: Vec<(String, ExtractedMetadata)> = Vec::new();

        for submission in submissions {
            match submission.source {
                Err(error) => {
                    tracing::warn!(label = %submission.label, %error, "document unreadable");
                    outcomes.push(BatchOutcome::read_failure(
                        &submission.label,
                        error.to_string(),
                    ));
                }
                Ok(source) => {
                    let meta = extract_metadata(&source, self.config);
                    readable.push((submission.label, meta));
                }
            }
        }

        // Medical chronology, not upload order; undated documents keep their
        // relative order at the end.
        readable.sort_by_key(|(_, meta)| match effective_date(meta) {
            Some(date) => (0, date),
            None => (1, NaiveDate::MIN),
        });

        for (label, meta) in readable {
            outcomes.push(self.process_one(label, meta));
        }

        outcomes
    }

    fn process_one(&self, label: String, meta: ExtractedMetadata) -> BatchOutcome {
        let exam_date = effective_date(&meta);
        let analysis = analyze_report(self.llm, self.config, &meta.raw_text);
        let comparator = TrendComparator::new(self.store, self.llm, self.config);

        let mut outcome = BatchOutcome {
            label,
            saved: false,
            message: String::new(),
            report_id: None,
            fiscal_code: meta.fiscal_code.clone(),
            patient_name: meta.patient_name.clone(),
            exam_title: Some(meta.exam_title.clone()),
            exam_date: meta.exam_date.clone(),
            analysis: Some(analysis),
            trend: None,
            trend_explanation: None,
        };

        // Duplicate gate, only meaningful with an identifier to key on.
        // A failed lookup counts as "no duplicates" — favor saving.
        if let Some(code) = &meta.fiscal_code {
            let existing = self
                .store
                .find_same_key(code, &meta.exam_title, exam_date)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "duplicate lookup failed, assuming no duplicates");
                    Vec::new()
                });
            let verdict = check_duplicate(&meta, Some(meta.category), &existing, self.config);
            if verdict.is_duplicate {
                outcome.message = "Referto già presente in archivio – non salvato.".into();
                return outcome;
            }
        }

        let comparison = comparator.compare(
            meta.fiscal_code.as_deref(),
            &meta.exam_title,
            &meta.raw_text,
            exam_date,
        );
        outcome.trend = Some(comparison.status);
        outcome.trend_explanation = Some(comparison.explanation.clone());

        match self.store.save(&meta, Some(&comparison)) {
            Ok(saved) => {
                outcome.saved = true;
                outcome.report_id = Some(saved.id);
                outcome.message = if meta.fiscal_code.is_some() {
                    "Referto salvato con successo.".into()
                } else {
                    "Codice fiscale assente – referto salvato senza paziente associato.".into()
                };
            }
            Err(error) => {
                tracing::warn!(%error, "save failed");
                outcome.message = format!("Salvataggio non riuscito: {error}");
            }
        }

        outcome
    }
}

fn effective_date(meta: &ExtractedMetadata) -> Option<NaiveDate> {
    meta.exam_date.as_deref().and_then(parse_flexible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::{MockLlmClient, UnreachableLlmClient};
    use crate::models::TrendStatus;
    use crate::store::InMemoryReportStore;

    const CODE_LINE: &str = "C.F. RSSMRA85T10A562S";

    fn urine_report(date: &str, protein: &str) -> String {
        format!(
            "LABORATORIO ANALISI\n{CODE_LINE}\nlinea\nlinea\nlinea\nlinea\n\
             ESAME CHIMICO FISICO DELLE URINE\nData esame: {date}\n\
             Proteine: {protein} mg/dl (0 - 10)\nGlucosio: 80 mg/dl\nPh: 6,0"
        )
    }

    fn anonymous_report(date: &str, protein: &str) -> String {
        format!(
            "LABORATORIO ANALISI\nlinea\nlinea\nlinea\nlinea\nlinea\n\
             ESAME CHIMICO FISICO DELLE URINE\nData esame: {date}\n\
             Proteine: {protein} mg/dl (0 - 10)\nGlucosio: 80 mg/dl\nPh: 6,0"
        )
    }

    fn submit(text: String) -> Submission {
        Submission::readable("referto.pdf", DocumentSource::from_text(text))
    }

    #[test]
    fn batch_is_processed_in_exam_date_order_not_upload_order() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        // Newer document uploaded first
        let outcomes = processor.process(vec![
            submit(urine_report("01/05/2024", "45")),
            submit(urine_report("01/02/2024", "15")),
        ]);

        assert_eq!(outcomes.len(), 2);
        // First processed entry is the February document: no prior
        assert_eq!(outcomes[0].exam_date.as_deref(), Some("01/02/2024"));
        assert_eq!(outcomes[0].trend, Some(TrendStatus::NoPrior));
        // The May document then compares against February: worsened 15 → 45
        assert_eq!(outcomes[1].exam_date.as_deref(), Some("01/05/2024"));
        assert_eq!(outcomes[1].trend, Some(TrendStatus::Worsened));
        assert!(outcomes[1]
            .trend_explanation
            .as_deref()
            .unwrap()
            .contains("da 15 a 45"));
        assert!(outcomes.iter().all(|o| o.saved));
    }

    #[test]
    fn identifier_less_documents_compare_and_persist_without_patient() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        // Upload order B (May) then A (February), in separate batches
        let first = processor.process(vec![submit(anonymous_report("01/05/2024", "45"))]);
        assert_eq!(first[0].trend, Some(TrendStatus::NoPrior));
        assert!(first[0].saved);
        assert_eq!(first[0].fiscal_code, None);

        let second = processor.process(vec![submit(anonymous_report("01/02/2024", "15"))]);
        // The comparator re-evaluates persisted ordering: February predates
        // May, so the verdict cites the real progression 15 → 45.
        assert_eq!(second[0].trend, Some(TrendStatus::Worsened));
        assert!(second[0]
            .trend_explanation
            .as_deref()
            .unwrap()
            .contains("da 15 a 45"));
    }

    #[test]
    fn duplicate_submission_is_reported_and_not_saved() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        let first = processor.process(vec![submit(urine_report("01/02/2024", "15"))]);
        assert!(first[0].saved);

        let second = processor.process(vec![submit(urine_report("01/02/2024", "15"))]);
        assert!(!second[0].saved);
        assert!(second[0].message.contains("già presente"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_content_different_exam_date_is_not_a_duplicate() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        processor.process(vec![submit(urine_report("01/02/2024", "15"))]);
        let outcomes = processor.process(vec![submit(urine_report("01/05/2024", "15"))]);
        assert!(outcomes[0].saved);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unreadable_document_becomes_entry_and_batch_continues() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        let outcomes = processor.process(vec![
            Submission::unreadable(
                "corrotto.pdf",
                DocumentReadError("flusso byte non decodificabile".into()),
            ),
            submit(urine_report("01/02/2024", "15")),
        ]);

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].saved);
        assert!(outcomes[0].message.contains("non decodificabile"));
        assert!(outcomes[1].saved);
    }

    #[test]
    fn ai_verdict_flows_into_the_outcome() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = MockLlmClient::new(
            r#"{"status": "invariata", "explanation": "Valori sovrapponibili.", "diagnosis": "quadro stabile"}"#,
        );
        let processor = BatchProcessor::new(&store, &llm, &config);

        processor.process(vec![submit(urine_report("01/02/2024", "15"))]);
        let outcomes = processor.process(vec![submit(urine_report("01/05/2024", "16"))]);

        assert_eq!(outcomes[0].trend, Some(TrendStatus::Unchanged));
        assert_eq!(
            outcomes[0].trend_explanation.as_deref(),
            Some("Valori sovrapponibili.")
        );
        assert!(outcomes[0].analysis.is_some());
    }

    #[test]
    fn undated_documents_process_last_in_submission_order() {
        let store = InMemoryReportStore::new();
        let config = EngineConfig::default();
        let llm = UnreachableLlmClient;
        let processor = BatchProcessor::new(&store, &llm, &config);

        let undated = "LABORATORIO ANALISI\nC.F. RSSMRA85T10A562S\nlinea\nlinea\nlinea\nlinea\n\
                       ESAME CHIMICO FISICO DELLE URINE\nProteine: 20 mg/dl"
            .to_string();
        let outcomes = processor.process(vec![
            submit(undated),
            submit(urine_report("01/02/2024", "15")),
        ]);

        assert_eq!(outcomes[0].exam_date.as_deref(), Some("01/02/2024"));
        assert_eq!(outcomes[1].exam_date, None);
    }
}
