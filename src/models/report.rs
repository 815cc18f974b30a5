use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::TrendStatus;

/// A persisted report row as the external persistence collaborator exposes
/// it. This engine only ever reads and writes these through
/// [`crate::store::ReportStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: Uuid,
    pub fiscal_code: Option<String>,
    pub exam_title: String,
    pub exam_date: Option<NaiveDate>,
    pub raw_text: String,
    pub created_at: NaiveDateTime,
    pub trend: Option<TrendStatus>,
    pub trend_explanation: Option<String>,
}

/// Outcome of one trend comparison. Produced per call; the caller persists it
/// alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub status: TrendStatus,
    pub explanation: String,
}

impl ComparisonResult {
    pub fn no_prior() -> Self {
        Self {
            status: TrendStatus::NoPrior,
            explanation: "Non esiste un referto precedente di questo tipo per il paziente.".into(),
        }
    }
}

/// Outcome of one duplicate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub matched: Option<StoredReport>,
}

impl DuplicateVerdict {
    pub fn not_duplicate() -> Self {
        Self {
            is_duplicate: false,
            matched: None,
        }
    }
}

/// Opaque AI-produced analysis of a single report. The engine transports the
/// diagnosis text and severity class without interpreting either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub diagnosis: String,
    pub severity: String,
}

/// Per-document entry in a batch result. Failures become entries too; a batch
/// never aborts because one document failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub label: String,
    pub saved: bool,
    pub message: String,
    pub report_id: Option<Uuid>,
    pub fiscal_code: Option<String>,
    pub patient_name: Option<String>,
    pub exam_title: Option<String>,
    pub exam_date: Option<String>,
    pub analysis: Option<AiAnalysis>,
    pub trend: Option<TrendStatus>,
    pub trend_explanation: Option<String>,
}

impl BatchOutcome {
    /// Entry for a document the rendering backend could not read.
    pub fn read_failure(label: &str, message: String) -> Self {
        Self {
            label: label.to_string(),
            saved: false,
            message,
            report_id: None,
            fiscal_code: None,
            patient_name: None,
            exam_title: None,
            exam_date: None,
            analysis: None,
            trend: None,
            trend_explanation: None,
        }
    }
}
