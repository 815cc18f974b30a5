//! Persistence contract.
//!
//! Durability, migrations and locking belong to the external persistence
//! collaborator; this engine reads and writes through the narrow
//! [`ReportStore`] trait and never caches results across documents — each
//! comparison re-queries so that earlier members of a batch are visible to
//! later ones.
//!
//! "Most recent" is always by medical exam date. Reports sharing an exam
//! date are ordered by storage creation time, then by identifier, so the
//! ordering is deterministic regardless of submission order.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::extraction::dates::parse_flexible;
use crate::models::{ComparisonResult, ExtractedMetadata, StoredReport};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub trait ReportStore: Send + Sync {
    /// Most recent report for a patient and exact exam title.
    fn find_latest(
        &self,
        fiscal_code: &str,
        exam_title: &str,
    ) -> Result<Option<StoredReport>, StoreError>;

    /// Most recent report of a title regardless of patient — the degraded
    /// lookup for identifier-less documents.
    fn find_latest_by_title_only(
        &self,
        exam_title: &str,
    ) -> Result<Option<StoredReport>, StoreError>;

    /// All reports sharing patient, title and exam date — the duplicate
    /// detector's candidate set.
    fn find_same_key(
        &self,
        fiscal_code: &str,
        exam_title: &str,
        exam_date: Option<NaiveDate>,
    ) -> Result<Vec<StoredReport>, StoreError>;

    /// Persist one extracted document together with its trend verdict.
    fn save(
        &self,
        meta: &ExtractedMetadata,
        verdict: Option<&ComparisonResult>,
    ) -> Result<StoredReport, StoreError>;
}

/// Chronological ordering key: exam date first (undated sorts oldest), then
/// creation time, then identifier.
fn recency_key(report: &StoredReport) -> (NaiveDate, NaiveDateTime, Uuid) {
    (
        report.exam_date.unwrap_or(NaiveDate::MIN),
        report.created_at,
        report.id,
    )
}

/// In-memory implementation, for tests and embedding callers that do not
/// need durability.
pub struct InMemoryReportStore {
    reports: Mutex<Vec<StoredReport>>,
    /// Monotonic creation clock; guarantees distinct created_at values even
    /// when saves land within the same instant.
    sequence: AtomicI64,
    epoch: NaiveDateTime,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            sequence: AtomicI64::new(0),
            epoch: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn len(&self) -> usize {
        self.reports.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredReport>>, StoreError> {
        self.reports
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore for InMemoryReportStore {
    fn find_latest(
        &self,
        fiscal_code: &str,
        exam_title: &str,
    ) -> Result<Option<StoredReport>, StoreError> {
        let reports = self.lock()?;
        Ok(reports
            .iter()
            .filter(|r| r.fiscal_code.as_deref() == Some(fiscal_code) && r.exam_title == exam_title)
            .max_by_key(|r| recency_key(r))
            .cloned())
    }

    fn find_latest_by_title_only(
        &self,
        exam_title: &str,
    ) -> Result<Option<StoredReport>, StoreError> {
        let reports = self.lock()?;
        Ok(reports
            .iter()
            .filter(|r| r.exam_title == exam_title)
            .max_by_key(|r| recency_key(r))
            .cloned())
    }

    fn find_same_key(
        &self,
        fiscal_code: &str,
        exam_title: &str,
        exam_date: Option<NaiveDate>,
    ) -> Result<Vec<StoredReport>, StoreError> {
        let reports = self.lock()?;
        Ok(reports
            .iter()
            .filter(|r| {
                r.fiscal_code.as_deref() == Some(fiscal_code)
                    && r.exam_title == exam_title
                    && r.exam_date == exam_date
            })
            .cloned()
            .collect())
    }

    fn save(
        &self,
        meta: &ExtractedMetadata,
        verdict: Option<&ComparisonResult>,
    ) -> Result<StoredReport, StoreError> {
        let tick = self.sequence.fetch_add(1, Ordering::SeqCst);
        let report = StoredReport {
            id: Uuid::new_v4(),
            fiscal_code: meta.fiscal_code.clone(),
            exam_title: meta.exam_title.clone(),
            exam_date: meta.exam_date.as_deref().and_then(parse_flexible),
            raw_text: meta.raw_text.clone(),
            created_at: self.epoch + chrono::Duration::microseconds(tick),
            trend: verdict.map(|v| v.status),
            trend_explanation: verdict.map(|v| v.explanation.clone()),
        };
        let mut reports = self.lock()?;
        reports.push(report.clone());
        Ok(report)
    }
}
