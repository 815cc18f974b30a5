use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{ReportCategory, TestCategory};

/// Output of the external rendering backend for one document: the primary
/// character stream plus whatever document-level properties the backend
/// exposes (the fiscal code sometimes lives only in the property bag).
///
/// When the stream is shorter than [`crate::config::MIN_TEXT_CHARS`] the
/// caller is expected to substitute an OCR-derived stream before handing the
/// source to the engine; no OCR happens here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSource {
    pub text: String,
    pub properties: BTreeMap<String, String>,
}

impl DocumentSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// True when the text layer is too thin to be trusted and the caller
    /// should re-render through OCR before extraction.
    pub fn needs_ocr(&self) -> bool {
        self.text.trim().chars().count() < crate::config::MIN_TEXT_CHARS
    }
}

/// A single named test result discovered in the report text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabValue {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub abnormal: bool,
    pub category: TestCategory,
}

/// The three kinds of dated events an Italian report carries, extracted
/// independently of the generic date cascade. The effective exam date
/// prefers the reporting date, then the execution date, then acceptance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatedEvents {
    pub exam_date: Option<String>,
    pub report_date: Option<String>,
    pub acceptance_date: Option<String>,
}

impl DatedEvents {
    pub fn effective(&self) -> Option<&str> {
        self.report_date
            .as_deref()
            .or(self.exam_date.as_deref())
            .or(self.acceptance_date.as_deref())
    }
}

/// Everything extracted from one document. Immutable once built; downstream
/// components only read it.
///
/// `fiscal_code`, when present, always satisfies the 16-character template
/// (6 letters, 2 digits, letter, 2 digits, letter, 3 digits, letter).
/// Absence is a normal state, distinct from an invalid code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub raw_text: String,
    pub patient_name: Option<String>,
    /// Normalized `DD/MM/YYYY`.
    pub birth_date: Option<String>,
    pub fiscal_code: Option<String>,
    /// Normalized `DD/MM/YYYY`.
    pub exam_date: Option<String>,
    /// `"sconosciuto"` when no rule matched.
    pub exam_title: String,
    pub category: ReportCategory,
    /// Discovery order; names unique per document.
    pub lab_values: Vec<LabValue>,
    pub dated_events: DatedEvents,
}

impl ExtractedMetadata {
    pub fn lab_value(&self, name: &str) -> Option<&LabValue> {
        self.lab_values.iter().find(|v| v.name == name)
    }
}
