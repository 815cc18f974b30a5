//! Single entry point for per-document extraction: sanitize the stream, run
//! every field cascade, the title cascade, the classifier and the lab-value
//! passes, and assemble the immutable [`ExtractedMetadata`].
//!
//! Extraction never fails: whatever does not match is simply absent.

use super::fields::{
    extract_birth_date, extract_dated_events, extract_exam_date, extract_fiscal_code,
    extract_patient_name,
};
use super::lab_values::extract_lab_values;
use super::sanitize::sanitize_extracted_text;
use super::title::extract_exam_title;
use crate::classify::classify_report;
use crate::config::EngineConfig;
use crate::models::{DocumentSource, ExtractedMetadata};

/// Placeholder title when every rule came up empty.
pub const UNKNOWN_TITLE: &str = "sconosciuto";

pub fn extract_metadata(source: &DocumentSource, config: &EngineConfig) -> ExtractedMetadata {
    let _span = tracing::info_span!("extract_metadata", chars = source.text.len()).entered();

    let text = sanitize_extracted_text(&source.text);

    let fiscal_code = extract_fiscal_code(&text, &source.properties);
    let patient_name = extract_patient_name(&text);
    let birth_date = extract_birth_date(&text, config);

    // Labeled date kinds take precedence over the generic cascade.
    let dated_events = extract_dated_events(&text, config);
    let exam_date = dated_events
        .effective()
        .map(str::to_string)
        .or_else(|| extract_exam_date(&text, config));

    let exam_title = extract_exam_title(&text).unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let category = classify_report(&text, &exam_title);
    let lab_values = extract_lab_values(&text, config);

    tracing::info!(
        has_code = fiscal_code.is_some(),
        title = %exam_title,
        category = category.as_str(),
        values = lab_values.len(),
        "document extracted"
    );

    ExtractedMetadata {
        raw_text: text,
        patient_name,
        birth_date,
        fiscal_code,
        exam_date,
        exam_title,
        category,
        lab_values,
        dated_events,
    }
}
