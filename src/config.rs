//! Engine configuration.
//!
//! One [`EngineConfig`] is constructed per process and passed by reference
//! into each component. The numeric thresholds mirror the values the engine
//! was tuned with; none of them carries a published clinical justification,
//! which is exactly why they live here instead of being hard-coded at the
//! call sites.

use chrono::Datelike;

use crate::models::ReportCategory;

/// Below this many characters the rendering backend's text layer is presumed
/// unusable and the caller should substitute an OCR-derived stream before
/// invoking the engine.
pub const MIN_TEXT_CHARS: usize = 100;

/// Clinical-significance override for one named test: replaces the raw
/// out-of-range marker with a threshold-derived flag whenever the value
/// parses as numeric.
#[derive(Debug, Clone)]
pub struct SignificanceRule {
    /// All terms must appear in the upper-cased test name.
    pub name_terms: &'static [&'static str],
    /// When set, must appear in the lower-cased unit.
    pub unit_term: Option<&'static str>,
    /// Values up to and including this are not abnormal.
    pub normal_max: f64,
    /// Values above this are markedly abnormal rather than mild.
    pub marked_min: f64,
}

/// Category-specific duplicate-detection thresholds.
#[derive(Debug, Clone)]
pub struct DuplicateThresholds {
    pub laboratory_min_keys: usize,
    pub imaging_min_keys: usize,
    pub pathology_min_keys: usize,
    pub unclassified_min_keys: usize,
    pub laboratory_match_ratio: f64,
    pub imaging_match_ratio: f64,
    pub pathology_match_ratio: f64,
    pub unclassified_match_ratio: f64,
}

impl DuplicateThresholds {
    pub fn min_keys(&self, category: Option<ReportCategory>) -> usize {
        match category {
            Some(ReportCategory::Laboratory) => self.laboratory_min_keys,
            Some(ReportCategory::Imaging) => self.imaging_min_keys,
            Some(ReportCategory::Pathology) => self.pathology_min_keys,
            None => self.unclassified_min_keys,
        }
    }

    pub fn match_ratio(&self, category: Option<ReportCategory>) -> f64 {
        match category {
            Some(ReportCategory::Laboratory) => self.laboratory_match_ratio,
            Some(ReportCategory::Imaging) => self.imaging_match_ratio,
            Some(ReportCategory::Pathology) => self.pathology_match_ratio,
            None => self.unclassified_match_ratio,
        }
    }
}

impl Default for DuplicateThresholds {
    fn default() -> Self {
        Self {
            laboratory_min_keys: 3,
            imaging_min_keys: 2,
            pathology_min_keys: 2,
            unclassified_min_keys: 2,
            laboratory_match_ratio: 0.80,
            imaging_match_ratio: 0.70,
            pathology_match_ratio: 0.75,
            unclassified_match_ratio: 0.60,
        }
    }
}

/// Read-only configuration for all engine components.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ollama-compatible endpoint for the AI comparison service.
    pub ollama_base_url: String,
    pub model_name: String,
    pub request_timeout_secs: u64,
    /// Relative change above which the deterministic fallback calls a trend
    /// worsened (increase) or improved (decrease).
    pub trend_change_threshold: f64,
    /// Relative length difference for the last-resort text-length heuristic.
    pub length_heuristic_margin: f64,
    /// Plausible exam-date window (birth dates are bounded by 1900 instead).
    pub exam_year_min: i32,
    pub exam_year_max: i32,
    pub duplicate: DuplicateThresholds,
    pub significance: Vec<SignificanceRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".into(),
            model_name: "alibayram/medgemma".into(),
            request_timeout_secs: 120,
            trend_change_threshold: 0.20,
            length_heuristic_margin: 0.25,
            exam_year_min: 1980,
            exam_year_max: chrono::Utc::now().year(),
            duplicate: DuplicateThresholds::default(),
            significance: default_significance_rules(),
        }
    }
}

/// Built-in clinical-significance table: urinary hemoglobin, urinary protein
/// and leukocyte esterase all produce trace findings that source documents
/// star even when they are clinically silent.
fn default_significance_rules() -> Vec<SignificanceRule> {
    vec![
        SignificanceRule {
            name_terms: &["EMOGLOBINA"],
            unit_term: Some("mg/dl"),
            normal_max: 1.0,
            marked_min: 5.0,
        },
        SignificanceRule {
            name_terms: &["PROTEINE"],
            unit_term: Some("mg/dl"),
            normal_max: 10.0,
            marked_min: 30.0,
        },
        SignificanceRule {
            name_terms: &["ESTERASI", "LEUCOCIT"],
            unit_term: None,
            normal_max: 25.0,
            marked_min: 75.0,
        },
    ]
}
