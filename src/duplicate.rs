//! Near-duplicate detection for re-submitted exams.
//!
//! Candidates already share patient, exam title and exam date (the caller
//! filters through `ReportStore::find_same_key`); what remains is deciding
//! whether the *content* is the same underlying exam. Each category gets its
//! own key family — named numeric markers for laboratory, finding plus
//! measurement for imaging, diagnostic terms for pathology — and its own
//! thresholds: a minimum number of shared keys and a minimum fraction of
//! matching values over the key union.
//!
//! Any internal failure counts as "not a duplicate": saving twice is
//! recoverable, silently dropping clinical data is not.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::EngineConfig;
use crate::models::{DuplicateVerdict, ExtractedMetadata, ReportCategory, StoredReport};

/// Laboratory: `name: number` and `NAME number` rows.
static LABORATORY_KEY_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)^([A-Za-zÀ-ÿ][A-Za-zÀ-ÿ\s]{1,28}?)\s*[:=]\s*([0-9]+[.,]?[0-9]*)",
        r"(?im)^([A-Z]{2,}[A-Z/]*)\s+([0-9]+[.,]?[0-9]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("laboratory key pattern must compile"))
    .collect()
});

/// Imaging: a finding term followed by a nearby measurement.
static IMAGING_KEY_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(stenosi|placca|nodulo|massa|versamento|dilatazione|ispessimento|calcificazione|aneurisma)\b[^0-9\n]{0,40}([0-9]+[.,]?[0-9]*)\s*(mm|cm|%)",
    )
    .expect("imaging key pattern must compile")
});

/// Imaging findings reported without a measurement.
static IMAGING_PRESENCE_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(trombosi|reflusso|insufficienza|occlusione|ectasia)\b")
        .expect("imaging presence pattern must compile")
});

/// Pathology: diagnostic terms with an optional grade qualifier.
static PATHOLOGY_KEY_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(carcinoma|adenoma|displasia|metaplasia|neoplasia|iperplasia|atrofia|fibrosi|flogosi)\b(?:\s+(lieve|moderata|severa|grave|cronica|acuta|intestinale))?",
    )
    .expect("pathology key pattern must compile")
});

/// Unclassified: generic `name: value` pairs.
static GENERIC_KEY_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^([A-Za-zÀ-ÿ][A-Za-zÀ-ÿ\s]{1,28}?)\s*:\s*([^\n]{1,40})")
        .expect("generic key pattern must compile")
});

/// Extract the category-specific key/value set from a raw text.
fn extract_key_values(text: &str, category: Option<ReportCategory>) -> BTreeMap<String, String> {
    let mut keys = BTreeMap::new();

    match category {
        Some(ReportCategory::Laboratory) => {
            for rule in LABORATORY_KEY_RULES.iter() {
                for captures in rule.captures_iter(text) {
                    let name = captures[1].trim().to_uppercase();
                    let value = captures[2].trim().to_string();
                    keys.entry(name).or_insert(value);
                }
            }
        }
        Some(ReportCategory::Imaging) => {
            for captures in IMAGING_KEY_RULE.captures_iter(text) {
                let name = captures[1].to_uppercase();
                let value = format!("{} {}", captures[2].trim(), captures[3].to_lowercase());
                keys.entry(name).or_insert(value);
            }
            for captures in IMAGING_PRESENCE_RULE.captures_iter(text) {
                keys.entry(captures[1].to_uppercase())
                    .or_insert_with(|| "PRESENTE".to_string());
            }
        }
        Some(ReportCategory::Pathology) => {
            for captures in PATHOLOGY_KEY_RULE.captures_iter(text) {
                let name = captures[1].to_uppercase();
                let value = captures
                    .get(2)
                    .map(|m| m.as_str().to_uppercase())
                    .unwrap_or_else(|| "PRESENTE".to_string());
                keys.entry(name).or_insert(value);
            }
        }
        None => {
            for captures in GENERIC_KEY_RULE.captures_iter(text) {
                let name = captures[1].trim().to_uppercase();
                let value = captures[2].trim().to_string();
                keys.entry(name).or_insert(value);
            }
        }
    }

    keys
}

/// Value equality: numerically when both sides parse, case-insensitive
/// otherwise.
fn values_match(a: &str, b: &str) -> bool {
    let parse = |s: &str| s.trim().replace(',', ".").parse::<f64>().ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

/// Decide whether the candidate duplicates any of the stored reports that
/// share its patient, title and exam date.
pub fn check_duplicate(
    candidate: &ExtractedMetadata,
    category: Option<ReportCategory>,
    existing: &[StoredReport],
    config: &EngineConfig,
) -> DuplicateVerdict {
    if existing.is_empty() {
        return DuplicateVerdict::not_duplicate();
    }

    let min_keys = config.duplicate.min_keys(category);
    let min_ratio = config.duplicate.match_ratio(category);
    let candidate_keys = extract_key_values(&candidate.raw_text, category);

    for stored in existing {
        let stored_keys = extract_key_values(&stored.raw_text, category);

        let shared: Vec<&String> = candidate_keys
            .keys()
            .filter(|k| stored_keys.contains_key(*k))
            .collect();
        if shared.len() < min_keys {
            continue;
        }

        let union: usize = candidate_keys
            .keys()
            .chain(stored_keys.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        if union == 0 {
            continue;
        }

        let matching = shared
            .iter()
            .filter(|k| values_match(&candidate_keys[k.as_str()], &stored_keys[k.as_str()]))
            .count();
        let ratio = matching as f64 / union as f64;

        tracing::debug!(
            shared = shared.len(),
            matching,
            union,
            ratio,
            threshold = min_ratio,
            "duplicate candidate evaluated"
        );

        if ratio >= min_ratio {
            return DuplicateVerdict {
                is_duplicate: true,
                matched: Some(stored.clone()),
            };
        }
    }

    DuplicateVerdict::not_duplicate()
}
