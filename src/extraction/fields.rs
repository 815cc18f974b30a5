//! Best-effort extraction of the identity fields: fiscal code, patient name,
//! birth date, exam date. Each field walks its own rule table and returns the
//! first candidate that survives validation; no rule match means the field is
//! simply absent.

use std::collections::BTreeMap;

use regex::Regex;

use super::dates::normalize_date;
use super::patterns::{
    title_case, ACCEPTANCE_DATE_RULES, BIRTH_DATE_RULES, EXAM_DATE_RULES, EXECUTION_DATE_RULES,
    FISCAL_CODE_BARE, FISCAL_CODE_LABELED, FISCAL_CODE_STRICT, NAME_DENYLIST, NAME_RULES,
    REPORTING_DATE_RULES,
};
use crate::config::EngineConfig;
use crate::models::DatedEvents;

/// Earliest plausible birth year; the upper bound is the present.
const BIRTH_YEAR_MIN: i32 = 1900;

/// Search the character stream *and* the document property bag for a fiscal
/// code: the labeled form first, then a label-less scan. Whitespace inside a
/// candidate is stripped before the 16-character template check, so
/// `RSSMRA 85T10 A562S` and `RSSMRA85T10A562S` normalize identically.
pub fn extract_fiscal_code(
    text: &str,
    properties: &BTreeMap<String, String>,
) -> Option<String> {
    let property_blob = properties
        .values()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    let sources = [text, property_blob.as_str()];

    for source in sources {
        // Non-breaking spaces and line breaks would split an otherwise
        // contiguous code.
        let flattened = source.replace('\u{a0}', " ").replace('\n', " ");

        if let Some(captures) = FISCAL_CODE_LABELED.captures(&flattened) {
            if let Some(code) = validate_code(captures.get(1).map_or("", |m| m.as_str())) {
                return Some(code);
            }
        }
    }

    // Looser pass: any code-shaped run, labeled or not.
    for source in sources {
        let flattened = source.replace('\u{a0}', " ").replace('\n', " ");
        for m in FISCAL_CODE_BARE.find_iter(&flattened) {
            if let Some(code) = validate_code(m.as_str()) {
                return Some(code);
            }
        }
    }

    None
}

fn validate_code(candidate: &str) -> Option<String> {
    let compact: String = candidate
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if compact.len() == 16 && FISCAL_CODE_STRICT.is_match(&compact) {
        Some(compact)
    } else {
        None
    }
}

/// Walk the name rules and accept the first candidate that looks like a
/// person: 3–50 characters, no digits, only letters/space/apostrophe/hyphen,
/// and no administrative word from the denylist.
pub fn extract_patient_name(text: &str) -> Option<String> {
    for rule in NAME_RULES.iter() {
        let Some(captures) = rule.captures(text) else {
            continue;
        };
        let raw = captures.get(1).map_or("", |m| m.as_str());
        let cleaned = title_case(raw.split_whitespace().collect::<Vec<_>>().join(" ").trim());

        if is_plausible_name(&cleaned) {
            tracing::debug!(name = %cleaned, "patient name accepted");
            return Some(cleaned);
        }
        tracing::debug!(candidate = %cleaned, "patient name candidate rejected");
    }
    None
}

fn is_plausible_name(candidate: &str) -> bool {
    if !(3..=50).contains(&candidate.chars().count()) {
        return false;
    }
    if candidate.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if !candidate
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-')
    {
        return false;
    }
    !candidate
        .split_whitespace()
        .any(|word| NAME_DENYLIST.contains(&word.to_uppercase().as_str()))
}

/// Birth date: labeled rules, pivot normalization, 1900..=present window.
pub fn extract_birth_date(text: &str, config: &EngineConfig) -> Option<String> {
    first_valid_date(text, &BIRTH_DATE_RULES, BIRTH_YEAR_MIN, config.exam_year_max)
}

/// Exam date: labeled rules down to a bare-date fallback, constrained to the
/// configured plausibility window.
pub fn extract_exam_date(text: &str, config: &EngineConfig) -> Option<String> {
    first_valid_date(text, &EXAM_DATE_RULES, config.exam_year_min, config.exam_year_max)
}

/// The three dated events a report can carry, each resolved independently.
pub fn extract_dated_events(text: &str, config: &EngineConfig) -> DatedEvents {
    DatedEvents {
        exam_date: first_valid_date(
            text,
            &EXECUTION_DATE_RULES,
            config.exam_year_min,
            config.exam_year_max,
        ),
        report_date: first_valid_date(
            text,
            &REPORTING_DATE_RULES,
            config.exam_year_min,
            config.exam_year_max,
        ),
        acceptance_date: first_valid_date(
            text,
            &ACCEPTANCE_DATE_RULES,
            config.exam_year_min,
            config.exam_year_max,
        ),
    }
}

fn first_valid_date(text: &str, rules: &[Regex], year_min: i32, year_max: i32) -> Option<String> {
    for rule in rules {
        for captures in rule.captures_iter(text) {
            let raw = captures.get(1).map_or("", |m| m.as_str());
            if let Some(normalized) = normalize_date(raw, year_min, year_max) {
                return Some(normalized);
            }
            // Out-of-range or malformed capture: let the cascade continue.
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            exam_year_max: 2026,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn fiscal_code_with_whitespace_normalizes_like_compact_form() {
        let spaced = extract_fiscal_code(
            "Paziente Sig. Rossi\nC.F. RSSMRA 85T10 A562S\n",
            &BTreeMap::new(),
        );
        let compact = extract_fiscal_code(
            "Paziente Sig. Rossi\nC.F. RSSMRA85T10A562S\n",
            &BTreeMap::new(),
        );
        assert_eq!(spaced.as_deref(), Some("RSSMRA85T10A562S"));
        assert_eq!(spaced, compact);
    }

    #[test]
    fn fiscal_code_found_in_document_properties_only() {
        let mut properties = BTreeMap::new();
        properties.insert("subject".into(), "referto di bncgnn70a41f839k".into());
        let code = extract_fiscal_code("Nessun codice nel testo.", &properties);
        assert_eq!(code.as_deref(), Some("BNCGNN70A41F839K"));
    }

    #[test]
    fn unlabeled_code_is_still_found() {
        let code = extract_fiscal_code(
            "AZIENDA OSPEDALIERA\nVRDLGU62M15H501B\nESAME EMOCROMOCITOMETRICO",
            &BTreeMap::new(),
        );
        assert_eq!(code.as_deref(), Some("VRDLGU62M15H501B"));
    }

    #[test]
    fn invalid_code_is_not_coerced_into_a_value() {
        // 15 characters: template violation, must yield absence
        let code = extract_fiscal_code("C.F. RSSMRA85T10A562", &BTreeMap::new());
        assert_eq!(code, None);
    }

    #[test]
    fn name_from_salutation_stops_at_fiscal_code_label() {
        let name = extract_patient_name("Sig. MARIO ROSSI C.F. RSSMRA85T10A562S");
        assert_eq!(name.as_deref(), Some("Mario Rossi"));
    }

    #[test]
    fn name_from_label() {
        let name = extract_patient_name("Paziente: BIANCHI LUCIA\nD.Nasc. 02/03/1961");
        assert_eq!(name.as_deref(), Some("Bianchi Lucia"));
    }

    #[test]
    fn administrative_captures_are_rejected() {
        assert_eq!(extract_patient_name("Nome: Centro Medico\n"), None);
    }

    #[test]
    fn birth_date_two_digit_year_pivots_to_1900s() {
        let date = extract_birth_date("Data di nascita: 10/05/58", &config());
        assert_eq!(date.as_deref(), Some("10/05/1958"));
    }

    #[test]
    fn exam_date_outside_window_falls_to_next_rule() {
        // The labeled capture is implausibly old; the bare-date fallback
        // then finds the plausible one.
        let text = "Data esame: 01/01/1950\nRefertato il 05/06/2023";
        let date = extract_exam_date(text, &config());
        assert_eq!(date.as_deref(), Some("05/06/2023"));
    }

    #[test]
    fn dated_events_extracted_independently() {
        let text = "Prelievo del 01/02/2024\nRefertato il 03/02/2024\nAccettato il 31/01/2024";
        let events = extract_dated_events(text, &config());
        assert_eq!(events.exam_date.as_deref(), Some("01/02/2024"));
        assert_eq!(events.report_date.as_deref(), Some("03/02/2024"));
        assert_eq!(events.acceptance_date.as_deref(), Some("31/01/2024"));
        assert_eq!(events.effective(), Some("03/02/2024"));
    }

    #[test]
    fn missing_fields_are_absent_not_errors() {
        let empty = "";
        assert_eq!(extract_fiscal_code(empty, &BTreeMap::new()), None);
        assert_eq!(extract_patient_name(empty), None);
        assert_eq!(extract_birth_date(empty, &config()), None);
        assert_eq!(extract_exam_date(empty, &config()), None);
    }
}
