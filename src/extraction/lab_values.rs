//! Laboratory value extraction.
//!
//! Two independent passes over the same stream, merged without overwriting:
//! a multi-line pass that recognizes a known test name on its own line and
//! scans the next few lines for value, unit and reference range, and a
//! single-line pass for `name: value [*] [unit] [range]` rows. A raw `*`
//! out-of-range marker is then reinterpreted through the clinical
//! significance table: trace findings below the medically meaningful cutoff
//! are never flagged, whatever the source document printed.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{EngineConfig, SignificanceRule};
use crate::models::{LabValue, TestCategory};

/// Test names recognized by the multi-line pass.
const KNOWN_TESTS: &[&str] = &[
    // Urinalysis
    "Colore",
    "Aspetto",
    "Limpidezza",
    "Ph",
    "PH",
    "Glucosio",
    "Proteine",
    "Emoglobina",
    "Corpi Chetonici",
    "Bilirubina",
    "Urobilinogeno",
    "Peso Specifico",
    "Densità",
    "Nitriti",
    "Esterasi Leucocitaria",
    // Hematology
    "WBC",
    "RBC",
    "HGB",
    "HCT",
    "MCV",
    "MCH",
    "MCHC",
    "RDW",
    "PLT",
    "MPV",
    "NEU",
    "LYN",
    "MON",
    "EOS",
    "BAS",
    // Chemistry and coagulation
    "GLUCOSIO",
    "CREATININA",
    "UREA",
    "SODIO",
    "POTASSIO",
    "CALCIO",
    "ALBUMINA",
    "BILIRUBINA TOTALE",
    "GOT/AST",
    "GPT/ALT",
    "CPK",
    "INR",
    "PTT",
    "PROTEINA C REATTIVA",
    "AMILASI PANCREATICA",
    "COLINESTERASI",
    "ATTIVITA' PROTROMBINICA",
];

/// Lines that are definitely not test rows: letterheads, section headers,
/// signatures, bare dates and counters.
static EXCLUDED_LINES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(A\.S\.L\.|OSPEDALE|PATOLOGIA|CLINICA|DIRETTORE|VIALE|TEL\.|EMAIL)\b",
        r"(?i)(Cod\.|Sig\.|Provenienza|C\.F\.|Nosologico|D\.Nasc\.)",
        r"(?i)(Accettato il|Refertato il|ESAME|RISULTATO|UNITA)",
        r"(?i)(IL SANITARIO RESPONSABILE|Pag\.)",
        r"(?i)(SEDIMENTO:|fine referto|\.\.\.)",
        r"^\s*[0-9]+/mm3\s*$",
        r"(?i)RIFERIMENTO\s*$",
        r"(?i)(Data:|Nome:|Età:|ID PAZIENTE|Centro Medico|Direttore)",
        r"(?i)(Data di nascita|Nato il|Nata il|Data nasc)",
        r"(?i)(Data esame|Data referto|Data del referto|Prelievo del)",
        r"(?i)\b(Via\s+\w+|www\.|\.it)\b",
        r"(?i)\b(Ecocolordopplergrafia|L'esame eseguito|ha evidenziato)\b",
        r"(?i)\b(Circolo venoso|profondo|superficiale)\b",
        r"^\s*\d{1,2}:\s*\d{1,2}\s*$",
        r"^\s*\d{1,2}/\d{1,2}/\d{4}\s*$",
        r"^\s*\d+\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("exclude pattern must compile"))
    .collect()
});

/// Qualitative findings the multi-line pass accepts as values.
const QUALITATIVE_TERMS: &[&str] = &[
    "ASSENTE",
    "ASSENTI",
    "NEGATIVO",
    "POSITIVO",
    "GIALLO",
    "PAGLIERINO",
    "VELATO",
    "LIMPIDO",
    "TORBIDO",
];

/// Wider allow-list for the single-line pass.
const VALID_QUALITATIVE: &[&str] = &[
    "ASSENTE",
    "ASSENTI",
    "NEGATIVO",
    "POSITIVO",
    "GIALLO",
    "PAGLIERINO",
    "VELATO",
    "LIMPIDO",
    "TORBIDO",
    "PRESENTE",
    "PRESENTI",
    "NORMALE",
    "ALTERATO",
    "ALTO",
    "BASSO",
];

const UNIT_TOKENS: &[&str] = &[
    "mg/dl", "g/dl", "EU/dl", "Leu/ul", "mm3", "/mm3", "%", "ng/ml", "mU/ml",
];

/// Captured names equal to one of these are demographics, not tests.
const ADMIN_FIELDS: &[&str] = &[
    "DATA",
    "NOME",
    "ETA",
    "ETÀ",
    "PAZIENTE",
    "CODICE",
    "ID",
    "VIA",
    "TEL",
    "TELEFONO",
    "EMAIL",
    "CENTRO",
    "AMBULATORIO",
    "MEDICO",
    "DOTTORE",
    "SPECIALISTA",
    "OSPEDALE",
    "CLINICA",
    "REPARTO",
    "SERVIZIO",
    "DIAGNOSI",
    "CONCLUSIONI",
];

static NUMERIC_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+[.,]?[0-9]*)\s*(\*?)").expect("numeric value pattern"));

static PURE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+[.,]?[0-9]*$").expect("pure number pattern"));

/// Single-line row shapes, in priority order.
static SINGLE_LINE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Proteine: 15 * mg/dl (0 - 10)
        r"(?i)^([A-Za-zÀ-ÿ\s]+):\s+([0-9]+[.,]?[0-9]*|\w+)\s*(\*?)\s*([a-zA-Z%/]+)?\s*(?:\(([^)]+)\))?",
        // HGB 12.5 * g/dl
        r"(?i)^(WBC|RBC|HGB|HCT|MCV|MCH|MCHC|RDW|PLT|MPV|NEU|LYN|MON|EOS|BAS)\s+([0-9]+[.,]?[0-9]*)\s*(\*?)\s*([^\s]+)?",
        // CREATININA 1.1 mg/dl 0.6 - 1.2
        r"(?i)^([A-Z][A-Za-z\s/]{2,25}?)\s+([0-9]+[.,]?[0-9]*)\s*(\*?)\s*([a-zA-Z%/]+)?\s+([0-9]+[.,]?[0-9]*\s*[-–]\s*[0-9]+[.,]?[0-9]*)",
        // UREA 32 *
        r"(?i)^([A-Z]{3,})\s+([0-9]+[.,]?[0-9]*)\s*(\*?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("single-line pattern must compile"))
    .collect()
});

/// Extract every recognizable test result from the stream, discovery order,
/// names unique per document.
pub fn extract_lab_values(text: &str, config: &EngineConfig) -> Vec<LabValue> {
    let lines: Vec<&str> = text.lines().collect();
    let mut values: Vec<LabValue> = Vec::new();

    multi_line_pass(&lines, config, &mut values);
    single_line_pass(&lines, config, &mut values);

    tracing::debug!(count = values.len(), "laboratory values extracted");
    values
}

fn multi_line_pass(lines: &[&str], config: &EngineConfig, values: &mut Vec<LabValue>) {
    for (index, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.len() < 2 || is_excluded(line) {
            continue;
        }

        let Some(test_name) = match_known_test(line) else {
            continue;
        };

        let mut value: Option<String> = None;
        let mut unit: Option<String> = None;
        let mut reference: Option<String> = None;
        let mut abnormal = false;

        for next_raw in lines.iter().skip(index + 1).take(4) {
            let next_line = next_raw.trim();
            if next_line.is_empty() {
                continue;
            }
            // Another test name ends this window.
            if KNOWN_TESTS
                .iter()
                .any(|t| next_line.to_uppercase() == t.to_uppercase())
            {
                break;
            }

            if value.is_none() {
                if let Some(captures) = NUMERIC_VALUE.captures(next_line) {
                    value = Some(captures[1].to_string());
                    if &captures[2] == "*" {
                        abnormal = true;
                    }
                } else {
                    let upper = next_line.to_uppercase();
                    if QUALITATIVE_TERMS.iter().any(|q| upper.contains(q)) {
                        value = Some(next_line.to_string());
                        abnormal = next_line.contains('*');
                    }
                }
            } else if unit.is_none()
                && next_line.len() < 15
                && UNIT_TOKENS.iter().any(|u| next_line.contains(u))
            {
                unit = Some(next_line.to_string());
            } else if reference.is_none()
                && (next_line.contains('-')
                    || matches!(next_line.to_uppercase().as_str(), "ASSENTE" | "ASSENTI"))
            {
                reference = Some(next_line.to_string());
            }
        }

        if let Some(value) = value {
            push_unique(
                values,
                test_name,
                value,
                unit.unwrap_or_default(),
                reference.unwrap_or_default(),
                abnormal,
                config,
            );
        }
    }
}

fn single_line_pass(lines: &[&str], config: &EngineConfig, values: &mut Vec<LabValue>) {
    for raw_line in lines {
        let line = raw_line.trim();
        if line.len() < 5 || is_excluded(line) {
            continue;
        }

        for rule in SINGLE_LINE_RULES.iter() {
            let Some(captures) = rule.captures(line) else {
                continue;
            };

            let name = captures
                .get(1)
                .map_or("", |m| m.as_str())
                .replace(':', " ")
                .trim()
                .to_string();
            let value = captures.get(2).map_or("", |m| m.as_str()).trim().to_string();
            let flag = captures.get(3).map_or("", |m| m.as_str());
            let unit = captures.get(4).map_or("", |m| m.as_str()).to_string();
            let reference = captures.get(5).map_or("", |m| m.as_str()).to_string();

            if name.len() < 2
                || name.chars().all(|c| c.is_ascii_digit())
                || ADMIN_FIELDS.contains(&name.to_uppercase().as_str())
            {
                continue;
            }

            // Qualitative values must come from the clinical allow-list.
            if !PURE_NUMBER.is_match(&value) {
                let upper = value.to_uppercase();
                if !VALID_QUALITATIVE.iter().any(|q| upper.contains(q)) {
                    continue;
                }
            }

            let abnormal = flag == "*" || line.contains('*');
            push_unique(values, &name, value, unit, reference, abnormal, config);
            break;
        }
    }
}

fn push_unique(
    values: &mut Vec<LabValue>,
    name: &str,
    value: String,
    unit: String,
    reference: String,
    raw_abnormal: bool,
    config: &EngineConfig,
) {
    if values
        .iter()
        .any(|v| v.name.eq_ignore_ascii_case(name))
    {
        return;
    }
    let abnormal =
        apply_clinical_significance(name, &value, &unit, raw_abnormal, &config.significance);
    values.push(LabValue {
        name: name.to_string(),
        value,
        unit,
        reference_range: reference,
        abnormal,
        category: determine_test_category(name),
    });
}

fn is_excluded(line: &str) -> bool {
    EXCLUDED_LINES.iter().any(|rule| rule.is_match(line))
}

fn match_known_test(line: &str) -> Option<&'static str> {
    let upper = line.to_uppercase();
    for known in KNOWN_TESTS {
        let known_upper = known.to_uppercase();
        if upper == known_upper {
            return Some(known);
        }
        if let Some(rest) = upper.strip_prefix(&known_upper) {
            // A value on the same line belongs to the single-line pass.
            if (rest.starts_with(' ') || rest.starts_with('\t'))
                && !NUMERIC_VALUE.is_match(rest)
            {
                return Some(known);
            }
        }
    }
    None
}

/// Reinterpret the raw out-of-range marker through the per-test threshold
/// table. Values at or below the cutoff are never abnormal; non-numeric
/// values keep the marker the document printed.
fn apply_clinical_significance(
    name: &str,
    value: &str,
    unit: &str,
    raw_abnormal: bool,
    rules: &[SignificanceRule],
) -> bool {
    let Some(numeric) = parse_decimal(value) else {
        return raw_abnormal;
    };
    let name_upper = name.to_uppercase();
    let unit_lower = unit.to_lowercase();

    for rule in rules {
        let name_matches = rule.name_terms.iter().all(|t| name_upper.contains(t));
        let unit_matches = rule.unit_term.map_or(true, |u| unit_lower.contains(u));
        if name_matches && unit_matches {
            if numeric <= rule.normal_max {
                return false;
            }
            if numeric > rule.marked_min {
                tracing::debug!(test = %name, value = numeric, "markedly abnormal value");
            }
            return true;
        }
    }
    raw_abnormal
}

fn parse_decimal(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse().ok()
}

fn determine_test_category(name: &str) -> TestCategory {
    let upper = name.to_uppercase();

    const HEMATOLOGY: &[&str] = &[
        "WBC",
        "RBC",
        "HGB",
        "HCT",
        "PLT",
        "NEU",
        "LYN",
        "MON",
        "EOS",
        "BAS",
        "MCV",
        "MCH",
        "MCHC",
        "RDW",
        "MPV",
        "NEUTROFILI",
        "LINFOCITI",
        "MONOCITI",
        "EOSINOFILI",
        "BASOFILI",
        "GLOBULI",
        "EMATOCRITO",
        "PIASTRINE",
        "FORMULA LEUCOCITARIA",
        "EMOCROMOCITOMETRICO",
    ];
    const COAGULATION: &[&str] = &[
        "PROTROMBINICA",
        "INR",
        "PTT",
        "RATIO",
        "FIBRINOGENO",
        "COAGULAZIONE",
    ];
    const URINALYSIS: &[&str] = &[
        "COLORE",
        "ASPETTO",
        "PH",
        "PESO SPECIFICO",
        "LIMPIDEZZA",
        "DENSITÀ",
        "NITRITI",
        "ESTERASI",
        "CILINDRI",
        "CORPI CHETONICI",
        "UROBILINOGENO",
        "SEDIMENTO",
        "EMOGLOBINA",
        "PROTEINE",
    ];

    if HEMATOLOGY.iter().any(|t| upper.contains(t)) {
        TestCategory::Hematology
    } else if COAGULATION.iter().any(|t| upper.contains(t)) {
        TestCategory::Coagulation
    } else if URINALYSIS.iter().any(|t| upper.contains(t)) {
        TestCategory::Urinalysis
    } else {
        TestCategory::Chemistry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn find<'a>(values: &'a [LabValue], name: &str) -> &'a LabValue {
        values
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .unwrap_or_else(|| panic!("value {name} not extracted"))
    }

    #[test]
    fn multiline_block_with_unit_and_reference() {
        let text = "Emoglobina\n6,00 *\nmg/dl\nASSENTE\nGlucosio\nASSENTE";
        let values = extract_lab_values(text, &config());

        let hemoglobin = find(&values, "Emoglobina");
        assert_eq!(hemoglobin.value, "6,00");
        assert_eq!(hemoglobin.unit, "mg/dl");
        assert_eq!(hemoglobin.reference_range, "ASSENTE");
        assert!(hemoglobin.abnormal);

        let glucose = find(&values, "Glucosio");
        assert_eq!(glucose.value, "ASSENTE");
        assert!(!glucose.abnormal);
    }

    #[test]
    fn multiline_window_stops_at_next_test_name() {
        // PLT's window must not steal WBC's value
        let text = "PLT\nWBC\n7.2";
        let values = extract_lab_values(text, &config());
        assert!(values.iter().all(|v| v.name != "PLT"));
        assert_eq!(find(&values, "WBC").value, "7.2");
    }

    #[test]
    fn single_line_italian_format() {
        let text = "Proteine: 45 * mg/dl (0 - 10)";
        let values = extract_lab_values(text, &config());
        let protein = find(&values, "Proteine");
        assert_eq!(protein.value, "45");
        assert_eq!(protein.unit, "mg/dl");
        assert_eq!(protein.reference_range, "0 - 10");
        assert!(protein.abnormal);
        assert_eq!(protein.category, TestCategory::Urinalysis);
    }

    #[test]
    fn single_line_hematology_format() {
        let text = "HGB 12.5 g/dl\nPLT 250 *";
        let values = extract_lab_values(text, &config());
        assert_eq!(find(&values, "HGB").value, "12.5");
        assert_eq!(find(&values, "HGB").category, TestCategory::Hematology);
        assert!(find(&values, "PLT").abnormal);
    }

    #[test]
    fn first_discovery_wins_between_passes() {
        // Multi-line pass finds Proteine first; the single-line row for the
        // same test must not overwrite it.
        let text = "Proteine\n15\nmg/dl\nProteine: 99 mg/dl";
        let values = extract_lab_values(text, &config());
        assert_eq!(find(&values, "Proteine").value, "15");
        assert_eq!(values.iter().filter(|v| v.name == "Proteine").count(), 1);
    }

    #[test]
    fn administrative_lines_are_ignored() {
        let text = "Data: 01/02/2024\nTel. 081 555 nnn\nEtà: 64\nCREATININA 1.1 mg/dl 0.6 - 1.2";
        let values = extract_lab_values(text, &config());
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].name, "CREATININA");
        assert_eq!(values[0].reference_range, "0.6 - 1.2");
    }

    #[test]
    fn qualitative_value_outside_allowlist_rejected() {
        let text = "Conclusioni: buone\nColore: GIALLO";
        let values = extract_lab_values(text, &config());
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "GIALLO");
    }

    // ── Clinical-significance override ──────────────────────────────

    #[test]
    fn trace_hemoglobin_at_cutoff_not_flagged() {
        // Starred by the source document, but at the trace cutoff
        let text = "Emoglobina: 1,0 * mg/dl";
        let values = extract_lab_values(text, &config());
        assert!(!find(&values, "Emoglobina").abnormal);
    }

    #[test]
    fn hemoglobin_above_cutoff_is_flagged() {
        // One unit above the cutoff, not starred: flagged anyway
        let text = "Emoglobina: 2,0 mg/dl";
        let values = extract_lab_values(text, &config());
        assert!(find(&values, "Emoglobina").abnormal);
    }

    #[test]
    fn protein_override_uses_its_own_cutoff() {
        let normal = extract_lab_values("Proteine: 10 * mg/dl", &config());
        assert!(!find(&normal, "Proteine").abnormal);
        let high = extract_lab_values("Proteine: 45 mg/dl", &config());
        assert!(find(&high, "Proteine").abnormal);
    }

    #[test]
    fn non_numeric_value_keeps_raw_marker() {
        let text = "Emoglobina\nASSENTE *\nmg/dl";
        let values = extract_lab_values(text, &config());
        assert!(find(&values, "Emoglobina").abnormal);
    }

    #[test]
    fn categories_follow_test_names() {
        assert_eq!(determine_test_category("WBC"), TestCategory::Hematology);
        assert_eq!(determine_test_category("INR"), TestCategory::Coagulation);
        assert_eq!(
            determine_test_category("Peso Specifico"),
            TestCategory::Urinalysis
        );
        assert_eq!(determine_test_category("CREATININA"), TestCategory::Chemistry);
    }
}
