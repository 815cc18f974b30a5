//! Report category classification.
//!
//! Counts distinct keyword-family hits (laboratory, imaging, pathology) over
//! title and body, boosts the laboratory score when the text is dense with
//! structured name-number-unit rows, and picks the strictly best family above
//! a minimum score. Laboratory wins ties and is the final default: laboratory
//! processing is the most conservative path, since it produces findings only
//! from explicit numeric evidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ReportCategory;

const LABORATORY_KEYWORDS: &[&str] = &[
    // Common test names
    "GLUCOSIO",
    "CREATININA",
    "UREA",
    "SODIO",
    "POTASSIO",
    "CALCIO",
    "EMOGLOBINA",
    "EMATOCRITO",
    "GLOBULI",
    "LEUCOCITI",
    "PIASTRINE",
    "WBC",
    "RBC",
    "HGB",
    "HCT",
    "PLT",
    "MCV",
    "MCH",
    "MCHC",
    "GOT",
    "GPT",
    "AST",
    "ALT",
    "BILIRUBINA",
    "ALBUMINA",
    "PROTEINE URINE",
    "SEDIMENTO",
    "ESTERASI",
    "NITRITI",
    "INR",
    "PTT",
    "PROTROMBINICA",
    "COAGULAZIONE",
    // Panel headers
    "ESAME EMOCROMOCITOMETRICO",
    "CHIMICA CLINICA",
    "BIOCHIMICA",
    "ESAME CHIMICO FISICO",
    "FORMULA LEUCOCITARIA",
    "SIEROLOGIA",
    "IMMUNOLOGIA",
    "ORMONI",
    "MARCATORI TUMORALI",
];

const IMAGING_KEYWORDS: &[&str] = &[
    // Modalities
    "RADIOGRAFIA",
    "ECOGRAFIA",
    "ECOCOLORDOPPLERGRAFIA",
    "DOPPLER",
    "TAC",
    "RISONANZA MAGNETICA",
    "RMN",
    "MAMMOGRAFIA",
    "DENSITOMETRIA",
    "SCINTIGRAFIA",
    // Imaging-specific wording
    "REFERTO RADIOLOGICO",
    "REFERTO DI RADIOLOGIA",
    "IMAGING",
    "CONTRASTO",
    "MDC",
    "MEZZO DI CONTRASTO",
    // Commonly imaged regions
    "TORACE",
    "ADDOME",
    "PELVI",
    "CRANIO",
    "ENCEFALO",
    "ARTI INFERIORI",
    "ARTI SUPERIORI",
    "TRONCHI SOVRAORTICI",
    // Findings terminology
    "OPACITÀ",
    "ADDENSAMENTO",
    "VERSAMENTO",
    "MASSA",
    "NODULO",
    "STENOSI",
    "DILATAZIONE",
    "ISPESSIMENTO",
    "CALCIFICAZIONE",
];

const PATHOLOGY_KEYWORDS: &[&str] = &[
    // Procedures
    "ESAME ISTOLOGICO",
    "ESAME CITOLOGICO",
    "ESAME ANATOMO",
    "BIOPSIA",
    "AGOBIOPSIA",
    "PAP TEST",
    "CITOLOGIA",
    // Staining and techniques
    "EMATOSSILINA",
    "IMMUNOISTOCHIMICA",
    "COLORAZIONE",
    "PREPARATO ISTOLOGICO",
    "SEZIONI ISTOLOGICHE",
    // Findings
    "DISPLASIA",
    "METAPLASIA",
    "NEOPLASIA",
    "CARCINOMA",
    "ADENOMA",
    "IPERPLASIA",
    "ATROFIA",
    "INFIAMMAZIONE CRONICA",
    "FIBROSI",
    // Report headers
    "ANATOMIA PATOLOGICA",
    "REFERTO ISTOLOGICO",
    "REFERTO CITOLOGICO",
    "DIAGNOSI ISTOLOGICA",
    "DIAGNOSI CITOLOGICA",
    "REFERTO ANATOMO",
];

/// Structured rows that signal tabular laboratory data: `TEST: 123 mg/dl`,
/// `HGB 12.5 g/dl`, and bare `low - high` reference ranges.
static DENSITY_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b[A-Z][A-Z\s]+\s*[:=]\s*[0-9]+[.,]?[0-9]*\s*[a-zA-Z/%]*",
        r"\b[A-Z]{2,}\s*[0-9]+[.,]?[0-9]*\s*[a-zA-Z/%]*",
        r"[0-9]+[.,]?[0-9]*\s*[-–]\s*[0-9]+[.,]?[0-9]*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("density pattern must compile"))
    .collect()
});

/// Minimum family score to qualify.
const MIN_FAMILY_SCORE: usize = 2;

/// Structured-row count that triggers the laboratory bonus, and the bonus.
const DENSITY_BONUS_TRIGGER: usize = 3;
const DENSITY_BONUS: usize = 5;

/// Density count that already implies laboratory in the fallback check.
const DENSITY_FALLBACK_MIN: usize = 2;

pub fn classify_report(text: &str, exam_title: &str) -> ReportCategory {
    let text_upper = text.to_uppercase();
    let title_upper = exam_title.to_uppercase();

    let hits = |keywords: &[&str]| {
        keywords
            .iter()
            .filter(|kw| text_upper.contains(**kw) || title_upper.contains(**kw))
            .count()
    };

    let mut laboratory = hits(LABORATORY_KEYWORDS);
    let imaging = hits(IMAGING_KEYWORDS);
    let pathology = hits(PATHOLOGY_KEYWORDS);

    let density: usize = DENSITY_RULES
        .iter()
        .map(|rule| rule.find_iter(text).count())
        .sum();
    if density >= DENSITY_BONUS_TRIGGER {
        laboratory += DENSITY_BONUS;
    }

    tracing::debug!(
        laboratory,
        imaging,
        pathology,
        density,
        "report classification scores"
    );

    if laboratory >= MIN_FAMILY_SCORE && laboratory >= imaging && laboratory >= pathology {
        ReportCategory::Laboratory
    } else if imaging >= MIN_FAMILY_SCORE && imaging >= pathology {
        ReportCategory::Imaging
    } else if pathology >= MIN_FAMILY_SCORE {
        ReportCategory::Pathology
    } else if density >= DENSITY_FALLBACK_MIN {
        ReportCategory::Laboratory
    } else if ["ECOGRAFIA", "RADIOGRAFIA", "TAC", "RISONANZA"]
        .iter()
        .any(|kw| text_upper.contains(kw))
    {
        ReportCategory::Imaging
    } else if ["ISTOLOGICO", "CITOLOGICO", "BIOPSIA"]
        .iter()
        .any(|kw| text_upper.contains(kw))
    {
        ReportCategory::Pathology
    } else {
        ReportCategory::Laboratory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_lab_keywords_always_classify_laboratory() {
        // Regardless of keyword order, and with no competing families
        let texts = [
            "glucosio creatinina urea",
            "urea glucosio creatinina",
            "creatinina urea glucosio",
        ];
        for text in texts {
            assert_eq!(
                classify_report(text, ""),
                ReportCategory::Laboratory,
                "failed for: {text}"
            );
        }
    }

    #[test]
    fn imaging_report_with_findings() {
        let text = "ECOCOLORDOPPLERGRAFIA dei tronchi sovraortici: stenosi al bulbo carotideo, ispessimento medio-intimale.";
        assert_eq!(classify_report(text, ""), ReportCategory::Imaging);
    }

    #[test]
    fn pathology_report_with_diagnosis() {
        let text =
            "ESAME ISTOLOGICO su biopsia gastrica: metaplasia intestinale, infiammazione cronica.";
        assert_eq!(classify_report(text, ""), ReportCategory::Pathology);
    }

    #[test]
    fn title_contributes_to_the_score() {
        assert_eq!(
            classify_report("referto in esito", "Esame Istologico Biopsia"),
            ReportCategory::Pathology
        );
    }

    #[test]
    fn structured_density_boosts_laboratory() {
        // No family keyword wins outright, but the text is full of
        // name-number rows
        let text = "AZR: 12 mg\nBNX: 3.4 %\nCWQ: 8,1\n1.0 - 2.0";
        assert_eq!(classify_report(text, ""), ReportCategory::Laboratory);
    }

    #[test]
    fn laboratory_wins_ties() {
        // One keyword from each of laboratory and imaging families, twice
        let text = "GLUCOSIO CREATININA TORACE ADDOME";
        assert_eq!(classify_report(text, ""), ReportCategory::Laboratory);
    }

    #[test]
    fn empty_text_defaults_to_laboratory() {
        assert_eq!(classify_report("", ""), ReportCategory::Laboratory);
    }
}
