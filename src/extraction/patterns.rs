//! Prioritized pattern tables for field extraction.
//!
//! Every cascade is data: an ordered list of compiled rules walked generically
//! by the extractors. New clinical phrasings are added here, not as new
//! branches in the extraction code.

use std::sync::LazyLock;

use regex::Regex;

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern table entry must compile")
}

// ═══════════════════════════════════════════════════════════
// Fiscal code
// ═══════════════════════════════════════════════════════════

/// Labeled form: `Codice Fiscale`, `C.F.`, `CF` followed by the 16-character
/// code, possibly with internal whitespace.
pub static FISCAL_CODE_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)(?:C(?:ODICE)?\s*F(?:ISCALE)?|C\.F\.)[:.\s-]{0,5}([A-Z]{6}\s*\d{2}\s*[A-Z]\s*\d{2}\s*[A-Z]\s*\d{3}\s*[A-Z])")
});

/// Label-less scan for codes floating in headers or document properties.
pub static FISCAL_CODE_BARE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?i)[A-Z]{6}\s*\d{2}\s*[A-Z]\s*\d{2}\s*[A-Z]\s*\d{3}\s*[A-Z]"));

/// The invariant form: 6 letters, 2 digits, letter, 2 digits, letter,
/// 3 digits, letter — exactly 16 characters, no whitespace.
pub static FISCAL_CODE_STRICT: LazyLock<Regex> =
    LazyLock::new(|| rx(r"^[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]$"));

// ═══════════════════════════════════════════════════════════
// Patient name
// ═══════════════════════════════════════════════════════════

/// Ordered name rules: explicit `Nome:` header first, then salutations, then
/// generic labels, then labels with the name on the following line. Every
/// rule is anchored to stop at the next label, digit run or line break so it
/// never swallows trailing content.
pub static NAME_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        rx(r"(?im)Nome:\s+([A-ZÀ-Ý][a-zà-ÿ]+(?:\s+[A-ZÀ-Ý][a-zà-ÿ]+)+?)\s*(?:\n|$|Età|Age)"),
        rx(r"(?im)(?:Signor[ae]?|Sig\.?\s*ra|Sig\.?|Dott\.?\s*ssa|Dott\.?|Dr\.?\s*ssa|Dr\.?|Prof\.?)\s+([A-ZÀ-ÿ]+(?:\s+[A-ZÀ-ÿ]+)*?)\s*(?:\n|$|D\.|C\.F\.|\d|Età)"),
        rx(r"(?im)(?:Nome e cognome|Nominativo|Paziente|Patient|Nome|Cognome|Assistito|Soggetto|Intestato a|Destinatario|Richiedente)[\s:.-]+([A-ZÀ-ÿ][A-Za-zà-ÿ]*(?:\s+[A-ZÀ-ÿ][A-Za-zà-ÿ]*)*?)\s*(?:\n|$|D\.|C\.F\.|\d|Età|Age)"),
        rx(r"(?im)(?:Nome|Paziente)[\s:.-]*\n\s*([A-ZÀ-ÿ]+(?:\s+[A-ZÀ-ÿ]+)?)\s*(?:\n|$)"),
    ]
});

/// A candidate containing any of these words is an administrative capture,
/// not a person.
pub const NAME_DENYLIST: &[&str] = &["DATA", "CENTRO", "MEDICO", "VIA", "TEL", "DOTT"];

// ═══════════════════════════════════════════════════════════
// Dates
// ═══════════════════════════════════════════════════════════

const DATE_CAPTURE: &str = r"([0-9]{1,2}[/.-][0-9]{1,2}[/.-][0-9]{2,4})";

fn labeled_date(labels: &str) -> Regex {
    rx(&format!(r"(?i)(?:{labels})[\s:.-]*{DATE_CAPTURE}"))
}

/// Birth-date rules, most explicit label first.
pub static BIRTH_DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        labeled_date(r"D\.?\s*Nasc\.?|Data di nascita|Nato il|Nata il"),
        labeled_date(r"DN|d\.n\.|D\.N\."),
        labeled_date(r"Nascita|Birth|Born"),
        labeled_date(r"Data nasc\.?|D\.nasc\.?|Data nascita|D\.nascita"),
        labeled_date(r"Nato/a il|Nato/a in data"),
        rx(&format!(
            r"(?i)(?:Luogo e data di nascita).*?{DATE_CAPTURE}"
        )),
        rx(&format!(r"(?i)(?:Nat[oa] a).*?(?:il)[\s:.-]*{DATE_CAPTURE}")),
        rx(&format!(
            r"(?i)(?:D\.?\s*Nasc\.?|Data di nascita)[\s:.-]*\n\s*{DATE_CAPTURE}"
        )),
    ]
});

/// Exam/report date rules: reporting labels, execution labels, healthcare
/// service phrasings, administrative phrasings, then a bare 4-digit-year date
/// as the last resort.
pub static EXAM_DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        labeled_date(r"Data esame|Data referto|Data del referto|Data"),
        labeled_date(r"Refertato il|Refertazione"),
        labeled_date(r"Eseguito il|Effettuato il|Eseguito in data"),
        labeled_date(r"In data|Il giorno|Nella giornata del"),
        labeled_date(r"Prestazione del|Prestazione effettuata il"),
        labeled_date(r"Visitato il|Visita del|Visita effettuata il"),
        labeled_date(r"Controllo del|Controllo effettuato il"),
        labeled_date(r"Prelievo del|Prelievo effettuato il|Campionamento"),
        labeled_date(r"Analisi del|Analisi effettuate il"),
        labeled_date(r"Accettazione|Accettato il|Ricevuto il"),
        labeled_date(r"Registrato il|Protocollato il"),
        labeled_date(r"Emesso il|Stampato il|Rilasciato il"),
        rx(&format!(
            r"(?i)(?:Data|Data esame|Refertato il)[\s:.-]*\n\s*{DATE_CAPTURE}"
        )),
        rx(r"([0-9]{1,2}[/.-][0-9]{1,2}[/.-][0-9]{4})"),
    ]
});

/// Rules for the three distinct dated events a report can carry.
/// First match per kind wins.
pub static EXECUTION_DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        labeled_date(r"Data esame|Data del esame"),
        labeled_date(r"Eseguito il|Effettuato il"),
        labeled_date(r"Prelievo effettuato il|Prelievo del|Prelievo"),
    ]
});

pub static REPORTING_DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        labeled_date(r"Refertato il|Refertazione"),
        labeled_date(r"Data referto|Data del referto"),
    ]
});

pub static ACCEPTANCE_DATE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        labeled_date(r"Accettato il|Accettazione"),
        labeled_date(r"Ricevuto il|Data accettazione"),
    ]
});

// ═══════════════════════════════════════════════════════════
// Exam title
// ═══════════════════════════════════════════════════════════

/// Specific clinical phrase templates, most specific first within each
/// family: laboratory panels, imaging studies (qualified anatomical variants
/// before the bare modality), then tissue pathology.
pub static TITLE_TEMPLATES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Laboratory panels
        r"ESAME\s+CHIMICO\s+FISICO\s+DELLE?\s+URINE?",
        r"ESAME\s+EMOCROMOCITOMETRICO",
        r"ESAME\s+BATTERIOLOGICO",
        r"ESAME\s+MICROSCOPICO",
        r"FORMULA\s+LEUCOCITARIA",
        r"CHIMICA\s+CLINICA",
        r"EMOCROMO\s+COMPLETO",
        r"PROFILO\s+LIPIDICO",
        r"FUNZIONALITÀ\s+EPATICA",
        r"FUNZIONALITÀ\s+RENALE",
        r"MARKERS?\s+TUMORALI",
        r"ORMONI\s+TIROIDEI",
        r"COAGULAZIONE",
        // Color-doppler studies, anatomical qualifications first
        r"ECOCOLORDOPPLERGRAFIA\s+DEGLI\s+ARTI\s+INFERIORI\s+ARTERIOSO",
        r"ECOCOLORDOPPLERGRAFIA\s+DEGLI\s+ARTI\s+INFERIORI\s+VENOSO",
        r"ECOCOLORDOPPLERGRAFIA\s+DEGLI\s+ARTI\s+SUPERIORI\s+ARTERIOSO",
        r"ECOCOLORDOPPLERGRAFIA\s+DEGLI\s+ARTI\s+SUPERIORI\s+VENOSO",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DEI\s+)?TRONCHI\s+SOVRAORTICI",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DELL')?AORTA\s+ADDOMINALE",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DELLE\s+)?ARTERIE\s+RENALI",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DEL\s+)?SISTEMA\s+VENOSO\s+PROFONDO",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DELLE\s+)?CAROTIDI",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:DELLE\s+)?ARTERIE\s+VERTEBRALI",
        r"ECOCOLORDOPPLERGRAFIA\s+CARDIACA",
        r"ECOCOLORDOPPLERGRAFIA\s+(?:ARTI\s+)?(?:INFERIORI|SUPERIORI)",
        r"ECOCOLORDOPPLERGRAFIA",
        // Ultrasound
        r"ECOGRAFIA\s+(?:DELL')?ADDOME\s+COMPLETO",
        r"ECOGRAFIA\s+(?:DELL')?ADDOME\s+SUPERIORE",
        r"ECOGRAFIA\s+(?:DELL')?ADDOME\s+INFERIORE",
        r"ECOGRAFIA\s+(?:DELLA\s+)?PELVI\s+TRANSVAGINALE",
        r"ECOGRAFIA\s+(?:DELLA\s+)?PELVI\s+TRANSADDOMINALE",
        r"ECOGRAFIA\s+(?:DELLA\s+)?TIROIDE",
        r"ECOGRAFIA\s+(?:DEL\s+)?COLLO",
        r"ECOGRAFIA\s+(?:DELLE\s+)?MAMMELLE",
        r"ECOGRAFIA\s+(?:DEI\s+)?TESTICOLI",
        r"ECOGRAFIA\s+(?:DELLA\s+)?PROSTATA",
        r"ECOGRAFIA\s+(?:DEI\s+)?RENI\s+E\s+VESCICA",
        r"ECOGRAFIA\s+(?:DELLE\s+)?VIE\s+URINARIE",
        r"ECOGRAFIA\s+(?:DEL\s+)?FEGATO",
        r"ECOGRAFIA\s+(?:DELLA\s+)?COLECISTI",
        r"ECOGRAFIA\s+(?:DEL\s+)?PANCREAS",
        r"ECOGRAFIA\s+(?:DELLA\s+)?MILZA",
        r"ECOGRAFIA\s+(?:ADDOMINALE|PELVICA|TIROIDEA|EPATICA|RENALE)",
        // Echocardiogram
        r"ECOCARDIOGRAMMA\s+(?:COLOR\s+)?DOPPLER",
        r"ECOCARDIOGRAMMA\s+TRANSTORACICO",
        r"ECOCARDIOGRAMMA\s+TRANSESOFAGEO",
        r"ECOCARDIOGRAMMA",
        // Plain radiography
        r"RADIOGRAFIA\s+(?:DEL\s+)?TORACE\s+IN\s+DUE\s+PROIEZIONI",
        r"RADIOGRAFIA\s+(?:DEL\s+)?TORACE\s+(?:IN\s+)?(?:PA|AP)",
        r"RADIOGRAFIA\s+(?:DELLA\s+)?COLONNA\s+VERTEBRALE",
        r"RADIOGRAFIA\s+(?:DEL\s+)?BACINO",
        r"RADIOGRAFIA\s+(?:DELLE\s+)?ANCHE",
        r"RADIOGRAFIA\s+(?:DEL\s+)?GINOCCHIO",
        r"RADIOGRAFIA\s+(?:DELLA\s+)?SPALLA",
        r"RADIOGRAFIA\s+(?:DEL\s+)?POLSO",
        r"RADIOGRAFIA\s+(?:DELLA\s+)?CAVIGLIA",
        r"RADIOGRAFIA\s+(?:DEL\s+)?PIEDE",
        r"RADIOGRAFIA\s+(?:DELL')?ADDOME",
        r"RADIOGRAFIA\s+(?:DEL\s+)?TORACE",
        // CT
        r"TAC\s+(?:DELL')?ADDOME\s+(?:CON\s+)?(?:E\s+SENZA\s+)?(?:MDC|CONTRASTO)",
        r"TAC\s+(?:DEL\s+)?TORACE\s+(?:CON\s+)?(?:E\s+SENZA\s+)?(?:MDC|CONTRASTO)",
        r"TAC\s+(?:DEL\s+)?CRANIO\s+(?:CON\s+)?(?:E\s+SENZA\s+)?(?:MDC|CONTRASTO)",
        r"TAC\s+(?:DELL')?ENCEFALO\s+(?:CON\s+)?(?:E\s+SENZA\s+)?(?:MDC|CONTRASTO)",
        r"TAC\s+(?:DELLA\s+)?COLONNA\s+VERTEBRALE",
        r"TAC\s+(?:DEL\s+)?RACHIDE",
        r"TAC\s+(?:ADDOME|TORACE|CRANIO|ENCEFALO)",
        // MRI
        r"RISONANZA\s+MAGNETICA\s+(?:DELL')?ENCEFALO",
        r"RISONANZA\s+MAGNETICA\s+(?:DELLA\s+)?COLONNA\s+VERTEBRALE",
        r"RISONANZA\s+MAGNETICA\s+(?:DEL\s+)?RACHIDE",
        r"RISONANZA\s+MAGNETICA\s+(?:DEL\s+)?GINOCCHIO",
        r"RISONANZA\s+MAGNETICA\s+(?:DELLA\s+)?SPALLA",
        r"RISONANZA\s+MAGNETICA\s+(?:DELL')?ADDOME",
        r"RISONANZA\s+MAGNETICA\s+(?:DEL\s+)?BACINO",
        r"RISONANZA\s+MAGNETICA",
        // Other modalities
        r"MAMMOGRAFIA\s+BILATERALE",
        r"MAMMOGRAFIA",
        r"DENSITOMETRIA\s+OSSEA",
        r"SCINTIGRAFIA\s+OSSEA",
        r"SCINTIGRAFIA\s+TIROIDEA",
        r"SCINTIGRAFIA",
        r"ANGIO\s*TAC",
        r"ANGIO\s*RM",
        // Generic imaging headers last
        r"REFERTO\s+DI\s+RADIOLOGIA",
        r"REFERTO\s+RADIOLOGICO",
        r"ECO\s+DOPPLER",
        r"ECO-DOPPLER",
        r"DOPPLER",
        // Tissue pathology
        r"ESAME\s+ISTOLOGICO",
        r"ESAME\s+CITOLOGICO",
        r"ESAME\s+ANATOMO\s*PATOLOGICO",
        r"AGOBIOPSIA",
        r"BIOPSIA",
        r"REFERTO\s+(?:DI\s+)?(?:ANATOMIA\s+)?PATOLOGICA?",
        r"REFERTO\s+ISTOLOGICO",
        r"REFERTO\s+CITOLOGICO",
        r"DIAGNOSI\s+ISTOLOGICA",
        r"DIAGNOSI\s+CITOLOGICA",
        r"PAP\s*TEST",
        r"IMMUNOISTOCHIMICA",
        r"COLORAZIONE\s+(?:HE|H&E|EMATOSSILINA)",
        r"PREPARATO\s+ISTOLOGICO",
        r"SEZIONI\s+ISTOLOGICHE",
    ]
    .iter()
    .map(|p| rx(&format!("(?i){p}")))
    .collect()
});

/// A capitalized candidate line must contain one of these to count as a
/// clinical title.
pub const TITLE_KEYWORDS: &[&str] = &[
    "ESAME",
    "REFERTO",
    "ANALISI",
    "DIAGNOSTICA",
    "INDAGINE",
    "CHIMICO",
    "FISICO",
    "BATTERIOLOGICO",
    "MICROSCOPICO",
    "URINE",
    "SANGUE",
    "EMOCROMO",
    "COAGULAZIONE",
    "RADIOLOG",
    "ECOGRAF",
    "CARDIOL",
    "NEUROLOG",
    "ORTOPED",
    "PATOLOG",
    "ISTOLOG",
    "CITOLOG",
    "BIOPSIA",
];

/// Administrative boilerplate that disqualifies a candidate line.
pub const TITLE_ADMIN_TERMS: &[&str] = &[
    "AZIENDA",
    "OSPEDALE",
    "DIRETTORE",
    "RESPONSABILE",
    "TELEFONO",
    "EMAIL",
    "INDIRIZZO",
    "VIA",
    "VIALE",
    "CODICE",
    "PAZIENTE",
    "RISULTATO",
    "UNITA",
    "RIFERIMENTO",
];

/// Label-based title capture, tried after the line scan.
pub static TITLE_LABEL_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        rx(r"(?i)(?:Tipo(?:\s*di)?(?:\s*esame|referto|indagine)?)[\s:.-]*([A-Za-zÀ-ÿ\s]+)"),
        rx(r"(?i)(?:REFERTO)(?:\s*di)?[\s:.-]*([A-Za-zÀ-ÿ\s]+)"),
        rx(r"(?i)(?:PRESTAZIONE)[\s:.-]*([A-Za-zÀ-ÿ\s]+)"),
        rx(r"(?i)(?:SPECIALITÀ)[\s:.-]*([A-Za-zÀ-ÿ\s]+)"),
        rx(r"(?i)(?:SETTORE)[\s:.-]*([A-Za-zÀ-ÿ\s]+)"),
    ]
});

/// Label captures equal to one of these are table headers, not titles.
pub const TITLE_GENERIC_REJECTS: &[&str] = &["RISULTATO", "UNITA", "VALORE", "DATO"];

/// Keyword-density vote: a family label is returned only when at least two
/// of its keywords appear in the opening lines. Ordered by specificity.
pub const CATEGORY_VOTES: &[(&str, &[&str])] = &[
    (
        "Esame Chimico Fisico Delle Urine",
        &["URINE", "PROTEINE", "GLUCOSIO", "SEDIMENTO", "ESTERASI"],
    ),
    (
        "Esame Emocromocitometrico",
        &["WBC", "RBC", "HGB", "HCT", "PLT", "EMOCROMO"],
    ),
    (
        "Chimica Clinica",
        &["GLUCOSIO", "CREATININA", "UREA", "SODIO", "POTASSIO", "TRANSAMINASI"],
    ),
    (
        "Ecocolordopplergrafia",
        &["ECOCOLORDOPPLERGRAFIA", "DOPPLER", "CAROTIDE", "VASCOLARE", "STENOSI", "FLUSSO"],
    ),
    (
        "Radiologia",
        &["RX", "TAC", "ECOGRAFIA", "RADIOLOGIA", "ECO", "RAGGI X", "RISONANZA"],
    ),
    (
        "Cardiologia",
        &["ECG", "ECOCARDIOGRAMMA", "ELETTROCARDIOGRAMMA", "CARDIO", "CARDIOVASCOLARE"],
    ),
    (
        "Anatomia Patologica",
        &[
            "ISTOLOGICO",
            "CITOLOGICO",
            "BIOPSIA",
            "AGOBIOPSIA",
            "PATOLOGICA",
            "EMATOSSILINA",
            "IMMUNOISTOCHIMICA",
            "NEOPLASIA",
            "DISPLASIA",
            "METAPLASIA",
        ],
    ),
    (
        "Laboratorio",
        &["ANALISI", "LABORATORIO", "BIOCHIMICA", "SIEROLOGIA"],
    ),
];

/// Title-case a candidate the way report headers are displayed:
/// first letter of each word upper, rest lower.
pub(crate) fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
