//! Deterministic trend comparison, used whenever the AI path yields nothing.
//!
//! First a small table of numeric markers is tried, dominant parameter first
//! (urinary protein, then the common chemistry markers): when both texts
//! carry the same marker, the relative change against the configured
//! threshold decides the verdict. With no comparable marker the last resort
//! is a text-length heuristic, explicitly flagged as low-confidence so
//! downstream consumers can discount it.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::EngineConfig;
use crate::models::{ComparisonResult, TrendStatus};

struct MarkerRule {
    label: &'static str,
    pattern: Regex,
}

fn marker(label: &'static str, name: &str) -> MarkerRule {
    MarkerRule {
        label,
        pattern: Regex::new(&format!(r"(?i)\b{name}\b[^0-9\n]{{0,15}}([0-9]+[.,]?[0-9]*)"))
            .expect("marker pattern must compile"),
    }
}

/// Dominant parameter first.
static MARKER_RULES: LazyLock<Vec<MarkerRule>> = LazyLock::new(|| {
    vec![
        marker("Proteine", "Proteine"),
        marker("Creatinina", "Creatinina"),
        marker("Glucosio", "Glucosio"),
        marker("Emoglobina", "Emoglobina"),
        marker("Leucociti", "Leucociti"),
    ]
});

pub fn fallback_comparison(
    previous: &str,
    current: &str,
    config: &EngineConfig,
) -> ComparisonResult {
    for rule in MARKER_RULES.iter() {
        let Some((prev_raw, prev_value)) = find_marker(&rule.pattern, previous) else {
            continue;
        };
        let Some((cur_raw, cur_value)) = find_marker(&rule.pattern, current) else {
            continue;
        };
        return compare_marker(rule.label, &prev_raw, prev_value, &cur_raw, cur_value, config);
    }

    length_heuristic(previous, current, config)
}

fn find_marker(pattern: &Regex, text: &str) -> Option<(String, f64)> {
    let captures = pattern.captures(text)?;
    let raw = captures.get(1)?.as_str().to_string();
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    Some((raw, value))
}

fn compare_marker(
    label: &str,
    prev_raw: &str,
    prev_value: f64,
    cur_raw: &str,
    cur_value: f64,
    config: &EngineConfig,
) -> ComparisonResult {
    // A marker appearing out of nowhere counts as a worsening.
    if prev_value == 0.0 {
        return if cur_value == 0.0 {
            ComparisonResult {
                status: TrendStatus::Unchanged,
                explanation: format!("{label}: valore invariato ({prev_raw} → {cur_raw})."),
            }
        } else {
            ComparisonResult {
                status: TrendStatus::Worsened,
                explanation: format!(
                    "{label}: comparsa di un valore misurabile (da {prev_raw} a {cur_raw})."
                ),
            }
        };
    }

    let change = (cur_value - prev_value) / prev_value;
    let percent = (change * 100.0).round();

    if change > config.trend_change_threshold {
        ComparisonResult {
            status: TrendStatus::Worsened,
            explanation: format!(
                "{label}: valore aumentato da {prev_raw} a {cur_raw} ({percent:+}%)."
            ),
        }
    } else if change < -config.trend_change_threshold {
        ComparisonResult {
            status: TrendStatus::Improved,
            explanation: format!(
                "{label}: valore diminuito da {prev_raw} a {cur_raw} ({percent:+}%)."
            ),
        }
    } else {
        ComparisonResult {
            status: TrendStatus::Unchanged,
            explanation: format!(
                "{label}: variazione contenuta da {prev_raw} a {cur_raw} ({percent:+}%)."
            ),
        }
    }
}

/// Crude last resort: report length as a proxy for reported findings.
fn length_heuristic(previous: &str, current: &str, config: &EngineConfig) -> ComparisonResult {
    let prev_len = previous.trim().len();
    let cur_len = current.trim().len();

    if prev_len == 0 && cur_len == 0 {
        return ComparisonResult {
            status: TrendStatus::Error,
            explanation: "Nessun contenuto confrontabile nei due referti.".into(),
        };
    }

    let margin = config.length_heuristic_margin;
    let status = if (cur_len as f64) > (prev_len as f64) * (1.0 + margin) {
        TrendStatus::Worsened
    } else if (cur_len as f64) < (prev_len as f64) * (1.0 - margin) {
        TrendStatus::Improved
    } else {
        TrendStatus::Unchanged
    };

    ComparisonResult {
        status,
        explanation: format!(
            "Confronto a bassa affidabilità: nessun marcatore numerico comune, valutazione basata sulla lunghezza del testo ({prev_len} vs {cur_len} caratteri)."
        ),
    }
}
