//! Exam title extraction.
//!
//! Four tiers, stopping at the first that yields a candidate:
//! 1. specific clinical phrase templates (most specific first);
//! 2. all-caps heading scan over a bounded line window;
//! 3. label-based capture (`Tipo esame`, `Referto`, …);
//! 4. keyword-density vote returning a family label, never a literal title.

use super::patterns::{
    title_case, CATEGORY_VOTES, TITLE_ADMIN_TERMS, TITLE_GENERIC_REJECTS, TITLE_KEYWORDS,
    TITLE_LABEL_RULES, TITLE_TEMPLATES,
};

/// Line window for the heading scan: skip letterhead, stop before results.
const HEADING_SCAN_FIRST_LINE: usize = 5;
const HEADING_SCAN_LAST_LINE: usize = 50;

/// Lines considered by the keyword-density vote.
const VOTE_LINE_WINDOW: usize = 30;

/// Minimum distinct keyword hits for a family to win the vote.
const VOTE_MIN_HITS: usize = 2;

pub fn extract_exam_title(text: &str) -> Option<String> {
    if let Some(found) = match_specific_template(text) {
        tracing::debug!(title = %found, "exam title from phrase template");
        return Some(found);
    }
    if let Some(found) = scan_heading_lines(text) {
        tracing::debug!(title = %found, "exam title from heading scan");
        return Some(found);
    }
    if let Some(found) = match_label_capture(text) {
        tracing::debug!(title = %found, "exam title from label capture");
        return Some(found);
    }
    if let Some(found) = keyword_density_vote(text) {
        tracing::debug!(title = %found, "exam title from keyword vote");
        return Some(found);
    }
    tracing::debug!("no exam title found");
    None
}

fn match_specific_template(text: &str) -> Option<String> {
    TITLE_TEMPLATES
        .iter()
        .find_map(|template| template.find(text))
        .map(|m| title_case(m.as_str().trim()))
}

/// All-caps lines inside the window that carry a clinical keyword and no
/// administrative term; best candidate = longest, then earliest.
fn scan_heading_lines(text: &str) -> Option<String> {
    let mut candidates: Vec<(usize, usize, String)> = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        if index < HEADING_SCAN_FIRST_LINE || index > HEADING_SCAN_LAST_LINE {
            continue;
        }
        let line = raw_line.trim();
        let length = line.chars().count();
        if !(11..100).contains(&length) {
            continue;
        }
        if !is_upper_line(line) {
            continue;
        }
        if line.chars().take(5).any(|c| c.is_ascii_digit()) {
            continue;
        }
        if !TITLE_KEYWORDS.iter().any(|kw| line.contains(kw)) {
            continue;
        }
        if TITLE_ADMIN_TERMS.iter().any(|term| line.contains(term)) {
            continue;
        }
        candidates.push((length, index, line.to_string()));
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    candidates
        .first()
        .map(|(_, _, line)| title_case(line))
}

fn is_upper_line(line: &str) -> bool {
    line.chars().any(|c| c.is_alphabetic()) && !line.chars().any(|c| c.is_lowercase())
}

fn match_label_capture(text: &str) -> Option<String> {
    for rule in TITLE_LABEL_RULES.iter() {
        let Some(captures) = rule.captures(text) else {
            continue;
        };
        let raw = captures.get(1).map_or("", |m| m.as_str());
        let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let length = cleaned.chars().count();
        if length > 3
            && length < 100
            && !TITLE_GENERIC_REJECTS.contains(&cleaned.to_uppercase().as_str())
        {
            return Some(title_case(&cleaned));
        }
    }
    None
}

/// Last resort: count family keywords over the opening lines and return the
/// family label — a category name, not a document-specific title.
fn keyword_density_vote(text: &str) -> Option<String> {
    let window = text
        .lines()
        .take(VOTE_LINE_WINDOW)
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    for (label, keywords) in CATEGORY_VOTES {
        let hits = keywords.iter().filter(|kw| window.contains(**kw)).count();
        if hits >= VOTE_MIN_HITS {
            return Some((*label).to_string());
        }
    }
    None
}
