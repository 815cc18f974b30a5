//! Date normalization for Italian report fields.
//!
//! Accepts `D/M/Y`, `D-M-Y` and `D.M.Y` with 2- or 4-digit years. Two-digit
//! years pivot at 50 (>50 → 1900s, ≤50 → 2000s). Components outside calendar
//! bounds or outside the caller's plausibility window reject the candidate so
//! the next rule in a cascade can try.

use chrono::NaiveDate;

/// Normalize a raw date capture into `DD/MM/YYYY`, or reject it.
/// Idempotent: feeding back an already-normalized date returns it unchanged.
pub fn normalize_date(raw: &str, year_min: i32, year_max: i32) -> Option<String> {
    let unified = raw.trim().replace(['.', '-'], "/");
    let parts: Vec<&str> = unified.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year_token = parts[2].trim();
    let year: i32 = match year_token.len() {
        2 => {
            let short: i32 = year_token.parse().ok()?;
            if short > 50 {
                1900 + short
            } else {
                2000 + short
            }
        }
        4 => year_token.parse().ok()?,
        _ => return None,
    };

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    if !(year_min..=year_max).contains(&year) {
        return None;
    }

    Some(format!("{day:02}/{month:02}/{year}"))
}

/// Parse a normalized or near-normalized date string into a `NaiveDate`.
/// Tolerates the separator variants plus ISO dates coming back from storage.
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];
    let trimmed = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_all_separators() {
        assert_eq!(
            normalize_date("5/2/2024", 1980, 2026),
            Some("05/02/2024".into())
        );
        assert_eq!(
            normalize_date("5-2-2024", 1980, 2026),
            Some("05/02/2024".into())
        );
        assert_eq!(
            normalize_date("5.2.2024", 1980, 2026),
            Some("05/02/2024".into())
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["05/02/2024", "31-12-1999", "01.01.2001"] {
            let once = normalize_date(raw, 1900, 2026).unwrap();
            let twice = normalize_date(&once, 1900, 2026).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn two_digit_years_pivot_at_fifty() {
        assert_eq!(
            normalize_date("01/03/62", 1900, 2026),
            Some("01/03/1962".into())
        );
        assert_eq!(
            normalize_date("01/03/24", 1900, 2026),
            Some("01/03/2024".into())
        );
    }

    #[test]
    fn rejects_calendar_nonsense() {
        assert_eq!(normalize_date("32/01/2024", 1900, 2026), None);
        assert_eq!(normalize_date("10/13/2024", 1900, 2026), None);
        assert_eq!(normalize_date("00/05/2024", 1900, 2026), None);
    }

    #[test]
    fn rejects_years_outside_window() {
        assert_eq!(normalize_date("01/01/1975", 1980, 2026), None);
        assert_eq!(normalize_date("01/01/2031", 1980, 2026), None);
        assert_eq!(normalize_date("01/01/1975", 1900, 2026).as_deref(), Some("01/01/1975"));
    }

    #[test]
    fn parses_stored_and_boundary_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(parse_flexible("01/02/2024"), Some(expected));
        assert_eq!(parse_flexible("2024-02-01"), Some(expected));
        assert_eq!(parse_flexible("01.02.2024"), Some(expected));
        assert_eq!(parse_flexible("not a date"), None);
    }
}
