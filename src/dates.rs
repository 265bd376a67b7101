use chrono::NaiveDate;
use std::cmp::Ordering;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse a race date as the feeds send it.
///
/// Accepts ISO dates (optionally followed by a `T...` time part), UK-style
/// `DD/MM/YYYY` and `DD-MM-YYYY`, and month-name forms like `3 Feb 2024` or
/// `Feb 3, 2024`. Returns `None` when no format matches.
pub fn parse_race_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    // "2024-02-03T13:30:00.000Z" -> "2024-02-03"
    let s = match s.split_once('T') {
        Some((date, _)) if date.len() == 10 && date.as_bytes()[4] == b'-' => date,
        _ => s,
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// ISO form of a parseable date, or the trimmed input unchanged.
pub fn normalize_date_key(raw: &str) -> String {
    match parse_race_date(raw) {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => raw.trim().to_string(),
    }
}

/// Chronological order for date keys; unparseable keys sort after all dates,
/// alphabetically among themselves.
pub fn compare_date_keys(a: &str, b: &str) -> Ordering {
    match (parse_race_date(a), parse_race_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_date_formats() {
        let feb3 = NaiveDate::from_ymd_opt(2024, 2, 3);
        assert_eq!(parse_race_date("2024-02-03"), feb3);
        assert_eq!(parse_race_date("2024-02-03T13:30:00.000Z"), feb3);
        assert_eq!(parse_race_date("03/02/2024"), feb3);
        assert_eq!(parse_race_date("03-02-2024"), feb3);
        assert_eq!(parse_race_date("3 Feb 2024"), feb3);
        assert_eq!(parse_race_date("3 February 2024"), feb3);
        assert_eq!(parse_race_date("Feb 3, 2024"), feb3);
        assert_eq!(parse_race_date(" 2024-02-03 "), feb3);
        assert_eq!(parse_race_date("2024-13-01"), None);
        assert_eq!(parse_race_date("today"), None);
        assert_eq!(parse_race_date(""), None);
    }

    #[test]
    fn normalizes_keys_to_iso() {
        assert_eq!(normalize_date_key("03/02/2024"), "2024-02-03");
        assert_eq!(normalize_date_key(" TBC "), "TBC");
    }

    #[test]
    fn date_keys_sort_chronologically_then_unparseable() {
        let mut keys = vec!["TBC", "2024-02-10", "03/02/2024", "Abandoned", "2023-12-31"];
        keys.sort_by(|a, b| compare_date_keys(a, b));
        assert_eq!(keys, vec!["2023-12-31", "03/02/2024", "2024-02-10", "Abandoned", "TBC"]);
    }
}
