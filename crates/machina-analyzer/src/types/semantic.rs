//! Semantic string subtypes: `Date`, `UUID`, `URL` and `Duration`.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use url::Url;
use uuid::Uuid;

static ISO_DURATION: OnceLock<Regex> = OnceLock::new();
static SHORTHAND_DURATION: OnceLock<Regex> = OnceLock::new();

fn iso_duration() -> &'static Regex {
    ISO_DURATION.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+(?:\.\d+)?)Y)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("ISO-8601 duration pattern is a valid regex")
    })
}

fn shorthand_duration() -> &'static Regex {
    SHORTHAND_DURATION.get_or_init(|| {
        Regex::new(r"^\d+(?:\.\d+)?(?:ms|min|hr|s|m|h|d|w|y)$")
            .expect("shorthand duration pattern is a valid regex")
    })
}

/// ISO-8601 datetime: RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]`, or a
/// plain `YYYY-MM-DD` date.
pub(crate) fn is_date(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

pub(crate) fn is_uuid(text: &str) -> bool {
    Uuid::parse_str(text.trim()).is_ok()
}

/// An absolute URL.
pub(crate) fn is_url(text: &str) -> bool {
    Url::parse(text.trim()).is_ok()
}

/// ISO-8601 duration (`P1DT2H`) or shorthand (`30s`, `1.5h`, `250ms`).
pub(crate) fn is_duration(text: &str) -> bool {
    let text = text.trim();
    if shorthand_duration().is_match(text) {
        return true;
    }
    // `P` and `PT` alone match the grammar but carry no component.
    iso_duration()
        .captures(text)
        .is_some_and(|caps| caps.iter().skip(1).any(|c| c.is_some()) && !text.ends_with('T'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates() {
        assert!(is_date("2024-03-01T12:30:00Z"));
        assert!(is_date("2024-03-01T12:30:00+02:00"));
        assert!(is_date("2024-03-01T12:30:00.250"));
        assert!(is_date("2024-03-01"));
        assert!(!is_date("2024-13-01"));
        assert!(!is_date("yesterday"));
    }

    #[test]
    fn test_uuids() {
        assert!(is_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!is_uuid("67e55044-10b1-426f"));
    }

    #[test]
    fn test_urls() {
        assert!(is_url("https://example.com/path?q=1"));
        assert!(!is_url("example.com"));
        assert!(!is_url("not a url"));
    }

    #[test]
    fn test_iso_durations() {
        assert!(is_duration("P1D"));
        assert!(is_duration("PT1H30M"));
        assert!(is_duration("P1Y2M3W4DT5H6M7.5S"));
        assert!(!is_duration("P"));
        assert!(!is_duration("PT"));
        assert!(!is_duration("P1DT"));
        assert!(!is_duration("1D"));
    }

    #[test]
    fn test_shorthand_durations() {
        for text in ["30s", "250ms", "5m", "10min", "2h", "1hr", "3d", "1w", "1y", "1.5h"] {
            assert!(is_duration(text), "{text}");
        }
        assert!(!is_duration("5 minutes"));
        assert!(!is_duration("h"));
        assert!(!is_duration("5x"));
    }
}
