//! Text patterns: section header vocabulary and date lines.

use std::sync::LazyLock;

use chrono::{Month, Weekday};
use regex::{Captures, Regex};

use letterpress_shared::SectionType;

/// Header vocabulary, checked in order; the first match names the section.
static SECTION_PATTERNS: LazyLock<Vec<(SectionType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            SectionType::Companies,
            Regex::new(r"(?i)\bcompan(?:y|ies)\b").expect("valid regex"),
        ),
        (
            SectionType::People,
            Regex::new(r"(?i)\b(?:people|persons?|executives?)\b").expect("valid regex"),
        ),
        (
            SectionType::Topics,
            Regex::new(r"(?i)\btopics?\b").expect("valid regex"),
        ),
        (
            SectionType::Headlines,
            Regex::new(r"(?i)\b(?:headlines?|top\s+stories)\b").expect("valid regex"),
        ),
    ]
});

/// Section type named by a header text, if any.
pub(crate) fn match_section(text: &str) -> Option<SectionType> {
    SECTION_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(section, _)| *section)
}

/// `<weekday>, <month> <day>`, `<weekday> <day> <month>` or `<weekday> <d>/<m>`.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b(?P<weekday>[a-z]{3,9})\.?,?\s+
        (?:
            (?P<month_a>[a-z]{3,9})\.?\s+(?P<day_a>\d{1,2})(?:st|nd|rd|th)?\b
          | (?P<day_b>\d{1,2})(?:st|nd|rd|th)?\s+(?P<month_b>[a-z]{3,9})\b
          | (?P<first>\d{1,2})[/.\-](?P<second>\d{1,2})(?:[/.\-]\d{2,4})?\b
        )",
    )
    .expect("valid regex")
});

/// Whether `text` is a short weekday-led date line (`Monday, January 15, 2024`).
///
/// The regex only finds the shape; weekday and month words are confirmed by
/// `chrono` so `Issue March 3` is not a date.
pub(crate) fn looks_like_date(text: &str, max_chars: usize) -> bool {
    if text.is_empty() || text.chars().count() > max_chars {
        return false;
    }
    DATE_RE.captures_iter(text).any(|caps| is_valid_date(&caps))
}

fn is_valid_date(caps: &Captures<'_>) -> bool {
    if caps["weekday"].parse::<Weekday>().is_err() {
        return false;
    }

    let named = |name: &str| caps.name(name).map(|m| m.as_str());

    if let (Some(month), Some(day)) = (
        named("month_a").or(named("month_b")),
        named("day_a").or(named("day_b")),
    ) {
        return month.parse::<Month>().is_ok() && valid_day(day);
    }

    match (named("first"), named("second")) {
        (Some(first), Some(second)) => {
            let (Ok(a), Ok(b)) = (first.parse::<u32>(), second.parse::<u32>()) else {
                return false;
            };
            // Either day/month or month/day.
            (1..=31).contains(&a) && (1..=31).contains(&b) && (a <= 12 || b <= 12)
        }
        _ => false,
    }
}

fn valid_day(day: &str) -> bool {
    day.parse::<u32>().is_ok_and(|d| (1..=31).contains(&d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_vocabulary() {
        assert_eq!(match_section("Companies Mentioned"), Some(SectionType::Companies));
        assert_eq!(match_section("Featured company"), Some(SectionType::Companies));
        assert_eq!(match_section("People in the News"), Some(SectionType::People));
        assert_eq!(match_section("Executive moves"), Some(SectionType::People));
        assert_eq!(match_section("Trending Topics"), Some(SectionType::Topics));
        assert_eq!(match_section("TOP STORIES"), Some(SectionType::Headlines));
        assert_eq!(match_section("Today's headlines"), Some(SectionType::Headlines));
        assert_eq!(match_section("Accompany us"), None);
        assert_eq!(match_section("Welcome back"), None);
    }

    #[test]
    fn weekday_led_dates() {
        assert!(looks_like_date("Monday, January 15, 2024", 100));
        assert!(looks_like_date("Tue Feb 3rd", 100));
        assert!(looks_like_date("Friday 15 March", 100));
        assert!(looks_like_date("Weekly edition · Wed 12/06", 100));
    }

    #[test]
    fn non_dates() {
        assert!(!looks_like_date("Issue March 3", 100));
        assert!(!looks_like_date("Investor Day, New York, March 14", 100));
        assert!(!looks_like_date("Welcome back to the brief", 100));
        assert!(!looks_like_date("Monday, Smarch 40", 100));
        assert!(!looks_like_date("", 100));
    }

    #[test]
    fn long_text_is_never_a_date() {
        let text = format!("Monday, January 15 {}", "x".repeat(200));
        assert!(!looks_like_date(&text, 100));
    }
}
