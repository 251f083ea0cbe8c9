//! Text heuristics used by scoring and pruning
//!
//! Every function here is a pure string check. Dates are matched literally,
//! not parsed out of prose.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static LOCATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:location|path|file)\*{0,2}:\*{0,2}[ \t]*`?([^\s`,;)]+)`?")
        .expect("valid location regex")
});

static MARKDOWN_LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]\n]+\]\([^)\s]+\)").expect("valid link regex"));

static FILE_REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`[^`\s]*[\w-]\.[A-Za-z][A-Za-z0-9]{1,7}`").expect("valid file reference regex")
});

static ISO_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid date regex"));

/// File path declared with a `Location:`, `Path:` or `File:` prefix
pub fn extract_location_path(content: &str) -> Option<&str> {
    LOCATION_PATTERN
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Number of `[text](target)` links
pub fn count_markdown_links(content: &str) -> usize {
    MARKDOWN_LINK_PATTERN.find_iter(content).count()
}

/// Number of inline code spans that look like file names, e.g. `src/lib.rs`
pub fn count_file_references(content: &str) -> usize {
    FILE_REFERENCE_PATTERN.find_iter(content).count()
}

/// First valid `YYYY-MM-DD` date in the content
pub fn extract_date(content: &str) -> Option<NaiveDate> {
    ISO_DATE_PATTERN.captures_iter(content).find_map(|caps| {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// 20 for the current `YYYY-MM`, 15 for the current year, 10 for the
/// previous year, else 0
pub fn freshness_score(content: &str, today: NaiveDate) -> f64 {
    let year = today.year();
    let year_month = format!("{:04}-{:02}", year, today.month());

    if content.contains(&year_month) {
        20.0
    } else if content.contains(&year.to_string()) {
        15.0
    } else if content.contains(&(year - 1).to_string()) {
        10.0
    } else {
        0.0
    }
}

/// Step bonus by age in days; undated items get nothing
pub fn recency_bonus(date: Option<NaiveDate>, today: NaiveDate) -> f64 {
    let Some(date) = date else {
        return 0.0;
    };

    let age_days = (today - date).num_days();
    if age_days < 7 {
        20.0
    } else if age_days < 30 {
        15.0
    } else if age_days < 90 {
        10.0
    } else if age_days < 365 {
        5.0
    } else {
        0.0
    }
}

/// Non-overlapping occurrences of an already-lowercased needle
pub fn count_occurrences(haystack_lower: &str, needle_lower: &str) -> usize {
    if needle_lower.is_empty() {
        return 0;
    }
    haystack_lower.matches(needle_lower).count()
}
