//! Opening-hours standardisation.
//!
//! Registers publish hours as free text ("Mon-Thu 10am-11pm; Fri & Sat
//! 10:00 to 01:00"). The result maps standard day names to 24-hour ranges.
//! Segments that name no day are kept under [`GENERAL`]. A later segment
//! overrides an earlier one for the same day.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text::clean_text;

const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DAY_ALIASES: &[(&str, usize)] = &[
    ("monday", 0),
    ("mon", 0),
    ("tuesday", 1),
    ("tues", 1),
    ("tue", 1),
    ("wednesday", 2),
    ("weds", 2),
    ("wed", 2),
    ("thursday", 3),
    ("thurs", 3),
    ("thur", 3),
    ("thu", 3),
    ("friday", 4),
    ("fri", 4),
    ("saturday", 5),
    ("sat", 5),
    ("sunday", 6),
    ("sun", 6),
];

const EVERY_DAY: &[&str] = &["every day", "everyday", "daily", "all week", "7 days"];

/// Key for hours that name no particular day.
pub const GENERAL: &str = "General";

static DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)\.?\s*(?:-|–|to)\s*([a-z]+)\.?\s*:?\s*(.*)$").expect("valid regex")
});
static SINGLE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z]+)\.?\s*:?\s*(.*)$").expect("valid regex"));
static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)\b|\b(\d{1,2})[:.](\d{2})\b")
        .expect("valid regex")
});
static MIDNIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bmidnight\b").expect("valid regex"));
static NOON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(noon|midday)\b").expect("valid regex"));
static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{2}:\d{2})\s*(?:-|–|to|until)\s*(\d{2}:\d{2})").expect("valid regex")
});

fn day_index(word: &str) -> Option<usize> {
    let lower = word.to_lowercase();
    let singular = lower.strip_suffix('s').unwrap_or(&lower);
    DAY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower || *alias == singular)
        .map(|(_, index)| *index)
}

/// Days a segment starts with, and the text after them.
fn leading_days(segment: &str) -> Option<(Vec<usize>, String)> {
    let lower = segment.to_lowercase();
    if let Some(prefix) = EVERY_DAY.iter().find(|p| lower.starts_with(*p)) {
        let rest = segment.get(prefix.len()..).unwrap_or_default();
        return Some(((0..DAYS.len()).collect(), rest.trim_start_matches([':', ' ']).to_string()));
    }
    if let Some(caps) = DAY_RANGE.captures(segment) {
        if let (Some(from), Some(to)) = (day_index(&caps[1]), day_index(&caps[2])) {
            let span = (to + DAYS.len() - from) % DAYS.len();
            let days = (0..=span).map(|offset| (from + offset) % DAYS.len()).collect();
            return Some((days, caps[3].to_string()));
        }
    }
    let caps = SINGLE_DAY.captures(segment)?;
    let day = day_index(&caps[1])?;
    Some((vec![day], caps[2].to_string()))
}

fn to_24h(caps: &Captures<'_>) -> String {
    let whole = caps[0].to_string();
    let parse = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let (hour, minute) = if let Some(meridiem) = caps.get(3) {
        let (Some(hour), minute) = (parse(1), parse(2).unwrap_or(0)) else {
            return whole;
        };
        if hour == 0 || hour > 12 {
            return whole;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        (hour % 12 + if pm { 12 } else { 0 }, minute)
    } else {
        let (Some(hour), Some(minute)) = (parse(4), parse(5)) else {
            return whole;
        };
        if hour > 24 || (hour == 24 && minute != 0) {
            return whole;
        }
        (hour % 24, minute)
    };
    if minute > 59 {
        return whole;
    }
    format!("{hour:02}:{minute:02}")
}

/// Rewrite the times in `raw` as `HH:MM` and ranges as `HH:MM-HH:MM`.
#[must_use]
pub fn standardize_times(raw: &str) -> String {
    let text = MIDNIGHT.replace_all(raw, "00:00");
    let text = NOON.replace_all(&text, "12:00");
    let text = TIME.replace_all(&text, to_24h);
    let text = TIME_RANGE.replace_all(&text, "${1}-${2}");
    clean_text(&text)
}

/// Parse free-text hours into standard day name -> hours.
#[must_use]
pub fn standardize_hours(raw: &str) -> BTreeMap<String, String> {
    let mut hours = BTreeMap::new();
    let mut general: Vec<String> = Vec::new();
    // Days listed without hours ("Fri, Sat 10:00-01:00") take the next hours given.
    let mut pending: Vec<usize> = Vec::new();

    let cleaned = clean_text(raw).replace('&', ",");
    for segment in cleaned
        .split([';', ',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        match leading_days(segment) {
            Some((days, rest)) => {
                pending.extend(days);
                let times = standardize_times(&rest);
                if times.is_empty() {
                    continue;
                }
                for day in pending.drain(..) {
                    hours.insert(DAYS[day].to_string(), times.clone());
                }
            }
            None => general.push(standardize_times(segment)),
        }
    }

    if !general.is_empty() {
        hours.insert(GENERAL.to_string(), general.join("; "));
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_become_24_hour() {
        assert_eq!(standardize_times("10am - 11.30pm"), "10:00-23:30");
        assert_eq!(standardize_times("9:00 to midnight"), "09:00-00:00");
        assert_eq!(standardize_times("noon until 2 AM"), "12:00-02:00");
        assert_eq!(standardize_times("24 hours"), "24 hours");
        assert_eq!(standardize_times("13pm"), "13pm");
    }

    #[test]
    fn day_ranges_expand() {
        let hours = standardize_hours("Mon-Thu 10am-11pm; Fri to Sat: 10:00 to 01:00");
        assert_eq!(hours.len(), 6);
        assert_eq!(hours["Monday"], "10:00-23:00");
        assert_eq!(hours["Thursday"], "10:00-23:00");
        assert_eq!(hours["Saturday"], "10:00-01:00");
        assert!(!hours.contains_key("Sunday"));
    }

    #[test]
    fn ranges_wrap_past_sunday() {
        let hours = standardize_hours("Sat-Mon 12:00-22:00");
        let days: Vec<&str> = hours.keys().map(String::as_str).collect();
        assert_eq!(days, vec!["Monday", "Saturday", "Sunday"]);
    }

    #[test]
    fn listed_days_share_following_hours() {
        let hours = standardize_hours("Fri & Sat 10:00-01:00, Sundays 12:00-22:30");
        assert_eq!(hours["Friday"], "10:00-01:00");
        assert_eq!(hours["Saturday"], "10:00-01:00");
        assert_eq!(hours["Sunday"], "12:00-22:30");
    }

    #[test]
    fn later_segments_override_and_daily_covers_week() {
        let hours = standardize_hours("Daily 10:00-23:00; Sunday 12:00-22:00");
        assert_eq!(hours.len(), 7);
        assert_eq!(hours["Wednesday"], "10:00-23:00");
        assert_eq!(hours["Sunday"], "12:00-22:00");
    }

    #[test]
    fn undated_hours_are_general() {
        let hours = standardize_hours("10am-11pm; Christmas Eve until 1am");
        assert_eq!(hours.len(), 1);
        assert_eq!(hours[GENERAL], "10:00-23:00; Christmas Eve until 01:00");
        assert!(standardize_hours("  ").is_empty());
    }
}
