//! Text cleaning for names and addresses.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,6});").expect("valid regex"));

/// UK street abbreviations expanded in addresses, matched as whole words.
const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("st", "Street"),
    ("rd", "Road"),
    ("ave", "Avenue"),
    ("dr", "Drive"),
    ("cl", "Close"),
    ("ln", "Lane"),
    ("pl", "Place"),
    ("sq", "Square"),
    ("ct", "Court"),
];

static ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(st|rd|ave|dr|cl|ln|pl|sq|ct)\b\.?").expect("valid regex")
});

/// Trailing legal suffixes ignored when matching business names.
const NAME_SUFFIXES: &[&str] = &["ltd", "limited", "plc"];

const PERSON_TITLES: &[&str] = &["mr", "mrs", "ms", "miss", "mx", "dr", "prof", "sir", "lady", "lord"];
const PERSON_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];
/// Words that mark a licence holder as an organisation rather than a person.
const ORGANISATION_WORDS: &[&str] = &[
    "ltd", "limited", "plc", "llp", "company", "co", "group", "holdings", "trust", "partnership",
    "inns", "pubs", "taverns", "restaurants", "hotels", "council", "&",
];

/// Conditions at or below this length are fragments, not conditions.
const MIN_CONDITION_CHARS: usize = 10;

fn decode_entity(caps: &Captures<'_>) -> String {
    let whole = &caps[0];
    let name = &caps[1];
    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            "pound" => Some('£'),
            _ => None,
        }
    };
    decoded.map_or_else(|| whole.to_string(), String::from)
}

/// Decode HTML entities, drop control characters, collapse whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let decoded = ENTITY.replace_all(raw, decode_entity);
    decoded
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`clean_text`] plus street-abbreviation expansion.
#[must_use]
pub fn clean_address(raw: &str) -> String {
    let cleaned = clean_text(raw);
    ABBREVIATION
        .replace_all(&cleaned, |caps: &Captures<'_>| {
            let abbr = caps[1].to_ascii_lowercase();
            STREET_ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == abbr)
                .map_or_else(|| caps[0].to_string(), |(_, long)| (*long).to_string())
        })
        .into_owned()
}

/// Person name with honorifics and generational suffixes removed. Words in
/// a single case are capitalized; mixed-case words ("McDonald") are kept.
#[must_use]
pub fn clean_person_name(raw: &str) -> String {
    clean_text(raw)
        .split_whitespace()
        .filter(|word| {
            let bare = word.trim_end_matches(['.', ',']).to_lowercase();
            !PERSON_TITLES.contains(&bare.as_str()) && !PERSON_SUFFIXES.contains(&bare.as_str())
        })
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(',')
        .to_string()
}

/// Licence holders are people or organisations; only people are reshaped.
#[must_use]
pub fn clean_holder_name(raw: &str) -> String {
    let cleaned = clean_text(raw);
    let lower = cleaned.to_lowercase();
    let is_organisation = lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .any(|word| ORGANISATION_WORDS.contains(&word));
    if is_organisation {
        cleaned
    } else {
        clean_person_name(&cleaned)
    }
}

/// Clean each condition, dropping fragments and repeats.
#[must_use]
pub fn clean_conditions(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for condition in raw {
        let cleaned = clean_text(condition);
        if cleaned.chars().count() > MIN_CONDITION_CHARS && !out.contains(&cleaned) {
            out.push(cleaned);
        }
    }
    out
}

fn capitalize_word(word: &str) -> String {
    let letters = || word.chars().filter(|c| c.is_alphabetic());
    let single_case = letters().all(char::is_lowercase) || letters().all(char::is_uppercase);
    if !single_case {
        return word.to_string();
    }
    let mut out = String::with_capacity(word.len());
    let mut start = true;
    for c in word.chars() {
        if start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        start = matches!(c, '-' | '\'');
    }
    out
}

/// Matching form of a name or address: case-folded, punctuation stripped,
/// leading "the" and trailing legal suffixes removed.
#[must_use]
pub fn match_key(raw: &str) -> String {
    let folded: String = clean_text(raw)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut words: Vec<&str> = folded.split_whitespace().collect();
    if words.len() > 1 && words[0] == "the" {
        words.remove(0);
    }
    while words.len() > 1 && words.last().is_some_and(|w| NAME_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}
