//! Mapping scraped labels and values onto licence fields.

use chrono::NaiveDate;
use premwatch_core::LicenceFields;

/// Which licence field a column header or inline label refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    BusinessName,
    Address,
    Postcode,
    LicenceType,
    Status,
    GrantedDate,
    ApplicationDate,
    Holder,
    Supervisor,
    Activities,
    OpeningHours,
    AlcoholHours,
    Conditions,
    Description,
}

/// Words that mark a reference-number column ("Premises Licence Number",
/// "Ref.", "Application No"). Such columns carry no licence field.
const REFERENCE_WORDS: &[&str] = &["ref", "reference", "number", "no", "id"];

fn is_reference_label(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| REFERENCE_WORDS.contains(&word))
}

/// Classify a header or label. Order matters: "Premises address" is an
/// address, "Premises licence number" is a reference, and only what is left
/// over can be the premises name.
#[must_use]
pub fn slot_for_label(label: &str) -> Option<FieldSlot> {
    let l = label.trim().to_lowercase();
    if l.is_empty() {
        return None;
    }
    let has = |needles: &[&str]| needles.iter().any(|n| l.contains(n));

    if has(&["postcode", "post code"]) {
        Some(FieldSlot::Postcode)
    } else if has(&["address", "location"]) {
        Some(FieldSlot::Address)
    } else if has(&["supervisor", "dps"]) {
        Some(FieldSlot::Supervisor)
    } else if has(&["holder", "licensee", "applicant"]) {
        Some(FieldSlot::Holder)
    } else if has(&["hour", "times"]) {
        if has(&["alcohol", "licensed hours", "sale"]) {
            Some(FieldSlot::AlcoholHours)
        } else {
            Some(FieldSlot::OpeningHours)
        }
    } else if has(&["condition"]) {
        Some(FieldSlot::Conditions)
    } else if has(&["activit", "licensable"]) {
        Some(FieldSlot::Activities)
    } else if is_reference_label(&l) {
        None
    } else if has(&["status", "decision", "outcome"]) {
        Some(FieldSlot::Status)
    } else if has(&["application date", "date of application", "received", "submitted", "applied"]) {
        Some(FieldSlot::ApplicationDate)
    } else if has(&["date", "granted", "issued"]) {
        Some(FieldSlot::GrantedDate)
    } else if has(&["type", "category"]) {
        Some(FieldSlot::LicenceType)
    } else if has(&["description", "nature of"]) {
        Some(FieldSlot::Description)
    } else if has(&["name", "premises", "business", "trading", "venue"]) {
        Some(FieldSlot::BusinessName)
    } else {
        None
    }
}

/// Write `value` into `fields` under `slot`, keeping the first non-empty value.
pub fn assign(fields: &mut LicenceFields, slot: FieldSlot, value: &str) {
    let value = collapse_whitespace(value);
    if value.is_empty() {
        return;
    }
    let set = |target: &mut Option<String>, v: String| {
        if target.is_none() {
            *target = Some(v);
        }
    };
    match slot {
        FieldSlot::BusinessName => {
            if fields.business_name.is_empty() {
                fields.business_name = value;
            }
        }
        FieldSlot::Address => {
            if fields.address.is_empty() {
                fields.address = value;
            }
        }
        FieldSlot::Postcode => set(&mut fields.postcode, value),
        FieldSlot::LicenceType => set(&mut fields.licence_type, value),
        FieldSlot::Status => set(&mut fields.status, value),
        FieldSlot::GrantedDate => {
            if fields.granted_date.is_none() {
                fields.granted_date = parse_date(&value);
            }
        }
        FieldSlot::ApplicationDate => {
            if fields.application_date.is_none() {
                fields.application_date = parse_date(&value);
            }
        }
        FieldSlot::Holder => set(&mut fields.licence_holder, value),
        FieldSlot::Supervisor => set(&mut fields.supervisor, value),
        FieldSlot::Activities => {
            if fields.activities.is_empty() {
                fields.activities = split_activities(&value);
            }
        }
        FieldSlot::OpeningHours => set(&mut fields.opening_hours, value),
        FieldSlot::AlcoholHours => set(&mut fields.alcohol_hours, value),
        FieldSlot::Conditions => {
            if fields.conditions.is_empty() {
                fields.conditions = split_conditions(&value);
            }
        }
        FieldSlot::Description => set(&mut fields.description, value),
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Parse a UK-style register date. Returns `None` for anything unrecognized.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = collapse_whitespace(raw);
    if trimmed.is_empty() {
        return None;
    }
    // ISO timestamps: keep the date part.
    let candidate = if trimmed.len() > 10 && trimmed.as_bytes().get(10) == Some(&b'T') {
        trimmed.get(..10).unwrap_or(&trimmed).to_string()
    } else {
        trimmed
    };
    let candidate = strip_ordinal_suffixes(&candidate);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&candidate, fmt).ok())
}

/// "1st March 2024" -> "1 March 2024".
fn strip_ordinal_suffixes(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            let is_ordinal = !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && ["st", "nd", "rd", "th"]
                    .iter()
                    .any(|suffix| lower.ends_with(suffix) && lower.len() == digits.len() + 2);
            if is_ordinal {
                digits.to_string()
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a free-text activities cell on common separators.
#[must_use]
pub fn split_activities(raw: &str) -> Vec<String> {
    raw.split(|c| matches!(c, ',' | ';' | '|' | '\n' | '•'))
        .map(collapse_whitespace)
        .filter(|s| s.len() > 2)
        .collect()
}

/// Split a conditions cell. Commas are kept: conditions are sentences.
#[must_use]
pub fn split_conditions(raw: &str) -> Vec<String> {
    raw.split(|c| matches!(c, ';' | '|' | '\n' | '•'))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .collect()
}

#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
