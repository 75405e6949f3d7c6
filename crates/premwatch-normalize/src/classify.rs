//! Keyword rules mapping free text onto the fixed licence vocabularies.

use std::collections::BTreeSet;

use premwatch_core::{BusinessCategory, LicenceCategory, LicenceStatus, LicenceType};

use crate::text::clean_text;

/// Ordered `(keyword, type)` rules; the first match wins.
const LICENCE_TYPE_KEYWORDS: &[(&str, LicenceType)] = &[
    ("provisional", LicenceType::Provisional),
    ("variation", LicenceType::Variation),
    ("vary", LicenceType::Variation),
    ("transfer", LicenceType::Transfer),
    ("review", LicenceType::Review),
];

const STATUS_KEYWORDS: &[(&str, LicenceStatus)] = &[
    ("withdrawn", LicenceStatus::Withdrawn),
    ("refused", LicenceStatus::Refused),
    ("rejected", LicenceStatus::Refused),
    ("review", LicenceStatus::UnderReview),
    ("granted", LicenceStatus::Granted),
    ("approved", LicenceStatus::Granted),
    ("issued", LicenceStatus::Granted),
];

/// `(phrase, standard activity)`; longer phrases first so "retail sale of
/// alcohol" is not read as something else.
const ACTIVITY_MAP: &[(&str, &str)] = &[
    ("entertainment similar", "Entertainment Similar to Music or Dance"),
    ("late night refreshment", "Late Night Refreshment"),
    ("boxing or wrestling", "Boxing or Wrestling Entertainment"),
    ("indoor sporting", "Indoor Sporting Events"),
    ("performance of dance", "Performance of Dance"),
    ("recorded music", "Recorded Music"),
    ("live music", "Live Music"),
    ("exhibition of film", "Exhibition of Films"),
    ("films", "Exhibition of Films"),
    ("sale of alcohol", "Sale of Alcohol"),
    ("supply of alcohol", "Sale of Alcohol"),
    ("alcohol", "Sale of Alcohol"),
];

/// Activities shorter than this that match nothing are treated as noise.
const MIN_UNKNOWN_ACTIVITY_LEN: usize = 6;

/// `(phrase, category)` matched inside each lowercased activity.
const LICENCE_CATEGORY_KEYWORDS: &[(&str, LicenceCategory)] = &[
    ("alcohol", LicenceCategory::Alcohol),
    ("music", LicenceCategory::Entertainment),
    ("dance", LicenceCategory::Entertainment),
    ("refreshment", LicenceCategory::LateNightRefreshment),
    ("film", LicenceCategory::Films),
    ("sport", LicenceCategory::Sports),
    ("boxing", LicenceCategory::Sports),
    ("wrestling", LicenceCategory::Sports),
];

/// Takeaway rules are checked before the generic ones so "kebab bar" is a
/// takeaway, not a bar.
const CATEGORY_KEYWORDS: &[(&str, BusinessCategory)] = &[
    ("takeaway", BusinessCategory::Takeaway),
    ("take away", BusinessCategory::Takeaway),
    ("kebab", BusinessCategory::Takeaway),
    ("pizza", BusinessCategory::Takeaway),
    ("fish and chips", BusinessCategory::Takeaway),
    ("chip shop", BusinessCategory::Takeaway),
    ("pub", BusinessCategory::Pub),
    ("tavern", BusinessCategory::Pub),
    ("inn", BusinessCategory::Pub),
    ("arms", BusinessCategory::Pub),
    ("nightclub", BusinessCategory::Club),
    ("club", BusinessCategory::Club),
    ("hotel", BusinessCategory::Hotel),
    ("restaurant", BusinessCategory::Restaurant),
    ("bistro", BusinessCategory::Restaurant),
    ("brasserie", BusinessCategory::Restaurant),
    ("dining", BusinessCategory::Restaurant),
    ("cocktail", BusinessCategory::Bar),
    ("bar", BusinessCategory::Bar),
    ("cafe", BusinessCategory::Cafe),
    ("café", BusinessCategory::Cafe),
    ("coffee", BusinessCategory::Cafe),
    ("supermarket", BusinessCategory::Retail),
    ("off licence", BusinessCategory::Retail),
    ("shop", BusinessCategory::Retail),
    ("store", BusinessCategory::Retail),
    ("market", BusinessCategory::Retail),
    ("theatre", BusinessCategory::EntertainmentVenue),
    ("cinema", BusinessCategory::EntertainmentVenue),
    ("venue", BusinessCategory::EntertainmentVenue),
];

/// Map free-text licence type; absent or unrecognised text is [`LicenceType::New`].
#[must_use]
pub fn licence_type(raw: Option<&str>) -> LicenceType {
    let Some(raw) = raw else {
        return LicenceType::New;
    };
    let lower = raw.to_lowercase();
    LICENCE_TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(LicenceType::New, |(_, kind)| *kind)
}

/// Map free-text status. Absent or blank stays `None`; text that matches no
/// rule is taken as [`LicenceStatus::Pending`].
#[must_use]
pub fn licence_status(raw: Option<&str>) -> Option<LicenceStatus> {
    let lower = raw?.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    Some(
        STATUS_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map_or(LicenceStatus::Pending, |(_, status)| *status),
    )
}

/// Standardise activity names, dropping duplicates while keeping first-seen order.
#[must_use]
pub fn standardize_activities(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for activity in raw {
        let cleaned = clean_text(activity);
        let lower = cleaned.to_lowercase();
        let standard = ACTIVITY_MAP
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, standard)| (*standard).to_string())
            .or_else(|| (cleaned.chars().count() >= MIN_UNKNOWN_ACTIVITY_LEN).then(|| title_case(&cleaned)));
        if let Some(standard) = standard {
            if !out.contains(&standard) {
                out.push(standard);
            }
        }
    }
    out
}

/// Licence categories covered by the activities; [`LicenceCategory::General`]
/// when none apply.
#[must_use]
pub fn licence_categories(activities: &[String]) -> BTreeSet<LicenceCategory> {
    let mut categories: BTreeSet<LicenceCategory> = activities
        .iter()
        .flat_map(|activity| {
            let lower = activity.to_lowercase();
            LICENCE_CATEGORY_KEYWORDS
                .iter()
                .filter(move |(phrase, _)| lower.contains(phrase))
                .map(|(_, category)| *category)
        })
        .collect();
    if categories.is_empty() {
        categories.insert(LicenceCategory::General);
    }
    categories
}

/// Classify a premises by keywords in its name and description, then by its
/// activities. Falls back to [`BusinessCategory::Uncategorized`].
#[must_use]
pub fn business_category(
    name: &str,
    description: Option<&str>,
    activities: &[String],
) -> BusinessCategory {
    let text = format!(" {} ", words(&format!("{name} {}", description.unwrap_or_default())));
    if let Some((_, category)) = CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(&format!(" {keyword} ")))
    {
        return *category;
    }

    let has = |standard: &str| activities.iter().any(|a| a == standard);
    if has("Late Night Refreshment") && !has("Sale of Alcohol") {
        return BusinessCategory::Takeaway;
    }
    if has("Exhibition of Films") {
        return BusinessCategory::EntertainmentVenue;
    }
    BusinessCategory::Uncategorized
}

/// Lowercase, keep letters and digits, single-space separated.
fn words(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
