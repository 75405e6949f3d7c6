//! UK postcode grammar.

use std::sync::LazyLock;

use regex::Regex;

/// Full-form UK postcode, outward and inward code separated by one space.
static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(GIR 0AA|[A-PR-UWYZ]([0-9]{1,2}|[A-HK-Y][0-9]([0-9ABEHMNPRV-Y])?|[0-9][A-HJKPS-UW]) [0-9][ABD-HJLNP-UW-Z]{2})$",
    )
    .expect("valid regex")
});

/// Loose candidate finder used when the postcode is buried in address text.
static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{1,2}[0-9][0-9A-Z]?)\s*([0-9][A-Z]{2})\b").expect("valid regex")
});

/// Canonicalize a postcode: upper-case, single space before the inward code.
///
/// Returns `None` when the value does not match the UK postcode grammar.
/// Idempotent: a canonical postcode maps to itself.
#[must_use]
pub fn normalize_postcode(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !(5..=7).contains(&compact.len()) || !compact.is_ascii() {
        return None;
    }
    let (outward, inward) = compact.split_at(compact.len() - 3);
    let candidate = format!("{outward} {inward}");
    POSTCODE.is_match(&candidate).then_some(candidate)
}

/// Find the first valid postcode in free text such as an address line.
#[must_use]
pub fn extract_postcode(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    CANDIDATE.captures_iter(&upper).find_map(|caps| {
        let outward = caps.get(1)?.as_str();
        let inward = caps.get(2)?.as_str();
        normalize_postcode(&format!("{outward} {inward}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_spacing() {
        assert_eq!(normalize_postcode("sw1a 1aa").as_deref(), Some("SW1A 1AA"));
        assert_eq!(normalize_postcode("SW1A1AA").as_deref(), Some("SW1A 1AA"));
        assert_eq!(normalize_postcode("  e1   6an ").as_deref(), Some("E1 6AN"));
        assert_eq!(normalize_postcode("m1 1ae").as_deref(), Some("M1 1AE"));
        assert_eq!(normalize_postcode("gir0aa").as_deref(), Some("GIR 0AA"));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(normalize_postcode("ZZ99"), None);
        assert_eq!(normalize_postcode(""), None);
        assert_eq!(normalize_postcode("12345"), None);
        assert_eq!(normalize_postcode("Q1 1AA"), None);
        // C is never used in the inward code.
        assert_eq!(normalize_postcode("EX2 3CC"), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["sw1a 1aa", "n19gu", "YO1 9UP", "bs1  4xe"] {
            let once = normalize_postcode(raw).unwrap();
            assert_eq!(normalize_postcode(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn extracts_from_address_text() {
        assert_eq!(
            extract_postcode("5 Church Lane, Bristol BS1 4XE").as_deref(),
            Some("BS1 4XE")
        );
        assert_eq!(
            extract_postcode("16 Pavement, York, yo19up").as_deref(),
            Some("YO1 9UP")
        );
        assert_eq!(extract_postcode("1 High Street, Exampleton"), None);
    }
}
