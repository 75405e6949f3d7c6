use sha2::{Digest, Sha256};

use crate::text::match_key;

/// Deterministic identity for a licensed premises.
///
/// Keyed on the matching form of the business name plus the canonical
/// postcode, or the matching form of the address when no postcode is known.
/// Two sightings with the same key are the same premises.
#[must_use]
pub fn identity_key(business_name: &str, postcode: Option<&str>, address: &str) -> String {
    let name = match_key(business_name);
    let input = match postcode {
        Some(postcode) => format!("postcode\x00{name}\x00{postcode}"),
        None => format!("address\x00{name}\x00{}", match_key(address)),
    };
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
