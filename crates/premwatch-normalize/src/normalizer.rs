//! Single-writer normalization and deduplication of raw records into the
//! canonical set.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use premwatch_core::{
    BusinessCategory, CanonicalLicenceRecord, LicenceFields, RawLicenceRecord, RecordError,
    RecordOrigin,
};
use serde::{Deserialize, Serialize};

use crate::classify::{
    business_category, licence_categories, licence_status, licence_type, standardize_activities,
};
use crate::hours::standardize_hours;
use crate::identity::identity_key;
use crate::postcode::{extract_postcode, normalize_postcode};
use crate::risk::{risk_score, RiskWeights};
use crate::text::{clean_address, clean_conditions, clean_holder_name, clean_person_name, clean_text};

const MIN_NAME_CHARS: usize = 3;
/// Grant or application dates further ahead than this are scrape noise.
const MAX_FUTURE_DAYS: i64 = 30;
/// Page chrome that sometimes lands in the name column.
const NAVIGATION_WORDS: &[&str] = &["loading", "error", "not found", "search", "menu", "navigation"];

/// Canonical records keyed by identity key. At most one record per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSet {
    records: BTreeMap<String, CanonicalLicenceRecord>,
}

impl CanonicalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a set from stored records, re-keying on each record's own key.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = CanonicalLicenceRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.identity_key.clone(), r))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, identity_key: &str) -> Option<&CanonicalLicenceRecord> {
        self.records.get(identity_key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in identity-key order.
    pub fn values(&self) -> impl Iterator<Item = &CanonicalLicenceRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<CanonicalLicenceRecord> {
        self.records.into_values().collect()
    }
}

/// A raw record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    pub council_id: String,
    pub business_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Identities seen for the first time.
    pub created: usize,
    /// Sightings folded into an existing identity.
    pub merged: usize,
    pub dropped: Vec<DroppedRecord>,
}

pub struct Normalizer {
    weights: RiskWeights,
}

impl Normalizer {
    #[must_use]
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Fold `raw` into `set` in arrival order.
    ///
    /// `seen_at` stamps first/last sighting and its date is the reference date
    /// for risk scoring. Records that fail validation are reported in
    /// [`NormalizeReport::dropped`] and never touch the set.
    pub fn normalize(
        &self,
        set: &mut CanonicalSet,
        raw: Vec<RawLicenceRecord>,
        seen_at: DateTime<Utc>,
    ) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        for record in raw {
            let (origin, fields, confidence) = record.into_parts();
            let sighting = match Sighting::prepare(&origin, &fields, confidence, seen_at) {
                Ok(sighting) => sighting,
                Err(err) => {
                    tracing::debug!(council = %origin.council_id, error = %err, "dropping record");
                    report.dropped.push(DroppedRecord {
                        council_id: origin.council_id,
                        business_name: fields.business_name,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let key = sighting.record.identity_key.clone();
            let canonical = match set.records.entry(key) {
                Entry::Vacant(slot) => {
                    report.created += 1;
                    slot.insert(sighting.record)
                }
                Entry::Occupied(slot) => {
                    report.merged += 1;
                    let existing = slot.into_mut();
                    merge(existing, sighting);
                    existing
                }
            };
            canonical.risk_score = risk_score(canonical, seen_at.date_naive(), &self.weights);
        }

        tracing::info!(
            created = report.created,
            merged = report.merged,
            dropped = report.dropped.len(),
            total = set.len(),
            "normalization complete"
        );
        report
    }
}

/// One validated raw record in canonical shape, plus the inputs that only
/// matter while merging.
struct Sighting {
    record: CanonicalLicenceRecord,
    licence_type_known: bool,
    description: Option<String>,
}

impl Sighting {
    fn prepare(
        origin: &RecordOrigin,
        fields: &LicenceFields,
        confidence: f64,
        seen_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let business_name = clean_text(&fields.business_name);
        validate(&business_name, fields, seen_at)?;

        let normalized_address = clean_address(&fields.address);
        let postcode = match fields.postcode.as_deref() {
            Some(raw) => normalize_postcode(raw),
            None => extract_postcode(&normalized_address),
        };
        let licensable_activities = standardize_activities(&fields.activities);
        let licence_categories = licence_categories(&licensable_activities);
        let description = fields.description.as_deref().map(clean_text);
        let business_category =
            business_category(&business_name, description.as_deref(), &licensable_activities);

        let record = CanonicalLicenceRecord {
            identity_key: identity_key(&business_name, postcode.as_deref(), &normalized_address),
            business_name,
            normalized_address,
            postcode,
            licence_type: licence_type(fields.licence_type.as_deref()),
            licence_status: licence_status(fields.status.as_deref()),
            granted_date: fields.granted_date,
            application_date: fields.application_date,
            licence_holder: fields
                .licence_holder
                .as_deref()
                .map(clean_holder_name)
                .filter(|h| !h.is_empty()),
            supervisor: fields
                .supervisor
                .as_deref()
                .map(clean_person_name)
                .filter(|s| !s.is_empty()),
            licensable_activities,
            opening_hours: fields
                .opening_hours
                .as_deref()
                .map(standardize_hours)
                .unwrap_or_default(),
            alcohol_hours: fields
                .alcohol_hours
                .as_deref()
                .map(standardize_hours)
                .unwrap_or_default(),
            conditions: clean_conditions(&fields.conditions),
            licence_categories,
            risk_score: 0.0,
            business_category,
            source_council_ids: BTreeSet::from([origin.council_id.clone()]),
            source_urls: BTreeSet::from([origin.source_url.clone()]),
            extraction_strategy: origin.strategy,
            confidence,
            first_seen: seen_at,
            last_seen: seen_at,
            merge_count: 1,
        };
        Ok(Self {
            record,
            licence_type_known: fields.licence_type.is_some(),
            description,
        })
    }
}

fn validate(name: &str, fields: &LicenceFields, seen_at: DateTime<Utc>) -> Result<(), RecordError> {
    let reject = |reason: &str| RecordError::Rejected {
        business_name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.chars().count() < MIN_NAME_CHARS {
        return Err(reject("business name too short"));
    }
    let padded = format!(" {} ", name.to_lowercase());
    if NAVIGATION_WORDS
        .iter()
        .any(|word| padded.contains(&format!(" {word} ")))
    {
        return Err(reject("business name looks like page navigation"));
    }
    let horizon = seen_at.date_naive() + Duration::days(MAX_FUTURE_DAYS);
    if fields.granted_date.is_some_and(|d| d > horizon) {
        return Err(reject("granted date is in the future"));
    }
    if fields.application_date.is_some_and(|d| d > horizon) {
        return Err(reject("application date is in the future"));
    }
    Ok(())
}

/// Reconcile a new sighting into an existing record.
///
/// A sighting at least as confident as the held values replaces every field
/// it has a value for; a less confident one only fills gaps. Provenance and
/// sighting bookkeeping are updated either way.
fn merge(existing: &mut CanonicalLicenceRecord, sighting: Sighting) {
    let Sighting {
        record: new,
        licence_type_known,
        description,
    } = sighting;
    let prefer_new = new.confidence >= existing.confidence;

    if prefer_new {
        existing.business_name = new.business_name;
        if !new.normalized_address.is_empty() {
            existing.normalized_address = new.normalized_address;
        }
        if licence_type_known {
            existing.licence_type = new.licence_type;
        }
        existing.extraction_strategy = new.extraction_strategy;
        existing.confidence = new.confidence;
    } else if existing.normalized_address.is_empty() {
        existing.normalized_address = new.normalized_address;
    }

    take_if(&mut existing.postcode, new.postcode, prefer_new);
    take_if(&mut existing.licence_status, new.licence_status, prefer_new);
    take_if(&mut existing.granted_date, new.granted_date, prefer_new);
    take_if(&mut existing.application_date, new.application_date, prefer_new);
    take_if(&mut existing.licence_holder, new.licence_holder, prefer_new);
    take_if(&mut existing.supervisor, new.supervisor, prefer_new);
    take_nonempty(&mut existing.licensable_activities, new.licensable_activities, prefer_new);
    take_nonempty(&mut existing.opening_hours, new.opening_hours, prefer_new);
    take_nonempty(&mut existing.alcohol_hours, new.alcohol_hours, prefer_new);
    take_nonempty(&mut existing.conditions, new.conditions, prefer_new);
    existing.licence_categories = licence_categories(&existing.licensable_activities);

    let category = business_category(
        &existing.business_name,
        description.as_deref(),
        &existing.licensable_activities,
    );
    if category != BusinessCategory::Uncategorized
        && (prefer_new || existing.business_category == BusinessCategory::Uncategorized)
    {
        existing.business_category = category;
    }

    existing.source_council_ids.extend(new.source_council_ids);
    existing.source_urls.extend(new.source_urls);
    existing.first_seen = existing.first_seen.min(new.first_seen);
    existing.last_seen = existing.last_seen.max(new.last_seen);
    existing.merge_count = existing.merge_count.saturating_add(1);
}

fn take_if<T>(slot: &mut Option<T>, value: Option<T>, prefer_new: bool) {
    if value.is_some() && (prefer_new || slot.is_none()) {
        *slot = value;
    }
}

/// Collections are replaced whole, never unioned.
fn take_nonempty<C>(slot: &mut C, value: C, prefer_new: bool)
where
    C: Default + PartialEq,
{
    let empty = C::default();
    if value != empty && (prefer_new || *slot == empty) {
        *slot = value;
    }
}

#[cfg(test)]
#[path = "normalizer_test.rs"]
mod tests;
