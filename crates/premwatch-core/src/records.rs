use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceType {
    #[default]
    New,
    Variation,
    Transfer,
    Review,
    Provisional,
}

impl LicenceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LicenceType::New => "new",
            LicenceType::Variation => "variation",
            LicenceType::Transfer => "transfer",
            LicenceType::Review => "review",
            LicenceType::Provisional => "provisional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceStatus {
    Granted,
    Pending,
    Refused,
    Withdrawn,
    UnderReview,
}

/// Fixed business taxonomy used for classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    Pub,
    Bar,
    Club,
    Restaurant,
    Cafe,
    Hotel,
    Takeaway,
    Retail,
    EntertainmentVenue,
    #[default]
    Uncategorized,
}

impl BusinessCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BusinessCategory::Pub => "pub",
            BusinessCategory::Bar => "bar",
            BusinessCategory::Club => "club",
            BusinessCategory::Restaurant => "restaurant",
            BusinessCategory::Cafe => "cafe",
            BusinessCategory::Hotel => "hotel",
            BusinessCategory::Takeaway => "takeaway",
            BusinessCategory::Retail => "retail",
            BusinessCategory::EntertainmentVenue => "entertainment_venue",
            BusinessCategory::Uncategorized => "uncategorized",
        }
    }
}

impl std::fmt::Display for BusinessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad licence category derived from the licensable activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceCategory {
    Alcohol,
    Entertainment,
    LateNightRefreshment,
    Films,
    Sports,
    General,
}

impl LicenceCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LicenceCategory::Alcohol => "alcohol",
            LicenceCategory::Entertainment => "entertainment",
            LicenceCategory::LateNightRefreshment => "late_night_refreshment",
            LicenceCategory::Films => "films",
            LicenceCategory::Sports => "sports",
            LicenceCategory::General => "general",
        }
    }
}

impl std::fmt::Display for LicenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a raw record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOrigin {
    pub council_id: String,
    pub source_url: String,
    pub strategy: StrategyKind,
}

/// Licence fields as scraped, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenceFields {
    pub business_name: String,
    pub address: String,
    pub postcode: Option<String>,
    /// Free-text licence type as published, e.g. "Variation of premises licence".
    pub licence_type: Option<String>,
    pub status: Option<String>,
    pub granted_date: Option<NaiveDate>,
    pub application_date: Option<NaiveDate>,
    pub licence_holder: Option<String>,
    /// Designated premises supervisor, as published (titles and all).
    pub supervisor: Option<String>,
    pub activities: Vec<String>,
    /// Free-text opening hours, e.g. "Mon-Thu 10:00-23:00; Fri-Sat 10am-1am".
    pub opening_hours: Option<String>,
    /// Free-text hours for the sale of alcohol, same shape as `opening_hours`.
    pub alcohol_hours: Option<String>,
    pub conditions: Vec<String>,
    /// Free-text description of the business or premises.
    pub description: Option<String>,
}

/// A licence sighting produced by one extractor run.
///
/// Only constructible through [`RawLicenceRecord::new`], which enforces a
/// confidence in `[0, 1]` and a non-empty business name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawLicenceRecord {
    origin: RecordOrigin,
    fields: LicenceFields,
    confidence: f64,
}

impl RawLicenceRecord {
    /// # Errors
    ///
    /// Returns [`RecordError`] when `confidence` is outside `[0, 1]` (or NaN)
    /// or the business name is blank.
    pub fn new(
        origin: RecordOrigin,
        fields: LicenceFields,
        confidence: f64,
    ) -> Result<Self, RecordError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecordError::ConfidenceOutOfRange(confidence));
        }
        if fields.business_name.trim().is_empty() {
            return Err(RecordError::MissingField {
                field: "business_name",
            });
        }
        Ok(Self {
            origin,
            fields,
            confidence,
        })
    }

    #[must_use]
    pub fn origin(&self) -> &RecordOrigin {
        &self.origin
    }

    #[must_use]
    pub fn fields(&self) -> &LicenceFields {
        &self.fields
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn council_id(&self) -> &str {
        &self.origin.council_id
    }

    #[must_use]
    pub fn into_parts(self) -> (RecordOrigin, LicenceFields, f64) {
        (self.origin, self.fields, self.confidence)
    }
}

/// Deduplicated licence record, merged across councils and runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLicenceRecord {
    pub identity_key: String,
    pub business_name: String,
    pub normalized_address: String,
    pub postcode: Option<String>,
    pub licence_type: LicenceType,
    pub licence_status: Option<LicenceStatus>,
    pub granted_date: Option<NaiveDate>,
    #[serde(default)]
    pub application_date: Option<NaiveDate>,
    pub licence_holder: Option<String>,
    #[serde(default)]
    pub supervisor: Option<String>,
    pub licensable_activities: Vec<String>,
    /// Standard day name (`Monday` ..) to hours, e.g. `"10:00-23:00"`.
    #[serde(default)]
    pub opening_hours: BTreeMap<String, String>,
    #[serde(default)]
    pub alcohol_hours: BTreeMap<String, String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub licence_categories: BTreeSet<LicenceCategory>,
    pub risk_score: f64,
    pub business_category: BusinessCategory,
    pub source_council_ids: BTreeSet<String>,
    pub source_urls: BTreeSet<String>,
    /// Strategy behind the currently held field values.
    pub extraction_strategy: StrategyKind,
    /// Confidence of the sighting the current field values came from.
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Number of sightings folded into this record, starting at 1.
    pub merge_count: u32,
}
