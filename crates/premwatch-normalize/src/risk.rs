//! Deterministic risk scoring on a 0-10 scale.
//!
//! Every factor is a documented `{weight: factor}` pair in [`RiskWeights`],
//! overridable from a YAML file. The run date is an explicit input, so the
//! same record and weights always score the same.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use premwatch_core::{CanonicalLicenceRecord, ConfigError};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub base: f64,
    /// Keyed by licence type (`new`, `variation`, ...).
    pub licence_type: BTreeMap<String, f64>,
    /// Keyed by a lowercase phrase matched inside each standardised activity.
    pub activity: BTreeMap<String, f64>,
    /// Keyed by business category (`club`, `entertainment_venue`, ...).
    pub category: BTreeMap<String, f64>,
    pub recent_grant: f64,
    pub recent_grant_days: i64,
    pub old_grant: f64,
    pub per_extra_sighting: f64,
    pub max_sighting_discount: f64,
    /// Applied once when a record carries more than `many_conditions_threshold`
    /// conditions. Heavily conditioned premises are lower risk.
    pub many_conditions: f64,
    pub many_conditions_threshold: usize,
}

fn table(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            base: 5.0,
            licence_type: table(&[
                ("new", 0.0),
                ("variation", 0.5),
                ("transfer", 0.5),
                ("review", 2.0),
                ("provisional", 1.5),
            ]),
            activity: table(&[
                ("late night refreshment", 1.0),
                ("live music", 0.5),
                ("recorded music", 0.5),
                ("performance of dance", 0.5),
                ("boxing or wrestling entertainment", 1.5),
            ]),
            category: table(&[
                ("club", 2.0),
                ("bar", 2.0),
                ("takeaway", 1.0),
                ("hotel", -1.0),
                ("restaurant", -1.0),
            ]),
            recent_grant: 1.0,
            recent_grant_days: 365,
            old_grant: -0.5,
            per_extra_sighting: -0.25,
            max_sighting_discount: 1.0,
            many_conditions: -1.0,
            many_conditions_threshold: 5,
        }
    }
}

impl RiskWeights {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a non-positive recency window or
    /// a negative sighting cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_grant_days <= 0 {
            return Err(ConfigError::Validation(
                "risk weights: recent_grant_days must be positive".to_string(),
            ));
        }
        if self.max_sighting_discount < 0.0 {
            return Err(ConfigError::Validation(
                "risk weights: max_sighting_discount must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load weights from YAML. Keys left out keep their defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
pub fn load_risk_weights(path: &Path) -> Result<RiskWeights, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::WeightsFileIo {
        path: path.display().to_string(),
        source,
    })?;
    let weights: RiskWeights =
        serde_yaml::from_str(&raw).map_err(ConfigError::WeightsFileParse)?;
    weights.validate()?;
    Ok(weights)
}

/// Score a canonical record as of `as_of`.
#[must_use]
pub fn risk_score(record: &CanonicalLicenceRecord, as_of: NaiveDate, weights: &RiskWeights) -> f64 {
    let type_weight = weights
        .licence_type
        .get(record.licence_type.as_str())
        .copied()
        .unwrap_or(0.0);

    let activity_weight: f64 = record
        .licensable_activities
        .iter()
        .map(|activity| {
            let lower = activity.to_lowercase();
            weights
                .activity
                .iter()
                .filter(|(phrase, _)| lower.contains(phrase.as_str()))
                .map(|(_, weight)| *weight)
                .sum::<f64>()
        })
        .sum();

    let category_weight = weights
        .category
        .get(record.business_category.as_str())
        .copied()
        .unwrap_or(0.0);

    let recency = record
        .granted_date
        .map_or(0.0, |granted| recency_weight(granted, as_of, weights));

    let extra_sightings = f64::from(record.merge_count.saturating_sub(1));
    let cap = weights.max_sighting_discount;
    let sightings = (weights.per_extra_sighting * extra_sightings).clamp(-cap, cap);

    let conditions = if record.conditions.len() > weights.many_conditions_threshold {
        weights.many_conditions
    } else {
        0.0
    };

    let score = weights.base
        + type_weight
        + activity_weight
        + category_weight
        + recency
        + sightings
        + conditions;
    round2(score.clamp(MIN_SCORE, MAX_SCORE))
}

/// Full weight within the window, linear decay to zero at twice the window,
/// `old_grant` beyond that. Future dates count as granted today.
fn recency_weight(granted: NaiveDate, as_of: NaiveDate, weights: &RiskWeights) -> f64 {
    let window = weights.recent_grant_days.max(1);
    let age = (as_of - granted).num_days().max(0);
    if age <= window {
        weights.recent_grant
    } else if age < 2 * window {
        #[allow(clippy::cast_precision_loss)]
        let remaining = (2 * window - age) as f64 / window as f64;
        weights.recent_grant * remaining
    } else {
        weights.old_grant
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
