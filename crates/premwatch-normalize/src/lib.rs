//! Normalization, deduplication, classification, risk scoring and run
//! aggregation for scraped licence records.

pub mod aggregate;
pub mod classify;
pub mod hours;
pub mod identity;
pub mod normalizer;
pub mod postcode;
pub mod risk;
pub mod text;

pub use aggregate::{aggregate, RunMeta};
pub use classify::{
    business_category, licence_categories, licence_status, licence_type, standardize_activities,
};
pub use hours::{standardize_hours, standardize_times};
pub use identity::identity_key;
pub use normalizer::{CanonicalSet, DroppedRecord, NormalizeReport, Normalizer};
pub use postcode::{extract_postcode, normalize_postcode};
pub use risk::{load_risk_weights, risk_score, RiskWeights};
pub use text::{
    clean_address, clean_conditions, clean_holder_name, clean_person_name, clean_text, match_key,
};
