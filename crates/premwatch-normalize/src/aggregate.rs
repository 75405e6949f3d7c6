//! Run aggregation. Pure computation over outcomes and the canonical set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use premwatch_core::{
    CouncilBreakdown, ExtractionOutcome, ExtractionStatus, RunSummary, StatusCounts,
};
use uuid::Uuid;

use crate::normalizer::{CanonicalSet, NormalizeReport};

/// Identity and timing of the run being summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMeta {
    pub run_id: Uuid,
    pub run_index: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[must_use]
pub fn aggregate(
    meta: &RunMeta,
    outcomes: &[ExtractionOutcome],
    normalized: &NormalizeReport,
    raw_records: usize,
    set: &CanonicalSet,
) -> RunSummary {
    let mut status_counts = StatusCounts::default();
    let mut targets_by_strategy: BTreeMap<String, usize> = BTreeMap::new();
    let mut councils = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        match outcome.final_status {
            ExtractionStatus::Succeeded => status_counts.succeeded += 1,
            ExtractionStatus::PartialSuccess => status_counts.partial_success += 1,
            ExtractionStatus::Failed => status_counts.failed += 1,
        }
        if let Some(strategy) = outcome.winning_strategy {
            *targets_by_strategy.entry(strategy.to_string()).or_default() += 1;
        }
        councils.push(CouncilBreakdown {
            council_id: outcome.target.council_id.clone(),
            status: outcome.final_status,
            strategies_tried: outcome.strategies_tried.clone(),
            winning_strategy: outcome.winning_strategy,
            records_found: outcome.records_found,
            error_kind: outcome.error_kind,
            reason: outcome.reason.clone(),
            elapsed_ms: outcome.elapsed_ms,
        });
    }
    councils.sort_by(|a, b| a.council_id.cmp(&b.council_id));

    let mut records_by_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut records_by_licence_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut with_postcode = 0usize;
    let mut with_conditions = 0usize;
    for record in set.values() {
        *records_by_category
            .entry(record.business_category.to_string())
            .or_default() += 1;
        for category in &record.licence_categories {
            *records_by_licence_category
                .entry(category.to_string())
                .or_default() += 1;
        }
        if record.postcode.is_some() {
            with_postcode += 1;
        }
        if !record.conditions.is_empty() {
            with_conditions += 1;
        }
    }

    let dispatched: Vec<u64> = outcomes
        .iter()
        .filter(|o| o.was_dispatched())
        .map(|o| o.elapsed_ms)
        .collect();
    let mean_target_ms = if dispatched.is_empty() {
        0
    } else {
        dispatched.iter().sum::<u64>() / dispatched.len() as u64
    };

    let elapsed_ms = u64::try_from(
        (meta.finished_at - meta.started_at)
            .num_milliseconds()
            .max(0),
    )
    .unwrap_or(0);

    RunSummary {
        run_id: meta.run_id,
        run_index: meta.run_index,
        started_at: meta.started_at,
        finished_at: meta.finished_at,
        elapsed_ms,
        targets_total: outcomes.len(),
        status_counts,
        raw_records,
        dropped_records: normalized.dropped.len(),
        canonical_total: set.len(),
        new_records: normalized.created,
        merged_records: normalized.merged,
        councils,
        records_by_category,
        records_by_licence_category,
        records_with_conditions: with_conditions,
        targets_by_strategy,
        postcode_completion_rate: ratio(with_postcode, set.len()),
        mean_target_ms,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use premwatch_core::{
        ErrorKind, ExtractionTarget, LicenceFields, RawLicenceRecord, RecordOrigin, StrategyKind,
    };

    use crate::normalizer::Normalizer;
    use crate::risk::RiskWeights;

    fn meta() -> RunMeta {
        RunMeta {
            run_id: Uuid::nil(),
            run_index: 4,
            started_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 2, 30).unwrap(),
        }
    }

    fn outcome(
        council: &str,
        status: ExtractionStatus,
        tried: &[StrategyKind],
        winner: Option<StrategyKind>,
        records: usize,
        elapsed_ms: u64,
    ) -> ExtractionOutcome {
        ExtractionOutcome {
            target: ExtractionTarget::new(council, format!("https://{council}.gov.uk")),
            strategies_tried: tried.to_vec(),
            final_status: status,
            records_found: records,
            error_kind: (status == ExtractionStatus::Failed).then_some(ErrorKind::NetworkFailure),
            reason: None,
            winning_strategy: winner,
            diagnostics: Vec::new(),
            elapsed_ms,
        }
    }

    fn sighting(council: &str, name: &str, postcode: Option<&str>) -> RawLicenceRecord {
        sighting_with(council, name, postcode, LicenceFields::default())
    }

    fn sighting_with(
        council: &str,
        name: &str,
        postcode: Option<&str>,
        extra: LicenceFields,
    ) -> RawLicenceRecord {
        RawLicenceRecord::new(
            RecordOrigin {
                council_id: council.to_string(),
                source_url: format!("https://{council}.gov.uk"),
                strategy: StrategyKind::DirectListing,
            },
            LicenceFields {
                business_name: name.to_string(),
                address: "1 Market Square".to_string(),
                postcode: postcode.map(str::to_string),
                ..extra
            },
            0.9,
        )
        .unwrap()
    }

    #[test]
    fn summarizes_outcomes_and_records() {
        use StrategyKind::{DirectListing, SearchForm};

        let outcomes = vec![
            outcome("york", ExtractionStatus::Succeeded, &[DirectListing], Some(DirectListing), 2, 100),
            outcome("bath", ExtractionStatus::PartialSuccess, &[DirectListing, SearchForm], Some(SearchForm), 1, 300),
            outcome("leeds", ExtractionStatus::Failed, &[DirectListing, SearchForm], None, 0, 200),
            ExtractionOutcome::not_dispatched(ExtractionTarget::new("hull", "https://hull.gov.uk")),
        ];

        let raw = vec![
            sighting("york", "The Golden Fleece Inn", Some("YO1 9UP")),
            sighting_with(
                "york",
                "Betty's Cafe",
                None,
                LicenceFields {
                    activities: vec!["Late night refreshment".to_string(), "Recorded music".to_string()],
                    conditions: vec!["No deliveries before 08:00".to_string()],
                    ..LicenceFields::default()
                },
            ),
            sighting("bath", "Golden Fleece Inn", Some("yo19up")),
            sighting("bath", "Menu", None),
        ];
        let raw_count = raw.len();
        let mut set = CanonicalSet::new();
        let report = Normalizer::new(RiskWeights::default()).normalize(
            &mut set,
            raw,
            meta().finished_at,
        );

        let summary = aggregate(&meta(), &outcomes, &report, raw_count, &set);

        assert_eq!(summary.run_index, 4);
        assert_eq!(summary.elapsed_ms, 150_000);
        assert_eq!(summary.targets_total, 4);
        assert_eq!(
            summary.status_counts,
            StatusCounts { succeeded: 1, partial_success: 1, failed: 2 }
        );
        assert_eq!(summary.raw_records, 4);
        assert_eq!(summary.dropped_records, 1);
        assert_eq!(summary.canonical_total, 2);
        assert_eq!(summary.new_records, 2);
        assert_eq!(summary.merged_records, 1);

        let ids: Vec<&str> = summary.councils.iter().map(|c| c.council_id.as_str()).collect();
        assert_eq!(ids, vec!["bath", "hull", "leeds", "york"]);
        assert_eq!(summary.councils[1].reason.as_deref(), Some("not dispatched: run stopped"));

        assert_eq!(summary.records_by_category.get("pub"), Some(&1));
        assert_eq!(summary.records_by_category.get("cafe"), Some(&1));
        assert_eq!(summary.targets_by_strategy.get("direct_listing"), Some(&1));
        assert_eq!(summary.targets_by_strategy.get("search_form"), Some(&1));
        assert!((summary.postcode_completion_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.mean_target_ms, 200);

        assert_eq!(summary.records_with_conditions, 1);
        assert_eq!(summary.records_by_licence_category.get("general"), Some(&1));
        assert_eq!(
            summary.records_by_licence_category.get("late_night_refreshment"),
            Some(&1)
        );
        assert_eq!(summary.records_by_licence_category.get("entertainment"), Some(&1));
    }

    #[test]
    fn empty_run_has_zero_rates() {
        let summary = aggregate(&meta(), &[], &NormalizeReport::default(), 0, &CanonicalSet::new());
        assert_eq!(summary.targets_total, 0);
        assert_eq!(summary.canonical_total, 0);
        assert!(summary.postcode_completion_rate.abs() < f64::EPSILON);
        assert_eq!(summary.mean_target_ms, 0);
        assert!(summary.councils.is_empty());
    }
}
