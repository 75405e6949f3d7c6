//! Per-target outcomes and the run summary handed to reporting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::strategy::StrategyKind;
use crate::targets::ExtractionTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Succeeded,
    PartialSuccess,
    Failed,
}

/// Terminal result of one strategy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StrategyResult {
    Success,
    NoData,
    Failed { kind: ErrorKind, reason: String },
}

impl StrategyResult {
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            StrategyResult::Failed { kind, .. } => Some(*kind),
            StrategyResult::Success | StrategyResult::NoData => None,
        }
    }
}

/// Diagnostics for one strategy, retries included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDiagnostic {
    pub strategy: StrategyKind,
    pub started_at: DateTime<Utc>,
    /// Number of times the strategy was run, the first try included.
    pub attempts: u32,
    pub result: StrategyResult,
    /// Records accepted after the confidence floor.
    pub records: usize,
    /// Records discarded by the confidence floor.
    pub below_floor: usize,
    pub pages_fetched: usize,
    pub truncated: bool,
    pub elapsed_ms: u64,
}

/// Final result for one target in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub target: ExtractionTarget,
    pub strategies_tried: Vec<StrategyKind>,
    pub final_status: ExtractionStatus,
    pub records_found: usize,
    pub error_kind: Option<ErrorKind>,
    pub reason: Option<String>,
    pub winning_strategy: Option<StrategyKind>,
    pub diagnostics: Vec<AttemptDiagnostic>,
    pub elapsed_ms: u64,
}

impl ExtractionOutcome {
    /// Outcome for a target the run stopped before dispatching.
    #[must_use]
    pub fn not_dispatched(target: ExtractionTarget) -> Self {
        Self {
            target,
            strategies_tried: Vec::new(),
            final_status: ExtractionStatus::Failed,
            records_found: 0,
            error_kind: None,
            reason: Some("not dispatched: run stopped".to_string()),
            winning_strategy: None,
            diagnostics: Vec::new(),
            elapsed_ms: 0,
        }
    }

    #[must_use]
    pub fn was_dispatched(&self) -> bool {
        !self.strategies_tried.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub succeeded: usize,
    pub partial_success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilBreakdown {
    pub council_id: String,
    pub status: ExtractionStatus,
    pub strategies_tried: Vec<StrategyKind>,
    pub winning_strategy: Option<StrategyKind>,
    pub records_found: usize,
    pub error_kind: Option<ErrorKind>,
    pub reason: Option<String>,
    pub elapsed_ms: u64,
}

/// Run-level summary consumed by the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_index: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub targets_total: usize,
    pub status_counts: StatusCounts,
    /// Raw records handed to the normalizer.
    pub raw_records: usize,
    /// Raw records dropped by validation.
    pub dropped_records: usize,
    pub canonical_total: usize,
    pub new_records: usize,
    pub merged_records: usize,
    pub councils: Vec<CouncilBreakdown>,
    pub records_by_category: BTreeMap<String, usize>,
    /// A record carrying several categories counts once under each.
    #[serde(default)]
    pub records_by_licence_category: BTreeMap<String, usize>,
    #[serde(default)]
    pub records_with_conditions: usize,
    pub targets_by_strategy: BTreeMap<String, usize>,
    /// Share of canonical records with a valid postcode, in `[0, 1]`.
    pub postcode_completion_rate: f64,
    pub mean_target_ms: u64,
}
