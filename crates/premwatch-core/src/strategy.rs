use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::targets::ExtractionTarget;

/// Retrieval approach. Declaration order is the cost order the selector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectListing,
    SearchForm,
    AiGuided,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::DirectListing,
        StrategyKind::SearchForm,
        StrategyKind::AiGuided,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::DirectListing => "direct_listing",
            StrategyKind::SearchForm => "search_form",
            StrategyKind::AiGuided => "ai_guided",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-strategy tuning supplied by the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub requires_rendering: bool,
    pub max_pages: usize,
    pub form_selector: Option<String>,
    pub query_field: Option<String>,
    pub query_value: Option<String>,
    pub extra_fields: BTreeMap<String, String>,
    pub snippet_max_chars: usize,
}

/// A strategy chosen for a target, not yet started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyPlan {
    pub kind: StrategyKind,
    pub parameters: StrategyParameters,
}

impl StrategyPlan {
    /// Stamp the plan into an attempt against `target`.
    #[must_use]
    pub fn begin(&self, target: &ExtractionTarget) -> StrategyAttempt {
        StrategyAttempt {
            kind: self.kind,
            target: target.clone(),
            parameters: self.parameters.clone(),
            started_at: Utc::now(),
        }
    }
}

/// One try of one strategy against one target.
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub kind: StrategyKind,
    pub target: ExtractionTarget,
    pub parameters: StrategyParameters,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedStrategy {
    pub council_id: String,
    pub strategy: StrategyKind,
    /// Run index in which the block was observed.
    pub run_index: u64,
}

/// Strategies that hit anti-automation defences, per council, across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyHistory {
    /// Index of the most recently completed run; 0 before the first run.
    #[serde(default)]
    pub last_run: u64,
    #[serde(default)]
    pub blocked: Vec<BlockedStrategy>,
}

impl StrategyHistory {
    #[must_use]
    pub fn next_run_index(&self) -> u64 {
        self.last_run.saturating_add(1)
    }

    /// Run index in which `strategy` was last blocked for `council_id`.
    #[must_use]
    pub fn blocked_in(&self, council_id: &str, strategy: StrategyKind) -> Option<u64> {
        self.blocked
            .iter()
            .filter(|b| b.council_id == council_id && b.strategy == strategy)
            .map(|b| b.run_index)
            .max()
    }

    /// `true` while `strategy` must be skipped for `council_id` in `current_run`.
    #[must_use]
    pub fn is_cooling_down(
        &self,
        council_id: &str,
        strategy: StrategyKind,
        current_run: u64,
        cooldown_runs: u64,
    ) -> bool {
        self.blocked_in(council_id, strategy)
            .is_some_and(|run| current_run.saturating_sub(run) <= cooldown_runs)
    }

    pub fn record_blocked(&mut self, council_id: &str, strategy: StrategyKind, run_index: u64) {
        if let Some(existing) = self
            .blocked
            .iter_mut()
            .find(|b| b.council_id == council_id && b.strategy == strategy)
        {
            existing.run_index = existing.run_index.max(run_index);
            return;
        }
        self.blocked.push(BlockedStrategy {
            council_id: council_id.to_string(),
            strategy,
            run_index,
        });
    }

    /// Mark `run_index` complete and forget blocks that no longer affect the next run.
    pub fn finish_run(&mut self, run_index: u64, cooldown_runs: u64) {
        self.last_run = self.last_run.max(run_index);
        let next = self.next_run_index();
        self.blocked
            .retain(|b| next.saturating_sub(b.run_index) <= cooldown_runs);
        self.blocked.sort_by(|a, b| {
            a.council_id
                .cmp(&b.council_id)
                .then(a.strategy.cmp(&b.strategy))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_kinds_order_cheapest_first() {
        let mut kinds = vec![
            StrategyKind::AiGuided,
            StrategyKind::DirectListing,
            StrategyKind::SearchForm,
        ];
        kinds.sort();
        assert_eq!(kinds, StrategyKind::ALL.to_vec());
    }

    #[test]
    fn cooldown_covers_exactly_the_window() {
        let mut history = StrategyHistory::default();
        history.record_blocked("X", StrategyKind::SearchForm, 5);

        assert!(history.is_cooling_down("X", StrategyKind::SearchForm, 5, 1));
        assert!(history.is_cooling_down("X", StrategyKind::SearchForm, 6, 1));
        assert!(!history.is_cooling_down("X", StrategyKind::SearchForm, 7, 1));
        assert!(!history.is_cooling_down("X", StrategyKind::DirectListing, 6, 1));
        assert!(!history.is_cooling_down("Y", StrategyKind::SearchForm, 6, 1));
    }

    #[test]
    fn record_blocked_keeps_latest_run() {
        let mut history = StrategyHistory::default();
        history.record_blocked("X", StrategyKind::AiGuided, 3);
        history.record_blocked("X", StrategyKind::AiGuided, 2);
        history.record_blocked("X", StrategyKind::AiGuided, 4);
        assert_eq!(history.blocked.len(), 1);
        assert_eq!(history.blocked_in("X", StrategyKind::AiGuided), Some(4));
    }

    #[test]
    fn finish_run_prunes_expired_blocks() {
        let mut history = StrategyHistory {
            last_run: 3,
            blocked: Vec::new(),
        };
        history.record_blocked("old", StrategyKind::DirectListing, 2);
        history.record_blocked("new", StrategyKind::DirectListing, 4);
        history.finish_run(4, 1);

        assert_eq!(history.last_run, 4);
        assert_eq!(history.next_run_index(), 5);
        assert!(history.blocked_in("old", StrategyKind::DirectListing).is_none());
        assert!(history.is_cooling_down("new", StrategyKind::DirectListing, 5, 1));
    }

    #[test]
    fn begin_copies_plan_into_attempt() {
        let plan = StrategyPlan {
            kind: StrategyKind::SearchForm,
            parameters: StrategyParameters {
                requires_rendering: false,
                max_pages: 10,
                form_selector: None,
                query_field: None,
                query_value: None,
                extra_fields: BTreeMap::new(),
                snippet_max_chars: 8000,
            },
        };
        let target = ExtractionTarget::new("X", "https://x.gov.uk/licensing");
        let attempt = plan.begin(&target);
        assert_eq!(attempt.kind, StrategyKind::SearchForm);
        assert_eq!(attempt.target, target);
        assert_eq!(attempt.parameters.max_pages, 10);
    }
}
