//! Pipeline controller: the try-next-strategy loop per target, fanned out
//! over a bounded worker pool.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use premwatch_core::{
    AppConfig, AttemptDiagnostic, ErrorKind, ExtractionOutcome, ExtractionStatus,
    ExtractionTarget, RawLicenceRecord, StrategyHistory, StrategyKind, StrategyResult,
};
use tokio_util::sync::CancellationToken;

use crate::error::StrategyFailure;
use crate::extract::Extractor;
use crate::retry::retry_with_backoff;
use crate::selector::{select_strategies, SelectorSettings};

/// Run-level stop signal: explicit cancellation or an optional deadline.
///
/// Once stopped, no new target is dispatched and no new strategy or retry is
/// started. In-flight fetches are left to finish or time out on their own.
#[derive(Debug, Clone)]
pub struct RunGuard {
    token: CancellationToken,
    deadline: Option<tokio::time::Instant>,
}

impl RunGuard {
    #[must_use]
    pub fn new(token: CancellationToken, run_deadline: Option<Duration>) -> Self {
        Self {
            token,
            deadline: run_deadline.map(|d| tokio::time::Instant::now() + d),
        }
    }

    /// A guard that only stops when its token is cancelled.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled()
            || self
                .deadline
                .is_some_and(|d| tokio::time::Instant::now() >= d)
    }

    /// Resolves once the run is stopped.
    pub async fn stopped(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub max_concurrent_targets: usize,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub backoff_base: Duration,
    pub confidence_floor: f64,
    pub selector: SelectorSettings,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_targets: config.max_concurrent_targets,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.inter_request_delay_ms),
            confidence_floor: config.confidence_floor,
            selector: SelectorSettings {
                ai_enabled: config.ai_enabled,
                max_pages: config.max_pages,
                snippet_max_chars: config.ai_snippet_max_chars,
                cooldown_runs: config.cooldown_runs,
            },
        }
    }
}

/// Result of processing one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub outcome: ExtractionOutcome,
    /// Records kept after the confidence floor, from the winning strategy only.
    pub records: Vec<RawLicenceRecord>,
    /// Strategies that were blocked by the target during this run.
    pub blocked: Vec<StrategyKind>,
}

impl TargetReport {
    fn without_records(outcome: ExtractionOutcome, blocked: Vec<StrategyKind>) -> Self {
        Self {
            outcome,
            records: Vec::new(),
            blocked,
        }
    }
}

/// Result of one batch pass over all targets.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// One outcome per target, ordered by council id.
    pub outcomes: Vec<ExtractionOutcome>,
    pub records: Vec<RawLicenceRecord>,
    /// `(council_id, strategy)` pairs blocked during this run.
    pub blocked: Vec<(String, StrategyKind)>,
}

impl PipelineReport {
    /// Fold this run's blocks into the persisted cooldown history.
    pub fn record_blocked(&self, history: &mut StrategyHistory, run_index: u64) {
        for (council_id, strategy) in &self.blocked {
            history.record_blocked(council_id, *strategy, run_index);
        }
    }
}

pub struct PipelineController {
    extractor: Extractor,
    settings: PipelineSettings,
    history: StrategyHistory,
    run_index: u64,
    guard: RunGuard,
}

impl PipelineController {
    /// `history` is a read-only snapshot taken at run start; blocks observed
    /// during the run are returned in the report rather than applied here.
    #[must_use]
    pub fn new(
        extractor: Extractor,
        settings: PipelineSettings,
        history: StrategyHistory,
        run_index: u64,
        guard: RunGuard,
    ) -> Self {
        Self {
            extractor,
            settings,
            history,
            run_index,
            guard,
        }
    }

    #[must_use]
    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Process every target with at most `max_concurrent_targets` in flight.
    pub async fn run(&self, targets: Vec<ExtractionTarget>) -> PipelineReport {
        let max_concurrent = self.settings.max_concurrent_targets.max(1);
        tracing::info!(
            targets = targets.len(),
            max_concurrent,
            run_index = self.run_index,
            "starting extraction pass"
        );

        // buffer_unordered polls each future only when a worker slot frees
        // up, so the stop check below runs at dispatch time.
        let reports: Vec<TargetReport> = stream::iter(targets)
            .map(|target| async move {
                if self.guard.should_stop() {
                    tracing::info!(council = %target.council_id, "run stopped; target not dispatched");
                    return TargetReport::without_records(
                        ExtractionOutcome::not_dispatched(target),
                        Vec::new(),
                    );
                }
                self.process_target(target).await
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let mut report = PipelineReport::default();
        for target_report in reports {
            let council_id = target_report.outcome.target.council_id.clone();
            report.blocked.extend(
                target_report
                    .blocked
                    .into_iter()
                    .map(|kind| (council_id.clone(), kind)),
            );
            report.records.extend(target_report.records);
            report.outcomes.push(target_report.outcome);
        }
        report
            .outcomes
            .sort_by(|a, b| a.target.council_id.cmp(&b.target.council_id));
        report.blocked.sort();
        report
    }

    /// Try the selected strategies for one target, in order, until one
    /// yields at least one record above the confidence floor.
    pub async fn process_target(&self, target: ExtractionTarget) -> TargetReport {
        let started = Instant::now();
        let selection = select_strategies(
            &target,
            &self.history,
            self.run_index,
            &self.settings.selector,
        );

        if selection.is_empty() {
            tracing::warn!(
                council = %target.council_id,
                skipped = ?selection.skipped,
                "every strategy is cooling down"
            );
            let outcome = finish(
                target,
                Vec::new(),
                Vec::new(),
                Ending::Failed {
                    kind: ErrorKind::BlockedByTarget,
                    reason: "all strategies in cooldown".to_string(),
                },
                started,
            );
            return TargetReport::without_records(outcome, Vec::new());
        }
        for kind in &selection.skipped {
            tracing::info!(council = %target.council_id, strategy = %kind, "skipping strategy in cooldown");
        }

        let mut tried = Vec::new();
        let mut diagnostics = Vec::new();
        let mut blocked = Vec::new();
        let mut last_failure: Option<StrategyFailure> = None;

        for plan in selection.plans {
            if self.guard.should_stop() {
                if tried.is_empty() {
                    return TargetReport::without_records(
                        ExtractionOutcome::not_dispatched(target),
                        blocked,
                    );
                }
                tracing::info!(council = %target.council_id, "run stopped; no further strategies");
                break;
            }

            let attempt = plan.begin(&target);
            tried.push(plan.kind);
            let strategy_started = Instant::now();

            let (result, attempts) = retry_with_backoff(
                self.settings.max_retries,
                self.settings.backoff_base,
                &self.guard,
                || self.extractor.run_strategy(&attempt),
            )
            .await;
            let elapsed_ms = millis(strategy_started.elapsed());

            match result {
                Ok(run) => {
                    let found = run.records.len();
                    let (kept, below): (Vec<_>, Vec<_>) = run
                        .records
                        .into_iter()
                        .partition(|r| r.confidence() >= self.settings.confidence_floor);
                    if !below.is_empty() {
                        tracing::debug!(
                            council = %target.council_id,
                            strategy = %plan.kind,
                            dropped = below.len(),
                            floor = self.settings.confidence_floor,
                            "records below confidence floor dropped"
                        );
                    }

                    diagnostics.push(AttemptDiagnostic {
                        strategy: plan.kind,
                        started_at: attempt.started_at,
                        attempts,
                        result: if kept.is_empty() {
                            StrategyResult::NoData
                        } else {
                            StrategyResult::Success
                        },
                        records: kept.len(),
                        below_floor: below.len(),
                        pages_fetched: run.pages_fetched,
                        truncated: run.truncated,
                        elapsed_ms,
                    });

                    if kept.is_empty() {
                        tracing::info!(
                            council = %target.council_id,
                            strategy = %plan.kind,
                            found,
                            "strategy found no usable records"
                        );
                        continue;
                    }

                    let partial = run.truncated || !below.is_empty();
                    let outcome = finish(
                        target,
                        tried,
                        diagnostics,
                        Ending::Succeeded {
                            strategy: plan.kind,
                            records: kept.len(),
                            partial,
                        },
                        started,
                    );
                    return TargetReport {
                        outcome,
                        records: kept,
                        blocked,
                    };
                }
                Err(failure) => {
                    tracing::warn!(
                        council = %target.council_id,
                        strategy = %plan.kind,
                        attempts,
                        error = %failure,
                        "strategy failed"
                    );
                    if failure.kind == ErrorKind::BlockedByTarget {
                        blocked.push(plan.kind);
                    }
                    diagnostics.push(AttemptDiagnostic {
                        strategy: plan.kind,
                        started_at: attempt.started_at,
                        attempts,
                        result: StrategyResult::Failed {
                            kind: failure.kind,
                            reason: failure.reason.clone(),
                        },
                        records: 0,
                        below_floor: 0,
                        pages_fetched: 0,
                        truncated: false,
                        elapsed_ms,
                    });
                    last_failure = Some(failure);
                }
            }
        }

        let ending = match last_failure {
            Some(failure) => Ending::Failed {
                kind: failure.kind,
                reason: failure.reason,
            },
            None => Ending::Failed {
                kind: ErrorKind::ParseFailure,
                reason: "no licence records found".to_string(),
            },
        };
        let outcome = finish(target, tried, diagnostics, ending, started);
        TargetReport::without_records(outcome, blocked)
    }
}

enum Ending {
    Succeeded {
        strategy: StrategyKind,
        records: usize,
        partial: bool,
    },
    Failed {
        kind: ErrorKind,
        reason: String,
    },
}

fn finish(
    target: ExtractionTarget,
    strategies_tried: Vec<StrategyKind>,
    diagnostics: Vec<AttemptDiagnostic>,
    ending: Ending,
    started: Instant,
) -> ExtractionOutcome {
    let elapsed_ms = millis(started.elapsed());
    let outcome = match ending {
        Ending::Succeeded {
            strategy,
            records,
            partial,
        } => ExtractionOutcome {
            target,
            strategies_tried,
            final_status: if partial {
                ExtractionStatus::PartialSuccess
            } else {
                ExtractionStatus::Succeeded
            },
            records_found: records,
            error_kind: None,
            reason: None,
            winning_strategy: Some(strategy),
            diagnostics,
            elapsed_ms,
        },
        Ending::Failed { kind, reason } => ExtractionOutcome {
            target,
            strategies_tried,
            final_status: ExtractionStatus::Failed,
            records_found: 0,
            error_kind: Some(kind),
            reason: Some(reason),
            winning_strategy: None,
            diagnostics,
            elapsed_ms,
        },
    };
    tracing::info!(
        council = %outcome.target.council_id,
        status = ?outcome.final_status,
        records = outcome.records_found,
        tried = outcome.strategies_tried.len(),
        elapsed_ms,
        "target finished"
    );
    outcome
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
