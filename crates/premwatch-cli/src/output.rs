//! Plain-text rendering of run results for the terminal.

use premwatch_core::{ExtractionStatus, ExtractionTarget, RunSummary, StrategyKind, TargetConfig};
use premwatch_normalize::CanonicalSet;
use premwatch_scraper::StrategySelection;

fn status_label(status: ExtractionStatus) -> &'static str {
    match status {
        ExtractionStatus::Succeeded => "ok",
        ExtractionStatus::PartialSuccess => "partial",
        ExtractionStatus::Failed => "FAILED",
    }
}

fn strategy_list(kinds: &[StrategyKind]) -> String {
    if kinds.is_empty() {
        return "-".to_string();
    }
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}

pub(crate) fn format_summary(summary: &RunSummary) -> String {
    let counts = summary.status_counts;
    let mut lines = vec![
        format!(
            "run {} ({}) finished in {:.1}s",
            summary.run_index,
            summary.run_id,
            seconds(summary.elapsed_ms)
        ),
        format!(
            "targets: {} total, {} succeeded, {} partial, {} failed",
            summary.targets_total, counts.succeeded, counts.partial_success, counts.failed
        ),
        format!(
            "records: {} raw, {} dropped, {} new, {} merged, {} canonical",
            summary.raw_records,
            summary.dropped_records,
            summary.new_records,
            summary.merged_records,
            summary.canonical_total
        ),
        format!(
            "postcode completion: {:.0}%, mean time per target: {}ms",
            summary.postcode_completion_rate * 100.0,
            summary.mean_target_ms
        ),
    ];

    if !summary.councils.is_empty() {
        lines.push(String::new());
        for council in &summary.councils {
            let detail = match (&council.reason, council.error_kind) {
                (Some(reason), Some(kind)) => format!("{kind}: {reason}"),
                (Some(reason), None) => reason.clone(),
                (None, _) => format!("{} records", council.records_found),
            };
            lines.push(format!(
                "  {:<24} {:<8} {:<40} {}",
                council.council_id,
                status_label(council.status),
                strategy_list(&council.strategies_tried),
                detail
            ));
        }
    }

    if !summary.records_by_category.is_empty() {
        lines.push(String::new());
        let categories: Vec<String> = summary
            .records_by_category
            .iter()
            .map(|(category, count)| format!("{category}={count}"))
            .collect();
        lines.push(format!("by category: {}", categories.join(", ")));
    }
    if !summary.records_by_licence_category.is_empty() {
        let categories: Vec<String> = summary
            .records_by_licence_category
            .iter()
            .map(|(category, count)| format!("{category}={count}"))
            .collect();
        lines.push(format!(
            "by licence category: {} ({} with conditions)",
            categories.join(", "),
            summary.records_with_conditions
        ));
    }
    lines.join("\n")
}

#[allow(clippy::cast_precision_loss)]
fn seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

pub(crate) fn format_plan(run_index: u64, plans: &[(ExtractionTarget, StrategySelection)]) -> String {
    let mut lines = vec![format!(
        "dry-run: run {run_index} would dispatch {} targets",
        plans.len()
    )];
    for (target, selection) in plans {
        let kinds: Vec<StrategyKind> = selection.plans.iter().map(|p| p.kind).collect();
        let mut line = format!(
            "  {:<24} {:<40} {}",
            target.council_id,
            strategy_list(&kinds),
            target.url
        );
        if !selection.skipped.is_empty() {
            line.push_str(&format!(" (cooling down: {})", strategy_list(&selection.skipped)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub(crate) fn format_targets(targets: &[TargetConfig]) -> String {
    let enabled = targets.iter().filter(|t| t.enabled).count();
    let mut lines = vec![format!(
        "{} targets ({enabled} enabled)",
        targets.len()
    )];
    for target in targets {
        let mut flags = Vec::new();
        if !target.enabled {
            flags.push("disabled");
        }
        if let Some(hints) = &target.form_hints {
            flags.push("form-hints");
            if hints.requires_rendering {
                flags.push("rendered");
            }
        }
        lines.push(format!(
            "  {:<24} {:<60} {}",
            target.council_id,
            target.url,
            flags.join(",")
        ));
    }
    lines.join("\n")
}

pub(crate) fn format_records(set: &CanonicalSet, limit: usize) -> String {
    let mut lines = vec![format!("{} canonical records", set.len())];

    let mut ranked: Vec<_> = set.values().collect();
    ranked.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.business_name.cmp(&b.business_name))
    });
    for record in ranked.into_iter().take(limit) {
        lines.push(format!(
            "  {:>5.2}  {:<20} {:<40} {:<9} {}",
            record.risk_score,
            record.business_category.as_str(),
            record.business_name,
            record.postcode.as_deref().unwrap_or("-"),
            record
                .source_council_ids
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",")
        ));
    }
    lines.join("\n")
}
