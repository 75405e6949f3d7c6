//! Strategy selection.
//!
//! Pure: the same target, history snapshot and settings always give the same
//! ordered plan list.

use std::collections::BTreeMap;

use premwatch_core::{
    ExtractionTarget, StrategyHistory, StrategyKind, StrategyParameters, StrategyPlan,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorSettings {
    pub ai_enabled: bool,
    pub max_pages: usize,
    pub snippet_max_chars: usize,
    pub cooldown_runs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySelection {
    /// Strategies to try, cheapest first.
    pub plans: Vec<StrategyPlan>,
    /// Strategies skipped because they are still cooling down after a block.
    pub skipped: Vec<StrategyKind>,
}

impl StrategySelection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Choose the ordered strategies for `target` in run `run_index`.
///
/// Order is direct listing, then search form, then AI-guided (only when AI
/// is enabled). A strategy blocked for this council within the cooldown
/// window is skipped.
#[must_use]
pub fn select_strategies(
    target: &ExtractionTarget,
    history: &StrategyHistory,
    run_index: u64,
    settings: &SelectorSettings,
) -> StrategySelection {
    let mut plans = Vec::new();
    let mut skipped = Vec::new();

    for kind in StrategyKind::ALL {
        if kind == StrategyKind::AiGuided && !settings.ai_enabled {
            continue;
        }
        if history.is_cooling_down(&target.council_id, kind, run_index, settings.cooldown_runs) {
            skipped.push(kind);
            continue;
        }
        plans.push(StrategyPlan {
            kind,
            parameters: parameters_for(kind, target, settings),
        });
    }

    StrategySelection { plans, skipped }
}

fn parameters_for(
    kind: StrategyKind,
    target: &ExtractionTarget,
    settings: &SelectorSettings,
) -> StrategyParameters {
    let (form_selector, query_field, query_value, extra_fields) =
        match (kind, target.form_hints.as_ref()) {
            (StrategyKind::SearchForm, Some(hints)) => (
                hints.form_selector.clone(),
                hints.query_field.clone(),
                hints.query_value.clone(),
                hints.extra_fields.clone(),
            ),
            _ => (None, None, None, BTreeMap::new()),
        };

    StrategyParameters {
        requires_rendering: target.requires_rendering(),
        max_pages: if kind == StrategyKind::AiGuided {
            1
        } else {
            settings.max_pages
        },
        form_selector,
        query_field,
        query_value,
        extra_fields,
        snippet_max_chars: settings.snippet_max_chars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use premwatch_core::FormHints;

    fn settings(ai_enabled: bool) -> SelectorSettings {
        SelectorSettings {
            ai_enabled,
            max_pages: 10,
            snippet_max_chars: 8000,
            cooldown_runs: 1,
        }
    }

    fn kinds(selection: &StrategySelection) -> Vec<StrategyKind> {
        selection.plans.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn orders_cheapest_first() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let selection = select_strategies(&target, &StrategyHistory::default(), 1, &settings(true));
        assert_eq!(
            kinds(&selection),
            vec![
                StrategyKind::DirectListing,
                StrategyKind::SearchForm,
                StrategyKind::AiGuided
            ]
        );
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn omits_ai_when_disabled() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let selection =
            select_strategies(&target, &StrategyHistory::default(), 1, &settings(false));
        assert_eq!(
            kinds(&selection),
            vec![StrategyKind::DirectListing, StrategyKind::SearchForm]
        );
    }

    #[test]
    fn skips_strategy_blocked_last_run() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let mut history = StrategyHistory::default();
        history.record_blocked("camden", StrategyKind::DirectListing, 3);

        let selection = select_strategies(&target, &history, 4, &settings(false));
        assert_eq!(kinds(&selection), vec![StrategyKind::SearchForm]);
        assert_eq!(selection.skipped, vec![StrategyKind::DirectListing]);

        // Cooldown of one run has elapsed by run 5.
        let selection = select_strategies(&target, &history, 5, &settings(false));
        assert_eq!(
            kinds(&selection),
            vec![StrategyKind::DirectListing, StrategyKind::SearchForm]
        );
    }

    #[test]
    fn block_on_other_council_does_not_apply() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let mut history = StrategyHistory::default();
        history.record_blocked("hackney", StrategyKind::DirectListing, 3);
        let selection = select_strategies(&target, &history, 4, &settings(false));
        assert_eq!(selection.plans.len(), 2);
    }

    #[test]
    fn all_blocked_yields_empty_plan() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let mut history = StrategyHistory::default();
        for kind in StrategyKind::ALL {
            history.record_blocked("camden", kind, 2);
        }
        let selection = select_strategies(&target, &history, 3, &settings(true));
        assert!(selection.is_empty());
        assert_eq!(selection.skipped.len(), 3);
    }

    #[test]
    fn form_hints_flow_into_search_form_parameters() {
        let mut extra = BTreeMap::new();
        extra.insert("ward".to_string(), "all".to_string());
        let target = ExtractionTarget::new("leeds", "https://leeds.gov.uk/licensing")
            .with_form_hints(FormHints {
                form_selector: Some("form#search".to_string()),
                query_field: Some("q".to_string()),
                query_value: Some("premises".to_string()),
                requires_rendering: true,
                extra_fields: extra.clone(),
            });
        let selection = select_strategies(&target, &StrategyHistory::default(), 1, &settings(true));

        let direct = &selection.plans[0].parameters;
        assert!(direct.requires_rendering);
        assert_eq!(direct.form_selector, None);
        assert_eq!(direct.max_pages, 10);

        let search = &selection.plans[1].parameters;
        assert_eq!(search.form_selector.as_deref(), Some("form#search"));
        assert_eq!(search.query_field.as_deref(), Some("q"));
        assert_eq!(search.query_value.as_deref(), Some("premises"));
        assert_eq!(search.extra_fields, extra);

        let ai = &selection.plans[2].parameters;
        assert_eq!(ai.max_pages, 1);
        assert_eq!(ai.snippet_max_chars, 8000);
    }

    #[test]
    fn selection_is_deterministic() {
        let target = ExtractionTarget::new("camden", "https://camden.gov.uk/licensing");
        let mut history = StrategyHistory::default();
        history.record_blocked("camden", StrategyKind::SearchForm, 1);
        let a = select_strategies(&target, &history, 2, &settings(true));
        let b = select_strategies(&target, &history, 2, &settings(true));
        assert_eq!(a, b);
    }
}
