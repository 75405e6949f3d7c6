//! Command handlers. Each one loads what it needs from config and the state
//! directory and delegates to the library crates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use premwatch_core::{load_targets, AppConfig, ExtractionTarget, RunSummary, StrategyHistory};
use premwatch_normalize::{aggregate, load_risk_weights, Normalizer, RiskWeights, RunMeta};
use premwatch_scraper::{
    select_strategies, AiExtractor, Extractor, ExtractorSettings, FetchRouter, Fetcher,
    HttpFetcher, OpenAiClient, PipelineController, PipelineSettings, RateLimiter, RunGuard,
    StrategySelection,
};
use premwatch_store::StateStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::output;

#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub council: Option<String>,
    pub max_targets: Option<usize>,
    pub dry_run: bool,
}

/// Narrow the enabled targets to the ones this invocation should process.
///
/// # Errors
///
/// Returns an error when `--council` names a council that is not enabled.
pub(crate) fn select_targets(
    targets: Vec<ExtractionTarget>,
    options: &RunOptions,
) -> anyhow::Result<Vec<ExtractionTarget>> {
    let mut targets = match options.council.as_deref() {
        Some(council) => {
            let matching: Vec<ExtractionTarget> = targets
                .into_iter()
                .filter(|t| t.council_id == council)
                .collect();
            if matching.is_empty() {
                anyhow::bail!("council '{council}' is not an enabled target");
            }
            matching
        }
        None => targets,
    };
    if let Some(max) = options.max_targets {
        targets.truncate(max);
    }
    Ok(targets)
}

fn load_weights(config: &AppConfig) -> anyhow::Result<RiskWeights> {
    match &config.risk_weights_path {
        Some(path) => Ok(load_risk_weights(path)?),
        None => Ok(RiskWeights::default()),
    }
}

fn build_extractor(config: &AppConfig) -> anyhow::Result<Extractor> {
    let http = HttpFetcher::new(config.request_timeout_secs, &config.user_agent)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP fetcher: {e}"))?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(FetchRouter::new(Arc::new(http), None));

    let ai: Option<Arc<dyn AiExtractor>> = if config.ai_enabled {
        let api_key = config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("AI extraction is enabled but OPENAI_API_KEY is not set"))?;
        let client = OpenAiClient::with_base_url(
            api_key,
            &config.ai_model,
            config.request_timeout_secs,
            &config.ai_base_url,
        )
        .map_err(|e| anyhow::anyhow!("failed to build AI client: {e}"))?;
        let client: Arc<dyn AiExtractor> = Arc::new(client);
        Some(client)
    } else {
        None
    };

    let limiter = RateLimiter::shared(Duration::from_millis(config.inter_request_delay_ms));
    Ok(Extractor::new(
        fetcher,
        ai,
        limiter,
        ExtractorSettings::from_app_config(config),
    ))
}

/// Run one full batch pass: extract, normalize, aggregate, persist.
///
/// With `dry_run` set, prints each target's strategy plan and returns
/// without any network access or state writes.
///
/// # Errors
///
/// Returns an error for configuration problems (targets file, weights file,
/// AI credentials) or when state cannot be read or written. Per-target
/// failures are recorded in the summary, not returned.
pub(crate) async fn run_extraction(
    config: &AppConfig,
    options: &RunOptions,
) -> anyhow::Result<Option<RunSummary>> {
    let targets_file = load_targets(&config.targets_path)?;
    let targets = select_targets(targets_file.extraction_targets(), options)?;
    let weights = load_weights(config)?;
    let store = StateStore::new(&config.data_dir);
    let mut history = store.load_history()?;
    let run_index = history.next_run_index();
    let pipeline_settings = PipelineSettings::from_app_config(config);

    if options.dry_run {
        let plans: Vec<(ExtractionTarget, StrategySelection)> = targets
            .into_iter()
            .map(|target| {
                let selection =
                    select_strategies(&target, &history, run_index, &pipeline_settings.selector);
                (target, selection)
            })
            .collect();
        println!("{}", output::format_plan(run_index, &plans));
        return Ok(None);
    }

    let mut canonical = store.load_canonical()?;
    let extractor = build_extractor(config)?;

    let token = CancellationToken::new();
    let guard = RunGuard::new(
        token.clone(),
        config.run_deadline_secs.map(Duration::from_secs),
    );
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; no new targets or retries will start");
            token.cancel();
        }
    });

    let controller = PipelineController::new(
        extractor,
        pipeline_settings,
        history.clone(),
        run_index,
        guard,
    );
    let started_at = Utc::now();
    let report = controller.run(targets).await;
    interrupt.abort();

    report.record_blocked(&mut history, run_index);
    history.finish_run(run_index, config.cooldown_runs);

    let raw_records = report.records.len();
    let normalized = Normalizer::new(weights).normalize(&mut canonical, report.records, started_at);
    let meta = RunMeta {
        run_id: Uuid::new_v4(),
        run_index,
        started_at,
        finished_at: Utc::now(),
    };
    let summary = aggregate(&meta, &report.outcomes, &normalized, raw_records, &canonical);

    save_state(&store, &history, &canonical, &summary)?;
    println!("{}", output::format_summary(&summary));
    Ok(Some(summary))
}

fn save_state(
    store: &StateStore,
    history: &StrategyHistory,
    canonical: &premwatch_normalize::CanonicalSet,
    summary: &RunSummary,
) -> anyhow::Result<()> {
    store.save_history(history)?;
    store.save_canonical(canonical)?;
    let path = store.save_summary(summary)?;
    tracing::info!(
        run_index = summary.run_index,
        canonical = canonical.len(),
        summary = %path.display(),
        "run state saved"
    );
    Ok(())
}

/// # Errors
///
/// Returns an error when the targets file cannot be read or fails validation.
pub(crate) fn list_targets(config: &AppConfig) -> anyhow::Result<()> {
    let targets_file = load_targets(&config.targets_path)?;
    println!("{}", output::format_targets(&targets_file.targets));
    Ok(())
}

/// # Errors
///
/// Returns an error when the canonical store cannot be read.
pub(crate) fn show_records(config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let store = StateStore::new(&config.data_dir);
    let canonical = store.load_canonical()?;
    println!("{}", output::format_records(&canonical, limit));
    Ok(())
}
