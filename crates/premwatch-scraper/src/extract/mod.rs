//! Strategy execution: turn one [`StrategyAttempt`] into raw licence records.
//!
//! Every outbound request (page fetch or AI call) first takes a slot from the
//! shared [`RateLimiter`](crate::RateLimiter) and then runs under its own timeout.

mod ai_guided;
mod listing;
mod search_form;

use std::sync::Arc;
use std::time::Duration;

use premwatch_core::{
    AppConfig, ErrorKind, LicenceFields, RawLicenceRecord, RecordOrigin, StrategyAttempt, StrategyKind,
};

use crate::ai::AiExtractor;
use crate::error::StrategyFailure;
use crate::fetch::{FetchRequest, FetchResult, Fetcher};
use crate::html::ListingLayout;
use crate::rate_limit::SharedRateLimiter;

/// Confidence assigned to rows read from a recognized licence table.
pub const TABLE_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to rows read from a card layout.
pub const CARD_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorSettings {
    pub fetch_timeout: Duration,
    pub render_timeout: Duration,
    pub ai_timeout: Duration,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            render_timeout: Duration::from_secs(30),
            ai_timeout: Duration::from_secs(30),
        }
    }
}

impl ExtractorSettings {
    /// AI calls share the plain request timeout.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.request_timeout_secs),
            render_timeout: Duration::from_secs(config.browser_timeout_secs),
            ai_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// What one successful strategy run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyRun {
    pub records: Vec<RawLicenceRecord>,
    pub pages_fetched: usize,
    /// Pagination stopped early (page cap or a failed follow-up page).
    pub truncated: bool,
}

pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    ai: Option<Arc<dyn AiExtractor>>,
    limiter: SharedRateLimiter,
    settings: ExtractorSettings,
}

impl Extractor {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        ai: Option<Arc<dyn AiExtractor>>,
        limiter: SharedRateLimiter,
        settings: ExtractorSettings,
    ) -> Self {
        Self {
            fetcher,
            ai,
            limiter,
            settings,
        }
    }

    #[must_use]
    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Run one strategy attempt to completion.
    ///
    /// An empty `records` list is a successful run that found nothing; the
    /// caller decides whether that means "try the next strategy".
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyFailure`] classified into the error taxonomy when
    /// the strategy could not run to completion.
    pub async fn run_strategy(
        &self,
        attempt: &StrategyAttempt,
    ) -> Result<StrategyRun, StrategyFailure> {
        tracing::debug!(
            council = %attempt.target.council_id,
            strategy = %attempt.kind,
            url = %attempt.target.url,
            "running strategy"
        );
        match attempt.kind {
            StrategyKind::DirectListing => listing::run(self, attempt).await,
            StrategyKind::SearchForm => search_form::run(self, attempt).await,
            StrategyKind::AiGuided => ai_guided::run(self, attempt).await,
        }
    }

    /// One rate-limited, time-bounded fetch.
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        self.limiter.acquire().await;
        let limit = if request.requires_rendering {
            self.settings.render_timeout
        } else {
            self.settings.fetch_timeout
        };
        match tokio::time::timeout(limit, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(url = %request.url, "fetch exceeded its time limit");
                FetchResult::timeout(millis(limit))
            }
        }
    }

    /// Fetch a page that the strategy cannot do without.
    async fn fetch_required(&self, request: &FetchRequest) -> Result<(String, String), StrategyFailure> {
        let result = self.fetch(request).await;
        if result.is_success() {
            if let Some(page) = result.into_page(&request.url) {
                return Ok(page);
            }
            return Err(StrategyFailure::new(
                ErrorKind::NetworkFailure,
                format!("empty response from {}", request.url),
            ));
        }
        Err(fetch_failure(&result))
    }
}

/// Classify a non-success fetch.
pub(crate) fn fetch_failure(result: &FetchResult) -> StrategyFailure {
    StrategyFailure::new(
        result.error_kind().unwrap_or(ErrorKind::NetworkFailure),
        result.describe(),
    )
}

pub(crate) fn layout_confidence(layout: ListingLayout) -> f64 {
    match layout {
        ListingLayout::Table => TABLE_CONFIDENCE,
        ListingLayout::Cards => CARD_CONFIDENCE,
    }
}

/// Wrap parsed rows as raw records. Rows that fail record validation are dropped.
pub(crate) fn to_records(
    attempt: &StrategyAttempt,
    source_url: &str,
    rows: Vec<LicenceFields>,
    confidence: f64,
) -> Vec<RawLicenceRecord> {
    rows.into_iter()
        .filter_map(|fields| {
            let origin = RecordOrigin {
                council_id: attempt.target.council_id.clone(),
                source_url: source_url.to_string(),
                strategy: attempt.kind,
            };
            RawLicenceRecord::new(origin, fields, confidence)
                .map_err(|err| {
                    tracing::debug!(
                        council = %attempt.target.council_id,
                        error = %err,
                        "discarding unusable row"
                    );
                })
                .ok()
        })
        .collect()
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
