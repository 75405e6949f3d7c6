//! End-to-end pipeline scenarios over real HTTP against `wiremock`.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use premwatch_core::{
    ErrorKind, ExtractionStatus, ExtractionTarget, StrategyHistory, StrategyKind,
};
use premwatch_scraper::{
    Extractor, ExtractorSettings, HttpFetcher, PipelineController, PipelineSettings, RateLimiter,
    RunGuard, SelectorSettings,
};

const SEARCH_PAGE: &str = r#"
<html><body>
  <h1>Premises licence register</h1>
  <p>Search the register using the form below.</p>
  <form id="licence-search" action="/licensing/results" method="post">
    <input type="hidden" name="token" value="t1">
    <input type="text" name="premises">
    <input type="submit" name="search" value="Search">
  </form>
</body></html>
"#;

const RESULTS_PAGE: &str = r#"
<html><body>
<table class="results">
  <thead><tr><th>Premises name</th><th>Premises address</th><th>Postcode</th><th>Status</th></tr></thead>
  <tbody>
    <tr><td>The Crown</td><td>1 High Street, Exampleton</td><td>EX1 1AA</td><td>Granted</td></tr>
    <tr><td>Bella Pizza</td><td>4 Market Square, Exampleton</td><td>EX1 2BB</td><td>Granted</td></tr>
    <tr><td>Club Neon</td><td>9 Station Road, Exampleton</td><td>EX2 3CC</td><td>Pending</td></tr>
  </tbody>
</table>
</body></html>
"#;

fn settings() -> PipelineSettings {
    PipelineSettings {
        max_concurrent_targets: 2,
        max_retries: 2,
        backoff_base: Duration::from_millis(10),
        confidence_floor: 0.5,
        selector: SelectorSettings {
            ai_enabled: false,
            max_pages: 10,
            snippet_max_chars: 8000,
            cooldown_runs: 1,
        },
    }
}

fn controller(history: StrategyHistory, run_index: u64) -> PipelineController {
    let fetcher = HttpFetcher::new(5, "premwatch-test/0.1").expect("failed to build fetcher");
    let extractor = Extractor::new(
        Arc::new(fetcher),
        None,
        RateLimiter::shared(Duration::ZERO),
        ExtractorSettings::default(),
    );
    PipelineController::new(extractor, settings(), history, run_index, RunGuard::unbounded())
}

#[tokio::test]
async fn unrecognized_listing_falls_back_to_search_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/licensing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/licensing/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let target = ExtractionTarget::new("X", format!("{}/licensing", server.uri()));
    let report = controller(StrategyHistory::default(), 1)
        .process_target(target)
        .await;

    let outcome = &report.outcome;
    assert_eq!(outcome.final_status, ExtractionStatus::Succeeded);
    assert_eq!(
        outcome.strategies_tried,
        vec![StrategyKind::DirectListing, StrategyKind::SearchForm]
    );
    assert_eq!(outcome.records_found, 3);
    assert_eq!(outcome.winning_strategy, Some(StrategyKind::SearchForm));
    assert_eq!(
        outcome.diagnostics[0].result.error_kind(),
        Some(ErrorKind::ParseFailure)
    );

    let names: Vec<&str> = report
        .records
        .iter()
        .map(|r| r.fields().business_name.as_str())
        .collect();
    assert_eq!(names, vec!["The Crown", "Bella Pizza", "Club Neon"]);
    assert!(report
        .records
        .iter()
        .all(|r| r.origin().strategy == StrategyKind::SearchForm));
}

#[tokio::test]
async fn server_errors_are_retried_then_fail_as_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/licensing"))
        .respond_with(ResponseTemplate::new(503))
        // Two strategies, each with one try and two retries.
        .expect(6)
        .mount(&server)
        .await;

    let target = ExtractionTarget::new("X", format!("{}/licensing", server.uri()));
    let outcome = controller(StrategyHistory::default(), 1)
        .process_target(target)
        .await
        .outcome;

    assert_eq!(outcome.final_status, ExtractionStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::NetworkFailure));
    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome.diagnostics.iter().all(|d| d.attempts == 3));
}

#[tokio::test]
async fn captcha_page_blocks_and_is_recorded_for_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/licensing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="g-recaptcha" data-sitekey="k"></div></body></html>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let target = ExtractionTarget::new("X", format!("{}/licensing", server.uri()));
    let report = controller(StrategyHistory::default(), 4).run(vec![target]).await;

    assert_eq!(report.outcomes[0].error_kind, Some(ErrorKind::BlockedByTarget));
    let mut history = StrategyHistory::default();
    report.record_blocked(&mut history, 4);
    assert!(history.is_cooling_down("X", StrategyKind::DirectListing, 5, 1));
    assert!(history.is_cooling_down("X", StrategyKind::SearchForm, 5, 1));
    assert!(!history.is_cooling_down("X", StrategyKind::SearchForm, 6, 1));
}
