//! Plain HTTP fetcher built on `reqwest`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use super::challenge::looks_like_bot_challenge;
use super::{FetchMethod, FetchRequest, FetchResult, FetchStatus, Fetcher};
use crate::error::ScraperError;

/// Redirect chains longer than this are treated as an anti-automation loop.
const MAX_REDIRECTS: usize = 8;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let started = Instant::now();
        let builder = match request.method {
            FetchMethod::Get if request.form.is_empty() => self.client.get(&request.url),
            FetchMethod::Get => self.client.get(&request.url).query(&request.form),
            FetchMethod::Post => self.client.post(&request.url).form(&request.form),
        };

        let response = match builder
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => return classify_transport_error(&request.url, &err, elapsed_ms(started)),
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return classify_transport_error(&request.url, &err, elapsed_ms(started)),
        };
        let latency_ms = elapsed_ms(started);

        if looks_like_bot_challenge(&body) {
            tracing::warn!(url = %request.url, status = status.as_u16(), "anti-automation challenge detected");
            let mut result =
                FetchResult::failure(FetchStatus::Blocked, "anti-automation challenge page", latency_ms);
            result.http_status = Some(status.as_u16());
            result.final_url = Some(final_url);
            return result;
        }

        if !status.is_success() {
            tracing::debug!(url = %request.url, status = status.as_u16(), "non-success response");
            let mut result = FetchResult::failure(
                FetchStatus::HttpError,
                format!("unexpected HTTP status {} from {}", status.as_u16(), request.url),
                latency_ms,
            );
            result.http_status = Some(status.as_u16());
            result.final_url = Some(final_url);
            return result;
        }

        FetchResult::success(body, final_url, status.as_u16(), latency_ms)
    }
}

fn classify_transport_error(url: &str, err: &reqwest::Error, latency_ms: u64) -> FetchResult {
    if err.is_timeout() {
        tracing::debug!(url, error = %err, "request timed out");
        return FetchResult::timeout(latency_ms);
    }
    if err.is_redirect() {
        tracing::warn!(url, error = %err, "redirect loop, treating as blocked");
        return FetchResult::failure(
            FetchStatus::Blocked,
            format!("redirect loop: {err}"),
            latency_ms,
        );
    }
    tracing::debug!(url, error = %err, "request failed");
    FetchResult::failure(FetchStatus::HttpError, err.to_string(), latency_ms)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
