//! Single retrieval attempts against one URL or form target.
//!
//! A [`Fetcher`] never returns an error for ordinary network or HTTP
//! failures: they come back as [`FetchStatus`] values so the extractor can
//! decide what to do with them.

mod browser;
mod challenge;
mod http;

use async_trait::async_trait;
use premwatch_core::ErrorKind;

pub use browser::{BrowserRenderer, FetchRouter, FormAction};
pub use challenge::looks_like_bot_challenge;
pub use http::HttpFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: FetchMethod,
    /// Form payload. Sent as the query string for GET, urlencoded body for POST.
    pub form: Vec<(String, String)>,
    pub requires_rendering: bool,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: FetchMethod::Get,
            form: Vec::new(),
            requires_rendering: false,
        }
    }

    #[must_use]
    pub fn form(url: impl Into<String>, method: FetchMethod, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method,
            form,
            requires_rendering: false,
        }
    }

    #[must_use]
    pub fn rendered(mut self, requires_rendering: bool) -> Self {
        self.requires_rendering = requires_rendering;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    HttpError,
    Timeout,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub status: FetchStatus,
    pub raw_body: Option<String>,
    pub final_url: Option<String>,
    pub latency_ms: u64,
    pub http_status: Option<u16>,
    /// Human-readable cause for non-success statuses.
    pub detail: Option<String>,
}

impl FetchResult {
    #[must_use]
    pub fn success(body: String, final_url: String, http_status: u16, latency_ms: u64) -> Self {
        Self {
            status: FetchStatus::Success,
            raw_body: Some(body),
            final_url: Some(final_url),
            latency_ms,
            http_status: Some(http_status),
            detail: None,
        }
    }

    #[must_use]
    pub fn failure(status: FetchStatus, detail: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status,
            raw_body: None,
            final_url: None,
            latency_ms,
            http_status: None,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn timeout(latency_ms: u64) -> Self {
        Self::failure(FetchStatus::Timeout, "request timed out", latency_ms)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    /// Taxonomy kind for a non-success fetch.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.status {
            FetchStatus::Success => None,
            FetchStatus::HttpError | FetchStatus::Timeout => Some(ErrorKind::NetworkFailure),
            FetchStatus::Blocked => Some(ErrorKind::BlockedByTarget),
        }
    }

    /// Body and final URL of a successful fetch.
    #[must_use]
    pub fn into_page(self, requested_url: &str) -> Option<(String, String)> {
        if self.status != FetchStatus::Success {
            return None;
        }
        let body = self.raw_body?;
        let url = self.final_url.unwrap_or_else(|| requested_url.to_string());
        Some((body, url))
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let detail = self.detail.as_deref().unwrap_or("no detail");
        match self.http_status {
            Some(code) => format!("{:?} (HTTP {code}): {detail}", self.status),
            None => format!("{:?}: {detail}", self.status),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform one retrieval attempt. Must not error for ordinary failures.
    async fn fetch(&self, request: &FetchRequest) -> FetchResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_error_kind() {
        assert_eq!(FetchResult::timeout(5).error_kind(), Some(ErrorKind::NetworkFailure));
        assert_eq!(
            FetchResult::failure(FetchStatus::HttpError, "500", 5).error_kind(),
            Some(ErrorKind::NetworkFailure)
        );
        assert_eq!(
            FetchResult::failure(FetchStatus::Blocked, "captcha", 5).error_kind(),
            Some(ErrorKind::BlockedByTarget)
        );
        let ok = FetchResult::success("<html/>".into(), "https://x.gov.uk".into(), 200, 5);
        assert_eq!(ok.error_kind(), None);
    }

    #[test]
    fn into_page_falls_back_to_requested_url() {
        let mut ok = FetchResult::success("body".into(), "https://x.gov.uk/a".into(), 200, 1);
        ok.final_url = None;
        assert_eq!(
            ok.into_page("https://x.gov.uk/b"),
            Some(("body".to_string(), "https://x.gov.uk/b".to_string()))
        );
        assert!(FetchResult::timeout(1).into_page("https://x.gov.uk").is_none());
    }

    #[test]
    fn describe_includes_http_status() {
        let mut failed = FetchResult::failure(FetchStatus::HttpError, "not found", 3);
        failed.http_status = Some(404);
        assert_eq!(failed.describe(), "HttpError (HTTP 404): not found");
    }
}
