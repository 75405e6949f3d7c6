//! Browser-automation seam.
//!
//! Rendering is an external capability: the pipeline only sees it through
//! [`BrowserRenderer`]. [`FetchRouter`] sends rendering requests to the
//! renderer when one is configured and everything else (or everything, when
//! none is configured) over plain HTTP.

use std::sync::Arc;

use async_trait::async_trait;

use super::{FetchMethod, FetchRequest, FetchResult, Fetcher};

/// One step a renderer performs on the loaded page before capturing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Fill { field: String, value: String },
    Submit { method: FetchMethod },
}

impl FormAction {
    /// Actions that replay a form payload in a browser.
    #[must_use]
    pub fn from_request(request: &FetchRequest) -> Vec<FormAction> {
        if request.form.is_empty() {
            return Vec::new();
        }
        let mut actions: Vec<FormAction> = request
            .form
            .iter()
            .map(|(field, value)| FormAction::Fill {
                field: field.clone(),
                value: value.clone(),
            })
            .collect();
        actions.push(FormAction::Submit {
            method: request.method,
        });
        actions
    }
}

#[async_trait]
pub trait BrowserRenderer: Send + Sync {
    async fn render_and_fetch(&self, url: &str, form_actions: &[FormAction]) -> FetchResult;
}

pub struct FetchRouter {
    http: Arc<dyn Fetcher>,
    renderer: Option<Arc<dyn BrowserRenderer>>,
}

impl FetchRouter {
    #[must_use]
    pub fn new(http: Arc<dyn Fetcher>, renderer: Option<Arc<dyn BrowserRenderer>>) -> Self {
        if renderer.is_none() {
            tracing::info!("no browser renderer configured; rendering requests use plain HTTP");
        }
        Self { http, renderer }
    }
}

#[async_trait]
impl Fetcher for FetchRouter {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        match (&self.renderer, request.requires_rendering) {
            (Some(renderer), true) => {
                let actions = FormAction::from_request(request);
                renderer.render_and_fetch(&request.url, &actions).await
            }
            _ => self.http.fetch(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, usize)>>>,
    }

    #[async_trait]
    impl Fetcher for Recorder {
        async fn fetch(&self, _request: &FetchRequest) -> FetchResult {
            self.seen.lock().unwrap().push((self.label, 0));
            FetchResult::success(String::new(), "https://x.gov.uk".into(), 200, 0)
        }
    }

    #[async_trait]
    impl BrowserRenderer for Recorder {
        async fn render_and_fetch(&self, _url: &str, form_actions: &[FormAction]) -> FetchResult {
            self.seen.lock().unwrap().push((self.label, form_actions.len()));
            FetchResult::success(String::new(), "https://x.gov.uk".into(), 200, 0)
        }
    }

    #[tokio::test]
    async fn routes_rendering_requests_to_renderer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = FetchRouter::new(
            Arc::new(Recorder { label: "http", seen: Arc::clone(&seen) }),
            Some(Arc::new(Recorder { label: "browser", seen: Arc::clone(&seen) })),
        );

        router.fetch(&FetchRequest::get("https://x.gov.uk")).await;
        let submit = FetchRequest::form(
            "https://x.gov.uk/search",
            FetchMethod::Post,
            vec![("q".into(), String::new())],
        )
        .rendered(true);
        router.fetch(&submit).await;

        let seen = seen.lock().unwrap().clone();
        // One fill plus one submit for the rendered request.
        assert_eq!(seen, vec![("http", 0), ("browser", 2)]);
    }

    #[tokio::test]
    async fn falls_back_to_http_without_renderer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = FetchRouter::new(
            Arc::new(Recorder { label: "http", seen: Arc::clone(&seen) }),
            None,
        );
        router
            .fetch(&FetchRequest::get("https://x.gov.uk").rendered(true))
            .await;
        assert_eq!(seen.lock().unwrap().clone(), vec![("http", 0)]);
    }

    #[test]
    fn empty_form_yields_no_actions() {
        assert!(FormAction::from_request(&FetchRequest::get("https://x.gov.uk")).is_empty());
    }
}
