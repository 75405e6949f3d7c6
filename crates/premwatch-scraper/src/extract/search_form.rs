//! Search form: locate the register's search form, submit it, and walk the
//! result pages.
//!
//! The walk is an explicit state machine so every transition can be tested
//! without a network:
//!
//! ```text
//! LocatingForm -> SubmittingQuery -> ParsingResults -> NextPage -> ParsingResults ...
//!                       |  (one retry)        |             |
//!                       v                     v             v
//!                     Failed                 Done      Done (truncated)
//! ```

use std::collections::HashSet;

use premwatch_core::{ErrorKind, StrategyAttempt};

use super::{fetch_failure, layout_confidence, to_records, Extractor, StrategyRun};
use crate::error::StrategyFailure;
use crate::fetch::{FetchRequest, FetchResult, FetchStatus};
use crate::html::{find_search_form, parse_listing, FormLookup, FormSubmission, ParsedListing};

#[derive(Debug, Clone, PartialEq)]
enum SearchFormState {
    LocatingForm,
    SubmittingQuery {
        submission: FormSubmission,
        retried: bool,
    },
    ParsingResults {
        body: String,
        page_url: String,
    },
    NextPage {
        url: String,
    },
    Done,
    Failed(StrategyFailure),
}

/// Counters carried through the walk.
#[derive(Debug, Default)]
struct Walk {
    run: StrategyRun,
    results_pages: usize,
    visited: HashSet<String>,
}

pub(super) async fn run(
    extractor: &Extractor,
    attempt: &StrategyAttempt,
) -> Result<StrategyRun, StrategyFailure> {
    let params = &attempt.parameters;
    let rendering = params.requires_rendering;
    let max_pages = params.max_pages.max(1);
    let lookup = FormLookup {
        form_selector: params.form_selector.as_deref(),
        query_field: params.query_field.as_deref(),
        query_value: params.query_value.as_deref(),
        extra_fields: Some(&params.extra_fields),
    };

    let mut walk = Walk::default();
    let mut state = SearchFormState::LocatingForm;

    loop {
        state = match state {
            SearchFormState::LocatingForm => {
                let request = FetchRequest::get(&attempt.target.url).rendered(rendering);
                let (body, page_url) = extractor.fetch_required(&request).await?;
                walk.run.pages_fetched += 1;
                on_form_page(&body, &page_url, &lookup)
            }
            SearchFormState::SubmittingQuery {
                submission,
                retried,
            } => {
                let request = FetchRequest::form(
                    submission.action.clone(),
                    submission.method,
                    submission.fields.clone(),
                )
                .rendered(rendering);
                let result = extractor.fetch(&request).await;
                if result.is_success() {
                    walk.run.pages_fetched += 1;
                }
                on_submit_result(result, submission, retried)
            }
            SearchFormState::ParsingResults { body, page_url } => {
                let listing = parse_listing(&body, &page_url);
                walk.visited.insert(page_url.clone());
                walk.results_pages += 1;
                let first_page = walk.results_pages == 1;
                let next = on_results_parsed(listing.as_ref(), first_page);
                if let Some(listing) = listing {
                    let confidence = layout_confidence(listing.layout);
                    walk.run
                        .records
                        .extend(to_records(attempt, &page_url, listing.rows, confidence));
                }
                match next {
                    SearchFormState::NextPage { url } => {
                        if walk.visited.contains(&url) {
                            SearchFormState::Done
                        } else if walk.results_pages >= max_pages {
                            tracing::info!(
                                council = %attempt.target.council_id,
                                max_pages,
                                "page cap reached"
                            );
                            walk.run.truncated = true;
                            SearchFormState::Done
                        } else {
                            SearchFormState::NextPage { url }
                        }
                    }
                    other => other,
                }
            }
            SearchFormState::NextPage { url } => {
                let result = extractor
                    .fetch(&FetchRequest::get(&url).rendered(rendering))
                    .await;
                let (next, truncated) = on_next_page_result(result, &url);
                if truncated {
                    tracing::warn!(
                        council = %attempt.target.council_id,
                        url = %url,
                        "results page failed; keeping records so far"
                    );
                    walk.run.truncated = true;
                } else if matches!(next, SearchFormState::ParsingResults { .. }) {
                    walk.run.pages_fetched += 1;
                }
                next
            }
            SearchFormState::Done => return Ok(walk.run),
            SearchFormState::Failed(failure) => return Err(failure),
        };
    }
}

fn on_form_page(body: &str, page_url: &str, lookup: &FormLookup<'_>) -> SearchFormState {
    match find_search_form(body, page_url, lookup) {
        Some(submission) => SearchFormState::SubmittingQuery {
            submission,
            retried: false,
        },
        None => SearchFormState::Failed(StrategyFailure::parse("search form not found")),
    }
}

/// A failed submission is retried once; a block is final.
fn on_submit_result(
    result: FetchResult,
    submission: FormSubmission,
    retried: bool,
) -> SearchFormState {
    if result.is_success() {
        let action = submission.action;
        return match result.into_page(&action) {
            Some((body, page_url)) => SearchFormState::ParsingResults { body, page_url },
            None => SearchFormState::Failed(StrategyFailure::new(
                ErrorKind::NetworkFailure,
                "empty response to form submission",
            )),
        };
    }
    if result.status == FetchStatus::Blocked || retried {
        return SearchFormState::Failed(fetch_failure(&result));
    }
    tracing::debug!(detail = %result.describe(), "form submission failed; retrying once");
    SearchFormState::SubmittingQuery {
        submission,
        retried: true,
    }
}

/// An unrecognized first results page fails the strategy; an unrecognized
/// later page just ends the walk.
fn on_results_parsed(listing: Option<&ParsedListing>, first_page: bool) -> SearchFormState {
    match listing {
        None if first_page => {
            SearchFormState::Failed(StrategyFailure::parse("search results not recognized"))
        }
        None => SearchFormState::Done,
        Some(listing) => match &listing.next_page {
            Some(url) => SearchFormState::NextPage { url: url.clone() },
            None => SearchFormState::Done,
        },
    }
}

/// Returns the next state and whether the walk was cut short.
fn on_next_page_result(result: FetchResult, url: &str) -> (SearchFormState, bool) {
    if !result.is_success() {
        return (SearchFormState::Done, true);
    }
    match result.into_page(url) {
        Some((body, page_url)) => (SearchFormState::ParsingResults { body, page_url }, false),
        None => (SearchFormState::Done, true),
    }
}
