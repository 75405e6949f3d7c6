//! Direct listing: the target URL is itself a licence register page.

use std::collections::HashSet;

use premwatch_core::StrategyAttempt;

use super::{layout_confidence, to_records, Extractor, StrategyRun};
use crate::error::StrategyFailure;
use crate::fetch::FetchRequest;
use crate::html::parse_listing;

pub(super) async fn run(
    extractor: &Extractor,
    attempt: &StrategyAttempt,
) -> Result<StrategyRun, StrategyFailure> {
    let rendering = attempt.parameters.requires_rendering;
    let max_pages = attempt.parameters.max_pages.max(1);

    let request = FetchRequest::get(&attempt.target.url).rendered(rendering);
    let (body, page_url) = extractor.fetch_required(&request).await?;
    let listing = parse_listing(&body, &page_url)
        .ok_or_else(|| StrategyFailure::parse("listing structure not recognized"))?;

    let mut run = StrategyRun {
        records: to_records(attempt, &page_url, listing.rows, layout_confidence(listing.layout)),
        pages_fetched: 1,
        truncated: false,
    };
    let mut visited: HashSet<String> = HashSet::from([page_url]);
    let mut next = listing.next_page;

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            break;
        }
        if run.pages_fetched >= max_pages {
            tracing::info!(council = %attempt.target.council_id, max_pages, "page cap reached");
            run.truncated = true;
            break;
        }

        let result = extractor
            .fetch(&FetchRequest::get(&url).rendered(rendering))
            .await;
        if !result.is_success() {
            tracing::warn!(
                council = %attempt.target.council_id,
                url = %url,
                detail = %result.describe(),
                "follow-up page failed; keeping records so far"
            );
            run.truncated = true;
            break;
        }
        let Some((body, page_url)) = result.into_page(&url) else {
            run.truncated = true;
            break;
        };
        run.pages_fetched += 1;

        let Some(page) = parse_listing(&body, &page_url) else {
            tracing::debug!(url = %page_url, "follow-up page not recognized; stopping");
            break;
        };
        run.records.extend(to_records(
            attempt,
            &page_url,
            page.rows,
            layout_confidence(page.layout),
        ));
        next = page.next_page;
    }

    Ok(run)
}
