//! AI-guided extraction: hand a bounded text snippet of the page to the AI
//! collaborator and map its structured answer onto licence records.

use premwatch_core::{ErrorKind, LicenceFields, RawLicenceRecord, StrategyAttempt};
use serde_json::Value;

use super::{to_records, Extractor, StrategyRun};
use crate::ai::LICENCE_SCHEMA;
use crate::error::StrategyFailure;
use crate::fetch::FetchRequest;
use crate::fields::{collapse_whitespace, parse_date, split_activities, split_conditions};
use crate::html::ai_snippet;

/// Upper bound on confidence for AI-extracted records.
pub const AI_CONFIDENCE: f64 = 0.6;
/// Records accepted from one AI response.
const MAX_AI_RECORDS: usize = 20;

pub(super) async fn run(
    extractor: &Extractor,
    attempt: &StrategyAttempt,
) -> Result<StrategyRun, StrategyFailure> {
    let Some(ai) = extractor.ai.as_ref() else {
        return Err(StrategyFailure::new(
            ErrorKind::ConfigurationError,
            "AI collaborator not configured",
        ));
    };

    let request =
        FetchRequest::get(&attempt.target.url).rendered(attempt.parameters.requires_rendering);
    let (body, page_url) = extractor.fetch_required(&request).await?;

    let snippet = ai_snippet(&body, attempt.parameters.snippet_max_chars);
    if snippet.is_empty() {
        return Err(StrategyFailure::parse("page has no text to extract from"));
    }

    extractor.limiter.acquire().await;
    let response = tokio::time::timeout(
        extractor.settings.ai_timeout,
        ai.extract_structured(&snippet, &LICENCE_SCHEMA),
    )
    .await
    .map_err(|_| StrategyFailure::new(ErrorKind::NetworkFailure, "AI request timed out"))??;

    let records = records_from_response(attempt, &page_url, &response)?;
    Ok(StrategyRun {
        records,
        pages_fetched: 1,
        truncated: false,
    })
}

/// Map `{"licences": [...]}` onto raw records, keeping at most
/// [`MAX_AI_RECORDS`] and capping confidence at [`AI_CONFIDENCE`].
///
/// Items without a string `premises_name` do not match the schema and are
/// skipped. A non-empty array where no item matches is a parse failure; an
/// empty array means the page listed nothing.
fn records_from_response(
    attempt: &StrategyAttempt,
    page_url: &str,
    response: &Value,
) -> Result<Vec<RawLicenceRecord>, StrategyFailure> {
    let items = response
        .get("licences")
        .and_then(Value::as_array)
        .ok_or_else(|| StrategyFailure::parse("AI response has no licences array"))?;

    let conforming: Vec<(&Value, LicenceFields)> = items
        .iter()
        .filter_map(|item| fields_from_item(item).map(|fields| (item, fields)))
        .collect();
    if !items.is_empty() && conforming.is_empty() {
        return Err(StrategyFailure::parse("AI response does not match schema"));
    }
    if conforming.len() < items.len() {
        tracing::debug!(
            council = %attempt.target.council_id,
            skipped = items.len() - conforming.len(),
            "skipping AI items that do not match the schema"
        );
    }

    let mut records = Vec::new();
    for (item, fields) in conforming.into_iter().take(MAX_AI_RECORDS) {
        let confidence = item
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c))
            .map_or(AI_CONFIDENCE, |c| c.min(AI_CONFIDENCE));
        records.extend(to_records(attempt, page_url, vec![fields], confidence));
    }
    Ok(records)
}

fn fields_from_item(item: &Value) -> Option<LicenceFields> {
    let item = item.as_object()?;
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
    };

    let business_name = text("premises_name")?;
    let list = |key: &str, split: fn(&str) -> Vec<String>| match item.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(raw)) => split(raw),
        _ => Vec::new(),
    };

    Some(LicenceFields {
        business_name,
        address: text("premises_address").unwrap_or_default(),
        postcode: text("postcode"),
        licence_type: text("licence_type"),
        status: text("licence_status"),
        granted_date: text("granted_date").and_then(|d| parse_date(&d)),
        application_date: text("application_date").and_then(|d| parse_date(&d)),
        licence_holder: text("licence_holder"),
        supervisor: text("designated_premises_supervisor"),
        activities: list("licensable_activities", split_activities),
        opening_hours: text("opening_hours"),
        alcohol_hours: text("alcohol_hours").or_else(|| text("licensed_hours")),
        conditions: list("conditions", split_conditions),
        description: text("description"),
    })
}
