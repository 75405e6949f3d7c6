//! HTML parsing for licence registers.
//!
//! Everything here is synchronous and returns owned data: `scraper::Html` is
//! not `Send`, so documents never live across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use premwatch_core::LicenceFields;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::FetchMethod;
use crate::fields::{assign, collapse_whitespace, slot_for_label, FieldSlot};

const MAX_TABLE_ROWS: usize = 50;
const MIN_ROW_CELLS: usize = 3;
const MAX_CARDS_PER_CONTAINER: usize = 20;
const MIN_CARD_TEXT: usize = 50;

const HEADER_INDICATORS: &[&str] = &[
    "premises",
    "licence",
    "license",
    "alcohol",
    "entertainment",
    "name",
    "address",
    "status",
    "date",
    "application",
    "holder",
];

const CARD_INDICATORS: &[&str] = &[
    "licence", "license", "premises", "result", "item", "card", "entry",
];

const SNIPPET_EXCLUDED: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

const MAIN_CONTENT: &[&str] = &[
    "main",
    "#main",
    ".main",
    "#content",
    ".content",
    "#main-content",
    ".main-content",
    "article",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("th, td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href], link[rel][href]"));
static FORM: LazyLock<Selector> = LazyLock::new(|| selector("form"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| selector("input[name]"));
static SELECT: LazyLock<Selector> = LazyLock::new(|| selector("select[name]"));
static OPTION: LazyLock<Selector> = LazyLock::new(|| selector("option"));
static TEXTAREA: LazyLock<Selector> = LazyLock::new(|| selector("textarea[name]"));
static SUBMIT_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| selector("button[type=\"submit\"][name], input[type=\"submit\"][name]"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| {
    selector("h1, h2, h3, h4, h5, h6, .name, .title, .premises-name, strong, a")
});
static DT: LazyLock<Selector> = LazyLock::new(|| selector("dt"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static CARD: LazyLock<Selector> = LazyLock::new(|| {
    let parts: Vec<String> = ["li", "div", "article", "section", "tr"]
        .iter()
        .flat_map(|tag| {
            CARD_INDICATORS
                .iter()
                .map(move |ind| format!("{tag}[class*=\"{ind}\"]"))
        })
        .collect();
    selector(&parts.join(", "))
});

/// How the records on a page were laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingLayout {
    Table,
    Cards,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedListing {
    pub layout: ListingLayout,
    pub rows: Vec<LicenceFields>,
    pub next_page: Option<String>,
}

/// Parse a licence listing page.
///
/// Returns `None` when neither a licence table nor a card layout is
/// recognized. A recognized structure with no usable rows yields
/// `Some` with empty `rows`.
#[must_use]
pub fn parse_listing(html: &str, page_url: &str) -> Option<ParsedListing> {
    let document = Html::parse_document(html);
    let next_page = find_next_page_in(&document, page_url);

    if let Some(rows) = parse_tables(&document) {
        return Some(ParsedListing {
            layout: ListingLayout::Table,
            rows,
            next_page,
        });
    }

    parse_cards(&document).map(|rows| ParsedListing {
        layout: ListingLayout::Cards,
        rows,
        next_page,
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn parse_tables(document: &Html) -> Option<Vec<LicenceFields>> {
    let mut recognized = false;
    let mut out = Vec::new();

    for table in document.select(&TABLE) {
        let rows: Vec<ElementRef<'_>> = table.select(&ROW).collect();
        let Some((header_row, body_rows)) = rows.split_first() else {
            continue;
        };
        let headers: Vec<String> = header_row.select(&CELL).map(element_text).collect();
        let joined = headers.join(" ").to_lowercase();
        if !HEADER_INDICATORS.iter().any(|ind| joined.contains(ind)) {
            continue;
        }

        let slots = column_slots(&headers);
        if !slots.contains(&Some(FieldSlot::BusinessName)) {
            continue;
        }
        recognized = true;

        let min_cells = MIN_ROW_CELLS.min(headers.len());
        for row in body_rows.iter().take(MAX_TABLE_ROWS) {
            let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
            if cells.len() < min_cells {
                continue;
            }
            let mut fields = LicenceFields::default();
            for (slot, cell) in slots.iter().zip(&cells) {
                if let Some(slot) = slot {
                    assign(&mut fields, *slot, cell);
                }
            }
            if !fields.business_name.is_empty() {
                out.push(fields);
            }
        }
    }

    recognized.then_some(out)
}

/// Map header cells to slots. When several columns claim the same slot, a
/// grant date column beats other dates and a "name" column beats other
/// premises columns.
fn column_slots(headers: &[String]) -> Vec<Option<FieldSlot>> {
    let mut slots: Vec<Option<FieldSlot>> = headers.iter().map(|h| slot_for_label(h)).collect();
    keep_preferred(&mut slots, headers, FieldSlot::GrantedDate, "grant");
    keep_preferred(&mut slots, headers, FieldSlot::BusinessName, "name");
    slots
}

fn keep_preferred(slots: &mut [Option<FieldSlot>], headers: &[String], slot: FieldSlot, needle: &str) {
    let preferred = headers
        .iter()
        .enumerate()
        .position(|(i, h)| slots[i] == Some(slot) && h.to_lowercase().contains(needle));
    if let Some(keep) = preferred {
        for (i, candidate) in slots.iter_mut().enumerate() {
            if i != keep && *candidate == Some(slot) {
                *candidate = None;
            }
        }
    }
}

fn parse_cards(document: &Html) -> Option<Vec<LicenceFields>> {
    let mut per_parent: HashMap<_, usize> = HashMap::new();
    let mut out = Vec::new();

    for card in document.select(&CARD) {
        // Containers that hold other cards are not cards themselves.
        if card.select(&CARD).next().is_some() {
            continue;
        }
        let parent_id = card.parent().map(|p| p.id());
        let seen = per_parent.entry(parent_id).or_insert(0);
        if *seen >= MAX_CARDS_PER_CONTAINER {
            continue;
        }

        if element_text(card).len() <= MIN_CARD_TEXT {
            continue;
        }
        if let Some(fields) = parse_card(card) {
            *seen += 1;
            out.push(fields);
        }
    }

    (!out.is_empty()).then_some(out)
}

fn parse_card(card: ElementRef<'_>) -> Option<LicenceFields> {
    let mut fields = LicenceFields::default();

    for dt in card.select(&DT) {
        let value = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "dd")
            .map(element_text);
        if let (Some(slot), Some(value)) = (slot_for_label(&element_text(dt)), value) {
            assign(&mut fields, slot, &value);
        }
    }

    let mut pending: Option<FieldSlot> = None;
    for text in card.text().map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(slot) = pending.take() {
            assign(&mut fields, slot, text);
            continue;
        }
        if let Some((label, value)) = text.split_once(':') {
            if let Some(slot) = slot_for_label(label) {
                if value.trim().is_empty() {
                    pending = Some(slot);
                } else {
                    assign(&mut fields, slot, value);
                }
            }
        }
    }

    if fields.business_name.is_empty() {
        let heading = card
            .select(&HEADING)
            .map(element_text)
            .find(|t| !t.is_empty() && !t.ends_with(':'))?;
        fields.business_name = heading;
    }

    let has_location =
        !fields.address.is_empty() || fields.postcode.as_deref().is_some_and(|p| !p.is_empty());
    has_location.then_some(fields)
}

/// Resolve the "next page" link on a results page, if any.
#[must_use]
pub fn find_next_page(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    find_next_page_in(&document, page_url)
}

fn find_next_page_in(document: &Html, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;

    for link in document.select(&LINK) {
        let el = link.value();
        let Some(href) = el.attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }

        let rel_next = el
            .attr("rel")
            .is_some_and(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("next")));
        let class_next = el.attr("class").is_some_and(|c| {
            c.split_whitespace().any(|t| {
                let t = t.to_ascii_lowercase();
                t == "next" || t.ends_with("-next") || t.starts_with("next-")
            })
        });
        let text_next = el.name() == "a" && {
            let text = element_text(link).to_lowercase();
            let core = text.trim_matches(|c: char| !c.is_alphanumeric());
            core == "next" || core == "next page" || matches!(text.as_str(), "›" | "»" | ">")
        };

        if rel_next || class_next || text_next {
            if let Ok(resolved) = base.join(href) {
                if resolved != base {
                    return Some(resolved.to_string());
                }
            }
        }
    }
    None
}

/// Hints used to locate and fill a search form.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormLookup<'a> {
    pub form_selector: Option<&'a str>,
    pub query_field: Option<&'a str>,
    pub query_value: Option<&'a str>,
    pub extra_fields: Option<&'a BTreeMap<String, String>>,
}

/// A located form, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub action: String,
    pub method: FetchMethod,
    pub fields: Vec<(String, String)>,
}

/// Locate the licence search form on a page and build its submission.
#[must_use]
pub fn find_search_form(html: &str, page_url: &str, lookup: &FormLookup<'_>) -> Option<FormSubmission> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok()?;

    let form = match lookup.form_selector {
        Some(css) => {
            let hinted = Selector::parse(css).ok()?;
            document.select(&hinted).next()?
        }
        None => pick_search_form(&document)?,
    };

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map_or_else(|| Some(base.clone()), |a| base.join(a).ok())?;
    let method = match form.value().attr("method").map(str::to_ascii_lowercase) {
        Some(m) if m == "post" => FetchMethod::Post,
        _ => FetchMethod::Get,
    };

    let mut fields = form_fields(form);
    let text_field = first_text_input(form);

    let query_value = lookup.query_value.unwrap_or_default().to_string();
    if let Some(name) = lookup.query_field.map(str::to_string).or(text_field) {
        set_field(&mut fields, &name, query_value);
    }
    if let Some(extra) = lookup.extra_fields {
        for (name, value) in extra {
            set_field(&mut fields, name, value.clone());
        }
    }
    if let Some(button) = form.select(&SUBMIT_BUTTON).next() {
        if let Some(name) = button.value().attr("name") {
            let value = button.value().attr("value").unwrap_or_default();
            set_field(&mut fields, name, value.to_string());
        }
    }

    Some(FormSubmission {
        action: action.to_string(),
        method,
        fields,
    })
}

fn pick_search_form<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    let forms: Vec<ElementRef<'a>> = document.select(&FORM).collect();
    let haystack = |form: &ElementRef<'_>| {
        let el = form.value();
        let attrs = ["action", "id", "class", "name", "aria-label"]
            .iter()
            .filter_map(|a| el.attr(a))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{attrs} {}", element_text(*form)).to_lowercase()
    };

    forms
        .iter()
        .find(|f| {
            let h = haystack(*f);
            h.contains("licen") || h.contains("premises")
        })
        .or_else(|| {
            forms.iter().find(|f| {
                let h = haystack(*f);
                h.contains("search") || h.contains("register")
            })
        })
        .or_else(|| forms.iter().find(|f| first_text_input(**f).is_some()))
        .copied()
}

fn input_type(input: ElementRef<'_>) -> String {
    input
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

fn first_text_input(form: ElementRef<'_>) -> Option<String> {
    form.select(&INPUT)
        .find(|i| matches!(input_type(*i).as_str(), "text" | "search"))
        .and_then(|i| i.value().attr("name").map(str::to_string))
}

fn form_fields(form: ElementRef<'_>) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    for input in form.select(&INPUT) {
        let el = input.value();
        let Some(name) = el.attr("name") else { continue };
        let kind = input_type(input);
        match kind.as_str() {
            "submit" | "button" | "image" | "reset" | "file" => continue,
            "checkbox" | "radio" if el.attr("checked").is_none() => continue,
            _ => {}
        }
        let value = el
            .attr("value")
            .unwrap_or(if kind == "checkbox" { "on" } else { "" });
        fields.push((name.to_string(), value.to_string()));
    }

    for select in form.select(&SELECT) {
        let Some(name) = select.value().attr("name") else { continue };
        let options: Vec<ElementRef<'_>> = select.select(&OPTION).collect();
        let chosen = options
            .iter()
            .find(|o| o.value().attr("selected").is_some())
            .or_else(|| options.first());
        let value = chosen
            .map(|o| {
                o.value()
                    .attr("value")
                    .map_or_else(|| element_text(*o), str::to_string)
            })
            .unwrap_or_default();
        fields.push((name.to_string(), value));
    }

    for textarea in form.select(&TEXTAREA) {
        if let Some(name) = textarea.value().attr("name") {
            fields.push((name.to_string(), element_text(textarea)));
        }
    }

    fields
}

fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: String) {
    if let Some(existing) = fields.iter_mut().find(|(n, _)| n == name) {
        existing.1 = value;
    } else {
        fields.push((name.to_string(), value));
    }
}

/// Visible page text for the AI collaborator, bounded to `max_chars`.
///
/// Scripts, styles, navigation, headers and footers are dropped, and the
/// main content container is preferred when the page has one.
#[must_use]
pub fn ai_snippet(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let root = MAIN_CONTENT
        .iter()
        .find_map(|css| document.select(&selector(css)).next())
        .or_else(|| document.select(&BODY).next())
        .unwrap_or_else(|| document.root_element());

    let mut pieces: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SNIPPET_EXCLUDED.contains(&e.name()))
        });
        if !excluded {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed);
            }
        }
    }

    let text = collapse_whitespace(&pieces.join(" "));
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;
