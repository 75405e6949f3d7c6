use super::*;

// -----------------------------------------------------------------------
// parse_listing: tables
// -----------------------------------------------------------------------

const TABLE_PAGE: &str = r#"
<html><body>
  <table class="layout"><tr><td>Skip to content</td></tr></table>
  <table id="register">
    <thead>
      <tr><th>Premises Name</th><th>Premises Address</th><th>Postcode</th>
          <th>Licence Type</th><th>Application Date</th><th>Date Granted</th></tr>
    </thead>
    <tbody>
      <tr><td>The Crown &amp; Anchor</td><td>1 High St, London</td><td>sw1a 1aa</td>
          <td>Premises licence</td><td>01/01/2024</td><td>15/02/2024</td></tr>
      <tr><td>Cafe Nero</td><td>22 Market Rd</td><td>N1 9GU</td>
          <td>Variation</td><td>02/01/2024</td><td>20/03/2024</td></tr>
      <tr><td colspan="6">No more results</td></tr>
    </tbody>
  </table>
  <ul class="pagination"><li><a href="?page=2">Next &raquo;</a></li></ul>
</body></html>
"#;

#[test]
fn parse_listing_reads_licence_table() {
    let listing = parse_listing(TABLE_PAGE, "https://x.gov.uk/licensing").unwrap();
    assert_eq!(listing.layout, ListingLayout::Table);
    assert_eq!(listing.rows.len(), 2);

    let crown = &listing.rows[0];
    assert_eq!(crown.business_name, "The Crown & Anchor");
    assert_eq!(crown.address, "1 High St, London");
    assert_eq!(crown.postcode.as_deref(), Some("sw1a 1aa"));
    assert_eq!(crown.licence_type.as_deref(), Some("Premises licence"));
    assert_eq!(
        crown.granted_date,
        chrono::NaiveDate::from_ymd_opt(2024, 2, 15)
    );
    assert_eq!(
        crown.application_date,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
    );
}

const REFERENCE_TABLE_PAGE: &str = r#"
<table>
  <tr><th>Premises Licence Number</th><th>Premises Name</th><th>Address</th>
      <th>Designated Premises Supervisor</th><th>Opening Hours</th><th>Conditions</th></tr>
  <tr><td>PL/0042</td><td>The Crown</td><td>1 High Street, York YO1 8AA</td>
      <td>Mr John Smith</td><td>Mon-Sat 10:00-23:00</td>
      <td>Challenge 25 policy in operation; CCTV to be maintained</td></tr>
</table>
"#;

#[test]
fn parse_listing_skips_licence_number_column() {
    let listing = parse_listing(REFERENCE_TABLE_PAGE, "https://york.gov.uk/register").unwrap();
    assert_eq!(listing.rows.len(), 1);

    let crown = &listing.rows[0];
    assert_eq!(crown.business_name, "The Crown");
    assert_eq!(crown.address, "1 High Street, York YO1 8AA");
    assert_eq!(crown.supervisor.as_deref(), Some("Mr John Smith"));
    assert_eq!(crown.opening_hours.as_deref(), Some("Mon-Sat 10:00-23:00"));
    assert_eq!(crown.conditions.len(), 2);
}

#[test]
fn name_column_wins_over_other_premises_columns() {
    let page = r#"
<table>
  <tr><th>Premises</th><th>Premises Name</th><th>Address</th></tr>
  <tr><td>Main bar and beer garden</td><td>The Crown</td><td>1 High Street</td></tr>
</table>
"#;
    let listing = parse_listing(page, "https://york.gov.uk/register").unwrap();
    assert_eq!(listing.rows[0].business_name, "The Crown");
}

#[test]
fn parse_listing_finds_next_page() {
    let listing = parse_listing(TABLE_PAGE, "https://x.gov.uk/licensing").unwrap();
    assert_eq!(
        listing.next_page.as_deref(),
        Some("https://x.gov.uk/licensing?page=2")
    );
}

#[test]
fn parse_listing_caps_rows_per_table() {
    let mut rows = String::new();
    for i in 0..80 {
        rows.push_str(&format!(
            "<tr><td>Venue {i}</td><td>{i} High Street</td><td>E1 6AN</td></tr>"
        ));
    }
    let html = format!(
        "<table><tr><th>Name</th><th>Address</th><th>Postcode</th></tr>{rows}</table>"
    );
    let listing = parse_listing(&html, "https://x.gov.uk").unwrap();
    assert_eq!(listing.rows.len(), 50);
}

#[test]
fn recognized_table_without_rows_is_empty_listing() {
    let html = "<table><tr><th>Premises name</th><th>Address</th><th>Status</th></tr></table>";
    let listing = parse_listing(html, "https://x.gov.uk").unwrap();
    assert!(listing.rows.is_empty());
}

#[test]
fn unrelated_page_is_not_recognized() {
    let html = r#"
<html><body>
  <h1>Licensing</h1>
  <p>Apply for or search premises licences using the form below.</p>
  <form action="/search"><input type="text" name="q"></form>
</body></html>"#;
    assert!(parse_listing(html, "https://x.gov.uk/licensing").is_none());
}

// -----------------------------------------------------------------------
// parse_listing: cards
// -----------------------------------------------------------------------

const CARD_PAGE: &str = r#"
<html><body>
<div class="search-results">
  <div class="result-item">
    <h3>The Old Swan</h3>
    <p><strong>Address:</strong> 5 Church Lane, Bristol BS1 4XE</p>
    <p>Status: Granted</p>
    <p>Licensable activities: Sale of alcohol, Live music</p>
  </div>
  <div class="result-item">
    <h3>Harbour Kitchen</h3>
    <dl><dt>Premises address</dt><dd>9 Quay Street, Bristol</dd>
        <dt>Postcode</dt><dd>BS1 5TH</dd>
        <dt>Date granted</dt><dd>3 April 2023</dd></dl>
  </div>
  <div class="result-item"><h3>Too short</h3></div>
</div>
</body></html>
"#;

#[test]
fn parse_listing_reads_cards() {
    let listing = parse_listing(CARD_PAGE, "https://bristol.gov.uk/licences").unwrap();
    assert_eq!(listing.layout, ListingLayout::Cards);
    assert_eq!(listing.rows.len(), 2);

    let swan = &listing.rows[0];
    assert_eq!(swan.business_name, "The Old Swan");
    assert_eq!(swan.address, "5 Church Lane, Bristol BS1 4XE");
    assert_eq!(swan.status.as_deref(), Some("Granted"));
    assert_eq!(swan.activities, vec!["Sale of alcohol", "Live music"]);

    let harbour = &listing.rows[1];
    assert_eq!(harbour.business_name, "Harbour Kitchen");
    assert_eq!(harbour.postcode.as_deref(), Some("BS1 5TH"));
    assert_eq!(
        harbour.granted_date,
        chrono::NaiveDate::from_ymd_opt(2023, 4, 3)
    );
}

// -----------------------------------------------------------------------
// find_next_page
// -----------------------------------------------------------------------

#[test]
fn find_next_page_honours_rel_next() {
    let html = r#"<head><link rel="next" href="/register/2"></head>"#;
    assert_eq!(
        find_next_page(html, "https://x.gov.uk/register/1").as_deref(),
        Some("https://x.gov.uk/register/2")
    );
}

#[test]
fn find_next_page_ignores_fragment_and_javascript_links() {
    let html = r##"<a href="#">Next</a><a href="javascript:go()">Next</a>"##;
    assert!(find_next_page(html, "https://x.gov.uk").is_none());
}

#[test]
fn find_next_page_ignores_self_link() {
    let html = r#"<a class="next" href="https://x.gov.uk/list">Next</a>"#;
    assert!(find_next_page(html, "https://x.gov.uk/list").is_none());
}

// -----------------------------------------------------------------------
// find_search_form
// -----------------------------------------------------------------------

const FORM_PAGE: &str = r#"
<html><body>
  <form id="site-search" action="/site-search"><input type="text" name="s"></form>
  <form id="licence-search" action="/licensing/results" method="POST">
    <input type="hidden" name="__VIEWSTATE" value="abc123">
    <input type="text" name="premisesName">
    <select name="status"><option value="">Any</option><option value="granted" selected>Granted</option></select>
    <input type="checkbox" name="current" checked>
    <input type="checkbox" name="archived">
    <input type="submit" name="go" value="Search">
  </form>
</body></html>
"#;

#[test]
fn find_search_form_prefers_licence_form() {
    let submission =
        find_search_form(FORM_PAGE, "https://x.gov.uk/licensing", &FormLookup::default()).unwrap();
    assert_eq!(submission.action, "https://x.gov.uk/licensing/results");
    assert_eq!(submission.method, FetchMethod::Post);
    assert_eq!(
        submission.fields,
        vec![
            ("__VIEWSTATE".to_string(), "abc123".to_string()),
            ("premisesName".to_string(), String::new()),
            ("current".to_string(), "on".to_string()),
            ("status".to_string(), "granted".to_string()),
            ("go".to_string(), "Search".to_string()),
        ]
    );
}

#[test]
fn find_search_form_applies_hints() {
    let mut extra = BTreeMap::new();
    extra.insert("ward".to_string(), "all".to_string());
    let lookup = FormLookup {
        form_selector: Some("form#site-search"),
        query_field: Some("s"),
        query_value: Some("licence"),
        extra_fields: Some(&extra),
    };
    let submission = find_search_form(FORM_PAGE, "https://x.gov.uk/licensing", &lookup).unwrap();
    assert_eq!(submission.action, "https://x.gov.uk/site-search");
    assert_eq!(submission.method, FetchMethod::Get);
    assert_eq!(
        submission.fields,
        vec![
            ("s".to_string(), "licence".to_string()),
            ("ward".to_string(), "all".to_string()),
        ]
    );
}

#[test]
fn find_search_form_without_action_submits_to_page_url() {
    let html = r#"<form><label>Search licences</label><input name="q"></form>"#;
    let submission =
        find_search_form(html, "https://x.gov.uk/licensing", &FormLookup::default()).unwrap();
    assert_eq!(submission.action, "https://x.gov.uk/licensing");
    assert_eq!(submission.fields, vec![("q".to_string(), String::new())]);
}

#[test]
fn find_search_form_returns_none_without_forms() {
    assert!(find_search_form("<p>No forms</p>", "https://x.gov.uk", &FormLookup::default()).is_none());
}

#[test]
fn find_search_form_with_unmatched_hint_returns_none() {
    let lookup = FormLookup {
        form_selector: Some("form#missing"),
        ..FormLookup::default()
    };
    assert!(find_search_form(FORM_PAGE, "https://x.gov.uk", &lookup).is_none());
}

// -----------------------------------------------------------------------
// ai_snippet
// -----------------------------------------------------------------------

#[test]
fn ai_snippet_drops_chrome_and_scripts() {
    let html = r"
<html><head><style>.x{}</style></head><body>
  <header>Council header</header>
  <nav>Home | Bins | Parking</nav>
  <main><h1>Licences</h1><script>var x = 1;</script><p>The Crown, 1 High Street</p></main>
  <footer>Copyright</footer>
</body></html>";
    assert_eq!(ai_snippet(html, 8000), "Licences The Crown, 1 High Street");
}

#[test]
fn ai_snippet_is_bounded() {
    let body = "word ".repeat(5000);
    let html = format!("<body><p>{body}</p></body>");
    let snippet = ai_snippet(&html, 100);
    assert_eq!(snippet.chars().count(), 103);
    assert!(snippet.ends_with("..."));
}
