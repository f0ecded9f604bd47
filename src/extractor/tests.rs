use super::*;
use crate::http::Page;
use std::collections::HashMap;
use url::Url;

const SOURCE: &str = "https://acme.test/team";

fn extractor() -> ContactExtractor {
    ContactExtractor::new(ExtractionRules::default()).unwrap()
}

fn extract(html: &str) -> Vec<ContactRecord> {
    extractor().extract(html, SOURCE).collect()
}

#[test]
fn test_page_without_email_yields_nothing() {
    let html = r#"<html><body><h1>Jane Smith</h1><p>Chief Executive Officer</p></body></html>"#;
    assert!(extract(html).is_empty());
    assert_eq!(extractor().extract("", SOURCE).len(), 0);
}

#[test]
fn test_script_and_style_text_is_ignored() {
    let html = r#"<html><head><style>/* css@acme.test */</style></head>
        <body><script>var owner = "hidden@acme.test";</script><p>Nothing here</p></body></html>"#;
    assert!(extract(html).is_empty());
}

#[test]
fn test_mailto_link_with_name_and_title() {
    let html = r#"<html><body>
        <div class="person">
            <h3>Jane Smith</h3>
            <p>Chief Technology Officer</p>
            <a href="mailto:jane.smith@acme.test?subject=Hi">Email Jane</a>
        </div>
    </body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.email.as_deref(), Some("jane.smith@acme.test"));
    assert_eq!(record.name.as_deref(), Some("Jane Smith"));
    assert_eq!(record.job_title.as_deref(), Some("Chief Technology Officer"));
    assert_eq!(record.source_url, SOURCE);
}

#[test]
fn test_team_page_associates_each_card() {
    let html = r#"<html><body><section class="team">
        <div class="card"><h3>Jane Smith</h3><p>CEO</p><span>jane@acme.test</span></div>
        <div class="card"><h3>Robert Brown</h3><p>Head of Sales</p><span>rob@acme.test</span></div>
        <div class="card"><h3>Maria Garcia</h3><span>maria@acme.test</span></div>
    </section></body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 3);

    let by_email = |email: &str| {
        records
            .iter()
            .find(|r| r.email.as_deref() == Some(email))
            .cloned()
            .unwrap()
    };
    let jane = by_email("jane@acme.test");
    assert_eq!(jane.name.as_deref(), Some("Jane Smith"));
    assert_eq!(jane.job_title.as_deref(), Some("CEO"));

    let rob = by_email("rob@acme.test");
    assert_eq!(rob.name.as_deref(), Some("Robert Brown"));
    assert_eq!(rob.job_title.as_deref(), Some("Head of Sales"));

    let maria = by_email("maria@acme.test");
    assert_eq!(maria.name.as_deref(), Some("Maria Garcia"));
    assert_eq!(maria.job_title, None);
}

#[test]
fn test_inline_name_title_and_email() {
    let html = r#"<p>John Doe, CTO - <a href="mailto:john@acme.test">john@acme.test</a></p>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("John Doe"));
    assert_eq!(records[0].job_title.as_deref(), Some("CTO"));
}

#[test]
fn test_shared_container_gives_bare_emails() {
    let html = r#"<p>Write to anna@acme.test or ben@acme.test, Anna Lee and Ben Cole</p>"#;

    let records = extract(html);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.name.is_none()));
}

#[test]
fn test_json_ld_person() {
    let html = r#"<html><head><script type="application/ld+json">
        {
            "@context": "https://schema.org",
            "@type": "Organization",
            "name": "Acme",
            "employee": [
                {"@type": "Person", "name": "Grace Hopper", "jobTitle": "Rear Admiral",
                 "email": "mailto:grace@acme.test"},
                {"@type": "Person", "givenName": "Alan", "familyName": "Turing",
                 "email": "alan@acme.test"}
            ]
        }
    </script></head><body></body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].email.as_deref(), Some("grace@acme.test"));
    assert_eq!(records[0].name.as_deref(), Some("Grace Hopper"));
    assert_eq!(records[0].job_title.as_deref(), Some("Rear Admiral"));
    assert_eq!(records[1].name.as_deref(), Some("Alan Turing"));
}

#[test]
fn test_malformed_json_ld_is_skipped() {
    let html = r#"<script type="application/ld+json">{"email": </script>
        <p>Reach us at hello@acme.test</p>"#;
    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email.as_deref(), Some("hello@acme.test"));
}

#[test]
fn test_hcard() {
    let html = r#"<div class="vcard">
        <span class="fn">Ada Lovelace</span>
        <span class="title">Analyst</span>
        <a class="email" href="mailto:ada@acme.test">write</a>
    </div>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(records[0].job_title.as_deref(), Some("Analyst"));
}

#[test]
fn test_meta_description_email() {
    let html = r#"<html><head>
        <meta name="description" content="Acme widgets. Questions? press@acme.test">
        <meta name="author" content="ignored@acme.test">
    </head><body></body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email.as_deref(), Some("press@acme.test"));
}

#[test]
fn test_duplicates_merge_case_insensitively() {
    let html = r#"<html><head><script type="application/ld+json">
        {"@type": "Person", "name": "Jane Smith", "email": "Jane@Acme.test"}
    </script></head><body>
        <footer><div><p>Sales Director</p><a href="mailto:jane@acme.test">jane@acme.test</a></div></footer>
    </body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email.as_deref(), Some("Jane@Acme.test"));
    assert_eq!(records[0].name.as_deref(), Some("Jane Smith"));
    assert_eq!(records[0].job_title.as_deref(), Some("Sales Director"));
}

#[test]
fn test_extract_page_uses_final_url_and_skips_binary() {
    let url = Url::parse("http://acme.test/").unwrap();
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "text/html".to_string());
    let page = Page::new(
        url,
        200,
        headers,
        "<p>Jane Smith jane@acme.test</p>".to_string(),
    )
    .with_final_url(Url::parse("https://www.acme.test/contact").unwrap());

    let records: Vec<_> = extractor().extract_page(&page).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_url, "https://www.acme.test/contact");

    let mut binary_headers = HashMap::new();
    binary_headers.insert("content-type".to_string(), "image/png".to_string());
    let binary = Page::new(
        Url::parse("http://acme.test/logo.png").unwrap(),
        200,
        binary_headers,
        "jane@acme.test".to_string(),
    );
    assert_eq!(extractor().extract_page(&binary).len(), 0);
}

#[test]
fn test_custom_strategy_list() {
    let strategies: Vec<Box<dyn ExtractionStrategy>> =
        vec![Box::new(MetaTagStrategy::new().unwrap())];
    let extractor = ContactExtractor::with_strategies(ExtractionRules::default(), strategies)
        .unwrap();
    let records: Vec<_> = extractor
        .extract("<p>Jane Smith jane@acme.test</p>", SOURCE)
        .collect();
    assert!(records.is_empty());
}

#[test]
fn test_linkedin_profile_next_to_email() {
    let html = r#"<html><body>
        <div class="person">
            <h3>Jane Smith</h3>
            <p>Head of Sales</p>
            <a href="https://www.linkedin.com/company/acme">Acme on LinkedIn</a>
            <a href="https://www.linkedin.com/in/jane-smith/">LinkedIn</a>
            <a href="mailto:jane@acme.test">Email</a>
        </div>
        <div class="person">
            <h3>Ben Baker</h3>
            <a href="mailto:ben@acme.test">Email</a>
        </div>
    </body></html>"#;

    let records = extract(html);
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].linkedin.as_deref(),
        Some("https://www.linkedin.com/in/jane-smith/")
    );
    assert_eq!(records[1].linkedin, None);
}

#[test]
fn test_json_ld_same_as_linkedin() {
    let html = r#"<script type="application/ld+json">
        {"@type": "Person", "name": "Grace Hopper", "email": "grace@acme.test",
         "sameAs": ["https://twitter.com/grace", "https://www.linkedin.com/in/gracehopper"]}
    </script>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].linkedin.as_deref(),
        Some("https://www.linkedin.com/in/gracehopper")
    );
}

#[test]
fn test_deeply_nested_markup_does_not_overflow() {
    let depth = 10_000;
    let html = format!(
        r#"<html><body><a href="mailto:jane@acme.test">{}Jane Smith{}</a></body></html>"#,
        "<span>".repeat(depth),
        "</span>".repeat(depth)
    );

    let records = extract(&html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].email.as_deref(), Some("jane@acme.test"));
    // Too deep to read for context.
    assert_eq!(records[0].name, None);
}

#[test]
fn test_nesting_limit_only_drops_context() {
    let html = r#"<div><h3><span><b><i>Jane Smith</i></b></span></h3>
        <a href="mailto:jane@acme.test">Email</a></div>"#;

    let shallow = ExtractionRules {
        max_nesting: 2,
        ..ExtractionRules::default()
    };
    let records: Vec<ContactRecord> = ContactExtractor::new(shallow)
        .unwrap()
        .extract(html, SOURCE)
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, None);

    let records = extract(html);
    assert_eq!(records[0].name.as_deref(), Some("Jane Smith"));
}
