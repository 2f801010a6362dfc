use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Result headings on the encyclopedia's full-text search page.
pub static SEARCH_RESULT_HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.mw-search-result-heading a").unwrap());

/// Member links on a category page.
pub static CATEGORY_ITEMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.mw-category-group ul li a").unwrap());

/// Category members, or the leading link of each top-level bullet on an
/// article-style list page.
pub static LIST_PAGE_ITEMS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.mw-category-group ul li a, div.mw-parser-output > ul > li > a:first-child")
        .unwrap()
});

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

/// Collects the text and `href` of every element matching `selector`, in
/// document order. Malformed markup is parsed leniently; no match yields an
/// empty list.
pub fn extract(html: &str, selector: &Selector) -> Vec<Link> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .map(|element| Link {
            text: normalize_whitespace(&element.text().collect::<String>()),
            href: element.value().attr("href").map(str::to_string),
        })
        .filter(|link| !link.text.is_empty())
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn extracts_search_headings() {
    let html = r#"
        <ul class="mw-search-results">
          <li><div class="mw-search-result-heading"><a href="/wiki/List_of_parks_in_Oakland" title="List of parks in Oakland">List of  parks in
            <span class="searchmatch">Oakland</span></a></div></li>
          <li><div class="mw-search-result-heading"><a href="/wiki/Lake_Merritt">Lake Merritt</a></div></li>
        </ul>"#;

    let links = extract(html, &SEARCH_RESULT_HEADINGS);

    assert_eq!(
        links,
        vec![
            Link {
                text: "List of parks in Oakland".into(),
                href: Some("/wiki/List_of_parks_in_Oakland".into()),
            },
            Link {
                text: "Lake Merritt".into(),
                href: Some("/wiki/Lake_Merritt".into()),
            },
        ]
    );
}

#[test]
fn malformed_markup_does_not_fail() {
    let html = r#"<div class="mw-category-group"><ul><li><a href="/wiki/A">Alpha Park</a><li><a>Beta Beach</a></ul><p>unclosed"#;

    let links = extract(html, &CATEGORY_ITEMS);
    let names: Vec<_> = links.iter().map(|link| link.text.as_str()).collect();

    assert_eq!(names, vec!["Alpha Park", "Beta Beach"]);
    assert_eq!(links[1].href, None);
}

#[test]
fn no_match_is_empty() {
    assert!(extract("<html><body><p>nothing</p></body></html>", &CATEGORY_ITEMS).is_empty());
    assert!(extract("", &SEARCH_RESULT_HEADINGS).is_empty());
}

#[test]
fn list_pages_take_leading_bullet_links() {
    let html = r#"
        <div class="mw-parser-output">
          <p>Intro with <a href="/wiki/Oakland">Oakland</a></p>
          <ul>
            <li><a href="/wiki/Joaquin_Miller_Park">Joaquin Miller Park</a>, in the <a href="/wiki/Oakland_Hills">hills</a></li>
            <li><a href="/wiki/Redwood_Regional_Park">Redwood Regional Park</a></li>
          </ul>
        </div>"#;

    let names: Vec<_> = extract(html, &LIST_PAGE_ITEMS)
        .into_iter()
        .map(|link| link.text)
        .collect();

    assert_eq!(names, vec!["Joaquin Miller Park", "Redwood Regional Park"]);
}
