use async_trait::async_trait;

use super::{PlaceSource, Scraper};
use crate::{
    entities::Place,
    error::Error,
    extract::{
        extract,
        html::{LIST_PAGE_ITEMS, SEARCH_RESULT_HEADINGS},
        Link,
    },
};

const LIST_TITLE_MARKERS: &[&str] = &["list of", "parks in", "beaches in", "lakes in"];

/// Searches for list or category pages about the location and reads the
/// first one that yields any candidates.
pub struct ListPageSearch {
    scraper: Scraper,
}

impl ListPageSearch {
    pub fn new(scraper: Scraper) -> Self {
        Self { scraper }
    }
}

fn is_list_page_for(link: &Link, location: &str) -> bool {
    let title = link.text.to_lowercase();

    LIST_TITLE_MARKERS.iter().any(|marker| title.contains(marker))
        && title.contains(&location.trim().to_lowercase())
}

#[async_trait]
impl PlaceSource for ListPageSearch {
    fn name(&self) -> &'static str {
        "list_page_search"
    }

    #[tracing::instrument(skip(self))]
    async fn run(&self, location: &str) -> Result<Vec<Place>, Error> {
        let query = format!("{} parks beaches lakes outdoor spaces", location);
        let url = self.scraper.wiki.search_url(&query)?;
        let html = self.scraper.fetch.get(url.as_str()).await?;

        let pages: Vec<Link> = extract(&html, &SEARCH_RESULT_HEADINGS)
            .into_iter()
            .filter(|link| link.href.is_some() && is_list_page_for(link, location))
            .collect();

        tracing::debug!(location, pages = pages.len(), "list pages found");

        for page in pages {
            let href = page.href.unwrap_or_default();
            let page_url = self.scraper.wiki.resolve(&href)?;

            let html = match self.scraper.fetch.get(page_url.as_str()).await {
                Ok(html) => html,
                Err(err) if err.is_rate_limited() => return Err(err),
                Err(err) => {
                    tracing::warn!(location, page = %page_url, %err, "skipping list page");
                    continue;
                }
            };

            let candidates = self
                .scraper
                .candidates(extract(&html, &LIST_PAGE_ITEMS), location);

            if !candidates.is_empty() {
                return Ok(candidates);
            }
        }

        Ok(Vec::new())
    }
}

#[test]
fn list_page_titles_must_mention_location() {
    let link = |text: &str| Link {
        text: text.into(),
        href: Some("/wiki/x".into()),
    };

    assert!(is_list_page_for(&link("List of parks in Oakland, California"), "Oakland"));
    assert!(is_list_page_for(&link("Beaches in oakland"), "Oakland"));
    assert!(!is_list_page_for(&link("List of parks in Berkeley"), "Oakland"));
    assert!(!is_list_page_for(&link("Oakland Athletics"), "Oakland"));
}

#[test]
fn follows_list_pages_until_one_yields_candidates() {
    use super::testing::{category_page, scraper, search_page, WIKI_BASE};
    use crate::external::http::testing::FakeFetch;
    use std::sync::Arc;
    use tokio_test::block_on;

    let search_url = format!(
        "{}/w/index.php?search=Oakland+parks+beaches+lakes+outdoor+spaces&fulltext=1",
        WIKI_BASE
    );
    let fetch = FakeFetch::new()
        .body(
            search_url,
            search_page(&[
                ("Oakland Athletics", "/wiki/Oakland_Athletics"),
                ("List of lakes in Oakland", "/wiki/List_of_lakes_in_Oakland"),
                ("List of parks in Oakland", "/wiki/List_of_parks_in_Oakland"),
                ("Parks in Oakland", "/wiki/Parks_in_Oakland"),
            ]),
        )
        .body(
            format!("{}/wiki/List_of_lakes_in_Oakland", WIKI_BASE),
            "<html><body><p>No list here</p></body></html>",
        )
        .body(
            format!("{}/wiki/List_of_parks_in_Oakland", WIKI_BASE),
            category_page(&["Joaquin Miller Park", "Lake Merritt"]),
        );
    let fetch = Arc::new(fetch);
    let source = ListPageSearch::new(scraper(fetch.clone()));

    let places = block_on(source.run("Oakland")).unwrap();
    let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();

    assert_eq!(names, vec!["Joaquin Miller Park", "Lake Merritt"]);
    // the third list page is never fetched
    assert_eq!(fetch.calls(), 3);
}

#[test]
fn unreachable_list_page_is_skipped() {
    use super::testing::{category_page, scraper, search_page, WIKI_BASE};
    use crate::external::http::testing::{Canned, FakeFetch};
    use std::sync::Arc;
    use tokio_test::block_on;

    let search_url = format!(
        "{}/w/index.php?search=Oakland+parks+beaches+lakes+outdoor+spaces&fulltext=1",
        WIKI_BASE
    );
    let fetch = FakeFetch::new()
        .body(
            search_url,
            search_page(&[
                ("List of beaches in Oakland", "/wiki/Gone"),
                ("List of parks in Oakland", "/wiki/List_of_parks_in_Oakland"),
            ]),
        )
        .respond(format!("{}/wiki/Gone", WIKI_BASE), Canned::Status(500))
        .body(
            format!("{}/wiki/List_of_parks_in_Oakland", WIKI_BASE),
            category_page(&["Dimond Park"]),
        );
    let source = ListPageSearch::new(scraper(Arc::new(fetch)));

    let places = block_on(source.run("Oakland")).unwrap();

    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "Dimond Park");
}
