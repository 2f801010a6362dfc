use async_trait::async_trait;

use super::{PlaceSource, Scraper};
use crate::{
    entities::Place,
    error::Error,
    extract::{extract, html::SEARCH_RESULT_HEADINGS},
};

/// Takes candidates straight from search-result headings, without following
/// any page.
pub struct DirectSearch {
    name: &'static str,
    query: fn(&str) -> String,
    scraper: Scraper,
}

impl DirectSearch {
    /// "<location> public parks beaches lakes"
    pub fn broad(scraper: Scraper) -> Self {
        Self {
            name: "broad_search",
            query: |location| format!("{} public parks beaches lakes", location),
            scraper,
        }
    }

    /// "public parks beaches lakes in <location>"
    pub fn narrow(scraper: Scraper) -> Self {
        Self {
            name: "narrow_search",
            query: |location| format!("public parks beaches lakes in {}", location),
            scraper,
        }
    }
}

#[async_trait]
impl PlaceSource for DirectSearch {
    fn name(&self) -> &'static str {
        self.name
    }

    #[tracing::instrument(skip(self), fields(source = self.name))]
    async fn run(&self, location: &str) -> Result<Vec<Place>, Error> {
        let url = self.scraper.wiki.search_url(&(self.query)(location))?;
        let html = self.scraper.fetch.get(url.as_str()).await?;

        Ok(self
            .scraper
            .candidates(extract(&html, &SEARCH_RESULT_HEADINGS), location))
    }
}

#[test]
fn broad_and_narrow_phrasing() {
    use super::testing::{scraper, search_page, WIKI_BASE};
    use crate::external::http::testing::FakeFetch;
    use std::sync::Arc;
    use tokio_test::block_on;

    let fetch = FakeFetch::new()
        .body(
            format!(
                "{}/w/index.php?search=Tahoe+City+public+parks+beaches+lakes&fulltext=1",
                WIKI_BASE
            ),
            search_page(&[("Commons Beach", "/wiki/Commons_Beach"), ("Tahoe City", "/wiki/Tahoe_City")]),
        )
        .body(
            format!(
                "{}/w/index.php?search=public+parks+beaches+lakes+in+Tahoe+City&fulltext=1",
                WIKI_BASE
            ),
            search_page(&[("Lake Tahoe", "/wiki/Lake_Tahoe"), ("Department of Parks", "/wiki/D")]),
        );
    let fetch = Arc::new(fetch);

    block_on(async {
        let broad = DirectSearch::broad(scraper(fetch.clone()));
        let places = broad.run("Tahoe City").await.unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();
        assert_eq!(names, vec!["Commons Beach"]);

        let narrow = DirectSearch::narrow(scraper(fetch.clone()));
        let places = narrow.run("Tahoe City").await.unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();
        assert_eq!(names, vec!["Lake Tahoe"]);
    });
}
