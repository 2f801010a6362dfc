use async_trait::async_trait;

use super::{PlaceSource, Scraper};
use crate::{
    entities::Place,
    error::Error,
    extract::{extract, html::CATEGORY_ITEMS},
};

/// Reads the "Parks in <location>" category page directly.
pub struct CategoryPage {
    scraper: Scraper,
}

impl CategoryPage {
    pub fn new(scraper: Scraper) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl PlaceSource for CategoryPage {
    fn name(&self) -> &'static str {
        "category_page"
    }

    #[tracing::instrument(skip(self))]
    async fn run(&self, location: &str) -> Result<Vec<Place>, Error> {
        let url = self.scraper.wiki.category_url(location)?;
        let html = self.scraper.fetch.get(url.as_str()).await?;

        Ok(self.scraper.candidates(extract(&html, &CATEGORY_ITEMS), location))
    }
}

#[test]
fn category_members_become_candidates() {
    use super::testing::{category_page, scraper, WIKI_BASE};
    use crate::external::http::testing::FakeFetch;
    use std::sync::Arc;
    use tokio_test::block_on;

    let fetch = FakeFetch::new().body(
        format!("{}/wiki/Category:Parks_in_San_Francisco", WIKI_BASE),
        category_page(&["Golden Gate Park", "List of parks in San Francisco", "Dolores Park"]),
    );
    let source = CategoryPage::new(scraper(Arc::new(fetch)));

    let places = block_on(source.run("San Francisco")).unwrap();
    let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();

    assert_eq!(names, vec!["Golden Gate Park", "Dolores Park"]);
    assert!(places.iter().all(|place| place.coordinates.is_none()));
}

#[test]
fn missing_category_is_an_error() {
    use super::testing::scraper;
    use crate::external::http::testing::FakeFetch;
    use std::sync::Arc;
    use tokio_test::block_on;

    let source = CategoryPage::new(scraper(Arc::new(FakeFetch::new())));

    assert!(block_on(source.run("Nowhere")).is_err());
}
