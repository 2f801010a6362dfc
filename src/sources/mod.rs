//! Lookup strategies, each producing zero or more candidate places for a
//! location from one external source. The engine tries them in order and
//! keeps the first non-empty result.

mod category;
mod google_places;
mod list_search;
mod search;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    entities::Place,
    error::Error,
    external::{google_maps::GoogleMaps, http::Fetch, wikipedia::Wikipedia},
    extract::{Link, NameFilter},
};

pub use category::CategoryPage;
pub use google_places::PlacesTextSearch;
pub use list_search::ListPageSearch;
pub use search::DirectSearch;

#[async_trait]
pub trait PlaceSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, location: &str) -> Result<Vec<Place>, Error>;
}

/// What the encyclopedia-backed sources share: the fetcher, URL builder and
/// name filter.
#[derive(Clone)]
pub struct Scraper {
    pub fetch: Arc<dyn Fetch>,
    pub wiki: Wikipedia,
    pub names: Arc<NameFilter>,
}

impl Scraper {
    /// Keeps plausible names as candidates, in document order.
    fn candidates(&self, links: Vec<Link>, location: &str) -> Vec<Place> {
        links
            .into_iter()
            .filter(|link| self.names.is_plausible_place_name(&link.text, location))
            .map(|link| Place::new(link.text, location))
            .collect()
    }
}

/// The canonical chain, most specific first.
pub fn default_chain(scraper: Scraper, maps: GoogleMaps) -> Vec<Box<dyn PlaceSource>> {
    vec![
        Box::new(CategoryPage::new(scraper.clone())),
        Box::new(ListPageSearch::new(scraper.clone())),
        Box::new(DirectSearch::broad(scraper.clone())),
        Box::new(DirectSearch::narrow(scraper)),
        Box::new(PlacesTextSearch::new(maps)),
    ]
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use super::Scraper;
    use crate::external::{http::Fetch, wikipedia::Wikipedia};
    use crate::extract::NameFilter;

    pub const WIKI_BASE: &str = "https://wiki.test";

    pub fn scraper(fetch: Arc<dyn Fetch>) -> Scraper {
        Scraper {
            fetch,
            wiki: Wikipedia::new(WIKI_BASE),
            names: Arc::new(NameFilter::default()),
        }
    }

    pub fn search_page(titles: &[(&str, &str)]) -> String {
        let items: String = titles
            .iter()
            .map(|(title, href)| {
                format!(
                    r#"<li><div class="mw-search-result-heading"><a href="{}" title="{}">{}</a></div></li>"#,
                    href, title, title
                )
            })
            .collect();

        format!(r#"<html><body><ul class="mw-search-results">{}</ul></body></html>"#, items)
    }

    pub fn category_page(names: &[&str]) -> String {
        let items: String = names
            .iter()
            .map(|name| format!(r#"<li><a href="/wiki/{}">{}</a></li>"#, name.replace(' ', "_"), name))
            .collect();

        format!(
            r#"<html><body><div class="mw-category-group"><h3>A</h3><ul>{}</ul></div></body></html>"#,
            items
        )
    }
}

#[test]
fn default_chain_order() {
    use crate::external::http::testing::FakeFetch;

    let fetch: Arc<dyn Fetch> = Arc::new(FakeFetch::new());
    let maps = GoogleMaps::new(fetch.clone(), "maps.test".into(), "key".into());
    let chain = default_chain(testing::scraper(fetch), maps);

    let names: Vec<_> = chain.iter().map(|source| source.name()).collect();

    assert_eq!(
        names,
        vec![
            "category_page",
            "list_page_search",
            "broad_search",
            "narrow_search",
            "places_text_search"
        ]
    );
}
