use reqwest::Url;

use crate::error::{parse_error, Error};

/// URL construction for the encyclopedia's search and category pages.
#[derive(Clone, Debug)]
pub struct Wikipedia {
    base: String,
}

impl Wikipedia {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full-text search; `fulltext` keeps the site from redirecting straight
    /// to an article when the query matches a title.
    pub fn search_url(&self, query: &str) -> Result<Url, Error> {
        let url = format!("{}/w/index.php", self.base);

        Url::parse_with_params(&url, &[("search", query), ("fulltext", "1")]).map_err(parse_error)
    }

    pub fn category_url(&self, location: &str) -> Result<Url, Error> {
        let title = location.split_whitespace().collect::<Vec<_>>().join("_");
        let mut url = Url::parse(&self.base).map_err(parse_error)?;
        url.set_path(&format!("wiki/Category:Parks_in_{}", title));

        Ok(url)
    }

    /// Resolves a link found on one of the encyclopedia's pages.
    pub fn resolve(&self, href: &str) -> Result<Url, Error> {
        let base = Url::parse(&self.base).map_err(parse_error)?;

        base.join(href).map_err(parse_error)
    }
}

#[test]
fn builds_search_and_category_urls() {
    let wiki = Wikipedia::new("https://en.wikipedia.org/");

    assert_eq!(
        wiki.search_url("Oakland parks beaches lakes").unwrap().as_str(),
        "https://en.wikipedia.org/w/index.php?search=Oakland+parks+beaches+lakes&fulltext=1"
    );
    assert_eq!(
        wiki.category_url("San  Francisco").unwrap().as_str(),
        "https://en.wikipedia.org/wiki/Category:Parks_in_San_Francisco"
    );
}

#[test]
fn resolves_relative_links() {
    let wiki = Wikipedia::new("https://en.wikipedia.org");

    assert_eq!(
        wiki.resolve("/wiki/List_of_parks_in_Oakland").unwrap().as_str(),
        "https://en.wikipedia.org/wiki/List_of_parks_in_Oakland"
    );
    assert_eq!(
        wiki.resolve("https://example.org/x").unwrap().as_str(),
        "https://example.org/x"
    );
}
