use regex::{Regex, RegexSet};

use crate::error::{parse_error, Error};

/// Terms that disqualify a name wherever they appear as whole words.
pub const DEFAULT_DENY_TERMS: &[&str] = &[
    "list of",
    "lists of",
    "outline of",
    "index of",
    "history of",
    "geography of",
    "department",
    "portal",
    "category",
    "template",
    "wikipedia",
    "stadium",
    "arena",
    "mall",
    "shopping center",
    "airport",
    "amusement park",
    "theme park",
    "casino",
];

/// Terms that disqualify a name only when they are the whole name.
pub const DEFAULT_DENY_EXACT: &[&str] = &[
    "state", "county", "city", "country", "parks", "park", "beaches", "beach", "lakes", "lake",
    "edit", "help", "main page",
];

pub const DEFAULT_DENY_PATTERNS: &[&str] = &[
    // footnote and maintenance markers: [12], [a], [citation needed]
    r"^\[[^\]]*\]$",
    r"(?i)\.(kml|kmz|gpx|geojson)$",
    r"(?i)^(category|template|portal|file|help|wikipedia|special|talk):",
    r"^[\d\s.,]+$",
];

/// Decides whether scraped link text plausibly names an outdoor place.
///
/// Heuristic by nature; false positives and negatives are expected.
#[derive(Clone, Debug)]
pub struct NameFilter {
    min_chars: usize,
    deny_terms: Option<Regex>,
    deny_exact: Vec<String>,
    deny_patterns: RegexSet,
}

impl NameFilter {
    pub fn new<S: AsRef<str>>(
        deny_terms: &[S],
        deny_exact: &[S],
        deny_patterns: &[S],
    ) -> Result<Self, Error> {
        let deny_terms = if deny_terms.is_empty() {
            None
        } else {
            let alternatives: Vec<_> = deny_terms
                .iter()
                .map(|term| regex::escape(term.as_ref().trim()))
                .collect();
            let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));

            Some(Regex::new(&pattern).map_err(parse_error)?)
        };

        let deny_patterns =
            RegexSet::new(deny_patterns.iter().map(|p| p.as_ref())).map_err(parse_error)?;

        Ok(Self {
            min_chars: 3,
            deny_terms,
            deny_exact: deny_exact
                .iter()
                .map(|term| term.as_ref().trim().to_lowercase())
                .collect(),
            deny_patterns,
        })
    }

    /// The default deny-lists extended with `extra_terms`.
    pub fn with_extra_terms(extra_terms: &[String]) -> Result<Self, Error> {
        let terms: Vec<String> = DEFAULT_DENY_TERMS
            .iter()
            .map(|term| term.to_string())
            .chain(extra_terms.iter().cloned())
            .collect();
        let exact: Vec<String> = DEFAULT_DENY_EXACT.iter().map(|t| t.to_string()).collect();
        let patterns: Vec<String> = DEFAULT_DENY_PATTERNS.iter().map(|p| p.to_string()).collect();

        Self::new(&terms[..], &exact[..], &patterns[..])
    }

    pub fn is_plausible_place_name(&self, text: &str, location: &str) -> bool {
        let text = text.trim();

        if text.chars().count() < self.min_chars {
            return false;
        }

        if self.deny_patterns.is_match(text) {
            return false;
        }

        if let Some(deny_terms) = &self.deny_terms {
            if deny_terms.is_match(text) {
                return false;
            }
        }

        let lowered = text.to_lowercase();

        if self.deny_exact.iter().any(|term| *term == lowered) {
            return false;
        }

        lowered != location.trim().to_lowercase()
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        // the built-in lists are constant and known to compile
        Self::with_extra_terms(&[]).expect("default name filter")
    }
}

#[test]
fn accepts_ordinary_place_names() {
    let filter = NameFilter::default();

    for name in [
        "Golden Gate Park",
        "Ocean Beach",
        "Lake Merced",
        "Mount Tamalpais State Park",
        "Baker Beach",
        "Crissy Field",
    ] {
        assert!(filter.is_plausible_place_name(name, "San Francisco"), "{}", name);
    }
}

#[test]
fn rejects_short_and_footnote_text() {
    let filter = NameFilter::default();

    assert!(!filter.is_plausible_place_name("", "Paris"));
    assert!(!filter.is_plausible_place_name("ab", "Paris"));
    assert!(!filter.is_plausible_place_name("  xy  ", "Paris"));
    assert!(!filter.is_plausible_place_name("[12]", "Paris"));
    assert!(!filter.is_plausible_place_name("[citation needed]", "Paris"));
    assert!(filter.is_plausible_place_name("Zoo", "Paris"));
}

#[test]
fn rejects_deny_listed_terms_case_insensitively() {
    let filter = NameFilter::default();

    assert!(!filter.is_plausible_place_name("List of parks in Oakland", "Oakland"));
    assert!(!filter.is_plausible_place_name("Oakland Parks DEPARTMENT", "Oakland"));
    assert!(!filter.is_plausible_place_name("Oakland Coliseum Stadium", "Oakland"));
    assert!(!filter.is_plausible_place_name("Oakland International Airport", "Oakland"));
    assert!(!filter.is_plausible_place_name("Children's Fairyland amusement park", "Oakland"));
    assert!(!filter.is_plausible_place_name("Bayfair Mall", "Oakland"));
    assert!(!filter.is_plausible_place_name("State", "Oakland"));
    assert!(!filter.is_plausible_place_name("Parks_in_Oakland.kml", "Oakland"));
    assert!(!filter.is_plausible_place_name("Portal:California", "Oakland"));

    // whole words only
    assert!(filter.is_plausible_place_name("Small Mallard Pond", "Oakland"));
}

#[test]
fn rejects_the_location_itself() {
    let filter = NameFilter::default();

    assert!(!filter.is_plausible_place_name("san francisco", "San Francisco"));
    assert!(!filter.is_plausible_place_name("San Francisco ", "San Francisco"));
    assert!(filter.is_plausible_place_name("San Francisco Bay Trail", "San Francisco"));
}

#[test]
fn extra_terms_extend_the_defaults() {
    let filter = NameFilter::with_extra_terms(&["golf course".to_string()]).unwrap();

    assert!(!filter.is_plausible_place_name("Lincoln Park Golf Course", "San Francisco"));
    assert!(!filter.is_plausible_place_name("List of beaches", "San Francisco"));
    assert!(filter.is_plausible_place_name("Lincoln Park", "San Francisco"));
}
