use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    engine::MissingCoordinates,
    error::{config_error, Error},
};

#[derive(Clone, Debug)]
pub struct Config {
    pub google_maps_api_key: String,
    pub google_maps_api_base: String,
    pub wikipedia_base: String,
    pub user_agent: String,
    pub rate_limit_interval: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_attempts: u32,
    pub retry_jitter: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
    pub missing_coordinates: MissingCoordinates,
    pub extra_deny_terms: Vec<String>,
    pub max_results: usize,
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_maps_api_key: String::new(),
            google_maps_api_base: "maps.googleapis.com".into(),
            wikipedia_base: "https://en.wikipedia.org".into(),
            user_agent: concat!("parkfinder/", env!("CARGO_PKG_VERSION")).into(),
            rate_limit_interval: Duration::from_millis(1500),
            retry_base_delay: Duration::from_millis(1000),
            retry_max_attempts: 5,
            retry_jitter: Duration::from_millis(250),
            cache_capacity: 1000,
            cache_ttl: Some(Duration::from_secs(86400)),
            missing_coordinates: MissingCoordinates::Exclude,
            extra_deny_terms: Vec::new(),
            max_results: 10,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment. Only the API key is
    /// required; everything else falls back to the defaults.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let cache_ttl = match parse_var::<u64>("CACHE_TTL_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.cache_ttl,
        };

        Ok(Self {
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")?,
            google_maps_api_base: env::var("GOOGLE_MAPS_API_BASE")
                .unwrap_or(defaults.google_maps_api_base),
            wikipedia_base: env::var("WIKIPEDIA_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.wikipedia_base),
            user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
            rate_limit_interval: parse_var("RATE_LIMIT_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.rate_limit_interval),
            retry_base_delay: parse_var("RETRY_BASE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            retry_max_attempts: parse_var("RETRY_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry_max_attempts)
                .max(1),
            retry_jitter: parse_var("RETRY_JITTER_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_jitter),
            cache_capacity: parse_var("CACHE_CAPACITY")?.unwrap_or(defaults.cache_capacity),
            cache_ttl,
            missing_coordinates: parse_var("MISSING_COORDINATES")?
                .unwrap_or(defaults.missing_coordinates),
            extra_deny_terms: env::var("DENY_TERMS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.extra_deny_terms),
            max_results: parse_var("MAX_RESULTS")?.unwrap_or(defaults.max_results),
            listen_addr: parse_var("LISTEN_ADDR")?.unwrap_or(defaults.listen_addr),
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| config_error(format!("{}: {}", name, err))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Comma-separated, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn split_list_drops_blanks() {
    assert_eq!(
        split_list(" golf course, ,marina,"),
        vec!["golf course".to_string(), "marina".to_string()]
    );
}

#[test]
fn parse_var_reports_the_variable_name() {
    env::set_var("PARKFINDER_TEST_BAD_NUMBER", "soon");

    let err = parse_var::<u64>("PARKFINDER_TEST_BAD_NUMBER").unwrap_err();
    assert!(err.message.contains("PARKFINDER_TEST_BAD_NUMBER"));

    env::remove_var("PARKFINDER_TEST_BAD_NUMBER");
}

#[test]
fn parse_var_missing_is_none() {
    let value = parse_var::<u64>("PARKFINDER_TEST_NEVER_SET").unwrap();
    assert_eq!(value, None);
}
