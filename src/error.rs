use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

const INVALID_INPUT: i32 = 101;
const GEOCODE_AREA: i32 = 102;
const RATE_LIMITED: i32 = 103;
const UPSTREAM: i32 = 104;

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        self.code == RATE_LIMITED
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        parse_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            RATE_LIMITED | UPSTREAM => (StatusCode::BAD_GATEWAY, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_input_error(message: &str) -> Error {
    Error {
        code: INVALID_INPUT,
        message: message.into(),
    }
}

pub fn geocode_area_error(location: &str) -> Error {
    Error {
        code: GEOCODE_AREA,
        message: format!("Geocoding API returned no results for {}", location),
    }
}

pub fn rate_limited_error() -> Error {
    Error {
        code: RATE_LIMITED,
        message: "rate limit retries exhausted".into(),
    }
}

pub fn upstream_error(detail: impl fmt::Display) -> Error {
    Error {
        code: UPSTREAM,
        message: format!("upstream error: {}", detail),
    }
}

pub fn env_var_error(err: env::VarError) -> Error {
    Error {
        code: 1,
        message: format!("environment variable error: {}", err),
    }
}

pub fn config_error(detail: impl fmt::Display) -> Error {
    Error {
        code: 2,
        message: format!("configuration error: {}", detail),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    Error {
        code: 3,
        message: format!("reqwest error: {}", err),
    }
}

pub fn parse_error<T: Debug>(err: T) -> Error {
    Error {
        code: 4,
        message: format!("parse error: {:?}", err),
    }
}

#[test]
fn rate_limited_classification() {
    assert!(rate_limited_error().is_rate_limited());
    assert!(!upstream_error("500 Internal Server Error").is_rate_limited());
    assert!(!invalid_input_error("Location is required").is_rate_limited());
}

#[test]
fn geocode_area_error_names_location() {
    let err = geocode_area_error("Zzzzznotaplace");

    assert!(err
        .message
        .starts_with("Geocoding API returned no results"));
    assert!(err.message.ends_with("Zzzzznotaplace"));
}

#[test]
fn internal_errors_hide_details() {
    let response = env_var_error(env::VarError::NotPresent).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = invalid_input_error("Location is required").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = upstream_error("503 Service Unavailable").into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
