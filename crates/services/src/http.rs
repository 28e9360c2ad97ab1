//! Shared HTTP plumbing for the concrete service clients.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// How much of an error response body is kept for logs and errors.
pub const ERROR_BODY_LIMIT: usize = 100;
const USER_AGENT: &str = concat!("marquee/", env!("CARGO_PKG_VERSION"));

/// Builds a client whose every request is bounded by `timeout`.
pub fn client(timeout: Duration) -> Result<Client> {
    Client::builder().user_agent(USER_AGENT).timeout(timeout).build().or_raise(|| ErrorKind::Client)
}

/// Parses a configured base URL, making sure it ends with a slash so that
/// relative joins append to the path instead of replacing its last segment.
pub fn base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).or_raise(|| ErrorKind::InvalidUrl(trimmed.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path).or_raise(|| ErrorKind::InvalidUrl(format!("{base}{path}")))
}

/// Passes through responses with the `expected` status (or any success when
/// `None`), otherwise turns them into [`ErrorKind::Status`] carrying the
/// start of the body.
pub async fn expect_status(response: Response, expected: Option<StatusCode>) -> Result<Response> {
    let status = response.status();
    let acceptable = match expected {
        Some(code) => status == code,
        None => status.is_success(),
    };
    if acceptable {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    exn::bail!(ErrorKind::Status {
        status: status.as_u16(),
        body: truncate(&body, ERROR_BODY_LIMIT),
    })
}

pub async fn json<T: DeserializeOwned>(response: Response, service: &str) -> Result<T> {
    response.json().await.or_raise(|| ErrorKind::InvalidResponse(service.to_string()))
}

/// Cuts `text` to at most `limit` characters (not bytes).
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
