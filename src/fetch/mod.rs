//! HTTP access to the realtime feed.
//!
//! [`HttpClient`] is the seam all requests go through; [`ApiKeyParam`] wraps a
//! client to attach the feed API key as a query parameter.

mod auth;
mod basic;
mod client;

pub use auth::ApiKeyParam;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, HeaderValue};

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Fetches one feed snapshot as raw protobuf bytes.
///
/// A non-2xx status or a transport failure is returned as an error; the
/// caller treats it as fatal for the whole run, so no state has been touched
/// on disk when this fails.
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let mut req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().context("invalid feed URL")?,
    );
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static(PROTOBUF_CONTENT_TYPE));

    let resp = client
        .execute(req)
        .await
        .context("feed request failed")?
        .error_for_status()
        .context("feed endpoint returned an error status")?;

    Ok(resp.bytes().await?.to_vec())
}
