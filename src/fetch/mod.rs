// src/fetch/mod.rs

//! HTTP plumbing: the [`Transport`] seam, the reqwest-backed client and
//! the on-disk response cache that wraps it.

use reqwest::StatusCode;
use std::future::Future;
use url::Url;

use crate::error::Result;

pub mod cache;
pub mod http;

pub use cache::CachedTransport;
pub use http::HttpTransport;

/// Query parameter carrying the API credential.
pub const KEY_PARAM: &str = "key";

/// What came back from one GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Request URL with its query string, credential removed.
    pub url: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Anything that can perform `GET url?params`.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// Full request URL for logs, errors and cache keys. The credential
/// parameter is left out.
pub fn request_url(url: &str, params: &[(String, String)]) -> Result<String> {
    let visible = params.iter().filter(|(k, _)| k != KEY_PARAM);
    Ok(Url::parse_with_params(url, visible)?.to_string())
}
