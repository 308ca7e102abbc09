// src/fetch/http.rs

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{request_url, RawResponse, Transport};
use crate::error::Result;

/// Plain reqwest transport, no caching.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<RawResponse> {
        let shown = request_url(url, params)?;
        debug!(url = %shown, "GET");

        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?.to_vec();
        debug!(url = %shown, %status, bytes = body.len(), "response");

        Ok(RawResponse {
            url: shown,
            status,
            body,
        })
    }
}
