// src/client.rs

use tracing::{debug, error};

use crate::config::{resolve_api_key, CensusConfig};
use crate::error::{CensusError, Result};
use crate::fetch::{CachedTransport, HttpTransport, Transport, KEY_PARAM};

/// Entry point for all requests: owns the transport, the credential and
/// the defaults that shape requests.
///
/// The data-producing operations live next to their pipelines:
/// [`Census::get_metadata`], [`Census::get_variables`] and [`Census::acs`].
#[derive(Debug, Clone)]
pub struct Census<T = CachedTransport<HttpTransport>> {
    transport: T,
    api_key: Option<String>,
    most_recent_acs_year: u16,
}

impl Census {
    /// Cached reqwest client built from `config`.
    pub fn new(config: CensusConfig) -> Result<Self> {
        let http = HttpTransport::new(config.timeout())?;
        let transport = CachedTransport::new(http, config.cache_dir.clone());
        Ok(Self::with_transport(transport, &config))
    }
}

impl<T: Transport> Census<T> {
    pub fn with_transport(transport: T, config: &CensusConfig) -> Self {
        Self {
            transport,
            api_key: resolve_api_key(config.api_key.as_deref()),
            most_recent_acs_year: config.most_recent_acs_year,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn most_recent_acs_year(&self) -> u16 {
        self.most_recent_acs_year
    }

    /// GET with the credential attached; any non-2xx is fatal.
    pub(crate) async fn api_req(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
        let mut params = params.to_vec();
        if let Some(key) = &self.api_key {
            params.push((KEY_PARAM.to_string(), key.clone()));
        }

        let resp = self.transport.get(url, &params).await?;
        if !resp.status.is_success() {
            error!(url = %resp.url, status = %resp.status, "--- REQUEST FAILED ---");
            return Err(CensusError::Provider {
                url: resp.url,
                status: resp.status,
            });
        }

        debug!(url = %resp.url, bytes = resp.body.len(), "request ok");
        Ok(resp.body)
    }
}
