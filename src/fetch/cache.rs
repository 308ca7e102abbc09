// src/fetch/cache.rs

use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::fs;
use tracing::{debug, trace};

use super::{request_url, RawResponse, Transport};
use crate::error::{CensusError, Result};

/// Memoizes successful responses on disk, one file per request.
///
/// Files are named by the SHA-256 of the request URL without the
/// credential, so a key never reaches disk and rotating it keeps hits.
/// With no directory every call goes straight to the inner transport.
#[derive(Debug, Clone)]
pub struct CachedTransport<T> {
    inner: T,
    dir: Option<PathBuf>,
}

impl<T> CachedTransport<T> {
    pub fn new(inner: T, dir: Option<PathBuf>) -> Self {
        Self { inner, dir }
    }

    pub fn uncached(inner: T) -> Self {
        Self { inner, dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

/// Per-process sequence for temporary file names.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cache file name for a credential-free request URL.
pub fn cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn cache_err(path: &Path) -> impl FnOnce(std::io::Error) -> CensusError + '_ {
    move |source| CensusError::Cache {
        path: path.to_path_buf(),
        source,
    }
}

impl<T: Transport> Transport for CachedTransport<T> {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<RawResponse> {
        let Some(dir) = &self.dir else {
            return self.inner.get(url, params).await;
        };

        let shown = request_url(url, params)?;
        let path = dir.join(format!("{}.json", cache_key(&shown)));

        match fs::read(&path).await {
            Ok(body) => {
                debug!(url = %shown, "cache hit");
                return Ok(RawResponse {
                    url: shown,
                    status: StatusCode::OK,
                    body,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(url = %shown, "cache miss");
            }
            Err(e) => return Err(cache_err(&path)(e)),
        }

        let resp = self.inner.get(url, params).await?;
        if resp.status.is_success() {
            fs::create_dir_all(dir).await.map_err(cache_err(dir))?;
            // write then rename so readers never see a partial body; each
            // writer owns its tmp file, so identical requests can overlap
            let tmp = dir.join(format!(
                "{}.{}-{}.tmp",
                cache_key(&shown),
                std::process::id(),
                TMP_SEQ.fetch_add(1, Ordering::Relaxed)
            ));
            fs::write(&tmp, &resp.body).await.map_err(cache_err(&tmp))?;
            if let Err(e) = fs::rename(&tmp, &path).await {
                // another writer may have stored the same body first
                if !fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(cache_err(&path)(e));
                }
                let _ = fs::remove_file(&tmp).await;
                debug!(url = %shown, "entry already cached");
            } else {
                debug!(url = %shown, path = %path.display(), "cached response");
            }
        }
        Ok(resp)
    }
}
