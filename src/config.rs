// src/config.rs

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

/// Environment variable consulted when no key is passed explicitly.
pub const API_KEY_ENV: &str = "CENSUS_API_KEY";

/// Latest ACS vintage published by the API. Overridable through
/// [`CensusConfig::most_recent_acs_year`].
pub const MOST_RECENT_ACS_YEAR: u16 = 2023;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Explicit API key; falls back to `CENSUS_API_KEY`.
    pub api_key: Option<String>,
    /// Response cache directory; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Per-request timeout handed to the HTTP client.
    pub timeout_secs: Option<u64>,
    /// Last year of the default ACS year range.
    pub most_recent_acs_year: u16,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cache_dir: default_cache_dir(),
            timeout_secs: None,
            most_recent_acs_year: MOST_RECENT_ACS_YEAR,
        }
    }
}

impl CensusConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// `<platform cache dir>/tidycensus/http`, when the platform has one.
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tidycensus").map(|dirs| dirs.cache_dir().join("http"))
}

/// Explicit key, then `CENSUS_API_KEY`, then none.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    resolve_api_key_with(explicit, |name| env::var(name).ok())
}

pub(crate) fn resolve_api_key_with<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let key = explicit
        .map(str::to_string)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()));

    if key.is_none() {
        warn!(
            "Unable to find Census API key in the environment ({}); requests will be unauthenticated",
            API_KEY_ENV
        );
    }
    key
}
