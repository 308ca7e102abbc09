// tests/common/mod.rs

#![allow(dead_code)]

use polars::prelude::*;
use reqwest::StatusCode;
use std::{collections::HashMap, sync::Mutex};
use tidycensus::{fetch::request_url, Census, CensusConfig, RawResponse, Result, Transport};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const ACS5_2019: &str = "https://api.census.gov/data/2019/acs/acs5";
pub const ACS5_2020: &str = "https://api.census.gov/data/2020/acs/acs5";
pub const ACS5_2019_VARS: &str = "https://api.census.gov/data/2019/acs/acs5/variables.json";
pub const ACS5_2020_VARS: &str = "https://api.census.gov/data/2020/acs/acs5/variables.json";

pub const TEST_KEY: &str = "test-key";

pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tidycensus=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Serves canned bodies by endpoint (query string ignored) and records
/// every request. Unknown endpoints answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, (StatusCode, String)>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, body: &str) -> Self {
        self.routes
            .insert(url.to_string(), (StatusCode::OK, body.to_string()));
        self
    }

    pub fn fail(mut self, url: &str, status: StatusCode) -> Self {
        self.routes
            .insert(url.to_string(), (status, "error: unknown variable".to_string()));
        self
    }

    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }

    /// Parameters of the first request to `url`.
    pub fn params_for(&self, url: &str) -> Vec<(String, String)> {
        self.requests()
            .into_iter()
            .find(|(u, _)| u == url)
            .map(|(_, p)| p)
            .unwrap_or_default()
    }
}

impl Transport for MockTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<RawResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), params.to_vec()));

        let (status, body) = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, String::new()));
        Ok(RawResponse {
            url: request_url(url, params)?,
            status,
            body: body.into_bytes(),
        })
    }
}

pub fn census(transport: MockTransport) -> Census<MockTransport> {
    let config = CensusConfig {
        api_key: Some(TEST_KEY.to_string()),
        cache_dir: None,
        ..CensusConfig::default()
    };
    Census::with_transport(transport, &config)
}

pub fn strings(frame: &DataFrame, name: &str) -> Vec<String> {
    tidycensus::frame::strings(frame, name)
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_else(|| "<null>".to_string()))
        .collect()
}

pub fn floats(frame: &DataFrame, name: &str) -> Vec<Option<f32>> {
    frame
        .column(name)
        .unwrap()
        .as_materialized_series()
        .f32()
        .unwrap()
        .iter()
        .collect()
}

pub fn labels(frame: &DataFrame, row: usize) -> Vec<String> {
    let list = frame
        .column("label")
        .unwrap()
        .as_materialized_series()
        .list()
        .unwrap();
    let parts = list.get_as_series(row).unwrap();
    parts
        .str()
        .unwrap()
        .iter()
        .map(|p| p.unwrap().to_string())
        .collect()
}

pub fn names(frame: &DataFrame) -> Vec<String> {
    tidycensus::frame::column_names(frame)
}

pub const CATALOG_2019: &str = r#"{"variables": {
    "B01001_001E": {"label": "Estimate!!Total", "concept": "SEX BY AGE", "predicateType": "int", "group": "B01001"},
    "B01001_001M": {"label": "Margin of Error!!Total", "concept": "SEX BY AGE", "predicateType": "int", "group": "B01001"},
    "B19013_001E": {"label": "Estimate!!Median household income in the past 12 months (in 2019 inflation-adjusted dollars)", "concept": "MEDIAN HOUSEHOLD INCOME IN THE PAST 12 MONTHS (IN 2019 INFLATION-ADJUSTED DOLLARS)", "group": "B19013"},
    "for": {"label": "Census API FIPS 'for' clause", "concept": "Census API Geography Specification", "predicateType": "fips-for", "group": "N/A", "predicateOnly": true},
    "in": {"label": "Census API FIPS 'in' clause", "concept": "Census API Geography Specification", "predicateType": "fips-in", "group": "N/A", "predicateOnly": true}
}}"#;
