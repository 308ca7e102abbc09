//! Tidy tables from the US Census Bureau data API.
//!
//! [`Census`] builds per-year requests, reshapes the API's wide
//! array-of-arrays responses into long `(year, geography, variable, value)`
//! tables and joins in variable metadata. [`Census::acs`] additionally pairs
//! ACS estimates with their margins of error as standard errors.

pub mod acs;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod geography;
pub mod metadata;
pub mod normalize;
pub mod query;
pub mod reshape;

pub use acs::{AcsVersion, MOE_Z_SCORE};
pub use client::Census;
pub use config::{resolve_api_key, CensusConfig, API_KEY_ENV, MOST_RECENT_ACS_YEAR};
pub use error::{CensusError, Result};
pub use fetch::{CachedTransport, HttpTransport, RawResponse, Transport};
pub use geography::Geography;
pub use query::VariableSpec;

/// Dataset identifiers with dedicated support.
pub mod datasets {
    pub const ACS5: &str = "acs/acs5";
    pub const DEC_SF3: &str = "dec/sf3";
    pub const GEOINFO: &str = "geoinfo";
}
