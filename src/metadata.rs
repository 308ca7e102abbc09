// src/metadata.rs

use futures::future::try_join_all;
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, instrument};

use crate::client::Census;
use crate::error::{CensusError, Result};
use crate::fetch::Transport;
use crate::frame::stack_years;
use crate::query::variables_endpoint;
use crate::reshape::{CONCEPT, LABEL, VARIABLE, YEAR};

/// Separator between levels of a variable's label.
pub const LABEL_DELIMITER: &str = "!!";

#[derive(Debug, Deserialize)]
struct Catalog {
    variables: Option<BTreeMap<String, CatalogEntry>>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    concept: Option<String>,
    /// Present on predicates such as `for`/`in`/`ucgid`, which are not data.
    #[serde(rename = "predicateOnly", default)]
    predicate_only: Option<Value>,
}

/// Parse one `variables.json` into `(year, variable, concept, label)`,
/// sorted by variable, with predicate-only entries removed and labels
/// split into their hierarchy.
pub fn parse_catalog(url: &str, year: u16, body: &[u8]) -> Result<DataFrame> {
    let catalog: Catalog =
        serde_json::from_slice(body).map_err(|e| CensusError::MalformedResponse {
            url: url.to_string(),
            reason: format!("invalid variable catalog: {e}"),
        })?;
    let entries = catalog
        .variables
        .ok_or_else(|| CensusError::MalformedResponse {
            url: url.to_string(),
            reason: "missing 'variables' key".to_string(),
        })?;

    let mut variables = Vec::with_capacity(entries.len());
    let mut concepts = Vec::with_capacity(entries.len());
    let mut labels = Vec::with_capacity(entries.len());

    // BTreeMap iteration is already ordered by variable name
    for (name, entry) in entries {
        if entry.predicate_only.is_some() {
            continue;
        }
        variables.push(name);
        concepts.push(entry.concept);
        labels.push(entry.label);
    }

    let frame = DataFrame::new(vec![
        Series::new(VARIABLE.into(), variables).into(),
        Series::new(CONCEPT.into(), concepts).into(),
        Series::new(LABEL.into(), labels).into(),
    ])?;
    let frame = frame
        .lazy()
        .with_columns([
            lit(i32::from(year)).alias(YEAR),
            col(LABEL).str().split(lit(LABEL_DELIMITER)),
        ])
        .select([col(YEAR), col(VARIABLE), col(CONCEPT), col(LABEL)])
        .collect()?;
    Ok(frame)
}

impl<T: Transport> Census<T> {
    /// Variable catalog for every year, concatenated in `years` order.
    ///
    /// No de-duplication across years: a variable published in three
    /// vintages yields three rows.
    #[instrument(level = "info", skip(self))]
    pub async fn get_metadata(&self, dataset: &str, years: &[u16]) -> Result<DataFrame> {
        if years.is_empty() {
            return Err(CensusError::NoYears);
        }
        let per_year = try_join_all(
            years
                .iter()
                .map(|&year| self.metadata_for_year(dataset, year)),
        )
        .await?;

        let frame = stack_years(years.iter().copied().zip(per_year).collect())?;
        info!(rows = frame.height(), "fetched variable metadata");
        Ok(frame)
    }

    async fn metadata_for_year(&self, dataset: &str, year: u16) -> Result<DataFrame> {
        let url = variables_endpoint(year, dataset);
        let body = self.api_req(&url, &[]).await?;
        parse_catalog(&url, year, &body)
    }
}
