// src/reshape.rs

use futures::future::try_join_all;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::client::Census;
use crate::error::{CensusError, Result};
use crate::fetch::Transport;
use crate::frame::{self, column_names, join_many_to_one, select_present, stack_years};
use crate::geography::{check_dependencies, composite_expr, Geography};
use crate::normalize::{decode_rows, normalize};
use crate::query::{build_query, matches_any, VariableSpec};

pub const YEAR: &str = "year";
pub const VARIABLE: &str = "variable";
pub const VALUE: &str = "value";
pub const CONCEPT: &str = "concept";
pub const LABEL: &str = "label";
pub const SE: &str = "se";

/// Output column order; absent columns are skipped.
pub fn canonical_order() -> Vec<&'static str> {
    let mut order = vec![YEAR];
    order.extend(Geography::ALL.iter().map(|g| g.as_str()));
    order.extend([CONCEPT, LABEL, VARIABLE, VALUE, SE]);
    order
}

pub fn arrange_columns(frame: &DataFrame) -> Result<DataFrame> {
    select_present(frame, &canonical_order())
}

/// Stable sort on `year`, the geography column, then `variable`.
pub(crate) fn sort_long(frame: DataFrame, geography: Geography) -> Result<DataFrame> {
    let sorted = frame
        .lazy()
        .sort_by_exprs(
            [col(YEAR), col(geography.as_str()), col(VARIABLE)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(sorted)
}

impl<T: Transport> Census<T> {
    /// Long table of `(year, <geography>, [concept, label,] variable, value)`
    /// for every requested variable, year and area at `geography`.
    ///
    /// `filter` is accepted for API compatibility but not sent.
    #[instrument(
        level = "info",
        skip(self, variables, geography, filter),
        fields(geography = %geography)
    )]
    pub async fn get_variables(
        &self,
        dataset: &str,
        years: &[u16],
        variables: &[VariableSpec],
        geography: Geography,
        filter: &BTreeMap<Geography, String>,
        include_metadata: bool,
    ) -> Result<DataFrame> {
        if !filter.is_empty() {
            let rendered = filter
                .iter()
                .map(|(geo, value)| format!("{geo}:{value}"))
                .collect::<Vec<_>>()
                .join(" ");
            debug!(filter = %rendered, "geography filter is not applied to the query");
        }

        if !include_metadata {
            let estimates = self
                .fetch_estimates(dataset, years, variables, geography)
                .await?;
            return arrange_columns(&estimates);
        }

        let (estimates, metadata) = futures::try_join!(
            self.fetch_estimates(dataset, years, variables, geography),
            self.get_metadata(dataset, years),
        )?;
        let joined = join_many_to_one(estimates, metadata, &[YEAR, VARIABLE], &[YEAR, VARIABLE])?;
        arrange_columns(&sort_long(joined, geography)?)
    }

    /// Fetch, stack, unpivot, cast and sort; no metadata, no reordering.
    pub(crate) async fn fetch_estimates(
        &self,
        dataset: &str,
        years: &[u16],
        variables: &[VariableSpec],
        geography: Geography,
    ) -> Result<DataFrame> {
        if years.is_empty() {
            return Err(CensusError::NoYears);
        }
        let per_year = try_join_all(
            years
                .iter()
                .map(|&year| self.fetch_year(dataset, year, variables, geography)),
        )
        .await?;
        let wide = stack_years(years.iter().copied().zip(per_year).collect())?;

        let geo = geography.as_str();
        check_dependencies(&wide, geography)?;
        let wide = wide
            .lazy()
            .with_column(composite_expr(geography))
            .collect()?;

        let on: Vec<String> = column_names(&wide)
            .into_iter()
            .filter(|name| name != YEAR && name != geo && matches_any(variables, name))
            .collect();
        debug!(columns = on.len(), "unpivoting value columns");

        let long = frame::unpivot(&wide, &on, &[YEAR, geo], VARIABLE, VALUE)?
            .lazy()
            .with_column(col(VALUE).cast(DataType::Float32))
            .collect()?;
        let long = sort_long(long, geography)?;

        info!(rows = long.height(), years = years.len(), "reshaped estimates");
        Ok(long)
    }

    async fn fetch_year(
        &self,
        dataset: &str,
        year: u16,
        variables: &[VariableSpec],
        geography: Geography,
    ) -> Result<DataFrame> {
        let query = build_query(dataset, year, variables, geography);
        let body = self.api_req(&query.url, &query.params).await?;
        let rows = decode_rows(&query.url, &body)?;
        let mut frame = normalize(&query.url, &rows)?;

        let years = Series::new(YEAR.into(), vec![i32::from(year); frame.height()]);
        frame.with_column(years)?;
        Ok(frame)
    }
}
