// src/acs.rs

//! American Community Survey pairing: every ACS variable is published as
//! an estimate (`...E`) and a 90% margin of error (`...M`). This stage puts
//! both on one row and converts the margin into a standard error.

use polars::prelude::*;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};
use tracing::{info, instrument};

use crate::client::Census;
use crate::error::{CensusError, Result};
use crate::fetch::Transport;
use crate::frame::{first_duplicate, join_many_to_one, strings};
use crate::geography::Geography;
use crate::query::VariableSpec;
use crate::reshape::{arrange_columns, sort_long, SE, VALUE, VARIABLE, YEAR};

/// z-score of the API's 90% margins of error.
pub const MOE_Z_SCORE: f64 = 1.645;

/// First year before any ACS sampling window ends.
const ACS_EPOCH: u16 = 2004;

const ESTIMATE: &str = "E";
const MARGIN: &str = "M";
const KIND: &str = "type";
const ESTIMATE_KEY: &str = "_estimate";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AcsVersion {
    Acs1,
    Acs3,
    #[default]
    Acs5,
}

impl AcsVersion {
    /// Length of the sampling window in years.
    pub fn span(self) -> u16 {
        match self {
            AcsVersion::Acs1 => 1,
            AcsVersion::Acs3 => 3,
            AcsVersion::Acs5 => 5,
        }
    }

    pub fn dataset(self) -> String {
        format!("acs/{self}")
    }

    /// Every vintage from the first complete window through `most_recent`.
    pub fn default_years(self, most_recent: u16) -> Vec<u16> {
        (ACS_EPOCH + self.span()..=most_recent).collect()
    }
}

impl fmt::Display for AcsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acs{}", self.span())
    }
}

impl FromStr for AcsVersion {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acs1" => Ok(AcsVersion::Acs1),
            "acs3" => Ok(AcsVersion::Acs3),
            "acs5" => Ok(AcsVersion::Acs5),
            _ => Err(CensusError::InvalidArgument {
                kind: "ACS version",
                value: s.to_string(),
            }),
        }
    }
}

/// `B01001_001E` / `B01001_001M` / `B01001_001` → `B01001_001`.
pub fn base_name(variable: &str) -> &str {
    variable.trim_end_matches(['E', 'M'])
}

/// Trailing `E` or `M`, if any.
fn suffix(variable: &str) -> Option<&'static str> {
    match variable.chars().last() {
        Some('E') => Some(ESTIMATE),
        Some('M') => Some(MARGIN),
        _ => None,
    }
}

/// Suffixed names to request: the estimate for every distinct base name,
/// plus the margin when standard errors are wanted.
pub fn request_variables<S: AsRef<str>>(variables: &[S], include_se: bool) -> Vec<VariableSpec> {
    let bases: BTreeSet<&str> = variables.iter().map(|v| base_name(v.as_ref())).collect();

    let mut requested: Vec<VariableSpec> = bases
        .iter()
        .map(|b| VariableSpec::Exact(format!("{b}{ESTIMATE}")))
        .collect();
    if include_se {
        requested.extend(
            bases
                .iter()
                .map(|b| VariableSpec::Exact(format!("{b}{MARGIN}"))),
        );
    }
    requested
}

/// Turn sorted long rows keyed by suffixed names into one row per
/// `(year, geography, base variable)` with `value` and, optionally, `se`.
///
/// A repeated `(year, geography, variable)` fails with
/// [`CensusError::DuplicatePivotEntry`].
pub fn pair_estimates(long: &DataFrame, geography: Geography, include_se: bool) -> Result<DataFrame> {
    let geo = geography.as_str();
    let names = strings(long, VARIABLE)?;
    let bases: Vec<Option<&str>> = names.iter().map(|v| v.as_deref().map(base_name)).collect();
    let kinds: Vec<Option<&str>> = names.iter().map(|v| v.as_deref().and_then(suffix)).collect();

    let mut tagged = long.clone();
    tagged.with_column(Series::new(VARIABLE.into(), bases))?;
    tagged.with_column(Series::new(KIND.into(), kinds))?;

    if let Some(key) = first_duplicate(&tagged, &[YEAR, geo, VARIABLE, KIND])? {
        return Err(CensusError::DuplicatePivotEntry { key });
    }

    let pick = |kind: &str| {
        col(VALUE)
            .filter(col(KIND).eq(lit(kind)))
            .first()
            .cast(DataType::Float32)
    };
    let paired = tagged
        .lazy()
        .group_by_stable([col(YEAR), col(geo), col(VARIABLE)])
        .agg([pick(ESTIMATE).alias(VALUE), pick(MARGIN).alias(MARGIN)]);

    let mut columns = vec![col(YEAR), col(geo), col(VARIABLE), col(VALUE)];
    if include_se {
        let se = (col(MARGIN).cast(DataType::Float64) / lit(MOE_Z_SCORE)).cast(DataType::Float32);
        columns.push(se.alias(SE));
    }
    let paired = paired.select(columns).collect()?;
    sort_long(paired, geography)
}

impl<T: Transport> Census<T> {
    /// ACS estimates with paired standard errors.
    ///
    /// `variables` may carry `E`/`M` suffixes or none; they are reduced to
    /// base names. Without `years`, every vintage of `version` through the
    /// configured most recent year is requested.
    #[instrument(level = "info", skip(self, variables, geography), fields(geography = %geography))]
    pub async fn acs<S: AsRef<str>>(
        &self,
        variables: &[S],
        version: AcsVersion,
        geography: Geography,
        years: Option<&[u16]>,
        include_se: bool,
        include_metadata: bool,
    ) -> Result<DataFrame> {
        let dataset = version.dataset();
        let years = match years {
            Some(years) if !years.is_empty() => years.to_vec(),
            _ => version.default_years(self.most_recent_acs_year()),
        };
        let requested = request_variables(variables, include_se);
        let no_filter = BTreeMap::new();

        let estimates = self.get_variables(
            &dataset,
            &years,
            &requested,
            geography,
            &no_filter,
            false,
        );

        let (long, metadata) = if include_metadata {
            let (long, metadata) =
                futures::try_join!(estimates, self.get_metadata(&dataset, &years))?;
            (long, Some(metadata))
        } else {
            (estimates.await?, None)
        };

        let paired = pair_estimates(&long, geography, include_se)?;
        info!(rows = paired.height(), "paired estimates and margins");

        let Some(metadata) = metadata else {
            return arrange_columns(&paired);
        };

        // catalog rows are keyed by the estimate's suffixed name
        let keyed = paired
            .lazy()
            .with_column(concat_str([col(VARIABLE), lit(ESTIMATE)], "", false).alias(ESTIMATE_KEY))
            .collect()?;
        let joined = join_many_to_one(keyed, metadata, &[YEAR, ESTIMATE_KEY], &[YEAR, VARIABLE])?;
        arrange_columns(&sort_long(joined, geography)?)
    }
}
