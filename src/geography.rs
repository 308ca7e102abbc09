// src/geography.rs

use polars::prelude::*;
use std::{fmt, str::FromStr};

use crate::error::{CensusError, Result};
use crate::frame::has_column;

/// Geographic summary levels understood by the API, in declared order.
///
/// The declared order is also the order geography columns appear in a
/// finished table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Geography {
    #[default]
    Us,
    Region,
    Division,
    State,
    County,
    Tract,
    BlockGroup,
}

impl Geography {
    pub const ALL: [Geography; 7] = [
        Geography::Us,
        Geography::Region,
        Geography::Division,
        Geography::State,
        Geography::County,
        Geography::Tract,
        Geography::BlockGroup,
    ];

    /// Name used both in the `for=` predicate and as the response column.
    pub fn as_str(self) -> &'static str {
        match self {
            Geography::Us => "us",
            Geography::Region => "region",
            Geography::Division => "division",
            Geography::State => "state",
            Geography::County => "county",
            Geography::Tract => "tract",
            Geography::BlockGroup => "block group",
        }
    }

    /// Raw identifier columns that, concatenated in order, form the
    /// composite identifier for this level.
    ///
    /// County codes are only unique within a state, and `for=county:*`
    /// back-fills a `state` column, so the state code is prefixed.
    pub fn dependencies(self) -> &'static [Geography] {
        match self {
            Geography::County => &[Geography::State, Geography::County],
            Geography::Us => &[Geography::Us],
            Geography::Region => &[Geography::Region],
            Geography::Division => &[Geography::Division],
            Geography::State => &[Geography::State],
            Geography::Tract => &[Geography::Tract],
            Geography::BlockGroup => &[Geography::BlockGroup],
        }
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Geography {
    type Err = CensusError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['_', '-'], " ").to_ascii_lowercase();
        Geography::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| CensusError::InvalidArgument {
                kind: "geography",
                value: s.to_string(),
            })
    }
}

/// Expression building the composite identifier for `geography` from its
/// dependency columns, named after the level. A null in any part yields null.
pub fn composite_expr(geography: Geography) -> Expr {
    let parts: Vec<Expr> = geography
        .dependencies()
        .iter()
        .map(|dep| col(dep.as_str()))
        .collect();
    let combined = match parts.as_slice() {
        [single] => single.clone(),
        _ => concat_str(parts, "", false),
    };
    combined.alias(geography.as_str())
}

/// Every dependency column of `geography` must be in the response.
pub fn check_dependencies(frame: &DataFrame, geography: Geography) -> Result<()> {
    match geography
        .dependencies()
        .iter()
        .find(|dep| !has_column(frame, dep.as_str()))
    {
        Some(missing) => Err(CensusError::MissingColumn(missing.as_str().to_string())),
        None => Ok(()),
    }
}
