// src/frame.rs

//! Small polars helpers for the shapes the Census API hands back.

use polars::lazy::dsl::concat;
use polars::prelude::*;

use crate::error::{CensusError, Result};

const COUNT: &str = "__count";

/// All-String frame from a header and rectangular rows.
///
/// Callers validate row widths; a short row yields nulls.
pub fn from_text_rows<S: AsRef<str>>(
    header: &[S],
    rows: &[Vec<Option<String>>],
) -> Result<DataFrame> {
    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|row| row.get(i).and_then(|v| v.as_deref()))
                .collect();
            Series::new(name.as_ref().into(), values).into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_index(name).is_some()
}

/// Cells of any column rendered as text; nulls stay `None`.
pub fn strings(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let text = frame.column(name)?.cast(&DataType::String)?;
    Ok(text.str()?.iter().map(|v| v.map(str::to_string)).collect())
}

/// Stack per-year frames in the given order. Every frame must carry the
/// first frame's columns, in the same order.
pub fn stack_years(frames: Vec<(u16, DataFrame)>) -> Result<DataFrame> {
    let mut frames = frames.into_iter();
    let (_, mut stacked) = frames.next().ok_or(CensusError::NoYears)?;
    let expected = column_names(&stacked);

    for (year, frame) in frames {
        let found = column_names(&frame);
        if found != expected {
            return Err(CensusError::SchemaDrift {
                year,
                expected,
                found,
            });
        }
        stacked.vstack_mut(&frame)?;
    }
    Ok(stacked)
}

/// Keep the listed columns that exist, in the listed order.
pub fn select_present(frame: &DataFrame, order: &[&str]) -> Result<DataFrame> {
    let present: Vec<&str> = order
        .iter()
        .copied()
        .filter(|name| has_column(frame, name))
        .collect();
    Ok(frame.select(present)?)
}

/// Wide to long: every `on` column becomes `(variable_name, value_name)`
/// rows against the `index` columns, grouped by source column in `on` order.
pub fn unpivot(
    frame: &DataFrame,
    on: &[String],
    index: &[&str],
    variable_name: &str,
    value_name: &str,
) -> Result<DataFrame> {
    if on.is_empty() {
        let mut columns = index
            .iter()
            .map(|name| Ok(frame.column(name)?.as_materialized_series().clear().into()))
            .collect::<Result<Vec<Column>>>()?;
        columns.push(Series::new_empty(variable_name.into(), &DataType::String).into());
        columns.push(Series::new_empty(value_name.into(), &DataType::String).into());
        return Ok(DataFrame::new(columns)?);
    }

    let parts: Vec<LazyFrame> = on
        .iter()
        .map(|name| {
            let mut exprs: Vec<Expr> = index.iter().map(|i| col(*i)).collect();
            exprs.push(lit(name.as_str()).alias(variable_name));
            exprs.push(col(name.as_str()).alias(value_name));
            frame.clone().lazy().select(exprs)
        })
        .collect();
    Ok(concat(parts, UnionArgs::default())?.collect()?)
}

/// First `keys` tuple that occurs more than once, rendered `a/b/c`.
pub fn first_duplicate(frame: &DataFrame, keys: &[&str]) -> Result<Option<String>> {
    let by: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let repeated = frame
        .clone()
        .lazy()
        .group_by_stable(by)
        .agg([len().alias(COUNT)])
        .filter(col(COUNT).gt(lit(1)))
        .limit(1)
        .collect()?;
    if repeated.height() == 0 {
        return Ok(None);
    }

    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let cell = strings(&repeated, key)?.into_iter().next().flatten();
        parts.push(cell.unwrap_or_else(|| "null".to_string()));
    }
    Ok(Some(parts.join("/")))
}

/// Left join where each left row matches at most one right row. A right
/// side with a repeated key fails with [`CensusError::JoinMultiplicity`]
/// instead of duplicating left rows. Null keys never match.
pub fn join_many_to_one(
    left: DataFrame,
    right: DataFrame,
    left_on: &[&str],
    right_on: &[&str],
) -> Result<DataFrame> {
    if let Some(key) = first_duplicate(&right, right_on)? {
        return Err(CensusError::JoinMultiplicity { key });
    }

    let left_on: Vec<Expr> = left_on.iter().map(|k| col(*k)).collect();
    let right_on: Vec<Expr> = right_on.iter().map(|k| col(*k)).collect();
    let joined = left
        .lazy()
        .join(
            right.lazy(),
            left_on,
            right_on,
            JoinArgs {
                validation: JoinValidation::ManyToOne,
                ..JoinArgs::new(JoinType::Left)
            },
        )
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
pub(crate) fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Option<String>>> {
    rows.iter()
        .map(|row| row.iter().map(|v| Some(v.to_string())).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> DataFrame {
        from_text_rows(
            &["state", "A", "B"],
            &[
                vec![Some("06".to_string()), Some("1".to_string()), None],
                vec![Some("01".to_string()), Some("3".to_string()), Some("4".to_string())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn text_rows_become_string_columns() {
        let frame = wide();
        assert_eq!(column_names(&frame), vec!["state", "A", "B"]);
        assert_eq!(frame.column("A").unwrap().dtype(), &DataType::String);
        assert_eq!(strings(&frame, "B").unwrap(), vec![None, Some("4".to_string())]);
    }

    #[test]
    fn unpivot_groups_rows_by_source_column() {
        let on = vec!["A".to_string(), "B".to_string()];
        let long = unpivot(&wide(), &on, &["state"], "variable", "value").unwrap();

        assert_eq!(column_names(&long), vec!["state", "variable", "value"]);
        assert_eq!(long.height(), 4);
        assert_eq!(
            strings(&long, "variable").unwrap(),
            ["A", "A", "B", "B"].map(|v| Some(v.to_string())).to_vec()
        );
        // nulls survive the reshape
        assert_eq!(strings(&long, "value").unwrap()[2], None);
    }

    #[test]
    fn unpivot_without_columns_is_empty() {
        let long = unpivot(&wide(), &[], &["state"], "variable", "value").unwrap();
        assert_eq!(column_names(&long), vec!["state", "variable", "value"]);
        assert_eq!(long.height(), 0);
    }

    #[test]
    fn stacking_checks_layouts() {
        let a = from_text_rows(&["state", "A"], &text_rows(&[&["06", "1"]])).unwrap();
        let b = from_text_rows(&["state", "A"], &text_rows(&[&["01", "2"]])).unwrap();
        let c = from_text_rows(&["state", "B"], &text_rows(&[&["01", "2"]])).unwrap();

        let stacked = stack_years(vec![(2019, a.clone()), (2020, b)]).unwrap();
        assert_eq!(stacked.height(), 2);

        let err = stack_years(vec![(2019, a), (2020, c)]).unwrap_err();
        assert!(matches!(err, CensusError::SchemaDrift { year: 2020, .. }));
    }

    #[test]
    fn stacking_nothing_asks_for_years() {
        let err = stack_years(Vec::new()).unwrap_err();
        assert!(matches!(err, CensusError::NoYears));
        assert_eq!(err.to_string(), "at least one year is required");
    }

    #[test]
    fn finds_repeated_keys() {
        let frame = from_text_rows(
            &["year", "variable"],
            &text_rows(&[&["2019", "A"], &["2019", "B"], &["2019", "A"]]),
        )
        .unwrap();
        assert_eq!(
            first_duplicate(&frame, &["year", "variable"]).unwrap(),
            Some("2019/A".to_string())
        );
        assert_eq!(first_duplicate(&frame, &["variable", "year"]).unwrap().as_deref(), Some("A/2019"));
        assert_eq!(first_duplicate(&wide(), &["state"]).unwrap(), None);
    }

    #[test]
    fn join_keeps_left_rows_and_rejects_ambiguous_right() {
        let left = from_text_rows(
            &["variable", "value"],
            &text_rows(&[&["A", "1"], &["B", "2"], &["A", "3"], &["C", "4"]]),
        )
        .unwrap();
        let right = from_text_rows(
            &["variable", "concept"],
            &text_rows(&[&["A", "alpha"], &["B", "beta"]]),
        )
        .unwrap();

        let joined = join_many_to_one(left.clone(), right, &["variable"], &["variable"]).unwrap();
        assert_eq!(joined.height(), 4);
        assert!(has_column(&joined, "concept"));

        let ambiguous = from_text_rows(
            &["variable", "concept"],
            &text_rows(&[&["A", "alpha"], &["A", "again"]]),
        )
        .unwrap();
        let err = join_many_to_one(left, ambiguous, &["variable"], &["variable"]).unwrap_err();
        assert!(matches!(err, CensusError::JoinMultiplicity { key } if key == "A"));
    }

    #[test]
    fn select_present_skips_missing() {
        let picked = select_present(&wide(), &["B", "missing", "state"]).unwrap();
        assert_eq!(column_names(&picked), vec!["B", "state"]);
    }
}
