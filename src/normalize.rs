// src/normalize.rs

use polars::prelude::DataFrame;
use serde_json::Value;
use tracing::trace;

use crate::error::{CensusError, Result};
use crate::frame::from_text_rows;

/// Cells of a raw API response; row 0 is the header.
pub type RawRows = Vec<Vec<Option<String>>>;

/// Decode a data response body (a JSON array of arrays) into text cells.
///
/// The API sends strings, but occasionally `null` or bare numbers; those
/// are kept as `None` and as their JSON text respectively.
pub fn decode_rows(url: &str, body: &[u8]) -> Result<RawRows> {
    let rows: Vec<Vec<Value>> =
        serde_json::from_slice(body).map_err(|e| CensusError::MalformedResponse {
            url: url.to_string(),
            reason: format!("expected an array of arrays: {e}"),
        })?;

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => Ok(Some(s)),
                    Value::Null => Ok(None),
                    Value::Number(n) => Ok(Some(n.to_string())),
                    Value::Bool(b) => Ok(Some(b.to_string())),
                    other => Err(CensusError::MalformedResponse {
                        url: url.to_string(),
                        reason: format!("nested value in cell: {other}"),
                    }),
                })
                .collect()
        })
        .collect()
}

/// Turn header + data rows into an all-text frame. No type inference
/// happens here; later stages cast explicitly.
pub fn normalize(url: &str, raw: &[Vec<Option<String>>]) -> Result<DataFrame> {
    let malformed = |reason: String| CensusError::MalformedResponse {
        url: url.to_string(),
        reason,
    };

    let (header, rows) = raw
        .split_first()
        .ok_or_else(|| malformed("response has no header row".to_string()))?;
    if header.is_empty() {
        return Err(malformed("header row is empty".to_string()));
    }

    let header = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            name.clone()
                .ok_or_else(|| malformed(format!("header cell {i} is null")))
        })
        .collect::<Result<Vec<String>>>()?;

    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != header.len())
    {
        return Err(malformed(format!(
            "row {} has {} cells, header has {}",
            i + 1,
            row.len(),
            header.len()
        )));
    }

    trace!(url, columns = header.len(), rows = rows.len(), "normalized response");
    from_text_rows(header.as_slice(), rows)
}
