// src/query.rs

use std::fmt;

use crate::geography::Geography;

pub const BASE_API_URL: &str = "https://api.census.gov/data";

/// Endpoint for one dataset vintage, e.g. `.../data/2019/acs/acs5`.
pub fn endpoint(year: u16, dataset: &str) -> String {
    format!("{BASE_API_URL}/{year}/{dataset}")
}

/// Variable catalog for one dataset vintage.
pub fn variables_endpoint(year: u16, dataset: &str) -> String {
    format!("{}/variables.json", endpoint(year, dataset))
}

/// A requested variable: an exact column name, or every column whose name
/// starts with a table prefix (`group(B01001)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableSpec {
    Exact(String),
    GroupPrefix(String),
}

impl VariableSpec {
    pub fn parse(raw: &str) -> Self {
        match raw
            .strip_prefix("group(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(prefix) => VariableSpec::GroupPrefix(prefix.to_string()),
            None => VariableSpec::Exact(raw.to_string()),
        }
    }

    /// Whether a response column belongs to this request.
    pub fn matches(&self, column: &str) -> bool {
        match self {
            VariableSpec::Exact(name) => column == name,
            VariableSpec::GroupPrefix(prefix) => column.starts_with(prefix.as_str()),
        }
    }
}

impl From<&str> for VariableSpec {
    fn from(raw: &str) -> Self {
        VariableSpec::parse(raw)
    }
}

impl From<String> for VariableSpec {
    fn from(raw: String) -> Self {
        VariableSpec::parse(&raw)
    }
}

/// The wire form: groups go out unexpanded, the API expands them.
impl fmt::Display for VariableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableSpec::Exact(name) => f.write_str(name),
            VariableSpec::GroupPrefix(prefix) => write!(f, "group({prefix})"),
        }
    }
}

/// True when any requested variable claims `column`.
pub fn matches_any(specs: &[VariableSpec], column: &str) -> bool {
    specs.iter().any(|spec| spec.matches(column))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// `get=<vars>&for=<geography>:*` against the dataset's year endpoint.
pub fn build_query(
    dataset: &str,
    year: u16,
    variables: &[VariableSpec],
    geography: Geography,
) -> Query {
    let get = variables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    Query {
        url: endpoint(year, dataset),
        params: vec![
            ("get".to_string(), get),
            ("for".to_string(), format!("{geography}:*")),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_wildcards_once() {
        assert_eq!(
            VariableSpec::parse("group(B01001)"),
            VariableSpec::GroupPrefix("B01001".into())
        );
        assert_eq!(
            VariableSpec::parse("B01001_001E"),
            VariableSpec::Exact("B01001_001E".into())
        );
        // not closed, so not a group
        assert_eq!(
            VariableSpec::parse("group(B01001"),
            VariableSpec::Exact("group(B01001".into())
        );
    }

    #[test]
    fn matching_is_exact_or_prefix() {
        let specs = vec![
            VariableSpec::from("NAME"),
            VariableSpec::from("group(B19013)"),
        ];
        assert!(matches_any(&specs, "NAME"));
        assert!(matches_any(&specs, "B19013_001E"));
        assert!(matches_any(&specs, "B19013A_001E"));
        assert!(!matches_any(&specs, "NAME2"));
        assert!(!matches_any(&specs, "state"));
    }

    #[test]
    fn builds_year_specific_query() {
        let q = build_query(
            "acs/acs5",
            2019,
            &["B01001_001E".into(), "group(B19013)".into()],
            Geography::BlockGroup,
        );
        assert_eq!(q.url, "https://api.census.gov/data/2019/acs/acs5");
        assert_eq!(
            q.params,
            vec![
                ("get".to_string(), "B01001_001E,group(B19013)".to_string()),
                ("for".to_string(), "block group:*".to_string()),
            ]
        );
    }

    #[test]
    fn empty_variable_list_still_builds() {
        let q = build_query("acs/acs5", 2019, &[], Geography::State);
        assert_eq!(q.params[0], ("get".to_string(), String::new()));
        assert_eq!(q.params[1], ("for".to_string(), "state:*".to_string()));
    }

    #[test]
    fn catalog_endpoint() {
        assert_eq!(
            variables_endpoint(2020, "dec/sf3"),
            "https://api.census.gov/data/2020/dec/sf3/variables.json"
        );
    }
}
