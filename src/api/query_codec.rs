//! Query-string form of a resolved state.
//!
//! The query string is the shareable representation of the chart: only
//! user-set fields are written, and a key's presence is exactly what marks a
//! field as user-set when the string is read back.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChartPatch, ChartState, Field, FieldEdit, ResolvedState, View, detect_view};
use crate::core::ChartType;

/// Ordered multimap of decoded query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryParams {
    entries: IndexMap<String, Vec<String>>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query, with or without `?`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .fold(Self::new(), |mut params, (key, value)| {
                params.append(key.into_owned(), value.into_owned());
                params
            })
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.first().map(String::as_str)
    }

    #[must_use]
    pub fn all(&self, key: &str) -> &[String] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

/// Query parameter that could not be turned into a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedParam {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// View and raw user overrides read from a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedQuery {
    pub view: View,
    pub overrides: ChartPatch,
    pub rejected: Vec<RejectedParam>,
}

/// Encodes a boolean field: `1` for true; false is omitted unless the field
/// defaults to true, where it must be spelled `0`.
#[must_use]
pub fn encode_flag(value: bool, default: bool) -> Option<&'static str> {
    match (value, default) {
        (true, _) => Some("1"),
        (false, true) => Some("0"),
        (false, false) => None,
    }
}

/// Inverse of [`encode_flag`]; `None` for absent or malformed values.
#[must_use]
pub fn decode_flag(value: Option<&str>) -> Option<bool> {
    match value? {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Reads the active view and every recognised field from `query`.
///
/// Malformed values are rejected instead of becoming overrides, so the field
/// falls back to its default. Period labels are taken verbatim; their format
/// is checked against the granularity during state validation.
#[must_use]
pub fn decode_query(query: &QueryParams) -> DecodedQuery {
    let mut decoded = DecodedQuery {
        view: detect_view(query),
        ..DecodedQuery::default()
    };

    for field in Field::ALL {
        let key = field.query_key();
        let values = query.all(key);
        let Some(first) = values.first() else {
            continue;
        };

        match decode_field(field, values) {
            Ok(edit) => decoded.overrides.set(edit),
            Err(reason) => {
                warn!(key, value = %first, %reason, "rejected query parameter");
                decoded.rejected.push(RejectedParam {
                    key: key.to_owned(),
                    value: first.clone(),
                    reason,
                });
            }
        }
    }
    decoded
}

fn decode_field(field: Field, values: &[String]) -> Result<FieldEdit, String> {
    let first = values.first().map(String::as_str).unwrap_or_default();
    if field.is_boolean() {
        let value = decode_flag(Some(first)).ok_or_else(|| "expected `1` or `0`".to_owned())?;
        return FieldEdit::flag(field, value).ok_or_else(|| "not a boolean field".to_owned());
    }
    if field.is_period_label() {
        if first.is_empty() {
            return Err("empty period label".to_owned());
        }
        return FieldEdit::period_label(field, Some(first.to_owned()))
            .ok_or_else(|| "not a period field".to_owned());
    }

    let edit = match field {
        Field::Countries | Field::AgeGroups => {
            let list: Vec<String> = values
                .iter()
                .filter(|value| !value.is_empty())
                .cloned()
                .collect();
            if list.is_empty() {
                return Err("empty list".to_owned());
            }
            if field == Field::Countries {
                FieldEdit::Countries(list)
            } else {
                FieldEdit::AgeGroups(list)
            }
        }
        Field::ChartType => FieldEdit::ChartType(parse_code::<ChartType>(first)?),
        Field::Metric => FieldEdit::Metric(parse_code(first)?),
        Field::StandardPopulation => FieldEdit::StandardPopulation(parse_code(first)?),
        Field::ChartStyle => FieldEdit::ChartStyle(parse_code(first)?),
        Field::BaselineMethod => FieldEdit::BaselineMethod(parse_code(first)?),
        other => return Err(format!("unsupported field `{other}`")),
    };
    Ok(edit)
}

fn parse_code<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: ToString,
{
    value.parse::<T>().map_err(|err| err.to_string())
}

/// Writes the view marker and every user-set field of `resolved`.
///
/// Values come from the effective (constrained) state so the string always
/// shows what the chart shows; `view_defaults` decides when a false boolean
/// needs an explicit `0`.
#[must_use]
pub fn encode_state(resolved: &ResolvedState, view_defaults: &ChartState) -> QueryParams {
    let mut params = QueryParams::new();
    if let Some(marker) = resolved.view().marker_key() {
        params.append(marker, "1");
    }

    let state = resolved.state();
    for field in resolved.user_overrides() {
        let key = field.query_key();
        if let Some(value) = state.flag(field) {
            let default = view_defaults.flag(field).unwrap_or(false);
            if let Some(encoded) = encode_flag(value, default) {
                params.append(key, encoded);
            }
            continue;
        }
        if field.is_period_label() {
            if let Some(label) = state.period_label(field) {
                params.append(key, label);
            }
            continue;
        }

        match field {
            Field::Countries => state
                .countries
                .iter()
                .for_each(|country| params.append(key, country.as_str())),
            Field::AgeGroups => state
                .age_groups
                .iter()
                .for_each(|age_group| params.append(key, age_group.as_str())),
            Field::ChartType => params.append(key, state.chart_type.as_str()),
            Field::Metric => params.append(key, state.metric.as_str()),
            Field::StandardPopulation => params.append(key, state.standard_population.as_str()),
            Field::ChartStyle => params.append(key, state.chart_style.as_str()),
            Field::BaselineMethod => params.append(key, state.baseline_method.as_str()),
            _ => {}
        }
    }
    params
}
