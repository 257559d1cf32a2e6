use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChartResult;

use super::{ChartType, PeriodIndex};

/// Raw values of one country and age group, aligned to `labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountrySeries {
    pub iso3c: String,
    pub age_group: String,
    pub labels: Vec<String>,
    /// Field key (`deaths`, `asmr_who`, ...) to values aligned with `labels`.
    #[serde(default)]
    pub fields: IndexMap<String, Vec<Option<f64>>>,
}

impl CountrySeries {
    #[must_use]
    pub fn new<S: Into<String>>(
        iso3c: impl Into<String>,
        age_group: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            iso3c: iso3c.into(),
            age_group: age_group.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.fields.insert(key.into(), values);
        self
    }

    #[must_use]
    pub fn value(&self, key: &str, position: usize) -> Option<f64> {
        self.fields.get(key)?.get(position).copied().flatten()
    }

    /// Labels at which `key` has a value.
    pub fn labels_with(&self, key: &str) -> impl Iterator<Item = &str> + '_ {
        let key = key.to_owned();
        self.labels
            .iter()
            .enumerate()
            .filter(move |(position, _)| self.value(&key, *position).is_some())
            .map(|(_, label)| label.as_str())
    }
}

/// Per age group, per country raw dataset as returned by the data service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    series: IndexMap<String, IndexMap<String, CountrySeries>>,
}

impl Dataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the series for its country and age group.
    pub fn insert(&mut self, series: CountrySeries) {
        self.series
            .entry(series.age_group.clone())
            .or_default()
            .insert(series.iso3c.clone(), series);
    }

    #[must_use]
    pub fn with_series(mut self, series: CountrySeries) -> Self {
        self.insert(series);
        self
    }

    #[must_use]
    pub fn get(&self, age_group: &str, iso3c: &str) -> Option<&CountrySeries> {
        self.series.get(age_group)?.get(iso3c)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountrySeries> + '_ {
        self.series.values().flat_map(IndexMap::values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.values().map(IndexMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Label sequence available for a selection.
///
/// A label counts when `data_key` has a value for at least one selected
/// country and age group, so metric availability per country shapes the
/// result. Moving-average granularities drop the first `window - 1` labels
/// because a trailing average needs a complete window.
pub fn derive_labels(
    dataset: &Dataset,
    chart_type: ChartType,
    countries: &[String],
    age_groups: &[String],
    data_key: &str,
) -> ChartResult<PeriodIndex> {
    let mut labels = IndexSet::new();
    for age_group in age_groups {
        for iso3c in countries {
            if let Some(series) = dataset.get(age_group, iso3c) {
                labels.extend(series.labels_with(data_key).map(str::to_owned));
            }
        }
    }

    let index = PeriodIndex::new(chart_type, labels)?;
    let index = match chart_type.moving_average_window() {
        Some(window) => index.skip_leading(window.saturating_sub(1)),
        None => index,
    };
    debug!(
        chart_type = %chart_type,
        data_key,
        countries = countries.len(),
        age_groups = age_groups.len(),
        labels = index.len(),
        "derived label sequence"
    );
    Ok(index)
}
