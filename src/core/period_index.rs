use std::cmp::Ordering;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::error::{ChartError, ChartResult};

use super::period::{Period, leading_year, year_of};
use super::ChartType;

/// Ordered, deduplicated label sequence of one granularity.
///
/// Built once per data fetch and never mutated afterwards; labels are kept in
/// chronological order (by period start), which for month labels differs from
/// lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodIndex {
    chart_type: ChartType,
    labels: IndexSet<String>,
    ordinals: Vec<i64>,
}

impl PeriodIndex {
    /// Builds an index, sorting chronologically and dropping duplicates.
    ///
    /// Every label must match the granularity's label format.
    pub fn new<I, S>(chart_type: ChartType, labels: I) -> ChartResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let format = chart_type.label_format();
        let season_start = chart_type.season_start_month();
        let mut entries = Vec::new();
        for label in labels {
            let label = label.into();
            let Some(period) = Period::parse_as(&label, format, season_start) else {
                return Err(ChartError::InvalidLabel { label, chart_type });
            };
            entries.push((period.ordinal(), label));
        }

        let original_count = entries.len();
        entries.sort_by_key(|(ordinal, _)| *ordinal);

        let mut index = Self::empty(chart_type);
        for (ordinal, label) in entries {
            if index.labels.insert(label) {
                index.ordinals.push(ordinal);
            }
        }
        trace!(
            chart_type = %chart_type,
            original_count,
            canonical_count = index.len(),
            "built period index"
        );
        Ok(index)
    }

    #[must_use]
    pub fn empty(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            labels: IndexSet::new(),
            ordinals: Vec::new(),
        }
    }

    #[must_use]
    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.labels.get_index(position).map(String::as_str)
    }

    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    /// Exact membership test.
    #[must_use]
    pub fn is_valid(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Exact position of a member label.
    #[must_use]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.get_index_of(label)
    }

    /// Leading four-character year of `label`.
    #[must_use]
    pub fn year_of<'a>(&self, label: &'a str) -> &'a str {
        year_of(label)
    }

    /// Position of `label`, or of the chronologically closest label when it
    /// is not a member. Ties go to the later label.
    pub fn index_of(&self, label: &str) -> ChartResult<usize> {
        if self.is_empty() {
            return Err(ChartError::EmptyIndex);
        }
        if let Some(position) = self.position(label) {
            return Ok(position);
        }

        let Some(target) = self.ordinal_of(label) else {
            debug!(label, "label has no chronological position, using first label");
            return Ok(0);
        };
        Ok(self.closest_to_ordinal(target))
    }

    /// Day number used to order `label` against this index.
    ///
    /// Labels of other formats are accepted; a bare leading year falls back to
    /// January 1st of that year.
    #[must_use]
    pub fn ordinal_of(&self, label: &str) -> Option<i64> {
        if let Some(position) = self.position(label) {
            return self.ordinals.get(position).copied();
        }
        Period::parse(label, self.chart_type.season_start_month())
            .or_else(|| leading_year(label).and_then(Period::year))
            .map(Period::ordinal)
    }

    /// Chronological comparison of two labels under this index's calendar.
    #[must_use]
    pub fn compare(&self, left: &str, right: &str) -> Option<Ordering> {
        Some(self.ordinal_of(left)?.cmp(&self.ordinal_of(right)?))
    }

    /// Index without its first `count` labels.
    #[must_use]
    pub fn skip_leading(&self, count: usize) -> Self {
        Self {
            chart_type: self.chart_type,
            labels: self.labels.iter().skip(count).cloned().collect(),
            ordinals: self.ordinals.iter().skip(count).copied().collect(),
        }
    }

    fn closest_to_ordinal(&self, target: i64) -> usize {
        let after = self.ordinals.partition_point(|ordinal| *ordinal < target);
        if after == 0 {
            return 0;
        }
        if after == self.ordinals.len() {
            return after - 1;
        }

        let distance_before = target - self.ordinals[after - 1];
        let distance_after = self.ordinals[after] - target;
        if distance_after <= distance_before {
            after
        } else {
            after - 1
        }
    }
}
