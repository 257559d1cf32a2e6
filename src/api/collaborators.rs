//! Seams to the external data service and aggregation math.
//!
//! Both collaborators are opaque to this crate: the orchestrator only fixes
//! what it passes in and what it expects back.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{ChartType, Dataset, PeriodIndex};
use crate::error::ChartResult;

use super::BaselineMethod;

/// `(done, total)` progress sink handed to the aggregation.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Read-only source of raw per-country series.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; caching is the implementation's
/// concern.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    async fn fetch(
        &self,
        chart_type: ChartType,
        countries: &[String],
        age_groups: &[String],
    ) -> ChartResult<Dataset>;
}

/// Turns a dataset into display series, including baselines.
#[async_trait]
pub trait SeriesAggregator: Send + Sync {
    async fn aggregate(
        &self,
        request: AggregationRequest,
        progress: ProgressCallback,
    ) -> ChartResult<SeriesBundle>;
}

/// Every argument of one aggregation call.
///
/// All fields are always populated; "off" is spelled explicitly (`None` for
/// the baseline parameters, an empty list for extra keys) so both sides agree
/// on the full argument set.
#[derive(Clone)]
pub struct AggregationRequest {
    pub data_key: String,
    pub chart_type: ChartType,
    pub dataset: Arc<Dataset>,
    pub labels: Arc<PeriodIndex>,
    /// Offset of the first aggregated label.
    pub start_index: usize,
    pub cumulative: bool,
    pub age_groups: Vec<String>,
    pub countries: Vec<String>,
    pub baseline_method: Option<BaselineMethod>,
    pub baseline_from: Option<String>,
    pub baseline_to: Option<String>,
    pub extra_keys: Vec<String>,
}

impl AggregationRequest {
    #[must_use]
    pub fn has_baseline(&self) -> bool {
        self.baseline_method.is_some()
    }

    /// Same call with every baseline parameter switched off.
    #[must_use]
    pub fn without_baseline(&self) -> Self {
        Self {
            baseline_method: None,
            baseline_from: None,
            baseline_to: None,
            extra_keys: Vec::new(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for AggregationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationRequest")
            .field("data_key", &self.data_key)
            .field("chart_type", &self.chart_type)
            .field("labels", &self.labels.len())
            .field("start_index", &self.start_index)
            .field("cumulative", &self.cumulative)
            .field("age_groups", &self.age_groups)
            .field("countries", &self.countries)
            .field("baseline_method", &self.baseline_method)
            .field("baseline_from", &self.baseline_from)
            .field("baseline_to", &self.baseline_to)
            .field("extra_keys", &self.extra_keys)
            .finish_non_exhaustive()
    }
}

/// One output column of the aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    pub iso3c: String,
    pub age_group: String,
    pub key: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesBundle {
    pub series: Vec<AggregatedSeries>,
}

impl SeriesBundle {
    #[must_use]
    pub fn new(series: Vec<AggregatedSeries>) -> Self {
        Self { series }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.series.iter().any(|series| series.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.iter().map(|series| series.key.as_str())
    }
}
