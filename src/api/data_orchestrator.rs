//! Dataset fetch, label derivation, baseline repair and aggregation.
//!
//! One [`DataOrchestrator::update`] runs three phases in order:
//!
//! 1. fetch the raw dataset and derive its label sequence,
//! 2. repair the requested baseline against those labels,
//! 3. compute the start offset and call the aggregation.
//!
//! Calls do not queue: a call made while another is in flight returns
//! [`UpdateOutcome::Busy`] so the caller can schedule a fresh one with
//! current state once the first settles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::core::{ChartType, Dataset, DateRange, PeriodIndex, derive_labels};
use crate::error::ChartResult;

use super::{
    AggregationRequest, BaselineDefaultPolicy, BaselineMethod, ChartPredicates, DatasetFetcher,
    LoadingIndicator, ProgressCallback, ProgressState, ResolvedState, SeriesAggregator,
    SeriesBundle, StandardBaselinePolicy, View, resolve_baseline_range,
};

/// Baseline parameters of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineRequest {
    pub method: BaselineMethod,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Inputs of one update, captured from a resolved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub view: View,
    pub chart_type: ChartType,
    pub countries: Vec<String>,
    pub age_groups: Vec<String>,
    pub data_key: String,
    pub cumulative: bool,
    pub slider_start: Option<String>,
    pub baseline: Option<BaselineRequest>,
    pub extra_keys: Vec<String>,
    pub asmr_requested: bool,
}

impl FetchRequest {
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedState) -> Self {
        let predicates = ChartPredicates::of(resolved);
        let state = resolved.state();
        let baseline = predicates.has_baseline().then(|| BaselineRequest {
            method: state.baseline_method,
            from: state.baseline_from.clone(),
            to: state.baseline_to.clone(),
        });
        Self {
            view: resolved.view(),
            chart_type: state.chart_type,
            countries: state.countries.clone(),
            age_groups: state.age_groups.clone(),
            data_key: predicates.data_key(),
            cumulative: state.cumulative,
            slider_start: state.slider_start.clone(),
            baseline,
            extra_keys: predicates.extra_keys(),
            asmr_requested: predicates.is_asmr(),
        }
    }
}

/// Output of a completed update.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub request: FetchRequest,
    pub dataset: Arc<Dataset>,
    pub labels: Arc<PeriodIndex>,
    pub start_index: usize,
    /// Repaired baseline the series were aggregated with.
    pub baseline: Option<DateRange>,
    pub series: SeriesBundle,
}

/// Outcome of an update call.
#[derive(Debug)]
pub enum UpdateOutcome<T = Box<FetchResult>> {
    Ready(T),
    /// The selection has no labels; `asmr_requested` picks the message.
    NoData { asmr_requested: bool },
    /// Another update was in flight; this call did nothing.
    Busy,
}

impl<T> UpdateOutcome<T> {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    #[must_use]
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::NoData { .. } | Self::Busy => None,
        }
    }
}

/// Per-call options.
#[derive(Clone, Default)]
pub struct UpdateOptions {
    /// Replaces the default progress state for this call.
    pub progress: Option<ProgressCallback>,
}

impl UpdateOptions {
    #[must_use]
    pub fn with_progress(progress: ProgressCallback) -> Self {
        Self {
            progress: Some(progress),
        }
    }
}

/// Baseline-free first result plus the deferred baseline pass.
#[derive(Debug)]
pub struct ProgressiveFetch {
    pub initial: FetchResult,
    /// `None` when the request carries no baseline.
    pub injector: Option<BaselineInjector>,
}

/// Repeats the aggregation with the real baseline parameters over the
/// dataset and labels of the initial pass.
pub struct BaselineInjector {
    aggregator: Arc<dyn SeriesAggregator>,
    origin: FetchRequest,
    request: AggregationRequest,
    progress: ProgressCallback,
}

impl BaselineInjector {
    #[must_use]
    pub fn request(&self) -> &AggregationRequest {
        &self.request
    }

    /// Update request whose initial pass produced this injector.
    #[must_use]
    pub fn origin(&self) -> &FetchRequest {
        &self.origin
    }

    /// Replacement series including baselines.
    pub async fn inject_baselines(&self) -> ChartResult<SeriesBundle> {
        debug!(
            data_key = %self.request.data_key,
            baseline_from = ?self.request.baseline_from,
            baseline_to = ?self.request.baseline_to,
            "injecting baselines"
        );
        self.aggregator
            .aggregate(self.request.clone(), Arc::clone(&self.progress))
            .await
    }
}

impl std::fmt::Debug for BaselineInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaselineInjector")
            .field("origin", &self.origin)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

struct Prepared {
    dataset: Arc<Dataset>,
    labels: Arc<PeriodIndex>,
    start_index: usize,
    baseline: Option<DateRange>,
}

impl Prepared {
    fn aggregation_request(&self, request: &FetchRequest) -> AggregationRequest {
        let (baseline_from, baseline_to) = match &self.baseline {
            Some(range) => (Some(range.from.clone()), Some(range.to.clone())),
            None => (None, None),
        };
        let baseline_method = self
            .baseline
            .as_ref()
            .and(request.baseline.as_ref())
            .map(|baseline| baseline.method);
        AggregationRequest {
            data_key: request.data_key.clone(),
            chart_type: request.chart_type,
            dataset: Arc::clone(&self.dataset),
            labels: Arc::clone(&self.labels),
            start_index: self.start_index,
            cumulative: request.cumulative,
            age_groups: request.age_groups.clone(),
            countries: request.countries.clone(),
            baseline_method,
            baseline_from,
            baseline_to,
            extra_keys: if baseline_method.is_some() {
                request.extra_keys.clone()
            } else {
                Vec::new()
            },
        }
    }

    fn into_result(self, request: &FetchRequest, series: SeriesBundle) -> FetchResult {
        FetchResult {
            request: request.clone(),
            dataset: self.dataset,
            labels: self.labels,
            start_index: self.start_index,
            baseline: self.baseline,
            series,
        }
    }
}

/// Releases the in-flight flag on every exit path, including errors.
struct UpdateGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> UpdateGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns the dataset slot and runs updates against the collaborators.
pub struct DataOrchestrator {
    fetcher: Arc<dyn DatasetFetcher>,
    aggregator: Arc<dyn SeriesAggregator>,
    baseline_policy: Arc<dyn BaselineDefaultPolicy>,
    updating: AtomicBool,
    current_dataset: RwLock<Option<Arc<Dataset>>>,
    progress: ProgressState,
    loading: LoadingIndicator,
}

impl DataOrchestrator {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn DatasetFetcher>,
        aggregator: Arc<dyn SeriesAggregator>,
        loading_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            aggregator,
            baseline_policy: Arc::new(StandardBaselinePolicy::default()),
            updating: AtomicBool::new(false),
            current_dataset: RwLock::new(None),
            progress: ProgressState::new(),
            loading: LoadingIndicator::new(loading_delay),
        }
    }

    #[must_use]
    pub fn with_baseline_policy(mut self, policy: Arc<dyn BaselineDefaultPolicy>) -> Self {
        self.baseline_policy = policy;
        self
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Dataset of the latest phase 1. Not meaningful while an update runs.
    #[must_use]
    pub fn current_dataset(&self) -> Option<Arc<Dataset>> {
        self.current_dataset.read().clone()
    }

    pub fn set_current_dataset(&self, dataset: Option<Arc<Dataset>>) {
        *self.current_dataset.write() = dataset;
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Runs all three phases and aggregates with the repaired baseline.
    pub async fn update(
        &self,
        request: &FetchRequest,
        options: UpdateOptions,
    ) -> ChartResult<UpdateOutcome> {
        let Some(_guard) = UpdateGuard::acquire(&self.updating) else {
            debug!(chart_type = %request.chart_type, "update already in flight; dropped");
            return Ok(UpdateOutcome::Busy);
        };
        let _loading = self.loading.begin();

        let Some(prepared) = self.prepare(request).await? else {
            return Ok(UpdateOutcome::NoData {
                asmr_requested: request.asmr_requested,
            });
        };

        let aggregation = prepared.aggregation_request(request);
        debug!(request = ?aggregation, "phase 3: aggregating");
        let series = self
            .aggregator
            .aggregate(aggregation, self.progress_sink(&options))
            .await?;
        trace!(series = series.series.len(), "update complete");
        Ok(UpdateOutcome::Ready(Box::new(
            prepared.into_result(request, series),
        )))
    }

    /// Like [`Self::update`], but aggregates without baselines first and
    /// returns an injector for the baseline pass. Both passes share the
    /// dataset and labels fetched once.
    pub async fn update_progressive(
        &self,
        request: &FetchRequest,
        options: UpdateOptions,
    ) -> ChartResult<UpdateOutcome<ProgressiveFetch>> {
        let Some(_guard) = UpdateGuard::acquire(&self.updating) else {
            debug!(chart_type = %request.chart_type, "update already in flight; dropped");
            return Ok(UpdateOutcome::Busy);
        };
        let _loading = self.loading.begin();

        let Some(prepared) = self.prepare(request).await? else {
            return Ok(UpdateOutcome::NoData {
                asmr_requested: request.asmr_requested,
            });
        };

        let full = prepared.aggregation_request(request);
        let initial_request = full.without_baseline();
        let progress = self.progress_sink(&options);
        debug!(request = ?initial_request, "phase 3: aggregating without baselines");
        let series = self
            .aggregator
            .aggregate(initial_request, Arc::clone(&progress))
            .await?;

        let injector = full.has_baseline().then(|| BaselineInjector {
            aggregator: Arc::clone(&self.aggregator),
            origin: request.clone(),
            request: full,
            progress,
        });
        Ok(UpdateOutcome::Ready(ProgressiveFetch {
            initial: prepared.into_result(request, series),
            injector,
        }))
    }

    /// Phases 1 and 2 plus the start offset; `None` without labels.
    async fn prepare(&self, request: &FetchRequest) -> ChartResult<Option<Prepared>> {
        debug!(
            chart_type = %request.chart_type,
            countries = ?request.countries,
            age_groups = ?request.age_groups,
            "phase 1: fetching dataset"
        );
        let dataset = self
            .fetcher
            .fetch(request.chart_type, &request.countries, &request.age_groups)
            .await?;
        let dataset = Arc::new(dataset);
        self.set_current_dataset(Some(Arc::clone(&dataset)));

        let labels = derive_labels(
            &dataset,
            request.chart_type,
            &request.countries,
            &request.age_groups,
            &request.data_key,
        )?;
        if labels.is_empty() {
            debug!(data_key = %request.data_key, "no labels for selection");
            return Ok(None);
        }

        let baseline = request.baseline.as_ref().and_then(|baseline| {
            resolve_baseline_range(
                self.baseline_policy.as_ref(),
                &labels,
                baseline.method,
                baseline.from.as_deref(),
                baseline.to.as_deref(),
            )
        });
        debug!(
            requested = ?request.baseline,
            resolved = ?baseline,
            "phase 2: baseline validated"
        );

        let start_index = start_index(&labels, request.slider_start.as_deref(), baseline.as_ref())?;
        Ok(Some(Prepared {
            dataset,
            labels: Arc::new(labels),
            start_index,
            baseline,
        }))
    }

    fn progress_sink(&self, options: &UpdateOptions) -> ProgressCallback {
        match &options.progress {
            Some(callback) => Arc::clone(callback),
            None => {
                self.progress.reset();
                self.progress.callback()
            }
        }
    }
}

impl std::fmt::Debug for DataOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOrchestrator")
            .field("updating", &self.is_updating())
            .field("progress", &self.progress.percent())
            .field("loading", &self.loading.is_visible())
            .finish_non_exhaustive()
    }
}

/// First aggregated label: the slider start, moved back to the baseline
/// start when the baseline begins earlier.
fn start_index(
    labels: &PeriodIndex,
    slider_start: Option<&str>,
    baseline: Option<&DateRange>,
) -> ChartResult<usize> {
    let display_start = match slider_start {
        Some(label) => labels.index_of(label)?,
        None => 0,
    };
    let baseline_start = match baseline {
        Some(range) => labels.index_of(&range.from)?,
        None => display_start,
    };
    Ok(display_start.min(baseline_start))
}
