use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::debug;

use crate::core::{AccessPolicy, DateRange, FullAccess, LabelBounds, PeriodIndex, RangeCalculator};
use crate::error::ChartResult;

use super::{
    BaselineDefaultPolicy, BaselineInjector, ChartState, DataOrchestrator, DatasetFetcher,
    FetchRequest, FetchResult, FieldEdit, IssueReporter, QueryParams, RefetchDispatcher,
    ResolvedState, SeriesAggregator, SessionConfig, StateChange, StateIssue, StateStore,
    UpdateOptions, UpdateOutcome, UpdatePlan, View, ViewStateMachine, auto_fix_edits,
    no_data_message, validate_state,
};

/// Result of a session refresh.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The result matched the current state and was committed.
    Applied(Arc<FetchResult>),
    NoData { message: &'static str },
    /// Another refresh was in flight.
    Busy,
    /// The state changed while fetching; the result was discarded.
    Stale,
}

impl RefreshOutcome {
    #[must_use]
    pub fn applied(&self) -> Option<&Arc<FetchResult>> {
        match self {
            Self::Applied(result) => Some(result),
            Self::NoData { .. } | Self::Busy | Self::Stale => None,
        }
    }
}

/// Baseline-free refresh result plus the deferred baseline pass.
#[derive(Debug)]
pub struct ProgressiveRefresh {
    pub outcome: RefreshOutcome,
    pub injector: Option<BaselineInjector>,
}

/// Stateful facade over resolution, storage and data orchestration.
pub struct ChartSession {
    config: SessionConfig,
    machine: ViewStateMachine,
    store: StateStore,
    orchestrator: DataOrchestrator,
    access: Arc<dyn AccessPolicy>,
    dispatcher: Mutex<RefetchDispatcher>,
    reporter: Mutex<IssueReporter>,
    labels: RwLock<Arc<PeriodIndex>>,
    latest: RwLock<Option<Arc<FetchResult>>>,
}

impl ChartSession {
    pub fn new(
        config: SessionConfig,
        fetcher: Arc<dyn DatasetFetcher>,
        aggregator: Arc<dyn SeriesAggregator>,
    ) -> ChartResult<Self> {
        let config = config.validate()?;
        let machine = ViewStateMachine::new(&config);
        let initial = machine.resolve(View::default(), Default::default());
        let labels = PeriodIndex::empty(initial.state().chart_type);
        let orchestrator =
            DataOrchestrator::new(fetcher, aggregator, config.loading_indicator_delay());

        Ok(Self {
            config,
            machine,
            store: StateStore::new(initial),
            orchestrator,
            access: Arc::new(FullAccess),
            dispatcher: Mutex::new(RefetchDispatcher::new()),
            reporter: Mutex::new(IssueReporter::new()),
            labels: RwLock::new(Arc::new(labels)),
            latest: RwLock::new(None),
        })
    }

    /// Session whose state is read from `query`. Rejected parameters are
    /// logged and recorded; use [`Self::load_query`] to receive them.
    pub fn from_query(
        config: SessionConfig,
        query: &str,
        fetcher: Arc<dyn DatasetFetcher>,
        aggregator: Arc<dyn SeriesAggregator>,
    ) -> ChartResult<Self> {
        let session = Self::new(config, fetcher, aggregator)?;
        session.load_query(query);
        Ok(session)
    }

    #[must_use]
    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_baseline_policy(mut self, policy: Arc<dyn BaselineDefaultPolicy>) -> Self {
        self.orchestrator = self.orchestrator.with_baseline_policy(policy);
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn machine(&self) -> &ViewStateMachine {
        &self.machine
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use]
    pub fn orchestrator(&self) -> &DataOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn resolved(&self) -> ResolvedState {
        self.store.snapshot()
    }

    #[must_use]
    pub fn state(&self) -> ChartState {
        self.store.state()
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.store.view()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Replaces the whole state with the one `query` describes. Returns the
    /// change and one issue per rejected parameter not reported before.
    pub fn load_query(&self, query: &str) -> (StateChange, Vec<StateIssue>) {
        let (resolved, rejected) = self.machine.resolve_initial(&QueryParams::parse(query));
        let issues: Vec<StateIssue> = rejected
            .iter()
            .filter_map(StateIssue::from_rejected)
            .collect();
        let fresh = self
            .reporter
            .lock()
            .report(&issues)
            .into_iter()
            .cloned()
            .collect();
        (self.commit(resolved), fresh)
    }

    pub fn edit(&self, edit: FieldEdit) -> StateChange {
        let next = self.machine.apply_edit(&self.store.snapshot(), edit);
        self.commit(next)
    }

    pub fn edit_all(&self, edits: impl IntoIterator<Item = FieldEdit>) -> StateChange {
        let next = self.machine.apply_edits(&self.store.snapshot(), edits);
        self.commit(next)
    }

    pub fn switch_view(&self, view: View) -> StateChange {
        let next = self.machine.switch_view(&self.store.snapshot(), view);
        self.commit(next)
    }

    /// Shareable query string of the current state.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.machine.encode(&self.store.snapshot()).to_query_string()
    }

    #[must_use]
    pub fn pending_plan(&self) -> UpdatePlan {
        self.dispatcher.lock().pending()
    }

    pub fn take_pending_plan(&self) -> UpdatePlan {
        self.dispatcher.lock().take_pending()
    }

    /// Labels of the latest applied fetch.
    #[must_use]
    pub fn labels(&self) -> Arc<PeriodIndex> {
        self.labels.read().clone()
    }

    #[must_use]
    pub fn latest_result(&self) -> Option<Arc<FetchResult>> {
        self.latest.read().clone()
    }

    #[must_use]
    pub fn available_range(&self) -> Option<LabelBounds> {
        let labels = self.labels();
        RangeCalculator::with_access(&labels, self.access.as_ref()).available_range()
    }

    #[must_use]
    pub fn visible_labels(&self) -> Vec<String> {
        let labels = self.labels();
        let state = self.store.state();
        self.range_calculator(&labels, &state)
            .visible_labels()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Displayed range; unset dates resolve to the full visible span without
    /// being written into the state.
    #[must_use]
    pub fn selected_range(&self) -> DateRange {
        let labels = self.labels();
        let state = self.store.state();
        self.range_calculator(&labels, &state).selected_range()
    }

    /// Fetches and aggregates for the current state. The pending plan is
    /// restored when the refresh fails, is busy or goes stale.
    pub async fn refresh(&self, options: UpdateOptions) -> ChartResult<RefreshOutcome> {
        let plan = self.take_pending_plan();
        let request = FetchRequest::from_resolved(&self.store.snapshot());
        let outcome = match self.orchestrator.update(&request, options).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.requeue(plan);
                return Err(err);
            }
        };
        let refreshed = match outcome {
            UpdateOutcome::Ready(result) => self.apply_result(*result),
            UpdateOutcome::NoData { asmr_requested } => self.apply_no_data(&request, asmr_requested),
            UpdateOutcome::Busy => RefreshOutcome::Busy,
        };
        if matches!(refreshed, RefreshOutcome::Busy | RefreshOutcome::Stale) {
            self.requeue(plan);
        }
        Ok(refreshed)
    }

    /// Refresh that commits a baseline-free result first; pass the returned
    /// injector to [`Self::complete_baselines`] afterwards.
    pub async fn refresh_progressive(
        &self,
        options: UpdateOptions,
    ) -> ChartResult<ProgressiveRefresh> {
        let plan = self.take_pending_plan();
        let request = FetchRequest::from_resolved(&self.store.snapshot());
        let outcome = match self.orchestrator.update_progressive(&request, options).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.requeue(plan);
                return Err(err);
            }
        };
        let refreshed = match outcome {
            UpdateOutcome::Ready(fetch) => {
                let outcome = self.apply_result(fetch.initial);
                let injector = fetch.injector.filter(|_| outcome.applied().is_some());
                ProgressiveRefresh { outcome, injector }
            }
            UpdateOutcome::NoData { asmr_requested } => ProgressiveRefresh {
                outcome: self.apply_no_data(&request, asmr_requested),
                injector: None,
            },
            UpdateOutcome::Busy => ProgressiveRefresh {
                outcome: RefreshOutcome::Busy,
                injector: None,
            },
        };
        if matches!(refreshed.outcome, RefreshOutcome::Busy | RefreshOutcome::Stale) {
            self.requeue(plan);
        }
        Ok(refreshed)
    }

    /// Runs the baseline pass and swaps its series into the latest result.
    /// Stale when the latest result no longer comes from the injector's
    /// request, before or after aggregating.
    pub async fn complete_baselines(
        &self,
        injector: BaselineInjector,
    ) -> ChartResult<RefreshOutcome> {
        if self.baseline_target(injector.origin()).is_none() {
            return Ok(RefreshOutcome::Stale);
        }
        let series = injector.inject_baselines().await?;
        let Some(latest) = self.baseline_target(injector.origin()) else {
            return Ok(RefreshOutcome::Stale);
        };
        let mut result = FetchResult::clone(&latest);
        result.series = series;
        let result = Arc::new(result);
        *self.latest.write() = Some(Arc::clone(&result));
        Ok(RefreshOutcome::Applied(result))
    }

    /// Validates the state against the current labels and commits the
    /// deterministic fixes as user overrides, so the query string shows the
    /// corrected values. Returns the issues not reported before.
    pub fn auto_fix(&self) -> Vec<StateIssue> {
        let labels = self.labels();
        let snapshot = self.store.snapshot();
        let state = snapshot.state();
        let range = (!labels.is_empty()).then(|| self.range_calculator(&labels, state));

        let issues = validate_state(state, range.as_ref());
        if issues.is_empty() {
            return Vec::new();
        }
        let fresh: Vec<StateIssue> = self
            .reporter
            .lock()
            .report(&issues)
            .into_iter()
            .cloned()
            .collect();

        let edits = auto_fix_edits(state, range.as_ref());
        if !edits.is_empty() {
            debug!(edits = edits.len(), "committing state fixes");
            let next = self.machine.apply_edits(&snapshot, edits);
            self.commit(next);
        }
        fresh
    }

    fn commit(&self, next: ResolvedState) -> StateChange {
        let change = self.store.apply(next);
        self.dispatcher.lock().on_state_change(&change);
        change
    }

    fn is_current(&self, request: &FetchRequest) -> bool {
        FetchRequest::from_resolved(&self.store.snapshot()) == *request
    }

    fn requeue(&self, plan: UpdatePlan) {
        if plan != UpdatePlan::None {
            self.dispatcher.lock().requeue(plan);
        }
    }

    fn baseline_target(&self, origin: &FetchRequest) -> Option<Arc<FetchResult>> {
        let latest = self.latest_result()?;
        if latest.request != *origin || !self.is_current(origin) {
            debug!("discarding baselines for a superseded request");
            return None;
        }
        Some(latest)
    }

    fn apply_result(&self, result: FetchResult) -> RefreshOutcome {
        if !self.is_current(&result.request) {
            debug!(chart_type = %result.request.chart_type, "discarding stale fetch result");
            return RefreshOutcome::Stale;
        }
        let result = Arc::new(result);
        *self.labels.write() = Arc::clone(&result.labels);
        *self.latest.write() = Some(Arc::clone(&result));
        self.auto_fix();
        RefreshOutcome::Applied(result)
    }

    fn apply_no_data(&self, request: &FetchRequest, asmr_requested: bool) -> RefreshOutcome {
        if !self.is_current(request) {
            return RefreshOutcome::Stale;
        }
        *self.labels.write() = Arc::new(PeriodIndex::empty(request.chart_type));
        *self.latest.write() = None;
        RefreshOutcome::NoData {
            message: no_data_message(asmr_requested),
        }
    }

    fn range_calculator<'a>(
        &self,
        labels: &'a PeriodIndex,
        state: &'a ChartState,
    ) -> RangeCalculator<'a> {
        RangeCalculator::with_access(labels, self.access.as_ref())
            .with_slider_start(state.slider_start.as_deref())
            .with_selection(state.date_from.as_deref(), state.date_to.as_deref())
    }
}

impl std::fmt::Debug for ChartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSession")
            .field("store", &self.store)
            .field("orchestrator", &self.orchestrator)
            .field("labels", &self.labels.read().len())
            .finish_non_exhaustive()
    }
}
