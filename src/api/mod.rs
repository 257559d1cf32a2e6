pub mod baseline_policy;
pub mod collaborators;
pub mod config;
pub mod constraints;
pub mod data_orchestrator;
pub mod fields;
pub mod helpers;
pub mod loading_indicator;
pub mod progress;
pub mod query_codec;
pub mod refetch;
pub mod session;
pub mod state_store;
pub mod validation;
pub mod view_state_machine;
pub mod views;

pub use baseline_policy::{BaselineDefaultPolicy, StandardBaselinePolicy, resolve_baseline_range};
pub use collaborators::{
    AggregatedSeries, AggregationRequest, DatasetFetcher, ProgressCallback, SeriesAggregator,
    SeriesBundle,
};
pub use config::SessionConfig;
pub use constraints::{ConstraintKind, ConstraintReport, apply_constraints};
pub use data_orchestrator::{
    BaselineInjector, BaselineRequest, DataOrchestrator, FetchRequest, FetchResult,
    ProgressiveFetch, UpdateOptions, UpdateOutcome,
};
pub use fields::{
    BaselineMethod, ChartPatch, ChartState, ChartStyle, Field, FieldEdit, Metric,
    StandardPopulation,
};
pub use helpers::{ChartPredicates, no_data_message};
pub use loading_indicator::{LoadingGuard, LoadingIndicator};
pub use progress::{ProgressState, percent_of};
pub use query_codec::{
    DecodedQuery, QueryParams, RejectedParam, decode_flag, decode_query, encode_flag,
    encode_state,
};
pub use refetch::{RefetchDispatcher, UpdatePlan};
pub use session::{ChartSession, ProgressiveRefresh, RefreshOutcome};
pub use state_store::{StateChange, StateStore};
pub use validation::{IssueKind, IssueReporter, StateIssue, auto_fix_edits, validate_state};
pub use view_state_machine::{ResolvedState, ViewStateMachine};
pub use views::{View, ViewDefinition, detect_view};
