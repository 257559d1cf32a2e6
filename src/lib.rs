//! mortality-chart-state: state resolution and data orchestration for
//! mortality time-series charts.
//!
//! `core` holds the I/O-free period arithmetic (label parsing, ordering,
//! closest-label lookup, visible and selected ranges). `api` holds the
//! stateful side: views with defaults and constraints, the query-string
//! codec, the state store, the fetch/aggregation orchestrator and the
//! [`ChartSession`] facade tying them together.

pub mod api;
pub mod core;
pub mod error;
pub mod telemetry;

pub use api::{ChartSession, ResolvedState, SessionConfig, View, ViewStateMachine};
pub use error::{ChartError, ChartResult};
