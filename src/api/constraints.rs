use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::{ChartState, Field};

/// Cross-field rule enforced by the resolver.
///
/// Each kind is a pure, idempotent fix of exactly one target field. Rules are
/// dispatched by kind rather than by matching validation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    ExcessRequiresBaseline,
    ZscoreRequiresBaseline,
    ZscoreDisablesLogarithmic,
    PercentageRequiresExcess,
    CumulativeRequiresExcess,
    PredictionIntervalRequiresBaseline,
}

impl ConstraintKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExcessRequiresBaseline => "excess-requires-baseline",
            Self::ZscoreRequiresBaseline => "zscore-requires-baseline",
            Self::ZscoreDisablesLogarithmic => "zscore-disables-logarithmic",
            Self::PercentageRequiresExcess => "percentage-requires-excess",
            Self::CumulativeRequiresExcess => "cumulative-requires-excess",
            Self::PredictionIntervalRequiresBaseline => "prediction-interval-requires-baseline",
        }
    }

    /// Field this rule may override.
    #[must_use]
    pub const fn target(self) -> Field {
        match self {
            Self::ExcessRequiresBaseline | Self::ZscoreRequiresBaseline => Field::ShowBaseline,
            Self::ZscoreDisablesLogarithmic => Field::ShowLogarithmic,
            Self::PercentageRequiresExcess => Field::ShowPercentage,
            Self::CumulativeRequiresExcess => Field::Cumulative,
            Self::PredictionIntervalRequiresBaseline => Field::ShowPredictionInterval,
        }
    }

    #[must_use]
    pub fn is_satisfied(self, state: &ChartState) -> bool {
        match self {
            Self::ExcessRequiresBaseline | Self::ZscoreRequiresBaseline => state.show_baseline,
            Self::ZscoreDisablesLogarithmic => !state.show_logarithmic,
            Self::PercentageRequiresExcess => !state.show_percentage,
            Self::CumulativeRequiresExcess => !state.cumulative,
            Self::PredictionIntervalRequiresBaseline => {
                state.show_baseline || !state.show_prediction_interval
            }
        }
    }

    /// Applies the fix; returns whether the state changed.
    pub fn apply(self, state: &mut ChartState) -> bool {
        if self.is_satisfied(state) {
            return false;
        }
        match self {
            Self::ExcessRequiresBaseline | Self::ZscoreRequiresBaseline => {
                state.show_baseline = true;
            }
            Self::ZscoreDisablesLogarithmic => state.show_logarithmic = false,
            Self::PercentageRequiresExcess => state.show_percentage = false,
            Self::CumulativeRequiresExcess => state.cumulative = false,
            Self::PredictionIntervalRequiresBaseline => state.show_prediction_interval = false,
        }
        true
    }
}

/// Fixes applied by one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstraintReport {
    pub applied: SmallVec<[ConstraintKind; 4]>,
    pub passes: usize,
    pub converged: bool,
}

impl ConstraintReport {
    /// Fields whose value a rule overrode.
    #[must_use]
    pub fn constrained_fields(&self) -> Vec<Field> {
        let mut fields: Vec<Field> = self.applied.iter().map(|kind| kind.target()).collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }
}

/// Applies `constraints` until no rule changes the state or `max_passes` runs out.
pub fn apply_constraints(
    constraints: &[ConstraintKind],
    state: &mut ChartState,
    max_passes: usize,
) -> ConstraintReport {
    let mut report = ConstraintReport::default();
    while report.passes < max_passes.max(1) {
        report.passes += 1;
        let mut changed = false;
        for kind in constraints {
            if kind.apply(state) {
                debug!(constraint = kind.as_str(), field = %kind.target(), "constraint overrode field");
                report.applied.push(*kind);
                changed = true;
            }
        }
        if !changed {
            report.converged = true;
            return report;
        }
    }

    report.converged = constraints.iter().all(|kind| kind.is_satisfied(state));
    if !report.converged {
        warn!(passes = report.passes, "constraints did not converge");
    }
    report
}
