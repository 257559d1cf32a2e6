use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Field, StateChange};

/// Ordered work levels a field change can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum UpdatePlan {
    #[default]
    None,
    /// Same series, new presentation.
    Redraw,
    /// New dataset, labels and aggregation.
    Refetch,
}

impl UpdatePlan {
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if self as u8 >= other as u8 {
            self
        } else {
            other
        }
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Work a change of `field` requires.
    ///
    /// This is the single dependency table for re-fetching: every field that
    /// feeds the dataset fetch or the aggregation call maps to `Refetch`.
    #[must_use]
    pub const fn for_field(field: Field) -> Self {
        match field {
            Field::Countries
            | Field::AgeGroups
            | Field::ChartType
            | Field::Metric
            | Field::StandardPopulation
            | Field::SliderStart
            | Field::ShowBaseline
            | Field::BaselineMethod
            | Field::BaselineFrom
            | Field::BaselineTo
            | Field::Cumulative => Self::Refetch,
            Field::ChartStyle
            | Field::DateFrom
            | Field::DateTo
            | Field::ShowPredictionInterval
            | Field::ShowPercentage
            | Field::ShowLogarithmic => Self::Redraw,
        }
    }

    #[must_use]
    pub fn for_fields<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Self {
        fields
            .into_iter()
            .fold(Self::None, |plan, field| plan.max(Self::for_field(*field)))
    }
}

/// Coalesces field changes into the pending update plan.
#[derive(Debug, Clone, Default)]
pub struct RefetchDispatcher {
    pending: UpdatePlan,
    triggers: BTreeSet<Field>,
    view_changed: bool,
}

impl RefetchDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `fields` into the pending plan and returns the plan they need.
    pub fn on_relevant_fields_changed<'a>(
        &mut self,
        fields: impl IntoIterator<Item = &'a Field>,
    ) -> UpdatePlan {
        let mut plan = UpdatePlan::None;
        for field in fields {
            plan = plan.max(UpdatePlan::for_field(*field));
            self.triggers.insert(*field);
        }
        self.pending = self.pending.max(plan);
        if !plan.is_none() {
            debug!(?plan, pending = ?self.pending, "scheduled chart update");
        }
        plan
    }

    /// Schedules the work for a committed state change; a view change always
    /// refetches because it changes the requested extra series.
    pub fn on_state_change(&mut self, change: &StateChange) -> UpdatePlan {
        let mut plan = self.on_relevant_fields_changed(&change.changed);
        if change.view_changed {
            self.view_changed = true;
            self.pending = UpdatePlan::Refetch;
            plan = UpdatePlan::Refetch;
        }
        plan
    }

    #[must_use]
    pub const fn pending(&self) -> UpdatePlan {
        self.pending
    }

    #[must_use]
    pub const fn view_changed(&self) -> bool {
        self.view_changed
    }

    #[must_use]
    pub fn triggers(&self) -> &BTreeSet<Field> {
        &self.triggers
    }

    /// Puts back a plan taken for work that did not complete.
    pub fn requeue(&mut self, plan: UpdatePlan) {
        self.pending = self.pending.max(plan);
    }

    /// Returns and resets the pending plan.
    pub fn take_pending(&mut self) -> UpdatePlan {
        self.triggers.clear();
        self.view_changed = false;
        std::mem::take(&mut self.pending)
    }
}
