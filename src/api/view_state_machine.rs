use std::collections::BTreeSet;

use tracing::debug;

use super::{
    ChartPatch, ChartState, ConstraintReport, Field, FieldEdit, QueryParams, RejectedParam,
    SessionConfig, View, ViewDefinition, apply_constraints, decode_query, encode_state,
};
use crate::core::{ChartType, convert_label};

/// Fully resolved chart configuration.
///
/// `overrides` keeps the raw user assignments; `state` is the effective value
/// of every field after view defaults and constraints. A constraint changes
/// the effective value only, so the raw override resurfaces once the view
/// that imposed the constraint is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedState {
    view: View,
    state: ChartState,
    overrides: ChartPatch,
    constraints: ConstraintReport,
}

impl ResolvedState {
    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub const fn state(&self) -> &ChartState {
        &self.state
    }

    #[must_use]
    pub const fn overrides(&self) -> &ChartPatch {
        &self.overrides
    }

    #[must_use]
    pub const fn constraints(&self) -> &ConstraintReport {
        &self.constraints
    }

    /// Fields the user explicitly set.
    #[must_use]
    pub fn user_overrides(&self) -> BTreeSet<Field> {
        self.overrides.fields()
    }

    #[must_use]
    pub fn is_user_set(&self, field: Field) -> bool {
        self.overrides.contains(field)
    }

    /// Whether a constraint overrode the effective value of `field`.
    #[must_use]
    pub fn is_constrained(&self, field: Field) -> bool {
        self.constraints.applied.iter().any(|kind| kind.target() == field)
    }
}

/// Resolves view, defaults, overrides and constraints into a [`ResolvedState`].
#[derive(Debug, Clone)]
pub struct ViewStateMachine {
    base: ChartState,
    definitions: [ViewDefinition; 3],
    max_constraint_passes: usize,
}

impl Default for ViewStateMachine {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl ViewStateMachine {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            base: config.base_defaults.clone(),
            definitions: View::ALL.map(ViewDefinition::standard),
            max_constraint_passes: config.max_constraint_passes,
        }
    }

    #[must_use]
    pub fn definition(&self, view: View) -> &ViewDefinition {
        match view {
            View::Mortality => &self.definitions[0],
            View::Excess => &self.definitions[1],
            View::Zscore => &self.definitions[2],
        }
    }

    #[must_use]
    pub fn base_defaults(&self) -> &ChartState {
        &self.base
    }

    /// Base defaults with the view's sparse defaults applied.
    #[must_use]
    pub fn defaults_for(&self, view: View) -> ChartState {
        let mut state = self.base.clone();
        self.definition(view).defaults.apply_to(&mut state);
        state
    }

    /// Field precedence is user override, then view default, then base
    /// default; the view's constraints run last.
    #[must_use]
    pub fn resolve(&self, view: View, overrides: ChartPatch) -> ResolvedState {
        let mut state = self.defaults_for(view);
        overrides.apply_to(&mut state);
        let constraints = apply_constraints(
            &self.definition(view).constraints,
            &mut state,
            self.max_constraint_passes,
        );
        debug!(
            view = view.as_str(),
            overrides = overrides.fields().len(),
            constrained = constraints.applied.len(),
            "resolved chart state"
        );
        ResolvedState {
            view,
            state,
            overrides,
            constraints,
        }
    }

    /// Resolves the state a query describes; rejected parameters fall back
    /// to their defaults and are returned for reporting.
    #[must_use]
    pub fn resolve_initial(&self, query: &QueryParams) -> (ResolvedState, Vec<RejectedParam>) {
        let decoded = decode_query(query);
        (self.resolve(decoded.view, decoded.overrides), decoded.rejected)
    }

    /// Records `edit` as a user override and re-resolves.
    ///
    /// A granularity change moves every period-label override onto the new
    /// label format, keeping its year: range starts take the first period of
    /// the year and range ends the last.
    #[must_use]
    pub fn apply_edit(&self, current: &ResolvedState, edit: FieldEdit) -> ResolvedState {
        let mut overrides = current.overrides.clone();
        if let FieldEdit::ChartType(chart_type) = &edit {
            if *chart_type != current.state.chart_type {
                remap_period_overrides(&mut overrides, *chart_type);
            }
        }
        overrides.set(edit);
        self.resolve(current.view, overrides)
    }

    #[must_use]
    pub fn apply_edits(
        &self,
        current: &ResolvedState,
        edits: impl IntoIterator<Item = FieldEdit>,
    ) -> ResolvedState {
        edits
            .into_iter()
            .fold(current.clone(), |resolved, edit| self.apply_edit(&resolved, edit))
    }

    /// Activates `view`, dropping overrides of view-scoped fields so the new
    /// view's defaults apply. Data-selection fields stay user-set.
    #[must_use]
    pub fn switch_view(&self, current: &ResolvedState, view: View) -> ResolvedState {
        if view == current.view {
            return current.clone();
        }
        let mut overrides = current.overrides.clone();
        let cleared: Vec<Field> = overrides
            .fields()
            .into_iter()
            .filter(|field| field.is_view_scoped())
            .collect();
        overrides.retain(|field| !field.is_view_scoped());
        debug!(
            from = current.view.as_str(),
            to = view.as_str(),
            cleared = ?cleared,
            "switched view"
        );
        self.resolve(view, overrides)
    }

    /// Query string form of `resolved`.
    #[must_use]
    pub fn encode(&self, resolved: &ResolvedState) -> QueryParams {
        encode_state(resolved, &self.defaults_for(resolved.view))
    }
}

fn remap_period_overrides(overrides: &mut ChartPatch, chart_type: ChartType) {
    for field in [
        Field::DateFrom,
        Field::DateTo,
        Field::SliderStart,
        Field::BaselineFrom,
        Field::BaselineTo,
    ] {
        let Some(label) = overrides.period_label(field) else {
            continue;
        };
        let prefer_last = matches!(field, Field::DateTo | Field::BaselineTo);
        let remapped = convert_label(label, chart_type, prefer_last);
        debug!(field = %field, from = label, to = ?remapped, "remapped period override");
        if let Some(edit) = FieldEdit::period_label(field, remapped) {
            overrides.set(edit);
        }
    }
}
