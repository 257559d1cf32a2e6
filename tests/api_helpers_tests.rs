use std::collections::BTreeSet;

use mortality_chart_state::api::{
    ChartPatch, ChartPredicates, ChartState, ChartStyle, Field, FieldEdit, Metric,
    ProgressState, RefetchDispatcher, SessionConfig, StandardPopulation, StateChange, StateStore,
    UpdatePlan, View, ViewStateMachine, no_data_message, percent_of,
};

#[test]
fn update_plan_table_splits_refetch_and_redraw() {
    assert_eq!(UpdatePlan::for_field(Field::Countries), UpdatePlan::Refetch);
    assert_eq!(UpdatePlan::for_field(Field::BaselineTo), UpdatePlan::Refetch);
    assert_eq!(UpdatePlan::for_field(Field::Cumulative), UpdatePlan::Refetch);
    assert_eq!(UpdatePlan::for_field(Field::ChartStyle), UpdatePlan::Redraw);
    assert_eq!(UpdatePlan::for_field(Field::DateFrom), UpdatePlan::Redraw);
    assert_eq!(UpdatePlan::for_fields(&[] as &[Field]), UpdatePlan::None);
    assert_eq!(
        UpdatePlan::for_fields(&[Field::ShowLogarithmic, Field::Metric]),
        UpdatePlan::Refetch
    );
    assert!(UpdatePlan::None < UpdatePlan::Redraw && UpdatePlan::Redraw < UpdatePlan::Refetch);
}

#[test]
fn dispatcher_coalesces_until_taken() {
    let mut dispatcher = RefetchDispatcher::new();
    assert_eq!(
        dispatcher.on_relevant_fields_changed(&[Field::ChartStyle]),
        UpdatePlan::Redraw
    );
    assert_eq!(
        dispatcher.on_relevant_fields_changed(&[Field::AgeGroups]),
        UpdatePlan::Refetch
    );
    assert_eq!(
        dispatcher.on_relevant_fields_changed(&[Field::ShowPercentage]),
        UpdatePlan::Redraw
    );
    assert_eq!(dispatcher.pending(), UpdatePlan::Refetch);
    assert_eq!(dispatcher.triggers().len(), 3);

    assert_eq!(dispatcher.take_pending(), UpdatePlan::Refetch);
    assert_eq!(dispatcher.pending(), UpdatePlan::None);
    assert!(dispatcher.triggers().is_empty());
}

#[test]
fn requeued_plan_never_downgrades_pending_work() {
    let mut dispatcher = RefetchDispatcher::new();
    dispatcher.on_relevant_fields_changed(&[Field::ChartStyle]);
    let taken = dispatcher.take_pending();
    assert_eq!(taken, UpdatePlan::Redraw);

    dispatcher.on_relevant_fields_changed(&[Field::Countries]);
    dispatcher.requeue(taken);
    assert_eq!(dispatcher.pending(), UpdatePlan::Refetch);

    dispatcher.take_pending();
    dispatcher.requeue(UpdatePlan::Refetch);
    assert_eq!(dispatcher.pending(), UpdatePlan::Refetch);
}

#[test]
fn view_change_always_refetches() {
    let mut dispatcher = RefetchDispatcher::new();
    let change = StateChange {
        revision: 1,
        changed: BTreeSet::from([Field::ChartStyle]),
        view_changed: true,
    };
    assert_eq!(dispatcher.on_state_change(&change), UpdatePlan::Refetch);
    assert!(dispatcher.view_changed());
    dispatcher.take_pending();
    assert!(!dispatcher.view_changed());
}

#[test]
fn store_bumps_the_revision_only_on_change() {
    let machine = ViewStateMachine::new(&SessionConfig::default());
    let initial = machine.resolve(View::Mortality, ChartPatch::new());
    let store = StateStore::new(initial.clone());
    let mut revisions = store.subscribe();

    let noop = store.apply(initial.clone());
    assert!(noop.is_noop());
    assert_eq!(store.revision(), 0);

    let edited = machine.apply_edit(&initial, FieldEdit::ChartStyle(ChartStyle::Bar));
    let change = store.apply(edited);
    assert_eq!(change.changed, BTreeSet::from([Field::ChartStyle]));
    assert_eq!(store.revision(), 1);
    assert!(revisions.has_changed().expect("sender alive"));
    assert_eq!(*revisions.borrow_and_update(), 1);
    assert_eq!(store.state().chart_style, ChartStyle::Bar);
}

#[test]
fn excess_predicates_and_extra_keys() {
    let state = ChartState::default();
    let predicates = ChartPredicates::new(View::Excess, &state);

    assert!(predicates.is_excess());
    assert!(predicates.is_asmr());
    assert!(predicates.can_show_percentage());
    assert!(!predicates.can_show_logarithmic());
    assert_eq!(predicates.data_key(), "asmr_who");
    assert_eq!(
        predicates.extra_keys(),
        vec![
            "asmr_who_baseline",
            "asmr_who_baseline_lower",
            "asmr_who_baseline_upper",
            "asmr_who_excess",
            "asmr_who_excess_lower",
            "asmr_who_excess_upper",
        ]
    );
}

#[test]
fn zscore_adds_a_single_series() {
    let state = ChartState {
        standard_population: StandardPopulation::Esp,
        ..ChartState::default()
    };
    let keys = ChartPredicates::new(View::Zscore, &state).extra_keys();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys.last().map(String::as_str), Some("asmr_esp_zscore"));
}

#[test]
fn population_has_no_baseline() {
    let state = ChartState {
        metric: Metric::Population,
        ..ChartState::default()
    };
    let predicates = ChartPredicates::new(View::Mortality, &state);
    assert!(!predicates.has_baseline());
    assert!(!predicates.can_show_prediction_interval());
    assert!(predicates.extra_keys().is_empty());
    assert_eq!(predicates.data_key(), "population");
}

#[test]
fn matrix_style_hides_interval_and_log_scale() {
    let state = ChartState {
        chart_style: ChartStyle::Matrix,
        ..ChartState::default()
    };
    let predicates = ChartPredicates::new(View::Mortality, &state);
    assert!(predicates.is_matrix_style());
    assert!(!predicates.can_show_prediction_interval());
    assert!(!predicates.can_show_logarithmic());
}

#[test]
fn no_data_message_names_the_standardized_metric() {
    assert!(no_data_message(true).contains("age-standardized"));
    assert!(!no_data_message(false).contains("age-standardized"));

    let state = ChartState {
        metric: Metric::Cmr,
        ..ChartState::default()
    };
    assert_eq!(
        ChartPredicates::new(View::Mortality, &state).no_data_message(),
        no_data_message(false)
    );
}

#[test]
fn percent_is_rounded_and_clamped() {
    assert_eq!(percent_of(0, 0), 0);
    assert_eq!(percent_of(1, 3), 33);
    assert_eq!(percent_of(2, 3), 67);
    assert_eq!(percent_of(7, 3), 100);
}

#[test]
fn progress_state_notifies_only_on_change() {
    let progress = ProgressState::new();
    let updates = progress.subscribe();

    progress.report(0, 4);
    assert!(!updates.has_changed().expect("sender alive"));

    let callback = progress.callback();
    callback(2, 4);
    assert_eq!(progress.percent(), 50);
    assert!(updates.has_changed().expect("sender alive"));

    progress.reset();
    assert_eq!(progress.percent(), 0);
}
