use mortality_chart_state::api::{
    ChartState, Field, FieldEdit, IssueKind, IssueReporter, RejectedParam, StateIssue,
    auto_fix_edits, validate_state,
};
use mortality_chart_state::core::{ChartType, PeriodIndex, RangeCalculator};
use mortality_chart_state::ChartError;

fn yearly(from: i32, to: i32) -> PeriodIndex {
    PeriodIndex::new(ChartType::Yearly, (from..=to).map(|year| year.to_string()))
        .expect("valid labels")
}

fn weekly(from: i32, to: i32) -> PeriodIndex {
    PeriodIndex::new(
        ChartType::Weekly,
        (from..=to).flat_map(|year| (1..=52).map(move |week| format!("{year}-W{week:02}"))),
    )
    .expect("valid labels")
}

fn state_with(edits: &[FieldEdit]) -> ChartState {
    let mut state = ChartState::default();
    for edit in edits {
        state.apply(edit);
    }
    state
}

#[test]
fn valid_state_has_no_issues() {
    let labels = yearly(2000, 2023);
    let range = RangeCalculator::new(&labels, true);
    let state = state_with(&[
        FieldEdit::DateFrom(Some("2010".to_owned())),
        FieldEdit::DateTo(Some("2020".to_owned())),
    ]);
    assert!(validate_state(&state, Some(&range)).is_empty());
    assert!(auto_fix_edits(&state, Some(&range)).is_empty());
}

#[test]
fn format_mismatch_is_found_without_labels() {
    let state = state_with(&[
        FieldEdit::ChartType(ChartType::Weekly),
        FieldEdit::DateFrom(Some("2020".to_owned())),
    ]);
    let issues = validate_state(&state, None);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::FormatMismatch(Field::DateFrom));
    assert_eq!(
        issues[0].fix(&state, None),
        vec![FieldEdit::DateFrom(Some("2020-W01".to_owned()))]
    );
}

#[test]
fn display_dates_outside_the_visible_period_are_remapped() {
    let labels = yearly(1995, 2023);
    let range = RangeCalculator::new(&labels, false);
    let state = state_with(&[FieldEdit::DateFrom(Some("1996".to_owned()))]);

    let issues = validate_state(&state, Some(&range));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::NotVisible(Field::DateFrom));
    assert_eq!(
        auto_fix_edits(&state, Some(&range)),
        vec![FieldEdit::DateFrom(Some("2000".to_owned()))]
    );
}

#[test]
fn unavailable_baseline_endpoint_is_cleared() {
    let labels = yearly(2000, 2023);
    let range = RangeCalculator::new(&labels, true);
    let state = state_with(&[FieldEdit::BaselineTo(Some("1980".to_owned()))]);

    let issues = validate_state(&state, Some(&range));
    assert_eq!(issues[0].kind, IssueKind::NotAvailable(Field::BaselineTo));
    assert_eq!(
        issues[0].fix(&state, Some(&range)),
        vec![FieldEdit::BaselineTo(None)]
    );
}

#[test]
fn inverted_date_range_is_swapped() {
    let labels = yearly(2000, 2023);
    let range = RangeCalculator::new(&labels, true);
    let state = state_with(&[
        FieldEdit::DateFrom(Some("2020".to_owned())),
        FieldEdit::DateTo(Some("2010".to_owned())),
    ]);

    let issues = validate_state(&state, Some(&range));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::InvertedDateRange);

    let edits = auto_fix_edits(&state, Some(&range));
    let fixed = {
        let mut fixed = state.clone();
        for edit in &edits {
            fixed.apply(edit);
        }
        fixed
    };
    assert_eq!(fixed.date_from.as_deref(), Some("2010"));
    assert_eq!(fixed.date_to.as_deref(), Some("2020"));
}

#[test]
fn inverted_baseline_is_cleared_even_without_labels() {
    let state = state_with(&[
        FieldEdit::BaselineFrom(Some("2019".to_owned())),
        FieldEdit::BaselineTo(Some("2015".to_owned())),
    ]);
    let issues = validate_state(&state, None);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::InvertedBaselineRange);
    assert_eq!(
        auto_fix_edits(&state, None),
        vec![FieldEdit::BaselineFrom(None), FieldEdit::BaselineTo(None)]
    );
}

#[test]
fn auto_fix_moves_labels_year_preservingly_onto_weekly_labels() {
    let labels = weekly(2019, 2020);
    let range = RangeCalculator::new(&labels, true);
    let state = state_with(&[
        FieldEdit::ChartType(ChartType::Weekly),
        FieldEdit::DateFrom(Some("2019".to_owned())),
        FieldEdit::DateTo(Some("2020".to_owned())),
    ]);

    let edits = auto_fix_edits(&state, Some(&range));
    assert_eq!(
        edits,
        vec![
            FieldEdit::DateFrom(Some("2019-W01".to_owned())),
            FieldEdit::DateTo(Some("2020-W52".to_owned())),
        ]
    );
}

#[test]
fn reporter_surfaces_each_message_once() {
    let state = state_with(&[
        FieldEdit::ChartType(ChartType::Monthly),
        FieldEdit::SliderStart(Some("2020".to_owned())),
    ]);
    let issues = validate_state(&state, None);
    let mut reporter = IssueReporter::new();

    assert_eq!(reporter.report(&issues).len(), 1);
    assert!(reporter.report(&issues).is_empty());
    assert!(reporter.was_reported(&issues[0].message));

    reporter.clear();
    assert_eq!(reporter.report(&issues).len(), 1);
}

#[test]
fn issue_converts_into_an_invalid_state_error() {
    let state = state_with(&[
        FieldEdit::ChartType(ChartType::Quarterly),
        FieldEdit::DateTo(Some("2020 Jan".to_owned())),
    ]);
    let issue = validate_state(&state, None)
        .into_iter()
        .next()
        .expect("format issue");
    let message = issue.to_string();
    let error = ChartError::from(issue);
    assert!(matches!(error, ChartError::InvalidState(text) if text == message));
}

#[test]
fn rejected_query_value_becomes_an_issue_without_fixes() {
    let param = RejectedParam {
        key: "ct".to_owned(),
        value: "hourly".to_owned(),
        reason: "unknown chart type".to_owned(),
    };
    let issue = StateIssue::from_rejected(&param).expect("known key");
    assert_eq!(issue.kind, IssueKind::RejectedParam(Field::ChartType));
    assert!(issue.message.contains("ct=hourly"));
    assert!(issue.fix(&ChartState::default(), None).is_empty());

    let unknown = RejectedParam {
        key: "zz".to_owned(),
        ..param
    };
    assert!(StateIssue::from_rejected(&unknown).is_none());
}
