use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{ChartType, Period, PeriodIndex, RangeCalculator, convert_label};
use crate::error::ChartError;

use super::{ChartState, Field, FieldEdit, RejectedParam};

const MAX_FIX_PASSES: usize = 4;

/// Structured validation failure of a resolved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Period label does not use the granularity's label format.
    FormatMismatch(Field),
    /// Display date is not among the visible labels.
    NotVisible(Field),
    /// Baseline endpoint or slider start is not among the available labels.
    NotAvailable(Field),
    InvertedDateRange,
    InvertedBaselineRange,
    /// Query value that could not be decoded; the field kept its default.
    RejectedParam(Field),
}

/// One validation finding with its user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl StateIssue {
    fn new(kind: IssueKind, message: String) -> Self {
        Self { kind, message }
    }

    /// Issue for a query parameter the codec refused; `None` for keys that
    /// name no field.
    #[must_use]
    pub fn from_rejected(param: &RejectedParam) -> Option<Self> {
        let field = Field::from_query_key(&param.key)?;
        Some(Self::new(
            IssueKind::RejectedParam(field),
            format!(
                "query parameter `{}={}` was ignored: {}",
                param.key, param.value, param.reason
            ),
        ))
    }

    /// Deterministic correction for this issue, dispatched by kind.
    ///
    /// Labels are moved year-preservingly onto the current labels (or label
    /// format, before labels exist); labels that cannot be placed are
    /// cleared so the field's default applies.
    #[must_use]
    pub fn fix(&self, state: &ChartState, range: Option<&RangeCalculator<'_>>) -> Vec<FieldEdit> {
        match self.kind {
            IssueKind::FormatMismatch(field) | IssueKind::NotVisible(field) => {
                let Some(label) = state.period_label(field) else {
                    return Vec::new();
                };
                let prefer_last = prefers_last(field);
                let remapped = match range {
                    Some(range) => range
                        .match_date_to_label(label, prefer_last)
                        .map(str::to_owned),
                    None => convert_label(label, state.chart_type, prefer_last),
                };
                FieldEdit::period_label(field, remapped).into_iter().collect()
            }
            IssueKind::NotAvailable(field) => {
                FieldEdit::period_label(field, None).into_iter().collect()
            }
            IssueKind::InvertedDateRange => vec![
                FieldEdit::DateFrom(state.date_to.clone()),
                FieldEdit::DateTo(state.date_from.clone()),
            ],
            IssueKind::InvertedBaselineRange => {
                vec![FieldEdit::BaselineFrom(None), FieldEdit::BaselineTo(None)]
            }
            IssueKind::RejectedParam(_) => Vec::new(),
        }
    }
}

impl fmt::Display for StateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<StateIssue> for ChartError {
    fn from(issue: StateIssue) -> Self {
        Self::InvalidState(issue.message)
    }
}

const fn prefers_last(field: Field) -> bool {
    matches!(field, Field::DateTo | Field::BaselineTo)
}

/// Validates the period-label fields of `state`.
///
/// Format checks need no labels; membership and ordering checks run only
/// when `range` carries the current label set.
#[must_use]
pub fn validate_state(state: &ChartState, range: Option<&RangeCalculator<'_>>) -> Vec<StateIssue> {
    let chart_type = state.chart_type;
    let mut issues = Vec::new();

    for field in [
        Field::DateFrom,
        Field::DateTo,
        Field::SliderStart,
        Field::BaselineFrom,
        Field::BaselineTo,
    ] {
        let Some(label) = state.period_label(field) else {
            continue;
        };
        if !matches_format(label, chart_type) {
            issues.push(StateIssue::new(
                IssueKind::FormatMismatch(field),
                format!("`{field}` value `{label}` is not a valid {chart_type} label"),
            ));
            continue;
        }
        let Some(range) = range.filter(|range| !range.index().is_empty()) else {
            continue;
        };
        match field {
            Field::DateFrom | Field::DateTo if !range.is_valid_date(label) => {
                issues.push(StateIssue::new(
                    IssueKind::NotVisible(field),
                    format!("`{field}` value `{label}` is outside the visible period"),
                ));
            }
            Field::SliderStart | Field::BaselineFrom | Field::BaselineTo
                if !range.index().is_valid(label) =>
            {
                issues.push(StateIssue::new(
                    IssueKind::NotAvailable(field),
                    format!("`{field}` value `{label}` is not an available period"),
                ));
            }
            _ => {}
        }
    }

    if issues.is_empty() {
        let index = range.map(RangeCalculator::index);
        if is_inverted(state.date_from.as_deref(), state.date_to.as_deref(), chart_type, index) {
            issues.push(StateIssue::new(
                IssueKind::InvertedDateRange,
                "date range ends before it starts".to_owned(),
            ));
        }
        if is_inverted(
            state.baseline_from.as_deref(),
            state.baseline_to.as_deref(),
            chart_type,
            index,
        ) {
            issues.push(StateIssue::new(
                IssueKind::InvertedBaselineRange,
                "baseline period ends before it starts".to_owned(),
            ));
        }
    }
    issues
}

fn matches_format(label: &str, chart_type: ChartType) -> bool {
    Period::parse_as(
        label,
        chart_type.label_format(),
        chart_type.season_start_month(),
    )
    .is_some()
}

fn is_inverted(
    from: Option<&str>,
    to: Option<&str>,
    chart_type: ChartType,
    index: Option<&PeriodIndex>,
) -> bool {
    let (Some(from), Some(to)) = (from, to) else {
        return false;
    };
    let ordering = match index {
        Some(index) => index.compare(from, to),
        None => {
            let season_start = chart_type.season_start_month();
            match (Period::parse(from, season_start), Period::parse(to, season_start)) {
                (Some(from), Some(to)) => Some(from.ordinal().cmp(&to.ordinal())),
                _ => None,
            }
        }
    };
    ordering == Some(Ordering::Greater)
}

/// Edits that make `state` valid, found by validating and fixing until no
/// issue remains.
#[must_use]
pub fn auto_fix_edits(state: &ChartState, range: Option<&RangeCalculator<'_>>) -> Vec<FieldEdit> {
    let mut working = state.clone();
    let mut edits: Vec<FieldEdit> = Vec::new();

    for _ in 0..MAX_FIX_PASSES {
        let issues = validate_state(&working, range);
        if issues.is_empty() {
            break;
        }
        for issue in &issues {
            for edit in issue.fix(&working, range) {
                debug!(issue = %issue, field = %edit.field(), "auto-fixing state");
                working.apply(&edit);
                edits.retain(|existing| existing.field() != edit.field());
                edits.push(edit);
            }
        }
    }
    edits
}

/// Surfaces each distinct issue message once.
#[derive(Debug, Clone, Default)]
pub struct IssueReporter {
    seen: HashSet<String>,
}

impl IssueReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and returns the issues whose message was not reported before.
    pub fn report<'a>(&mut self, issues: &'a [StateIssue]) -> Vec<&'a StateIssue> {
        issues
            .iter()
            .filter(|issue| {
                let fresh = self.seen.insert(issue.message.clone());
                if fresh {
                    warn!(kind = ?issue.kind, message = %issue.message, "invalid chart state");
                }
                fresh
            })
            .collect()
    }

    #[must_use]
    pub fn was_reported(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
