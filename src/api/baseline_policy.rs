use tracing::debug;

use crate::core::{DateRange, Period, PeriodIndex};

use super::BaselineMethod;

/// Source of default baseline periods for a label set.
pub trait BaselineDefaultPolicy: Send + Sync {
    /// Default baseline for `method`, or `None` when `labels` cannot carry one.
    fn default_range(&self, labels: &PeriodIndex, method: BaselineMethod) -> Option<DateRange>;
}

/// Baseline ending in the last pre-pandemic year, sized by method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardBaselinePolicy {
    pub end_year: i32,
}

impl Default for StandardBaselinePolicy {
    fn default() -> Self {
        Self { end_year: 2019 }
    }
}

impl StandardBaselinePolicy {
    /// Baseline length in years.
    #[must_use]
    pub const fn span_years(method: BaselineMethod) -> i32 {
        match method {
            BaselineMethod::Naive => 1,
            BaselineMethod::Mean | BaselineMethod::Median => 3,
            BaselineMethod::LinReg | BaselineMethod::Exp => 10,
        }
    }
}

impl BaselineDefaultPolicy for StandardBaselinePolicy {
    fn default_range(&self, labels: &PeriodIndex, method: BaselineMethod) -> Option<DateRange> {
        let last_allowed = last_baseline_position(labels)?;
        let chart_type = labels.chart_type();
        let format = chart_type.label_format();
        let season_start = chart_type.season_start_month();
        let from_year = self.end_year - Self::span_years(method) + 1;

        let from = Period::first_of_year(format, from_year, season_start)?;
        let to = Period::last_of_year(format, self.end_year, season_start)?;
        let to_position = labels.index_of(&to.label()).ok()?.min(last_allowed);
        let from_position = labels.index_of(&from.label()).ok()?.min(to_position);

        Some(DateRange::new(
            labels.get(from_position)?,
            labels.get(to_position)?,
        ))
    }
}

/// Last position a baseline may end at: at least one label must follow it.
fn last_baseline_position(labels: &PeriodIndex) -> Option<usize> {
    labels.len().checked_sub(2)
}

/// Baseline range the aggregation runs with.
///
/// Endpoints that are not exact members of `labels` are replaced by the
/// policy default. A range that ends before it starts is replaced by the
/// default wholesale, and an end on the last label is pulled back so the
/// baseline never reaches the final displayed period. Fewer than two labels
/// yield no baseline.
#[must_use]
pub fn resolve_baseline_range(
    policy: &dyn BaselineDefaultPolicy,
    labels: &PeriodIndex,
    method: BaselineMethod,
    from: Option<&str>,
    to: Option<&str>,
) -> Option<DateRange> {
    let last_allowed = last_baseline_position(labels)?;
    let default = policy.default_range(labels, method)?;

    let pick = |requested: Option<&str>, fallback: &str| match requested {
        Some(label) if labels.is_valid(label) => label.to_owned(),
        _ => fallback.to_owned(),
    };
    let from = pick(from, &default.from);
    let to = pick(to, &default.to);

    let (Some(from_position), Some(mut to_position)) =
        (labels.position(&from), labels.position(&to))
    else {
        return Some(default);
    };
    if to_position < from_position {
        debug!(%from, %to, "inverted baseline replaced by default");
        return Some(default);
    }
    if to_position > last_allowed {
        to_position = last_allowed;
        if to_position < from_position {
            debug!(%from, %to, "baseline reaching the last period replaced by default");
            return Some(default);
        }
    }

    Some(DateRange::new(from, labels.get(to_position)?))
}
