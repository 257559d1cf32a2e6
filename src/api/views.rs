use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ChartPatch, ChartStyle, ConstraintKind, FieldEdit, QueryParams};

/// Mutually exclusive display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Raw values; the base view every other view overrides sparsely.
    #[default]
    Mortality,
    /// Excess over baseline.
    Excess,
    /// Standardized score against the baseline.
    Zscore,
}

impl View {
    pub const ALL: [Self; 3] = [Self::Mortality, Self::Excess, Self::Zscore];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mortality => "mortality",
            Self::Excess => "excess",
            Self::Zscore => "zscore",
        }
    }

    /// Query key whose `1` value selects this view.
    #[must_use]
    pub const fn marker_key(self) -> Option<&'static str> {
        match self {
            Self::Mortality => None,
            Self::Excess => Some("e"),
            Self::Zscore => Some("zs"),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active view for a raw query; the z-score marker wins over the excess one
/// and anything else resolves to [`View::Mortality`].
#[must_use]
pub fn detect_view(query: &QueryParams) -> View {
    [View::Zscore, View::Excess]
        .into_iter()
        .find(|view| {
            view.marker_key()
                .is_some_and(|key| query.first(key) == Some("1"))
        })
        .unwrap_or_default()
}

/// Sparse defaults and rule set of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDefinition {
    pub view: View,
    pub defaults: ChartPatch,
    pub constraints: Vec<ConstraintKind>,
}

impl ViewDefinition {
    #[must_use]
    pub fn standard(view: View) -> Self {
        match view {
            View::Mortality => Self {
                view,
                defaults: ChartPatch::new(),
                constraints: vec![
                    ConstraintKind::PercentageRequiresExcess,
                    ConstraintKind::CumulativeRequiresExcess,
                    ConstraintKind::PredictionIntervalRequiresBaseline,
                ],
            },
            View::Excess => Self {
                view,
                defaults: ChartPatch::new()
                    .with(FieldEdit::ChartStyle(ChartStyle::Bar))
                    .with(FieldEdit::ShowPercentage(true))
                    .with(FieldEdit::ShowPredictionInterval(false)),
                constraints: vec![
                    ConstraintKind::ExcessRequiresBaseline,
                    ConstraintKind::PredictionIntervalRequiresBaseline,
                ],
            },
            View::Zscore => Self {
                view,
                defaults: ChartPatch::new()
                    .with(FieldEdit::ChartStyle(ChartStyle::Line))
                    .with(FieldEdit::ShowPredictionInterval(false)),
                constraints: vec![
                    ConstraintKind::ZscoreRequiresBaseline,
                    ConstraintKind::ZscoreDisablesLogarithmic,
                    ConstraintKind::PercentageRequiresExcess,
                    ConstraintKind::CumulativeRequiresExcess,
                    ConstraintKind::PredictionIntervalRequiresBaseline,
                ],
            },
        }
    }
}
