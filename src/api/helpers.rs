use super::{ChartState, ChartStyle, Metric, ResolvedState, View};

const NO_DATA_MESSAGE: &str = "No data available for the current selection.";
const NO_ASMR_DATA_MESSAGE: &str =
    "No age-standardized data available for the selected countries. Try the crude mortality rate.";

/// Pure predicates over one resolved state.
#[derive(Debug, Clone, Copy)]
pub struct ChartPredicates<'a> {
    view: View,
    state: &'a ChartState,
}

impl<'a> ChartPredicates<'a> {
    #[must_use]
    pub const fn new(view: View, state: &'a ChartState) -> Self {
        Self { view, state }
    }

    #[must_use]
    pub fn of(resolved: &'a ResolvedState) -> Self {
        Self::new(resolved.view(), resolved.state())
    }

    #[must_use]
    pub fn is_excess(&self) -> bool {
        self.view == View::Excess
    }

    #[must_use]
    pub fn is_zscore(&self) -> bool {
        self.view == View::Zscore
    }

    #[must_use]
    pub fn is_asmr(&self) -> bool {
        self.state.metric == Metric::Asmr
    }

    #[must_use]
    pub fn is_population(&self) -> bool {
        self.state.metric == Metric::Population
    }

    #[must_use]
    pub fn is_life_expectancy(&self) -> bool {
        self.state.metric == Metric::Le
    }

    #[must_use]
    pub fn is_weekly(&self) -> bool {
        self.state.chart_type.is_weekly()
    }

    #[must_use]
    pub fn is_season(&self) -> bool {
        self.state.chart_type.is_season()
    }

    #[must_use]
    pub fn is_bar_style(&self) -> bool {
        self.state.chart_style == ChartStyle::Bar
    }

    #[must_use]
    pub fn is_matrix_style(&self) -> bool {
        self.state.chart_style == ChartStyle::Matrix
    }

    /// Population has no meaningful baseline.
    #[must_use]
    pub fn has_baseline(&self) -> bool {
        self.state.show_baseline && !self.is_population()
    }

    #[must_use]
    pub fn can_show_prediction_interval(&self) -> bool {
        self.has_baseline() && !self.is_matrix_style() && !self.state.cumulative
    }

    /// Z-scores and excess values can be negative.
    #[must_use]
    pub fn can_show_logarithmic(&self) -> bool {
        self.view == View::Mortality && !self.is_matrix_style()
    }

    #[must_use]
    pub fn can_show_percentage(&self) -> bool {
        self.is_excess()
    }

    #[must_use]
    pub fn can_show_cumulative(&self) -> bool {
        self.is_excess()
    }

    /// Column the aggregation reads, e.g. `asmr_who` or `cmr`.
    #[must_use]
    pub fn data_key(&self) -> String {
        match self.state.metric {
            Metric::Asmr => format!(
                "{}_{}",
                Metric::Asmr.as_str(),
                self.state.standard_population.as_str()
            ),
            metric => metric.as_str().to_owned(),
        }
    }

    /// Derived series the aggregation must produce for this view.
    #[must_use]
    pub fn extra_keys(&self) -> Vec<String> {
        if !self.has_baseline() {
            return Vec::new();
        }
        let key = self.data_key();
        let mut keys = vec![
            format!("{key}_baseline"),
            format!("{key}_baseline_lower"),
            format!("{key}_baseline_upper"),
        ];
        match self.view {
            View::Mortality => {}
            View::Excess => keys.extend([
                format!("{key}_excess"),
                format!("{key}_excess_lower"),
                format!("{key}_excess_upper"),
            ]),
            View::Zscore => keys.push(format!("{key}_zscore")),
        }
        keys
    }

    #[must_use]
    pub fn no_data_message(&self) -> &'static str {
        no_data_message(self.is_asmr())
    }
}

/// User-facing text for an empty label sequence.
#[must_use]
pub const fn no_data_message(asmr_requested: bool) -> &'static str {
    if asmr_requested {
        NO_ASMR_DATA_MESSAGE
    } else {
        NO_DATA_MESSAGE
    }
}
