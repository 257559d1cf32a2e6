use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ChartType;
use crate::error::{ChartError, ChartResult};

/// Displayed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Deaths,
    Population,
    /// Crude mortality rate.
    Cmr,
    /// Age-standardized mortality rate.
    #[default]
    Asmr,
    /// Life expectancy.
    Le,
}

impl Metric {
    pub const ALL: [Self; 5] = [
        Self::Deaths,
        Self::Population,
        Self::Cmr,
        Self::Asmr,
        Self::Le,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deaths => "deaths",
            Self::Population => "population",
            Self::Cmr => "cmr",
            Self::Asmr => "asmr",
            Self::Le => "le",
        }
    }
}

/// Standard population used to age-standardize ASMR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StandardPopulation {
    #[default]
    Who,
    Esp,
    Usa,
    Country,
}

impl StandardPopulation {
    pub const ALL: [Self; 4] = [Self::Who, Self::Esp, Self::Usa, Self::Country];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Who => "who",
            Self::Esp => "esp",
            Self::Usa => "usa",
            Self::Country => "country",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChartStyle {
    #[default]
    Line,
    Bar,
    Matrix,
}

impl ChartStyle {
    pub const ALL: [Self; 3] = [Self::Line, Self::Bar, Self::Matrix];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Matrix => "matrix",
        }
    }
}

/// Statistical model the baseline is fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMethod {
    /// Last baseline period carried forward.
    Naive,
    Mean,
    Median,
    #[default]
    LinReg,
    /// Exponential smoothing.
    Exp,
}

impl BaselineMethod {
    pub const ALL: [Self; 5] = [
        Self::Naive,
        Self::Mean,
        Self::Median,
        Self::LinReg,
        Self::Exp,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::LinReg => "lin_reg",
            Self::Exp => "exp",
        }
    }
}

macro_rules! impl_code_traits {
    ($($ty:ident => $what:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = ChartError;

                fn from_str(value: &str) -> ChartResult<Self> {
                    Self::ALL
                        .into_iter()
                        .find(|candidate| candidate.as_str() == value)
                        .ok_or_else(|| {
                            ChartError::InvalidData(format!("unknown {} `{value}`", $what))
                        })
                }
            }
        )*
    };
}

impl_code_traits!(
    Metric => "metric",
    StandardPopulation => "standard population",
    ChartStyle => "chart style",
    BaselineMethod => "baseline method",
);

/// Every user-settable field of the chart state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Countries,
    AgeGroups,
    ChartType,
    Metric,
    StandardPopulation,
    ChartStyle,
    DateFrom,
    DateTo,
    SliderStart,
    ShowBaseline,
    BaselineMethod,
    BaselineFrom,
    BaselineTo,
    ShowPredictionInterval,
    Cumulative,
    ShowPercentage,
    ShowLogarithmic,
}

impl Field {
    pub const ALL: [Self; 17] = [
        Self::Countries,
        Self::AgeGroups,
        Self::ChartType,
        Self::Metric,
        Self::StandardPopulation,
        Self::ChartStyle,
        Self::DateFrom,
        Self::DateTo,
        Self::SliderStart,
        Self::ShowBaseline,
        Self::BaselineMethod,
        Self::BaselineFrom,
        Self::BaselineTo,
        Self::ShowPredictionInterval,
        Self::Cumulative,
        Self::ShowPercentage,
        Self::ShowLogarithmic,
    ];

    /// Fields whose defaults or constraints differ between views; their
    /// overrides are dropped when the view changes.
    pub const VIEW_SCOPED: [Self; 6] = [
        Self::ChartStyle,
        Self::ShowBaseline,
        Self::ShowPredictionInterval,
        Self::Cumulative,
        Self::ShowPercentage,
        Self::ShowLogarithmic,
    ];

    pub const BOOLEAN: [Self; 5] = [
        Self::ShowBaseline,
        Self::ShowPredictionInterval,
        Self::Cumulative,
        Self::ShowPercentage,
        Self::ShowLogarithmic,
    ];

    /// Short query-string key.
    #[must_use]
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Countries => "c",
            Self::AgeGroups => "ag",
            Self::ChartType => "ct",
            Self::Metric => "t",
            Self::StandardPopulation => "sp",
            Self::ChartStyle => "cs",
            Self::DateFrom => "df",
            Self::DateTo => "dt",
            Self::SliderStart => "ss",
            Self::ShowBaseline => "sb",
            Self::BaselineMethod => "bm",
            Self::BaselineFrom => "bdf",
            Self::BaselineTo => "bdt",
            Self::ShowPredictionInterval => "pi",
            Self::Cumulative => "cum",
            Self::ShowPercentage => "p",
            Self::ShowLogarithmic => "lg",
        }
    }

    #[must_use]
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.query_key() == key)
    }

    #[must_use]
    pub fn is_view_scoped(self) -> bool {
        Self::VIEW_SCOPED.contains(&self)
    }

    #[must_use]
    pub fn is_boolean(self) -> bool {
        Self::BOOLEAN.contains(&self)
    }

    #[must_use]
    pub const fn is_repeatable(self) -> bool {
        matches!(self, Self::Countries | Self::AgeGroups)
    }

    /// Fields holding a period label.
    #[must_use]
    pub const fn is_period_label(self) -> bool {
        matches!(
            self,
            Self::DateFrom
                | Self::DateTo
                | Self::SliderStart
                | Self::BaselineFrom
                | Self::BaselineTo
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_key())
    }
}

/// Concrete value of every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartState {
    pub countries: Vec<String>,
    pub age_groups: Vec<String>,
    pub chart_type: ChartType,
    pub metric: Metric,
    pub standard_population: StandardPopulation,
    pub chart_style: ChartStyle,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub slider_start: Option<String>,
    pub show_baseline: bool,
    pub baseline_method: BaselineMethod,
    pub baseline_from: Option<String>,
    pub baseline_to: Option<String>,
    pub show_prediction_interval: bool,
    pub cumulative: bool,
    pub show_percentage: bool,
    pub show_logarithmic: bool,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            countries: vec!["USA".to_owned(), "SWE".to_owned()],
            age_groups: vec!["all".to_owned()],
            chart_type: ChartType::Yearly,
            metric: Metric::Asmr,
            standard_population: StandardPopulation::Who,
            chart_style: ChartStyle::Line,
            date_from: None,
            date_to: None,
            slider_start: None,
            show_baseline: true,
            baseline_method: BaselineMethod::LinReg,
            baseline_from: None,
            baseline_to: None,
            show_prediction_interval: true,
            cumulative: false,
            show_percentage: false,
            show_logarithmic: false,
        }
    }
}

impl ChartState {
    /// Value of a boolean field.
    #[must_use]
    pub fn flag(&self, field: Field) -> Option<bool> {
        match field {
            Field::ShowBaseline => Some(self.show_baseline),
            Field::ShowPredictionInterval => Some(self.show_prediction_interval),
            Field::Cumulative => Some(self.cumulative),
            Field::ShowPercentage => Some(self.show_percentage),
            Field::ShowLogarithmic => Some(self.show_logarithmic),
            _ => None,
        }
    }

    /// Value of a period-label field.
    #[must_use]
    pub fn period_label(&self, field: Field) -> Option<&str> {
        match field {
            Field::DateFrom => self.date_from.as_deref(),
            Field::DateTo => self.date_to.as_deref(),
            Field::SliderStart => self.slider_start.as_deref(),
            Field::BaselineFrom => self.baseline_from.as_deref(),
            Field::BaselineTo => self.baseline_to.as_deref(),
            _ => None,
        }
    }

    /// Assigns one field; period-label edits with `None` clear it.
    pub fn apply(&mut self, edit: &FieldEdit) {
        match edit {
            FieldEdit::Countries(value) => self.countries.clone_from(value),
            FieldEdit::AgeGroups(value) => self.age_groups.clone_from(value),
            FieldEdit::ChartType(value) => self.chart_type = *value,
            FieldEdit::Metric(value) => self.metric = *value,
            FieldEdit::StandardPopulation(value) => self.standard_population = *value,
            FieldEdit::ChartStyle(value) => self.chart_style = *value,
            FieldEdit::DateFrom(value) => self.date_from.clone_from(value),
            FieldEdit::DateTo(value) => self.date_to.clone_from(value),
            FieldEdit::SliderStart(value) => self.slider_start.clone_from(value),
            FieldEdit::ShowBaseline(value) => self.show_baseline = *value,
            FieldEdit::BaselineMethod(value) => self.baseline_method = *value,
            FieldEdit::BaselineFrom(value) => self.baseline_from.clone_from(value),
            FieldEdit::BaselineTo(value) => self.baseline_to.clone_from(value),
            FieldEdit::ShowPredictionInterval(value) => self.show_prediction_interval = *value,
            FieldEdit::Cumulative(value) => self.cumulative = *value,
            FieldEdit::ShowPercentage(value) => self.show_percentage = *value,
            FieldEdit::ShowLogarithmic(value) => self.show_logarithmic = *value,
        }
    }

    /// Fields whose values differ between `self` and `other`.
    #[must_use]
    pub fn diff(&self, other: &Self) -> BTreeSet<Field> {
        let checks = [
            (Field::Countries, self.countries != other.countries),
            (Field::AgeGroups, self.age_groups != other.age_groups),
            (Field::ChartType, self.chart_type != other.chart_type),
            (Field::Metric, self.metric != other.metric),
            (
                Field::StandardPopulation,
                self.standard_population != other.standard_population,
            ),
            (Field::ChartStyle, self.chart_style != other.chart_style),
            (Field::DateFrom, self.date_from != other.date_from),
            (Field::DateTo, self.date_to != other.date_to),
            (Field::SliderStart, self.slider_start != other.slider_start),
            (Field::ShowBaseline, self.show_baseline != other.show_baseline),
            (Field::BaselineMethod, self.baseline_method != other.baseline_method),
            (Field::BaselineFrom, self.baseline_from != other.baseline_from),
            (Field::BaselineTo, self.baseline_to != other.baseline_to),
            (
                Field::ShowPredictionInterval,
                self.show_prediction_interval != other.show_prediction_interval,
            ),
            (Field::Cumulative, self.cumulative != other.cumulative),
            (Field::ShowPercentage, self.show_percentage != other.show_percentage),
            (Field::ShowLogarithmic, self.show_logarithmic != other.show_logarithmic),
        ];
        checks
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect()
    }
}

/// One field assignment. Period-label edits with `None` clear the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldEdit {
    Countries(Vec<String>),
    AgeGroups(Vec<String>),
    ChartType(ChartType),
    Metric(Metric),
    StandardPopulation(StandardPopulation),
    ChartStyle(ChartStyle),
    DateFrom(Option<String>),
    DateTo(Option<String>),
    SliderStart(Option<String>),
    ShowBaseline(bool),
    BaselineMethod(BaselineMethod),
    BaselineFrom(Option<String>),
    BaselineTo(Option<String>),
    ShowPredictionInterval(bool),
    Cumulative(bool),
    ShowPercentage(bool),
    ShowLogarithmic(bool),
}

impl FieldEdit {
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Countries(_) => Field::Countries,
            Self::AgeGroups(_) => Field::AgeGroups,
            Self::ChartType(_) => Field::ChartType,
            Self::Metric(_) => Field::Metric,
            Self::StandardPopulation(_) => Field::StandardPopulation,
            Self::ChartStyle(_) => Field::ChartStyle,
            Self::DateFrom(_) => Field::DateFrom,
            Self::DateTo(_) => Field::DateTo,
            Self::SliderStart(_) => Field::SliderStart,
            Self::ShowBaseline(_) => Field::ShowBaseline,
            Self::BaselineMethod(_) => Field::BaselineMethod,
            Self::BaselineFrom(_) => Field::BaselineFrom,
            Self::BaselineTo(_) => Field::BaselineTo,
            Self::ShowPredictionInterval(_) => Field::ShowPredictionInterval,
            Self::Cumulative(_) => Field::Cumulative,
            Self::ShowPercentage(_) => Field::ShowPercentage,
            Self::ShowLogarithmic(_) => Field::ShowLogarithmic,
        }
    }

    /// Edit assigning `value` to a boolean field.
    #[must_use]
    pub fn flag(field: Field, value: bool) -> Option<Self> {
        match field {
            Field::ShowBaseline => Some(Self::ShowBaseline(value)),
            Field::ShowPredictionInterval => Some(Self::ShowPredictionInterval(value)),
            Field::Cumulative => Some(Self::Cumulative(value)),
            Field::ShowPercentage => Some(Self::ShowPercentage(value)),
            Field::ShowLogarithmic => Some(Self::ShowLogarithmic(value)),
            _ => None,
        }
    }

    /// Edit assigning `value` to a period-label field.
    #[must_use]
    pub fn period_label(field: Field, value: Option<String>) -> Option<Self> {
        match field {
            Field::DateFrom => Some(Self::DateFrom(value)),
            Field::DateTo => Some(Self::DateTo(value)),
            Field::SliderStart => Some(Self::SliderStart(value)),
            Field::BaselineFrom => Some(Self::BaselineFrom(value)),
            Field::BaselineTo => Some(Self::BaselineTo(value)),
            _ => None,
        }
    }
}

/// Sparse field assignments: view defaults and raw user overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartPatch {
    pub countries: Option<Vec<String>>,
    pub age_groups: Option<Vec<String>>,
    pub chart_type: Option<ChartType>,
    pub metric: Option<Metric>,
    pub standard_population: Option<StandardPopulation>,
    pub chart_style: Option<ChartStyle>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub slider_start: Option<String>,
    pub show_baseline: Option<bool>,
    pub baseline_method: Option<BaselineMethod>,
    pub baseline_from: Option<String>,
    pub baseline_to: Option<String>,
    pub show_prediction_interval: Option<bool>,
    pub cumulative: Option<bool>,
    pub show_percentage: Option<bool>,
    pub show_logarithmic: Option<bool>,
}

impl ChartPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, edit: FieldEdit) -> Self {
        self.set(edit);
        self
    }

    /// Fields this patch assigns.
    #[must_use]
    pub fn fields(&self) -> BTreeSet<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.contains(*field))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        match field {
            Field::Countries => self.countries.is_some(),
            Field::AgeGroups => self.age_groups.is_some(),
            Field::ChartType => self.chart_type.is_some(),
            Field::Metric => self.metric.is_some(),
            Field::StandardPopulation => self.standard_population.is_some(),
            Field::ChartStyle => self.chart_style.is_some(),
            Field::DateFrom => self.date_from.is_some(),
            Field::DateTo => self.date_to.is_some(),
            Field::SliderStart => self.slider_start.is_some(),
            Field::ShowBaseline => self.show_baseline.is_some(),
            Field::BaselineMethod => self.baseline_method.is_some(),
            Field::BaselineFrom => self.baseline_from.is_some(),
            Field::BaselineTo => self.baseline_to.is_some(),
            Field::ShowPredictionInterval => self.show_prediction_interval.is_some(),
            Field::Cumulative => self.cumulative.is_some(),
            Field::ShowPercentage => self.show_percentage.is_some(),
            Field::ShowLogarithmic => self.show_logarithmic.is_some(),
        }
    }

    /// Assigned value of a period-label field.
    #[must_use]
    pub fn period_label(&self, field: Field) -> Option<&str> {
        match field {
            Field::DateFrom => self.date_from.as_deref(),
            Field::DateTo => self.date_to.as_deref(),
            Field::SliderStart => self.slider_start.as_deref(),
            Field::BaselineFrom => self.baseline_from.as_deref(),
            Field::BaselineTo => self.baseline_to.as_deref(),
            _ => None,
        }
    }

    /// Records an assignment; clearing a period label drops the entry.
    pub fn set(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::Countries(value) => self.countries = Some(value),
            FieldEdit::AgeGroups(value) => self.age_groups = Some(value),
            FieldEdit::ChartType(value) => self.chart_type = Some(value),
            FieldEdit::Metric(value) => self.metric = Some(value),
            FieldEdit::StandardPopulation(value) => self.standard_population = Some(value),
            FieldEdit::ChartStyle(value) => self.chart_style = Some(value),
            FieldEdit::DateFrom(value) => self.date_from = value,
            FieldEdit::DateTo(value) => self.date_to = value,
            FieldEdit::SliderStart(value) => self.slider_start = value,
            FieldEdit::ShowBaseline(value) => self.show_baseline = Some(value),
            FieldEdit::BaselineMethod(value) => self.baseline_method = Some(value),
            FieldEdit::BaselineFrom(value) => self.baseline_from = value,
            FieldEdit::BaselineTo(value) => self.baseline_to = value,
            FieldEdit::ShowPredictionInterval(value) => {
                self.show_prediction_interval = Some(value);
            }
            FieldEdit::Cumulative(value) => self.cumulative = Some(value),
            FieldEdit::ShowPercentage(value) => self.show_percentage = Some(value),
            FieldEdit::ShowLogarithmic(value) => self.show_logarithmic = Some(value),
        }
    }

    pub fn remove(&mut self, field: Field) {
        match field {
            Field::Countries => self.countries = None,
            Field::AgeGroups => self.age_groups = None,
            Field::ChartType => self.chart_type = None,
            Field::Metric => self.metric = None,
            Field::StandardPopulation => self.standard_population = None,
            Field::ChartStyle => self.chart_style = None,
            Field::DateFrom => self.date_from = None,
            Field::DateTo => self.date_to = None,
            Field::SliderStart => self.slider_start = None,
            Field::ShowBaseline => self.show_baseline = None,
            Field::BaselineMethod => self.baseline_method = None,
            Field::BaselineFrom => self.baseline_from = None,
            Field::BaselineTo => self.baseline_to = None,
            Field::ShowPredictionInterval => self.show_prediction_interval = None,
            Field::Cumulative => self.cumulative = None,
            Field::ShowPercentage => self.show_percentage = None,
            Field::ShowLogarithmic => self.show_logarithmic = None,
        }
    }

    /// Writes every assigned field into `state`.
    pub fn apply_to(&self, state: &mut ChartState) {
        if let Some(value) = &self.countries {
            state.countries.clone_from(value);
        }
        if let Some(value) = &self.age_groups {
            state.age_groups.clone_from(value);
        }
        if let Some(value) = self.chart_type {
            state.chart_type = value;
        }
        if let Some(value) = self.metric {
            state.metric = value;
        }
        if let Some(value) = self.standard_population {
            state.standard_population = value;
        }
        if let Some(value) = self.chart_style {
            state.chart_style = value;
        }
        if let Some(value) = &self.date_from {
            state.date_from = Some(value.clone());
        }
        if let Some(value) = &self.date_to {
            state.date_to = Some(value.clone());
        }
        if let Some(value) = &self.slider_start {
            state.slider_start = Some(value.clone());
        }
        if let Some(value) = self.show_baseline {
            state.show_baseline = value;
        }
        if let Some(value) = self.baseline_method {
            state.baseline_method = value;
        }
        if let Some(value) = &self.baseline_from {
            state.baseline_from = Some(value.clone());
        }
        if let Some(value) = &self.baseline_to {
            state.baseline_to = Some(value.clone());
        }
        if let Some(value) = self.show_prediction_interval {
            state.show_prediction_interval = value;
        }
        if let Some(value) = self.cumulative {
            state.cumulative = value;
        }
        if let Some(value) = self.show_percentage {
            state.show_percentage = value;
        }
        if let Some(value) = self.show_logarithmic {
            state.show_logarithmic = value;
        }
    }

    /// Keeps only the fields `keep` accepts.
    pub fn retain(&mut self, keep: impl Fn(Field) -> bool) {
        for field in Field::ALL {
            if !keep(field) {
                self.remove(field);
            }
        }
    }
}
