use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Shape of the labels produced by one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelFormat {
    /// `YYYY`
    Year,
    /// `YYYY/YY`, a twelve month period spanning two calendar years.
    Season,
    /// `YYYY QN`
    Quarter,
    /// `YYYY Mon`
    Month,
    /// `YYYY-WNN` (ISO week)
    Week,
}

/// Time bucketing of a mortality series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ChartType {
    #[default]
    #[serde(rename = "yearly")]
    Yearly,
    #[serde(rename = "midyear")]
    MidYear,
    #[serde(rename = "fluseason")]
    FluSeason,
    #[serde(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "weekly_13w_sma")]
    Weekly13WSma,
    #[serde(rename = "weekly_26w_sma")]
    Weekly26WSma,
    #[serde(rename = "weekly_52w_sma")]
    Weekly52WSma,
    #[serde(rename = "weekly_104w_sma")]
    Weekly104WSma,
}

impl ChartType {
    pub const ALL: [Self; 10] = [
        Self::Yearly,
        Self::MidYear,
        Self::FluSeason,
        Self::Quarterly,
        Self::Monthly,
        Self::Weekly,
        Self::Weekly13WSma,
        Self::Weekly26WSma,
        Self::Weekly52WSma,
        Self::Weekly104WSma,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yearly => "yearly",
            Self::MidYear => "midyear",
            Self::FluSeason => "fluseason",
            Self::Quarterly => "quarterly",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Weekly13WSma => "weekly_13w_sma",
            Self::Weekly26WSma => "weekly_26w_sma",
            Self::Weekly52WSma => "weekly_52w_sma",
            Self::Weekly104WSma => "weekly_104w_sma",
        }
    }

    #[must_use]
    pub const fn label_format(self) -> LabelFormat {
        match self {
            Self::Yearly => LabelFormat::Year,
            Self::MidYear | Self::FluSeason => LabelFormat::Season,
            Self::Quarterly => LabelFormat::Quarter,
            Self::Monthly => LabelFormat::Month,
            Self::Weekly
            | Self::Weekly13WSma
            | Self::Weekly26WSma
            | Self::Weekly52WSma
            | Self::Weekly104WSma => LabelFormat::Week,
        }
    }

    /// Trailing moving-average window in weeks, if any.
    #[must_use]
    pub const fn moving_average_window(self) -> Option<usize> {
        match self {
            Self::Weekly13WSma => Some(13),
            Self::Weekly26WSma => Some(26),
            Self::Weekly52WSma => Some(52),
            Self::Weekly104WSma => Some(104),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_weekly(self) -> bool {
        matches!(self.label_format(), LabelFormat::Week)
    }

    #[must_use]
    pub const fn is_season(self) -> bool {
        matches!(self.label_format(), LabelFormat::Season)
    }

    /// Calendar month in which a season label's period begins.
    ///
    /// Non-season granularities report July so a stray `YYYY/YY` label still
    /// gets a deterministic position.
    #[must_use]
    pub const fn season_start_month(self) -> u32 {
        match self {
            Self::FluSeason => 10,
            _ => 7,
        }
    }

    /// Earliest label visible without extended time-period access.
    ///
    /// Season labels begin in the previous calendar year, so the season that
    /// covers the start of 2000 is `1999/00`.
    #[must_use]
    pub fn year_2000_floor(self) -> String {
        match self.label_format() {
            LabelFormat::Year => "2000".to_owned(),
            LabelFormat::Season => "1999/00".to_owned(),
            LabelFormat::Quarter => "2000 Q1".to_owned(),
            LabelFormat::Month => "2000 Jan".to_owned(),
            LabelFormat::Week => "2000-W01".to_owned(),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(value: &str) -> ChartResult<Self> {
        Self::ALL
            .into_iter()
            .find(|chart_type| chart_type.as_str() == value)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown chart type `{value}`")))
    }
}
