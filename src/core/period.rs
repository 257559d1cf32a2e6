use std::fmt;

use chrono::{Datelike, Month, NaiveDate, Weekday};

use super::{ChartType, LabelFormat};

/// A parsed period label with its chronological position.
///
/// Periods are only built through the checked constructors, so every value
/// formats back to a canonical label and owns a real calendar start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    format: LabelFormat,
    year: i32,
    sub: u32,
    start: NaiveDate,
}

impl Period {
    #[must_use]
    pub fn year(year: i32) -> Option<Self> {
        Self::build(LabelFormat::Year, year, 0, NaiveDate::from_ymd_opt(year, 1, 1)?)
    }

    /// Season starting in `start_year` (label `start_year/(start_year + 1)`).
    #[must_use]
    pub fn season(start_year: i32, season_start_month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(start_year, season_start_month, 1)?;
        Self::build(LabelFormat::Season, start_year, 0, start)
    }

    #[must_use]
    pub fn quarter(year: i32, quarter: u32) -> Option<Self> {
        if !(1..=4).contains(&quarter) {
            return None;
        }
        let start = NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)?;
        Self::build(LabelFormat::Quarter, year, quarter, start)
    }

    #[must_use]
    pub fn month(year: i32, month: u32) -> Option<Self> {
        Self::build(
            LabelFormat::Month,
            year,
            month,
            NaiveDate::from_ymd_opt(year, month, 1)?,
        )
    }

    /// ISO week; week 53 only exists in long ISO years.
    #[must_use]
    pub fn week(year: i32, week: u32) -> Option<Self> {
        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
        Self::build(LabelFormat::Week, year, week, start)
    }

    fn build(format: LabelFormat, year: i32, sub: u32, start: NaiveDate) -> Option<Self> {
        (0..=9999).contains(&year).then_some(Self {
            format,
            year,
            sub,
            start,
        })
    }

    /// Parses any supported label format.
    ///
    /// Only canonical spellings are accepted (`2020 Jan`, not `2020 jan` or
    /// `2020 January`); `season_start_month` positions `YYYY/YY` labels.
    #[must_use]
    pub fn parse(label: &str, season_start_month: u32) -> Option<Self> {
        let year = parse_digits(label.get(..4)?)?;
        let year = i32::try_from(year).ok()?;
        let rest = label.get(4..)?;

        let period = if rest.is_empty() {
            Self::year(year)?
        } else if let Some(next) = rest.strip_prefix('/') {
            let next = parse_digits(next)?;
            if next != (year + 1).rem_euclid(100).unsigned_abs() {
                return None;
            }
            Self::season(year, season_start_month)?
        } else if let Some(quarter) = rest.strip_prefix(" Q") {
            Self::quarter(year, parse_digits(quarter)?)?
        } else if let Some(week) = rest.strip_prefix("-W") {
            Self::week(year, parse_digits(week)?)?
        } else if let Some(month) = rest.strip_prefix(' ') {
            let month = month.parse::<Month>().ok()?;
            Self::month(year, month.number_from_month())?
        } else {
            return None;
        };

        (period.label() == label).then_some(period)
    }

    /// Parses `label`, requiring a specific label format.
    #[must_use]
    pub fn parse_as(label: &str, format: LabelFormat, season_start_month: u32) -> Option<Self> {
        Self::parse(label, season_start_month).filter(|period| period.format == format)
    }

    /// First period of `year` in the given format.
    #[must_use]
    pub fn first_of_year(format: LabelFormat, year: i32, season_start_month: u32) -> Option<Self> {
        match format {
            LabelFormat::Year => Self::year(year),
            LabelFormat::Season => Self::season(year, season_start_month),
            LabelFormat::Quarter => Self::quarter(year, 1),
            LabelFormat::Month => Self::month(year, 1),
            LabelFormat::Week => Self::week(year, 1),
        }
    }

    /// Last period of `year` in the given format.
    #[must_use]
    pub fn last_of_year(format: LabelFormat, year: i32, season_start_month: u32) -> Option<Self> {
        match format {
            LabelFormat::Year => Self::year(year),
            LabelFormat::Season => Self::season(year, season_start_month),
            LabelFormat::Quarter => Self::quarter(year, 4),
            LabelFormat::Month => Self::month(year, 12),
            LabelFormat::Week => {
                let last_week = NaiveDate::from_ymd_opt(year, 12, 28)?.iso_week().week();
                Self::week(year, last_week)
            }
        }
    }

    #[must_use]
    pub const fn format(self) -> LabelFormat {
        self.format
    }

    /// Leading calendar year (the season's first year for `YYYY/YY`).
    #[must_use]
    pub const fn leading_year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn start_date(self) -> NaiveDate {
        self.start
    }

    /// Day number of the period start; orders and measures distance between
    /// periods of any format.
    #[must_use]
    pub fn ordinal(self) -> i64 {
        i64::from(self.start.num_days_from_ce())
    }

    #[must_use]
    pub fn label(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self.year;
        match self.format {
            LabelFormat::Year => write!(f, "{year:04}"),
            LabelFormat::Season => write!(f, "{year:04}/{:02}", (year + 1).rem_euclid(100)),
            LabelFormat::Quarter => write!(f, "{year:04} Q{}", self.sub),
            LabelFormat::Month => {
                let name = Month::try_from(self.start.month() as u8)
                    .map(|month| month.name())
                    .unwrap_or("Jan");
                write!(f, "{year:04} {}", name.get(..3).unwrap_or(name))
            }
            LabelFormat::Week => write!(f, "{year:04}-W{:02}", self.sub),
        }
    }
}

/// Leading four-character year component of a label, whatever its format.
#[must_use]
pub fn year_of(label: &str) -> &str {
    label.get(..4).unwrap_or(label)
}

/// Numeric leading year of a label, if it starts with four digits.
#[must_use]
pub fn leading_year(label: &str) -> Option<i32> {
    parse_digits(label.get(..4)?).and_then(|year| i32::try_from(year).ok())
}

fn parse_digits(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Moves `label` onto `chart_type`'s label format, keeping its leading year.
///
/// Labels already in the target format are returned unchanged; otherwise the
/// first (or, with `prefer_last`, the last) period of the year is used.
#[must_use]
pub fn convert_label(label: &str, chart_type: ChartType, prefer_last: bool) -> Option<String> {
    let format = chart_type.label_format();
    let season_start = chart_type.season_start_month();
    if Period::parse_as(label, format, season_start).is_some() {
        return Some(label.to_owned());
    }

    let year = leading_year(label)?;
    let period = if prefer_last {
        Period::last_of_year(format, year, season_start)
    } else {
        Period::first_of_year(format, year, season_start)
    };
    period.map(Period::label)
}
