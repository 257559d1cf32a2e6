use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::period::{Period, leading_year, year_of};
use super::{DateRange, LabelBounds, PeriodIndex};

/// Gated product features checked through [`AccessPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Labels before the year-2000 floor.
    ExtendedTimePeriods,
}

impl Feature {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtendedTimePeriods => "extended_time_periods",
        }
    }
}

/// Access-tier collaborator.
pub trait AccessPolicy: Send + Sync {
    fn can_access(&self, feature: Feature) -> bool;
}

/// Grants every feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAccess;

impl AccessPolicy for FullAccess {
    fn can_access(&self, _feature: Feature) -> bool {
        true
    }
}

/// Grants no gated feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAccess;

impl AccessPolicy for BasicAccess {
    fn can_access(&self, _feature: Feature) -> bool {
        false
    }
}

/// Derives available, visible and selected label ranges.
///
/// Nothing is cached: every accessor recomputes from the borrowed inputs, so
/// a calculator can never disagree with the label set it was built from. An
/// empty index is normal while a fetch is in flight and degrades every
/// result to `None` or empty.
#[derive(Debug, Clone, Copy)]
pub struct RangeCalculator<'a> {
    index: &'a PeriodIndex,
    extended_access: bool,
    slider_start: Option<&'a str>,
    date_from: Option<&'a str>,
    date_to: Option<&'a str>,
}

impl<'a> RangeCalculator<'a> {
    #[must_use]
    pub fn new(index: &'a PeriodIndex, extended_access: bool) -> Self {
        Self {
            index,
            extended_access,
            slider_start: None,
            date_from: None,
            date_to: None,
        }
    }

    #[must_use]
    pub fn with_access(index: &'a PeriodIndex, access: &dyn AccessPolicy) -> Self {
        Self::new(index, access.can_access(Feature::ExtendedTimePeriods))
    }

    #[must_use]
    pub fn with_slider_start(mut self, slider_start: Option<&'a str>) -> Self {
        self.slider_start = slider_start;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, date_from: Option<&'a str>, date_to: Option<&'a str>) -> Self {
        self.date_from = date_from;
        self.date_to = date_to;
        self
    }

    #[must_use]
    pub fn index(&self) -> &'a PeriodIndex {
        self.index
    }

    #[must_use]
    pub fn available_range(&self) -> Option<LabelBounds> {
        Some(LabelBounds {
            min: self.index.first()?.to_owned(),
            max: self.index.last()?.to_owned(),
        })
    }

    /// Earliest selectable label, raised to the year-2000 floor for callers
    /// without extended access.
    #[must_use]
    pub fn effective_min_date(&self) -> Option<String> {
        let min = self.index.first()?;
        if self.extended_access {
            return Some(min.to_owned());
        }

        let floor = self.index.chart_type().year_2000_floor();
        match self.index.compare(min, &floor) {
            Some(Ordering::Less) => Some(floor),
            _ => Some(min.to_owned()),
        }
    }

    /// Labels from the slider start onwards, floored for basic access.
    #[must_use]
    pub fn visible_labels(&self) -> Vec<&'a str> {
        let start = self
            .slider_start
            .and_then(|label| self.index.position(label))
            .unwrap_or(0);
        let labels = self.index.iter().skip(start);

        if self.extended_access {
            return labels.collect();
        }

        let floor = self.floor_ordinal();
        labels
            .filter(|label| match (self.index.ordinal_of(label), floor) {
                (Some(ordinal), Some(floor)) => ordinal >= floor,
                _ => true,
            })
            .collect()
    }

    #[must_use]
    pub fn is_valid_date(&self, label: &str) -> bool {
        self.visible_labels().iter().any(|visible| *visible == label)
    }

    /// Best visible label sharing `date`'s leading year.
    ///
    /// `date` may come from another granularity. Without a label in that
    /// year, the chronologically nearest year present is used (later year on
    /// ties). `prefer_last` picks the year's last label instead of its first.
    #[must_use]
    pub fn match_date_to_label(&self, date: &str, prefer_last: bool) -> Option<&'a str> {
        let visible = self.visible_labels();
        if visible.is_empty() {
            return None;
        }

        let year = year_of(date);
        let pick = |year: &str| {
            let mut same_year = visible.iter().copied().filter(|label| year_of(label) == year);
            if prefer_last { same_year.last() } else { same_year.next() }
        };
        if let Some(label) = pick(year) {
            return Some(label);
        }

        let target = leading_year(date)?;
        let nearest = visible
            .iter()
            .filter_map(|label| leading_year(label))
            .min_by_key(|candidate| ((candidate - target).abs(), -candidate))?;
        pick(&format!("{nearest:04}"))
    }

    /// Whole visible span, or the empty range without labels.
    #[must_use]
    pub fn default_range(&self) -> DateRange {
        let visible = self.visible_labels();
        match (visible.first(), visible.last()) {
            (Some(first), Some(last)) => DateRange::new(*first, *last),
            _ => DateRange::empty(),
        }
    }

    /// Range the chart displays for the current selection.
    ///
    /// Unset endpoints take the default range; endpoints that are not visible
    /// labels are remapped year-preservingly. The selection itself is never
    /// written back, so untouched dates stay out of the query string.
    #[must_use]
    pub fn selected_range(&self) -> DateRange {
        let default = self.default_range();
        if default.is_empty() {
            return default;
        }

        let from = self.resolve_endpoint(self.date_from, false, &default.from);
        let to = self.resolve_endpoint(self.date_to, true, &default.to);
        DateRange::new(from, to).ordered(self.index)
    }

    /// Moves a range from another granularity onto this label set.
    #[must_use]
    pub fn remap_range(&self, range: &DateRange) -> Option<DateRange> {
        let from = self.match_date_to_label(&range.from, false)?;
        let to = self.match_date_to_label(&range.to, true)?;
        Some(DateRange::new(from, to).ordered(self.index))
    }

    fn resolve_endpoint(&self, date: Option<&str>, prefer_last: bool, default: &str) -> String {
        match date {
            Some(date) if self.is_valid_date(date) => date.to_owned(),
            Some(date) => self
                .match_date_to_label(date, prefer_last)
                .unwrap_or(default)
                .to_owned(),
            None => default.to_owned(),
        }
    }

    fn floor_ordinal(&self) -> Option<i64> {
        let chart_type = self.index.chart_type();
        Period::parse(&chart_type.year_2000_floor(), chart_type.season_start_month())
            .map(Period::ordinal)
    }
}
