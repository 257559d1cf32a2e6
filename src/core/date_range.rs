use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::PeriodIndex;

/// Inclusive label range, `from <= to` chronologically.
///
/// The empty range (`""`, `""`) stands for "no labels available yet".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

impl DateRange {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }

    /// Returns the range with endpoints swapped if `to` precedes `from`.
    #[must_use]
    pub fn ordered(self, index: &PeriodIndex) -> Self {
        match index.compare(&self.from, &self.to) {
            Some(Ordering::Greater) => Self {
                from: self.to,
                to: self.from,
            },
            _ => self,
        }
    }

    #[must_use]
    pub fn is_inverted(&self, index: &PeriodIndex) -> bool {
        matches!(index.compare(&self.from, &self.to), Some(Ordering::Greater))
    }
}

/// First and last label of a label sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBounds {
    pub min: String,
    pub max: String,
}
