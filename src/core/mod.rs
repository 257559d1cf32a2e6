pub mod chart_type;
pub mod dataset;
pub mod date_range;
pub mod period;
pub mod period_index;
pub mod range_calculator;

pub use chart_type::{ChartType, LabelFormat};
pub use dataset::{CountrySeries, Dataset, derive_labels};
pub use date_range::{DateRange, LabelBounds};
pub use period::{Period, convert_label, leading_year, year_of};
pub use period_index::PeriodIndex;
pub use range_calculator::{AccessPolicy, BasicAccess, Feature, FullAccess, RangeCalculator};
