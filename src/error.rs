use thiserror::Error;

use crate::core::ChartType;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    /// Closest-label lookup on a period index without labels.
    #[error("period index is empty")]
    EmptyIndex,

    #[error("label `{label}` does not match the {chart_type} label format")]
    InvalidLabel { label: String, chart_type: ChartType },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Dataset or aggregation collaborator failed; carried unchanged to the caller.
    #[error("transport failure: {0}")]
    Transport(String),
}
