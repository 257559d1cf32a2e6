use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

use super::ChartState;

/// Public session bootstrap configuration.
///
/// This type is serializable so host applications can persist/load their
/// defaults without inventing their own ad-hoc format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fetches shorter than this never show the loading overlay.
    #[serde(default = "default_loading_indicator_delay_ms")]
    pub loading_indicator_delay_ms: u64,
    /// Upper bound on constraint passes per resolution.
    #[serde(default = "default_max_constraint_passes")]
    pub max_constraint_passes: usize,
    /// Field values of the base (mortality) view.
    #[serde(default)]
    pub base_defaults: ChartState,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loading_indicator_delay_ms: default_loading_indicator_delay_ms(),
            max_constraint_passes: default_max_constraint_passes(),
            base_defaults: ChartState::default(),
        }
    }

    #[must_use]
    pub fn with_loading_indicator_delay_ms(mut self, delay_ms: u64) -> Self {
        self.loading_indicator_delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn with_max_constraint_passes(mut self, passes: usize) -> Self {
        self.max_constraint_passes = passes;
        self
    }

    /// Replaces the base view's field defaults.
    #[must_use]
    pub fn with_base_defaults(mut self, defaults: ChartState) -> Self {
        self.base_defaults = defaults;
        self
    }

    #[must_use]
    pub fn loading_indicator_delay(&self) -> Duration {
        Duration::from_millis(self.loading_indicator_delay_ms)
    }

    pub fn validate(self) -> ChartResult<Self> {
        if self.max_constraint_passes == 0 {
            return Err(ChartError::InvalidData(
                "max constraint passes must be > 0".to_owned(),
            ));
        }
        if self.base_defaults.countries.is_empty() {
            return Err(ChartError::InvalidData(
                "base defaults must select at least one country".to_owned(),
            ));
        }
        if self.base_defaults.age_groups.is_empty() {
            return Err(ChartError::InvalidData(
                "base defaults must select at least one age group".to_owned(),
            ));
        }
        Ok(self)
    }

    /// Serializes config to pretty JSON for debug/config files.
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    /// Deserializes and validates config from JSON.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))?;
        config.validate()
    }
}

fn default_loading_indicator_delay_ms() -> u64 {
    500
}

fn default_max_constraint_passes() -> usize {
    8
}
