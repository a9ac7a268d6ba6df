//! Compass configuration

use serde::{Deserialize, Serialize};

use crate::CompassError;
use crate::geo::{Coordinates, KAABA};
use crate::locale::Locale;
use crate::smoothing::{DEFAULT_ALPHA, HeadingFilter, SmoothingMode};

/// Compass configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompassConfig {
    /// Point the needle aims at
    pub target: Coordinates,

    /// Heading smoothing
    pub smoothing: SmoothingConfig,

    /// Substitute a simulated heading when no sensor can be read
    pub demo_fallback: bool,

    /// Simulated heading parameters
    pub demo: DemoConfig,

    /// Language for user-facing messages
    pub locale: Locale,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            target: KAABA,
            smoothing: SmoothingConfig::default(),
            demo_fallback: false,
            demo: DemoConfig::default(),
            locale: Locale::default(),
        }
    }
}

/// Smoothing options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of each new sample, in `(0, 1]`
    pub alpha: f64,
    pub mode: SmoothingMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            mode: SmoothingMode::Linear,
        }
    }
}

impl SmoothingConfig {
    pub fn filter(&self) -> HeadingFilter {
        HeadingFilter::new(self.alpha, self.mode)
    }
}

/// Simulated heading options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Degrees added per tick
    pub step_degrees: f64,
    /// Tick period in milliseconds
    pub interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            step_degrees: 3.0,
            interval_ms: 50, // 20 Hz
        }
    }
}

impl CompassConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CompassError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CompassError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, CompassError> {
        serde_json::to_string_pretty(self).map_err(|e| CompassError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CompassError> {
        let alpha = self.smoothing.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(CompassError::InvalidConfig(format!(
                "smoothing.alpha must be in (0, 1], got {alpha}"
            )));
        }
        if self.demo.interval_ms == 0 {
            return Err(CompassError::InvalidConfig(
                "demo.interval_ms must be positive".into(),
            ));
        }
        if !self.demo.step_degrees.is_finite() {
            return Err(CompassError::InvalidConfig(
                "demo.step_degrees must be finite".into(),
            ));
        }
        Coordinates::validated(self.target.latitude, self.target.longitude)?;
        Ok(())
    }
}
