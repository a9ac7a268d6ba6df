//! Heading smoothing filter
//!
//! Fixed-coefficient exponential moving average over compass headings.
//!
//! `Linear` blends raw degree values and so treats 359° and 1° as far apart:
//! a jump across north drags the estimate through the opposite side of the
//! dial for a few samples. `Circular` averages unit vectors instead and
//! follows the short way round.

use serde::{Deserialize, Serialize};

/// Default weight of each new sample
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Averaging strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMode {
    /// `smoothed * (1 - alpha) + raw * alpha` on raw degrees
    #[default]
    Linear,
    /// Same blend applied to `(cos, sin)`, converted back with atan2
    Circular,
}

#[derive(Debug, Clone, Copy)]
enum FilterState {
    Empty,
    Linear(f64),
    Circular { cos: f64, sin: f64 },
}

/// Exponential moving average over headings in degrees
#[derive(Debug, Clone)]
pub struct HeadingFilter {
    alpha: f64,
    mode: SmoothingMode,
    state: FilterState,
}

impl Default for HeadingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, SmoothingMode::Linear)
    }
}

impl HeadingFilter {
    pub fn new(alpha: f64, mode: SmoothingMode) -> Self {
        Self {
            alpha,
            mode,
            state: FilterState::Empty,
        }
    }

    pub fn mode(&self) -> SmoothingMode {
        self.mode
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Feed one raw heading and return the updated estimate.
    ///
    /// The first sample initializes the estimate to its raw value.
    pub fn update(&mut self, raw: f64) -> f64 {
        let keep = 1.0 - self.alpha;
        self.state = match (self.mode, self.state) {
            (SmoothingMode::Linear, FilterState::Linear(prev)) => {
                FilterState::Linear(prev * keep + raw * self.alpha)
            }
            (SmoothingMode::Linear, _) => FilterState::Linear(raw),
            (SmoothingMode::Circular, FilterState::Circular { cos, sin }) => {
                let r = raw.to_radians();
                FilterState::Circular {
                    cos: cos * keep + r.cos() * self.alpha,
                    sin: sin * keep + r.sin() * self.alpha,
                }
            }
            (SmoothingMode::Circular, _) => {
                let r = raw.to_radians();
                FilterState::Circular {
                    cos: r.cos(),
                    sin: r.sin(),
                }
            }
        };
        // The state was just set, so a value is always present.
        self.value().unwrap_or(raw)
    }

    /// Current estimate, `None` before the first sample.
    pub fn value(&self) -> Option<f64> {
        match self.state {
            FilterState::Empty => None,
            FilterState::Linear(v) => Some(v),
            FilterState::Circular { cos, sin } => {
                Some(sin.atan2(cos).to_degrees().rem_euclid(360.0))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = FilterState::Empty;
    }
}
