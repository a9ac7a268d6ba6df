//! Needle rotation and compass dial

use crate::bearing::Bearing;
use crate::heading::{HeadingSource, SmoothedHeading};

/// Number of ticks on the dial
pub const DIAL_TICKS: usize = 72;

/// Every n-th tick is a major tick
const MAJOR_TICK_EVERY: usize = 9;

/// Angle applied to the needle, relative to the top of the device
///
/// Not wrapped: the raw difference may fall outside `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleRotation {
    degrees: f64,
    source: HeadingSource,
}

impl NeedleRotation {
    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    /// Rotation wrapped into `[0, 360)`
    pub fn normalized(&self) -> f64 {
        self.degrees.rem_euclid(360.0)
    }

    /// Source of the heading the rotation was derived from
    pub fn source(&self) -> HeadingSource {
        self.source
    }

    /// CSS transform value, e.g. `rotate(-12.5deg)`
    pub fn css_transform(&self) -> String {
        format!("rotate({}deg)", self.degrees)
    }
}

/// Combine bearing and heading; `None` unless both are known.
pub fn needle_rotation(
    bearing: Option<Bearing>,
    heading: Option<SmoothedHeading>,
) -> Option<NeedleRotation> {
    let bearing = bearing?;
    let heading = heading?;
    Some(NeedleRotation {
        degrees: bearing.degrees() - heading.degrees,
        source: heading.source,
    })
}

/// Dial tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub degrees: f64,
    pub major: bool,
}

/// Ticks every 5°, starting at north.
pub fn dial_ticks() -> impl Iterator<Item = Tick> {
    let step = 360.0 / DIAL_TICKS as f64;
    (0..DIAL_TICKS).map(move |i| Tick {
        degrees: i as f64 * step,
        major: i % MAJOR_TICK_EVERY == 0,
    })
}

/// Cardinal point at exactly this angle, if any
pub fn cardinal_label(degrees: f64) -> Option<&'static str> {
    match degrees.rem_euclid(360.0) {
        d if d == 0.0 => Some("N"),
        d if d == 90.0 => Some("E"),
        d if d == 180.0 => Some("S"),
        d if d == 270.0 => Some("W"),
        _ => None,
    }
}
