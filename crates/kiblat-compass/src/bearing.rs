//! Great-circle bearing
//!
//! Initial bearing from the observer toward a target, measured clockwise
//! from true north.

use std::fmt;

use crate::geo::{Coordinates, KAABA};

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Below this, both atan2 operands count as zero
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Compass bearing in degrees, in `[0, 360)`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Bearing(f64);

impl Bearing {
    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Bearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

/// Initial great-circle bearing from `from` to `to`.
///
/// No range validation is applied. When the two points coincide the
/// direction is undefined and the bearing is reported as 0°.
pub fn initial_bearing(from: Coordinates, to: Coordinates) -> Bearing {
    let phi1 = from.latitude_rad();
    let phi2 = to.latitude_rad();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin();
    let x = phi1.cos() * phi2.tan() - phi1.sin() * delta_lambda.cos();

    if y.abs() < DEGENERATE_EPSILON && x.abs() < DEGENERATE_EPSILON {
        return Bearing(0.0);
    }

    let theta = y.atan2(x);
    Bearing((theta.to_degrees() + 360.0) % 360.0)
}

/// Bearing from the observer to the Kaaba.
pub fn qibla_bearing(observer: Coordinates) -> Bearing {
    initial_bearing(observer, KAABA)
}

/// Haversine distance in kilometers.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude_rad();
    let phi2 = to.latitude_rad();
    let dphi = (to.latitude - from.latitude).to_radians();
    let dlambda = (to.longitude - from.longitude).to_radians();

    let sin_dphi_2 = (dphi / 2.0).sin();
    let sin_dlambda_2 = (dlambda / 2.0).sin();
    let a = sin_dphi_2 * sin_dphi_2 + phi1.cos() * phi2.cos() * sin_dlambda_2 * sin_dlambda_2;

    EARTH_RADIUS_KM * 2.0 * a.sqrt().min(1.0).asin()
}
