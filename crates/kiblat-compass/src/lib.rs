//! Kiblat Compass
//!
//! Qibla direction finding: the great-circle bearing from the observer to the
//! Kaaba, combined with a smoothed device heading to produce a needle angle.
//!
//! # Example
//! ```rust,ignore
//! use kiblat_compass::{
//!     CompassConfig, CompassSession, CompassState, Coordinates, EventOrientation, FixedPosition,
//! };
//!
//! let positions = FixedPosition::new(Coordinates::new(-6.2, 106.8));
//! let sensor = EventOrientation::unsupported();
//! let mut session = CompassSession::new(CompassConfig::default())?;
//! let mut surface = |state: &CompassState| println!("{:?}", state.needle());
//! smol::block_on(session.run(&positions, &sensor, &mut surface));
//! ```

pub mod bearing;
pub mod config;
pub mod geo;
pub mod geolocation;
pub mod heading;
pub mod locale;
pub mod needle;
pub mod sensor;
pub mod session;
pub mod simulated;
pub mod smoothing;

pub use bearing::{Bearing, distance_km, initial_bearing, qibla_bearing};
pub use config::{CompassConfig, DemoConfig, SmoothingConfig};
pub use geo::{Coordinates, KAABA};
pub use geolocation::{FakePosition, FixedPosition, PositionError, PositionProvider};
pub use heading::{HeadingSample, HeadingSource, HeadingTracker, SmoothedHeading};
pub use locale::Locale;
pub use needle::{NeedleRotation, needle_rotation};
pub use sensor::{
    DeviceOrientation, EventOrientation, FakeOrientation, OrientationProvider, PermissionOutcome,
    SensorCapability, Subscription,
};
pub use session::{CompassSession, CompassState, RenderSurface};
pub use simulated::SimulatedOrientation;
pub use smoothing::{HeadingFilter, SmoothingMode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compass error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompassError {
    #[error("Position unavailable: {0}")]
    PositionUnavailable(#[from] PositionError),

    #[error("Orientation sensor not supported")]
    SensorUnsupported,

    #[error("Orientation permission denied")]
    PermissionDenied,

    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CompassError {
    /// Message shown to the user for this error.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        locale.error_message(self)
    }
}
