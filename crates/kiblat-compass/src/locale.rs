//! User-facing strings

use serde::{Deserialize, Serialize};

use crate::CompassError;
use crate::bearing::Bearing;
use crate::geo::Coordinates;
use crate::geolocation::PositionError;
use crate::heading::HeadingSource;
use crate::needle::{NeedleRotation, cardinal_label};

/// Display language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
}

impl Locale {
    pub fn error_message(self, error: &CompassError) -> &'static str {
        match (self, error) {
            (Self::Indonesian, CompassError::PositionUnavailable(PositionError::Unsupported)) => {
                "Geolocation tidak didukung oleh browser."
            }
            (Self::Indonesian, CompassError::PositionUnavailable(_)) => {
                "Tidak dapat mengakses lokasi. Mohon izinkan akses lokasi."
            }
            (Self::Indonesian, CompassError::SensorUnsupported) => {
                "Perangkat Anda tidak mendukung sensor orientasi."
            }
            (Self::Indonesian, CompassError::PermissionDenied) => {
                "Izin sensor orientasi ditolak. Aktifkan izin lalu muat ulang halaman."
            }
            (Self::Indonesian, CompassError::InvalidCoordinates { .. }) => "Koordinat tidak valid.",
            (Self::Indonesian, CompassError::InvalidConfig(_)) => "Konfigurasi tidak valid.",

            (Self::English, CompassError::PositionUnavailable(PositionError::Unsupported)) => {
                "Geolocation is not supported by this browser."
            }
            (Self::English, CompassError::PositionUnavailable(_)) => {
                "Unable to access your location. Please allow location access."
            }
            (Self::English, CompassError::SensorUnsupported) => {
                "Your device does not support the orientation sensor."
            }
            (Self::English, CompassError::PermissionDenied) => {
                "Orientation permission was denied. Allow it and reload the page."
            }
            (Self::English, CompassError::InvalidCoordinates { .. }) => "Invalid coordinates.",
            (Self::English, CompassError::InvalidConfig(_)) => "Invalid configuration.",
        }
    }

    pub fn locating(self) -> &'static str {
        match self {
            Self::Indonesian => "Mendapatkan lokasi Anda...",
            Self::English => "Getting your location...",
        }
    }

    pub fn location_line(self, coords: Coordinates) -> String {
        match self {
            Self::Indonesian => format!("Lokasi Anda: {coords}"),
            Self::English => format!("Your location: {coords}"),
        }
    }

    pub fn bearing_line(self, bearing: Bearing) -> String {
        match self {
            Self::Indonesian => format!("Arah Kiblat: {bearing} dari utara"),
            Self::English => format!("Qibla direction: {bearing} from north"),
        }
    }

    pub fn distance_line(self, km: f64) -> String {
        match self {
            Self::Indonesian => format!("Jarak ke Ka'bah: {km:.0} km"),
            Self::English => format!("Distance to the Kaaba: {km:.0} km"),
        }
    }

    /// Tag for headings that do not come from a real sensor
    pub fn simulated_tag(self) -> &'static str {
        match self {
            Self::Indonesian => "simulasi",
            Self::English => "simulated",
        }
    }

    /// Cardinal point at exactly this angle, if any
    pub fn cardinal(self, degrees: f64) -> Option<&'static str> {
        let label = cardinal_label(degrees)?;
        Some(match (self, label) {
            (Self::Indonesian, "N") => "U",
            (Self::Indonesian, "E") => "T",
            (Self::Indonesian, "W") => "B",
            (_, label) => label,
        })
    }

    /// One readout of the current heading and needle.
    pub fn frame_line(self, heading: f64, needle: NeedleRotation) -> String {
        let (heading_label, needle_label) = match self {
            Self::Indonesian => ("arah", "jarum"),
            Self::English => ("heading", "needle"),
        };
        let facing = self.cardinal(heading.round()).unwrap_or("-");
        let mut line = format!(
            "{heading_label} {heading:6.1}° {facing} {needle_label} {:7.1}° ({:5.1}°)",
            needle.degrees(),
            needle.normalized()
        );
        if needle.source() == HeadingSource::Simulated {
            line.push_str(&format!(" [{}]", self.simulated_tag()));
        }
        line
    }
}
