use serde::{Deserialize, Serialize};

use crate::foundation::time::Instant;

/// A WGS84 coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Metrics derived from a trackpoint and its immediate predecessor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetrics {
    /// Instantaneous speed in km/h.
    pub speed_kmh: f64,
    /// Initial bearing in degrees, `[0, 360)`.
    pub bearing_deg: f64,
    /// Absolute longitudinal acceleration in multiples of standard gravity.
    pub g_force: f64,
    /// Metres climbed since the previous trackpoint (never negative).
    pub elevation_gain_m: f64,
    /// Metres climbed since the start of the sequence.
    pub total_elevation_gain_m: f64,
    /// Great-circle distance from the previous trackpoint in metres.
    pub distance_m: f64,
}

/// One timestamped activity sample.
///
/// `metrics` stays `None` until [`crate::telemetry::metrics::annotate`] has run, and remains `None`
/// for samples without coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trackpoint {
    pub coords: Option<LatLon>,
    pub time: Instant,
    pub elevation_m: Option<f64>,
    #[serde(default)]
    pub metrics: Option<TrackMetrics>,
}

impl Trackpoint {
    pub fn new(time: Instant, coords: Option<LatLon>) -> Self {
        Self {
            coords,
            time,
            elevation_m: None,
            metrics: None,
        }
    }

    pub fn with_elevation(mut self, elevation_m: Option<f64>) -> Self {
        self.elevation_m = elevation_m;
        self
    }

    pub fn has_coords(&self) -> bool {
        self.coords.is_some()
    }
}

/// Bounding box of a set of coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}
