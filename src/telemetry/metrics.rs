use serde::{Deserialize, Serialize};

use crate::{
    foundation::time::{Instant, secs_between},
    telemetry::model::{LatLon, TrackMetrics, Trackpoint},
};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const STANDARD_GRAVITY: f64 = 9.81;
const MS_TO_KMH: f64 = 3.6;

/// Great-circle distance in metres.
pub fn haversine_m(a: LatLon, b: LatLon) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` to `b` in degrees, normalized to `[0, 360)`.
pub fn bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let d_lon = (b.lon - a.lon).to_radians();
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if deg >= 360.0 { 0.0 } else { deg }
}

/// Acceleration between two speeds, in g.
///
/// Speeds are km/h; the delta is converted to m/s before dividing by standard gravity.
pub fn g_force(prev_speed_kmh: f64, speed_kmh: f64, dt_secs: f64) -> f64 {
    if dt_secs <= 0.0 {
        return 0.0;
    }
    let dv_ms = (speed_kmh - prev_speed_kmh) / MS_TO_KMH;
    (dv_ms / dt_secs).abs() / STANDARD_GRAVITY
}

/// Attach [`TrackMetrics`] to every trackpoint that has coordinates, in one left-to-right pass.
///
/// Each point's metrics depend only on its immediate predecessor. A point whose predecessor lacks
/// coordinates starts from zero speed/bearing/g-force but keeps the running elevation total.
pub fn annotate(points: &mut [Trackpoint]) {
    struct Prev {
        coords: LatLon,
        time: Instant,
        elevation_m: Option<f64>,
        speed_kmh: f64,
    }

    let mut total_gain = 0.0;
    let mut prev: Option<Prev> = None;

    for point in points.iter_mut() {
        let Some(coords) = point.coords else {
            point.metrics = None;
            prev = None;
            continue;
        };

        let mut m = TrackMetrics::default();
        if let Some(prev) = &prev {
            m.distance_m = haversine_m(prev.coords, coords);
            m.bearing_deg = bearing_deg(prev.coords, coords);

            let dt = secs_between(prev.time, point.time);
            if dt > 0.0 {
                m.speed_kmh = m.distance_m / dt * MS_TO_KMH;
                m.g_force = g_force(prev.speed_kmh, m.speed_kmh, dt);
            }

            if let (Some(e0), Some(e1)) = (prev.elevation_m, point.elevation_m) {
                m.elevation_gain_m = (e1 - e0).max(0.0);
            }
        }
        total_gain += m.elevation_gain_m;
        m.total_elevation_gain_m = total_gain;

        prev = Some(Prev {
            coords,
            time: point.time,
            elevation_m: point.elevation_m,
            speed_kmh: m.speed_kmh,
        });
        point.metrics = Some(m);
    }
}

/// Aggregate figures over an annotated sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub total_distance_m: f64,
    pub max_speed_kmh: f64,
    pub total_elevation_gain_m: f64,
    pub max_g_force: f64,
    /// Seconds between the first and last trackpoint.
    pub duration_secs: f64,
}

pub fn summarize(points: &[Trackpoint]) -> ActivityStats {
    let mut stats = ActivityStats::default();
    for m in points.iter().filter_map(|p| p.metrics.as_ref()) {
        stats.total_distance_m += m.distance_m;
        stats.max_speed_kmh = stats.max_speed_kmh.max(m.speed_kmh);
        stats.max_g_force = stats.max_g_force.max(m.g_force);
        stats.total_elevation_gain_m = stats.total_elevation_gain_m.max(m.total_elevation_gain_m);
    }
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        stats.duration_secs = secs_between(first.time, last.time);
    }
    stats
}

#[cfg(test)]
#[path = "../../tests/unit/telemetry/metrics.rs"]
mod tests;
