use crate::{
    foundation::time::{Instant, secs_between},
    telemetry::model::{GeoBounds, Trackpoint},
};

/// Trackpoint with coordinates closest in time to `target`.
///
/// On ties the earliest point in sequence order wins. Points without coordinates are ignored.
pub fn find_closest(trackpoints: &[Trackpoint], target: Instant) -> Option<&Trackpoint> {
    let mut best: Option<(&Trackpoint, f64)> = None;
    for point in trackpoints.iter().filter(|p| p.has_coords()) {
        let diff = secs_between(point.time, target).abs();
        if best.is_none_or(|(_, smallest)| diff < smallest) {
            best = Some((point, diff));
        }
    }

    match best {
        Some((point, diff)) => {
            tracing::debug!(time_diff_secs = diff, point_time = %point.time, "closest trackpoint");
            Some(point)
        }
        None => {
            tracing::warn!("no trackpoint with coordinates to correlate against");
            None
        }
    }
}

pub fn bounds(trackpoints: &[Trackpoint]) -> Option<GeoBounds> {
    let mut coords = trackpoints.iter().filter_map(|p| p.coords);
    let first = coords.next()?;
    let init = GeoBounds {
        north: first.lat,
        south: first.lat,
        east: first.lon,
        west: first.lon,
    };
    Some(coords.fold(init, |b, c| GeoBounds {
        north: b.north.max(c.lat),
        south: b.south.min(c.lat),
        east: b.east.max(c.lon),
        west: b.west.min(c.lon),
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/telemetry/correlate.rs"]
mod tests;
