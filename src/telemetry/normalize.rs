use crate::{
    foundation::{
        error::{TelesyncError, TelesyncResult},
        time::offset_secs,
    },
    telemetry::{
        activity::{Activity, ActivityStreams},
        model::{LatLon, Trackpoint},
    },
};

/// Turn the provider's index-aligned streams into absolute-timestamped trackpoints.
///
/// One trackpoint is produced per `time` sample. Coordinates and elevation are `None` wherever the
/// corresponding series is absent, shorter than `time`, or null at that index.
#[tracing::instrument(skip_all, fields(activity_id = %activity.id))]
pub fn build_trackpoints(
    activity: &Activity,
    streams: &ActivityStreams,
) -> TelesyncResult<Vec<Trackpoint>> {
    let time = streams.time.as_ref().ok_or_else(|| {
        TelesyncError::missing_telemetry(format!(
            "activity {} has no time stream",
            activity.id
        ))
    })?;

    let reference = activity.local_start()?;
    let latlng = streams.latlng.as_ref().map(|s| s.data.as_slice());
    let altitude = streams.altitude.as_ref().map(|s| s.data.as_slice());

    let points = time
        .data
        .iter()
        .enumerate()
        .map(|(i, &elapsed)| {
            let at = offset_secs(reference, elapsed).ok_or_else(|| {
                TelesyncError::missing_telemetry(format!(
                    "activity {} time sample {i} ({elapsed}s) is out of range",
                    activity.id
                ))
            })?;
            let coords = latlng
                .and_then(|s| s.get(i).copied().flatten())
                .map(|[lat, lon]| LatLon::new(lat, lon));
            let elevation = altitude.and_then(|s| s.get(i).copied().flatten());
            Ok(Trackpoint::new(at, coords).with_elevation(elevation))
        })
        .collect::<TelesyncResult<Vec<Trackpoint>>>()?;

    tracing::debug!(
        trackpoints = points.len(),
        with_coords = points.iter().filter(|p| p.has_coords()).count(),
        "trackpoints built"
    );
    Ok(points)
}

#[cfg(test)]
#[path = "../../tests/unit/telemetry/normalize.rs"]
mod tests;
