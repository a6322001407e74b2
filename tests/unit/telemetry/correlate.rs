use super::*;
use crate::{foundation::time::offset_secs, telemetry::model::LatLon};
use proptest::prelude::*;

fn t0() -> Instant {
    crate::foundation::time::parse_instant("2024-05-01 10:00:00").unwrap()
}

fn point(secs: f64, lat: f64) -> Trackpoint {
    Trackpoint::new(offset_secs(t0(), secs).unwrap(), Some(LatLon::new(lat, 7.0)))
}

#[test]
fn picks_nearer_point() {
    let points = vec![point(0.0, 1.0), point(10.0, 2.0)];
    let hit = find_closest(&points, offset_secs(t0(), 4.0).unwrap()).unwrap();
    assert_eq!(hit.time, t0());
}

#[test]
fn ties_go_to_the_earliest_point() {
    let points = vec![point(0.0, 1.0), point(10.0, 2.0)];
    let hit = find_closest(&points, offset_secs(t0(), 5.0).unwrap()).unwrap();
    assert_eq!(hit.coords.unwrap().lat, 1.0);

    let dupes = vec![point(3.0, 1.0), point(3.0, 2.0)];
    let hit = find_closest(&dupes, offset_secs(t0(), 3.0).unwrap()).unwrap();
    assert_eq!(hit.coords.unwrap().lat, 1.0);
}

#[test]
fn points_without_coords_are_skipped() {
    let points = vec![
        Trackpoint::new(offset_secs(t0(), 4.0).unwrap(), None),
        point(9.0, 2.0),
    ];
    let hit = find_closest(&points, offset_secs(t0(), 4.0).unwrap()).unwrap();
    assert_eq!(hit.coords.unwrap().lat, 2.0);

    let none = vec![Trackpoint::new(t0(), None)];
    assert!(find_closest(&none, t0()).is_none());
    assert!(find_closest(&[], t0()).is_none());
}

#[test]
fn bounds_cover_all_coordinates() {
    let points = vec![
        Trackpoint::new(t0(), Some(LatLon::new(45.0, 7.0))),
        Trackpoint::new(t0(), None),
        Trackpoint::new(t0(), Some(LatLon::new(44.5, 7.5))),
    ];
    let b = bounds(&points).unwrap();
    assert_eq!((b.north, b.south, b.east, b.west), (45.0, 44.5, 7.5, 7.0));
    assert!(bounds(&[Trackpoint::new(t0(), None)]).is_none());
}

proptest! {
    #[test]
    fn result_minimizes_time_difference_with_earliest_tie_break(
        offsets in prop::collection::vec(0u32..600, 1..40),
        target in 0u32..600,
    ) {
        let mut offsets = offsets;
        offsets.sort_unstable();
        let points: Vec<Trackpoint> = offsets
            .iter()
            .enumerate()
            .map(|(i, &s)| point(f64::from(s), i as f64))
            .collect();
        let target_t = offset_secs(t0(), f64::from(target)).unwrap();

        let hit = find_closest(&points, target_t).unwrap();
        let hit_idx = hit.coords.unwrap().lat as usize;
        let best = offsets.iter().map(|&s| s.abs_diff(target)).min().unwrap();
        let first_best = offsets.iter().position(|&s| s.abs_diff(target) == best).unwrap();

        prop_assert_eq!(offsets[hit_idx].abs_diff(target), best);
        prop_assert_eq!(hit_idx, first_best);
    }
}
