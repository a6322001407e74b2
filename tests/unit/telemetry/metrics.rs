use super::*;
use crate::foundation::time::{offset_secs, parse_instant};

fn t0() -> Instant {
    parse_instant("2024-05-01 10:00:00").unwrap()
}

fn pt(secs: f64, lat: f64, lon: f64, elev: Option<f64>) -> Trackpoint {
    Trackpoint::new(offset_secs(t0(), secs).unwrap(), Some(LatLon::new(lat, lon))).with_elevation(elev)
}

#[test]
fn haversine_of_a_point_to_itself_is_zero() {
    let p = LatLon::new(45.07, 7.68);
    assert_eq!(haversine_m(p, p), 0.0);
}

#[test]
fn haversine_matches_one_thousandth_degree_of_latitude() {
    let d = haversine_m(LatLon::new(45.0, 7.0), LatLon::new(45.001, 7.0));
    assert!((d - 111.195).abs() < 0.01, "{d}");
}

#[test]
fn bearing_points_at_cardinal_directions() {
    let origin = LatLon::new(0.0, 0.0);
    assert!(bearing_deg(origin, LatLon::new(1.0, 0.0)).abs() < 1e-9);
    assert!((bearing_deg(origin, LatLon::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
    assert!((bearing_deg(origin, LatLon::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
    assert!((bearing_deg(origin, LatLon::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
}

#[test]
fn g_force_converts_kmh_to_ms() {
    // 0 -> 35.316 km/h (9.81 m/s) in one second is exactly 1 g.
    assert!((g_force(0.0, 35.316, 1.0) - 1.0).abs() < 1e-9);
    assert!((g_force(35.316, 0.0, 2.0) - 0.5).abs() < 1e-9);
    assert_eq!(g_force(0.0, 50.0, 0.0), 0.0);
}

#[test]
fn first_point_gets_zero_metrics() {
    let mut points = vec![pt(0.0, 45.0, 7.0, Some(100.0))];
    annotate(&mut points);
    assert_eq!(points[0].metrics, Some(TrackMetrics::default()));
}

#[test]
fn speed_bearing_and_elevation_follow_the_predecessor() {
    let mut points = vec![
        pt(0.0, 45.0, 7.0, Some(100.0)),
        pt(10.0, 45.001, 7.0, Some(104.0)),
        pt(20.0, 45.002, 7.0, Some(102.0)),
        pt(30.0, 45.003, 7.0, Some(103.5)),
    ];
    annotate(&mut points);

    let m1 = points[1].metrics.unwrap();
    assert!((m1.speed_kmh - 40.03).abs() < 0.01, "{}", m1.speed_kmh);
    assert!(m1.bearing_deg.abs() < 1e-6);
    assert!((m1.g_force - (m1.speed_kmh / 3.6) / 10.0 / 9.81).abs() < 1e-9);
    assert_eq!(m1.elevation_gain_m, 4.0);

    let m2 = points[2].metrics.unwrap();
    assert_eq!(m2.elevation_gain_m, 0.0);
    assert_eq!(m2.total_elevation_gain_m, 4.0);
    // Constant speed: no acceleration.
    assert!(m2.g_force < 1e-3);

    let m3 = points[3].metrics.unwrap();
    assert_eq!(m3.total_elevation_gain_m, 5.5);
}

#[test]
fn non_positive_time_step_skips_time_derived_metrics() {
    let mut points = vec![pt(5.0, 45.0, 7.0, None), pt(5.0, 45.001, 7.0, None)];
    annotate(&mut points);
    let m = points[1].metrics.unwrap();
    assert_eq!(m.speed_kmh, 0.0);
    assert_eq!(m.g_force, 0.0);
    assert!(m.distance_m > 100.0);
}

#[test]
fn gaps_in_coordinates_reset_the_predecessor_but_keep_the_total() {
    let mut points = vec![
        pt(0.0, 45.0, 7.0, Some(100.0)),
        pt(1.0, 45.0001, 7.0, Some(110.0)),
        Trackpoint::new(offset_secs(t0(), 2.0).unwrap(), None).with_elevation(Some(500.0)),
        pt(3.0, 45.0003, 7.0, Some(120.0)),
    ];
    annotate(&mut points);

    assert!(points[2].metrics.is_none());
    let after_gap = points[3].metrics.unwrap();
    assert_eq!(after_gap.speed_kmh, 0.0);
    assert_eq!(after_gap.elevation_gain_m, 0.0);
    assert_eq!(after_gap.total_elevation_gain_m, 10.0);
}

#[test]
fn summary_aggregates_annotated_points() {
    let mut points = vec![
        pt(0.0, 45.0, 7.0, Some(100.0)),
        pt(10.0, 45.001, 7.0, Some(104.0)),
        pt(20.0, 45.003, 7.0, Some(106.0)),
    ];
    annotate(&mut points);
    let stats = summarize(&points);
    assert!((stats.total_distance_m - 3.0 * 111.195).abs() < 0.05);
    assert!((stats.max_speed_kmh - 80.06).abs() < 0.02);
    assert_eq!(stats.total_elevation_gain_m, 6.0);
    assert_eq!(stats.duration_secs, 20.0);
    assert!(stats.max_g_force > 0.0);
}
