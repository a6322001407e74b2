use super::*;

fn at(s: &str) -> Instant {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
}

#[test]
fn zoned_values_use_their_utc_reading() {
    assert_eq!(
        parse_instant("2024-05-01T10:15:30Z"),
        Some(at("2024-05-01 10:15:30"))
    );
    assert_eq!(
        parse_instant("2024-05-01T12:15:30+02:00"),
        Some(at("2024-05-01 10:15:30"))
    );
    assert_eq!(
        parse_instant("2024-05-01T10:15:30.250000Z"),
        Some(at("2024-05-01 10:15:30.25"))
    );
}

#[test]
fn naive_values_are_taken_verbatim() {
    assert_eq!(
        parse_instant("2024-05-01 10:15:30"),
        Some(at("2024-05-01 10:15:30"))
    );
    assert_eq!(
        parse_instant("2024-05-01T10:15:30"),
        Some(at("2024-05-01 10:15:30"))
    );
    assert_eq!(
        parse_instant("2024:05:01 10:15:30"),
        Some(at("2024-05-01 10:15:30"))
    );
}

#[test]
fn garbage_does_not_parse() {
    assert_eq!(parse_instant(""), None);
    assert_eq!(parse_instant("yesterday"), None);
}

#[test]
fn offsets_and_differences_are_fractional() {
    let t0 = at("2024-05-01 10:00:00");
    let t1 = offset_secs(t0, 1.5).unwrap();
    assert_eq!(t1, at("2024-05-01 10:00:01.5"));
    assert!((secs_between(t0, t1) - 1.5).abs() < 1e-9);
    assert!((secs_between(t1, t0) + 1.5).abs() < 1e-9);
    assert_eq!(offset_secs(t0, -3600.0), Some(at("2024-05-01 09:00:00")));
}

#[test]
fn offsets_outside_the_calendar_are_rejected() {
    let t0 = at("2024-05-01 10:00:00");
    assert_eq!(offset_secs(t0, f64::NAN), None);
    assert_eq!(offset_secs(t0, f64::INFINITY), None);
    assert_eq!(offset_secs(t0, -f64::INFINITY), None);
    assert_eq!(offset_secs(t0, 1e13), None);
    assert_eq!(offset_secs(t0, MAX_OFFSET_SECS * 1.01), None);
    assert_eq!(offset_secs(NaiveDateTime::MAX, 1.0), None);
    assert!(offset_secs(t0, 86_400.0 * 365.0 * 100.0).is_some());
}
