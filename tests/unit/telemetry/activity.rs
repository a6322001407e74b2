use super::*;

const DOC: &str = r#"{
  "activity": {
    "id": 123456,
    "name": "Morning ride",
    "type": "Ride",
    "start_date": "2024-05-01T08:00:00Z",
    "utc_offset": 7200,
    "elapsed_time": 3600
  },
  "streams": {
    "time": { "data": [0, 1, 2] },
    "latlng": { "data": [[45.0, 7.0], null, [45.0002, 7.0]] },
    "altitude": { "data": [100.0, 101.5, null] }
  }
}"#;

fn at(s: &str) -> Instant {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn provider_document_deserializes() {
    let data: ActivityData = serde_json::from_str(DOC).unwrap();
    assert_eq!(data.activity.id, "123456");
    assert_eq!(data.activity.sport_type.as_deref(), Some("Ride"));
    assert_eq!(data.streams.time.as_ref().unwrap().data, vec![0.0, 1.0, 2.0]);
    let latlng = &data.streams.latlng.as_ref().unwrap().data;
    assert_eq!(latlng[1], None);
    assert!(data.streams.distance.is_none());
}

#[test]
fn local_window_applies_offset_and_is_inclusive() {
    let data: ActivityData = serde_json::from_str(DOC).unwrap();
    let a = &data.activity;
    assert_eq!(a.local_start().unwrap(), at("2024-05-01 10:00:00"));
    assert_eq!(a.local_end().unwrap(), at("2024-05-01 11:00:00"));
    assert!(a.contains(at("2024-05-01 10:00:00")).unwrap());
    assert!(a.contains(at("2024-05-01 11:00:00")).unwrap());
    assert!(!a.contains(at("2024-05-01 11:00:01")).unwrap());
    assert!(!a.contains(at("2024-05-01 09:59:59")).unwrap());
}

#[test]
fn absurd_offsets_fail_instead_of_overflowing() {
    let mut data: ActivityData = serde_json::from_str(DOC).unwrap();
    data.activity.elapsed_secs = 1e300;
    assert!(data.activity.local_start().is_ok());
    assert!(matches!(
        data.activity.local_end(),
        Err(TelesyncError::InputValidation(_))
    ));

    data.activity.utc_offset = f64::NAN;
    assert!(matches!(
        data.activity.contains(at("2024-05-01 10:00:00")),
        Err(TelesyncError::InputValidation(_))
    ));
}

#[test]
fn activity_ids_must_be_numeric() {
    assert!(validate_activity_id("123").is_ok());
    for bad in ["", "12a", "../x", "1/2", " 1"] {
        assert!(matches!(
            validate_activity_id(bad),
            Err(TelesyncError::InputValidation(_))
        ));
    }
}

#[tokio::test]
async fn json_source_reads_by_id() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("123456.json"), DOC).unwrap();

    let source = JsonActivitySource::new(dir.path());
    let data = source.fetch("123456").await.unwrap();
    assert_eq!(data.activity.name.as_deref(), Some("Morning ride"));

    assert!(source.fetch("999").await.is_err());
}

#[tokio::test]
async fn json_source_refuses_ids_that_are_not_plain_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("docs");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(dir.path().join("123456.json"), DOC).unwrap();

    let source = JsonActivitySource::new(&nested);
    assert!(matches!(
        source.fetch("../123456").await,
        Err(TelesyncError::InputValidation(_))
    ));
}

#[tokio::test]
async fn json_source_rejects_mismatched_and_malformed_documents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("777.json"), DOC).unwrap();
    std::fs::write(dir.path().join("888.json"), "{ not json").unwrap();

    let source = JsonActivitySource::new(dir.path());
    assert!(matches!(
        source.fetch("777").await,
        Err(TelesyncError::InputValidation(_))
    ));
    assert!(matches!(
        source.fetch("888").await,
        Err(TelesyncError::Serde(_))
    ));
}
