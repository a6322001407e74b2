use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = PipelineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.max_video_bytes, 500 * 1024 * 1024);
    assert_eq!(cfg.complex_budget, Duration::from_secs(600));
    assert!(cfg.require_video_in_activity);
}

#[test]
fn lookup_overrides_defaults() {
    let cfg = PipelineConfig::from_lookup(|key| match key {
        "TELESYNC_OUTPUT_DIR" => Some("/tmp/out".to_string()),
        "TELESYNC_MAX_VIDEO_BYTES" => Some("1024".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
    assert_eq!(cfg.overlay_dir, PathBuf::from("overlays"));
    assert_eq!(cfg.max_video_bytes, 1024);
}

#[test]
fn validation_catches_bad_values() {
    assert!(
        PipelineConfig::from_lookup(|key| {
            (key == "TELESYNC_MAX_VIDEO_BYTES").then(|| "lots".to_string())
        })
        .is_err()
    );

    let shared = PipelineConfig::default()
        .with_overlay_dir("media")
        .with_output_dir("media");
    assert!(shared.validate().is_err());

    let zero = PipelineConfig {
        max_video_bytes: 0,
        ..PipelineConfig::default()
    };
    assert!(zero.validate().is_err());
}

#[test]
fn activity_range_check_can_be_relaxed() {
    let relaxed = PipelineConfig::from_lookup(|key| {
        (key == "TELESYNC_REQUIRE_VIDEO_IN_ACTIVITY").then(|| "false".to_string())
    })
    .unwrap();
    assert!(!relaxed.require_video_in_activity);

    assert!(
        PipelineConfig::from_lookup(|key| {
            (key == "TELESYNC_REQUIRE_VIDEO_IN_ACTIVITY").then(|| "maybe".to_string())
        })
        .is_err()
    );
}
