use super::*;
use crate::{
    compose::plan::CompositionPlan,
    foundation::time::{offset_secs, parse_instant},
};

fn args_as_strings(inv: &Invocation) -> Vec<String> {
    inv.args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn dynamic_plan() -> CompositionPlan {
    let t0 = parse_instant("2024-05-01 10:00:00").unwrap();
    CompositionPlan::dynamic(
        &[
            (0, t0, PathBuf::from("a.png")),
            (1, offset_secs(t0, 1.0).unwrap(), PathBuf::from("b.png")),
        ],
        t0,
    )
    .unwrap()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn full_profile_reencodes_audio_and_maps_every_raster() {
    let inv = Invocation::overlay(
        Path::new("in.mp4"),
        &dynamic_plan(),
        EncodeProfile::FULL,
        "out/video.mp4",
    )
    .unwrap();
    let args = args_as_strings(&inv);

    let inputs: Vec<&str> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-i")
        .map(|(i, _)| args[i + 1].as_str())
        .collect();
    assert_eq!(inputs, vec!["in.mp4", "a.png", "b.png"]);
    assert_eq!(flag_value(&args, "-preset"), Some("medium"));
    assert_eq!(flag_value(&args, "-crf"), Some("23"));
    assert_eq!(flag_value(&args, "-c:a"), Some("aac"));
    assert_eq!(flag_value(&args, "-b:a"), Some("128k"));
    assert_eq!(flag_value(&args, "-movflags"), Some("+faststart"));
    assert_eq!(flag_value(&args, "-map"), Some("[vout]"));
    assert!(!args.iter().any(|a| a == "-t"));
    assert_eq!(args.last().map(String::as_str), Some("out/video.mp4"));
    assert_eq!(inv.out_path, PathBuf::from("out/video.mp4"));
}

#[test]
fn preview_profile_limits_the_input_before_it_is_opened() {
    let inv = Invocation::overlay(
        Path::new("in.mp4"),
        &dynamic_plan(),
        EncodeProfile::PREVIEW,
        "p.mp4",
    )
    .unwrap();
    let args = args_as_strings(&inv);
    let t = args.iter().position(|a| a == "-t").unwrap();
    let first_input = args.iter().position(|a| a == "-i").unwrap();
    assert!(t < first_input);
    assert_eq!(args[t + 1], "30");
    assert_eq!(flag_value(&args, "-preset"), Some("fast"));
    assert_eq!(flag_value(&args, "-crf"), Some("28"));
    assert_eq!(flag_value(&args, "-b:a"), Some("96k"));
}

#[test]
fn static_profile_copies_audio() {
    let plan = CompositionPlan::fixed(0, PathBuf::from("mid.png"), 42.0);
    let inv = Invocation::overlay(Path::new("in.mp4"), &plan, EncodeProfile::STATIC, "s.mp4")
        .unwrap();
    let args = args_as_strings(&inv);
    assert_eq!(flag_value(&args, "-c:a"), Some("copy"));
    assert!(!args.iter().any(|a| a == "-b:a"));
    assert!(flag_value(&args, "-filter_complex")
        .unwrap()
        .contains("colorchannelmixer=aa=0.8"));
}

#[test]
fn invalid_profiles_are_rejected() {
    let bad = EncodeProfile {
        crf: 60,
        ..EncodeProfile::FULL
    };
    assert!(bad.validate().is_err());
    let bad = EncodeProfile {
        input_limit_secs: Some(0),
        ..EncodeProfile::PREVIEW
    };
    assert!(bad.validate().is_err());
    assert!(EncodeProfile::STATIC.validate().is_ok());
}

#[test]
fn missing_tool_is_reported_unavailable() {
    assert!(!is_tool_available(Path::new("/definitely/not/a/real/ffmpeg")));
}

fn shell(script: &str, out: &Path) -> Invocation {
    Invocation {
        args: vec!["-c".into(), script.into(), out.into()],
        out_path: out.to_path_buf(),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn budget_expiry_kills_the_child_and_reports_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("slow.mp4");
    let runner = FfmpegRunner::new("/bin/sh");
    let started = std::time::Instant::now();

    let err = runner
        .run(
            &shell("echo partial > \"$0\"; sleep 30", &out),
            Some(Duration::from_millis(300)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TelesyncError::Timeout(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!out.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn cancellation_kills_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cancelled.mp4");
    let runner = FfmpegRunner::new("/bin/sh");
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = runner
        .run(&shell("sleep 30", &out), None, &token)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_surfaces_stderr_and_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/broken.mp4");
    let runner = FfmpegRunner::new("/bin/sh");

    let err = runner
        .run(
            &shell("echo partial > \"$0\"; echo 'encoder exploded' >&2; exit 3", &out),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TelesyncError::Compositing(_)));
    assert!(err.to_string().contains("encoder exploded"));
    assert!(!out.exists());
    assert!(out.parent().unwrap().is_dir());
}

#[cfg(unix)]
#[tokio::test]
async fn successful_run_keeps_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ok.mp4");
    let runner = FfmpegRunner::new("/bin/sh");
    runner
        .run(
            &shell("echo done > \"$0\"", &out),
            Some(Duration::from_secs(30)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(out.exists());
}

#[tokio::test]
async fn spawn_failure_is_a_compositing_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("x.mp4");
    let err = FfmpegRunner::new("/definitely/not/a/real/ffmpeg")
        .run(&shell("true", &out), None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TelesyncError::Compositing(_)));
}
