use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Stdio,
};

use serde::Serialize;
use tokio::process::Command;

use crate::foundation::{
    error::{TelesyncError, TelesyncResult},
    time::{Instant, parse_instant},
};

/// Frame rate assumed when the container does not report one.
pub const FALLBACK_FPS: f64 = 30.0;

/// Tag names that may carry the capture instant, tried in order within each tag set.
pub const CAPTURE_TIME_KEYS: &[&str] = &["creation_time", "date", "DATE", "creation-time"];

#[derive(Clone, Debug, Serialize)]
pub struct VideoInfo {
    pub source_path: PathBuf,
    pub duration_secs: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub bitrate: Option<u64>,
    pub has_audio: bool,
    /// Capture instant read from container or stream tags, if any.
    pub capture_time: Option<Instant>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Run `ffprobe` on `source_path` and extract the metadata the pipeline needs.
#[tracing::instrument(skip(ffprobe))]
pub async fn probe_video(ffprobe: &Path, source_path: &Path) -> TelesyncResult<VideoInfo> {
    let out = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            TelesyncError::metadata(format!(
                "failed to run ffprobe '{}': {e}",
                ffprobe.display()
            ))
        })?;
    if !out.status.success() {
        return Err(TelesyncError::metadata(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let info = parse_probe_json(source_path, &out.stdout)?;
    tracing::info!(
        duration_secs = info.duration_secs,
        fps = info.fps,
        width = info.width,
        height = info.height,
        capture_time = ?info.capture_time,
        "video info extracted"
    );
    Ok(info)
}

pub fn parse_probe_json(source_path: &Path, json: &[u8]) -> TelesyncResult<VideoInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| TelesyncError::metadata(format!("ffprobe json parse failed: {e}")))?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| TelesyncError::metadata("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| TelesyncError::metadata("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| TelesyncError::metadata("missing video height from ffprobe"))?;

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| TelesyncError::metadata("video duration is missing or not positive"))?;

    let fps = video_stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_ff_rate)
        .unwrap_or(FALLBACK_FPS);
    let bitrate = parsed
        .format
        .as_ref()
        .and_then(|f| f.bit_rate.as_deref())
        .and_then(|s| s.parse::<u64>().ok());
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoInfo {
        source_path: source_path.to_path_buf(),
        duration_secs,
        fps,
        width,
        height,
        bitrate,
        has_audio,
        capture_time: capture_time(&parsed),
    })
}

/// Container tags first, then each stream's tags in order; within a tag set the keys of
/// [`CAPTURE_TIME_KEYS`] are tried in order. The first value that parses wins.
fn capture_time(probe: &ProbeOut) -> Option<Instant> {
    let tag_sets = probe
        .format
        .iter()
        .map(|f| &f.tags)
        .chain(probe.streams.iter().map(|s| &s.tags));

    tag_sets
        .flat_map(|tags| CAPTURE_TIME_KEYS.iter().filter_map(move |key| tags.get(*key)))
        .find_map(|raw| parse_instant(raw))
}

/// `"30000/1001"` or `"25"`.
fn parse_ff_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
