use std::{path::PathBuf, time::Duration};

use crate::foundation::error::{TelesyncError, TelesyncResult};

/// Largest accepted source video.
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;
/// Wall-clock budget for a dynamic (complex) composite.
pub const DEFAULT_COMPLEX_BUDGET: Duration = Duration::from_secs(10 * 60);
/// Produced artifacts older than this are swept.
pub const DEFAULT_RETENTION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
/// Period between retention sweeps.
pub const DEFAULT_RETENTION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Process-wide settings for the pipeline. Nothing here changes per request.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Transient directory for overlay SVG/PNG assets.
    pub overlay_dir: PathBuf,
    /// Retained directory for composited videos.
    pub output_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    pub max_video_bytes: u64,
    pub complex_budget: Duration,
    pub retention_max_age: Duration,
    pub retention_interval: Duration,
    /// Reject videos whose start lies outside the activity instead of only warning.
    pub require_video_in_activity: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            overlay_dir: PathBuf::from("overlays"),
            output_dir: PathBuf::from("output"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            max_video_bytes: DEFAULT_MAX_VIDEO_BYTES,
            complex_budget: DEFAULT_COMPLEX_BUDGET,
            retention_max_age: DEFAULT_RETENTION_MAX_AGE,
            retention_interval: DEFAULT_RETENTION_INTERVAL,
            require_video_in_activity: true,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `TELESYNC_*` environment variables.
    pub fn from_env() -> TelesyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TelesyncResult<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("TELESYNC_OVERLAY_DIR") {
            cfg.overlay_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TELESYNC_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TELESYNC_FFMPEG") {
            cfg.ffmpeg_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup("TELESYNC_FFPROBE") {
            cfg.ffprobe_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup("TELESYNC_MAX_VIDEO_BYTES") {
            cfg.max_video_bytes = v.trim().parse().map_err(|_| {
                TelesyncError::validation(format!(
                    "TELESYNC_MAX_VIDEO_BYTES must be an integer byte count, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = lookup("TELESYNC_REQUIRE_VIDEO_IN_ACTIVITY") {
            cfg.require_video_in_activity = parse_flag(&v).ok_or_else(|| {
                TelesyncError::validation(format!(
                    "TELESYNC_REQUIRE_VIDEO_IN_ACTIVITY must be true or false, got '{v}'"
                ))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TelesyncResult<()> {
        if self.max_video_bytes == 0 {
            return Err(TelesyncError::validation("max video size must be non-zero"));
        }
        if self.complex_budget.is_zero() {
            return Err(TelesyncError::validation(
                "compositing budget must be non-zero",
            ));
        }
        if self.retention_interval.is_zero() {
            return Err(TelesyncError::validation(
                "retention interval must be non-zero",
            ));
        }
        if self.overlay_dir == self.output_dir {
            // Overlay cleanup and the retention sweep would otherwise act on each other's files.
            return Err(TelesyncError::validation(
                "overlay and output directories must differ",
            ));
        }
        Ok(())
    }

    pub fn with_overlay_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overlay_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_require_video_in_activity(mut self, require: bool) -> Self {
        self.require_video_in_activity = require;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
