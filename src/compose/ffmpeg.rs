use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::Context as _;
use tokio::{io::AsyncReadExt as _, process::Command};
use tokio_util::sync::CancellationToken;

use crate::{
    compose::plan::CompositionPlan,
    foundation::error::{TelesyncError, TelesyncResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioMode {
    Copy,
    Aac { bitrate: &'static str },
}

/// x264/audio settings for one kind of output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeProfile {
    pub preset: &'static str,
    pub crf: u8,
    pub audio: AudioMode,
    /// Only this many seconds of the source are read.
    pub input_limit_secs: Option<u32>,
}

impl EncodeProfile {
    pub const FULL: Self = Self {
        preset: "medium",
        crf: 23,
        audio: AudioMode::Aac { bitrate: "128k" },
        input_limit_secs: None,
    };

    pub const STATIC: Self = Self {
        preset: "medium",
        crf: 23,
        audio: AudioMode::Copy,
        input_limit_secs: None,
    };

    pub const PREVIEW: Self = Self {
        preset: "fast",
        crf: 28,
        audio: AudioMode::Aac { bitrate: "96k" },
        input_limit_secs: Some(30),
    };

    pub fn validate(&self) -> TelesyncResult<()> {
        if self.preset.is_empty() {
            return Err(TelesyncError::validation("encode preset must be non-empty"));
        }
        if self.crf > 51 {
            return Err(TelesyncError::validation(format!(
                "encode crf must be in 0..=51, got {}",
                self.crf
            )));
        }
        if self.input_limit_secs == Some(0) {
            return Err(TelesyncError::validation(
                "encode input limit must be non-zero",
            ));
        }
        Ok(())
    }
}

/// A fully specified ffmpeg command line and the file it produces.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub args: Vec<OsString>,
    pub out_path: PathBuf,
}

impl Invocation {
    /// Composite the plan's rasters over `source` into `out_path`.
    pub fn overlay(
        source: &Path,
        plan: &CompositionPlan,
        profile: EncodeProfile,
        out_path: impl Into<PathBuf>,
    ) -> TelesyncResult<Self> {
        profile.validate()?;
        if plan.entries.is_empty() {
            return Err(TelesyncError::compositing(
                "composition plan has no overlay inputs",
            ));
        }
        let out_path = out_path.into();
        let graph = plan.filter_graph();
        let crf = profile.crf.to_string();

        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if let Some(limit) = profile.input_limit_secs {
            args.push("-t".into());
            args.push(limit.to_string().into());
        }
        args.push("-i".into());
        args.push(source.into());
        for raster in plan.overlay_inputs() {
            args.push("-i".into());
            args.push(raster.into());
        }

        args.extend(
            [
                "-filter_complex",
                graph.as_str(),
                "-map",
                plan.output_label(),
                "-map",
                "0:a?",
                "-c:v",
                "libx264",
                "-preset",
                profile.preset,
                "-crf",
                crf.as_str(),
                "-pix_fmt",
                "yuv420p",
            ]
            .into_iter()
            .map(OsString::from),
        );
        match profile.audio {
            AudioMode::Copy => args.extend(["-c:a", "copy"].map(OsString::from)),
            AudioMode::Aac { bitrate } => {
                args.extend(["-c:a", "aac", "-b:a", bitrate].map(OsString::from))
            }
        }
        args.extend(["-movflags", "+faststart"].map(OsString::from));
        args.push(out_path.clone().into());

        Ok(Self { args, out_path })
    }
}

pub fn is_tool_available(bin: &Path) -> bool {
    std::process::Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub async fn ensure_parent_dir(path: &Path) -> TelesyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Spawns ffmpeg children. Every child is killed if its future is dropped.
#[derive(Clone, Debug)]
pub struct FfmpegRunner {
    bin: PathBuf,
}

impl FfmpegRunner {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Run `invocation` to completion.
    ///
    /// With a `budget`, the child is killed and reaped once it expires and the call fails with
    /// [`TelesyncError::Timeout`]; cancelling `cancel` does the same. On any failure the output
    /// file is removed.
    #[tracing::instrument(skip_all, fields(out = %invocation.out_path.display(), budget = ?budget))]
    pub async fn run(
        &self,
        invocation: &Invocation,
        budget: Option<Duration>,
        cancel: &CancellationToken,
    ) -> TelesyncResult<()> {
        let res = self.run_inner(invocation, budget, cancel).await;
        if res.is_err() {
            remove_partial_output(&invocation.out_path).await;
        }
        res
    }

    async fn run_inner(
        &self,
        invocation: &Invocation,
        budget: Option<Duration>,
        cancel: &CancellationToken,
    ) -> TelesyncResult<()> {
        ensure_parent_dir(&invocation.out_path).await?;

        let mut child = Command::new(&self.bin)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TelesyncError::compositing(format!(
                    "failed to spawn ffmpeg '{}' (is it installed and on PATH?): {e}",
                    self.bin.display()
                ))
            })?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf
        });

        let deadline = async {
            match budget {
                Some(budget) => tokio::time::sleep(budget).await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            () = deadline => Outcome::TimedOut,
            () = cancel.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(status) => status.map_err(|e| {
                TelesyncError::compositing(format!("failed to wait for ffmpeg: {e}"))
            })?,
            Outcome::TimedOut => {
                kill_and_reap(&mut child).await;
                stderr_task.abort();
                tracing::error!(?budget, "ffmpeg exceeded its time budget, killed");
                return Err(TelesyncError::timeout(format!(
                    "ffmpeg did not finish within {:?}",
                    budget.unwrap_or_default()
                )));
            }
            Outcome::Cancelled => {
                kill_and_reap(&mut child).await;
                stderr_task.abort();
                return Err(TelesyncError::timeout("ffmpeg was cancelled"));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(TelesyncError::compositing(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

async fn kill_and_reap(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill ffmpeg");
    }
}

async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(file = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "failed to remove partial output")
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/ffmpeg.rs"]
mod tests;
