use std::{path::PathBuf, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    compose::{
        ffmpeg::{EncodeProfile, FfmpegRunner, Invocation},
        plan::{CompositionPlan, Strategy, representative_index},
    },
    foundation::{
        error::{TelesyncError, TelesyncResult},
        time::Instant,
    },
    media::{probe::VideoInfo, raster::Rasterizer},
    overlay::sequence::{OverlayFrame, OverlaySequence},
};

/// Every this many frames one is kept for a preview.
pub const PREVIEW_FRAME_STRIDE: usize = 30;

pub fn complex_output_name(job_id: &str) -> String {
    format!("video_with_overlay_{job_id}.mp4")
}

pub fn simple_output_name(job_id: &str) -> String {
    format!("video_simple_overlay_{job_id}.mp4")
}

pub fn preview_output_name(job_id: &str) -> String {
    format!("preview_{job_id}.mp4")
}

/// Source video and its timeline origin on the activity-local clock.
#[derive(Clone, Copy, Debug)]
pub struct VideoTimeline<'a> {
    pub info: &'a VideoInfo,
    pub start: Instant,
}

struct Job<'a> {
    frames: Vec<&'a OverlayFrame>,
    strategy: Strategy,
    profile: EncodeProfile,
    out_path: PathBuf,
    budget: Option<Duration>,
}

/// Rasterizes overlay frames and composites them over a source video with ffmpeg.
#[derive(Clone, Debug)]
pub struct Compositor {
    rasterizer: Rasterizer,
    runner: FfmpegRunner,
    output_dir: PathBuf,
    complex_budget: Duration,
}

impl Compositor {
    pub fn new(
        rasterizer: Rasterizer,
        runner: FfmpegRunner,
        output_dir: impl Into<PathBuf>,
        complex_budget: Duration,
    ) -> Self {
        Self {
            rasterizer,
            runner,
            output_dir: output_dir.into(),
            complex_budget,
        }
    }

    pub async fn apply(
        &self,
        strategy: Strategy,
        job_id: &str,
        video: VideoTimeline<'_>,
        sequence: &OverlaySequence,
        cancel: &CancellationToken,
    ) -> TelesyncResult<PathBuf> {
        match strategy {
            Strategy::Complex => self.apply_complex(job_id, video, sequence, cancel).await,
            Strategy::Simple => self.apply_simple(job_id, video, sequence, cancel).await,
        }
    }

    /// One time-gated overlay per frame, bounded by the complex budget.
    #[tracing::instrument(skip_all, fields(job_id = %job_id, frames = sequence.len()))]
    pub async fn apply_complex(
        &self,
        job_id: &str,
        video: VideoTimeline<'_>,
        sequence: &OverlaySequence,
        cancel: &CancellationToken,
    ) -> TelesyncResult<PathBuf> {
        let job = Job {
            frames: sequence.frames.iter().collect(),
            strategy: Strategy::Complex,
            profile: EncodeProfile::FULL,
            out_path: self.output_dir.join(complex_output_name(job_id)),
            budget: Some(self.complex_budget),
        };
        self.run(job, video, cancel).await
    }

    /// The middle frame, semi-transparent, across the whole video.
    #[tracing::instrument(skip_all, fields(job_id = %job_id, frames = sequence.len()))]
    pub async fn apply_simple(
        &self,
        job_id: &str,
        video: VideoTimeline<'_>,
        sequence: &OverlaySequence,
        cancel: &CancellationToken,
    ) -> TelesyncResult<PathBuf> {
        let middle = sequence
            .frames
            .get(representative_index(sequence.len()))
            .ok_or_else(|| TelesyncError::compositing("overlay sequence is empty"))?;
        let job = Job {
            frames: vec![middle],
            strategy: Strategy::Simple,
            profile: EncodeProfile::STATIC,
            out_path: self.output_dir.join(simple_output_name(job_id)),
            budget: None,
        };
        self.run(job, video, cancel).await
    }

    /// Every 30th frame over the first 30 seconds of video.
    #[tracing::instrument(skip_all, fields(job_id = %job_id, frames = sequence.len()))]
    pub async fn preview(
        &self,
        job_id: &str,
        video: VideoTimeline<'_>,
        sequence: &OverlaySequence,
        cancel: &CancellationToken,
    ) -> TelesyncResult<(PathBuf, usize)> {
        let frames: Vec<&OverlayFrame> = sequence
            .frames
            .iter()
            .step_by(PREVIEW_FRAME_STRIDE)
            .collect();
        let count = frames.len();
        let job = Job {
            frames,
            strategy: Strategy::Complex,
            profile: EncodeProfile::PREVIEW,
            out_path: self.output_dir.join(preview_output_name(job_id)),
            budget: Some(self.complex_budget),
        };
        let path = self.run(job, video, cancel).await?;
        Ok((path, count))
    }

    async fn run(
        &self,
        job: Job<'_>,
        video: VideoTimeline<'_>,
        cancel: &CancellationToken,
    ) -> TelesyncResult<PathBuf> {
        if job.frames.is_empty() {
            return Err(TelesyncError::compositing("no overlay frames to composite"));
        }
        let svgs: Vec<PathBuf> = job.frames.iter().map(|f| f.svg_path.clone()).collect();
        let mut rasters = Vec::with_capacity(svgs.len());

        let res = async {
            self.rasterizer.rasterize_all(&svgs, &mut rasters).await?;
            let planned: Vec<(usize, Instant, PathBuf)> = job
                .frames
                .iter()
                .zip(&rasters)
                .map(|(f, png)| (f.index, f.time, png.clone()))
                .collect();
            let plan = CompositionPlan::build(
                &planned,
                video.start,
                video.info.duration_secs,
                job.strategy,
            )?;
            let invocation = Invocation::overlay(
                &video.info.source_path,
                &plan,
                job.profile,
                job.out_path.clone(),
            )?;
            tracing::info!(
                strategy = %job.strategy,
                overlays = plan.entries.len(),
                out = %job.out_path.display(),
                "compositing"
            );
            self.runner.run(&invocation, job.budget, cancel).await
        }
        .await;

        remove_rasters(&rasters).await;
        res.map(|()| job.out_path)
    }
}

async fn remove_rasters(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(file = %path.display(), error = %e, "failed to remove raster");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/engine.rs"]
mod tests;
