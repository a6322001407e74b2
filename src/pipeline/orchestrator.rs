use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    compose::{
        engine::{Compositor, VideoTimeline},
        ffmpeg::FfmpegRunner,
        plan::Strategy,
    },
    foundation::{
        config::PipelineConfig,
        error::{TelesyncError, TelesyncResult},
        time::{Instant, offset_secs, secs_between},
    },
    media::{
        probe::{VideoInfo, probe_video},
        raster::Rasterizer,
    },
    overlay::{
        gauge::{FRAME_HEIGHT, FRAME_WIDTH},
        sequence::{OverlayGenerator, OverlaySequence},
    },
    pipeline::context::RequestContext,
    telemetry::{
        activity::{Activity, validate_activity_id},
        correlate::{bounds, find_closest},
        metrics::{annotate, summarize},
        model::{GeoBounds, Trackpoint},
    },
};

pub const MIN_TRACKPOINTS: usize = 2;
/// Below this share of trackpoints with coordinates a warning is logged.
pub const COORDINATE_COVERAGE_WARN: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Validating,
    ExtractingVideoInfo,
    SynchronizingTrackpoints,
    GeneratingOverlays,
    SelectingStrategy,
    CompositingComplex,
    CompositingSimple,
    CleaningUp,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProcessingStats {
    pub total_trackpoints: usize,
    pub synchronized_trackpoints: usize,
    pub overlay_count: usize,
    pub max_speed_kmh: f64,
    pub total_elevation_gain_m: f64,
    pub video_duration_secs: f64,
    pub max_g_force: f64,
    pub total_distance_m: f64,
    pub processing_secs: f64,
    pub bounds: Option<GeoBounds>,
}

/// Trackpoint recorded closest to the video's first frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoStartPoint {
    pub trackpoint: Trackpoint,
    /// Absolute distance in seconds between the trackpoint and the video start.
    pub time_diff_secs: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProcessingResult {
    pub job_id: String,
    pub output_path: PathBuf,
    pub strategy: Strategy,
    pub video_start_point: VideoStartPoint,
    pub stats: ProcessingStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct PreviewResult {
    pub job_id: String,
    pub preview_path: PathBuf,
    pub overlay_count: usize,
    pub video_start_point: VideoStartPoint,
}

/// Correlation of a video with its activity, without compositing.
#[derive(Clone, Debug, Serialize)]
pub struct SyncResult {
    pub job_id: String,
    pub video_start: Instant,
    pub video_duration_secs: f64,
    pub video_start_point: VideoStartPoint,
}

/// What a request brings: the activity, its trackpoints and the source video.
#[derive(Clone, Copy, Debug)]
pub struct PipelineInput<'a> {
    pub activity: &'a Activity,
    pub trackpoints: &'a [Trackpoint],
    pub video_path: &'a Path,
    /// Overrides the capture time found in the video metadata.
    pub video_start: Option<Instant>,
}

/// The video located on the activity clock.
struct Located {
    video: VideoInfo,
    start: Instant,
    start_point: VideoStartPoint,
}

/// Outcome of the stages shared by full runs and previews.
struct Prepared {
    located: Located,
    synced: Vec<Trackpoint>,
    sequence: OverlaySequence,
}

/// Tracks and logs the stage a request is in.
struct StageLog<'a> {
    job_id: &'a str,
    current: Stage,
}

impl<'a> StageLog<'a> {
    fn new(job_id: &'a str) -> Self {
        tracing::info!(job_id, stage = ?Stage::Validating, "stage");
        Self {
            job_id,
            current: Stage::Validating,
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(job_id = self.job_id, from = ?self.current, stage = ?stage, "stage");
        self.current = stage;
    }
}

/// Drives one request from validation to a composited video.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    generator: OverlayGenerator,
    compositor: Compositor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> TelesyncResult<Self> {
        config.validate()?;
        let rasterizer = Rasterizer::new(FRAME_WIDTH, FRAME_HEIGHT)?;
        Ok(Self {
            generator: OverlayGenerator::new(&config.overlay_dir),
            compositor: Compositor::new(
                rasterizer,
                FfmpegRunner::new(&config.ffmpeg_bin),
                &config.output_dir,
                config.complex_budget,
            ),
            config,
        })
    }

    /// Produce the composited video for `input`. Overlay files of the request are removed whatever
    /// the outcome.
    #[tracing::instrument(skip_all, fields(job_id = %ctx.job_id, activity_id = %ctx.activity_id))]
    pub async fn process(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
    ) -> TelesyncResult<ProcessingResult> {
        let started = std::time::Instant::now();
        let mut log = StageLog::new(&ctx.job_id);
        let res = self.run_full(ctx, input, &mut log).await;
        self.finish(ctx, &mut log, &res).await;

        let (prepared, strategy, output_path) = res?;
        let activity = summarize(&prepared.synced);
        Ok(ProcessingResult {
            job_id: ctx.job_id.clone(),
            output_path,
            strategy,
            video_start_point: prepared.located.start_point,
            stats: ProcessingStats {
                total_trackpoints: input.trackpoints.len(),
                synchronized_trackpoints: prepared.synced.len(),
                overlay_count: prepared.sequence.len(),
                max_speed_kmh: activity.max_speed_kmh,
                total_elevation_gain_m: activity.total_elevation_gain_m,
                video_duration_secs: prepared.located.video.duration_secs,
                max_g_force: activity.max_g_force,
                total_distance_m: activity.total_distance_m,
                processing_secs: started.elapsed().as_secs_f64(),
                bounds: bounds(&prepared.synced),
            },
        })
    }

    /// Produce a short preview of `input`, with the same validation and cleanup as
    /// [`Pipeline::process`].
    #[tracing::instrument(skip_all, fields(job_id = %ctx.job_id, activity_id = %ctx.activity_id))]
    pub async fn preview(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
    ) -> TelesyncResult<PreviewResult> {
        let mut log = StageLog::new(&ctx.job_id);
        let res = self.run_preview(ctx, input, &mut log).await;
        self.finish(ctx, &mut log, &res).await;

        let (preview_path, overlay_count, video_start_point) = res?;
        Ok(PreviewResult {
            job_id: ctx.job_id.clone(),
            preview_path,
            overlay_count,
            video_start_point,
        })
    }

    /// Locate the video on the activity clock and report the trackpoint nearest to its start.
    /// Nothing is generated or written.
    #[tracing::instrument(skip_all, fields(job_id = %ctx.job_id, activity_id = %ctx.activity_id))]
    pub async fn sync(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
    ) -> TelesyncResult<SyncResult> {
        let mut log = StageLog::new(&ctx.job_id);
        match self.locate(ctx, input, &mut log).await {
            Ok(located) => {
                log.enter(Stage::Completed);
                Ok(SyncResult {
                    job_id: ctx.job_id.clone(),
                    video_start: located.start,
                    video_duration_secs: located.video.duration_secs,
                    video_start_point: located.start_point,
                })
            }
            Err(e) => {
                tracing::error!(job_id = %ctx.job_id, stage = ?log.current, error = %e, "sync failed");
                log.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn finish<T>(
        &self,
        ctx: &RequestContext,
        log: &mut StageLog<'_>,
        res: &TelesyncResult<T>,
    ) {
        let failed_in = log.current;
        log.enter(Stage::CleaningUp);
        self.generator.cleanup(&ctx.scope).await;
        match res {
            Ok(_) => log.enter(Stage::Completed),
            Err(e) => {
                tracing::error!(job_id = %ctx.job_id, stage = ?failed_in, error = %e, "processing failed");
                log.enter(Stage::Failed);
            }
        }
    }

    async fn run_full(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
        log: &mut StageLog<'_>,
    ) -> TelesyncResult<(Prepared, Strategy, PathBuf)> {
        let prepared = self.prepare(ctx, input, log).await?;

        log.enter(Stage::SelectingStrategy);
        let strategy = Strategy::select(
            prepared.sequence.len(),
            prepared.located.video.duration_secs,
        );
        tracing::info!(%strategy, overlays = prepared.sequence.len(), "strategy selected");

        log.enter(match strategy {
            Strategy::Complex => Stage::CompositingComplex,
            Strategy::Simple => Stage::CompositingSimple,
        });
        let output = self
            .compositor
            .apply(
                strategy,
                &ctx.job_id,
                VideoTimeline {
                    info: &prepared.located.video,
                    start: prepared.located.start,
                },
                &prepared.sequence,
                &ctx.cancel,
            )
            .await?;
        Ok((prepared, strategy, output))
    }

    async fn run_preview(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
        log: &mut StageLog<'_>,
    ) -> TelesyncResult<(PathBuf, usize, VideoStartPoint)> {
        let prepared = self.prepare(ctx, input, log).await?;
        log.enter(Stage::CompositingComplex);
        let (path, count) = self
            .compositor
            .preview(
                &ctx.job_id,
                VideoTimeline {
                    info: &prepared.located.video,
                    start: prepared.located.start,
                },
                &prepared.sequence,
                &ctx.cancel,
            )
            .await?;
        Ok((path, count, prepared.located.start_point))
    }

    async fn locate(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
        log: &mut StageLog<'_>,
    ) -> TelesyncResult<Located> {
        validate_inputs(
            &ctx.activity_id,
            input.trackpoints,
            input.video_path,
            self.config.max_video_bytes,
        )
        .await?;

        log.enter(Stage::ExtractingVideoInfo);
        let video = probe_video(&self.config.ffprobe_bin, input.video_path).await?;
        let start = resolve_video_start(input.video_start, &video)?;

        log.enter(Stage::SynchronizingTrackpoints);
        let start_point = locate_video_start(
            input.activity,
            input.trackpoints,
            start,
            self.config.require_video_in_activity,
        )?;
        Ok(Located {
            video,
            start,
            start_point,
        })
    }

    async fn prepare(
        &self,
        ctx: &RequestContext,
        input: PipelineInput<'_>,
        log: &mut StageLog<'_>,
    ) -> TelesyncResult<Prepared> {
        let located = self.locate(ctx, input, log).await?;
        let mut synced = synchronize(
            input.trackpoints,
            located.start,
            located.video.duration_secs,
        )?;
        annotate(&mut synced);

        log.enter(Stage::GeneratingOverlays);
        let sequence = self.generator.generate(&ctx.scope, &synced).await?;
        if sequence.is_empty() {
            return Err(TelesyncError::overlay(
                "no synchronized trackpoint carries coordinates",
            ));
        }

        Ok(Prepared {
            located,
            synced,
            sequence,
        })
    }
}

/// An explicit start wins over the capture time recorded in the video.
pub fn resolve_video_start(explicit: Option<Instant>, video: &VideoInfo) -> TelesyncResult<Instant> {
    explicit.or(video.capture_time).ok_or_else(|| {
        TelesyncError::metadata(format!(
            "'{}' carries no capture time; pass the video start explicitly",
            video.source_path.display()
        ))
    })
}

/// Checks run before anything is read or written.
pub async fn validate_inputs(
    activity_id: &str,
    trackpoints: &[Trackpoint],
    video_path: &Path,
    max_video_bytes: u64,
) -> TelesyncResult<()> {
    validate_activity_id(activity_id)?;

    let meta = tokio::fs::metadata(video_path).await.map_err(|e| {
        TelesyncError::validation(format!(
            "video '{}' is not accessible: {e}",
            video_path.display()
        ))
    })?;
    if !meta.is_file() {
        return Err(TelesyncError::validation(format!(
            "video '{}' is not a regular file",
            video_path.display()
        )));
    }
    if meta.len() > max_video_bytes {
        return Err(TelesyncError::validation(format!(
            "video is {} bytes, the limit is {max_video_bytes}",
            meta.len()
        )));
    }

    if trackpoints.len() < MIN_TRACKPOINTS {
        return Err(TelesyncError::validation(format!(
            "at least {MIN_TRACKPOINTS} trackpoints are required, got {}",
            trackpoints.len()
        )));
    }
    let with_coords = trackpoints.iter().filter(|p| p.has_coords()).count();
    let coverage = with_coords as f64 / trackpoints.len() as f64;
    if coverage < COORDINATE_COVERAGE_WARN {
        tracing::warn!(
            with_coords,
            total = trackpoints.len(),
            "fewer than 80% of trackpoints carry coordinates"
        );
    }
    Ok(())
}

/// Trackpoint with coordinates nearest to the video start.
///
/// A start outside the activity fails with a synchronization error when `require_in_activity` is
/// set and is only logged otherwise.
pub fn locate_video_start(
    activity: &Activity,
    trackpoints: &[Trackpoint],
    start: Instant,
    require_in_activity: bool,
) -> TelesyncResult<VideoStartPoint> {
    if !activity.contains(start)? {
        let (from, to) = (activity.local_start()?, activity.local_end()?);
        if require_in_activity {
            return Err(TelesyncError::synchronization(format!(
                "video starts at {start}, outside activity {} ({from} to {to})",
                activity.id
            )));
        }
        tracing::warn!(
            video_start = %start,
            activity_start = %from,
            activity_end = %to,
            "video starts outside the activity"
        );
    }

    let nearest = find_closest(trackpoints, start).ok_or_else(|| {
        TelesyncError::synchronization(format!(
            "no trackpoint with coordinates corresponds to the video start {start}"
        ))
    })?;
    let point = VideoStartPoint {
        trackpoint: nearest.clone(),
        time_diff_secs: secs_between(start, nearest.time).abs(),
    };
    tracing::info!(
        video_start = %start,
        point_time = %point.trackpoint.time,
        time_diff_secs = point.time_diff_secs,
        "video start located"
    );
    Ok(point)
}

/// Trackpoints inside `[start, start + duration]`, both ends inclusive.
pub fn synchronize(
    trackpoints: &[Trackpoint],
    start: Instant,
    duration_secs: f64,
) -> TelesyncResult<Vec<Trackpoint>> {
    let end = offset_secs(start, duration_secs).ok_or_else(|| {
        TelesyncError::synchronization(format!(
            "video duration {duration_secs}s does not fit on the calendar from {start}"
        ))
    })?;
    let synced: Vec<Trackpoint> = trackpoints
        .iter()
        .filter(|p| p.time >= start && p.time <= end)
        .cloned()
        .collect();

    if synced.is_empty() {
        let nearest = match find_closest(trackpoints, start) {
            Some(p) => format!(
                "; nearest sample is {:.1}s from the video start",
                secs_between(start, p.time)
            ),
            None => String::new(),
        };
        return Err(TelesyncError::synchronization(format!(
            "no trackpoints between {start} and {end}{nearest}"
        )));
    }

    tracing::info!(
        synchronized = synced.len(),
        total = trackpoints.len(),
        "trackpoints synchronized"
    );
    Ok(synced)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
