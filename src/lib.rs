//! Telesync burns activity telemetry into action-camera footage.
//!
//! A request pairs a recorded activity (timestamped GPS/altitude samples) with a video clip and
//! produces a copy of the clip with a speed, heading, g-force and elevation gauge overlaid in sync
//! with the footage.
//!
//! # Pipeline overview
//!
//! 1. **Normalize**: provider streams -> `Vec<Trackpoint>` on the activity-local clock
//! 2. **Probe**: `ffprobe` -> `VideoInfo` (duration, size, capture time)
//! 3. **Synchronize**: locate the trackpoint nearest to the video start, keep the trackpoints
//!    inside the video's time window, then annotate metrics
//! 4. **Generate**: one SVG gauge frame per annotated trackpoint
//! 5. **Composite**: rasterize frames and overlay them with the system `ffmpeg`, either one
//!    time-gated overlay per frame or a single static overlay for large jobs
//!
//! Overlay assets are scoped per request and removed when the request ends, whatever the outcome.
#![forbid(unsafe_code)]

pub mod compose;
pub mod foundation;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod telemetry;

pub use compose::engine::{Compositor, VideoTimeline};
pub use compose::ffmpeg::{EncodeProfile, FfmpegRunner, Invocation, is_tool_available};
pub use compose::plan::{CompositionPlan, Strategy, VisibilityWindow};
pub use compose::retention::{RetentionHandle, spawn_retention_sweep, sweep_once};
pub use foundation::config::PipelineConfig;
pub use foundation::error::{TelesyncError, TelesyncResult};
pub use foundation::time::{Instant, parse_instant};
pub use media::probe::{VideoInfo, probe_video};
pub use media::raster::Rasterizer;
pub use overlay::sequence::{OverlayFrame, OverlayGenerator, OverlayScope, OverlaySequence};
pub use pipeline::context::RequestContext;
pub use pipeline::orchestrator::{
    Pipeline, PipelineInput, PreviewResult, ProcessingResult, ProcessingStats, Stage, SyncResult,
    VideoStartPoint, locate_video_start,
};
pub use telemetry::activity::{
    Activity, ActivityData, ActivitySource, ActivityStreams, JsonActivitySource,
    validate_activity_id,
};
pub use telemetry::model::{GeoBounds, LatLon, TrackMetrics, Trackpoint};
pub use telemetry::normalize::build_trackpoints;
