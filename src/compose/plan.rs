use std::{fmt::Write as _, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::{
    error::{TelesyncError, TelesyncResult},
    time::{Instant, secs_between},
};

/// Above this many frames the dynamic filter chain is not attempted.
pub const MAX_FRAMES_FOR_COMPLEX: usize = 1000;
/// Above this video duration the dynamic filter chain is not attempted.
pub const MAX_DURATION_FOR_COMPLEX_SECS: f64 = 600.0;

pub const MIN_WINDOW_SECS: f64 = 0.1;
pub const MAX_WINDOW_SECS: f64 = 5.0;
pub const LAST_WINDOW_SECS: f64 = 1.0;

/// Opacity of the single overlay used by the static strategy.
pub const STATIC_OVERLAY_OPACITY: f64 = 0.8;

/// How overlays are composited onto the video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One time-gated overlay per frame.
    Complex,
    /// A single representative frame across the whole video.
    Simple,
}

impl Strategy {
    pub fn select(frame_count: usize, video_duration_secs: f64) -> Self {
        if frame_count > MAX_FRAMES_FOR_COMPLEX {
            tracing::info!(
                frames = frame_count,
                limit = MAX_FRAMES_FOR_COMPLEX,
                "too many overlays, using simple strategy"
            );
            return Self::Simple;
        }
        if video_duration_secs > MAX_DURATION_FOR_COMPLEX_SECS {
            tracing::info!(
                duration_secs = video_duration_secs,
                limit = MAX_DURATION_FOR_COMPLEX_SECS,
                "video too long, using simple strategy"
            );
            return Self::Simple;
        }
        Self::Complex
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complex => "complex",
            Self::Simple => "simple",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interval of the video timeline (seconds) during which one overlay is shown.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VisibilityWindow {
    /// Offset from the start of the video; negative when the frame predates it.
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl VisibilityWindow {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// One window per frame time. Durations come only from the gap to the next frame, clamped to
/// `[MIN_WINDOW_SECS, MAX_WINDOW_SECS]`; the last frame gets `LAST_WINDOW_SECS`.
pub fn visibility_windows(frame_times: &[Instant], video_start: Instant) -> Vec<VisibilityWindow> {
    frame_times
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let duration_secs = match frame_times.get(i + 1) {
                Some(&next) => secs_between(t, next).clamp(MIN_WINDOW_SECS, MAX_WINDOW_SECS),
                None => LAST_WINDOW_SECS,
            };
            VisibilityWindow {
                start_secs: secs_between(video_start, t),
                duration_secs,
            }
        })
        .collect()
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanEntry {
    pub frame_index: usize,
    pub raster_path: PathBuf,
    pub window: VisibilityWindow,
}

/// Ordered overlays with their visibility windows, plus the strategy that will composite them.
#[derive(Clone, Debug, Serialize)]
pub struct CompositionPlan {
    pub strategy: Strategy,
    pub entries: Vec<PlanEntry>,
}

/// Index of the frame shown by the static strategy.
pub fn representative_index(frame_count: usize) -> usize {
    frame_count / 2
}

impl CompositionPlan {
    /// Plan for `strategy`. The static strategy keeps only the representative frame of `frames`.
    pub fn build(
        frames: &[(usize, Instant, PathBuf)],
        video_start: Instant,
        video_duration_secs: f64,
        strategy: Strategy,
    ) -> TelesyncResult<Self> {
        match strategy {
            Strategy::Complex => Self::dynamic(frames, video_start),
            Strategy::Simple => {
                let (index, _, raster) = frames
                    .get(representative_index(frames.len()))
                    .ok_or_else(|| {
                        TelesyncError::compositing("no overlay frame available for a static plan")
                    })?;
                Ok(Self::fixed(*index, raster.clone(), video_duration_secs))
            }
        }
    }

    /// Time-gated plan: `frames` are `(frame index, frame time, raster path)` in sequence order.
    pub fn dynamic(
        frames: &[(usize, Instant, PathBuf)],
        video_start: Instant,
    ) -> TelesyncResult<Self> {
        if frames.is_empty() {
            return Err(TelesyncError::compositing(
                "cannot build a composition plan without overlay frames",
            ));
        }
        let times: Vec<Instant> = frames.iter().map(|(_, t, _)| *t).collect();
        let entries = frames
            .iter()
            .zip(visibility_windows(&times, video_start))
            .map(|((frame_index, _, raster_path), window)| PlanEntry {
                frame_index: *frame_index,
                raster_path: raster_path.clone(),
                window,
            })
            .collect();
        Ok(Self {
            strategy: Strategy::Complex,
            entries,
        })
    }

    /// Static plan: one raster shown for the whole video.
    pub fn fixed(frame_index: usize, raster_path: PathBuf, video_duration_secs: f64) -> Self {
        Self {
            strategy: Strategy::Simple,
            entries: vec![PlanEntry {
                frame_index,
                raster_path,
                window: VisibilityWindow {
                    start_secs: 0.0,
                    duration_secs: video_duration_secs.max(0.0),
                },
            }],
        }
    }

    /// Overlay inputs in ffmpeg input order (input 0 is the source video).
    pub fn overlay_inputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.iter().map(|e| &e.raster_path)
    }

    /// Label of the final video stream produced by [`CompositionPlan::filter_graph`].
    pub fn output_label(&self) -> &'static str {
        "[vout]"
    }

    /// Declarative filter graph for ffmpeg's `-filter_complex`.
    pub fn filter_graph(&self) -> String {
        match self.strategy {
            Strategy::Complex => self.chained_overlay_graph(),
            Strategy::Simple => format!(
                "[1:v]format=rgba,colorchannelmixer=aa={STATIC_OVERLAY_OPACITY}[ovrl];[0:v][ovrl]overlay=0:0{}",
                self.output_label()
            ),
        }
    }

    fn chained_overlay_graph(&self) -> String {
        let mut graph = String::with_capacity(self.entries.len() * 80);
        let last = self.entries.len().saturating_sub(1);
        let mut current = "[0:v]".to_string();
        for (i, entry) in self.entries.iter().enumerate() {
            let out = if i == last {
                self.output_label().to_string()
            } else {
                format!("[ov{i}]")
            };
            if i > 0 {
                graph.push(';');
            }
            let _ = write!(
                graph,
                "{current}[{}:v]overlay=0:0:enable='between(t,{:.3},{:.3})'{out}",
                i + 1,
                entry.window.start_secs,
                entry.window.end_secs(),
            );
            current = out;
        }
        graph
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/plan.rs"]
mod tests;
