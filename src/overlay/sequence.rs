use std::path::PathBuf;

use serde::Serialize;

use crate::{
    foundation::{
        error::{TelesyncError, TelesyncResult},
        time::Instant,
    },
    overlay::gauge::{GaugeInput, render_svg, speed_scale},
    telemetry::model::{TrackMetrics, Trackpoint},
};

/// Naming scope of one job's overlay assets.
///
/// Files are named `overlay_{activity}_{job}_{index:06}.{ext}`; the job component keeps concurrent
/// requests for the same activity apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OverlayScope {
    pub activity_id: String,
    pub job_id: String,
}

impl OverlayScope {
    pub fn new(activity_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            job_id: job_id.into(),
        }
    }

    pub fn prefix(&self) -> String {
        format!("overlay_{}_{}_", self.activity_id, self.job_id)
    }

    pub fn file_name(&self, index: usize, ext: &str) -> String {
        format!("{}{index:06}.{ext}", self.prefix())
    }

    pub fn owns(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix())
            && (file_name.ends_with(".svg") || file_name.ends_with(".png"))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OverlayFrame {
    pub index: usize,
    pub time: Instant,
    pub svg_path: PathBuf,
    pub metrics: TrackMetrics,
}

#[derive(Clone, Debug, Serialize)]
pub struct OverlaySequence {
    pub scope: OverlayScope,
    pub frames: Vec<OverlayFrame>,
    pub max_speed_kmh: f64,
    pub speed_scale_kmh: f64,
}

impl OverlaySequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Writes overlay frames into a transient directory and removes them again.
#[derive(Clone, Debug)]
pub struct OverlayGenerator {
    dir: PathBuf,
}

impl OverlayGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Render one SVG per annotated trackpoint. All frames share one speed-dial scale derived from
    /// the sequence-wide maximum speed.
    ///
    /// Any write failure aborts generation; frames already written stay on disk until
    /// [`OverlayGenerator::cleanup`] runs.
    #[tracing::instrument(skip_all, fields(activity_id = %scope.activity_id, job_id = %scope.job_id))]
    pub async fn generate(
        &self,
        scope: &OverlayScope,
        points: &[Trackpoint],
    ) -> TelesyncResult<OverlaySequence> {
        let annotated: Vec<(Instant, TrackMetrics)> = points
            .iter()
            .filter_map(|p| p.metrics.map(|m| (p.time, m)))
            .collect();

        let max_speed_kmh = annotated
            .iter()
            .map(|(_, m)| m.speed_kmh)
            .fold(0.0_f64, f64::max);
        let scale = speed_scale(max_speed_kmh);

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TelesyncError::overlay(format!(
                "failed to create overlay directory '{}': {e}",
                self.dir.display()
            ))
        })?;

        let mut frames = Vec::with_capacity(annotated.len());
        for (index, (time, metrics)) in annotated.into_iter().enumerate() {
            let svg = render_svg(&GaugeInput {
                metrics,
                time,
                speed_scale_kmh: scale,
            });
            let svg_path = self.dir.join(scope.file_name(index, "svg"));
            tokio::fs::write(&svg_path, svg).await.map_err(|e| {
                TelesyncError::overlay(format!(
                    "failed to write overlay frame '{}': {e}",
                    svg_path.display()
                ))
            })?;
            frames.push(OverlayFrame {
                index,
                time,
                svg_path,
                metrics,
            });
        }

        tracing::info!(
            frames = frames.len(),
            max_speed_kmh,
            speed_scale_kmh = scale,
            "overlay sequence generated"
        );

        Ok(OverlaySequence {
            scope: scope.clone(),
            frames,
            max_speed_kmh,
            speed_scale_kmh: scale,
        })
    }

    /// Delete every file of `scope` in the overlay directory. Best-effort: failures are logged and
    /// the number of removed files is returned.
    pub async fn cleanup(&self, scope: &OverlayScope) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "overlay cleanup could not list directory");
                return 0;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "overlay cleanup stopped early");
                    break;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !scope.owns(name) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(file = name, error = %e, "failed to remove overlay file"),
            }
        }

        tracing::info!(
            activity_id = %scope.activity_id,
            job_id = %scope.job_id,
            removed,
            "overlay files cleaned up"
        );
        removed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/sequence.rs"]
mod tests;
