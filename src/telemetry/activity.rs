use std::{
    future::Future,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::foundation::{
    error::{TelesyncError, TelesyncResult},
    time::{Instant, offset_secs},
};

/// Activity summary as returned by the activity-data provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub sport_type: Option<String>,
    #[serde(rename = "start_date")]
    pub start: DateTime<Utc>,
    /// Offset of the activity's local clock from UTC, in seconds.
    #[serde(default)]
    pub utc_offset: f64,
    #[serde(rename = "elapsed_time")]
    pub elapsed_secs: f64,
}

impl Activity {
    /// Start of the activity on its local clock (`start + utc_offset`).
    pub fn local_start(&self) -> TelesyncResult<Instant> {
        offset_secs(self.start.naive_utc(), self.utc_offset).ok_or_else(|| {
            TelesyncError::validation(format!(
                "activity {} has an out-of-range utc_offset {}",
                self.id, self.utc_offset
            ))
        })
    }

    pub fn local_end(&self) -> TelesyncResult<Instant> {
        offset_secs(self.local_start()?, self.elapsed_secs).ok_or_else(|| {
            TelesyncError::validation(format!(
                "activity {} has an out-of-range elapsed_time {}",
                self.id, self.elapsed_secs
            ))
        })
    }

    /// Whether `t` falls inside the activity, both ends inclusive.
    pub fn contains(&self, t: Instant) -> TelesyncResult<bool> {
        Ok(t >= self.local_start()? && t <= self.local_end()?)
    }
}

/// A single provider stream; only the sample data is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stream<T> {
    pub data: Vec<T>,
}

/// Index-aligned sample series. Absent entries are missing samples, not errors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStreams {
    /// Seconds elapsed since the activity start.
    #[serde(default)]
    pub time: Option<Stream<f64>>,
    #[serde(default)]
    pub latlng: Option<Stream<Option<[f64; 2]>>>,
    /// Elevation in metres.
    #[serde(default)]
    pub altitude: Option<Stream<Option<f64>>>,
    /// Cumulative distance in metres.
    #[serde(default)]
    pub distance: Option<Stream<Option<f64>>>,
}

/// Provider document: the activity plus its streams.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityData {
    pub activity: Activity,
    #[serde(default)]
    pub streams: ActivityStreams,
}

/// Activity ids are non-empty runs of ASCII digits.
pub fn validate_activity_id(activity_id: &str) -> TelesyncResult<()> {
    if activity_id.is_empty() {
        return Err(TelesyncError::validation("activity id is required"));
    }
    if !activity_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TelesyncError::validation(format!(
            "activity id must be numeric, got '{activity_id}'"
        )));
    }
    Ok(())
}

/// Boundary to the activity-data provider.
pub trait ActivitySource {
    fn fetch(&self, activity_id: &str) -> impl Future<Output = TelesyncResult<ActivityData>> + Send;
}

/// Reads provider documents stored as `<root>/<activity_id>.json`.
#[derive(Clone, Debug)]
pub struct JsonActivitySource {
    root: PathBuf,
}

impl JsonActivitySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, activity_id: &str) -> PathBuf {
        self.root.join(format!("{activity_id}.json"))
    }
}

impl ActivitySource for JsonActivitySource {
    async fn fetch(&self, activity_id: &str) -> TelesyncResult<ActivityData> {
        validate_activity_id(activity_id)?;
        let path = self.path_for(activity_id);
        let data = read_activity_file(&path).await?;
        if data.activity.id != activity_id {
            return Err(TelesyncError::validation(format!(
                "'{}' holds activity {} (expected {activity_id})",
                path.display(),
                data.activity.id
            )));
        }
        tracing::debug!(activity_id, path = %path.display(), "activity document loaded");
        Ok(data)
    }
}

pub async fn read_activity_file(path: &Path) -> TelesyncResult<ActivityData> {
    use anyhow::Context as _;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read activity document '{}'", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        TelesyncError::serde(format!(
            "activity document '{}' is malformed: {e}",
            path.display()
        ))
    })
}

fn id_from_string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }
    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/telemetry/activity.rs"]
mod tests;
