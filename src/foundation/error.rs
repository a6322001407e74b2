/// Convenience result type used across telesync.
pub type TelesyncResult<T> = Result<T, TelesyncError>;

/// Error taxonomy surfaced by the pipeline. Every variant is fatal to the current request.
#[derive(thiserror::Error, Debug)]
pub enum TelesyncError {
    /// Missing or oversized video, insufficient trackpoints, missing activity id.
    #[error("validation error: {0}")]
    InputValidation(String),

    /// The activity stream lacks a required time series.
    #[error("missing telemetry: {0}")]
    MissingTelemetry(String),

    /// ffprobe could not read the video metadata.
    #[error("metadata extraction error: {0}")]
    MetadataExtraction(String),

    /// No trackpoint falls inside the video's time window.
    #[error("synchronization error: {0}")]
    Synchronization(String),

    /// Writing an overlay frame asset failed.
    #[error("overlay generation error: {0}")]
    OverlayGeneration(String),

    /// The encoder exited non-zero or could not be driven.
    #[error("compositing error: {0}")]
    Compositing(String),

    /// The encoder exceeded its wall-clock budget and was killed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Errors when serializing or deserializing provider or result documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TelesyncError {
    /// Build a [`TelesyncError::InputValidation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    /// Build a [`TelesyncError::MissingTelemetry`] value.
    pub fn missing_telemetry(msg: impl Into<String>) -> Self {
        Self::MissingTelemetry(msg.into())
    }

    /// Build a [`TelesyncError::MetadataExtraction`] value.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::MetadataExtraction(msg.into())
    }

    /// Build a [`TelesyncError::Synchronization`] value.
    pub fn synchronization(msg: impl Into<String>) -> Self {
        Self::Synchronization(msg.into())
    }

    /// Build a [`TelesyncError::OverlayGeneration`] value.
    pub fn overlay(msg: impl Into<String>) -> Self {
        Self::OverlayGeneration(msg.into())
    }

    /// Build a [`TelesyncError::Compositing`] value.
    pub fn compositing(msg: impl Into<String>) -> Self {
        Self::Compositing(msg.into())
    }

    /// Build a [`TelesyncError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`TelesyncError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
