//! Activity telemetry: provider documents, trackpoints and the metrics derived from them.

pub mod activity;
pub mod correlate;
pub mod metrics;
pub mod model;
pub mod normalize;
