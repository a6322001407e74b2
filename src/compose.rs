//! Turning an overlay sequence into a composited video.

pub mod engine;
pub mod ffmpeg;
pub mod plan;
pub mod retention;
