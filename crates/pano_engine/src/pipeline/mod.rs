//! # Panorama Pipeline
//!
//! Asynchronous hand-off between a slow panorama renderer and a display that
//! must never stall on it.
//!
//! ## Organization
//!
//! - **frame**: Panorama dimensions and packed RGBA8 pixels
//! - **source**: The [`PanoramaSource`] seam implemented by renderers
//! - **pixel_relay**: Single-slot buffer shared by both threads
//! - **render_loop**: Body of the render thread
//! - **controller**: Owns the render thread, the shutdown flag and the
//!   camera command channel

pub mod frame;
pub mod source;
pub mod pixel_relay;
pub mod controller;

mod render_loop;

#[cfg(test)]
mod tests;

pub use controller::{PipelineController, PipelineHandle, PipelineHealth};
pub use frame::{pack_color, pack_rgba, unpack_rgba, FrameSize};
pub use pixel_relay::{PixelReadGuard, PixelRelay};
pub use source::{FrameStatus, PanoramaSource, SceneCommand, SourceError};

use thiserror::Error;

/// Errors raised by the pipeline itself
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A completed frame did not match the relay's dimensions
    #[error("frame has {actual} pixels, relay expects {expected}")]
    FrameSizeMismatch {
        /// Pixel count of the relay
        expected: usize,
        /// Pixel count of the offered frame
        actual: usize,
    },

    /// The panorama source failed
    #[error("panorama source failed: {0}")]
    Source(#[from] SourceError),

    /// The render thread could not be started
    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The render thread panicked
    #[error("render thread panicked: {0}")]
    Panicked(String),
}
