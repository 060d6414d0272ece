//! # Pano Engine
//!
//! Asynchronous render-to-display pipeline for 360 degree panoramas.
//!
//! A background render thread drives a panorama renderer to completion,
//! frame after frame, and publishes every finished equirectangular image
//! into a single-slot pixel relay. The display thread checks the relay once
//! per presented frame, uploads a new image when there is one, and draws it
//! as an environment map on an inward-facing cube, in mono on the desktop
//! or in stereo through a VR compositor. The display never waits on the
//! renderer.
//!
//! ## Features
//!
//! - **Pixel Relay**: Tear-free hand-off of whole frames between threads
//! - **Render Loop**: Scene-graph change detection and commit before every frame
//! - **Display Loop**: Non-blocking upload and mono/stereo environment drawing
//! - **Interactive Camera**: Low-latency perspective preview while moving
//! - **Renderers**: Image panoramas and a BVH-accelerated preview ray caster
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pano_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default();
//!     let options = SourceOptions { frame_size: config.panorama.frame_size(), ground_plane: true };
//!     let source = RendererRegistry::new().create_source("headlight", "model.obj".as_ref(), &options)?;
//!     let pipeline = PipelineController::start(source, &config.pipeline)?;
//!
//!     let window = ViewerWindow::new(&config.window)?;
//!     let backend = GlBackend::new()?;
//!     let camera = InteractiveCamera::new(
//!         pipeline.initial_cameras(),
//!         config.camera.move_step,
//!         std::time::Duration::from_millis(config.camera.revert_delay_ms),
//!     );
//!     let mut display = DisplayLoop::new(window, backend, pipeline.handle(), camera, &config.camera);
//!     let stats = display.run()?;
//!     println!("{} frames presented", stats.presented);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod config;
pub mod scene;
pub mod camera;
pub mod pipeline;
pub mod display;
pub mod assets;
pub mod renderers;

/// Common imports for viewer code
pub mod prelude {
    pub use crate::{
        camera::{CameraKind, CameraMode, CameraParams, CameraRig, InteractiveCamera},
        core::config::{CameraConfig, PipelineConfig, ViewerConfig, VrConfig, WindowConfig},
        config::{Config, ConfigError},
        display::{
            gl::GlBackend, DisplayError, DisplayLoop, DisplayStats, SimulatedHmd, ViewerWindow, VrCompositor,
            WindowError,
        },
        foundation::math::{Mat4, Vec3},
        pipeline::{
            FrameSize, PanoramaSource, PipelineController, PipelineError, PipelineHandle, PipelineHealth,
            PixelRelay, SceneCommand,
        },
        renderers::{RegistryError, RendererRegistry, SourceOptions},
        scene::{split_overrides, Node, NodeOverride},
    };
}
