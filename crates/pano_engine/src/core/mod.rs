//! # Core Viewer Module
//!
//! Shared abstractions used by every subsystem of the viewer.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for the window, panorama pipeline,
//!   camera controls, VR and logging

pub mod config;

pub use config::{
    ViewerConfig,
    LoggingConfig,
    WindowConfig,
    PanoramaConfig,
    CameraConfig,
    PipelineConfig,
    VrConfig,
};
pub use crate::config::{Config, ConfigError};
