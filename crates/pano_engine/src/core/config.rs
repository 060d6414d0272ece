//! # Unified Configuration System
//!
//! All configuration structures for the viewer live here. Every section
//! carries serde defaults, so a config file only needs the keys it changes:
//!
//! ```toml
//! [panorama]
//! height = 2048
//!
//! [camera]
//! move_step = 0.25
//! ```
//!
//! ## Configuration Categories
//!
//! - **Logging**: Default log filter level
//! - **Window**: Desktop window size, title, fullscreen and vsync
//! - **Panorama**: Resolution of the equirectangular frame
//! - **Camera**: Interactive movement and desktop look controls
//! - **Pipeline**: Render thread pacing
//! - **VR**: Simulated HMD parameters

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};
use crate::pipeline::FrameSize;

/// Largest supported panorama height (width is twice this)
pub const MAX_PANORAMA_HEIGHT: u32 = 8192;

/// # Logging Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// # Window Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Window title
    pub title: String,
    /// Open fullscreen on the primary monitor
    pub fullscreen: bool,
    /// Sync presentation to the display refresh
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "pano360".to_string(),
            fullscreen: false,
            vsync: true,
        }
    }
}

/// # Panorama Configuration
///
/// Height of the equirectangular frame shared between the render thread
/// and the display thread. Width is always twice the height.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaConfig {
    /// Panorama height in pixels
    pub height: u32,
}

impl PanoramaConfig {
    /// Frame size derived from the configured height
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::panorama(self.height)
    }
}

impl Default for PanoramaConfig {
    fn default() -> Self {
        Self { height: 1024 }
    }
}

/// # Camera Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance the perspective camera moves per movement key event
    pub move_step: f32,
    /// Minimum time since the last movement before reverting to the
    /// panoramic camera, in milliseconds
    pub revert_delay_ms: u64,
    /// Initial desktop look azimuth in radians
    pub look_phi: f32,
    /// Initial desktop look polar angle in radians (measured from +Y)
    pub look_theta: f32,
    /// Look rotation per tick while an arrow key is held, in radians
    pub look_speed: f32,
    /// Desktop vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            move_step: 0.1,
            revert_delay_ms: 0,
            look_phi: 0.0,
            look_theta: 1.3,
            look_speed: 0.01,
            fov_degrees: 60.0,
        }
    }
}

/// # Pipeline Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sleep between render iterations when the source reports no change,
    /// in milliseconds
    pub idle_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { idle_backoff_ms: 5 }
    }
}

/// # VR Configuration
///
/// Parameters of the built-in simulated HMD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VrConfig {
    /// Inter-pupillary distance in meters
    pub ipd: f32,
    /// Per-eye render target width
    pub render_width: u32,
    /// Per-eye render target height
    pub render_height: u32,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            ipd: 0.063,
            render_width: 1512,
            render_height: 1680,
        }
    }
}

/// # Complete Viewer Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Desktop window configuration
    pub window: WindowConfig,
    /// Panorama resolution
    pub panorama: PanoramaConfig,
    /// Camera controls
    pub camera: CameraConfig,
    /// Render thread pacing
    pub pipeline: PipelineConfig,
    /// Simulated HMD
    pub vr: VrConfig,
}

impl ViewerConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".to_string()));
        }
        if self.panorama.height == 0 || self.panorama.height > MAX_PANORAMA_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "panorama height must be in 1..={MAX_PANORAMA_HEIGHT}, got {}",
                self.panorama.height
            )));
        }
        if !self.camera.move_step.is_finite() || self.camera.move_step <= 0.0 {
            return Err(ConfigError::Invalid("camera move_step must be positive".to_string()));
        }
        let look = [self.camera.look_speed, self.camera.look_phi, self.camera.look_theta];
        if !look.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::Invalid(
                "camera look_speed, look_phi and look_theta must be finite".to_string(),
            ));
        }
        if !(1.0..180.0).contains(&self.camera.fov_degrees) {
            return Err(ConfigError::Invalid("camera fov_degrees must be in [1, 180)".to_string()));
        }
        if self.vr.render_width == 0 || self.vr.render_height == 0 {
            return Err(ConfigError::Invalid("vr render size must be non-zero".to_string()));
        }
        if !self.vr.ipd.is_finite() || self.vr.ipd < 0.0 {
            return Err(ConfigError::Invalid("vr ipd must be non-negative".to_string()));
        }
        Ok(())
    }
}

impl Config for ViewerConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.panorama.frame_size(), FrameSize::new(2048, 1024));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ViewerConfig = toml::from_str("[panorama]\nheight = 2048\n").unwrap();
        assert_eq!(config.panorama.height, 2048);
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.pipeline.idle_backoff_ms, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ViewerConfig::default();
        config.panorama.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ViewerConfig::default();
        config.panorama.height = MAX_PANORAMA_HEIGHT + 1;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.camera.move_step = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_look_values_are_rejected() {
        for line in ["look_speed = nan", "look_phi = inf", "look_theta = -inf"] {
            let config: ViewerConfig = toml::from_str(&format!("[camera]\n{line}\n")).unwrap();
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{line}");
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("pano_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = ViewerConfig::default();
        config.camera.move_step = 0.5;
        config.window.title = "round trip".to_string();

        for name in ["viewer.toml", "viewer.ron"] {
            let path = dir.join(name);
            config.save_to_file(&path).unwrap();
            let loaded = ViewerConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded.camera.move_step, 0.5);
            assert_eq!(loaded.window.title, "round trip");
        }

        let unsupported = ViewerConfig::load_from_file(dir.join("viewer.yaml"));
        assert!(unsupported.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
