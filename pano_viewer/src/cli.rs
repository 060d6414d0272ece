//! Command line interface
//!
//! Scene graph overrides (`-node:leaf=value`) are split off before clap sees
//! the arguments, so everything here is a regular option.

use std::path::PathBuf;

use clap::Parser;
use pano_engine::assets::ImageData;
use pano_engine::config::{Config, ConfigError};
use pano_engine::core::ViewerConfig;

/// Renderer type used for image panoramas regardless of `--renderer`
pub const IMAGE_RENDERER: &str = "image";

#[derive(Parser, Debug)]
#[command(name = "pano360", version, about = "Asynchronous 360 degree panorama viewer")]
pub struct Cli {
    /// OBJ model to ray cast, or an equirectangular image
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Renderer type for models (headlight, normals, depth)
    #[arg(short, long, value_name = "TYPE", default_value = "headlight")]
    pub renderer: String,

    /// Disable the ground plane under ray-cast models
    #[arg(long)]
    pub no_ground_plane: bool,

    /// Print the scene graph after setup
    #[arg(short = 'd', long)]
    pub print_scene: bool,

    /// Open fullscreen on the primary monitor
    #[arg(short, long)]
    pub fullscreen: bool,

    /// Load an additional renderer module (repeatable)
    #[arg(short, long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Stereo output through the simulated HMD
    #[arg(long)]
    pub vr: bool,

    /// TOML or RON configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Panorama height in pixels (width is twice this)
    #[arg(long, value_name = "N")]
    pub panorama_height: Option<u32>,
}

impl Cli {
    /// Configuration file (or defaults) with command line options applied
    pub fn load_config(&self) -> Result<ViewerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load_from_file(path)?,
            None => ViewerConfig::default(),
        };
        if self.fullscreen {
            config.window.fullscreen = true;
        }
        if let Some(height) = self.panorama_height {
            config.panorama.height = height;
        }
        config.validate()?;
        Ok(config)
    }

    /// Renderer type to create for `model`
    pub fn renderer_type(&self) -> &str {
        if ImageData::is_image_path(&self.model) {
            IMAGE_RENDERER
        } else {
            &self.renderer
        }
    }
}
