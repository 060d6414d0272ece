//! Image loading for equirectangular panoramas
//!
//! Provides PNG, JPEG, HDR and other image format loading through the
//! `image` crate, plus resampling to the configured panorama resolution.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::assets::AssetError;
use crate::pipeline::frame::{pack_rgba, FrameSize};

/// File extensions treated as panorama images
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "hdr", "bmp", "tga"];

/// Loaded RGBA8 image
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        log::debug!("Loading image from: {:?}", path_ref);
        let img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image: {}", e)))?;

        // HDR inputs are tone-clamped to 8 bits here
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();
        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Load image from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            data: color.repeat(width as usize * height as usize),
            width,
            height,
        }
    }

    /// Whether a path looks like a panorama image rather than a model
    pub fn is_image_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }

    /// Resample to `size` and pack into relay pixels
    ///
    /// Images whose aspect is not 2:1 are stretched; equirectangular
    /// sources are expected to already be 2:1.
    pub fn to_panorama(&self, size: FrameSize) -> Result<Vec<u32>, AssetError> {
        let image = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| AssetError::InvalidData(format!(
                "{} bytes do not form a {}x{} RGBA image",
                self.data.len(),
                self.width,
                self.height
            )))?;

        if (self.width as f32 / self.height.max(1) as f32 - 2.0).abs() > 0.01 {
            log::warn!("Panorama image is {}x{}, expected a 2:1 aspect", self.width, self.height);
        }

        let resized = if (self.width, self.height) == (size.width, size.height) {
            image
        } else {
            log::debug!("Resampling panorama {}x{} to {}", self.width, self.height, size);
            imageops::resize(&image, size.width, size.height, FilterType::Triangle)
        };

        Ok(resized
            .pixels()
            .map(|p| pack_rgba(p[0], p[1], p[2], p[3]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.data.len(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_to_panorama_resamples() {
        let img = ImageData::solid_color(8, 4, [10, 20, 30, 255]);
        let pixels = img.to_panorama(FrameSize::panorama(2)).unwrap();
        assert_eq!(pixels.len(), 8);
        for &p in &pixels {
            let channels = crate::pipeline::frame::unpack_rgba(p);
            for (got, want) in channels.iter().zip([10u8, 20, 30, 255]) {
                assert!(got.abs_diff(want) <= 1, "{channels:?}");
            }
        }

        let same = img.to_panorama(FrameSize::panorama(4)).unwrap();
        assert_eq!(same.len(), 32);
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let mut img = ImageData::solid_color(4, 2, [0, 0, 0, 255]);
        img.data.truncate(10);
        assert!(matches!(img.to_panorama(FrameSize::panorama(2)), Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_image_extensions() {
        assert!(ImageData::is_image_path(Path::new("sky.PNG")));
        assert!(ImageData::is_image_path(Path::new("/tmp/pano.hdr")));
        assert!(!ImageData::is_image_path(Path::new("bunny.obj")));
        assert!(!ImageData::is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_missing_file() {
        let result = ImageData::from_file("/definitely/not/here.png");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }
}
