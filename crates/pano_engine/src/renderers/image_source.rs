//! Static equirectangular image as a panorama source

use std::path::Path;

use crate::assets::ImageData;
use crate::pipeline::{FrameSize, FrameStatus, PanoramaSource, SourceError};

/// Publishes one resampled image, then reports no further changes
pub struct ImageSource {
    size: FrameSize,
    pixels: Vec<u32>,
    rendered: bool,
}

impl ImageSource {
    /// Load and resample the image at `path`
    pub fn from_file(path: &Path, size: FrameSize) -> Result<Self, SourceError> {
        let image = ImageData::from_file(path)?;
        Self::from_image(&image, size)
    }

    /// Resample an already loaded image
    pub fn from_image(image: &ImageData, size: FrameSize) -> Result<Self, SourceError> {
        let pixels = image.to_panorama(size)?;
        Ok(Self { size, pixels, rendered: false })
    }
}

impl PanoramaSource for ImageSource {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        if self.rendered {
            return Ok(FrameStatus::Unchanged);
        }
        self.rendered = true;
        Ok(FrameStatus::Rendered)
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::unpack_rgba;

    #[test]
    fn test_renders_once() {
        let image = ImageData::solid_color(16, 8, [0, 128, 255, 255]);
        let mut source = ImageSource::from_image(&image, FrameSize::panorama(4)).unwrap();
        assert_eq!(source.frame_size(), FrameSize::new(8, 4));
        assert!(source.last_modified().is_none());

        assert_eq!(source.render_one_frame().unwrap(), FrameStatus::Rendered);
        let pixels = source.map_completed().unwrap();
        assert_eq!(pixels.len(), 32);
        assert_eq!(unpack_rgba(pixels[0])[3], 255);
        source.unmap();

        assert_eq!(source.render_one_frame().unwrap(), FrameStatus::Unchanged);
        assert_eq!(source.render_one_frame().unwrap(), FrameStatus::Unchanged);
    }

    #[test]
    fn test_missing_file() {
        let result = ImageSource::from_file(Path::new("/nonexistent/pano.png"), FrameSize::panorama(4));
        assert!(matches!(result, Err(SourceError::Asset(_))));
    }
}
