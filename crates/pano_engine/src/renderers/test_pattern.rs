//! Direction test pattern
//!
//! Colors every panorama pixel by the view direction it is sampled from,
//! mapped to RGB. Viewed through the display, +X shows up red, +Y green and
//! +Z blue, which makes mapping mistakes obvious at a glance.

use crate::display::texture_mapping::pixel_direction;
use crate::foundation::math::Vec3;
use crate::pipeline::{pack_color, FrameSize, FrameStatus, PanoramaSource, SourceError};

/// Panorama colored by the view direction of each pixel
pub struct DirectionPattern {
    size: FrameSize,
    pixels: Vec<u32>,
    rendered: bool,
}

impl DirectionPattern {
    /// Pattern of `size`, computed up front
    pub fn new(size: FrameSize) -> Self {
        let pixels = (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| (x, y)))
            .map(|(x, y)| pixel_direction(x, y, size.width, size.height))
            .map(|d| pack_color((d + Vec3::repeat(1.0)) * 0.5))
            .collect();
        Self { size, pixels, rendered: false }
    }
}

impl PanoramaSource for DirectionPattern {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        if std::mem::replace(&mut self.rendered, true) {
            Ok(FrameStatus::Unchanged)
        } else {
            Ok(FrameStatus::Rendered)
        }
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.pixels)
    }
}
