//! Panorama frame dimensions and packed pixel helpers

use crate::foundation::math::Vec3;

/// Pixel dimensions of a panorama frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameSize {
    /// Arbitrary frame size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Equirectangular frame size for a given height (width is `2 * height`)
    pub const fn panorama(height: u32) -> Self {
        Self { width: height * 2, height }
    }

    /// Number of pixels in one frame
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width / height
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pack 8-bit channels into one pixel (memory byte order R, G, B, A)
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([r, g, b, a])
}

/// Split a packed pixel into its 8-bit channels
pub const fn unpack_rgba(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// Pack a linear `[0, 1]` color into an opaque pixel
pub fn pack_color(color: Vec3) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    pack_rgba(channel(color.x), channel(color.y), channel(color.z), 255)
}

/// View packed pixels as raw RGBA8 bytes for texture upload
pub fn pixel_bytes(pixels: &[u32]) -> &[u8] {
    bytemuck::cast_slice(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panorama_size_is_two_to_one() {
        let size = FrameSize::panorama(1024);
        assert_eq!(size, FrameSize::new(2048, 1024));
        assert_eq!(size.pixel_count(), 2048 * 1024);
        assert_eq!(size.aspect(), 2.0);
        assert_eq!(size.to_string(), "2048x1024");
    }

    #[test]
    fn test_packed_pixels_are_rgba_in_memory() {
        let pixels = [pack_rgba(1, 2, 3, 4), pack_rgba(10, 20, 30, 40)];
        assert_eq!(pixel_bytes(&pixels), &[1, 2, 3, 4, 10, 20, 30, 40]);
        assert_eq!(unpack_rgba(pixels[1]), [10, 20, 30, 40]);
    }

    #[test]
    fn test_pack_color_clamps() {
        assert_eq!(pack_color(Vec3::new(2.0, -1.0, 1.0)), pack_rgba(255, 0, 255, 255));
    }
}
