//! Equirectangular texture mapping
//!
//! The panorama is sampled with
//!
//! ```text
//! u = (atan2(d.z, d.x) + PI/2) / (2 PI)
//! v = acos(d.y) / PI
//! ```
//!
//! for a normalized view direction `d`. The fragment shader and
//! [`panorama_uv`] evaluate the same expression, and
//! [`direction_from_uv`] inverts it for renderers that generate the
//! panorama. `u` covers `[-0.25, 0.75)`; the texture repeats horizontally.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::foundation::math::Vec3;

/// Unit cube as a 14-vertex triangle strip, viewed from inside
#[rustfmt::skip]
pub const CUBE_STRIP: [f32; 42] = [
    1.0, 1.0, -1.0,
    -1.0, 1.0, -1.0,
    1.0, 1.0, 1.0,
    -1.0, 1.0, 1.0,
    -1.0, -1.0, 1.0,
    -1.0, 1.0, -1.0,
    -1.0, -1.0, -1.0,
    1.0, 1.0, -1.0,
    1.0, -1.0, -1.0,
    1.0, 1.0, 1.0,
    1.0, -1.0, 1.0,
    -1.0, -1.0, 1.0,
    1.0, -1.0, -1.0,
    -1.0, -1.0, -1.0,
];

/// Number of vertices in [`CUBE_STRIP`]
pub const CUBE_STRIP_VERTICES: usize = CUBE_STRIP.len() / 3;

/// Texture coordinates for a view direction
pub fn panorama_uv(direction: Vec3) -> (f32, f32) {
    let d = direction.normalize();
    let u = (d.z.atan2(d.x) + FRAC_PI_2) / TAU;
    let v = d.y.clamp(-1.0, 1.0).acos() / PI;
    (u, v)
}

/// Unit view direction that samples texture coordinate `(u, v)`
pub fn direction_from_uv(u: f32, v: f32) -> Vec3 {
    let phi = TAU * u - FRAC_PI_2;
    let theta = PI * v;
    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

/// Direction through the center of panorama pixel `(x, y)`
pub fn pixel_direction(x: u32, y: u32, width: u32, height: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / width as f32;
    let v = (y as f32 + 0.5) / height as f32;
    direction_from_uv(u, v)
}
