//! Camera rig shared by the renderer and the interactive controls
//!
//! A renderer carries two camera configurations: a panoramic camera that
//! produces the equirectangular environment, and a perspective camera that
//! the user steers. Exactly one of them is active at a time.

pub mod interactive;

pub use interactive::{CameraMode, InteractiveCamera, KeyAction, MoveDirection, MoveEvent};

use crate::foundation::math::{Vec3, WORLD_UP};

/// Which of the two cameras a parameter set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraKind {
    /// Equirectangular camera feeding the background panorama
    Panoramic,
    /// User-steerable pinhole camera
    Perspective,
}

impl CameraKind {
    /// Scene graph name of the camera group
    pub fn node_name(self) -> &'static str {
        match self {
            Self::Panoramic => "panoramic",
            Self::Perspective => "perspective",
        }
    }
}

impl std::fmt::Display for CameraKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.node_name())
    }
}

/// Shared camera fields, tagged with the camera variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    /// Which camera these parameters describe
    pub kind: CameraKind,
    /// Eye position in world space
    pub position: Vec3,
    /// View direction, normalized
    pub direction: Vec3,
    /// Approximate up vector, re-orthogonalized when rendering
    pub up: Vec3,
}

impl CameraParams {
    /// Camera at `position` looking down `direction`
    pub fn new(kind: CameraKind, position: Vec3, direction: Vec3) -> Self {
        Self {
            kind,
            position,
            direction: direction.try_normalize(f32::EPSILON).unwrap_or(-Vec3::z()),
            up: WORLD_UP,
        }
    }

    /// Move along the view direction by `distance`
    pub fn advance(&mut self, distance: f32) {
        self.position += self.direction * distance;
    }
}

/// The two cameras plus the active selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Preview camera used while moving
    pub perspective: CameraParams,
    /// Camera producing the environment panorama
    pub panoramic: CameraParams,
    /// Camera currently feeding the renderer
    pub active: CameraKind,
}

impl CameraRig {
    /// Both cameras at `position` looking down `direction`, panoramic active
    pub fn at(position: Vec3, direction: Vec3) -> Self {
        Self {
            perspective: CameraParams::new(CameraKind::Perspective, position, direction),
            panoramic: CameraParams::new(CameraKind::Panoramic, position, direction),
            active: CameraKind::Panoramic,
        }
    }

    /// Parameters of the active camera
    pub fn active_params(&self) -> &CameraParams {
        self.params(self.active)
    }

    /// Parameters of `kind`
    pub fn params(&self, kind: CameraKind) -> &CameraParams {
        match kind {
            CameraKind::Panoramic => &self.panoramic,
            CameraKind::Perspective => &self.perspective,
        }
    }

    /// Mutable parameters of `kind`
    pub fn params_mut(&mut self, kind: CameraKind) -> &mut CameraParams {
        match kind {
            CameraKind::Panoramic => &mut self.panoramic,
            CameraKind::Perspective => &mut self.perspective,
        }
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::at(Vec3::zeros(), -Vec3::z())
    }
}
