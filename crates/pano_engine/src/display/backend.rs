//! Backend abstraction traits for the display loop
//!
//! The display loop never calls a graphics API directly. It talks to a
//! [`DisplaySurface`] for window and input and to a [`DisplayBackend`] for
//! drawing, which keeps the loop testable without a GPU.

use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::pipeline::FrameSize;

use super::input::InputEvent;

/// Result type for backend operations
pub type DisplayResult<T> = Result<T, DisplayError>;

/// Display errors
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Shader failed to compile; carries the full info log
    #[error("{stage} shader compilation failed:\n{log}")]
    ShaderCompile { stage: &'static str, log: String },

    /// Program failed to link; carries the full info log
    #[error("shader program link failed:\n{log}")]
    ShaderLink { log: String },

    /// Off-screen target is not complete
    #[error("framebuffer incomplete (status 0x{0:04x})")]
    IncompleteFramebuffer(u32),

    /// Uploaded pixels do not match the stated size
    #[error("texture upload of {actual} pixels for a {size} panorama")]
    TextureSize { size: FrameSize, actual: usize },

    /// The VR compositor refused a frame
    #[error("VR compositor error: {0}")]
    Compositor(String),
}

/// Which eye an off-screen target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Left eye
    Left,
    /// Right eye
    Right,
}

impl Eye {
    /// Draw order of the eye passes
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];
}

/// Where the next draw calls land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// Default framebuffer of the window
    Window { width: u32, height: u32 },
    /// Off-screen color and depth target for one eye
    Eye { eye: Eye, width: u32, height: u32 },
}

/// Backend texture name handed to the VR compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// GPU side of the display loop
pub trait DisplayBackend {
    /// Replace the environment texture with a full panorama frame
    fn upload_panorama(&mut self, size: FrameSize, pixels: &[u32]) -> DisplayResult<()>;

    /// Bind and clear a draw target
    fn begin_pass(&mut self, target: DrawTarget) -> DisplayResult<()>;

    /// Draw the environment cube with the combined projection-view matrix
    fn draw_environment(&mut self, proj_view: &Mat4) -> DisplayResult<()>;

    /// Color texture of an eye target, once it has been drawn into
    fn eye_texture(&self, eye: Eye) -> Option<TextureHandle>;
}

/// Window side of the display loop
pub trait DisplaySurface {
    /// Pump the event queue and return what happened since the last call
    fn poll_input(&mut self) -> Vec<InputEvent>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    fn should_close(&self) -> bool;

    fn request_close(&mut self);

    /// Swap buffers
    fn present(&mut self);
}
