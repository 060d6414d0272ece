//! # Display
//!
//! Main-thread side of the viewer: polls input, uploads fresh panoramas and
//! draws them as an environment map, in mono or stereo.
//!
//! ## Organization
//!
//! - **display_loop**: Per-frame driver, generic over surface and backend
//! - **backend**: [`DisplaySurface`] and [`DisplayBackend`] seams
//! - **texture_mapping**: Equirectangular mapping and the cube strip
//! - **vr**: [`VrCompositor`] seam and the simulated headset
//! - **window**: GLFW window implementing [`DisplaySurface`]
//! - **gl**: OpenGL implementation of [`DisplayBackend`]

pub mod backend;
pub mod display_loop;
pub mod gl;
pub mod input;
pub mod texture_mapping;
pub mod vr;
pub mod window;

pub use backend::{DisplayBackend, DisplayError, DisplayResult, DisplaySurface, DrawTarget, Eye, TextureHandle};
pub use display_loop::{DisplayLoop, DisplayStats, LoopControl};
pub use input::{InputEvent, LookDirection};
pub use vr::{EyeView, SimulatedHmd, VrCompositor};
pub use window::{ViewerWindow, WindowError};
