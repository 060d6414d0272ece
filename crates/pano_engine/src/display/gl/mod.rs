//! OpenGL backend
//!
//! - **shader**: Program compilation with complete error logs
//! - **framebuffer**: Per-eye off-screen targets
//! - **backend**: The environment-cube [`GlBackend`]

pub mod shader;
pub mod framebuffer;
pub mod backend;

pub use backend::GlBackend;
