//! Asset loading for the stand-in renderers

pub mod obj_loader;
pub mod image_loader;

pub use obj_loader::{ObjError, ObjLoader, TriangleMesh};
pub use image_loader::ImageData;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Malformed OBJ model
    #[error(transparent)]
    Obj(#[from] ObjError),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
