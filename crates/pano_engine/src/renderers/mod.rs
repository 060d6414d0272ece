//! # Renderers
//!
//! Concrete panorama sources and the registry the viewer picks them from.
//!
//! A renderer module contributes one or more renderer types. The `raycast`
//! and `image` modules are registered up front; further modules are loaded
//! by name at startup.
//!
//! ```text
//! module     renderer types
//! raycast    headlight, normals, depth
//! image      image
//! debug      directions
//! ```

pub mod bvh;
pub mod image_source;
pub mod raycast;
pub mod test_pattern;

pub use image_source::ImageSource;
pub use raycast::{RayCaster, ShadingMode};
pub use test_pattern::DirectionPattern;

use std::path::Path;

use thiserror::Error;

use crate::pipeline::{FrameSize, PanoramaSource, SourceError};

/// Settings shared by every renderer type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    /// Panorama resolution to render at
    pub frame_size: FrameSize,
    /// Add a ground plane under ray-cast models
    pub ground_plane: bool,
}

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No module with this name is compiled in
    #[error("unknown renderer module '{0}'")]
    UnknownModule(String),

    /// No loaded module provides the renderer type
    #[error("no loaded module provides renderer type '{0}' (available: {1})")]
    UnknownRenderer(String, String),

    /// The renderer could not be created
    #[error(transparent)]
    Source(#[from] SourceError),
}

type SourceFactory = fn(&str, &Path, &SourceOptions) -> Result<Box<dyn PanoramaSource>, SourceError>;

/// A named group of renderer types sharing one factory
#[derive(Clone, Copy)]
pub struct RendererModule {
    name: &'static str,
    renderer_types: &'static [&'static str],
    factory: SourceFactory,
}

impl RendererModule {
    /// Name given to `-m`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Renderer types this module creates
    pub fn renderer_types(&self) -> &'static [&'static str] {
        self.renderer_types
    }
}

impl std::fmt::Debug for RendererModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererModule")
            .field("name", &self.name)
            .field("renderer_types", &self.renderer_types)
            .finish()
    }
}

const RAYCAST_MODULE: RendererModule = RendererModule {
    name: "raycast",
    renderer_types: &["headlight", "normals", "depth"],
    factory: create_raycast,
};

const IMAGE_MODULE: RendererModule = RendererModule {
    name: "image",
    renderer_types: &["image"],
    factory: create_image,
};

const DEBUG_MODULE: RendererModule = RendererModule {
    name: "debug",
    renderer_types: &["directions"],
    factory: create_test_pattern,
};

/// Every module that can be loaded by name
const KNOWN_MODULES: [RendererModule; 3] = [RAYCAST_MODULE, IMAGE_MODULE, DEBUG_MODULE];

/// Renderer modules loaded for this process
#[derive(Debug, Clone)]
pub struct RendererRegistry {
    modules: Vec<RendererModule>,
}

impl RendererRegistry {
    /// Registry holding the built-in `raycast` and `image` modules
    pub fn new() -> Self {
        Self { modules: vec![RAYCAST_MODULE, IMAGE_MODULE] }
    }

    /// Load a module by name; loading one twice is a no-op
    pub fn load_module(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.modules.iter().any(|m| m.name == name) {
            log::debug!("Renderer module '{name}' already loaded");
            return Ok(());
        }
        let module = KNOWN_MODULES
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))?;
        log::info!("Loaded renderer module '{name}' ({})", module.renderer_types.join(", "));
        self.modules.push(*module);
        Ok(())
    }

    /// Loaded modules, in load order
    pub fn modules(&self) -> &[RendererModule] {
        &self.modules
    }

    /// All renderer types provided by the loaded modules
    pub fn renderer_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.iter().flat_map(|m| m.renderer_types.iter().copied())
    }

    /// Create a source of `renderer_type` for the asset at `path`
    pub fn create_source(
        &self,
        renderer_type: &str,
        path: &Path,
        options: &SourceOptions,
    ) -> Result<Box<dyn PanoramaSource>, RegistryError> {
        let module = self
            .modules
            .iter()
            .find(|m| m.renderer_types.iter().any(|&t| t == renderer_type))
            .ok_or_else(|| {
                let available: Vec<_> = self.renderer_types().collect();
                RegistryError::UnknownRenderer(renderer_type.to_string(), available.join(", "))
            })?;

        log::info!(
            "Creating '{renderer_type}' renderer from module '{}' at {}",
            module.name,
            options.frame_size
        );
        Ok((module.factory)(renderer_type, path, options)?)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn create_raycast(
    renderer_type: &str,
    path: &Path,
    options: &SourceOptions,
) -> Result<Box<dyn PanoramaSource>, SourceError> {
    let shading = ShadingMode::from_name(renderer_type)
        .ok_or_else(|| SourceError::Render(format!("unknown shading '{renderer_type}'")))?;
    Ok(Box::new(RayCaster::from_obj(path, shading, options)?))
}

fn create_image(_: &str, path: &Path, options: &SourceOptions) -> Result<Box<dyn PanoramaSource>, SourceError> {
    Ok(Box::new(ImageSource::from_file(path, options.frame_size)?))
}

fn create_test_pattern(
    _: &str,
    _: &Path,
    options: &SourceOptions,
) -> Result<Box<dyn PanoramaSource>, SourceError> {
    Ok(Box::new(DirectionPattern::new(options.frame_size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options() -> SourceOptions {
        SourceOptions { frame_size: FrameSize::panorama(8), ground_plane: true }
    }

    #[test]
    fn test_builtin_modules() {
        let registry = RendererRegistry::new();
        let names: Vec<_> = registry.modules().iter().map(RendererModule::name).collect();
        assert_eq!(names, ["raycast", "image"]);
        let types: Vec<_> = registry.renderer_types().collect();
        assert_eq!(types, ["headlight", "normals", "depth", "image"]);
    }

    #[test]
    fn test_load_module() {
        let mut registry = RendererRegistry::new();
        assert!(matches!(registry.create_source("directions", Path::new(""), &options()),
            Err(RegistryError::UnknownRenderer(..))));

        registry.load_module("debug").unwrap();
        registry.load_module("debug").unwrap();
        registry.load_module("raycast").unwrap();
        assert_eq!(registry.modules().len(), 3);

        let source = registry.create_source("directions", Path::new(""), &options()).unwrap();
        assert_eq!(source.frame_size(), FrameSize::new(16, 8));

        let err = registry.load_module("optix").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownModule(name) if name == "optix"));
    }

    #[test]
    fn test_create_raycast_from_obj() {
        let path = std::env::temp_dir().join(format!("pano_registry_{}.obj", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "v 0 0 -1\nv 1 0 -1\nv 0 1 -1\nf 1 2 3").unwrap();
        drop(file);

        let registry = RendererRegistry::new();
        let source = registry.create_source("normals", &path, &options()).unwrap();
        assert!(source.scene_graph().is_some());
        assert_eq!(source.scene_graph().unwrap().get_str(&["renderer"]).unwrap(), "normals");
        assert!(source.scene_graph().unwrap().get_bool(&["ground_plane"]).unwrap());

        let missing = registry.create_source("headlight", Path::new("/nonexistent/model.obj"), &options());
        assert!(matches!(missing, Err(RegistryError::Source(SourceError::Asset(_)))));
        std::fs::remove_file(&path).ok();
    }
}
