//! Preview ray caster
//!
//! Casts one primary ray per pixel against a BVH of the loaded mesh and
//! shades the closest hit with a headlight, the surface normal or the hit
//! distance. An optional checkered ground plane sits under the model.
//!
//! Every parameter lives in the source's scene graph:
//!
//! ```text
//! raycast <group>
//!   renderer <string> = "headlight"       headlight | normals | depth
//!   ground_plane <bool>
//!   background <vec3f>
//!   max_distance <float>                  depth shading range
//!   camera <string> = "panoramic"         active camera
//!   panoramic <group>                     position, direction, up
//!   perspective <group>                   position, direction, up, fovy
//! ```
//!
//! Camera commands from the display thread only touch the scene graph. The
//! parameters a frame is rendered with are read back at commit time, so a
//! frame never sees a half-applied camera update.

use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use crate::assets::{ObjLoader, TriangleMesh, AssetError};
use crate::camera::{CameraKind, CameraParams, CameraRig};
use crate::display::texture_mapping::pixel_direction;
use crate::foundation::math::{camera_basis, Vec3, WORLD_UP};
use crate::pipeline::{pack_color, FrameSize, FrameStatus, PanoramaSource, SceneCommand, SourceError};
use crate::scene::{Node, NodeError, NodeValue};

use super::bvh::{Bvh, Ray};
use super::SourceOptions;

/// Root name of the ray caster's scene graph
pub const SCENE_ROOT: &str = "raycast";

const SURFACE_ALBEDO: f32 = 0.85;
const GROUND_LIGHT: Vec3 = Vec3::new(0.55, 0.55, 0.58);
const GROUND_DARK: Vec3 = Vec3::new(0.3, 0.3, 0.33);

/// Shading applied to primary hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    /// Diffuse light placed at the camera
    Headlight,
    /// Normal mapped to RGB
    Normals,
    /// Grey ramp over hit distance
    Depth,
}

impl ShadingMode {
    /// Every mode, in scene graph whitelist order
    pub const ALL: [Self; 3] = [Self::Headlight, Self::Normals, Self::Depth];

    /// Renderer type name
    pub fn name(self) -> &'static str {
        match self {
            Self::Headlight => "headlight",
            Self::Normals => "normals",
            Self::Depth => "depth",
        }
    }

    /// Mode for a renderer type name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// Parameters one frame is rendered with
#[derive(Debug, Clone, Copy)]
struct FrameParams {
    shading: ShadingMode,
    ground_plane: bool,
    background: Vec3,
    max_distance: f32,
    camera: CameraParams,
    fovy_degrees: f32,
}

impl FrameParams {
    /// Primary ray through the center of pixel `(x, y)`
    fn primary_ray(&self, x: u32, y: u32, size: FrameSize) -> Ray {
        let (right, up, forward) = camera_basis(self.camera.direction, self.camera.up);
        let direction = match self.camera.kind {
            CameraKind::Panoramic => {
                // Same frame the display samples in: identity for +Z forward, +Y up
                let d = pixel_direction(x, y, size.width, size.height);
                right * d.x + up * d.y + forward * d.z
            }
            CameraKind::Perspective => {
                let half_height = (self.fovy_degrees.to_radians() * 0.5).tan();
                let half_width = half_height * size.aspect();
                let sx = (2.0 * (x as f32 + 0.5) / size.width as f32 - 1.0) * half_width;
                let sy = (1.0 - 2.0 * (y as f32 + 0.5) / size.height as f32) * half_height;
                // `right` from the basis is up x forward, which is screen-left here
                forward - right * sx + up * sy
            }
        };
        Ray::new(self.camera.position, direction.normalize())
    }
}

/// Read-only view of everything a worker needs to shade pixels
struct Tracer<'a> {
    bvh: &'a Bvh,
    params: &'a FrameParams,
    ground_height: f32,
    checker_size: f32,
}

impl Tracer<'_> {
    fn shade(&self, ray: &Ray) -> Vec3 {
        let mesh_hit = self.bvh.intersect(ray, f32::INFINITY);
        let t_mesh = mesh_hit.map_or(f32::INFINITY, |h| h.t);

        if let Some(t) = self.ground_hit(ray).filter(|&t| t < t_mesh) {
            return self.shade_surface(ray, t, WORLD_UP, Some(ray.at(t)));
        }
        match mesh_hit {
            Some(hit) => self.shade_surface(ray, hit.t, self.bvh.normal(hit.triangle), None),
            None => self.params.background,
        }
    }

    fn ground_hit(&self, ray: &Ray) -> Option<f32> {
        if !self.params.ground_plane || ray.direction.y.abs() < 1.0e-6 {
            return None;
        }
        let t = (self.ground_height - ray.origin.y) / ray.direction.y;
        (t > 1.0e-4).then_some(t)
    }

    fn shade_surface(&self, ray: &Ray, t: f32, normal: Vec3, ground_point: Option<Vec3>) -> Vec3 {
        match self.params.shading {
            ShadingMode::Headlight => {
                let facing = normal.dot(&-ray.direction).abs();
                let albedo = match ground_point {
                    Some(p) => self.checker(p),
                    None => Vec3::repeat(SURFACE_ALBEDO),
                };
                albedo * (0.15 + 0.85 * facing)
            }
            ShadingMode::Normals => (normal + Vec3::repeat(1.0)) * 0.5,
            ShadingMode::Depth => Vec3::repeat(1.0 - (t / self.params.max_distance).min(1.0)),
        }
    }

    fn checker(&self, p: Vec3) -> Vec3 {
        let cell = (p.x / self.checker_size).floor() + (p.z / self.checker_size).floor();
        if cell.rem_euclid(2.0) < 1.0 {
            GROUND_LIGHT
        } else {
            GROUND_DARK
        }
    }
}

/// Ray caster over a single OBJ mesh
pub struct RayCaster {
    size: FrameSize,
    bvh: Bvh,
    scene: Node,
    params: FrameParams,
    cameras: CameraRig,
    ground_height: f32,
    checker_size: f32,
    dirty: bool,
    pixels: Vec<u32>,
}

impl RayCaster {
    /// Load `path` and build a ray caster for it
    pub fn from_obj(path: &Path, shading: ShadingMode, options: &SourceOptions) -> Result<Self, SourceError> {
        let mesh = ObjLoader::load_obj(path).map_err(AssetError::from)?;
        log::info!("Loaded {} triangles from {}", mesh.triangle_count(), path.display());
        Self::new(&mesh, shading, options)
    }

    /// Build the BVH and a scene graph with cameras framing `mesh`
    pub fn new(mesh: &TriangleMesh, shading: ShadingMode, options: &SourceOptions) -> Result<Self, SourceError> {
        let bvh = Bvh::build(mesh);
        let bounds = bvh
            .bounds()
            .ok_or_else(|| AssetError::InvalidData("model has no triangles".to_string()))?;

        let radius = (bounds.extent().norm() * 0.5).max(1.0e-3);
        let center = bounds.center();
        let eye = center + Vec3::new(0.0, 0.25 * radius, 2.0 * radius);

        // The panorama stays world-aligned; only the perspective camera aims
        let mut cameras = CameraRig::at(eye, center - eye);
        cameras.panoramic = CameraParams::new(CameraKind::Panoramic, eye, Vec3::z());

        let scene = build_scene(shading, options.ground_plane, 6.0 * radius, &cameras);
        let params = read_params(&scene)?;

        Ok(Self {
            size: options.frame_size,
            bvh,
            scene,
            params,
            cameras,
            ground_height: bounds.min.y,
            checker_size: radius * 0.25,
            dirty: true,
            pixels: vec![0; options.frame_size.pixel_count()],
        })
    }

    fn render(&mut self) {
        let size = self.size;
        let width = size.width as usize;
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .clamp(1, size.height.max(1) as usize);
        let rows_per_worker = (size.height as usize).div_ceil(workers).max(1);

        let tracer = Tracer {
            bvh: &self.bvh,
            params: &self.params,
            ground_height: self.ground_height,
            checker_size: self.checker_size,
        };
        let tracer = &tracer;

        thread::scope(|scope| {
            for (chunk, rows) in self.pixels.chunks_mut(rows_per_worker * width).enumerate() {
                scope.spawn(move || {
                    let first_row = chunk * rows_per_worker;
                    for (i, pixel) in rows.iter_mut().enumerate() {
                        let x = (i % width) as u32;
                        let y = (first_row + i / width) as u32;
                        let ray = tracer.params.primary_ray(x, y, size);
                        *pixel = pack_color(tracer.shade(&ray));
                    }
                });
            }
        });
    }
}

impl PanoramaSource for RayCaster {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn scene_graph(&self) -> Option<&Node> {
        Some(&self.scene)
    }

    fn scene_graph_mut(&mut self) -> Option<&mut Node> {
        Some(&mut self.scene)
    }

    fn commit(&mut self) -> Result<(), SourceError> {
        self.params = read_params(&self.scene)?;
        let changed = self.scene.commit();
        log::debug!(
            "Committed {changed} ray caster nodes ({} shading, {} camera)",
            self.params.shading.name(),
            self.params.camera.kind
        );
        self.dirty = true;
        Ok(())
    }

    fn apply(&mut self, command: SceneCommand) -> Result<(), SourceError> {
        match command {
            SceneCommand::ActivateCamera(kind) => {
                self.scene.set(&["camera"], NodeValue::String(kind.node_name().to_string()))?;
            }
            SceneCommand::UpdateCamera(params) => {
                let group = params.kind.node_name();
                self.scene.set(&[group, "position"], NodeValue::Vec3f(params.position))?;
                self.scene.set(&[group, "direction"], NodeValue::Vec3f(params.direction))?;
                self.scene.set(&[group, "up"], NodeValue::Vec3f(params.up))?;
            }
            SceneCommand::MarkModified(kind) => {
                self.scene
                    .find_mut(&[kind.node_name()])
                    .ok_or_else(|| NodeError::NotFound(kind.node_name().to_string()))?
                    .mark_as_modified();
            }
        }
        Ok(())
    }

    fn initial_cameras(&self) -> CameraRig {
        // Overrides land in the scene graph after construction
        read_rig(&self.scene).unwrap_or_else(|err| {
            log::warn!("Falling back to construction-time cameras: {err}");
            self.cameras
        })
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        if !self.dirty {
            return Ok(FrameStatus::Unchanged);
        }
        self.render();
        self.dirty = false;
        Ok(FrameStatus::Rendered)
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.pixels)
    }
}

fn camera_group(params: &CameraParams) -> Node {
    Node::group(params.kind.node_name())
        .with_child(Node::leaf("position", NodeValue::Vec3f(params.position)))
        .with_child(Node::leaf("direction", NodeValue::Vec3f(params.direction)))
        .with_child(Node::leaf("up", NodeValue::Vec3f(params.up)))
}

fn build_scene(shading: ShadingMode, ground_plane: bool, max_distance: f32, cameras: &CameraRig) -> Node {
    let mode_names = ShadingMode::ALL.map(ShadingMode::name);
    let camera_names = [CameraKind::Panoramic.node_name(), CameraKind::Perspective.node_name()];

    Node::group(SCENE_ROOT)
        .with_child(Node::leaf("renderer", NodeValue::String(shading.name().to_string())).with_whitelist(mode_names))
        .with_child(Node::leaf("ground_plane", NodeValue::Bool(ground_plane)))
        .with_child(Node::leaf("background", NodeValue::Vec3f(Vec3::new(0.08, 0.08, 0.1))))
        .with_child(Node::leaf("max_distance", NodeValue::Float(max_distance)).with_range(1.0e-3, 1.0e6))
        .with_child(
            Node::leaf("camera", NodeValue::String(cameras.active.node_name().to_string()))
                .with_whitelist(camera_names),
        )
        .with_child(camera_group(&cameras.panoramic))
        .with_child(
            camera_group(&cameras.perspective)
                .with_child(Node::leaf("fovy", NodeValue::Float(60.0)).with_range(1.0, 179.0)),
        )
}

fn read_camera(scene: &Node, kind: CameraKind) -> Result<CameraParams, SourceError> {
    let group = kind.node_name();
    let mut params = CameraParams::new(
        kind,
        scene.get_vec3(&[group, "position"])?,
        scene.get_vec3(&[group, "direction"])?,
    );
    params.up = scene.get_vec3(&[group, "up"])?;
    Ok(params)
}

fn active_camera(scene: &Node) -> Result<CameraKind, SourceError> {
    Ok(match scene.get_str(&["camera"])? {
        "perspective" => CameraKind::Perspective,
        _ => CameraKind::Panoramic,
    })
}

fn read_rig(scene: &Node) -> Result<CameraRig, SourceError> {
    Ok(CameraRig {
        perspective: read_camera(scene, CameraKind::Perspective)?,
        panoramic: read_camera(scene, CameraKind::Panoramic)?,
        active: active_camera(scene)?,
    })
}

fn read_params(scene: &Node) -> Result<FrameParams, SourceError> {
    let renderer = scene.get_str(&["renderer"])?;
    let shading = ShadingMode::from_name(renderer)
        .ok_or_else(|| SourceError::Verify(format!("unknown renderer type '{renderer}'")))?;
    let kind = active_camera(scene)?;

    Ok(FrameParams {
        shading,
        ground_plane: scene.get_bool(&["ground_plane"])?,
        background: scene.get_vec3(&["background"])?,
        max_distance: scene.get_f32(&["max_distance"])?,
        camera: read_camera(scene, kind)?,
        fovy_degrees: scene.get_f32(&["perspective", "fovy"])?,
    })
}
