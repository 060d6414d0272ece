//! # Display Loop
//!
//! Runs once per presented frame on the main thread:
//!
//! 1. Poll input (quit, movement keys, look keys, resize)
//! 2. Advance the interactive camera and forward its commands to the
//!    render thread
//! 3. Upload the relay's frame if a new one was published
//! 4. Compute the mono view, or per-eye views from the VR compositor
//! 5. Draw the environment cube once per view
//! 6. Present
//!
//! The only wait on this thread is the compositor's `begin_frame`. The
//! render thread is never waited on: if no new panorama is ready the
//! previous texture is drawn again.

use std::f32::consts::PI;
use std::time::Instant;

use crate::camera::{InteractiveCamera, KeyAction, MoveEvent};
use crate::core::CameraConfig;
use crate::foundation::math::{look_at, perspective, spherical_direction, Mat4, Vec3, WORLD_UP};
use crate::foundation::time::FrameTimer;
use crate::pipeline::{PipelineHandle, PipelineHealth};

use super::backend::{DisplayBackend, DisplayError, DisplayResult, DisplaySurface, DrawTarget, Eye};
use super::input::InputEvent;
use super::vr::VrCompositor;

/// Near plane of the mono view
pub const MONO_NEAR: f32 = 0.1;
/// Far plane of the mono view
pub const MONO_FAR: f32 = 10.0;

/// Whether the loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Keep presenting
    Continue,
    /// Quit was requested
    Exit,
}

/// Frame counters reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStats {
    /// Frames presented to the window
    pub presented: u64,
    /// Panorama textures uploaded
    pub uploaded: u64,
    /// Presented frames that reused the previous texture
    pub skipped: u64,
}

/// Desktop look direction driven by the arrow keys
#[derive(Debug, Clone)]
struct LookControl {
    phi: f32,
    theta: f32,
    speed: f32,
    held: [bool; 4],
}

impl LookControl {
    const THETA_LIMIT: f32 = 0.01;

    /// Returns whether any look key is turning the view
    fn advance(&mut self) -> bool {
        let [up, down, left, right] = self.held;
        if up {
            self.theta -= self.speed;
        } else if down {
            self.theta += self.speed;
        }
        if left {
            self.phi -= self.speed;
        } else if right {
            self.phi += self.speed;
        }
        // Keep away from the poles where the up vector degenerates
        self.theta = self.theta.clamp(Self::THETA_LIMIT, PI - Self::THETA_LIMIT);
        up || down || left || right
    }

    fn target(&self) -> Vec3 {
        spherical_direction(self.phi, self.theta)
    }
}

/// Per-frame driver of the display thread
pub struct DisplayLoop<S: DisplaySurface, B: DisplayBackend> {
    // Backend first so GPU objects go before the context that owns them
    backend: B,
    surface: S,
    vr: Option<Box<dyn VrCompositor>>,
    pipeline: PipelineHandle,
    camera: InteractiveCamera,
    look: LookControl,
    fov: f32,
    stats: DisplayStats,
    timer: FrameTimer,
    degraded_reported: bool,
}

impl<S: DisplaySurface, B: DisplayBackend> DisplayLoop<S, B> {
    /// Create a desktop display loop
    ///
    /// # Arguments
    ///
    /// * `surface` - Window and input source
    /// * `backend` - GPU drawing backend, current on this thread
    /// * `pipeline` - Handle to the running render pipeline
    /// * `camera` - Interactive camera seeded with the source's cameras
    /// * `config` - Look angles, look speed and field of view
    pub fn new(
        surface: S,
        backend: B,
        pipeline: PipelineHandle,
        camera: InteractiveCamera,
        config: &CameraConfig,
    ) -> Self {
        Self {
            backend,
            surface,
            vr: None,
            pipeline,
            camera,
            look: LookControl {
                phi: config.look_phi,
                theta: config.look_theta,
                speed: config.look_speed,
                held: [false; 4],
            },
            fov: config.fov_degrees.to_radians(),
            stats: DisplayStats::default(),
            timer: FrameTimer::new(),
            degraded_reported: false,
        }
    }

    /// Render in stereo through `compositor`, mirroring a mono view to the window
    pub fn with_vr(mut self, compositor: Box<dyn VrCompositor>) -> Self {
        self.vr = Some(compositor);
        self
    }

    /// Counters so far
    pub fn stats(&self) -> DisplayStats {
        self.stats
    }

    /// Interactive camera state
    pub fn camera(&self) -> &InteractiveCamera {
        &self.camera
    }

    /// Window or test surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Drawing backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run until the window closes or the user quits
    pub fn run(&mut self) -> DisplayResult<DisplayStats> {
        log::info!("Display loop started ({})", if self.vr.is_some() { "stereo" } else { "mono" });
        while !self.surface.should_close() {
            if self.run_iteration()? == LoopControl::Exit {
                break;
            }
        }
        log::info!(
            "Display loop stopped: {} presented, {} uploaded, {} skipped, {:.1} fps",
            self.stats.presented,
            self.stats.uploaded,
            self.stats.skipped,
            self.timer.average_fps()
        );
        Ok(self.stats)
    }

    /// One presented frame
    pub fn run_iteration(&mut self) -> DisplayResult<LoopControl> {
        let Some(moves) = self.handle_input() else {
            self.surface.request_close();
            return Ok(LoopControl::Exit);
        };

        // Movement follows the view once the user has turned it
        if self.look.advance() {
            self.camera.set_heading(self.look.target());
        }
        for command in self.camera.update(&moves, Instant::now()) {
            if !self.pipeline.send(command) {
                log::trace!("Render thread gone, dropping {command:?}");
            }
        }
        self.report_health();

        self.upload_if_new()?;

        if let Some(vr) = self.vr.as_mut() {
            vr.observe_look(self.look.phi, self.look.theta);
            vr.begin_frame()?;
            let (width, height) = vr.render_target_size();
            for eye in Eye::BOTH {
                self.backend.begin_pass(DrawTarget::Eye { eye, width, height })?;
                self.backend.draw_environment(&vr.eye_view(eye).proj_view())?;
            }
            match (self.backend.eye_texture(Eye::Left), self.backend.eye_texture(Eye::Right)) {
                (Some(left), Some(right)) => vr.submit(left, right)?,
                _ => return Err(DisplayError::Compositor("eye targets were not created".to_string())),
            }
        }

        let (width, height) = self.surface.framebuffer_size();
        self.backend.begin_pass(DrawTarget::Window { width, height })?;
        if width > 0 && height > 0 {
            self.backend.draw_environment(&self.mono_proj_view(width, height))?;
        }

        self.surface.present();
        self.stats.presented += 1;
        self.timer.tick();

        if self.surface.should_close() {
            Ok(LoopControl::Exit)
        } else {
            Ok(LoopControl::Continue)
        }
    }

    /// Projection-view for the desktop window
    pub fn mono_proj_view(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width as f32 / height.max(1) as f32;
        perspective(self.fov, aspect, MONO_NEAR, MONO_FAR) * look_at(Vec3::zeros(), self.look.target(), WORLD_UP)
    }

    /// Collect this tick's movement events; `None` on quit
    fn handle_input(&mut self) -> Option<Vec<MoveEvent>> {
        let mut moves = Vec::new();
        for event in self.surface.poll_input() {
            match event {
                InputEvent::Quit => return None,
                InputEvent::Move(m) => moves.push(m),
                InputEvent::Look { direction, action } => {
                    self.look.held[direction.index()] = action != KeyAction::Release;
                }
                InputEvent::Resize { width, height } => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                }
            }
        }
        Some(moves)
    }

    fn upload_if_new(&mut self) -> DisplayResult<()> {
        let relay = self.pipeline.relay();
        if !relay.has_new_frame() {
            self.stats.skipped += 1;
            return Ok(());
        }
        let pixels = relay.acquire_for_read();
        self.backend.upload_panorama(relay.frame_size(), &pixels)?;
        drop(pixels);
        self.stats.uploaded += 1;
        Ok(())
    }

    fn report_health(&mut self) {
        if self.degraded_reported {
            return;
        }
        if let PipelineHealth::Degraded(reason) = self.pipeline.health() {
            log::warn!("Render pipeline degraded, showing last frame: {reason}");
            self.degraded_reported = true;
        }
    }
}
