//! Pipeline controller
//!
//! Owns everything the two threads share: the pixel relay, the shutdown
//! flag, the camera command channel and the health status. The render
//! thread only receives `Arc` clones, and the controller joins it before
//! any of that state can go away.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::camera::CameraRig;
use crate::core::PipelineConfig;

use super::render_loop::RenderLoop;
use super::{PanoramaSource, PipelineError, PixelRelay, SceneCommand};

/// Render thread status as seen from the display side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineHealth {
    /// Render thread is producing frames
    Running,
    /// Render thread exited after a shutdown request
    Stopped,
    /// Render thread gave up; the last published frame stays on screen
    Degraded(String),
}

/// Owner of the render thread
pub struct PipelineController {
    relay: Arc<PixelRelay>,
    shutdown: Arc<AtomicBool>,
    health: Arc<Mutex<PipelineHealth>>,
    commands: Sender<SceneCommand>,
    initial_cameras: CameraRig,
    render_thread: Option<JoinHandle<()>>,
}

impl PipelineController {
    /// Start the render thread for `source`
    ///
    /// # Arguments
    ///
    /// * `source` - Renderer to drive; moves onto the render thread
    /// * `config` - Render thread pacing
    ///
    /// # Returns
    ///
    /// The running controller, or `ThreadSpawn` if the OS refused the thread
    pub fn start(source: Box<dyn PanoramaSource>, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let relay = Arc::new(PixelRelay::new(source.frame_size()));
        let initial_cameras = source.initial_cameras();
        let shutdown = Arc::new(AtomicBool::new(false));
        let health = Arc::new(Mutex::new(PipelineHealth::Running));
        let (commands, receiver) = crossbeam_channel::unbounded();

        let mut render_loop = RenderLoop::new(
            source,
            Arc::clone(&relay),
            receiver,
            Duration::from_millis(config.idle_backoff_ms),
        );
        let thread_shutdown = Arc::clone(&shutdown);
        let thread_health = Arc::clone(&health);

        let render_thread = std::thread::Builder::new()
            .name("pano-render".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| render_loop.run(&thread_shutdown)));
                let status = match outcome {
                    Ok(Ok(())) => PipelineHealth::Stopped,
                    Ok(Err(e)) => {
                        log::error!("Render thread stopped: {e}");
                        PipelineHealth::Degraded(e.to_string())
                    }
                    Err(payload) => {
                        let e = PipelineError::Panicked(panic_message(payload.as_ref()));
                        log::error!("{e}");
                        PipelineHealth::Degraded(e.to_string())
                    }
                };
                // Source and command receiver go away before health is reported
                drop(render_loop);
                *thread_health.lock().unwrap_or_else(PoisonError::into_inner) = status;
            })
            .map_err(PipelineError::ThreadSpawn)?;

        log::info!("Started render thread for {} panorama", relay.frame_size());
        Ok(Self {
            relay,
            shutdown,
            health,
            commands,
            initial_cameras,
            render_thread: Some(render_thread),
        })
    }

    /// Cheap, cloneable view for the display thread
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            relay: Arc::clone(&self.relay),
            commands: self.commands.clone(),
            health: Arc::clone(&self.health),
        }
    }

    /// Shared frame slot the render thread publishes into
    pub fn relay(&self) -> &Arc<PixelRelay> {
        &self.relay
    }

    /// Cameras reported by the source before it moved to the render thread
    pub fn initial_cameras(&self) -> CameraRig {
        self.initial_cameras
    }

    /// Current status of the render thread
    pub fn health(&self) -> PipelineHealth {
        self.health.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Request shutdown and wait for the render thread
    ///
    /// Returns once the current `render_one_frame` call has finished.
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(render_thread) = self.render_thread.take() {
            log::debug!("Waiting for render thread to finish its frame");
            if render_thread.join().is_err() {
                log::error!("Render thread could not be joined");
            }
        }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("relay", &self.relay)
            .field("health", &self.health())
            .field("running", &self.render_thread.is_some())
            .finish()
    }
}

/// Display-side access to a running pipeline
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    relay: Arc<PixelRelay>,
    commands: Sender<SceneCommand>,
    health: Arc<Mutex<PipelineHealth>>,
}

impl PipelineHandle {
    /// Handle without a render thread, for driving the display side alone
    #[cfg(test)]
    pub(crate) fn detached(relay: Arc<PixelRelay>) -> (Self, crossbeam_channel::Receiver<SceneCommand>) {
        let (commands, receiver) = crossbeam_channel::unbounded();
        let handle = Self {
            relay,
            commands,
            health: Arc::new(Mutex::new(PipelineHealth::Running)),
        };
        (handle, receiver)
    }

    /// Frame slot to poll for new panoramas
    pub fn relay(&self) -> &PixelRelay {
        &self.relay
    }

    /// Queue a command for the render thread
    ///
    /// Returns `false` if the render thread has already exited.
    pub fn send(&self, command: SceneCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Status last reported by the render thread
    pub fn health(&self) -> PipelineHealth {
        self.health.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
