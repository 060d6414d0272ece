//! Body of the render thread
//!
//! One iteration drains camera commands, recommits the source's parameters
//! if they changed, renders one frame to completion and publishes it. The
//! shutdown flag is only checked between iterations, so a frame that is
//! mid-render always finishes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::scene::TimeStamp;

use super::{FrameStatus, PanoramaSource, PipelineError, PixelRelay, SceneCommand};

pub(crate) struct RenderLoop {
    source: Box<dyn PanoramaSource>,
    relay: Arc<PixelRelay>,
    commands: Receiver<SceneCommand>,
    last_commit: Option<TimeStamp>,
    idle_backoff: Duration,
    iterations: u64,
}

impl RenderLoop {
    pub(crate) fn new(
        source: Box<dyn PanoramaSource>,
        relay: Arc<PixelRelay>,
        commands: Receiver<SceneCommand>,
        idle_backoff: Duration,
    ) -> Self {
        Self {
            source,
            relay,
            commands,
            last_commit: None,
            idle_backoff,
            iterations: 0,
        }
    }

    /// Iterate until `shutdown` is raised or the source fails
    pub(crate) fn run(&mut self, shutdown: &AtomicBool) -> Result<(), PipelineError> {
        log::info!("Render loop started, panorama {}", self.relay.frame_size());
        while !shutdown.load(Ordering::Acquire) {
            self.run_iteration()?;
        }
        log::info!(
            "Render loop stopped after {} iterations, {} frames published",
            self.iterations,
            self.relay.published_frames()
        );
        Ok(())
    }

    pub(crate) fn run_iteration(&mut self) -> Result<FrameStatus, PipelineError> {
        self.drain_commands();
        self.commit_if_modified();

        let status = self.source.render_one_frame()?;
        match status {
            FrameStatus::Rendered => self.publish_completed()?,
            FrameStatus::Unchanged => {
                if !self.idle_backoff.is_zero() {
                    std::thread::sleep(self.idle_backoff);
                }
            }
        }
        self.iterations += 1;
        Ok(status)
    }

    #[cfg(test)]
    pub(crate) fn last_commit(&self) -> Option<TimeStamp> {
        self.last_commit
    }

    fn drain_commands(&mut self) {
        for command in self.commands.try_iter() {
            if let Err(e) = self.source.apply(command) {
                log::warn!("Failed to apply {command:?}: {e}");
            }
        }
    }

    fn commit_if_modified(&mut self) {
        let Some(modified) = self.source.last_modified() else {
            return;
        };
        if self.last_commit.is_some_and(|committed| modified <= committed) {
            return;
        }

        match self.source.verify() {
            Ok(()) => {
                if let Err(e) = self.source.commit() {
                    log::warn!("Scene commit failed: {e}");
                }
            }
            Err(e) => log::warn!("Scene verification failed: {e}"),
        }
        self.last_commit = Some(TimeStamp::now());
    }

    fn publish_completed(&mut self) -> Result<(), PipelineError> {
        let result = match self.source.map_completed() {
            Ok(pixels) => self.relay.publish(pixels),
            Err(e) => Err(e.into()),
        };
        self.source.unmap();
        result
    }
}
