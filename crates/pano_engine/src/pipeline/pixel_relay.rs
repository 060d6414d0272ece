//! # Pixel Relay
//!
//! Single-slot hand-off of completed panorama frames from the render thread
//! to the display thread.
//!
//! The relay owns exactly one CPU-side frame. The render thread copies a
//! whole completed frame in while holding the lock, then raises the
//! new-frame flag. The display thread polls that flag every presented frame
//! without touching the lock, and only when it is raised takes the lock to
//! copy the frame out to the GPU.
//!
//! ```text
//!  render thread                          display thread
//!  ─────────────                          ──────────────
//!  publish(frame) ──lock──▶ [ pixels ] ◀──lock── acquire_for_read()
//!        │                      ▲                    │
//!        └──── new_frame = true │   new_frame = false┘
//!                               │
//!                  has_new_frame() (atomic, lock-free)
//! ```
//!
//! Because the full-frame copy happens entirely inside the locked region, a
//! reader always sees either the previous complete frame or the newest
//! complete frame. Frames can be dropped when the renderer outpaces the
//! display; the display never waits for a frame that is not ready.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::frame::{pack_rgba, FrameSize};
use super::PipelineError;

/// Single-writer/single-reader frame buffer with a lock-free new-frame flag
pub struct PixelRelay {
    size: FrameSize,
    pixels: Mutex<Vec<u32>>,
    new_frame: AtomicBool,
    published: AtomicU64,
}

impl PixelRelay {
    /// Create a relay holding an opaque black frame of the given size
    pub fn new(size: FrameSize) -> Self {
        Self {
            size,
            pixels: Mutex::new(vec![pack_rgba(0, 0, 0, 255); size.pixel_count()]),
            new_frame: AtomicBool::new(false),
            published: AtomicU64::new(0),
        }
    }

    /// Dimensions of the buffered frame
    pub fn frame_size(&self) -> FrameSize {
        self.size
    }

    /// Whether a frame newer than the last read has been published
    ///
    /// Advisory and lock-free; a `true` here means the next
    /// [`acquire_for_read`](Self::acquire_for_read) returns a fresher frame
    /// than the previous one did.
    pub fn has_new_frame(&self) -> bool {
        self.new_frame.load(Ordering::Acquire)
    }

    /// Lock the buffer for reading and clear the new-frame flag
    ///
    /// Blocks while the render thread is copying a frame in. The returned
    /// guard releases the lock when dropped and must not be held across
    /// more than one upload.
    pub fn acquire_for_read(&self) -> PixelReadGuard<'_> {
        // A panic can only happen before the copy starts (length is checked
        // up front), so a poisoned buffer still holds a complete frame.
        let pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        self.new_frame.store(false, Ordering::Release);
        PixelReadGuard { pixels }
    }

    /// Total number of frames published so far
    pub fn published_frames(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Copy a complete frame in and raise the new-frame flag
    ///
    /// Producer side only; called by the render loop.
    pub(crate) fn publish(&self, frame: &[u32]) -> Result<(), PipelineError> {
        let expected = self.size.pixel_count();
        if frame.len() != expected {
            return Err(PipelineError::FrameSizeMismatch {
                expected,
                actual: frame.len(),
            });
        }

        let mut pixels = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        pixels.copy_from_slice(frame);
        self.new_frame.store(true, Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
        drop(pixels);

        log::trace!("Published panorama frame {}", self.published_frames());
        Ok(())
    }
}

impl std::fmt::Debug for PixelRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelRelay")
            .field("size", &self.size)
            .field("new_frame", &self.has_new_frame())
            .field("published", &self.published_frames())
            .finish_non_exhaustive()
    }
}

/// Read access to the relay's frame; dropping it releases the lock
pub struct PixelReadGuard<'a> {
    pixels: MutexGuard<'a, Vec<u32>>,
}

impl Deref for PixelReadGuard<'_> {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.pixels
    }
}
