//! The renderer seam driven by the render thread
//!
//! A [`PanoramaSource`] is any renderer that can be run to completion one
//! frame at a time and then expose the finished equirectangular image. The
//! render thread owns the source exclusively; the display thread only ever
//! talks to it through [`SceneCommand`]s.

use thiserror::Error;

use crate::assets::AssetError;
use crate::camera::{CameraKind, CameraParams, CameraRig};
use crate::scene::{Node, NodeError, TimeStamp};

use super::FrameSize;

/// Outcome of one `render_one_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A new frame is ready to be mapped
    Rendered,
    /// Nothing changed since the previous frame; nothing to publish
    Unchanged,
}

/// Camera changes sent from the display thread to the render thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneCommand {
    /// Make this camera feed the renderer
    ActivateCamera(CameraKind),
    /// Replace the parameters of `params.kind`
    UpdateCamera(CameraParams),
    /// Force the camera's configuration to count as changed
    MarkModified(CameraKind),
}

/// Errors reported by panorama sources
#[derive(Error, Debug)]
pub enum SourceError {
    /// `render_one_frame` failed
    #[error("render failed: {0}")]
    Render(String),

    /// Scene graph values were rejected before commit
    #[error("scene verification failed: {0}")]
    Verify(String),

    /// Applying the scene graph to the renderer failed
    #[error("scene commit failed: {0}")]
    Commit(String),

    /// The finished frame could not be read back
    #[error("failed to map completed frame: {0}")]
    Map(String),

    /// Scene graph lookup or type error
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Model or image could not be loaded
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// A renderer the render thread can drive
///
/// Only [`frame_size`](Self::frame_size),
/// [`render_one_frame`](Self::render_one_frame) and
/// [`map_completed`](Self::map_completed) are required. Sources that keep
/// their parameters in a scene graph get change detection, verification and
/// commits for free by returning it from [`scene_graph`](Self::scene_graph).
pub trait PanoramaSource: Send {
    /// Dimensions of the frames this source produces
    fn frame_size(&self) -> FrameSize;

    /// Parameter tree, if the source has one
    fn scene_graph(&self) -> Option<&Node> {
        None
    }

    /// Parameter tree (mutable)
    fn scene_graph_mut(&mut self) -> Option<&mut Node> {
        None
    }

    /// Newest modification stamp of the parameter tree
    ///
    /// `None` means the source has nothing to commit.
    fn last_modified(&self) -> Option<TimeStamp> {
        self.scene_graph().map(Node::subtree_last_modified)
    }

    /// Validate pending parameter changes
    fn verify(&mut self) -> Result<(), SourceError> {
        match self.scene_graph() {
            Some(root) => root.verify().map_err(|e| SourceError::Verify(e.to_string())),
            None => Ok(()),
        }
    }

    /// Make pending parameter changes effective for the next frame
    fn commit(&mut self) -> Result<(), SourceError> {
        if let Some(root) = self.scene_graph_mut() {
            let changed = root.commit();
            log::debug!("Committed {changed} scene nodes");
        }
        Ok(())
    }

    /// Apply a camera command from the display thread
    fn apply(&mut self, command: SceneCommand) -> Result<(), SourceError> {
        log::trace!("Ignoring {command:?}");
        Ok(())
    }

    /// Cameras the interactive controls start from
    fn initial_cameras(&self) -> CameraRig {
        CameraRig::default()
    }

    /// Run the renderer until one frame is complete
    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError>;

    /// Borrow the completed frame, `frame_size().pixel_count()` pixels
    fn map_completed(&mut self) -> Result<&[u32], SourceError>;

    /// Release the mapping taken by `map_completed`
    fn unmap(&mut self) {}
}
