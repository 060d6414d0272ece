//! Input events delivered to the display loop

use crate::camera::{KeyAction, MoveEvent};

/// Arrow keys for the desktop look direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookDirection {
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
}

impl LookDirection {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }
}

/// Window input translated into viewer terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Escape or window close
    Quit,
    /// Camera movement key (W/S)
    Move(MoveEvent),
    /// Look key (arrows)
    Look {
        direction: LookDirection,
        action: KeyAction,
    },
    /// Framebuffer resized, in pixels
    Resize { width: u32, height: u32 },
}
