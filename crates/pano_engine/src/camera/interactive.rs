//! # Interactive Camera State
//!
//! Tracks whether the user is currently steering the perspective camera and
//! decides when control goes back to the panoramic camera.
//!
//! ```text
//!            move key press/repeat
//!   Static ─────────────────────────▶ Interactive ──┐ press/repeat
//!     ▲                                    │  ◀──────┘
//!     └────────────────────────────────────┘
//!        tick without movement, no key held,
//!        revert delay elapsed
//! ```
//!
//! The state machine never touches the renderer directly. Every transition
//! is expressed as [`SceneCommand`]s that the display loop forwards to the
//! render thread.

use std::time::{Duration, Instant};

use crate::foundation::math::Vec3;
use crate::pipeline::SceneCommand;

use super::{CameraKind, CameraRig};

/// Movement keys (W and S)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    /// W, along the view direction
    Forward,
    /// S, against the view direction
    Backward,
}

impl MoveDirection {
    fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Forward => 0,
            Self::Backward => 1,
        }
    }
}

/// Key transition reported by the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key went down
    Press,
    /// Key held, auto-repeat
    Repeat,
    /// Key went up
    Release,
}

/// One movement key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEvent {
    /// Which key
    pub direction: MoveDirection,
    /// Press, repeat or release
    pub action: KeyAction,
}

impl MoveEvent {
    /// Event for `direction`
    pub fn new(direction: MoveDirection, action: KeyAction) -> Self {
        Self { direction, action }
    }
}

/// Camera control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// Panoramic camera drives rendering
    Static,
    /// Perspective camera drives rendering; the panoramic camera shadows it
    Interactive,
}

/// Display-side camera state machine
#[derive(Debug, Clone)]
pub struct InteractiveCamera {
    rig: CameraRig,
    mode: CameraMode,
    held: [bool; 2],
    last_input: Option<Instant>,
    move_step: f32,
    revert_delay: Duration,
}

impl InteractiveCamera {
    /// Create a controller in `Static` mode
    ///
    /// # Arguments
    ///
    /// * `rig` - Initial cameras as reported by the panorama source
    /// * `move_step` - World units moved per press or repeat
    /// * `revert_delay` - Minimum time since the last input before reverting
    pub fn new(rig: CameraRig, move_step: f32, revert_delay: Duration) -> Self {
        Self {
            rig: CameraRig { active: CameraKind::Panoramic, ..rig },
            mode: CameraMode::Static,
            held: [false; 2],
            last_input: None,
            move_step,
            revert_delay,
        }
    }

    /// Current control mode
    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Cameras as last sent to the renderer
    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    /// Time of the last movement step
    pub fn last_input(&self) -> Option<Instant> {
        self.last_input
    }

    /// Whether any movement key is currently held down
    pub fn is_key_held(&self) -> bool {
        self.held.iter().any(|&h| h)
    }

    /// Point the perspective camera along `direction` for subsequent moves
    ///
    /// A zero vector leaves the current heading alone.
    pub fn set_heading(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize(f32::EPSILON) {
            self.rig.perspective.direction = direction;
        }
    }

    /// Process one display tick worth of movement events
    ///
    /// Returns the commands the render thread must apply, in order.
    pub fn update(&mut self, events: &[MoveEvent], now: Instant) -> Vec<SceneCommand> {
        let mut commands = Vec::new();
        let mut moved = false;

        for event in events {
            match event.action {
                KeyAction::Press | KeyAction::Repeat => {
                    self.held[event.direction.index()] = true;
                    self.step(event.direction, now, &mut commands);
                    moved = true;
                }
                KeyAction::Release => {
                    self.held[event.direction.index()] = false;
                }
            }
        }

        if moved {
            commands.push(SceneCommand::UpdateCamera(self.rig.perspective));
            commands.push(SceneCommand::UpdateCamera(self.rig.panoramic));
        } else if self.should_revert(now) {
            self.revert(&mut commands);
        }
        commands
    }

    fn step(&mut self, direction: MoveDirection, now: Instant, commands: &mut Vec<SceneCommand>) {
        if self.mode == CameraMode::Static {
            log::debug!("Camera control: interactive");
            self.mode = CameraMode::Interactive;
            self.rig.active = CameraKind::Perspective;
            commands.push(SceneCommand::ActivateCamera(CameraKind::Perspective));
        }
        self.rig.perspective.advance(self.move_step * direction.sign());
        self.rig.panoramic.position = self.rig.perspective.position;
        self.last_input = Some(now);
    }

    fn should_revert(&self, now: Instant) -> bool {
        if self.mode != CameraMode::Interactive || self.is_key_held() {
            return false;
        }
        self.last_input
            .map_or(true, |t| now.saturating_duration_since(t) >= self.revert_delay)
    }

    fn revert(&mut self, commands: &mut Vec<SceneCommand>) {
        log::debug!("Camera control: static, panorama at {:?}", self.rig.panoramic.position);
        self.mode = CameraMode::Static;
        self.rig.active = CameraKind::Panoramic;
        commands.push(SceneCommand::ActivateCamera(CameraKind::Panoramic));
        commands.push(SceneCommand::MarkModified(CameraKind::Panoramic));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn camera(delay_ms: u64) -> InteractiveCamera {
        InteractiveCamera::new(CameraRig::default(), 0.1, Duration::from_millis(delay_ms))
    }

    fn forward(action: KeyAction) -> MoveEvent {
        MoveEvent::new(MoveDirection::Forward, action)
    }

    #[test]
    fn test_press_enters_interactive_and_moves() {
        let mut cam = camera(0);
        let t0 = Instant::now();
        let commands = cam.update(&[forward(KeyAction::Press)], t0);

        assert_eq!(cam.mode(), CameraMode::Interactive);
        assert_eq!(cam.rig().active, CameraKind::Perspective);
        assert_eq!(cam.last_input(), Some(t0));
        assert_eq!(commands[0], SceneCommand::ActivateCamera(CameraKind::Perspective));
        assert_eq!(commands.len(), 3);

        // Default rig looks down -Z
        assert_relative_eq!(cam.rig().perspective.position, Vec3::new(0.0, 0.0, -0.1));
        assert_relative_eq!(cam.rig().panoramic.position, cam.rig().perspective.position);
    }

    #[test]
    fn test_backward_moves_against_direction() {
        let mut cam = camera(0);
        cam.update(&[MoveEvent::new(MoveDirection::Backward, KeyAction::Press)], Instant::now());
        assert_relative_eq!(cam.rig().perspective.position, Vec3::new(0.0, 0.0, 0.1));
    }

    #[test]
    fn test_reversion_happens_on_first_quiet_tick() {
        let mut cam = camera(0);
        let t0 = Instant::now();

        cam.update(&[forward(KeyAction::Press)], t0);
        for i in 1..=3 {
            let commands = cam.update(&[forward(KeyAction::Repeat)], t0 + Duration::from_millis(i * 30));
            assert_eq!(cam.mode(), CameraMode::Interactive);
            assert!(!commands.contains(&SceneCommand::ActivateCamera(CameraKind::Perspective)));
        }
        let t1 = t0 + Duration::from_millis(120);
        cam.update(&[forward(KeyAction::Repeat), forward(KeyAction::Release)], t1);
        // Moved in this tick, so no reversion yet
        assert_eq!(cam.mode(), CameraMode::Interactive);

        let commands = cam.update(&[], t1 + Duration::from_millis(16));
        assert_eq!(cam.mode(), CameraMode::Static);
        assert_eq!(cam.rig().active, CameraKind::Panoramic);
        assert_eq!(
            commands,
            vec![
                SceneCommand::ActivateCamera(CameraKind::Panoramic),
                SceneCommand::MarkModified(CameraKind::Panoramic),
            ]
        );

        // Nothing more to do once static
        assert!(cam.update(&[], t1 + Duration::from_millis(32)).is_empty());
    }

    #[test]
    fn test_held_key_blocks_reversion() {
        let mut cam = camera(0);
        let t0 = Instant::now();
        cam.update(&[forward(KeyAction::Press)], t0);

        // Key still down but no repeat event this tick
        assert!(cam.update(&[], t0 + Duration::from_millis(16)).is_empty());
        assert_eq!(cam.mode(), CameraMode::Interactive);

        cam.update(&[forward(KeyAction::Release)], t0 + Duration::from_millis(32));
        assert_eq!(cam.mode(), CameraMode::Static);
    }

    #[test]
    fn test_revert_delay_is_respected() {
        let mut cam = camera(100);
        let t0 = Instant::now();
        cam.update(&[forward(KeyAction::Press), forward(KeyAction::Release)], t0);

        cam.update(&[], t0 + Duration::from_millis(50));
        assert_eq!(cam.mode(), CameraMode::Interactive);

        cam.update(&[], t0 + Duration::from_millis(100));
        assert_eq!(cam.mode(), CameraMode::Static);
    }

    #[test]
    fn test_heading_steers_next_move() {
        let mut cam = camera(0);
        cam.set_heading(Vec3::new(2.0, 0.0, 0.0));
        cam.set_heading(Vec3::zeros());
        let commands = cam.update(&[forward(KeyAction::Press)], Instant::now());

        assert_relative_eq!(cam.rig().perspective.position, Vec3::new(0.1, 0.0, 0.0));
        assert!(commands.contains(&SceneCommand::UpdateCamera(cam.rig().perspective)));
        assert_relative_eq!(cam.rig().panoramic.direction, -Vec3::z());
    }

    #[test]
    fn test_panoramic_direction_is_not_mirrored() {
        let rig = CameraRig {
            panoramic: crate::camera::CameraParams::new(CameraKind::Panoramic, Vec3::zeros(), Vec3::x()),
            ..CameraRig::default()
        };
        let mut cam = InteractiveCamera::new(rig, 1.0, Duration::ZERO);
        cam.update(&[forward(KeyAction::Press)], Instant::now());
        assert_relative_eq!(cam.rig().panoramic.direction, Vec3::x());
        assert_relative_eq!(cam.rig().panoramic.position, Vec3::new(0.0, 0.0, -1.0));
    }
}
