//! VR compositor seam and a simulated headset
//!
//! A [`VrCompositor`] supplies a head pose once per presented frame, a view
//! and projection per eye, and accepts the two rendered eye textures. The
//! only built-in implementation is [`SimulatedHmd`], which derives the head
//! pose from the desktop look angles so stereo rendering can be exercised
//! without hardware.

use std::time::{Duration, Instant};

use crate::core::VrConfig;
use crate::foundation::math::{look_at, perspective, spherical_direction, Mat4, Vec3, WORLD_UP};

use super::backend::{DisplayResult, Eye, TextureHandle};

/// Per-eye camera matrices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    /// World to eye
    pub view: Mat4,
    /// Eye to clip space
    pub projection: Mat4,
}

impl EyeView {
    /// Combined projection and view
    pub fn proj_view(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Headset runtime as seen by the display loop
pub trait VrCompositor {
    /// Recommended size of each eye target in pixels
    fn render_target_size(&self) -> (u32, u32);

    /// Wait for fresh tracking poses
    ///
    /// This is the one place the display thread may block, paced by the
    /// runtime's own frame timing.
    fn begin_frame(&mut self) -> DisplayResult<()>;

    /// View and projection for one eye, valid after `begin_frame`
    fn eye_view(&self, eye: Eye) -> EyeView;

    /// Hand both eye textures to the compositor
    fn submit(&mut self, left: TextureHandle, right: TextureHandle) -> DisplayResult<()>;

    /// Desktop look angles, for runtimes without real tracking
    fn observe_look(&mut self, _phi: f32, _theta: f32) {}
}

/// Headset stand-in with a fixed IPD and a look-angle driven head pose
#[derive(Debug, Clone)]
pub struct SimulatedHmd {
    render_size: (u32, u32),
    projection: Mat4,
    head_to_eye: [Mat4; 2],
    absolute_to_device: Mat4,
    look: (f32, f32),
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
    submitted: u64,
}

impl SimulatedHmd {
    /// Vertical field of view of each simulated eye
    pub const EYE_FOV_DEGREES: f32 = 100.0;

    /// Refresh rate the simulated runtime paces `begin_frame` to
    pub const REFRESH_HZ: f32 = 90.0;

    /// Simulated headset with the configured IPD and eye target size
    pub fn new(config: &VrConfig) -> Self {
        let (width, height) = (config.render_width.max(1), config.render_height.max(1));
        let half_ipd = config.ipd * 0.5;
        // Inverse of the eye-to-head offsets: the left eye sits at -x
        let head_to_eye = [
            Mat4::new_translation(&Vec3::new(half_ipd, 0.0, 0.0)),
            Mat4::new_translation(&Vec3::new(-half_ipd, 0.0, 0.0)),
        ];
        log::info!("Simulated HMD: {width}x{height} per eye, IPD {:.1} mm", config.ipd * 1000.0);

        Self {
            render_size: (width, height),
            projection: perspective(
                Self::EYE_FOV_DEGREES.to_radians(),
                width as f32 / height as f32,
                0.01,
                10.0,
            ),
            head_to_eye,
            absolute_to_device: Mat4::identity(),
            look: (0.0, std::f32::consts::FRAC_PI_2),
            frame_interval: Some(Duration::from_secs_f32(1.0 / Self::REFRESH_HZ)),
            last_frame: None,
            submitted: 0,
        }
    }

    /// Disable frame pacing so `begin_frame` never sleeps
    pub fn without_pacing(mut self) -> Self {
        self.frame_interval = None;
        self
    }

    /// Number of stereo frames handed to `submit`
    pub fn submitted_frames(&self) -> u64 {
        self.submitted
    }
}

impl VrCompositor for SimulatedHmd {
    fn render_target_size(&self) -> (u32, u32) {
        self.render_size
    }

    fn begin_frame(&mut self) -> DisplayResult<()> {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        let (phi, theta) = self.look;
        self.absolute_to_device = look_at(Vec3::zeros(), spherical_direction(phi, theta), WORLD_UP);
        Ok(())
    }

    fn eye_view(&self, eye: Eye) -> EyeView {
        let index = match eye {
            Eye::Left => 0,
            Eye::Right => 1,
        };
        EyeView {
            view: self.head_to_eye[index] * self.absolute_to_device,
            projection: self.projection,
        }
    }

    fn submit(&mut self, left: TextureHandle, right: TextureHandle) -> DisplayResult<()> {
        log::trace!("Submitting eye textures {} / {}", left.0, right.0);
        self.submitted += 1;
        Ok(())
    }

    fn observe_look(&mut self, phi: f32, theta: f32) {
        self.look = (phi, theta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn hmd() -> SimulatedHmd {
        SimulatedHmd::new(&VrConfig::default()).without_pacing()
    }

    #[test]
    fn test_eyes_are_separated_by_ipd() {
        let mut hmd = hmd();
        hmd.begin_frame().unwrap();

        // Head origin in each eye's space
        let origin = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let left = hmd.eye_view(Eye::Left).view * origin;
        let right = hmd.eye_view(Eye::Right).view * origin;
        assert_relative_eq!((left - right).norm(), 0.063, epsilon = 1e-6);
        assert_relative_eq!(left.x, 0.0315, epsilon = 1e-6);
    }

    #[test]
    fn test_head_pose_follows_look_angles() {
        let mut hmd = hmd();
        hmd.observe_look(0.0, std::f32::consts::FRAC_PI_2);
        hmd.begin_frame().unwrap();

        // Looking down +X: a point ahead lands on the -Z view axis
        let ahead = hmd.eye_view(Eye::Left).view * Vec4::new(5.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(ahead.z, -5.0, epsilon = 1e-4);
        assert_relative_eq!(ahead.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_submit_counts_frames() {
        let mut hmd = hmd();
        assert_eq!(hmd.render_target_size(), (1512, 1680));
        hmd.submit(TextureHandle(1), TextureHandle(2)).unwrap();
        assert_eq!(hmd.submitted_frames(), 1);
    }
}
