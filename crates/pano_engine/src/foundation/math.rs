//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the camera rig, the
//! display loop and the preview ray caster, plus the handful of
//! camera-matrix helpers they share. All matrices follow the OpenGL
//! right-handed, Y-up convention.

pub use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// 2D integer vector type
pub type Vec2i = Vector2<i32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// World up axis
pub const WORLD_UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Right-handed look-at view matrix
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
}

/// OpenGL perspective projection
///
/// # Arguments
/// * `fovy` - Vertical field of view in radians
/// * `aspect` - Viewport width / height
/// * `near` - Near plane distance (> 0)
/// * `far` - Far plane distance (> near)
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_perspective(aspect, fovy, near, far)
}

/// Unit direction for the desktop look angles
///
/// `theta` is measured from the +Y axis and `phi` rotates around it,
/// starting at +X towards +Z.
pub fn spherical_direction(phi: f32, theta: f32) -> Vec3 {
    Vec3::new(phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin())
}

/// Orthonormal camera basis `(right, up, forward)` for a view direction
///
/// The up vector is re-orthogonalized against `direction`. When the two are
/// parallel the world X axis is used to recover a valid frame.
pub fn camera_basis(direction: Vec3, up: Vec3) -> (Vec3, Vec3, Vec3) {
    let forward = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| Vec3::new(0.0, 0.0, 1.0));
    let right = match up.cross(&forward).try_normalize(1.0e-6) {
        Some(right) => right,
        None => Vec3::x().cross(&forward).try_normalize(1.0e-6).unwrap_or_else(Vec3::z),
    };
    let true_up = forward.cross(&right);
    (right, true_up, forward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spherical_direction_is_unit() {
        for (phi, theta) in [(0.0, 1.3), (1.0, 0.2), (-2.5, 3.0)] {
            assert_relative_eq!(spherical_direction(phi, theta).norm(), 1.0, epsilon = 1e-6);
        }
        let horizon = spherical_direction(0.0, std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(horizon.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(horizon.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_camera_basis_is_orthonormal() {
        let (right, up, forward) = camera_basis(Vec3::new(0.3, 0.2, 1.0), WORLD_UP);
        assert_relative_eq!(right.dot(&up), 0.0, epsilon = 1e-6);
        assert_relative_eq!(right.dot(&forward), 0.0, epsilon = 1e-6);
        assert_relative_eq!(up.dot(&forward), 0.0, epsilon = 1e-6);
        assert_relative_eq!(right.cross(&up), forward, epsilon = 1e-6);
    }

    #[test]
    fn test_camera_basis_recovers_from_parallel_up() {
        let (right, up, forward) = camera_basis(WORLD_UP, WORLD_UP);
        assert_relative_eq!(forward, WORLD_UP, epsilon = 1e-6);
        assert_relative_eq!(right.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(up.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_maps_target_to_negative_z() {
        let view = look_at(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), WORLD_UP);
        let p = view.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-6);
    }
}
