//! Math utilities and types
//!
//! Provides the nalgebra aliases used by the render core, plus the few
//! transform helpers the draw pipeline needs.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Build the three per-axis rotation matrices for an Euler orientation.
///
/// Returned in application order: X first, then Y, then Z. The scene shader
/// receives them as separate uniforms and composes them itself.
pub fn euler_rotation_matrices(orientation: &Vec3) -> [Mat4; 3] {
    [
        Mat4::from_axis_angle(&Vec3::x_axis(), orientation.x),
        Mat4::from_axis_angle(&Vec3::y_axis(), orientation.y),
        Mat4::from_axis_angle(&Vec3::z_axis(), orientation.z),
    ]
}

/// Remove the translation part of a view matrix.
///
/// Keeps the upper 3x3 block so a skybox follows camera rotation but never
/// camera movement.
pub fn strip_translation(view: &Mat4) -> Mat4 {
    let rotation: Mat3 = view.fixed_view::<3, 3>(0, 0).into_owned();
    rotation.to_homogeneous()
}

/// Map a unit sample in `[0, 1]` onto `[min, max]`, clamped to the range.
pub fn remap_unit(sample: f32, min: f32, max: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    (min + sample * (max - min)).clamp(lo, hi)
}
