//! Math utilities and types
//!
//! Provides the `nalgebra` aliases used across the renderer plus the integer
//! helpers needed to lay out GPU buffers.

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

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    #[must_use]
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Greatest common divisor
    #[must_use]
    pub const fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            let r = a % b;
            a = b;
            b = r;
        }
        a
    }

    /// Least common multiple. Zero inputs are treated as "no constraint" (1).
    #[must_use]
    pub const fn lcm(a: u64, b: u64) -> u64 {
        let a = if a == 0 { 1 } else { a };
        let b = if b == 0 { 1 } else { b };
        a / gcd(a, b) * b
    }

    /// Round `instance_size` up to the next multiple of `min_alignment`.
    #[must_use]
    pub const fn aligned_size(instance_size: u64, min_alignment: u64) -> u64 {
        if min_alignment == 0 {
            return instance_size;
        }
        instance_size.div_ceil(min_alignment) * min_alignment
    }
}
