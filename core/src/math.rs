//! Math type aliases and scalar helpers.
//!
//! All reference computations run in `f32` to match the precision of the
//! implementation under test. Integer vectors are used for texel
//! coordinates and integer pixel access.

pub use nalgebra;

// ===== Vector types =====

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32). Used for colors in RGBA order.
pub type Vec4 = nalgebra::Vector4<f32>;

/// 2D integer vector.
pub type IVec2 = nalgebra::Vector2<i32>;

/// 3D integer vector.
pub type IVec3 = nalgebra::Vector3<i32>;

/// 4D integer vector.
pub type IVec4 = nalgebra::Vector4<i32>;

/// 4D unsigned vector. Used for per-channel integer thresholds.
pub type UVec4 = nalgebra::Vector4<u32>;

// ===== Helper functions =====

/// Floored integer modulo. The result is in `[0, b)` for positive `b`.
pub fn imod(a: i32, b: i32) -> i32 {
    a.rem_euclid(b)
}

/// Mirror a negative coordinate around `-0.5`: `-1 -> 0`, `-2 -> 1`, ...
pub fn mirror(a: i32) -> i32 {
    if a >= 0 {
        a
    } else {
        -(1 + a)
    }
}

/// Fractional part, always in `[0, 1)` for finite input.
pub fn frac(x: f32) -> f32 {
    x - x.floor()
}

/// Convert a single sRGB-encoded channel to linear.
pub fn srgb_to_linear_channel(cs: f32) -> f32 {
    if cs <= 0.04045 {
        cs / 12.92
    } else {
        ((cs + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert an sRGB color to linear. Alpha is passed through.
pub fn srgb_to_linear(c: Vec4) -> Vec4 {
    Vec4::new(
        srgb_to_linear_channel(c.x),
        srgb_to_linear_channel(c.y),
        srgb_to_linear_channel(c.z),
        c.w,
    )
}

/// Linear interpolation `a*(1-t) + b*t`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Swizzle three components of a 4-vector.
pub fn swizzle3(v: &Vec4, a: usize, b: usize, c: usize) -> Vec3 {
    Vec3::new(v[a], v[b], v[c])
}
