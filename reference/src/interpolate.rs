//! Triangle interpolation over the two triangles of a screen-aligned quad.
//!
//! A quad is split along the anti-diagonal. Triangle 0 uses corners
//! (0, 1, 2) = (origin, +y, +x); triangle 1 uses corners (3, 2, 1) so that
//! its local origin is the opposite corner. A pixel at normalized position
//! `(nx, ny)` belongs to triangle 1 when `nx + ny >= 1`, in which case its
//! local coordinates are `(1 - nx, 1 - ny)`.

use std::ops::{Add, Mul, Sub};

use deqp_core::math::{swizzle3, Vec3, Vec4};
use deqp_core::texture::CubeFace;

/// Corner indices of triangle 0 and triangle 1.
pub const QUAD_TRIANGLES: [[usize; 3]; 2] = [[0, 1, 2], [3, 2, 1]];

/// Affine interpolation `v0 + (v2 - v0) * x + (v1 - v0) * y`.
pub fn triangle_interpolate<T>(v0: T, v1: T, v2: T, x: f32, y: f32) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    v0 + (v2 - v0) * x + (v1 - v0) * y
}

/// [`triangle_interpolate`] over the three components of `v`.
pub fn triangle_interpolate_vec(v: &Vec3, x: f32, y: f32) -> f32 {
    triangle_interpolate(v.x, v.y, v.z, x, y)
}

/// Triangle covering normalized position `(nx, ny)` and the position in
/// that triangle's local frame.
pub fn select_triangle(nx: f32, ny: f32) -> (usize, f32, f32) {
    if nx + ny >= 1.0 {
        (1, 1.0 - nx, 1.0 - ny)
    } else {
        (0, nx, ny)
    }
}

/// Per-triangle vertex values from four quad corner values.
pub fn split_quad(corners: &Vec4) -> [Vec3; 2] {
    [swizzle3(corners, 0, 1, 2), swizzle3(corners, 3, 2, 1)]
}

/// Perspective-correct interpolation with per-vertex clip `w`.
pub fn projected_tri_interpolate(s: &Vec3, w: &Vec3, nx: f32, ny: f32) -> f32 {
    let b0 = 1.0 - nx - ny;
    (s[0] * b0 / w[0] + s[1] * ny / w[1] + s[2] * nx / w[2])
        / (b0 / w[0] + ny / w[1] + nx / w[2])
}

/// Exact screen-space x derivative of a perspective-interpolated attribute.
///
/// `wx` is the window x coordinate in the triangle's local frame, `width`
/// the destination width and `ny` the normalized local y. Reduces to
/// `(s2 - s0) / width` when all `w` are 1.
pub fn tri_derivate_x(s: &Vec3, w: &Vec3, wx: f32, width: f32, ny: f32) -> f32 {
    let d = w[1] * w[2] * (width * (ny - 1.0) + wx) - w[0] * (w[2] * width * ny + w[1] * wx);
    (w[0] * w[1] * w[2] * width
        * (w[1] * (s[0] - s[2]) * (ny - 1.0) + ny * (w[2] * (s[1] - s[0]) + w[0] * (s[2] - s[1]))))
        / (d * d)
}

/// Exact screen-space y derivative. Reduces to `(s1 - s0) / height` when
/// all `w` are 1.
pub fn tri_derivate_y(s: &Vec3, w: &Vec3, wy: f32, height: f32, nx: f32) -> f32 {
    let d = w[1] * w[2] * (height * (nx - 1.0) + wy) - w[0] * (w[1] * height * nx + w[2] * wy);
    (w[0] * w[1] * w[2] * height
        * (w[2] * (s[0] - s[1]) * (nx - 1.0) + nx * (w[0] * (s[1] - s[2]) + w[1] * (s[2] - s[0]))))
        / (d * d)
}

/// Texture coordinates for a 2D quad spanning `bottom_left..top_right`.
pub fn compute_quad_tex_coord_2d(bottom_left: [f32; 2], top_right: [f32; 2]) -> [f32; 8] {
    let [l, b] = bottom_left;
    let [r, t] = top_right;
    [l, b, l, t, r, b, r, t]
}

/// Texture coordinates for a 2D array quad on a single layer.
pub fn compute_quad_tex_coord_2d_array(
    layer: u32,
    bottom_left: [f32; 2],
    top_right: [f32; 2],
) -> [f32; 12] {
    let [l, b] = bottom_left;
    let [r, t] = top_right;
    let z = layer as f32;
    [l, b, z, l, t, z, r, b, z, r, t, z]
}

/// Texture coordinates for a 3D quad from `p0` to `p1`.
///
/// `dir_swizzle` maps the quad's (x, y, 0) axes onto texture axes, so
/// `[0, 1, 2]` spans s and t and `[2, 0, 1]` spans t and r.
pub fn compute_quad_tex_coord_3d(p0: &Vec3, p1: &Vec3, dir_swizzle: [usize; 3]) -> [f32; 12] {
    let corner = |x: f32, y: f32| {
        let f = [x, y, 0.0];
        let f = Vec3::new(f[dir_swizzle[0]], f[dir_swizzle[1]], f[dir_swizzle[2]]);
        p0 + (p1 - p0).component_mul(&f)
    };
    let v = [
        corner(0.0, 0.0),
        corner(0.0, 1.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
    ];
    let mut out = [0.0; 12];
    for (i, c) in v.iter().enumerate() {
        out[i * 3..i * 3 + 3].copy_from_slice(c.as_slice());
    }
    out
}

/// Cube map directions whose projection covers a whole face.
///
/// Each face's four corners project to face-local (0,0), (0,1), (1,0),
/// (1,1) in quad corner order.
pub fn compute_quad_tex_coord_cube(face: CubeFace) -> [f32; 12] {
    match face {
        CubeFace::NegativeX => [
            -1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0,
        ],
        CubeFace::PositiveX => [
            1.0, 1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0,
        ],
        CubeFace::NegativeY => [
            -1.0, -1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0,
        ],
        CubeFace::PositiveY => [
            -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0,
        ],
        CubeFace::NegativeZ => [
            1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0, 1.0, -1.0, -1.0, -1.0, -1.0,
        ],
        CubeFace::PositiveZ => [
            -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, 1.0,
        ],
    }
}
