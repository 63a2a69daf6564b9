//! Scan conversion shared by the software context and the CPU references
//! of the buffer verifiers.
//!
//! Positions are in normalized device coordinates and map to window
//! coordinates with `w = (x + 1) * width / 2`. Row 0 is the bottom row.

use deqp_core::math::{Vec2, Vec4};
use deqp_core::surface::{color_to_rgba8, Surface};
use image::Rgba;

/// How a rasterized fragment is combined with the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    /// `dst = min(255, dst + src)` per 8-bit channel.
    Additive,
}

/// Map a normalized device position into a `width` x `height` viewport.
pub fn to_window(p: &Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (p.x + 1.0) * width as f32 * 0.5,
        (p.y + 1.0) * height as f32 * 0.5,
    )
}

fn write_fragment(dst: &mut Surface, x: u32, y: u32, color: &Vec4, blend: BlendMode) {
    let src = color_to_rgba8(color);
    let out = match blend {
        BlendMode::Replace => src,
        BlendMode::Additive => {
            let cur = dst.pixel(x, y);
            Rgba(std::array::from_fn(|i| cur[i].saturating_add(src[i])))
        }
    };
    dst.set_pixel(x, y, out);
}

fn edge(a: &Vec2, b: &Vec2, p: &Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Fill a window-space triangle with interpolated vertex colors.
///
/// A pixel is covered when its center lies inside the triangle or on one
/// of its edges, clipped to `bounds` (`width`, `height`). Degenerate
/// triangles produce no fragments.
pub fn fill_triangle(dst: &mut Surface, bounds: (u32, u32), v: &[Vec2; 3], colors: &[Vec4; 3]) {
    let area = edge(&v[0], &v[1], &v[2]);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    let width = bounds.0.min(dst.width());
    let height = bounds.1.min(dst.height());

    let min_x = v.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = v.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = v.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = v.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

    let x0 = (min_x - 0.5).floor().max(0.0) as u32;
    let y0 = (min_y - 0.5).floor().max(0.0) as u32;
    let x1 = ((max_x - 0.5).ceil().max(-1.0) + 1.0).min(width as f32) as u32;
    let y1 = ((max_y - 0.5).ceil().max(-1.0) + 1.0).min(height as f32) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b0 = edge(&v[1], &v[2], &p) / area;
            let b1 = edge(&v[2], &v[0], &p) / area;
            let b2 = edge(&v[0], &v[1], &p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }
            let color = colors[0] * b0 + colors[1] * b1 + colors[2] * b2;
            write_fragment(dst, x, y, &color, BlendMode::Replace);
        }
    }
}

/// Draw a window-space line segment with a DDA over its major axis.
///
/// A pixel is drawn for each major-axis pixel center `c` with
/// `min <= c < max` of the segment's major-axis extent, so consecutive
/// segments of a strip share no fragments along that axis.
pub fn draw_line(
    dst: &mut Surface,
    bounds: (u32, u32),
    p0: &Vec2,
    p1: &Vec2,
    c0: &Vec4,
    c1: &Vec4,
    blend: BlendMode,
) {
    let width = bounds.0.min(dst.width()) as i64;
    let height = bounds.1.min(dst.height()) as i64;
    let d = p1 - p0;
    let x_major = d.x.abs() >= d.y.abs();
    let (major0, major1, minor0, minor_d, major_d) = if x_major {
        (p0.x, p1.x, p0.y, d.y, d.x)
    } else {
        (p0.y, p1.y, p0.x, d.x, d.y)
    };
    if major_d == 0.0 || !major_d.is_finite() {
        return;
    }

    let lo = major0.min(major1);
    let hi = major0.max(major1);
    let first = (lo - 0.5).ceil() as i64;
    let last = (hi - 0.5).ceil() as i64;
    for i in first..last {
        let c = i as f32 + 0.5;
        let t = (c - major0) / major_d;
        let minor = (minor0 + t * minor_d).floor() as i64;
        let (x, y) = if x_major { (i, minor) } else { (minor, i) };
        if x < 0 || y < 0 || x >= width || y >= height {
            continue;
        }
        let color = c0 * (1.0 - t) + c1 * t;
        write_fragment(dst, x as u32, y as u32, &color, blend);
    }
}

/// Draw a strip through `positions` (window space) with per-vertex colors.
pub fn draw_line_strip(
    dst: &mut Surface,
    bounds: (u32, u32),
    positions: &[Vec2],
    colors: &[Vec4],
    blend: BlendMode,
) {
    for i in 1..positions.len().min(colors.len()) {
        draw_line(
            dst,
            bounds,
            &positions[i - 1],
            &positions[i],
            &colors[i - 1],
            &colors[i],
            blend,
        );
    }
}
