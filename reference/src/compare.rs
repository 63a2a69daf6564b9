//! Tolerance-based image comparison.
//!
//! Every comparator produces a [`CompareReport`] with an error mask (green
//! for accepted pixels, red for rejected ones). Only a size mismatch
//! between the two images is an error; a failed comparison is a report
//! with `passed == false`, which callers may turn into
//! [`Error::ComparisonFailure`] with [`CompareReport::into_result`].

use deqp_core::access::PixelSource;
use deqp_core::math::{IVec3, IVec4, UVec4, Vec4};
use deqp_core::surface::Surface;
use image::Rgba;

use crate::error::{ensure, Error, Result};

const MASK_OK: Rgba<u8> = Rgba([0, 255, 0, 255]);
const MASK_FAIL: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Outcome of an image comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareReport {
    pub passed: bool,
    /// Image set name.
    pub name: String,
    /// Image set description.
    pub description: String,
    /// Largest per-channel difference, for comparators that measure one.
    pub max_diff: Option<Vec4>,
    pub failing_pixels: usize,
    /// Empty when the comparison passed.
    pub message: String,
    pub error_mask: Surface,
}

impl CompareReport {
    /// `Ok(self)` when passed, [`Error::ComparisonFailure`] otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.passed {
            Ok(self)
        } else {
            Err(Error::ComparisonFailure(format!(
                "{} ({}): {}",
                self.name, self.description, self.message
            )))
        }
    }
}

fn check_same_size<R: PixelSource, S: PixelSource>(reference: &R, result: &S) -> Result<()> {
    ensure(reference.size() == result.size(), || {
        format!(
            "image sizes differ: reference {:?}, result {:?}",
            reference.size(),
            result.size()
        )
    })
}

fn new_mask(width: u32, height: u32) -> Result<Surface> {
    Ok(Surface::new(width, height)?)
}

fn finish(
    name: &str,
    description: &str,
    passed: bool,
    max_diff: Option<Vec4>,
    failing_pixels: usize,
    message: String,
    error_mask: Surface,
) -> CompareReport {
    if !passed {
        log::warn!("{name}: {message}");
    }
    CompareReport {
        passed,
        name: name.to_string(),
        description: description.to_string(),
        max_diff,
        failing_pixels,
        message: if passed { String::new() } else { message },
        error_mask,
    }
}

fn format_ivec(v: &IVec4) -> String {
    format!("({}, {}, {}, {})", v.x, v.y, v.z, v.w)
}

fn format_vec(v: &Vec4) -> String {
    format!("({}, {}, {}, {})", v.x, v.y, v.z, v.w)
}

/// Per-channel integer threshold comparison. Depth slices are compared
/// slice by slice; the mask covers slice 0 rows followed by later slices.
pub fn int_threshold_compare<R: PixelSource, S: PixelSource>(
    name: &str,
    description: &str,
    reference: &R,
    result: &S,
    threshold: UVec4,
) -> Result<CompareReport> {
    check_same_size(reference, result)?;
    let (width, height, depth) = reference.size();
    let mut mask = new_mask(width, height * depth)?;
    let threshold = threshold.map(|c| c.min(i32::MAX as u32) as i32);
    let mut max_diff = IVec4::zeros();
    let mut failing = 0;

    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let a = reference.pixel_int(x, y, z);
                let b = result.pixel_int(x, y, z);
                let diff = a.zip_map(&b, |a, b| (a as i64 - b as i64).unsigned_abs().min(i32::MAX as u64) as i32);
                max_diff = max_diff.sup(&diff);
                let ok = diff.iter().zip(threshold.iter()).all(|(d, t)| d <= t);
                if !ok {
                    failing += 1;
                }
                mask.set_pixel(x, y + z * height, if ok { MASK_OK } else { MASK_FAIL });
            }
        }
    }

    let passed = failing == 0;
    let message = format!(
        "Image comparison failed: max difference = {}, threshold = {}",
        format_ivec(&max_diff),
        format_ivec(&threshold)
    );
    Ok(finish(
        name,
        description,
        passed,
        Some(max_diff.cast::<f32>()),
        failing,
        message,
        mask,
    ))
}

/// [`int_threshold_compare`] of two RGBA8 surfaces.
pub fn pixel_threshold_compare(
    name: &str,
    description: &str,
    reference: &Surface,
    result: &Surface,
    threshold: Rgba<u8>,
) -> Result<CompareReport> {
    let [r, g, b, a] = threshold.0;
    int_threshold_compare(
        name,
        description,
        reference,
        result,
        UVec4::new(r as u32, g as u32, b as u32, a as u32),
    )
}

/// Per-channel float threshold comparison.
pub fn float_threshold_compare<R: PixelSource, S: PixelSource>(
    name: &str,
    description: &str,
    reference: &R,
    result: &S,
    threshold: Vec4,
) -> Result<CompareReport> {
    check_same_size(reference, result)?;
    let (width, height, depth) = reference.size();
    let mut mask = new_mask(width, height * depth)?;
    let mut max_diff = Vec4::zeros();
    let mut failing = 0;

    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let diff = (PixelSource::pixel(reference, x, y, z) - PixelSource::pixel(result, x, y, z)).abs();
                max_diff = max_diff.sup(&diff);
                // NaN differences fail.
                let ok = diff.iter().zip(threshold.iter()).all(|(d, t)| d <= t);
                if !ok {
                    failing += 1;
                }
                mask.set_pixel(x, y + z * height, if ok { MASK_OK } else { MASK_FAIL });
            }
        }
    }

    let passed = failing == 0;
    let message = format!(
        "Image comparison failed: max difference = {}, threshold = {}",
        format_vec(&max_diff),
        format_vec(&threshold)
    );
    Ok(finish(
        name,
        description,
        passed,
        Some(max_diff),
        failing,
        message,
        mask,
    ))
}

fn int_pixel_matches(a: &IVec4, b: &IVec4, threshold: &IVec4) -> bool {
    (0..4).all(|i| (a[i] as i64 - b[i] as i64).abs() <= threshold[i] as i64)
}

/// Whether some pixel of `candidates` within `max_deviation` of
/// `(x, y, z)` matches `value`.
fn matches_in_window<S: PixelSource>(
    candidates: &S,
    value: &IVec4,
    x: i32,
    y: i32,
    z: i32,
    max_deviation: &IVec3,
    threshold: &IVec4,
) -> bool {
    let (width, height, depth) = candidates.size();
    let (w, h, d) = (width as i32, height as i32, depth as i32);
    for dz in (z - max_deviation.z).max(0)..=(z + max_deviation.z).min(d - 1) {
        for dy in (y - max_deviation.y).max(0)..=(y + max_deviation.y).min(h - 1) {
            for dx in (x - max_deviation.x).max(0)..=(x + max_deviation.x).min(w - 1) {
                let c = candidates.pixel_int(dx as u32, dy as u32, dz as u32);
                if int_pixel_matches(value, &c, threshold) {
                    return true;
                }
            }
        }
    }
    false
}

fn count_position_deviation_failures<R: PixelSource, S: PixelSource>(
    reference: &R,
    result: &S,
    mask: &mut Surface,
    threshold: &IVec4,
    max_deviation: &IVec3,
    accept_out_of_bounds: bool,
) -> usize {
    let (width, height, depth) = reference.size();
    let (w, h, d) = (width as i32, height as i32, depth as i32);
    let mut failing = 0;

    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let ref_pix = reference.pixel_int(x as u32, y as u32, z as u32);
                let res_pix = result.pixel_int(x as u32, y as u32, z as u32);

                let out_of_bounds = x < max_deviation.x
                    || x >= w - max_deviation.x
                    || y < max_deviation.y
                    || y >= h - max_deviation.y
                    || z < max_deviation.z
                    || z >= d - max_deviation.z;

                let ok = int_pixel_matches(&ref_pix, &res_pix, threshold)
                    || (accept_out_of_bounds && out_of_bounds)
                    || (matches_in_window(result, &ref_pix, x, y, z, max_deviation, threshold)
                        && matches_in_window(reference, &res_pix, x, y, z, max_deviation, threshold));

                if !ok {
                    failing += 1;
                }
                mask.set_pixel(
                    x as u32,
                    (y + z * h) as u32,
                    if ok { MASK_OK } else { MASK_FAIL },
                );
            }
        }
    }
    failing
}

/// Threshold comparison that also accepts pixels displaced by up to
/// `max_deviation` in either image.
pub fn int_threshold_position_deviation_compare<R: PixelSource, S: PixelSource>(
    name: &str,
    description: &str,
    reference: &R,
    result: &S,
    threshold: UVec4,
    max_deviation: IVec3,
    accept_out_of_bounds: bool,
) -> Result<CompareReport> {
    check_same_size(reference, result)?;
    let (width, height, depth) = reference.size();
    let mut mask = new_mask(width, height * depth)?;
    let threshold = threshold.map(|c| c.min(i32::MAX as u32) as i32);
    let failing = count_position_deviation_failures(
        reference,
        result,
        &mut mask,
        &threshold,
        &max_deviation,
        accept_out_of_bounds,
    );
    let passed = failing == 0;
    let message = format!(
        "Image comparison failed: failed pixels = {}, threshold = {}",
        failing,
        format_ivec(&threshold)
    );
    Ok(finish(name, description, passed, None, failing, message, mask))
}

/// [`int_threshold_position_deviation_compare`] that tolerates up to
/// `max_failing_pixels` rejected pixels.
#[allow(clippy::too_many_arguments)]
pub fn int_threshold_position_deviation_error_threshold_compare<R: PixelSource, S: PixelSource>(
    name: &str,
    description: &str,
    reference: &R,
    result: &S,
    threshold: UVec4,
    max_deviation: IVec3,
    accept_out_of_bounds: bool,
    max_failing_pixels: usize,
) -> Result<CompareReport> {
    check_same_size(reference, result)?;
    let (width, height, depth) = reference.size();
    let mut mask = new_mask(width, height * depth)?;
    let threshold = threshold.map(|c| c.min(i32::MAX as u32) as i32);
    let failing = count_position_deviation_failures(
        reference,
        result,
        &mut mask,
        &threshold,
        &max_deviation,
        accept_out_of_bounds,
    );
    let passed = failing <= max_failing_pixels;
    let message = format!(
        "Position deviation error threshold image comparison failed: failed pixels = {}, threshold = {}",
        failing, max_failing_pixels
    );
    Ok(finish(name, description, passed, None, failing, message, mask))
}

// ============================================================================
// Bilinear
// ============================================================================

/// Sub-pixel sample positions in units of 1/256 pixel.
const BILINEAR_SAMPLE_OFFSETS: [(i32, i32); 28] = [
    (226, 186),
    (335, 235),
    (279, 334),
    (178, 272),
    (112, 202),
    (306, 117),
    (396, 299),
    (206, 382),
    (146, 96),
    (423, 155),
    (361, 412),
    (84, 339),
    (48, 130),
    (367, 43),
    (455, 367),
    (105, 439),
    (83, 46),
    (217, 24),
    (461, 71),
    (450, 459),
    (239, 469),
    (67, 267),
    (459, 255),
    (13, 416),
    (10, 192),
    (141, 502),
    (503, 304),
    (380, 506),
];

const SUBPIXEL_BITS: u32 = 8;

fn rgba_matches(a: Rgba<u8>, b: Rgba<u8>, threshold: Rgba<u8>) -> bool {
    (0..4).all(|i| a[i].abs_diff(b[i]) <= threshold[i])
}

/// Bilinear sample of `surface` at fixed-point position `(u, v)`. The
/// caller keeps the 2x2 footprint inside the image.
fn bilinear_sample(surface: &Surface, u: i32, v: i32) -> Rgba<u8> {
    let one = 1 << SUBPIXEL_BITS;
    let x = (u >> SUBPIXEL_BITS) as u32;
    let y = (v >> SUBPIXEL_BITS) as u32;
    let fx = (u & (one - 1)) as u32;
    let fy = (v & (one - 1)) as u32;
    let one = one as u32;

    let p00 = surface.pixel(x, y);
    let p10 = surface.pixel(x + 1, y);
    let p01 = surface.pixel(x, y + 1);
    let p11 = surface.pixel(x + 1, y + 1);

    let mut out = [0u8; 4];
    for (i, c) in out.iter_mut().enumerate() {
        let sum = p00[i] as u32 * (one - fx) * (one - fy)
            + p10[i] as u32 * fx * (one - fy)
            + p01[i] as u32 * (one - fx) * fy
            + p11[i] as u32 * fx * fy;
        *c = ((sum + (1 << 15)) >> 16) as u8;
    }
    Rgba(out)
}

/// Whether `value` matches `reference` near `(x, y)`: any pixel of the
/// 3x3 neighbourhood, or any bilinear sample in the surrounding 2x2 pixel
/// area.
fn bilinear_match(reference: &Surface, value: Rgba<u8>, x: u32, y: u32, threshold: Rgba<u8>) -> bool {
    let (w, h) = (reference.width() as i32, reference.height() as i32);
    let (x, y) = (x as i32, y as i32);

    for dy in -1..=1 {
        for dx in -1..=1 {
            let (nx, ny) = (x + dx, y + dy);
            if (0..w).contains(&nx)
                && (0..h).contains(&ny)
                && rgba_matches(reference.pixel(nx as u32, ny as u32), value, threshold)
            {
                return true;
            }
        }
    }

    let max_u = (w - 1) << SUBPIXEL_BITS;
    let max_v = (h - 1) << SUBPIXEL_BITS;
    for &(ox, oy) in &BILINEAR_SAMPLE_OFFSETS {
        let u = ((x - 1) << SUBPIXEL_BITS) + ox;
        let v = ((y - 1) << SUBPIXEL_BITS) + oy;
        if !(0..max_u).contains(&u) || !(0..max_v).contains(&v) {
            continue;
        }
        if rgba_matches(bilinear_sample(reference, u, v), value, threshold) {
            return true;
        }
    }
    false
}

/// Fuzzy RGBA8 comparison that tolerates edge shifts of about one pixel
/// and differences in bilinear filtering.
pub fn bilinear_compare(
    name: &str,
    description: &str,
    reference: &Surface,
    result: &Surface,
    threshold: Rgba<u8>,
) -> Result<CompareReport> {
    check_same_size(reference, result)?;
    let (width, height) = (reference.width(), reference.height());
    let mut mask = new_mask(width, height)?;
    let mut failing = 0;

    for y in 0..height {
        for x in 0..width {
            let ok = bilinear_match(reference, result.pixel(x, y), x, y, threshold)
                && bilinear_match(result, reference.pixel(x, y), x, y, threshold);
            if !ok {
                failing += 1;
            }
            mask.set_pixel(x, y, if ok { MASK_OK } else { MASK_FAIL });
        }
    }

    let passed = failing == 0;
    let [r, g, b, a] = threshold.0;
    let message = format!("Image comparison failed: threshold = ({r}, {g}, {b}, {a})");
    Ok(finish(name, description, passed, None, failing, message, mask))
}

/// Compare a rendered image against its reference with a per-channel
/// threshold.
pub fn compare_images(reference: &Surface, rendered: &Surface, threshold: Rgba<u8>) -> Result<CompareReport> {
    pixel_threshold_compare("Result", "Image comparison result", reference, rendered, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use deqp_core::texture::{TextureFormat, TextureLevel};

    fn solid(width: u32, height: u32, color: Rgba<u8>) -> Surface {
        let mut s = Surface::new(width, height).unwrap();
        s.clear(color);
        s
    }

    #[test]
    fn identical_images_pass() {
        let a = solid(4, 4, Rgba([10, 20, 30, 255]));
        let report = compare_images(&a, &a, Rgba([0, 0, 0, 0])).unwrap();
        assert!(report.passed);
        assert_eq!(report.failing_pixels, 0);
        assert!(report.message.is_empty());
        assert_eq!(report.error_mask.pixel(3, 3), MASK_OK);
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = solid(2, 2, Rgba([100, 100, 100, 255]));
        let b = solid(2, 2, Rgba([103, 100, 100, 255]));
        assert!(compare_images(&a, &b, Rgba([3, 3, 3, 3])).unwrap().passed);
        let report = compare_images(&a, &b, Rgba([2, 3, 3, 3])).unwrap();
        assert!(!report.passed);
        assert_eq!(report.failing_pixels, 4);
        assert_eq!(report.max_diff, Some(Vec4::new(3.0, 0.0, 0.0, 0.0)));
        assert_eq!(
            report.message,
            "Image comparison failed: max difference = (3, 0, 0, 0), threshold = (2, 3, 3, 3)"
        );
        assert_eq!(report.error_mask.pixel(0, 0), MASK_FAIL);
    }

    #[test]
    fn size_mismatch_is_precondition() {
        let a = solid(2, 2, Rgba([0, 0, 0, 255]));
        let b = solid(3, 2, Rgba([0, 0, 0, 255]));
        let err = compare_images(&a, &b, Rgba([0, 0, 0, 0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn failed_report_converts_to_comparison_failure() {
        let a = solid(2, 2, Rgba([0, 0, 0, 255]));
        let b = solid(2, 2, Rgba([255, 0, 0, 255]));
        let err = compare_images(&a, &b, Rgba([0, 0, 0, 0]))
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComparisonFailure);
    }

    #[test]
    fn float_compare_on_levels() {
        let mut a = TextureLevel::new(TextureFormat::RGBA32F, 2, 2, 1).unwrap();
        let mut b = a.clone();
        a.clear(&Vec4::new(0.5, 0.5, 0.5, 1.0));
        b.clear(&Vec4::new(0.5, 0.52, 0.5, 1.0));
        let ok = float_threshold_compare("a", "b", &a, &b, Vec4::repeat(0.05)).unwrap();
        assert!(ok.passed);
        let bad = float_threshold_compare("a", "b", &a, &b, Vec4::repeat(0.01)).unwrap();
        assert!(!bad.passed);
    }

    #[test]
    fn position_deviation_accepts_shifted_pixel() {
        let mut a = solid(8, 8, Rgba([0, 0, 0, 255]));
        let mut b = a.clone();
        a.set_pixel(3, 3, Rgba([255, 255, 255, 255]));
        b.set_pixel(4, 3, Rgba([255, 255, 255, 255]));
        let strict = pixel_threshold_compare("a", "b", &a, &b, Rgba([0, 0, 0, 0])).unwrap();
        assert!(!strict.passed);
        let report = int_threshold_position_deviation_compare(
            "a",
            "b",
            &a,
            &b,
            UVec4::zeros(),
            IVec3::new(1, 1, 0),
            false,
        )
        .unwrap();
        assert!(report.passed);

        let mut far = solid(8, 8, Rgba([0, 0, 0, 255]));
        far.set_pixel(6, 3, Rgba([255, 255, 255, 255]));
        let report = int_threshold_position_deviation_compare(
            "a",
            "b",
            &a,
            &far,
            UVec4::zeros(),
            IVec3::new(1, 1, 0),
            false,
        )
        .unwrap();
        assert!(!report.passed);
        assert_eq!(report.failing_pixels, 2);

        let report = int_threshold_position_deviation_error_threshold_compare(
            "a",
            "b",
            &a,
            &far,
            UVec4::zeros(),
            IVec3::new(1, 1, 0),
            false,
            2,
        )
        .unwrap();
        assert!(report.passed);
    }

    #[test]
    fn out_of_bounds_pixels_can_be_accepted() {
        let a = solid(4, 4, Rgba([0, 0, 0, 255]));
        let mut b = a.clone();
        b.set_pixel(0, 2, Rgba([9, 9, 9, 255]));
        let dev = IVec3::new(1, 1, 0);
        let strict =
            int_threshold_position_deviation_compare("a", "b", &a, &b, UVec4::zeros(), dev, false).unwrap();
        assert!(!strict.passed);
        let lenient =
            int_threshold_position_deviation_compare("a", "b", &a, &b, UVec4::zeros(), dev, true).unwrap();
        assert!(lenient.passed);
    }

    #[test]
    fn bilinear_tolerates_one_pixel_edge_shift() {
        let edge = |split: u32| {
            let mut s = solid(16, 16, Rgba([0, 0, 0, 255]));
            for y in 0..16 {
                for x in split..16 {
                    s.set_pixel(x, y, Rgba([255, 255, 255, 255]));
                }
            }
            s
        };
        let a = edge(8);
        let b = edge(9);
        let threshold = Rgba([8, 8, 8, 8]);
        assert!(!compare_images(&a, &b, threshold).unwrap().passed);
        assert!(bilinear_compare("a", "b", &a, &b, threshold).unwrap().passed);

        let c = edge(11);
        let report = bilinear_compare("a", "b", &a, &c, threshold).unwrap();
        assert!(!report.passed);
        assert_eq!(report.message, "Image comparison failed: threshold = (8, 8, 8, 8)");
    }
}
