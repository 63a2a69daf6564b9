//! Sampler state: wrap modes, filters, depth comparison and border color.

use crate::math::{imod, mirror, Vec4};

/// Texture filtering mode.
///
/// The mipmap variants name the in-level filter first and the between-level
/// filter second, as in `GL_LINEAR_MIPMAP_NEAREST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    #[default]
    Nearest,
    /// Bilinear filtering.
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl FilterMode {
    /// The filter applied inside a single level.
    pub fn level_filter(self) -> FilterMode {
        match self {
            FilterMode::Nearest | FilterMode::NearestMipmapNearest | FilterMode::NearestMipmapLinear => {
                FilterMode::Nearest
            }
            FilterMode::Linear | FilterMode::LinearMipmapNearest | FilterMode::LinearMipmapLinear => {
                FilterMode::Linear
            }
        }
    }
}

/// Texture wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Clamp to edge.
    #[default]
    ClampToEdge,
    /// Clamp to border color.
    ClampToBorder,
    /// Repeat.
    Repeat,
    /// Mirrored repeat.
    MirroredRepeat,
}

impl WrapMode {
    /// Map an integer texel coordinate into the addressable range.
    ///
    /// `ClampToBorder` keeps one texel of slack on each side so callers can
    /// tell that a border texel was requested.
    pub fn wrap(self, c: i32, size: i32) -> i32 {
        match self {
            WrapMode::ClampToBorder => c.clamp(-1, size),
            WrapMode::ClampToEdge => c.clamp(0, size - 1),
            WrapMode::Repeat => imod(c, size),
            WrapMode::MirroredRepeat => (size - 1) - mirror(imod(c, 2 * size) - size),
        }
    }

    /// Bring a texel-space coordinate into a single wrap period without
    /// changing which texels it addresses. Indices derived from the result,
    /// and their `+1` neighbours, always fit in `i32`. Infinite coordinates
    /// have no position within a period and address texel 0.
    pub fn reduce(self, u: f32, size: i32) -> f32 {
        let size = size as f32;
        match self {
            WrapMode::ClampToEdge | WrapMode::ClampToBorder => u.clamp(-1.0, size + 1.0),
            WrapMode::Repeat | WrapMode::MirroredRepeat if !u.is_finite() => 0.0,
            WrapMode::Repeat => u.rem_euclid(size),
            WrapMode::MirroredRepeat => u.rem_euclid(2.0 * size),
        }
    }
}

/// Comparison function for depth/shadow sampling.
///
/// Evaluated as `reference OP texel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never pass.
    Never,
    /// Pass if less than.
    Less,
    /// Pass if equal.
    Equal,
    /// Pass if less than or equal.
    LessEqual,
    /// Pass if greater than.
    Greater,
    /// Pass if not equal.
    NotEqual,
    /// Pass if greater than or equal.
    GreaterEqual,
    /// Always pass.
    Always,
}

impl CompareFunction {
    /// Whether `reference OP texel` holds.
    pub fn evaluate(self, reference: f32, texel: f32) -> bool {
        match self {
            CompareFunction::Never => false,
            CompareFunction::Less => reference < texel,
            CompareFunction::Equal => reference == texel,
            CompareFunction::LessEqual => reference <= texel,
            CompareFunction::Greater => reference > texel,
            CompareFunction::NotEqual => reference != texel,
            CompareFunction::GreaterEqual => reference >= texel,
            CompareFunction::Always => true,
        }
    }
}

/// Sampler configuration.
///
/// A pure value type; copies are independent. Defaults match GL state
/// except for the wrap mode, which is clamp-to-edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    /// Wrap mode for the S coordinate.
    pub wrap_s: WrapMode,
    /// Wrap mode for the T coordinate.
    pub wrap_t: WrapMode,
    /// Wrap mode for the R coordinate.
    pub wrap_r: WrapMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// LOD at or below which the texture counts as magnified.
    pub lod_threshold: f32,
    /// Whether coordinates are in `[0, 1]` rather than texels.
    pub normalized_coords: bool,
    /// Comparison function for depth sampling.
    pub compare: Option<CompareFunction>,
    /// Channel read for depth comparison.
    pub compare_channel: usize,
    /// Color returned for texels outside a clamp-to-border texture.
    pub border_color: Vec4,
}

impl Sampler {
    /// Create a sampler with the given wrap mode on all axes and filters.
    pub fn new(wrap: WrapMode, min_filter: FilterMode, mag_filter: FilterMode) -> Self {
        Self::default()
            .with_wrap(wrap)
            .with_filters(min_filter, mag_filter)
    }

    /// Create a nearest neighbor filtering sampler.
    pub fn nearest() -> Self {
        Self::default()
    }

    /// Create a bilinear filtering sampler.
    pub fn linear() -> Self {
        Self::default().with_filters(FilterMode::Linear, FilterMode::Linear)
    }

    /// Set wrap mode for all coordinates.
    pub fn with_wrap(mut self, mode: WrapMode) -> Self {
        self.wrap_s = mode;
        self.wrap_t = mode;
        self.wrap_r = mode;
        self
    }

    /// Set wrap modes per coordinate.
    pub fn with_wrap_modes(mut self, s: WrapMode, t: WrapMode, r: WrapMode) -> Self {
        self.wrap_s = s;
        self.wrap_t = t;
        self.wrap_r = r;
        self
    }

    /// Set minification and magnification filters.
    pub fn with_filters(mut self, min_filter: FilterMode, mag_filter: FilterMode) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }

    /// Set comparison function for depth sampling.
    pub fn with_compare(mut self, compare: CompareFunction) -> Self {
        self.compare = Some(compare);
        self
    }

    pub fn with_border_color(mut self, color: Vec4) -> Self {
        self.border_color = color;
        self
    }

    /// LOD at or below which the mag filter is used.
    pub fn with_lod_threshold(mut self, threshold: f32) -> Self {
        self.lod_threshold = threshold;
        self
    }

    /// Interpret coordinates as texel units.
    pub fn with_unnormalized_coords(mut self) -> Self {
        self.normalized_coords = false;
        self
    }

    /// Filter selected for the given LOD.
    pub fn filter_for_lod(&self, lod: f32) -> FilterMode {
        if lod <= self.lod_threshold {
            self.mag_filter
        } else {
            self.min_filter
        }
    }

    /// Scale a coordinate into texel space.
    pub fn unnormalize(&self, c: f32, size: u32) -> f32 {
        if self.normalized_coords {
            c * size as f32
        } else {
            c
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            wrap_r: WrapMode::ClampToEdge,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            lod_threshold: 0.0,
            normalized_coords: true,
            compare: None,
            compare_channel: 0,
            border_color: Vec4::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_modes_address_texels() {
        assert_eq!(WrapMode::ClampToEdge.wrap(-3, 4), 0);
        assert_eq!(WrapMode::ClampToEdge.wrap(7, 4), 3);
        assert_eq!(WrapMode::ClampToBorder.wrap(-3, 4), -1);
        assert_eq!(WrapMode::ClampToBorder.wrap(9, 4), 4);
        assert_eq!(WrapMode::Repeat.wrap(-1, 4), 3);
        assert_eq!(WrapMode::Repeat.wrap(5, 4), 1);
        assert_eq!(WrapMode::MirroredRepeat.wrap(-1, 4), 0);
        assert_eq!(WrapMode::MirroredRepeat.wrap(4, 4), 3);
        assert_eq!(WrapMode::MirroredRepeat.wrap(8, 4), 0);
    }

    #[test]
    fn reduce_keeps_addressed_texel() {
        assert_eq!(WrapMode::Repeat.reduce(4_194_306.5, 4), 2.5);
        assert_eq!(WrapMode::Repeat.reduce(-1.5, 4), 2.5);
        assert_eq!(WrapMode::MirroredRepeat.reduce(13.0, 4), 5.0);
        assert_eq!(WrapMode::ClampToEdge.reduce(-1.0e30, 4), -1.0);
        assert_eq!(WrapMode::ClampToBorder.reduce(f32::INFINITY, 4), 5.0);
        assert_eq!(WrapMode::ClampToEdge.reduce(2.25, 4), 2.25);
        assert_eq!(WrapMode::Repeat.reduce(f32::NEG_INFINITY, 4), 0.0);
    }

    #[test]
    fn compare_is_reference_op_texel() {
        assert!(CompareFunction::LessEqual.evaluate(0.5, 0.5));
        assert!(CompareFunction::Less.evaluate(0.25, 0.5));
        assert!(!CompareFunction::Greater.evaluate(0.25, 0.5));
        assert!(!CompareFunction::Never.evaluate(0.0, 1.0));
    }

    #[test]
    fn filter_selection_uses_threshold() {
        let sampler = Sampler::new(
            WrapMode::Repeat,
            FilterMode::LinearMipmapLinear,
            FilterMode::Nearest,
        );
        assert_eq!(sampler.filter_for_lod(0.0), FilterMode::Nearest);
        assert_eq!(sampler.filter_for_lod(0.1), FilterMode::LinearMipmapLinear);
        assert_eq!(FilterMode::LinearMipmapLinear.level_filter(), FilterMode::Linear);
        assert_eq!(FilterMode::NearestMipmapLinear.level_filter(), FilterMode::Nearest);
    }

    #[test]
    fn defaults() {
        let s = Sampler::default();
        assert_eq!(s.lod_threshold, 0.0);
        assert!(s.normalized_coords);
        assert_eq!(s.border_color, Vec4::zeros());
        assert_eq!(s.unnormalize(0.5, 8), 4.0);
        assert_eq!(s.with_unnormalized_coords().unnormalize(0.5, 8), 0.5);
    }
}
