//! Texture formats: channel order, channel type and pixel packing.
//!
//! A [`TextureFormat`] knows how to decode one pixel of raw little-endian
//! bytes into an RGBA float or integer vector, and how to encode one back.
//! Missing components read as `0`, except alpha which reads as `1`.

use crate::math::{IVec4, Vec4};

/// Order of the channels stored in a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    R,
    A,
    /// Intensity: one channel replicated to all components.
    I,
    /// Luminance: one channel replicated to RGB.
    L,
    LA,
    RG,
    RA,
    RGB,
    RGBA,
    ARGB,
    BGRA,
    SRGB,
    SRGBA,
    /// Depth.
    D,
    /// Stencil.
    S,
    /// Combined depth and stencil.
    DS,
}

impl ChannelOrder {
    /// Number of stored channels.
    pub fn num_channels(self) -> usize {
        match self {
            ChannelOrder::R
            | ChannelOrder::A
            | ChannelOrder::I
            | ChannelOrder::L
            | ChannelOrder::D
            | ChannelOrder::S => 1,
            ChannelOrder::LA | ChannelOrder::RG | ChannelOrder::RA | ChannelOrder::DS => 2,
            ChannelOrder::RGB | ChannelOrder::SRGB => 3,
            ChannelOrder::RGBA | ChannelOrder::ARGB | ChannelOrder::BGRA | ChannelOrder::SRGBA => 4,
        }
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, ChannelOrder::SRGB | ChannelOrder::SRGBA)
    }

    pub fn is_depth(self) -> bool {
        matches!(self, ChannelOrder::D | ChannelOrder::DS)
    }

    /// Source of each RGBA component when reading.
    fn read_map(self) -> [Component; 4] {
        use Component::{Channel as C, One, Zero};
        match self {
            ChannelOrder::R => [C(0), Zero, Zero, One],
            ChannelOrder::A => [Zero, Zero, Zero, C(0)],
            ChannelOrder::I => [C(0), C(0), C(0), C(0)],
            ChannelOrder::L => [C(0), C(0), C(0), One],
            ChannelOrder::LA => [C(0), C(0), C(0), C(1)],
            ChannelOrder::RG => [C(0), C(1), Zero, One],
            ChannelOrder::RA => [C(0), Zero, Zero, C(1)],
            ChannelOrder::RGB | ChannelOrder::SRGB => [C(0), C(1), C(2), One],
            ChannelOrder::RGBA | ChannelOrder::SRGBA => [C(0), C(1), C(2), C(3)],
            ChannelOrder::BGRA => [C(2), C(1), C(0), C(3)],
            ChannelOrder::ARGB => [C(1), C(2), C(3), C(0)],
            ChannelOrder::D => [C(0), Zero, Zero, One],
            ChannelOrder::S => [Zero, Zero, Zero, C(0)],
            ChannelOrder::DS => [C(0), Zero, Zero, C(1)],
        }
    }

    /// RGBA component written to each stored channel.
    fn write_map(self) -> &'static [usize] {
        match self {
            ChannelOrder::R | ChannelOrder::I | ChannelOrder::L | ChannelOrder::D => &[0],
            ChannelOrder::A | ChannelOrder::S => &[3],
            ChannelOrder::LA | ChannelOrder::RA | ChannelOrder::DS => &[0, 3],
            ChannelOrder::RG => &[0, 1],
            ChannelOrder::RGB | ChannelOrder::SRGB => &[0, 1, 2],
            ChannelOrder::RGBA | ChannelOrder::SRGBA => &[0, 1, 2, 3],
            ChannelOrder::BGRA => &[2, 1, 0, 3],
            ChannelOrder::ARGB => &[3, 0, 1, 2],
        }
    }
}

/// Storage type of the channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    SnormInt8,
    SnormInt16,
    SnormInt32,
    UnormInt8,
    UnormInt16,
    UnormInt32,
    UnormShort565,
    UnormShort555,
    UnormShort4444,
    UnormShort5551,
    UnormInt101010,
    UnormInt1010102Rev,
    UnsignedInt1010102Rev,
    /// 24-bit normalized depth in the high bits, 8-bit stencil in the low bits.
    UnsignedInt248,
    SignedInt8,
    SignedInt16,
    SignedInt32,
    UnsignedInt8,
    UnsignedInt16,
    UnsignedInt32,
    Float,
}

impl ChannelType {
    fn plain(self) -> Option<(usize, Scalar)> {
        let plain = match self {
            ChannelType::SnormInt8 => (1, Scalar::Snorm(8)),
            ChannelType::SnormInt16 => (2, Scalar::Snorm(16)),
            ChannelType::SnormInt32 => (4, Scalar::Snorm(32)),
            ChannelType::UnormInt8 => (1, Scalar::Unorm(8)),
            ChannelType::UnormInt16 => (2, Scalar::Unorm(16)),
            ChannelType::UnormInt32 => (4, Scalar::Unorm(32)),
            ChannelType::SignedInt8 => (1, Scalar::SInt(8)),
            ChannelType::SignedInt16 => (2, Scalar::SInt(16)),
            ChannelType::SignedInt32 => (4, Scalar::SInt(32)),
            ChannelType::UnsignedInt8 => (1, Scalar::UInt(8)),
            ChannelType::UnsignedInt16 => (2, Scalar::UInt(16)),
            ChannelType::UnsignedInt32 => (4, Scalar::UInt(32)),
            ChannelType::Float => (4, Scalar::Float),
            _ => return None,
        };
        Some(plain)
    }
}

#[derive(Debug, Clone, Copy)]
enum Component {
    Channel(usize),
    Zero,
    One,
}

/// Interpretation of one stored channel of `bits` width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Snorm(u32),
    Unorm(u32),
    SInt(u32),
    UInt(u32),
    Float,
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

fn sign_extend(raw: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((raw << shift) as i32) >> shift
}

impl Scalar {
    fn signed_range(bits: u32) -> (i64, i64) {
        let max = (1i64 << (bits - 1)) - 1;
        (-max - 1, max)
    }

    fn decode(self, raw: u32) -> f32 {
        match self {
            Scalar::Snorm(bits) => {
                let max = ((1i64 << (bits - 1)) - 1) as f64;
                (sign_extend(raw, bits) as f64 / max).max(-1.0) as f32
            }
            Scalar::Unorm(bits) => (raw as f64 / mask(bits) as f64) as f32,
            Scalar::SInt(bits) => sign_extend(raw, bits) as f32,
            Scalar::UInt(_) => raw as f32,
            Scalar::Float => f32::from_bits(raw),
        }
    }

    fn decode_int(self, raw: u32) -> i32 {
        match self {
            Scalar::Snorm(bits) | Scalar::SInt(bits) => sign_extend(raw, bits),
            Scalar::Unorm(_) | Scalar::UInt(_) => raw as i32,
            Scalar::Float => f32::from_bits(raw) as i32,
        }
    }

    fn encode(self, v: f32) -> u32 {
        match self {
            Scalar::Unorm(bits) => {
                let max = mask(bits) as f64;
                ((v as f64).clamp(0.0, 1.0) * max).round() as u32
            }
            Scalar::Snorm(bits) => {
                let max = ((1i64 << (bits - 1)) - 1) as f64;
                let s = ((v as f64).clamp(-1.0, 1.0) * max).round() as i64;
                (s as u32) & mask(bits)
            }
            Scalar::SInt(bits) => {
                let (lo, hi) = Self::signed_range(bits);
                let s = (v.round_ties_even() as i64).clamp(lo, hi);
                (s as u32) & mask(bits)
            }
            Scalar::UInt(bits) => (v.round_ties_even() as i64).clamp(0, mask(bits) as i64) as u32,
            Scalar::Float => v.to_bits(),
        }
    }

    fn encode_int(self, v: i32) -> u32 {
        match self {
            Scalar::Unorm(bits) | Scalar::UInt(bits) => {
                (v as i64).clamp(0, mask(bits) as i64) as u32
            }
            Scalar::Snorm(bits) | Scalar::SInt(bits) => {
                let (lo, hi) = Self::signed_range(bits);
                ((v as i64).clamp(lo, hi) as u32) & mask(bits)
            }
            Scalar::Float => (v as f32).to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Field {
    shift: u32,
    bits: u32,
    scalar: Scalar,
}

impl Field {
    const fn unorm(shift: u32, bits: u32) -> Self {
        Self {
            shift,
            bits,
            scalar: Scalar::Unorm(bits),
        }
    }

    const fn uint(shift: u32, bits: u32) -> Self {
        Self {
            shift,
            bits,
            scalar: Scalar::UInt(bits),
        }
    }

    fn extract(&self, word: u32) -> u32 {
        (word >> self.shift) & mask(self.bits)
    }

    fn insert(&self, value: u32) -> u32 {
        (value & mask(self.bits)) << self.shift
    }
}

const FIELDS_565: [Field; 3] = [Field::unorm(11, 5), Field::unorm(5, 6), Field::unorm(0, 5)];
const FIELDS_555: [Field; 3] = [Field::unorm(10, 5), Field::unorm(5, 5), Field::unorm(0, 5)];
const FIELDS_4444: [Field; 4] = [
    Field::unorm(12, 4),
    Field::unorm(8, 4),
    Field::unorm(4, 4),
    Field::unorm(0, 4),
];
const FIELDS_5551: [Field; 4] = [
    Field::unorm(11, 5),
    Field::unorm(6, 5),
    Field::unorm(1, 5),
    Field::unorm(0, 1),
];
const FIELDS_101010: [Field; 3] = [
    Field::unorm(22, 10),
    Field::unorm(12, 10),
    Field::unorm(2, 10),
];
const FIELDS_1010102_REV: [Field; 4] = [
    Field::unorm(0, 10),
    Field::unorm(10, 10),
    Field::unorm(20, 10),
    Field::unorm(30, 2),
];
const FIELDS_U1010102_REV: [Field; 4] = [
    Field::uint(0, 10),
    Field::uint(10, 10),
    Field::uint(20, 10),
    Field::uint(30, 2),
];
const FIELDS_D24: [Field; 1] = [Field::unorm(8, 24)];
const FIELDS_D24S8: [Field; 2] = [Field::unorm(8, 24), Field::uint(0, 8)];

/// Byte layout of one pixel.
enum Layout {
    Plain { channel_size: usize, scalar: Scalar },
    Packed { size: usize, fields: &'static [Field] },
}

fn read_word(bytes: &[u8], size: usize) -> u32 {
    match size {
        1 => bytes[0] as u32,
        2 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
        _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

fn write_word(bytes: &mut [u8], size: usize, word: u32) {
    bytes[..size].copy_from_slice(&word.to_le_bytes()[..size]);
}

/// Texture format: channel order plus channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFormat {
    pub order: ChannelOrder,
    pub channel_type: ChannelType,
}

impl TextureFormat {
    pub const RGBA8: TextureFormat = TextureFormat::new(ChannelOrder::RGBA, ChannelType::UnormInt8);
    pub const RGB8: TextureFormat = TextureFormat::new(ChannelOrder::RGB, ChannelType::UnormInt8);
    pub const SRGBA8: TextureFormat =
        TextureFormat::new(ChannelOrder::SRGBA, ChannelType::UnormInt8);
    pub const RGBA32F: TextureFormat = TextureFormat::new(ChannelOrder::RGBA, ChannelType::Float);
    pub const RGBA32I: TextureFormat =
        TextureFormat::new(ChannelOrder::RGBA, ChannelType::SignedInt32);
    pub const RGBA32UI: TextureFormat =
        TextureFormat::new(ChannelOrder::RGBA, ChannelType::UnsignedInt32);
    pub const DEPTH16: TextureFormat = TextureFormat::new(ChannelOrder::D, ChannelType::UnormInt16);
    pub const DEPTH32F: TextureFormat = TextureFormat::new(ChannelOrder::D, ChannelType::Float);
    pub const DEPTH24_STENCIL8: TextureFormat =
        TextureFormat::new(ChannelOrder::DS, ChannelType::UnsignedInt248);

    pub const fn new(order: ChannelOrder, channel_type: ChannelType) -> Self {
        Self {
            order,
            channel_type,
        }
    }

    fn layout(&self) -> Option<Layout> {
        if let Some((channel_size, scalar)) = self.channel_type.plain() {
            return Some(Layout::Plain {
                channel_size,
                scalar,
            });
        }
        let (size, fields): (usize, &'static [Field]) = match self.channel_type {
            ChannelType::UnormShort565 => (2, &FIELDS_565),
            ChannelType::UnormShort555 => (2, &FIELDS_555),
            ChannelType::UnormShort4444 => (2, &FIELDS_4444),
            ChannelType::UnormShort5551 => (2, &FIELDS_5551),
            ChannelType::UnormInt101010 => (4, &FIELDS_101010),
            ChannelType::UnormInt1010102Rev => (4, &FIELDS_1010102_REV),
            ChannelType::UnsignedInt1010102Rev => (4, &FIELDS_U1010102_REV),
            ChannelType::UnsignedInt248 if self.order == ChannelOrder::D => (4, &FIELDS_D24),
            ChannelType::UnsignedInt248 => (4, &FIELDS_D24S8),
            _ => return None,
        };
        (fields.len() == self.order.num_channels()).then_some(Layout::Packed { size, fields })
    }

    /// Whether this order/type combination can be stored.
    pub fn is_valid(&self) -> bool {
        self.layout().is_some()
    }

    /// Size of one pixel in bytes.
    pub fn pixel_size(&self) -> usize {
        match self.layout() {
            Some(Layout::Plain { channel_size, .. }) => channel_size * self.order.num_channels(),
            Some(Layout::Packed { size, .. }) => size,
            None => 0,
        }
    }

    pub fn is_srgb(&self) -> bool {
        self.order.is_srgb()
    }

    /// Depth format whose stored values are normalized integers.
    pub fn is_fixed_point_depth(&self) -> bool {
        self.order.is_depth() && self.channel_type != ChannelType::Float
    }

    fn apply_read_map<T: Copy>(&self, channels: [T; 4], zero: T, one: T) -> [T; 4] {
        self.order.read_map().map(|c| match c {
            Component::Channel(i) => channels[i],
            Component::Zero => zero,
            Component::One => one,
        })
    }

    /// Decode one pixel to a float color.
    pub fn decode(&self, bytes: &[u8]) -> Vec4 {
        let mut channels = [0.0f32; 4];
        match self.layout() {
            Some(Layout::Plain {
                channel_size,
                scalar,
            }) => {
                for (c, value) in channels.iter_mut().take(self.order.num_channels()).enumerate() {
                    *value = scalar.decode(read_word(&bytes[c * channel_size..], channel_size));
                }
            }
            Some(Layout::Packed { size, fields }) => {
                let word = read_word(bytes, size);
                for (value, field) in channels.iter_mut().zip(fields) {
                    *value = field.scalar.decode(field.extract(word));
                }
            }
            None => {}
        }
        Vec4::from(self.apply_read_map(channels, 0.0, 1.0))
    }

    /// Decode one pixel to raw integer channel values.
    pub fn decode_int(&self, bytes: &[u8]) -> IVec4 {
        let mut channels = [0i32; 4];
        match self.layout() {
            Some(Layout::Plain {
                channel_size,
                scalar,
            }) => {
                for (c, value) in channels.iter_mut().take(self.order.num_channels()).enumerate() {
                    *value = scalar.decode_int(read_word(&bytes[c * channel_size..], channel_size));
                }
            }
            Some(Layout::Packed { size, fields }) => {
                let word = read_word(bytes, size);
                for (value, field) in channels.iter_mut().zip(fields) {
                    *value = field.scalar.decode_int(field.extract(word));
                }
            }
            None => {}
        }
        IVec4::from(self.apply_read_map(channels, 0, 1))
    }

    /// Encode a float color into one pixel.
    pub fn encode(&self, color: &Vec4, bytes: &mut [u8]) {
        let map = self.order.write_map();
        match self.layout() {
            Some(Layout::Plain {
                channel_size,
                scalar,
            }) => {
                for (c, &src) in map.iter().enumerate() {
                    let word = scalar.encode(color[src]);
                    write_word(&mut bytes[c * channel_size..], channel_size, word);
                }
            }
            Some(Layout::Packed { size, fields }) => {
                let word = fields
                    .iter()
                    .zip(map)
                    .fold(0u32, |acc, (f, &src)| acc | f.insert(f.scalar.encode(color[src])));
                write_word(bytes, size, word);
            }
            None => {}
        }
    }

    /// Encode raw integer channel values into one pixel.
    pub fn encode_int(&self, color: &IVec4, bytes: &mut [u8]) {
        let map = self.order.write_map();
        match self.layout() {
            Some(Layout::Plain {
                channel_size,
                scalar,
            }) => {
                for (c, &src) in map.iter().enumerate() {
                    let word = scalar.encode_int(color[src]);
                    write_word(&mut bytes[c * channel_size..], channel_size, word);
                }
            }
            Some(Layout::Packed { size, fields }) => {
                let word = fields
                    .iter()
                    .zip(map)
                    .fold(0u32, |acc, (f, &src)| acc | f.insert(f.scalar.encode_int(color[src])));
                write_word(bytes, size, word);
            }
            None => {}
        }
    }
}
