//! Buffer content verification.
//!
//! Bytes are written into a context buffer through one of several
//! pathways ([`BufferWriter`]) and read back through another
//! ([`BufferVerifier`]), then compared against a CPU-side
//! [`ReferenceBuffer`].

mod case;
mod reference;
mod verifier;
mod writer;

use std::fmt::Write as _;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

pub use case::BufferCase;
pub use reference::ReferenceBuffer;
pub use verifier::{
    compute_indices, compute_positions, render_quad_grid_reference, BufferVerifier, VerifyReport,
    VerifyType,
};
pub use writer::{BufferWriter, WriteType};

/// Edge length in pixels of one verification quad.
pub const VERIFY_QUAD_SIZE: u32 = 8;
/// Lines drawn per index-array verification batch.
pub const MAX_LINES_PER_INDEX_ARRAY_DRAW: usize = 128;
pub const INDEX_ARRAY_DRAW_VIEWPORT_WIDTH: u32 = 128;
pub const INDEX_ARRAY_DRAW_VIEWPORT_HEIGHT: u32 = 128;

const MAX_SPAN_LEN: usize = 8;
const MAX_DIFF_SPANS: usize = 4;

/// End of the segment `offset..offset + len`.
pub(crate) fn segment_end(offset: usize, len: usize) -> Result<usize> {
    offset.checked_add(len).ok_or_else(|| {
        Error::PreconditionViolation(format!("Segment {offset}+{len} overflows the address range"))
    })
}

/// Fill `bytes` with a deterministic pseudo-random sequence.
pub fn fill_with_random_bytes(bytes: &mut [u8], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    rng.fill(bytes);
}

/// Result of [`compare_byte_arrays`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteCompareReport {
    pub passed: bool,
    /// Human-readable log of the first differing spans.
    pub text: String,
    /// Every differing span as `(offset, len)`.
    pub spans: Vec<(usize, usize)>,
}

fn format_hex(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{b:02x}")).collect();
    format!("{{{}}}", items.join(", "))
}

/// Compare `result` against `reference` byte by byte.
///
/// Bytes past the end of the shorter slice count as different.
pub fn compare_byte_arrays(result: &[u8], reference: &[u8]) -> ByteCompareReport {
    let len = result.len().max(reference.len());
    let differs = |i: usize| result.get(i) != reference.get(i);

    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for i in 0..len {
        match (differs(i), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, i - s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, len - s));
    }

    let mut text = String::from("Verification result: ");
    for &(offset, span_len) in spans.iter().take(MAX_DIFF_SPANS) {
        let end = offset + span_len.min(MAX_SPAN_LEN);
        let slice = |data: &[u8]| data[offset.min(data.len())..end.min(data.len())].to_vec();
        let _ = writeln!(
            text,
            "{span_len} byte difference at offset {offset}\n  expected {}\n  got {}",
            format_hex(&slice(reference)),
            format_hex(&slice(result))
        );
    }
    if spans.len() > MAX_DIFF_SPANS {
        text.push_str("(output too long, truncated)\n");
    }

    let passed = spans.is_empty();
    text.push_str(if passed {
        "Verification passed."
    } else {
        "Verification FAILED!"
    });

    ByteCompareReport {
        passed,
        text,
        spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_deterministic() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        fill_with_random_bytes(&mut a, 42);
        fill_with_random_bytes(&mut b, 42);
        assert_eq!(a, b);
        fill_with_random_bytes(&mut b, 43);
        assert_ne!(a, b);
    }

    #[test]
    fn identical_arrays_pass() {
        let mut data = [0u8; 32];
        fill_with_random_bytes(&mut data, 1);
        let report = compare_byte_arrays(&data, &data);
        assert!(report.passed);
        assert!(report.spans.is_empty());
        assert_eq!(report.text, "Verification result: Verification passed.");
    }

    #[test]
    fn single_byte_change_is_reported() {
        let reference = [0u8; 16];
        let mut result = reference;
        result[5] = 0xab;
        let report = compare_byte_arrays(&result, &reference);
        assert!(!report.passed);
        assert_eq!(report.spans, vec![(5, 1)]);
        assert!(report.text.contains("1 byte difference at offset 5"));
        assert!(report.text.contains("expected {0x00}"));
        assert!(report.text.contains("got {0xab}"));
        assert!(report.text.ends_with("Verification FAILED!"));
    }

    #[test]
    fn long_spans_print_eight_bytes() {
        let reference = [0u8; 20];
        let result = [1u8; 20];
        let report = compare_byte_arrays(&result, &reference);
        assert_eq!(report.spans, vec![(0, 20)]);
        assert!(report.text.contains("20 byte difference at offset 0"));
        assert!(report.text.contains(&format!("got {}", format_hex(&[1u8; 8]))));
    }

    #[test]
    fn output_is_truncated_after_four_spans() {
        let reference = [0u8; 12];
        let mut result = reference;
        for i in (0..12).step_by(2) {
            result[i] = 1;
        }
        let report = compare_byte_arrays(&result, &reference);
        assert_eq!(report.spans.len(), 6);
        assert_eq!(report.text.matches("byte difference").count(), 4);
        assert!(report.text.contains("(output too long, truncated)"));
    }

    #[test]
    fn length_mismatch_fails() {
        let report = compare_byte_arrays(&[1, 2, 3], &[1, 2]);
        assert!(!report.passed);
        assert_eq!(report.spans, vec![(2, 1)]);
    }
}
