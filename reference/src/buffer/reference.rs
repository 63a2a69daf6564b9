use crate::error::{ensure, Result};

/// CPU-side copy of the expected buffer contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceBuffer {
    data: Vec<u8>,
}

impl ReferenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `num_bytes` zeroed bytes.
    pub fn set_size(&mut self, num_bytes: usize) {
        self.data = vec![0; num_bytes];
    }

    /// Replace the contents with `bytes`.
    pub fn set_data(&mut self, bytes: &[u8]) {
        self.data = bytes.to_vec();
    }

    /// Overwrite `bytes.len()` bytes at `offset`. The range must lie
    /// within the buffer.
    pub fn set_sub_data(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let size = self.data.len();
        let end = offset.checked_add(bytes.len());
        ensure(offset <= size && end.is_some_and(|end| end <= size), || {
            format!(
                "Parameters not in buffer bounds or range: offset {offset}, {} bytes, buffer of {size}",
                bytes.len()
            )
        })?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from `offset` to the end; empty past the end.
    pub fn as_slice_from(&self, offset: usize) -> &[u8] {
        self.data.get(offset..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn sub_data_is_bounds_checked() {
        let mut buf = ReferenceBuffer::new();
        buf.set_size(8);
        buf.set_sub_data(6, &[1, 2]).unwrap();
        assert_eq!(buf.as_slice_from(6), &[1, 2]);
        let err = buf.set_sub_data(7, &[1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert!(buf.set_sub_data(usize::MAX, &[1]).is_err());
        assert!(buf.as_slice_from(20).is_empty());
    }

    #[test]
    fn set_data_replaces_contents() {
        let mut buf = ReferenceBuffer::new();
        buf.set_data(&[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        buf.set_size(2);
        assert_eq!(buf.as_slice(), &[0, 0]);
    }
}
