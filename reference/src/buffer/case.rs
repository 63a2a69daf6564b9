use std::collections::BTreeSet;

use crate::backend::{BufferHandle, RenderContext};
use crate::error::{Error, Result};

/// Tracks the buffers a test case allocates so they can be released on
/// deinit, whatever state the case ended in.
#[derive(Debug, Default)]
pub struct BufferCase {
    allocated: BTreeSet<BufferHandle>,
}

impl BufferCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer and start tracking it.
    pub fn gen_buffer(&mut self, ctx: &mut dyn RenderContext) -> Result<BufferHandle> {
        let buffer = ctx
            .create_buffer()
            .map_err(|err| Error::ResourceError(format!("Failed to create buffer: {}", err.message())))?;
        log::trace!("BufferCase: allocated buffer {}", buffer.raw());
        self.allocated.insert(buffer);
        Ok(buffer)
    }

    /// Delete a tracked buffer.
    pub fn delete_buffer(&mut self, ctx: &mut dyn RenderContext, buffer: BufferHandle) {
        ctx.delete_buffer(buffer);
        self.allocated.remove(&buffer);
    }

    /// Delete every buffer still tracked.
    pub fn deinit(&mut self, ctx: &mut dyn RenderContext) {
        if !self.allocated.is_empty() {
            log::debug!("BufferCase: releasing {} buffers", self.allocated.len());
        }
        for buffer in std::mem::take(&mut self.allocated) {
            ctx.delete_buffer(buffer);
        }
    }

    /// Fail with [`Error::ResourceError`] if the context has a pending error.
    pub fn check_error(&self, ctx: &mut dyn RenderContext) -> Result<()> {
        match ctx.take_error() {
            Some(err) => Err(Error::ResourceError(format!("Got {err}"))),
            None => Ok(()),
        }
    }

    pub fn num_allocated(&self) -> usize {
        self.allocated.len()
    }

    pub fn is_tracked(&self, buffer: BufferHandle) -> bool {
        self.allocated.contains(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareContext;
    use crate::error::ErrorKind;

    #[test]
    fn deinit_releases_everything() {
        let mut ctx = SoftwareContext::new(4, 4).unwrap();
        let mut case = BufferCase::new();
        let a = case.gen_buffer(&mut ctx).unwrap();
        let b = case.gen_buffer(&mut ctx).unwrap();
        case.delete_buffer(&mut ctx, a);
        assert!(!case.is_tracked(a));
        assert!(case.is_tracked(b));
        case.deinit(&mut ctx);
        assert_eq!(case.num_allocated(), 0);
        assert_eq!(ctx.num_buffers(), 0);
    }

    #[test]
    fn allocation_failure_is_a_resource_error() {
        let mut ctx = SoftwareContext::new(4, 4).unwrap().with_buffer_limit(0);
        let mut case = BufferCase::new();
        let err = case.gen_buffer(&mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceError);
        let err = case.check_error(&mut ctx).unwrap_err();
        assert_eq!(err.message(), "Got GL_OUT_OF_MEMORY");
        assert!(case.check_error(&mut ctx).is_ok());
    }
}
