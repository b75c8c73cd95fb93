//! Resolution context bridging locators and live wrappers

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::allocators::{AllocatorId, AllocatorRegistry, SegmentAllocator};
use crate::error::{Result, ShmPtrError};

/// Ephemeral product of resolving a locator: the pointer as mapped in this
/// process, plus the allocator that owns it.
///
/// A context is consumed exactly once, by value, to materialize a live
/// wrapper; nothing retains it afterwards.
pub struct ResolveCtx<P> {
    ptr: NonNull<P>,
    alloc: Arc<dyn SegmentAllocator>,
}

impl<P> ResolveCtx<P> {
    /// Build a context from already-resolved parts
    pub fn new(ptr: NonNull<P>, alloc: Arc<dyn SegmentAllocator>) -> Self {
        Self { ptr, alloc }
    }

    /// Resolve an `(id, offset)` locator against a registry
    pub fn resolve(registry: &AllocatorRegistry, id: AllocatorId, off: u64) -> Result<Self> {
        if off == crate::locator::NULL_OFFSET {
            return Err(ShmPtrError::null_locator(id.0));
        }
        let alloc = registry.get(id)?;
        let ptr = alloc.resolve_offset(off).cast::<P>();
        Ok(Self { ptr, alloc })
    }

    /// The resolved pointer
    pub fn ptr(&self) -> NonNull<P> {
        self.ptr
    }

    /// The allocator owning the pointee
    pub fn allocator(&self) -> &Arc<dyn SegmentAllocator> {
        &self.alloc
    }

    /// Consume the context
    pub fn into_parts(self) -> (NonNull<P>, Arc<dyn SegmentAllocator>) {
        (self.ptr, self.alloc)
    }
}

impl<P> fmt::Debug for ResolveCtx<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveCtx")
            .field("ptr", &self.ptr)
            .field("alloc_id", &self.alloc.id())
            .finish()
    }
}
