//! External backend: the element is allocated through a segment allocator

use std::ptr::NonNull;
use std::sync::Arc;

use crate::allocators::{
    global_registry, BuildFrom, SegmentAllocator, SegmentAllocatorExt, ShmSlot,
};
use crate::error::Result;
use crate::locator::{Locator, OffsetPointer, ResolveCtx};

use super::backend::{sealed, PtrBackend};

/// Pointer-plus-allocator backend for plain element types.
///
/// Copies alias: duplicating this backend duplicates the (pointer,
/// allocator) pair, never the pointee.
pub struct ExternalRef<T> {
    obj: *mut T,
    alloc: Option<Arc<dyn SegmentAllocator>>,
}

impl<T> ExternalRef<T> {
    /// Allocate storage for one element from `alloc` and construct it
    pub fn init_in<A>(&mut self, alloc: Arc<dyn SegmentAllocator>, args: A) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        let mut loc = OffsetPointer::null();
        let ptr = alloc.allocate_construct::<T, A>(&mut loc, args)?;
        self.obj = ptr.as_ptr();
        self.alloc = Some(alloc);
        Ok(())
    }

    /// Construct the element in storage reserved elsewhere; only
    /// construction runs
    pub fn init_in_slot<A>(
        &mut self,
        slot: &mut ShmSlot<T>,
        alloc: Arc<dyn SegmentAllocator>,
        args: A,
    ) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        let ptr = alloc.construct_in(slot, args);
        self.obj = ptr.as_ptr();
        self.alloc = Some(alloc);
        Ok(())
    }

    /// The allocator owning the pointee, when known
    pub fn allocator(&self) -> Option<&Arc<dyn SegmentAllocator>> {
        self.alloc.as_ref()
    }
}

impl<T> sealed::Sealed for ExternalRef<T> {}

impl<T> PtrBackend<T> for ExternalRef<T> {
    type Target = T;

    fn uninit() -> Self {
        Self {
            obj: std::ptr::null_mut(),
            alloc: None,
        }
    }

    fn init<A>(&mut self, args: A) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        let alloc = global_registry().default_allocator()?;
        self.init_in(alloc, args)
    }

    fn as_ptr(&self) -> *mut T {
        self.obj
    }

    fn strong_copy(&mut self, other: &Self) {
        self.obj = other.obj;
        self.alloc = other.alloc.clone();
    }

    fn serialize<L: Locator<T>>(&self, out: &mut L) {
        debug_assert!(
            self.alloc.is_some(),
            "serialize on a wrapper whose allocator is unset (deserialized from a live object?)"
        );
        if let (Some(alloc), Some(ptr)) = (&self.alloc, NonNull::new(self.obj)) {
            out.store(alloc.id(), alloc.offset_of(ptr.cast::<u8>()));
        }
    }

    fn deserialize(&mut self, ctx: ResolveCtx<T>) {
        let (ptr, alloc) = ctx.into_parts();
        self.obj = ptr.as_ptr();
        self.alloc = Some(alloc);
    }

    fn deserialize_obj(&mut self, obj: &mut T) {
        self.obj = obj as *mut T;
        // The allocator is unknown in this mode; destroy and serialize are
        // invalid on this wrapper
        self.alloc = None;
    }

    fn destroy(&mut self, destruct: bool) {
        if !destruct {
            return;
        }
        let Some(ptr) = NonNull::new(self.obj) else {
            return;
        };
        debug_assert!(
            self.alloc.is_some(),
            "destroy on a wrapper whose allocator is unset (deserialized from a live object?)"
        );
        if let Some(alloc) = &self.alloc {
            if let Err(err) = alloc.free_ptr(ptr) {
                tracing::warn!(error = %err, "failed to free pointee during destroy");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::{AllocatorId, PoolAllocator, ShmSlot};
    use crate::locator::TypedPointer;

    fn pool(id: u32) -> Arc<dyn SegmentAllocator> {
        let memory = Box::leak(vec![0u8; 1024].into_boxed_slice());
        Arc::new(PoolAllocator::new(AllocatorId(id), memory, 64).unwrap())
    }

    #[test]
    fn test_init_in_and_serialize() {
        let alloc = pool(60);
        let mut backend = ExternalRef::<u64>::uninit();
        backend.init_in(alloc.clone(), (21u64,)).unwrap();

        assert_eq!(unsafe { *backend.as_ptr() }, 21);

        let mut loc = TypedPointer::<u64>::null();
        backend.serialize(&mut loc);
        assert_eq!(loc.alloc_id(), AllocatorId(60));
        assert_eq!(
            alloc.resolve_offset(loc.offset()).as_ptr() as *mut u64,
            backend.as_ptr()
        );
    }

    #[test]
    fn test_strong_copy_is_aliasing() {
        let alloc = pool(61);
        let mut a = ExternalRef::<u64>::uninit();
        a.init_in(alloc, (3u64,)).unwrap();

        let mut b = ExternalRef::<u64>::uninit();
        b.strong_copy(&a);
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_destroy_frees_once() {
        let alloc = pool(62);
        let mut backend = ExternalRef::<u64>::uninit();
        backend.init_in(alloc.clone(), (9u64,)).unwrap();

        backend.destroy(false);
        assert_eq!(alloc.stats().free_count, 0);

        backend.destroy(true);
        assert_eq!(alloc.stats().free_count, 1);
    }

    #[test]
    fn test_uninit_destroy_is_noop() {
        let mut backend = ExternalRef::<u64>::uninit();
        backend.destroy(true);
    }

    #[test]
    fn test_init_in_slot() {
        let alloc = pool(63);
        let mut slot = ShmSlot::<u64>::uninit();
        let mut backend = ExternalRef::<u64>::uninit();
        backend.init_in_slot(&mut slot, alloc.clone(), (77u64,)).unwrap();

        assert_eq!(unsafe { *backend.as_ptr() }, 77);
        assert_eq!(backend.as_ptr(), slot.as_mut_ptr());
        // Slot storage was reserved elsewhere; nothing was allocated
        assert_eq!(alloc.stats().allocation_count, 0);
    }
}
