//! Integration tests for the embedded backend over a self-describing type

use std::ptr::NonNull;
use std::sync::Arc;

use shmptr::{
    make_ptr, shm_storable, AllocatorId, AllocatorRegistry, BuildFrom, Locator, Mptr,
    OffsetPointer, PoolAllocator, ResolveCtx, SegmentAllocator, SegmentAllocatorExt, ShmObject,
    Uptr,
};

/// Header kept in segment storage
struct CounterHeader {
    count: u64,
    owned: bool,
}

/// A self-describing counter: all state lives behind a segment header, so
/// the type serializes itself and manages its own destruction.
struct ShmCounter {
    hdr: NonNull<CounterHeader>,
    alloc: Arc<dyn SegmentAllocator>,
}

impl ShmCounter {
    fn count(&self) -> u64 {
        unsafe { (*self.hdr.as_ptr()).count }
    }

    fn increment(&mut self) {
        unsafe {
            (*self.hdr.as_ptr()).count += 1;
        }
    }
}

impl BuildFrom<(Arc<dyn SegmentAllocator>, u64)> for ShmCounter {
    fn build_from((alloc, count): (Arc<dyn SegmentAllocator>, u64)) -> Self {
        let mut loc = OffsetPointer::null();
        let hdr = alloc
            .allocate_construct::<CounterHeader, _>(
                &mut loc,
                (CounterHeader {
                    count,
                    owned: false,
                },),
            )
            .expect("segment has room for a counter header");
        Self { hdr, alloc }
    }
}

impl ShmObject for ShmCounter {
    type Header = CounterHeader;

    fn shm_serialize<L: Locator<Self>>(&self, out: &mut L) {
        out.store(self.alloc.id(), self.alloc.offset_of(self.hdr.cast()));
    }

    fn shm_deserialize(ctx: ResolveCtx<CounterHeader>) -> Self {
        let (hdr, alloc) = ctx.into_parts();
        Self { hdr, alloc }
    }

    fn resolve_ctx(&self) -> ResolveCtx<CounterHeader> {
        ResolveCtx::new(self.hdr, self.alloc.clone())
    }

    fn set_header_owned(&mut self, owned: bool) {
        unsafe {
            (*self.hdr.as_ptr()).owned = owned;
        }
    }

    fn shm_destroy(&mut self) {
        let owned = unsafe { (*self.hdr.as_ptr()).owned };
        if owned {
            self.alloc
                .free_ptr(self.hdr)
                .expect("header allocated by this allocator");
        }
    }
}

shm_storable!(ShmCounter);

fn pool(id: u32) -> Arc<dyn SegmentAllocator> {
    let memory = Box::leak(vec![0u8; 4096].into_boxed_slice());
    Arc::new(PoolAllocator::new(AllocatorId(id), memory, 64).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_owner_lifecycle() {
        let alloc = pool(20);
        {
            let owner: Uptr<ShmCounter> =
                make_ptr::<ShmCounter, _, true, true>((alloc.clone(), 5u64)).unwrap();
            assert_eq!(owner.count(), 5);
            assert!(owner.is_owner());
        }
        // Auto-destroy set the owned bit and freed the header exactly once
        let stats = alloc.stats();
        assert_eq!(stats.allocation_count, 1);
        assert_eq!(stats.free_count, 1);
    }

    #[test]
    fn test_embedded_round_trip_through_locator() {
        let alloc = pool(21);
        let registry = AllocatorRegistry::new();
        registry.register(alloc.clone()).unwrap();

        let mut owner: Uptr<ShmCounter> =
            make_ptr::<ShmCounter, _, true, true>((alloc.clone(), 10u64)).unwrap();
        owner.increment();

        let locator = owner.to_typed();
        assert_eq!(locator.alloc_id(), AllocatorId(21));

        // A rebuilt wrapper aliases the same header
        let alias = Mptr::<ShmCounter>::from_typed_in(&registry, &locator).unwrap();
        assert_eq!(alias.count(), 11);
        assert!(!alias.is_owner());

        // Mutations are visible through every wrapper of the same header
        let mut alias = alias;
        alias.increment();
        assert_eq!(owner.count(), 12);
    }

    #[test]
    fn test_embedded_strong_copy_goes_through_serialize_form() {
        let alloc = pool(22);
        let owner: Uptr<ShmCounter> =
            make_ptr::<ShmCounter, _, true, true>((alloc.clone(), 3u64)).unwrap();

        let copy = owner.clone();
        // The copy re-deserialized from the source's own serialize form and
        // lands on the same header
        assert_eq!(copy.count(), 3);
        assert_eq!(
            unsafe { (*owner.get()).hdr },
            unsafe { (*copy.get()).hdr }
        );

        // Ownership was copied verbatim; relinquish one copy
        assert!(copy.is_owner());
        std::mem::forget(copy);
        drop(owner);
        assert_eq!(alloc.stats().free_count, 1);
    }

    #[test]
    fn test_embedded_view_never_destroys() {
        let alloc = pool(23);
        let owner: Uptr<ShmCounter> =
            make_ptr::<ShmCounter, _, true, true>((alloc.clone(), 1u64)).unwrap();

        let mut obj = ShmCounter::shm_deserialize(owner.resolve_ctx());
        let mut view = shmptr::ShmRef::<ShmCounter>::from_object(&mut obj);
        assert_eq!(view.count(), 1);

        // Non-destructible destroy unsets the owned bit and frees nothing
        view.destroy();
        assert_eq!(alloc.stats().free_count, 0);
        assert_eq!(owner.count(), 1);
    }
}
