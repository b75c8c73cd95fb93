//! Integration tests for the process-wide registry and factory helpers

use std::sync::{Arc, OnceLock};

use shmptr::{
    global_registry, make_mptr, make_piecewise, make_ref, make_ref_piecewise, make_uptr,
    plain_storable, AllocatorId, BuildFrom, PoolAllocator, SegmentAllocator,
};

/// One default allocator per test process, registered exactly once before
/// first use and never swapped while tests run.
fn ensure_default() -> Arc<dyn SegmentAllocator> {
    static DEFAULT: OnceLock<Arc<dyn SegmentAllocator>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let memory = Box::leak(vec![0u8; 64 * 1024].into_boxed_slice());
            let alloc: Arc<dyn SegmentAllocator> =
                Arc::new(PoolAllocator::new(AllocatorId(100), memory, 64).unwrap());
            global_registry().register_default(alloc.clone()).unwrap();
            alloc
        })
        .clone()
}

/// Compound element composed from two argument groups
struct Entry {
    key: u32,
    name: String,
}

impl BuildFrom<(u32, String)> for Entry {
    fn build_from((key, name): (u32, String)) -> Self {
        Self { key, name }
    }
}

plain_storable!(Entry);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allocator_resolution() {
        ensure_default();
        let alloc = global_registry().default_allocator().unwrap();
        assert_eq!(alloc.id(), AllocatorId(100));
        assert!(global_registry().contains(AllocatorId(100)));
    }

    #[test]
    fn test_make_uptr_uses_default_allocator() {
        ensure_default();
        let owner = make_uptr::<u64, _>((5u64,)).unwrap();
        assert_eq!(*owner, 5);
        assert!(owner.is_owner());
    }

    #[test]
    fn test_make_mptr_and_ref_flavors() {
        ensure_default();

        let manual = make_mptr::<u32, _>((8u32,)).unwrap();
        assert_eq!(*manual, 8);
        assert!(!manual.is_owner());

        let view = make_ref::<u32, _>((9u32,)).unwrap();
        assert_eq!(*view, 9);
        assert!(!view.is_owner());
    }

    #[test]
    fn test_piecewise_construction() {
        ensure_default();

        // Key args and value args stay separate until the single
        // constructor call
        let entry = make_ref_piecewise::<Entry, _, _>((7u32,), ("segment".to_string(),)).unwrap();
        assert_eq!(entry.key, 7);
        assert_eq!(entry.name, "segment");

        let owned =
            make_piecewise::<Entry, _, _, true, true>((1u32,), ("owned".to_string(),)).unwrap();
        assert_eq!(owned.key, 1);
        assert!(owned.is_owner());
    }

    #[test]
    fn test_default_construction_via_unit_args() {
        ensure_default();
        let zero = make_uptr::<u64, _>(()).unwrap();
        assert_eq!(*zero, 0);
    }
}
