//! # shmptr - Dual-Mode Smart Pointers for Shared Memory
//!
//! shmptr lets data structures living inside a shared memory segment be
//! referenced, copied, serialized into position-independent locators, and
//! reconstructed by cooperating processes that map the same segment at
//! different virtual base addresses.
//!
//! ## Features
//!
//! - **Position-independent locators**: `(AllocatorId, offset)` pairs valid
//!   across process boundaries, in plain and atomically-updatable shapes
//! - **Two storage backends**: embedded-in-place for self-describing types,
//!   externally-allocated for plain types, chosen per type at compile time
//! - **Ownership flavors**: exclusive owner, manual pointer, aliasing
//!   reference over one wrapper type
//! - **Pluggable allocators**: bump and pool allocators over file-backed or
//!   memfd segments, behind a process-wide registry
//! - **Zero-overhead**: no reference counting, no runtime backend branch,
//!   no null checks in release builds
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              SmartPtr<T, U, D>                  │
//! │   Uptr (owns) │ Mptr (manual) │ ShmRef (view)   │
//! ├─────────────────────────────────────────────────┤
//! │  EmbeddedRef<T>          │  ExternalRef<T>      │
//! │  (self-describing types) │  (plain types)       │
//! └─────────────────────────────────────────────────┘
//!           │                         │
//!           ▼                         ▼
//! ┌─────────────────┐    ┌─────────────────────────┐
//! │ Locator layer   │    │  SegmentAllocator       │
//! │ TypedPointer    │◄───│  bump / pool + registry │
//! │ AtomicPointer   │    │  over SharedSegment     │
//! └─────────────────┘    └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shmptr::{
//!     global_registry, make_uptr, AllocatorId, Mptr, PoolAllocator, SegmentConfig,
//!     SharedSegment,
//! };
//!
//! # fn main() -> shmptr::Result<()> {
//! let segment = Arc::new(SharedSegment::new(SegmentConfig::new("demo", 1 << 20))?);
//! let alloc = Arc::new(PoolAllocator::for_segment(AllocatorId(1), segment, 64)?);
//! global_registry().register_default(alloc)?;
//!
//! // Exclusive owner over a boxed value; freed exactly once at end of scope
//! let owner = make_uptr::<u64, _>((5u64,))?;
//! assert_eq!(*owner, 5);
//!
//! // Hand the locator to a cooperating process; it rebuilds a manual pointer
//! let locator = owner.to_typed();
//! let alias = Mptr::<u64>::from_typed(&locator)?;
//! assert_eq!(*alias, 5);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod allocators;
pub mod error;
pub mod locator;
pub mod memory;
pub mod ptr;

// Main API re-exports
pub use allocators::{
    global_registry, AllocatorId, AllocatorRegistry, AllocatorStats, BuildFrom, BumpAllocator,
    PoolAllocator, SegmentAllocator, SegmentAllocatorExt, ShmSlot,
};
pub use error::{Result, ShmPtrError};
pub use locator::{Locator, OffsetPointer, ResolveCtx, TypedAtomicPointer, TypedPointer};
pub use memory::{BackingType, SegmentConfig, SegmentMemoryStats, SharedSegment};
pub use ptr::{
    make_mptr, make_mptr_in, make_piecewise, make_ptr, make_ref, make_ref_piecewise, make_uptr,
    make_uptr_in, EmbeddedRef, ExternalRef, MergeArgs, Mptr, PtrBackend, ShmObject, ShmRef,
    SmartPtr, Storable, Uptr,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    /// Default alignment for segment allocations
    pub const DEFAULT_ALIGNMENT: usize = 64;

    /// Default block size for pool allocators
    pub const DEFAULT_BLOCK_SIZE: usize = 64;
}
