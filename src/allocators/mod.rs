//! Segment allocators: contract, implementations, and the process-wide registry

pub mod bump;
pub mod pool;
pub mod registry;
pub mod traits;

pub use bump::BumpAllocator;
pub use pool::PoolAllocator;
pub use registry::{global_registry, AllocatorRegistry};
pub use traits::{
    AllocatorId, AllocatorStats, BuildFrom, SegmentAllocator, SegmentAllocatorExt, ShmSlot,
};
