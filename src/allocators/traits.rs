//! Allocator contract for shared memory segments
//!
//! A `SegmentAllocator` has exclusive authority to construct, free, and
//! convert between raw pointers and segment-relative offsets within its
//! segment. The object-safe core trait carries the raw operations; typed
//! construction and locator conversion live on the blanket extension trait.

use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::{Locator, OffsetPointer};

/// Identifies one allocator (and thereby one segment) process-wide.
///
/// The id is part of every locator's wire shape, so cooperating processes
/// must agree on ids when they map the same segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[repr(transparent)]
pub struct AllocatorId(pub u32);

impl AllocatorId {
    /// Sentinel id carried by null locators
    pub const NULL: AllocatorId = AllocatorId(u32::MAX);

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Construction from a forwarded argument tuple.
///
/// The allocator constructs objects through this trait, so a single
/// `init(args)` call site can serve any constructor arity. `(value,)`
/// builds any type from itself and `()` builds `Default` types; compound
/// types implement their own argument shapes.
pub trait BuildFrom<A>: Sized {
    fn build_from(args: A) -> Self;
}

impl<T> BuildFrom<(T,)> for T {
    fn build_from((value,): (T,)) -> T {
        value
    }
}

impl<T: Default> BuildFrom<()> for T {
    fn build_from(_: ()) -> T {
        T::default()
    }
}

/// A typed, pre-reserved, initially uninitialized slot of segment storage.
///
/// Used when storage for an object is already reserved elsewhere (for
/// example embedded as another structure's header field) and only
/// construction should run.
#[repr(transparent)]
pub struct ShmSlot<T> {
    slot: MaybeUninit<T>,
}

impl<T> ShmSlot<T> {
    /// A slot with uninitialized contents
    pub const fn uninit() -> Self {
        Self {
            slot: MaybeUninit::uninit(),
        }
    }

    pub fn as_ptr(&self) -> *const T {
        self.slot.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.slot.as_mut_ptr()
    }

    /// Write a value into the slot without dropping previous contents
    pub fn write(&mut self, value: T) -> NonNull<T> {
        // NonNull: MaybeUninit storage is never null
        unsafe { NonNull::new_unchecked(self.slot.write(value) as *mut T) }
    }
}

impl<T> Default for ShmSlot<T> {
    fn default() -> Self {
        Self::uninit()
    }
}

impl<T> fmt::Debug for ShmSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShmSlot")
            .field("addr", &self.slot.as_ptr())
            .finish()
    }
}

/// Statistics for allocator monitoring
#[derive(Debug, Clone, Default)]
pub struct AllocatorStats {
    pub total_size: usize,
    pub used_size: usize,
    pub available_size: usize,
    pub allocation_count: u64,
    pub free_count: u64,
}

/// Trait for shared memory segment allocators
pub trait SegmentAllocator: Send + Sync + fmt::Debug {
    /// Get the process-wide identity of this allocator
    fn id(&self) -> AllocatorId;

    /// Allocate memory of the given size and alignment
    fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>>;

    /// Deallocate previously allocated memory
    fn deallocate(&self, ptr: NonNull<u8>, size: usize, align: usize) -> Result<()>;

    /// Get the total size of the allocator's segment span
    fn total_size(&self) -> usize;

    /// Get the amount of used memory
    fn used_size(&self) -> usize;

    /// Get the amount of available memory
    fn available_size(&self) -> usize {
        self.total_size() - self.used_size()
    }

    /// Check if a pointer was allocated by this allocator
    fn owns(&self, ptr: NonNull<u8>) -> bool;

    /// Convert a pointer into its segment-relative offset.
    ///
    /// The pointer must have been produced by this allocator.
    fn offset_of(&self, ptr: NonNull<u8>) -> u64;

    /// Convert a segment-relative offset back into a pointer valid in this
    /// process's mapping.
    ///
    /// The offset must have been produced by [`offset_of`](Self::offset_of)
    /// in some process mapping the same segment.
    fn resolve_offset(&self, off: u64) -> NonNull<u8>;

    /// Reset the allocator (if supported)
    fn reset(&self) -> Result<()>;

    /// Get allocation statistics
    fn stats(&self) -> AllocatorStats;
}

/// Typed allocator operations
pub trait SegmentAllocatorExt: SegmentAllocator {
    /// Allocate memory for a specific type
    fn allocate_for<T>(&self) -> Result<NonNull<T>> {
        let ptr = self.allocate(std::mem::size_of::<T>(), std::mem::align_of::<T>())?;
        Ok(ptr.cast::<T>())
    }

    /// Deallocate memory for a specific type
    fn deallocate_for<T>(&self, ptr: NonNull<T>) -> Result<()> {
        self.deallocate(
            ptr.cast::<u8>(),
            std::mem::size_of::<T>(),
            std::mem::align_of::<T>(),
        )
    }

    /// Allocate storage for exactly one object and construct it with `args`.
    ///
    /// `out` receives the locator of the new object.
    fn allocate_construct<T, A>(&self, out: &mut OffsetPointer, args: A) -> Result<NonNull<T>>
    where
        T: BuildFrom<A>,
    {
        let ptr = self.allocate_for::<T>()?;
        unsafe {
            ptr.as_ptr().write(T::build_from(args));
        }
        *out = OffsetPointer::new(self.id(), self.offset_of(ptr.cast::<u8>()));
        Ok(ptr)
    }

    /// Allocate a contiguous run of `count` objects, constructing each from a
    /// clone of `args`. Returns the pointer to the first object; `out`
    /// receives its locator.
    fn allocate_construct_objects<T, A>(
        &self,
        count: usize,
        out: &mut OffsetPointer,
        args: A,
    ) -> Result<NonNull<T>>
    where
        T: BuildFrom<A>,
        A: Clone,
    {
        let size = std::mem::size_of::<T>() * count;
        let base = self.allocate(size, std::mem::align_of::<T>())?.cast::<T>();
        for i in 0..count {
            unsafe {
                base.as_ptr().add(i).write(T::build_from(args.clone()));
            }
        }
        *out = OffsetPointer::new(self.id(), self.offset_of(base.cast::<u8>()));
        Ok(base)
    }

    /// Construct an object in storage reserved elsewhere; only construction
    /// runs, no allocation.
    fn construct_in<T, A>(&self, slot: &mut ShmSlot<T>, args: A) -> NonNull<T>
    where
        T: BuildFrom<A>,
    {
        slot.write(T::build_from(args))
    }

    /// Run the object's destructor and free its storage
    fn free_ptr<T>(&self, ptr: NonNull<T>) -> Result<()> {
        unsafe {
            std::ptr::drop_in_place(ptr.as_ptr());
        }
        self.deallocate_for(ptr)
    }

    /// Convert a pointer into a locator of the requested shape
    fn convert<T, L>(&self, ptr: NonNull<T>) -> L
    where
        L: Locator<T>,
    {
        L::from_parts(self.id(), self.offset_of(ptr.cast::<u8>()))
    }
}

// Blanket implementation for all segment allocators
impl<A: SegmentAllocator + ?Sized> SegmentAllocatorExt for A {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_id_null() {
        assert!(AllocatorId::NULL.is_null());
        assert!(!AllocatorId(0).is_null());
        assert_eq!(format!("{}", AllocatorId(3)), "3");
    }

    #[test]
    fn test_build_from_blankets() {
        let v: u64 = BuildFrom::build_from((17u64,));
        assert_eq!(v, 17);

        let d: u32 = BuildFrom::build_from(());
        assert_eq!(d, 0);
    }

    #[test]
    fn test_slot_write() {
        let mut slot = ShmSlot::<u32>::uninit();
        let ptr = slot.write(99);
        assert_eq!(unsafe { *ptr.as_ptr() }, 99);
    }

    #[test]
    fn test_counted_allocate_construct() {
        use crate::allocators::bump::BumpAllocator;

        let memory = Box::leak(vec![0u8; 256].into_boxed_slice());
        let alloc = BumpAllocator::new(AllocatorId(5), memory).unwrap();

        let mut loc = OffsetPointer::null();
        let base = alloc
            .allocate_construct_objects::<u64, _>(3, &mut loc, (4u64,))
            .unwrap();
        for i in 0..3 {
            assert_eq!(unsafe { *base.as_ptr().add(i) }, 4);
        }
        assert_eq!(loc.alloc_id, AllocatorId(5));
        assert_eq!(alloc.offset_of(base.cast()), loc.off);
    }
}
