//! Position-independent pointer shapes
//!
//! A locator is an `(AllocatorId, segment-relative offset)` pair. It stays
//! valid across processes that map the same segment at different base
//! addresses, which ordinary pointers do not. All shapes are `#[repr(C)]`
//! so a byte-for-byte copy through the segment is a valid locator in the
//! receiving process.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::allocators::AllocatorId;

/// Offset value carried by null locators
pub const NULL_OFFSET: u64 = u64::MAX;

/// Shared surface of the typed locator shapes.
///
/// Backends serialize through this trait so callers choose the shape (plain
/// or atomically updatable) that their surrounding structure needs.
pub trait Locator<T> {
    /// Build a locator from an allocator id and offset
    fn from_parts(id: AllocatorId, off: u64) -> Self
    where
        Self: Sized;

    /// Overwrite this locator with an allocator id and offset
    fn store(&mut self, id: AllocatorId, off: u64);

    /// Read the (allocator id, offset) pair
    fn load(&self) -> (AllocatorId, u64);

    /// Whether this locator refers to nothing
    fn is_null(&self) -> bool {
        self.load().1 == NULL_OFFSET
    }
}

/// Untyped locator: allocator id plus segment-relative offset.
///
/// This is the wire shape; move it between processes by copying its bytes
/// through the segment or by serde/bincode through any byte channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetPointer {
    /// Id of the allocator whose segment holds the pointee
    pub alloc_id: AllocatorId,
    /// Offset of the pointee from the allocator's base
    pub off: u64,
}

impl OffsetPointer {
    /// The null locator
    pub const fn null() -> Self {
        Self {
            alloc_id: AllocatorId::NULL,
            off: NULL_OFFSET,
        }
    }

    pub const fn new(alloc_id: AllocatorId, off: u64) -> Self {
        Self { alloc_id, off }
    }

    pub fn is_null(&self) -> bool {
        self.off == NULL_OFFSET
    }
}

impl Default for OffsetPointer {
    fn default() -> Self {
        Self::null()
    }
}

/// Typed locator for `T`.
///
/// Identical wire shape to [`OffsetPointer`]; the type parameter only pins
/// what the offset resolves to.
#[repr(C)]
pub struct TypedPointer<T> {
    raw: OffsetPointer,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedPointer<T> {
    /// The null locator
    pub const fn null() -> Self {
        Self {
            raw: OffsetPointer::null(),
            _marker: PhantomData,
        }
    }

    /// Adopt an untyped locator
    pub const fn from_offset(raw: OffsetPointer) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Strip the type, keeping the wire shape
    pub const fn untyped(&self) -> OffsetPointer {
        self.raw
    }

    pub fn alloc_id(&self) -> AllocatorId {
        self.raw.alloc_id
    }

    pub fn offset(&self) -> u64 {
        self.raw.off
    }
}

impl<T> Locator<T> for TypedPointer<T> {
    fn from_parts(id: AllocatorId, off: u64) -> Self {
        Self::from_offset(OffsetPointer::new(id, off))
    }

    fn store(&mut self, id: AllocatorId, off: u64) {
        self.raw = OffsetPointer::new(id, off);
    }

    fn load(&self) -> (AllocatorId, u64) {
        (self.raw.alloc_id, self.raw.off)
    }
}

impl<T> Clone for TypedPointer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedPointer<T> {}

impl<T> Default for TypedPointer<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> PartialEq for TypedPointer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for TypedPointer<T> {}

impl<T> fmt::Debug for TypedPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPointer")
            .field("alloc_id", &self.raw.alloc_id)
            .field("off", &self.raw.off)
            .finish()
    }
}

/// Typed locator whose offset supports atomic, lock-free updates.
///
/// Field semantics match [`TypedPointer`]; the offset is an `AtomicU64` so
/// an enclosing structure can relocate the pointee concurrently. The
/// allocator id is not atomic: all objects reachable through one atomic
/// locator must live in the same allocator's segment.
#[repr(C)]
pub struct TypedAtomicPointer<T> {
    alloc_id: AllocatorId,
    off: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedAtomicPointer<T> {
    /// The null locator
    pub fn null() -> Self {
        Self {
            alloc_id: AllocatorId::NULL,
            off: AtomicU64::new(NULL_OFFSET),
            _marker: PhantomData,
        }
    }

    pub fn alloc_id(&self) -> AllocatorId {
        self.alloc_id
    }

    /// Atomically read the offset
    pub fn offset(&self) -> u64 {
        self.off.load(Ordering::Acquire)
    }

    /// Atomically publish a new offset
    pub fn set_offset(&self, off: u64) {
        self.off.store(off, Ordering::Release);
    }

    /// Atomically swap in a new offset if the current one matches
    pub fn compare_exchange_offset(&self, current: u64, new: u64) -> std::result::Result<u64, u64> {
        self.off
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Snapshot into a plain typed locator
    pub fn to_typed(&self) -> TypedPointer<T> {
        TypedPointer::from_parts(self.alloc_id, self.offset())
    }
}

impl<T> Locator<T> for TypedAtomicPointer<T> {
    fn from_parts(id: AllocatorId, off: u64) -> Self {
        Self {
            alloc_id: id,
            off: AtomicU64::new(off),
            _marker: PhantomData,
        }
    }

    fn store(&mut self, id: AllocatorId, off: u64) {
        self.alloc_id = id;
        self.off.store(off, Ordering::Release);
    }

    fn load(&self) -> (AllocatorId, u64) {
        (self.alloc_id, self.off.load(Ordering::Acquire))
    }
}

impl<T> Default for TypedAtomicPointer<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for TypedAtomicPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAtomicPointer")
            .field("alloc_id", &self.alloc_id)
            .field("off", &self.offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_pointer_null() {
        let p = OffsetPointer::null();
        assert!(p.is_null());
        assert!(p.alloc_id.is_null());

        let q = OffsetPointer::new(AllocatorId(4), 128);
        assert!(!q.is_null());
        assert_eq!(q.off, 128);
    }

    #[test]
    fn test_typed_pointer_round_trip() {
        let p: TypedPointer<u64> = TypedPointer::from_parts(AllocatorId(1), 64);
        let (id, off) = p.load();
        assert_eq!(id, AllocatorId(1));
        assert_eq!(off, 64);

        let untyped = p.untyped();
        let q: TypedPointer<u64> = TypedPointer::from_offset(untyped);
        assert_eq!(p, q);
    }

    #[test]
    fn test_atomic_pointer_updates() {
        let p: TypedAtomicPointer<u32> = TypedAtomicPointer::from_parts(AllocatorId(2), 8);
        assert_eq!(p.offset(), 8);

        p.set_offset(24);
        assert_eq!(p.offset(), 24);

        assert!(p.compare_exchange_offset(24, 40).is_ok());
        assert!(p.compare_exchange_offset(24, 56).is_err());
        assert_eq!(p.offset(), 40);

        let snap = p.to_typed();
        assert_eq!(snap.load(), (AllocatorId(2), 40));
    }

    #[test]
    fn test_bincode_wire_shape() {
        let p = OffsetPointer::new(AllocatorId(9), 4096);
        let bytes = bincode::serialize(&p).unwrap();
        let q: OffsetPointer = bincode::deserialize(&bytes).unwrap();
        assert_eq!(p, q);
    }
}
