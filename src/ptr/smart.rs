//! Owning/non-owning wrapper over a storage backend
//!
//! `SmartPtr` carries the lifecycle policy: whether the wrapper is exclusive
//! (auto-destroys at end of scope while it still owns) and whether destroy
//! may free at all. The storage strategy itself is fixed per element type by
//! [`Storable`] and never branched on at runtime.

use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::allocators::{
    global_registry, AllocatorRegistry, BuildFrom, SegmentAllocator, ShmSlot,
};
use crate::error::Result;
use crate::locator::{Locator, ResolveCtx, TypedAtomicPointer, TypedPointer};

use super::backend::PtrBackend;
use super::external::ExternalRef;
use super::traits::Storable;

/// What locators for `T`'s backend resolve to
pub type BackendTarget<T> = <<T as Storable>::Backend as PtrBackend<T>>::Target;

/// Smart pointer over one backend reference plus ownership state.
///
/// `UNIQUE` wrappers take ownership when they initialize and auto-destroy at
/// end of scope while still owning. `DESTRUCT` decides whether destroy may
/// free at all. The useful combinations are named in
/// [`factory`](super::factory): [`Uptr`](super::Uptr),
/// [`Mptr`](super::Mptr), [`ShmRef`](super::ShmRef).
///
/// Dereference operations assume the wrapper has been initialized or
/// deserialized; using an uninitialized wrapper is undefined (checked only
/// by debug assertions).
pub struct SmartPtr<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> {
    backend: T::Backend,
    owner: bool,
}

impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> SmartPtr<T, UNIQUE, DESTRUCT> {
    /// A wrapper holding nothing
    pub fn uninit() -> Self {
        Self {
            backend: T::Backend::uninit(),
            owner: false,
        }
    }

    /// Construct the element from forwarded arguments, allocating through
    /// the default allocator where the backend needs storage. Exclusive
    /// wrappers take ownership.
    pub fn init<A>(&mut self, args: A) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        self.backend.init(args)?;
        if UNIQUE {
            self.owner = true;
        }
        Ok(())
    }

    /// Pointer to the element
    pub fn get(&self) -> *mut T {
        self.backend.as_ptr()
    }

    /// Whether this wrapper currently believes it owns the element.
    /// Meaningful only for exclusive wrappers.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Explicitly destroy the element, honoring the wrapper's destructible
    /// configuration.
    ///
    /// Ownership state is not cleared: explicitly destroying an exclusive
    /// owner and then letting it drop destroys twice, which is a documented
    /// precondition violation.
    pub fn destroy(&mut self) {
        self.backend.destroy(DESTRUCT);
    }

    /// Rebuild a wrapper from a typed locator via the process-wide registry.
    /// The result never owns: it did not perform the allocation.
    pub fn from_typed(ar: &TypedPointer<T>) -> Result<Self> {
        Self::from_typed_in(global_registry(), ar)
    }

    /// Rebuild from a typed locator via an explicit registry
    pub fn from_typed_in(registry: &AllocatorRegistry, ar: &TypedPointer<T>) -> Result<Self> {
        let (id, off) = ar.load();
        Ok(Self::from_ctx(ResolveCtx::resolve(registry, id, off)?))
    }

    /// Rebuild from an atomically updatable locator via the process-wide
    /// registry. Never owning.
    pub fn from_atomic(ar: &TypedAtomicPointer<T>) -> Result<Self> {
        Self::from_atomic_in(global_registry(), ar)
    }

    /// Rebuild from an atomically updatable locator via an explicit registry
    pub fn from_atomic_in(registry: &AllocatorRegistry, ar: &TypedAtomicPointer<T>) -> Result<Self> {
        let (id, off) = ar.load();
        Ok(Self::from_ctx(ResolveCtx::resolve(registry, id, off)?))
    }

    /// Materialize from a resolution context. Never owning.
    pub fn from_ctx(ctx: ResolveCtx<BackendTarget<T>>) -> Self {
        let mut backend = T::Backend::uninit();
        backend.deserialize(ctx);
        Self {
            backend,
            owner: false,
        }
    }

    /// Alias an already-live object. Never owning; for external-backend
    /// types the allocator stays unset, so destroy and serialize are invalid
    /// on the result.
    pub fn from_object(obj: &mut T) -> Self {
        let mut backend = T::Backend::uninit();
        backend.deserialize_obj(obj);
        Self {
            backend,
            owner: false,
        }
    }

    /// Write the element's locator into any locator shape
    pub fn serialize_to<L: Locator<T>>(&self, out: &mut L) {
        self.backend.serialize(out);
    }

    /// The element's plain typed locator
    pub fn to_typed(&self) -> TypedPointer<T> {
        let mut out = TypedPointer::null();
        self.serialize_to(&mut out);
        out
    }

    /// The element's atomically updatable locator
    pub fn to_atomic(&self) -> TypedAtomicPointer<T> {
        let mut out = TypedAtomicPointer::null();
        self.serialize_to(&mut out);
        out
    }
}

/// Operations available only to external-backend element types, where an
/// explicit allocator or pre-reserved storage can stand in for the default
/// allocator.
impl<T, const UNIQUE: bool, const DESTRUCT: bool> SmartPtr<T, UNIQUE, DESTRUCT>
where
    T: Storable<Backend = ExternalRef<T>>,
{
    /// Construct the element from an explicit allocator. Exclusive wrappers
    /// take ownership.
    pub fn init_in<A>(&mut self, alloc: Arc<dyn SegmentAllocator>, args: A) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        self.backend.init_in(alloc, args)?;
        if UNIQUE {
            self.owner = true;
        }
        Ok(())
    }

    /// Construct the element in storage reserved elsewhere; only
    /// construction runs. Exclusive wrappers take ownership.
    pub fn init_in_slot<A>(
        &mut self,
        slot: &mut ShmSlot<T>,
        alloc: Arc<dyn SegmentAllocator>,
        args: A,
    ) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        self.backend.init_in_slot(slot, alloc, args)?;
        if UNIQUE {
            self.owner = true;
        }
        Ok(())
    }

    /// Alias an element previously constructed in a pre-reserved slot.
    /// Never owning.
    pub fn from_slot(slot: &mut ShmSlot<T>, alloc: Arc<dyn SegmentAllocator>) -> Self {
        // Slot storage is never null
        let ptr = unsafe { std::ptr::NonNull::new_unchecked(slot.as_mut_ptr()) };
        Self::from_ctx(ResolveCtx::new(ptr, alloc))
    }

    /// The allocator owning the element, when known
    pub fn allocator(&self) -> Option<&Arc<dyn SegmentAllocator>> {
        self.backend.allocator()
    }
}

impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> Default
    for SmartPtr<T, UNIQUE, DESTRUCT>
{
    fn default() -> Self {
        Self::uninit()
    }
}

impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> Drop for SmartPtr<T, UNIQUE, DESTRUCT> {
    fn drop(&mut self) {
        if UNIQUE && self.owner {
            self.backend.destroy(DESTRUCT);
        }
    }
}

/// Strong copy: the clone aliases the same underlying element.
///
/// For exclusive wrappers the ownership flag is copied verbatim rather than
/// transferred, so a cloned exclusive owner and its source both believe they
/// own the element and both will destroy it. This double-ownership hazard is
/// deliberate reference behavior, kept as-is (see DESIGN.md); Rust's native
/// move covers the transfer reading, since a moved-from wrapper is dead.
impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> Clone for SmartPtr<T, UNIQUE, DESTRUCT> {
    fn clone(&self) -> Self {
        let mut backend = T::Backend::uninit();
        backend.strong_copy(&self.backend);
        Self {
            backend,
            owner: self.owner,
        }
    }
}

impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> Deref for SmartPtr<T, UNIQUE, DESTRUCT> {
    type Target = T;

    fn deref(&self) -> &T {
        let ptr = self.backend.as_ptr();
        debug_assert!(!ptr.is_null(), "dereference of an uninitialized wrapper");
        unsafe { &*ptr }
    }
}

impl<T: Storable, const UNIQUE: bool, const DESTRUCT: bool> DerefMut
    for SmartPtr<T, UNIQUE, DESTRUCT>
{
    fn deref_mut(&mut self) -> &mut T {
        let ptr = self.backend.as_ptr();
        debug_assert!(!ptr.is_null(), "dereference of an uninitialized wrapper");
        unsafe { &mut *ptr }
    }
}

/// Wrappers hash by the element's value, not by pointer identity, so they
/// can key associative containers interchangeably with plain values.
impl<T: Storable + Hash, const UNIQUE: bool, const DESTRUCT: bool> Hash
    for SmartPtr<T, UNIQUE, DESTRUCT>
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state);
    }
}
