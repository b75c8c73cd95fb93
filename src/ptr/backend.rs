//! Storage backend contract
//!
//! Sealed: [`EmbeddedRef`](super::EmbeddedRef) and
//! [`ExternalRef`](super::ExternalRef) are the only two implementations.

use crate::allocators::BuildFrom;
use crate::error::Result;
use crate::locator::{Locator, ResolveCtx};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// One storage strategy for a smart pointer's element.
///
/// Backends are state machines without lifecycle policy: they know how to
/// place, alias, locate, and tear down the element, while ownership rules
/// live in [`SmartPtr`](super::SmartPtr).
pub trait PtrBackend<T>: sealed::Sealed + Sized {
    /// What locators for this backend resolve to: the element's header for
    /// embedded storage, the element itself for external storage.
    type Target;

    /// A backend holding nothing; dereferencing before `init` or a
    /// deserialize is undefined.
    fn uninit() -> Self;

    /// Construct the element from forwarded arguments, allocating through
    /// the default allocator where the backend needs storage.
    fn init<A>(&mut self, args: A) -> Result<()>
    where
        T: BuildFrom<A>;

    /// Pointer to the element
    fn as_ptr(&self) -> *mut T;

    /// Alias `other`'s element (external) or copy its state through the
    /// element's own serialize form (embedded). Never duplicates external
    /// storage.
    fn strong_copy(&mut self, other: &Self);

    /// Write the element's locator into `out`
    fn serialize<L: Locator<T>>(&self, out: &mut L);

    /// Adopt a resolved locator
    fn deserialize(&mut self, ctx: ResolveCtx<Self::Target>);

    /// Adopt a live object; the allocator stays unknown in this mode
    fn deserialize_obj(&mut self, obj: &mut T);

    /// Tear the element down. `destruct` carries the wrapper's destructible
    /// configuration.
    fn destroy(&mut self, destruct: bool);
}
