//! Capability traits deciding how an element type is stored

use crate::locator::{Locator, ResolveCtx};

use super::backend::PtrBackend;

/// Capability of self-describing shared-memory types.
///
/// An implementor keeps its own header inside some allocator's segment and
/// therefore knows how to represent itself as a locator, rebuild itself from
/// a resolved one, and destroy itself honoring the header's owned bit.
pub trait ShmObject: Sized {
    /// Header type this object keeps in segment storage; locators for the
    /// object point at the header.
    type Header;

    /// Write this object's locator into `out`
    fn shm_serialize<L: Locator<Self>>(&self, out: &mut L);

    /// Rebuild the object from a resolved locator
    fn shm_deserialize(ctx: ResolveCtx<Self::Header>) -> Self;

    /// The resolution context this object would deserialize from
    fn resolve_ctx(&self) -> ResolveCtx<Self::Header>;

    /// Flip the owned bit on the object's header
    fn set_header_owned(&mut self, owned: bool);

    /// Destroy the object's segment state if the header says it is owned
    fn shm_destroy(&mut self);
}

/// Binds an element type to its storage backend.
///
/// The binding is fixed per type at compile time and invisible to
/// [`SmartPtr`](super::SmartPtr)'s public contract; there is no runtime
/// branch. Self-describing types pick [`EmbeddedRef`](super::EmbeddedRef)
/// (see [`shm_storable!`](crate::shm_storable)), plain types pick
/// [`ExternalRef`](super::ExternalRef) (see
/// [`plain_storable!`](crate::plain_storable)).
pub trait Storable: Sized {
    type Backend: PtrBackend<Self>;
}

/// Bind plain (externally allocated) element types to [`ExternalRef`]
///
/// [`ExternalRef`]: crate::ptr::ExternalRef
#[macro_export]
macro_rules! plain_storable {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::ptr::Storable for $t {
                type Backend = $crate::ptr::ExternalRef<$t>;
            }
        )*
    };
}

/// Bind self-describing element types to [`EmbeddedRef`]
///
/// [`EmbeddedRef`]: crate::ptr::EmbeddedRef
#[macro_export]
macro_rules! shm_storable {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::ptr::Storable for $t {
                type Backend = $crate::ptr::EmbeddedRef<$t>;
            }
        )*
    };
}

// Primitives and common std types are plain
crate::plain_storable!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, String,
);
