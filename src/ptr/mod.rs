//! Dual-mode smart pointers over segment storage
//!
//! Every element type binds exactly one storage backend at compile time:
//! self-describing shared-memory types embed inline ([`EmbeddedRef`]), plain
//! types allocate through a segment allocator ([`ExternalRef`]). The
//! [`SmartPtr`] wrapper adds the ownership/destruction lifecycle on top and
//! the factory layer names the useful flavors.

pub mod backend;
pub mod embedded;
pub mod external;
pub mod factory;
pub mod smart;
pub mod traits;

pub use backend::PtrBackend;
pub use embedded::EmbeddedRef;
pub use external::ExternalRef;
pub use factory::{
    make_mptr, make_mptr_in, make_piecewise, make_ptr, make_ref, make_ref_piecewise, make_uptr,
    make_uptr_in, MergeArgs, Mptr, ShmRef, Uptr,
};
pub use smart::{BackendTarget, SmartPtr};
pub use traits::{ShmObject, Storable};
