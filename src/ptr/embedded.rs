//! Embedded backend: the element lives inline in the wrapper
//!
//! For self-describing types ([`ShmObject`]) the wrapper's own storage holds
//! the element; the element's segment-side header and bookkeeping are managed
//! by the type itself, so construction, copying, and destruction all route
//! through the type's own contract even though the bytes are inline.

use std::mem::MaybeUninit;

use crate::allocators::BuildFrom;
use crate::error::Result;
use crate::locator::{Locator, ResolveCtx};

use super::backend::{sealed, PtrBackend};
use super::traits::ShmObject;

/// Inline storage backend for self-describing shared-memory types
pub struct EmbeddedRef<T> {
    obj: MaybeUninit<T>,
}

impl<T> sealed::Sealed for EmbeddedRef<T> {}

impl<T: ShmObject> PtrBackend<T> for EmbeddedRef<T> {
    type Target = T::Header;

    fn uninit() -> Self {
        Self {
            obj: MaybeUninit::uninit(),
        }
    }

    fn init<A>(&mut self, args: A) -> Result<()>
    where
        T: BuildFrom<A>,
    {
        // Construction runs the element type's own contract, header
        // bookkeeping included
        self.obj.write(T::build_from(args));
        Ok(())
    }

    fn as_ptr(&self) -> *mut T {
        self.obj.as_ptr() as *mut T
    }

    fn strong_copy(&mut self, other: &Self) {
        // State copy, not byte copy: round-trip through the element's own
        // serialize form
        let src = unsafe { &*other.as_ptr() };
        self.obj.write(T::shm_deserialize(src.resolve_ctx()));
    }

    fn serialize<L: Locator<T>>(&self, out: &mut L) {
        unsafe { &*self.as_ptr() }.shm_serialize(out);
    }

    fn deserialize(&mut self, ctx: ResolveCtx<T::Header>) {
        self.obj.write(T::shm_deserialize(ctx));
    }

    fn deserialize_obj(&mut self, obj: &mut T) {
        self.obj.write(T::shm_deserialize(obj.resolve_ctx()));
    }

    fn destroy(&mut self, destruct: bool) {
        let obj = unsafe { &mut *self.as_ptr() };
        obj.set_header_owned(destruct);
        obj.shm_destroy();
    }
}
