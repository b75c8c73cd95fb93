//! Named pointer flavors and uniform build helpers

use std::sync::Arc;

use crate::allocators::{BuildFrom, SegmentAllocator};
use crate::error::Result;

use super::external::ExternalRef;
use super::smart::SmartPtr;
use super::traits::Storable;

/// Exclusive owner: frees automatically exactly once, at end of scope,
/// while still owning
pub type Uptr<T> = SmartPtr<T, true, true>;

/// Manual pointer: can be asked to free but never frees automatically
pub type Mptr<T> = SmartPtr<T, false, true>;

/// Aliasing reference: pure view, never frees
pub type ShmRef<T> = SmartPtr<T, false, false>;

/// Build any pointer flavor from a forwarded argument tuple
pub fn make_ptr<T, A, const UNIQUE: bool, const DESTRUCT: bool>(
    args: A,
) -> Result<SmartPtr<T, UNIQUE, DESTRUCT>>
where
    T: Storable + BuildFrom<A>,
{
    let mut ptr: SmartPtr<T, UNIQUE, DESTRUCT> = SmartPtr::uninit();
    ptr.init(args)?;
    Ok(ptr)
}

/// Create an exclusive owner with the default allocator
pub fn make_uptr<T, A>(args: A) -> Result<Uptr<T>>
where
    T: Storable + BuildFrom<A>,
{
    make_ptr::<T, A, true, true>(args)
}

/// Create a manual pointer with the default allocator
pub fn make_mptr<T, A>(args: A) -> Result<Mptr<T>>
where
    T: Storable + BuildFrom<A>,
{
    make_ptr::<T, A, false, true>(args)
}

/// Create an aliasing reference with the default allocator
pub fn make_ref<T, A>(args: A) -> Result<ShmRef<T>>
where
    T: Storable + BuildFrom<A>,
{
    make_ptr::<T, A, false, false>(args)
}

/// Create an exclusive owner from an explicit allocator
pub fn make_uptr_in<T, A>(alloc: Arc<dyn SegmentAllocator>, args: A) -> Result<Uptr<T>>
where
    T: Storable<Backend = ExternalRef<T>> + BuildFrom<A>,
{
    let mut ptr: Uptr<T> = Uptr::uninit();
    ptr.init_in(alloc, args)?;
    Ok(ptr)
}

/// Create a manual pointer from an explicit allocator
pub fn make_mptr_in<T, A>(alloc: Arc<dyn SegmentAllocator>, args: A) -> Result<Mptr<T>>
where
    T: Storable<Backend = ExternalRef<T>> + BuildFrom<A>,
{
    let mut ptr: Mptr<T> = Mptr::uninit();
    ptr.init_in(alloc, args)?;
    Ok(ptr)
}

/// Concatenation of two pre-built argument tuples.
///
/// Lets a compound constructor take key args and value args as separate
/// groups and still end in a single constructor call, with no intermediate
/// temporary. Implemented for tuple arities 0 through 3 on each side.
pub trait MergeArgs<Rhs> {
    type Output;

    fn merge(self, rhs: Rhs) -> Self::Output;
}

macro_rules! impl_merge_args {
    (($($l:ident),*), ($($r:ident),*)) => {
        impl<$($l,)* $($r,)*> MergeArgs<($($r,)*)> for ($($l,)*) {
            type Output = ($($l,)* $($r,)*);

            #[allow(non_snake_case, clippy::unused_unit)]
            fn merge(self, rhs: ($($r,)*)) -> Self::Output {
                let ($($l,)*) = self;
                let ($($r,)*) = rhs;
                ($($l,)* $($r,)*)
            }
        }
    };
}

impl_merge_args!((), ());
impl_merge_args!((), (R0));
impl_merge_args!((), (R0, R1));
impl_merge_args!((), (R0, R1, R2));
impl_merge_args!((L0), ());
impl_merge_args!((L0), (R0));
impl_merge_args!((L0), (R0, R1));
impl_merge_args!((L0), (R0, R1, R2));
impl_merge_args!((L0, L1), ());
impl_merge_args!((L0, L1), (R0));
impl_merge_args!((L0, L1), (R0, R1));
impl_merge_args!((L0, L1), (R0, R1, R2));
impl_merge_args!((L0, L1, L2), ());
impl_merge_args!((L0, L1, L2), (R0));
impl_merge_args!((L0, L1, L2), (R0, R1));
impl_merge_args!((L0, L1, L2), (R0, R1, R2));

/// Build any pointer flavor by merging two argument groups into one
/// constructor call
pub fn make_piecewise<T, A1, A2, const UNIQUE: bool, const DESTRUCT: bool>(
    args1: A1,
    args2: A2,
) -> Result<SmartPtr<T, UNIQUE, DESTRUCT>>
where
    A1: MergeArgs<A2>,
    T: Storable + BuildFrom<A1::Output>,
{
    make_ptr(args1.merge(args2))
}

/// Create an aliasing reference from piecewise argument groups
pub fn make_ref_piecewise<T, A1, A2>(args1: A1, args2: A2) -> Result<ShmRef<T>>
where
    A1: MergeArgs<A2>,
    T: Storable + BuildFrom<A1::Output>,
{
    make_piecewise::<T, A1, A2, false, false>(args1, args2)
}
