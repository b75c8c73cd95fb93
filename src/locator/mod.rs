//! Position-independent locators and the resolution context

pub mod pointers;
pub mod resolve;

pub use pointers::{Locator, OffsetPointer, TypedAtomicPointer, TypedPointer, NULL_OFFSET};
pub use resolve::ResolveCtx;
