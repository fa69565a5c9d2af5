//! Reference-counted generalized lists.
//!
//! A generalized list is a sequence whose elements are atoms or whole sublists, written `(a, (b, c), d)`. Sublists
//! are held by reference: pushing a list into another shares it rather than copying it, and each level's head counts
//! its owners. Deep copies are explicit (see [`GenList::try_clone`]).
//!
//! All lists live on one process-wide [`Heap`] guarded by a lock. Every [`GenList`] operation holds the lock for its
//! whole duration.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod heap;
pub mod list;
pub mod node;
pub mod read;

#[cfg(test)]
mod tests;

pub use error::{ListError, ParseError, ParseErrorKind};
pub use heap::{Heap, HeapStats};
pub use list::{Element, ElementRef, Elements, GenList};
pub use read::ReaderConfig;

#[cfg(not(feature = "std"))]
mod _heap {
    use core::ops::DerefMut;

    use crate::heap::Heap;

    static HEAP: spin::Mutex<Heap> = spin::Mutex::new(Heap::new());

    pub fn lock_default_heap<R>(f: impl FnOnce(&mut Heap) -> R) -> R {
        f(HEAP.lock().deref_mut())
    }
}

#[cfg(feature = "std")]
mod _heap {
    use core::ops::DerefMut;

    use crate::heap::Heap;

    lazy_static::lazy_static!(
        static ref HEAP: std::sync::Mutex<Heap> = std::sync::Mutex::new(Heap::new());
    );

    pub fn lock_default_heap<R>(f: impl FnOnce(&mut Heap) -> R) -> R {
        f(HEAP.lock().expect("failed to acquire heap lock").deref_mut())
    }
}

/// Runs `f` with exclusive access to the heap that backs every [`GenList`].
///
/// Do not drop a [`GenList`] inside `f`: dropping takes the same lock.
pub use _heap::lock_default_heap;

pub fn default_heap_stats() -> HeapStats {
    lock_default_heap(|heap| heap.stats())
}
