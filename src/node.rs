//! A cell of the [`Queue`]'s linked list.
//!
//! Each [`Node`] holds at most one item and a pointer to its successor. The
//! successor starts out null and is installed exactly once, by whichever producer
//! wins the compare-and-swap against it. Once installed it never changes, which is
//! what lets the consumer and every producer walk the list without locks.
//!
//! The item slot is only initialized for nodes created by an offer. The list's
//! initial sentinel never holds one, and a node's item is moved out when the
//! consumer polls it, at which point the node becomes the new sentinel.
//!
//! [`Queue`]: crate::queue::Queue

use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicPtr, Ordering};

use std::mem::MaybeUninit;
use std::ptr;

/// A cell of the [`Queue`]'s linked list.
///
/// [`Queue`]: crate::queue::Queue
#[derive(Debug)]
pub(crate) struct Node<T> {
    /// The payload, uninitialized for the sentinel and once polled.
    item: UnsafeCell<MaybeUninit<T>>,

    /// A pointer to the next [`Node`] if any. Set at most once.
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    /// Allocates the empty node a new list starts with.
    pub(crate) fn sentinel() -> *mut Self {
        Box::into_raw(Box::new(Self {
            item: UnsafeCell::new(MaybeUninit::uninit()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Allocates an unlinked node holding `item`.
    pub(crate) fn new(item: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            item: UnsafeCell::new(MaybeUninit::new(item)),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    /// Returns the successor, or null if this node is currently the last one.
    pub(crate) fn next(&self) -> *mut Self {
        self.next.load(Ordering::Acquire)
    }

    /// Installs `candidate` as the successor if there is none yet.
    ///
    /// On failure the successor that won the race is returned. A node can only be
    /// linked once, so the caller must carry on from that successor rather than
    /// retry against this node.
    pub(crate) fn try_link(&self, candidate: *mut Self) -> Result<(), *mut Self> {
        self.next
            .compare_exchange(
                ptr::null_mut(),
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
    }

    /// Borrows the item.
    ///
    /// # Safety
    ///
    /// The item must be initialized and must not be moved out for as long as the
    /// returned reference lives.
    pub(crate) unsafe fn item(&self) -> &T {
        let item = self.item.with(|p| p.cast::<T>());
        unsafe { &*item }
    }

    /// Moves the item out, leaving the slot logically uninitialized.
    ///
    /// # Safety
    ///
    /// The item must be initialized, and this must be called at most once per node.
    pub(crate) unsafe fn take_item(&self) -> T {
        self.item.with(|p| unsafe { (*p).assume_init_read() })
    }

    /// Drops the item in place.
    ///
    /// # Safety
    ///
    /// Same as [`Node::take_item`].
    pub(crate) unsafe fn drop_item(&self) {
        self.item.with_mut(|p| unsafe { (*p).assume_init_drop() })
    }
}
