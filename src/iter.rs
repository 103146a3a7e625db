//! Borrowing iteration over a [`Queue`].
//!
//! [`Queue`]: crate::Queue

use crate::node::Node;

use std::fmt;
use std::marker::PhantomData;

/// An iterator over the items of a [`Queue`], front to back.
///
/// Created by [`Queue::iter`]. It walks the successor links from the consumer's
/// head, so items appended by producers while it runs are picked up if it has not
/// reached the end yet.
///
/// For the same reason the iterator is not fused: after returning `None` it yields
/// `Some` again if a producer has appended in the meantime.
///
/// [`Queue`]: crate::Queue
/// [`Queue::iter`]: crate::Queue::iter
pub struct Iter<'a, T> {
    current: *mut Node<T>,
    _queue: PhantomData<&'a T>,
}

// Safety: an `Iter` is a shared borrow of the consumer and only yields `&T`.
unsafe impl<T: Send + Sync> Send for Iter<'_, T> {}
unsafe impl<T: Send + Sync> Sync for Iter<'_, T> {}

impl<T> Iter<'_, T> {
    pub(crate) fn new(head: *mut Node<T>) -> Self {
        Self {
            current: head,
            _queue: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let next = unsafe { (*self.current).next() };
        if next.is_null() {
            return None;
        }

        self.current = next;
        // Safety: the queue is borrowed for `'a`, so nothing polls this node's item
        // or frees the node meanwhile.
        Some(unsafe { (*next).item() })
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").finish_non_exhaustive()
    }
}
