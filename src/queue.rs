//! A lock-free multi-producer single-consumer unbounded queue.
//!
//! The queue is a singly linked list starting at a sentinel node. Producers append
//! by installing their node as the successor of the node the shared tail points to,
//! the consumer removes by moving its private head one node forward. Only the
//! append path needs compare-and-swap: the consumer is unique, which the
//! `&mut self` receiver of [`Queue::poll`] enforces, so the head is a plain pointer.

use crate::cache_pad::CachePad;
use crate::error::Error;
use crate::iter::Iter;
use crate::node::Node;
use crate::reclaim::{Epochs, Retired};
use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use crate::variant::sync::Arc;

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

/// A lock-free multi-producer single-consumer unbounded queue.
///
/// The `Queue` is the consumer side: it owns the right to remove elements and is
/// not [`Clone`]. Any number of [`Producer`] handles can be created from it with
/// [`Queue::producer`] and sent to other threads.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,

    // `peek` and `iter` hand out `&T`, so a shared consumer also needs `T: Sync`.
    _not_sync: PhantomData<Cell<()>>,
}

// Safety: shared access to the consumer only reads items through `&T` and appends
// through `offer`, both fine with `T: Send + Sync`.
unsafe impl<T: Send + Sync> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// Creates a new empty [`Queue`].
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// assert!(queue.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
            _not_sync: PhantomData,
        }
    }

    /// Creates a new [`Producer`] appending to this queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    /// use std::thread;
    ///
    /// let mut queue = Queue::<usize>::new();
    /// let producer = queue.producer();
    ///
    /// thread::spawn(move || {
    ///     producer.offer(1);
    /// })
    /// .join()
    /// .unwrap();
    ///
    /// assert_eq!(queue.poll(), Some(1));
    /// ```
    pub fn producer(&self) -> Producer<T> {
        Producer {
            inner: self.inner.clone(),
        }
    }

    /// Appends an item to the back of the [`Queue`].
    ///
    /// The queue is unbounded so this always returns `true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// assert!(queue.offer(1));
    /// assert_eq!(queue.size(), 1);
    /// ```
    pub fn offer(&self, item: T) -> bool {
        self.inner.offer(item)
    }

    /// Appends an item to the back of the [`Queue`], failing with
    /// [`Error::AppendFailure`] if [`Queue::offer`] refuses it.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// queue.add(1).unwrap();
    /// ```
    pub fn add(&self, item: T) -> Result<(), Error> {
        self.inner.add(item)
    }

    /// Returns the item at the front of the [`Queue`] without removing it, or `None`
    /// if the [`Queue`] is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// assert_eq!(queue.peek(), None);
    ///
    /// queue.offer(5);
    /// assert_eq!(queue.peek(), Some(&5));
    /// assert_eq!(queue.size(), 1);
    /// ```
    pub fn peek(&self) -> Option<&T> {
        let next = unsafe { (*self.inner.head()).next() };

        // Safety: every node after the head holds an item, and only `poll`, which
        // cannot run while this borrow lives, moves it out or frees the node.
        unsafe { next.as_ref().map(|node| node.item()) }
    }

    /// Returns the item at the front of the [`Queue`] without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if the [`Queue`] is empty.
    pub fn element(&self) -> Result<&T, Error> {
        self.peek().ok_or(Error::Empty)
    }

    /// Removes the item at the front of the [`Queue`]. Returns `None` if the [`Queue`]
    /// is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let mut queue = Queue::<usize>::new();
    /// for i in 0..8 {
    ///   queue.offer(i);
    /// }
    ///
    /// for i in 0..8 {
    ///   assert_eq!(i, queue.poll().unwrap());
    /// }
    ///
    /// assert!(queue.poll().is_none());
    /// ```
    pub fn poll(&mut self) -> Option<T> {
        // Safety: `&mut self` makes this thread the only consumer.
        unsafe { self.inner.poll() }
    }

    /// Removes the item at the front of the [`Queue`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if the [`Queue`] is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::{Error, Queue};
    ///
    /// let mut queue = Queue::<usize>::new();
    /// assert_eq!(queue.remove(), Err(Error::Empty));
    ///
    /// queue.offer(3);
    /// assert_eq!(queue.remove(), Ok(3));
    /// ```
    pub fn remove(&mut self) -> Result<T, Error> {
        self.poll().ok_or(Error::Empty)
    }

    /// Returns the number of items in the [`Queue`].
    ///
    /// Exact once every concurrent offer has returned, otherwise a snapshot that may
    /// already be stale.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Returns `true` if [`Queue::size`] is zero.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns an iterator over the items of the [`Queue`], front to back.
    ///
    /// The iterator is weakly consistent: items offered while it is alive may or may
    /// not be yielded. Items are never removed under it since [`Queue::poll`] needs
    /// exclusive access.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// for i in 1..=3 {
    ///     queue.offer(i);
    /// }
    ///
    /// assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.inner.head())
    }

    /// Returns `true` if the [`Queue`] holds an item equal to `item`.
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|x| x == item)
    }

    /// Returns `true` if the [`Queue`] holds an item equal to each of `items`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmp_queue::Queue;
    ///
    /// let queue = Queue::<usize>::new();
    /// for i in 1..=3 {
    ///     queue.offer(i);
    /// }
    ///
    /// assert!(queue.contains_all(&[1, 2, 3]));
    /// assert!(!queue.contains_all(&[1, 2, 3, 4]));
    /// ```
    pub fn contains_all<'a, I>(&self, items: I) -> bool
    where
        T: PartialEq + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items.into_iter().all(|item| self.contains(item))
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// A handle appending to a [`Queue`].
///
/// Producers are cheap to clone and can be sent to any number of threads. They keep
/// the queue's storage alive, so items offered after the [`Queue`] itself was
/// dropped are simply dropped along with the last handle.
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Producer<T> {
    /// Appends an item to the back of the [`Queue`]. Always returns `true`.
    pub fn offer(&self, item: T) -> bool {
        self.inner.offer(item)
    }

    /// Appends an item to the back of the [`Queue`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AppendFailure`] if [`Producer::offer`] refuses the item.
    pub fn add(&self, item: T) -> Result<(), Error> {
        self.inner.add(item)
    }

    /// Returns the number of items in the [`Queue`]. See [`Queue::size`].
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Returns `true` if [`Producer::size`] is zero.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

struct Inner<T> {
    /// Some node on or before the last one. Lags by at most one node per
    /// in-flight offer.
    tail: CachePad<AtomicPtr<Node<T>>>,

    /// Incremented before an item is linked and decremented once it is polled,
    /// so it never underflows.
    size: CachePad<AtomicUsize>,

    epochs: CachePad<Epochs>,

    /// Consumer-owned state.
    cursor: CachePad<UnsafeCell<Cursor<T>>>,
}

struct Cursor<T> {
    /// The node the consumer polled last, or the initial sentinel. Its successor is
    /// the front of the queue.
    head: *mut Node<T>,

    retired: Retired<T>,
}

// Safety: items only ever move from a producer thread to the consumer thread, and
// nodes are freed once no thread can reach them.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    fn new() -> Self {
        let sentinel = Node::sentinel();

        Self {
            tail: CachePad::new(AtomicPtr::new(sentinel)),
            size: CachePad::new(AtomicUsize::new(0)),
            epochs: CachePad::new(Epochs::new()),
            cursor: CachePad::new(UnsafeCell::new(Cursor {
                head: sentinel,
                retired: Retired::new(sentinel),
            })),
        }
    }

    fn offer(&self, item: T) -> bool {
        let node = Node::new(item);
        let _ = self.size.fetch_add(1, Ordering::Release);

        // Keeps the nodes reachable from our tail snapshot allocated.
        let _guard = self.epochs.pin();
        let mut tail = self.tail.load(Ordering::Acquire);

        loop {
            match unsafe { (*tail).try_link(node) } {
                // Our node is now the last one. Swing the tail to it unless another
                // producer already helped it forward.
                Ok(()) => {
                    let _ = self.tail.compare_exchange(
                        tail,
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );

                    return true;
                }
                // Another producer linked first. Help the tail past its node, so the
                // tail never lags more than one node behind a finished offer, and
                // retry from there.
                Err(next) => {
                    trace!("lost tail link race, helping the tail forward");
                    let _ = self.tail.compare_exchange(
                        tail,
                        next,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    tail = next;
                }
            }
        }
    }

    fn add(&self, item: T) -> Result<(), Error> {
        if self.offer(item) {
            Ok(())
        } else {
            Err(Error::AppendFailure)
        }
    }

    /// # Safety
    ///
    /// The caller must be the only consumer.
    unsafe fn poll(&self) -> Option<T> {
        self.cursor.with_mut(|cursor| unsafe {
            let cursor = &mut *cursor;

            let next = (*cursor.head).next();
            let item = if next.is_null() {
                None
            } else {
                cursor.head = next;
                let _ = self.size.fetch_sub(1, Ordering::Release);
                Some((*next).take_item())
            };

            cursor.retired.collect(&self.epochs, cursor.head);
            item
        })
    }

    fn head(&self) -> *mut Node<T> {
        self.cursor.with(|cursor| unsafe { (*cursor).head })
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // No handle is left, so no producer can be pinned.
        self.cursor.with_mut(|cursor| unsafe {
            let cursor = &mut *cursor;
            let freed = cursor.retired.free_all(cursor.head);

            let mut node = (*cursor.head).next();
            drop(Box::from_raw(cursor.head));

            let mut dropped = 0usize;
            while !node.is_null() {
                let next = (*node).next();
                (*node).drop_item();
                drop(Box::from_raw(node));
                node = next;
                dropped += 1;
            }

            trace!(freed, dropped, "queue torn down");
        })
    }
}
