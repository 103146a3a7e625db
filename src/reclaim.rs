//! Deferred reclamation of the nodes the consumer has moved past.
//!
//! The consumer cannot free a node as soon as it polls past it: a producer may have
//! loaded the shared tail while it still pointed there and be about to inspect that
//! node's successor. Nodes are therefore retired first and only freed once every
//! producer that could still hold such a pointer has finished its offer.
//!
//! Producers announce themselves by pinning the current epoch for the duration of
//! an offer. Epoch and pin counters share one word, laid out as follows:
//!
//! ```txt
//! bit 0                   epoch parity
//! bits 1 .. BITS/2        producers pinned in an even epoch
//! bits BITS/2 .. BITS     producers pinned in an odd epoch
//! ```
//!
//! Only the consumer advances the epoch, and only when nobody is pinned in the
//! epoch before the current one. A node retired while the epoch was `n` is freed
//! once the epoch reaches `n + 3`. Two advances are enough to outlive every producer
//! that was running at retirement; the third also outlives producers that started
//! while the tail still lagged behind the retired node.

use crate::node::Node;
use crate::variant::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

const PARITY: usize = 1;

const HALF: u32 = usize::BITS / 2;

/// One producer pinned in an even epoch.
const EVEN_PIN: usize = 1 << 1;

/// One producer pinned in an odd epoch.
const ODD_PIN: usize = 1 << HALF;

const EVEN_MASK: usize = ((1 << HALF) - 1) & !PARITY;

/// Epoch shared between the producers and the consumer.
#[derive(Debug)]
pub(crate) struct Epochs {
    state: AtomicUsize,
}

impl Epochs {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
        }
    }

    /// Pins the current epoch until the returned [`Guard`] is dropped.
    ///
    /// The parity is read back from the same read-modify-write that bumps the
    /// counter, so a pin can never be recorded against the wrong epoch. A guess that
    /// turns out stale is undone and retried.
    pub(crate) fn pin(&self) -> Guard<'_> {
        let mut parity = self.state.load(Ordering::Relaxed) & PARITY;

        loop {
            let unit = pin_unit(parity);
            let state = self.state.fetch_add(unit, Ordering::AcqRel);
            if state & PARITY == parity {
                return Guard { epochs: self, unit };
            }

            let _ = self.state.fetch_sub(unit, Ordering::Release);
            parity = state & PARITY;
        }
    }

    /// Moves to the next epoch if no producer is still pinned in the previous one.
    ///
    /// Must only be called by the consumer.
    pub(crate) fn try_advance(&self) -> bool {
        let mut state = self.state.load(Ordering::Acquire);

        loop {
            if pinned(state, (state & PARITY) ^ PARITY) != 0 {
                return false;
            }

            match self.state.compare_exchange_weak(
                state,
                state ^ PARITY,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                // A producer pinned or unpinned in the meantime.
                Err(current) => state = current,
            }
        }
    }
}

/// Keeps an epoch pinned while alive.
#[derive(Debug)]
pub(crate) struct Guard<'a> {
    epochs: &'a Epochs,
    unit: usize,
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        let _ = self.epochs.state.fetch_sub(self.unit, Ordering::Release);
    }
}

fn pin_unit(parity: usize) -> usize {
    if parity == 0 {
        EVEN_PIN
    } else {
        ODD_PIN
    }
}

fn pinned(state: usize, parity: usize) -> usize {
    if parity == 0 {
        (state & EVEN_MASK) >> 1
    } else {
        state >> HALF
    }
}

/// The consumer's record of the retired prefix of the list.
///
/// Retired nodes are always the contiguous run from `free_from` up to, but
/// excluding, the current head. `marks[0]` and `marks[1]` are the head as it was at
/// the last and the second to last epoch advance.
#[derive(Debug)]
pub(crate) struct Retired<T> {
    free_from: *mut Node<T>,
    marks: [*mut Node<T>; 2],
    epoch: usize,
}

impl<T> Retired<T> {
    pub(crate) fn new(sentinel: *mut Node<T>) -> Self {
        Self {
            free_from: sentinel,
            marks: [sentinel, sentinel],
            epoch: 0,
        }
    }

    /// Tries to advance the epoch and frees the nodes that became unreachable.
    ///
    /// # Safety
    ///
    /// Must only be called by the consumer, with `head` being its current head.
    pub(crate) unsafe fn collect(&mut self, epochs: &Epochs, head: *mut Node<T>) {
        if self.free_from == head || !epochs.try_advance() {
            return;
        }

        self.epoch = self.epoch.wrapping_add(1);
        let bound = self.marks[1];
        self.marks = [head, self.marks[0]];

        let freed = unsafe { self.free_until(bound) };
        if freed > 0 {
            trace!(freed, epoch = self.epoch, "reclaimed retired nodes");
        }
    }

    /// Frees every retired node without waiting for an epoch.
    ///
    /// # Safety
    ///
    /// No producer may be running, and `head` must be the consumer's current head.
    pub(crate) unsafe fn free_all(&mut self, head: *mut Node<T>) -> usize {
        self.marks = [head, head];
        unsafe { self.free_until(head) }
    }

    /// Returns true if some retired node is still waiting to be freed.
    #[cfg(all(test, not(loom)))]
    pub(crate) fn is_pending(&self, head: *mut Node<T>) -> bool {
        self.free_from != head
    }

    unsafe fn free_until(&mut self, bound: *mut Node<T>) -> usize {
        let mut freed = 0;
        while self.free_from != bound {
            let node = self.free_from;
            // Retired nodes had their item taken by `poll`, or are the initial
            // sentinel, so only the allocation is left to release.
            self.free_from = unsafe { (*node).next() };
            drop(unsafe { Box::from_raw(node) });
            freed += 1;
        }

        freed
    }
}
