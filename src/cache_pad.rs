//! Keeps the consumer's cursor and the producers' shared words on separate cache lines.
//!
//! Producers hammer the tail pointer, the size counter and the epoch word while the
//! consumer walks the head. Without padding, every append would invalidate the line
//! holding the consumer's cursor (false sharing).
//!
//! # Size and alignment
//!
//! - On x86_64 and aarch64, lines are taken to be 128 bytes (adjacent line prefetching
//!   on x86_64, 128 byte lines on Apple silicon).
//! - On all others, 64 bytes.

use std::fmt;
use std::ops::Deref;

/// Pads and aligns a value to the length of a cache line.
#[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), repr(align(128)))]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    repr(align(64))
)]
pub(crate) struct CachePad<T>(T);

impl<T> CachePad<T> {
    pub(crate) fn new(value: T) -> CachePad<T> {
        CachePad(value)
    }
}

impl<T> Deref for CachePad<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePad<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
