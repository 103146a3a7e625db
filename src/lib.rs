#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    rust_2018_idioms
)]

//! A lock-free multi-producer single-consumer unbounded queue.
//!
//! Any number of threads append through [`Producer`] handles while a single
//! consumer, the owner of the [`Queue`], removes items in the order their appends
//! took effect. Appending never blocks and never takes a lock; removing needs no
//! atomic read-modify-write at all since the consumer is unique.
//!
//! # Examples
//!
//! Single Producer - Single Consumer:
//!
//! ```
//! use scmp_queue::Queue;
//!
//! const COUNT: usize = 1_000;
//! let mut queue: Queue<usize> = Queue::new();
//!
//! for i in 0..COUNT {
//!     queue.offer(i);
//! }
//!
//! for i in 0..COUNT {
//!     assert_eq!(i, queue.poll().unwrap());
//! }
//!
//! assert!(queue.poll().is_none());
//! ```
//!
//! Multi Producer - Single Consumer:
//!
//! ```
//! use scmp_queue::Queue;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 4;
//!
//! let mut queue: Queue<usize> = Queue::new();
//!
//! let ths: Vec<_> = (0..CONCURRENCY)
//!     .map(|p| {
//!         let producer = queue.producer();
//!         thread::spawn(move || {
//!             for i in 0..COUNT {
//!                 producer.offer(p * COUNT + i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let mut received = 0;
//! while received < COUNT * CONCURRENCY {
//!     match queue.poll() {
//!         Some(_) => received += 1,
//!         None => thread::yield_now(),
//!     }
//! }
//!
//! for th in ths {
//!     th.join().unwrap();
//! }
//!
//! assert!(queue.poll().is_none());
//! ```
//!
//! The consumer can live on its own thread too, as long as there is only one:
//!
//! ```
//! use scmp_queue::Queue;
//! use std::thread;
//!
//! let mut queue: Queue<String> = Queue::new();
//! let producer = queue.producer();
//!
//! let consumer = thread::spawn(move || {
//!     let mut lines = Vec::new();
//!     while lines.len() < 3 {
//!         if let Some(line) = queue.poll() {
//!             lines.push(line);
//!         }
//!     }
//!     lines
//! });
//!
//! for line in ["a", "b", "c"] {
//!     producer.add(line.to_owned()).unwrap();
//! }
//!
//! assert_eq!(consumer.join().unwrap(), ["a", "b", "c"]);
//! ```

mod error;
mod iter;
mod queue;

pub(crate) mod cache_pad;
pub(crate) mod node;
pub(crate) mod reclaim;
pub(crate) mod variant;

pub use error::Error;
pub use iter::Iter;
pub use queue::{Producer, Queue};
