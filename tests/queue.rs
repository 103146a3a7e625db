use scmp_queue::{Error, Queue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

// cargo test --package scmp-queue --test queue -- test_spsc --exact --nocapture
#[test]
fn test_spsc() {
    const COUNT: usize = 7 * 3;
    let mut queue: Queue<usize> = Queue::new();

    for i in 0..COUNT {
        assert!(queue.offer(i));
    }

    for i in 0..COUNT {
        assert_eq!(i, queue.poll().unwrap());
    }

    assert!(queue.poll().is_none());
}

// cargo test --package scmp-queue --test queue -- test_mpsc --exact --nocapture
#[test]
fn test_mpsc() {
    const COUNT: usize = 1_000;
    const CONCURRENCY: usize = 4;
    let mut queue: Queue<usize> = Queue::new();

    let ths: Vec<_> = (0..CONCURRENCY)
        .map(|_| {
            let p = queue.producer();
            thread::spawn(move || {
                for i in 0..COUNT {
                    p.offer(i);
                }
            })
        })
        .collect();

    for th in ths {
        th.join().unwrap();
    }

    assert_eq!(queue.size(), COUNT * CONCURRENCY);

    for _ in 0..COUNT * CONCURRENCY {
        assert!(queue.poll().is_some());
    }

    assert!(queue.poll().is_none());
    assert!(queue.is_empty());
}

// Producer `p` offers `[p * COUNT, p * COUNT + COUNT)` while the consumer drains
// concurrently. Every value must come out exactly once, and each producer's values
// in the order it offered them.
//
// cargo test --package scmp-queue --test queue -- test_concurrent_offer_and_poll --exact --nocapture
#[test]
fn test_concurrent_offer_and_poll() {
    const COUNT: usize = 10_000;
    const CONCURRENCY: usize = 8;
    let mut queue: Queue<usize> = Queue::new();
    let barrier = Arc::new(Barrier::new(CONCURRENCY + 1));

    let ths: Vec<_> = (0..CONCURRENCY)
        .map(|p| {
            let producer = queue.producer();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let _ = barrier.wait();
                for i in p * COUNT..p * COUNT + COUNT {
                    producer.add(i).unwrap();
                }
            })
        })
        .collect();

    let _ = barrier.wait();

    let mut seen = vec![false; COUNT * CONCURRENCY];
    let mut last = vec![None; CONCURRENCY];
    let mut received = 0;
    while received < COUNT * CONCURRENCY {
        let Some(n) = queue.poll() else {
            thread::yield_now();
            continue;
        };

        assert!(!seen[n], "{} polled twice", n);
        seen[n] = true;

        let p = n / COUNT;
        if let Some(prev) = last[p] {
            assert!(prev < n, "producer {} reordered: {} before {}", p, prev, n);
        }
        last[p] = Some(n);
        received += 1;
    }

    for th in ths {
        th.join().unwrap();
    }

    assert!(seen.iter().all(|s| *s));
    assert!(queue.poll().is_none());
    assert_eq!(queue.size(), 0);
}

// cargo test --package scmp-queue --test queue -- test_racing_pair --exact --nocapture
#[test]
fn test_racing_pair() {
    for _ in 0..100 {
        let mut queue: Queue<usize> = Queue::new();
        let barrier = Arc::new(Barrier::new(2));

        let ths: Vec<_> = [1, 2]
            .into_iter()
            .map(|item| {
                let producer = queue.producer();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let _ = barrier.wait();
                    assert!(producer.offer(item));
                })
            })
            .collect();

        for th in ths {
            th.join().unwrap();
        }

        assert_eq!(queue.size(), 2);
        let mut polled = [queue.poll().unwrap(), queue.poll().unwrap()];
        polled.sort_unstable();
        assert_eq!(polled, [1, 2]);
        assert!(queue.poll().is_none());
    }
}

// cargo test --package scmp-queue --test queue -- test_empty --exact --nocapture
#[test]
fn test_empty() {
    let mut queue: Queue<usize> = Queue::new();

    assert!(queue.is_empty());
    assert_eq!(queue.size(), 0);
    assert!(queue.peek().is_none());
    assert!(queue.poll().is_none());
    assert_eq!(queue.element(), Err(Error::Empty));
    assert_eq!(queue.remove(), Err(Error::Empty));
    assert_eq!(queue.iter().next(), None);
}

// cargo test --package scmp-queue --test queue -- test_round_trip --exact --nocapture
#[test]
fn test_round_trip() {
    let mut queue: Queue<usize> = Queue::new();

    assert!(queue.offer(10));
    assert_eq!(queue.poll(), Some(10));
    assert_eq!(queue.size(), 0);
    assert!(queue.poll().is_none());

    queue.add(1).unwrap();
    assert_eq!(queue.poll(), Some(1));
    assert!(queue.peek().is_none());
    queue.add(2).unwrap();
    assert_eq!(queue.poll(), Some(2));
}

// cargo test --package scmp-queue --test queue -- test_peek_and_element --exact --nocapture
#[test]
fn test_peek_and_element() {
    let mut queue: Queue<usize> = Queue::new();

    queue.add(1).unwrap();
    queue.add(2).unwrap();
    assert_eq!(queue.peek(), Some(&1));
    assert_eq!(queue.element(), Ok(&1));
    assert_eq!(queue.size(), 2);

    assert_eq!(queue.remove(), Ok(1));
    assert_eq!(queue.peek(), Some(&2));
    assert_eq!(queue.remove(), Ok(2));
    assert_eq!(queue.element(), Err(Error::Empty));
}

// cargo test --package scmp-queue --test queue -- test_is_empty --exact --nocapture
#[test]
fn test_is_empty() {
    let mut queue: Queue<usize> = Queue::new();
    let producer = queue.producer();

    assert!(queue.is_empty());
    assert!(producer.is_empty());

    producer.add(1).unwrap();
    assert!(!queue.is_empty());
    assert_eq!(producer.size(), 1);

    assert_eq!(queue.poll(), Some(1));
    assert!(queue.is_empty());
    assert!(producer.is_empty());
}

// cargo test --package scmp-queue --test queue -- test_contains --exact --nocapture
#[test]
fn test_contains() {
    let queue: Queue<usize> = Queue::new();
    for i in 1..=3 {
        queue.add(i).unwrap();
    }

    assert!(queue.contains(&1));
    assert!(queue.contains(&2));
    assert!(queue.contains(&3));
    assert!(!queue.contains(&4));

    assert!(queue.contains_all(&[1, 2, 3]));
    assert!(!queue.contains_all(&[1, 2, 3, 4]));
    assert!(queue.contains_all(std::iter::empty()));
}

// cargo test --package scmp-queue --test queue -- test_iter --exact --nocapture
#[test]
fn test_iter() {
    let mut queue: Queue<usize> = Queue::new();
    for i in 1..=5 {
        queue.add(i).unwrap();
    }

    let mut iter = queue.iter();
    for i in 1..=5 {
        assert_eq!(iter.next(), Some(&i));
    }
    assert_eq!(iter.next(), None);

    assert_eq!(queue.poll(), Some(1));
    assert_eq!(queue.poll(), Some(2));
    assert_eq!((&queue).into_iter().copied().collect::<Vec<_>>(), [3, 4, 5]);
    assert_eq!(queue.size(), 3);
}

// An iterator never yields polled items, and may pick up items offered while it is
// alive.
//
// cargo test --package scmp-queue --test queue -- test_iter_weakly_consistent --exact --nocapture
#[test]
fn test_iter_weakly_consistent() {
    let mut queue: Queue<usize> = Queue::new();
    let producer = queue.producer();
    for i in 0..4 {
        producer.add(i).unwrap();
    }
    assert_eq!(queue.poll(), Some(0));
    assert_eq!(queue.poll(), Some(1));

    let mut iter = queue.iter();
    assert_eq!(iter.next(), Some(&2));

    let th = thread::spawn(move || {
        for i in 4..1_000 {
            producer.add(i).unwrap();
        }
    });
    th.join().unwrap();

    // Items offered after the iterator was created, fully visible once the
    // producer has been joined.
    let rest: Vec<_> = iter.copied().collect();
    assert_eq!(rest, (3..1_000).collect::<Vec<_>>());
}

// cargo test --package scmp-queue --test queue -- test_iter_resumes_after_end --exact --nocapture
#[test]
fn test_iter_resumes_after_end() {
    let queue: Queue<usize> = Queue::new();
    let producer = queue.producer();

    let mut iter = queue.iter();
    assert_eq!(iter.next(), None);

    producer.add(1).unwrap();
    assert_eq!(iter.next(), Some(&1));
    assert_eq!(iter.next(), None);
}

// cargo test --package scmp-queue --test queue -- test_iter_concurrent --exact --nocapture
#[test]
fn test_iter_concurrent() {
    const COUNT: usize = 10_000;
    let queue: Queue<usize> = Queue::new();
    let producer = queue.producer();

    let th = thread::spawn(move || {
        for i in 0..COUNT {
            producer.add(i).unwrap();
        }
    });

    // Whatever prefix is visible must be in order and without gaps.
    for _ in 0..100 {
        for (expected, item) in queue.iter().enumerate() {
            assert_eq!(expected, *item);
        }
    }

    th.join().unwrap();
    assert_eq!(queue.iter().count(), COUNT);
}

// cargo test --package scmp-queue --test queue -- test_size_at_quiescence --exact --nocapture
#[test]
fn test_size_at_quiescence() {
    const COUNT: usize = 1_000;
    const CONCURRENCY: usize = 4;
    let mut queue: Queue<usize> = Queue::new();

    let ths: Vec<_> = (0..CONCURRENCY)
        .map(|_| {
            let producer = queue.producer();
            thread::spawn(move || {
                for i in 0..COUNT {
                    producer.offer(i);
                }
            })
        })
        .collect();

    let mut polled = 0;
    for _ in 0..COUNT {
        if queue.poll().is_some() {
            polled += 1;
        }
    }

    for th in ths {
        th.join().unwrap();
    }

    assert_eq!(queue.size(), COUNT * CONCURRENCY - polled);
}

struct Tracked(Arc<AtomicUsize>);

impl Drop for Tracked {
    fn drop(&mut self) {
        let _ = self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// cargo test --package scmp-queue --test queue -- test_drop_undelivered --exact --nocapture
#[test]
fn test_drop_undelivered() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut queue: Queue<Tracked> = Queue::new();

    for _ in 0..10 {
        queue.add(Tracked(drops.clone())).unwrap();
    }

    for _ in 0..4 {
        drop(queue.poll().unwrap());
    }
    assert_eq!(drops.load(Ordering::SeqCst), 4);

    drop(queue);
    assert_eq!(drops.load(Ordering::SeqCst), 10);
}

// Producers may outlive the consumer; their items are dropped with the last handle.
//
// cargo test --package scmp-queue --test queue -- test_producer_outlives_queue --exact --nocapture
#[test]
fn test_producer_outlives_queue() {
    let drops = Arc::new(AtomicUsize::new(0));
    let queue: Queue<Tracked> = Queue::new();
    let producer = queue.producer();

    producer.add(Tracked(drops.clone())).unwrap();
    drop(queue);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    let th = {
        let producer = producer.clone();
        let drops = drops.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                producer.add(Tracked(drops.clone())).unwrap();
            }
        })
    };
    th.join().unwrap();

    assert_eq!(producer.size(), 101);
    drop(producer);
    assert_eq!(drops.load(Ordering::SeqCst), 101);
}
