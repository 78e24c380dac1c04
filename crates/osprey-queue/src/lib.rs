//! Blocking MPSC handoff queue.
//!
//! This module implements the producer/consumer seam between ingress
//! threads and a single worker: a mutex-guarded deque with a condition
//! variable signalled on every push and on close.
//!
//! Shutdown contract: `pop` returns `None` only after `close()` has been
//! called AND the queue has been fully drained, so nothing enqueued before
//! shutdown is ever dropped.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Shared<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer single-consumer blocking queue.
///
/// Any number of threads may `push`; one consumer calls `pop`. FIFO order
/// is guaranteed per producer; interleaving across producers is whatever
/// the scheduler delivers.
pub struct BlockingQueue<T> {
    shared: Mutex<Shared<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            shared: Mutex::new(Shared {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue an item and wake the consumer.
    ///
    /// Returns `false` if the queue has been closed; the item is not
    /// enqueued in that case.
    pub fn push(&self, item: T) -> bool {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed {
            return false;
        }
        shared.items.push_back(item);
        drop(shared);
        self.available.notify_one();
        true
    }

    /// Dequeue the next item, blocking while the queue is open and empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut shared = self.shared.lock().unwrap();
        loop {
            if let Some(item) = shared.items.pop_front() {
                return Some(item);
            }
            if shared.closed {
                return None;
            }
            shared = self.available.wait(shared).unwrap();
        }
    }

    /// Dequeue without blocking.
    ///
    /// `None` means "currently empty", not "closed"; use `pop` for the
    /// terminating sentinel.
    pub fn try_pop(&self) -> Option<T> {
        self.shared.lock().unwrap().items.pop_front()
    }

    /// Signal end-of-stream and wake all waiters.
    ///
    /// Items already enqueued remain poppable. Idempotent.
    pub fn close(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.closed = true;
        drop(shared);
        self.available.notify_all();
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.shared.lock().unwrap().items.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().unwrap().closed
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = BlockingQueue::new();

        for i in 0..16u64 {
            assert!(queue.push(i));
        }

        for i in 0..16u64 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_empty() {
        let queue: BlockingQueue<u64> = BlockingQueue::new();
        assert_eq!(queue.try_pop(), None);

        queue.push(7);
        assert_eq!(queue.try_pop(), Some(7));
    }

    #[test]
    fn test_close_drains_before_sentinel() {
        let queue = BlockingQueue::new();
        queue.push(1u64);
        queue.push(2);
        queue.close();

        // Everything enqueued before close survives.
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let queue = BlockingQueue::new();
        queue.push(1u64);
        queue.close();

        assert!(queue.is_closed());
        assert!(!queue.push(2));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_close_idempotent() {
        let queue: BlockingQueue<u64> = BlockingQueue::new();
        queue.close();
        queue.close();
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_blocking_pop_wakes_on_push() {
        let queue = Arc::new(BlockingQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        // Give the consumer time to block on the condvar.
        thread::sleep(Duration::from_millis(20));
        assert!(queue.push(99u64));

        assert_eq!(consumer.join().unwrap(), Some(99));
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let queue: Arc<BlockingQueue<u64>> = Arc::new(BlockingQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_per_producer_order_preserved() {
        const PER_PRODUCER: u64 = 1000;
        let queue = Arc::new(BlockingQueue::new());

        // Two producers push tagged monotone sequences concurrently.
        let producers: Vec<_> = (0..2u64)
            .map(|tag| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        assert!(queue.push((tag, seq)));
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        queue.close();

        let mut next_seq = [0u64; 2];
        let mut total = 0u64;
        while let Some((tag, seq)) = queue.pop() {
            assert_eq!(seq, next_seq[tag as usize], "producer {} reordered", tag);
            next_seq[tag as usize] += 1;
            total += 1;
        }
        assert_eq!(total, 2 * PER_PRODUCER);
    }
}
