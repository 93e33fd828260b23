//! # Bounded Channels
//!
//! Fixed-capacity FIFO hand-off between pipeline tasks.
//!
//! Storage is a lock-free [`heapless::mpmc::MpMcQueue`] allocated once at
//! construction. [`ChannelSender::try_send`] never allocates and never
//! awaits: the enqueue itself is lock-free, and waking a parked receiver
//! goes through [`tokio::sync::Notify`], which briefly takes tokio's
//! internal waiter lock. Callers must not hold that lock themselves.
//!
//! A full channel drops the newest value and bumps the `dropped` counter.
//! Nothing is logged on that path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use heapless::mpmc::MpMcQueue;
use serde::Serialize;
use tokio::sync::Notify;

/// Slots per channel. Fixed for the life of the process.
pub const CHANNEL_CAPACITY: usize = 32;

struct Shared<T> {
    queue: MpMcQueue<T, CHANNEL_CAPACITY>,
    notify: Notify,
}

/// Traffic counters for one channel, readable without knowing its item type.
#[derive(Debug)]
pub struct ChannelCounters {
    name: &'static str,
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`ChannelCounters`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub name: &'static str,
    pub enqueued: u64,
    pub dropped: u64,
    pub pending: u64,
}

impl ChannelCounters {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Values rejected because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Values currently buffered.
    pub fn pending(&self) -> u64 {
        let enqueued = self.enqueued.load(Ordering::Acquire);
        let dequeued = self.dequeued.load(Ordering::Acquire);
        enqueued.saturating_sub(dequeued)
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            name: self.name,
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped(),
            pending: self.pending(),
        }
    }
}

/// Producer half. Cheap to clone; several producers may share one channel.
pub struct ChannelSender<T> {
    shared: Arc<Shared<T>>,
    counters: Arc<ChannelCounters>,
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<T> std::fmt::Debug for ChannelSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSender")
            .field("name", &self.counters.name)
            .finish_non_exhaustive()
    }
}

/// Consumer half. Exactly one per channel.
pub struct ChannelReceiver<T> {
    shared: Arc<Shared<T>>,
    counters: Arc<ChannelCounters>,
}

impl<T> std::fmt::Debug for ChannelReceiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelReceiver")
            .field("name", &self.counters.name)
            .finish_non_exhaustive()
    }
}

/// Create a bounded channel with [`CHANNEL_CAPACITY`] slots.
///
/// # Examples
///
/// ```
/// use motionpad::pipeline::channel::channel;
///
/// let (tx, mut rx) = channel::<u8>("example");
/// assert!(tx.try_send(7));
/// assert_eq!(rx.try_recv(), Some(7));
/// assert_eq!(rx.try_recv(), None);
/// ```
pub fn channel<T>(name: &'static str) -> (ChannelSender<T>, ChannelReceiver<T>) {
    let shared = Arc::new(Shared {
        queue: MpMcQueue::new(),
        notify: Notify::new(),
    });
    let counters = Arc::new(ChannelCounters::new(name));

    (
        ChannelSender {
            shared: Arc::clone(&shared),
            counters: Arc::clone(&counters),
        },
        ChannelReceiver { shared, counters },
    )
}

impl<T> ChannelSender<T> {
    /// Enqueue without waiting.
    ///
    /// Returns `false` if the channel was full and the value was dropped.
    pub fn try_send(&self, value: T) -> bool {
        match self.shared.queue.enqueue(value) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Release);
                self.shared.notify.notify_one();
                true
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn counters(&self) -> Arc<ChannelCounters> {
        Arc::clone(&self.counters)
    }
}

impl<T> ChannelReceiver<T> {
    /// Dequeue without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        let value = self.shared.queue.dequeue()?;
        self.counters.dequeued.fetch_add(1, Ordering::Release);
        Some(value)
    }

    /// Wait until a value is available.
    ///
    /// Cancel safe: dropping the future never loses a queued value.
    pub async fn recv(&mut self) -> T {
        loop {
            if let Some(value) = self.try_recv() {
                return value;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Wait up to `timeout` for a value. A zero timeout is a plain poll.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<T> {
        if timeout.is_zero() {
            return self.try_recv();
        }
        tokio::time::timeout(timeout, self.recv()).await.ok()
    }

    pub fn counters(&self) -> Arc<ChannelCounters> {
        Arc::clone(&self.counters)
    }
}
