//! Per-connection state: subscriptions and the bounded outbound queue.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify, RwLock};

use hydra_core::Channel;

pub type ConnectionId = u64;

struct OutboundQueue {
    frames: VecDeque<String>,
    closed: bool,
}

/// A live, authenticated transport connection.
///
/// The subscription set and outbound queue are owned exclusively by this
/// connection and mutated only through the hub's entry points; producers
/// never touch them directly.
pub struct ClientConnection {
    pub id: ConnectionId,
    pub user_id: String,
    capacity: usize,
    subscriptions: RwLock<HashSet<Channel>>,
    queue: Mutex<OutboundQueue>,
    notify: Notify,
    dropped: AtomicU64,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, user_id: String, capacity: usize) -> Self {
        Self {
            id,
            user_id,
            capacity,
            subscriptions: RwLock::new(HashSet::new()),
            queue: Mutex::new(OutboundQueue {
                frames: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    pub async fn add_subscription(&self, channel: Channel) -> bool {
        self.subscriptions.write().await.insert(channel)
    }

    pub async fn remove_subscription(&self, channel: Channel) -> bool {
        self.subscriptions.write().await.remove(&channel)
    }

    pub async fn is_subscribed(&self, channel: Channel) -> bool {
        self.subscriptions.read().await.contains(&channel)
    }

    /// Queue a frame for delivery. When the queue is full the oldest
    /// undelivered frame is dropped so the publisher never blocks.
    /// Returns `false` when the connection is closed.
    pub async fn enqueue(&self, frame: String) -> bool {
        {
            let mut queue = self.queue.lock().await;
            if queue.closed {
                return false;
            }
            if queue.frames.len() == self.capacity {
                queue.frames.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.frames.push_back(frame);
        }
        self.notify.notify_one();
        true
    }

    /// Next frame for the writer task. Waits until a frame is queued or
    /// the connection is closed (`None`).
    pub async fn next_frame(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.queue.lock().await;
                if let Some(frame) = queue.frames.pop_front() {
                    return Some(frame);
                }
                if queue.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Halt delivery. Queued frames are discarded and the writer task is
    /// woken to observe the close.
    pub async fn close(&self) {
        {
            let mut queue = self.queue.lock().await;
            queue.closed = true;
            queue.frames.clear();
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub async fn is_closed(&self) -> bool {
        self.queue.lock().await.closed
    }

    /// Frames dropped on this connection due to backpressure.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn queued_count(&self) -> usize {
        self.queue.lock().await.frames.len()
    }
}
