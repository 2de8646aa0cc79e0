//! Connection registry and event fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use hydra_core::{Channel, Event};

use super::connection::{ClientConnection, ConnectionId};
use super::replay::ReplayBuffer;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Process-scoped hub state: created at service start, dropped at
/// shutdown. Nothing in here is ever persisted.
pub struct RealtimeHub {
    queue_capacity: usize,
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    /// Explicit subscription table: channel -> subscribed connections.
    subscriptions: RwLock<HashMap<Channel, HashSet<ConnectionId>>>,
    replay: Mutex<HashMap<Channel, ReplayBuffer>>,
}

impl RealtimeHub {
    pub fn new(queue_capacity: usize) -> Self {
        let mut replay = HashMap::new();
        let mut subscriptions = HashMap::new();
        for channel in Channel::ALL {
            replay.insert(channel, ReplayBuffer::new(channel.replay_capacity()));
            subscriptions.insert(channel, HashSet::new());
        }

        Self {
            queue_capacity,
            next_id: AtomicU64::new(1),
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(subscriptions),
            replay: Mutex::new(replay),
        }
    }

    /// Register an authenticated transport connection.
    pub async fn register(&self, user_id: &str) -> Arc<ClientConnection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn = Arc::new(ClientConnection::new(
            id,
            user_id.to_string(),
            self.queue_capacity,
        ));
        self.connections.write().await.insert(id, Arc::clone(&conn));
        info!(connection_id = id, user_id = %user_id, "Connection registered");
        conn
    }

    /// Discard a connection and all of its subscriptions.
    pub async fn unregister(&self, id: ConnectionId) {
        let conn = self.connections.write().await.remove(&id);
        match conn {
            Some(conn) => {
                conn.close().await;
                let mut subs = self.subscriptions.write().await;
                for members in subs.values_mut() {
                    members.remove(&id);
                }
                info!(
                    connection_id = id,
                    dropped = conn.dropped_count(),
                    "Connection unregistered"
                );
            }
            None => warn!(connection_id = id, "Tried to unregister unknown connection"),
        }
    }

    /// Subscribe a connection to a channel by wire name and return the
    /// replay backlog (oldest first).
    ///
    /// Unknown channel names are accepted but recorded nowhere: they
    /// produce no events and no error.
    pub async fn subscribe(&self, id: ConnectionId, channel_name: &str) -> Vec<Event> {
        let Some(channel) = Channel::parse(channel_name) else {
            debug!(connection_id = id, channel = %channel_name, "Subscribe to unknown channel ignored");
            return Vec::new();
        };

        // The replay lock is held from registration through the snapshot,
        // and publish holds it from append through fan-out, so an event
        // lands in the backlog or the live queue but never both.
        let replay = self.replay.lock().await;

        let Some(conn) = self.connections.read().await.get(&id).cloned() else {
            return Vec::new();
        };

        conn.add_subscription(channel).await;
        self.subscriptions
            .write()
            .await
            .entry(channel)
            .or_default()
            .insert(id);

        debug!(connection_id = id, channel = %channel, "Subscribed");

        replay
            .get(&channel)
            .map(ReplayBuffer::snapshot)
            .unwrap_or_default()
    }

    /// Drop a connection's subscription to a channel. Unknown names are
    /// ignored, mirroring subscribe.
    pub async fn unsubscribe(&self, id: ConnectionId, channel_name: &str) {
        let Some(channel) = Channel::parse(channel_name) else {
            return;
        };

        if let Some(conn) = self.connections.read().await.get(&id).cloned() {
            conn.remove_subscription(channel).await;
        }
        if let Some(members) = self.subscriptions.write().await.get_mut(&channel) {
            members.remove(&id);
        }
    }

    /// Fan an event out to every connection subscribed to its channel.
    ///
    /// Delivery is fire-and-forget per connection: a full queue drops that
    /// connection's oldest frame and a closed connection is skipped, so a
    /// stalled consumer never blocks the publisher or its peers. Returns
    /// the number of connections the event was queued for.
    pub async fn publish(&self, event: Event) -> usize {
        let channel = event.channel();

        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(channel = %channel, error = %e, "Failed to serialize event");
                return 0;
            }
        };

        // Held until fan-out completes; see subscribe.
        let mut replay = self.replay.lock().await;
        if let Some(buffer) = replay.get_mut(&channel) {
            buffer.push(event);
        }

        let targets: Vec<ConnectionId> = self
            .subscriptions
            .read()
            .await
            .get(&channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();

        let connections = self.connections.read().await;
        let mut delivered = 0;
        for target in targets {
            if let Some(conn) = connections.get(&target) {
                if conn.enqueue(frame.clone()).await {
                    delivered += 1;
                }
            }
        }

        debug!(channel = %channel, delivered, "Event published");
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Per-connection backpressure drop counters, for observability.
    pub async fn drop_counters(&self) -> HashMap<ConnectionId, u64> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(id, conn)| (*id, conn.dropped_count()))
            .collect()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
