//! Connection registry and room fan-out.
//!
//! Every realtime connection owns a bounded outbound queue. The hub keeps
//! two indexes under one lock: connection -> (queue, joined topics) and
//! topic -> members. A room exists only while it has members.
//!
//! Fan-out never awaits a client: [`RelayHub::forward`] uses `try_send`,
//! so a slow or dead client loses its own messages and nobody else's.
//! Messages for a topic are enqueued in the order `forward` is called,
//! which is bus order when called from the single bus loop.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use shipyard_types::{is_log_channel, ConnectionId, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::HubError;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

struct Member {
    tx: mpsc::Sender<ServerEvent>,
    topics: BTreeSet<String>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Member>,
    rooms: HashMap<String, BTreeSet<ConnectionId>>,
}

impl Registry {
    /// Drop `id` from every room it joined, then forget it.
    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(member) = self.connections.remove(&id) else {
            return false;
        };
        for topic in &member.topics {
            if let Some(room) = self.rooms.get_mut(topic) {
                room.remove(&id);
                if room.is_empty() {
                    self.rooms.remove(topic);
                }
            }
        }
        true
    }
}

/// The receiving side of a registered connection.
#[derive(Debug)]
pub struct ClientHandle {
    /// The connection's id, used for subscribe and disconnect.
    pub id: ConnectionId,
    /// Events to write to the client's socket, in order.
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Outcome of forwarding one bus message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Members whose queue accepted the message.
    pub delivered: usize,
    /// Members whose queue was full; the message was skipped for them.
    pub dropped: usize,
    /// Members whose queue was closed; they were removed.
    pub disconnected: usize,
}

/// Topic-scoped realtime fan-out.
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct RelayHub {
    registry: Arc<RwLock<Registry>>,
    queue_capacity: usize,
}

impl RelayHub {
    /// Create a hub whose connections buffer up to `queue_capacity` events.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new connection.
    pub async fn connect(&self) -> ClientHandle {
        let id = ConnectionId::new();
        let (tx, events) = mpsc::channel(self.queue_capacity);
        self.registry.write().await.connections.insert(
            id,
            Member {
                tx,
                topics: BTreeSet::new(),
            },
        );
        debug!(connection = %id, "realtime client connected");
        ClientHandle { id, events }
    }

    /// Join `id` to the room for `topic` and acknowledge the join.
    ///
    /// The topic is used exactly as given. The acknowledgement is queued
    /// while the registry is still locked, so it reaches the client before
    /// any message for `topic`; a client whose acknowledgement cannot be
    /// queued is not joined. Joining a room twice is harmless and
    /// acknowledged again.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::EmptyTopic`] for a blank topic,
    /// [`HubError::QueueFull`] if the acknowledgement does not fit in the
    /// client's queue, and [`HubError::UnknownConnection`] if `id` is not
    /// registered.
    pub async fn subscribe(&self, id: ConnectionId, topic: &str) -> Result<(), HubError> {
        if topic.trim().is_empty() {
            return Err(HubError::EmptyTopic);
        }

        let mut registry = self.registry.write().await;
        let member = registry
            .connections
            .get_mut(&id)
            .ok_or(HubError::UnknownConnection(id))?;
        match member.tx.try_send(ServerEvent::joined(topic)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection = %id, topic, "client queue full, join refused");
                return Err(HubError::QueueFull(id));
            }
            Err(TrySendError::Closed(_)) => {
                registry.remove(id);
                return Err(HubError::UnknownConnection(id));
            }
        }
        member.topics.insert(topic.to_owned());
        registry
            .rooms
            .entry(topic.to_owned())
            .or_default()
            .insert(id);

        info!(connection = %id, topic, "client joined room");
        Ok(())
    }

    /// Remove `id` from every room. Unknown ids are ignored.
    pub async fn disconnect(&self, id: ConnectionId) {
        if self.registry.write().await.remove(id) {
            debug!(connection = %id, "realtime client disconnected");
        }
    }

    /// Send `payload` verbatim to every member of the room named `channel`.
    ///
    /// Channels outside the `logs:` namespace are ignored.
    pub async fn forward(&self, channel: &str, payload: &str) -> Delivery {
        let mut delivery = Delivery::default();
        if !is_log_channel(channel) {
            return delivery;
        }
        let mut closed = Vec::new();
        {
            let registry = self.registry.read().await;
            let Some(room) = registry.rooms.get(channel) else {
                return delivery;
            };
            for id in room {
                let Some(member) = registry.connections.get(id) else {
                    continue;
                };
                match member.tx.try_send(ServerEvent::Message(payload.to_owned())) {
                    Ok(()) => delivery.delivered = delivery.delivered.saturating_add(1),
                    Err(TrySendError::Full(_)) => {
                        delivery.dropped = delivery.dropped.saturating_add(1);
                        debug!(connection = %id, channel, "client queue full, log line dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            delivery.disconnected = closed.len();
            let mut registry = self.registry.write().await;
            for id in closed {
                registry.remove(id);
            }
        }
        delivery
    }

    /// Send `event` to every connection regardless of rooms.
    ///
    /// Used to tell clients the relay stopped forwarding. Returns the
    /// number of connections that accepted the event.
    pub async fn notify_all(&self, event: &ServerEvent) -> usize {
        let registry = self.registry.read().await;
        registry
            .connections
            .values()
            .filter(|member| member.tx.try_send(event.clone()).is_ok())
            .count()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.registry.read().await.rooms.len()
    }

    /// Number of members in the room for `topic`.
    pub async fn member_count(&self, topic: &str) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(topic)
            .map_or(0, BTreeSet::len)
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_QUEUE_CAPACITY)
    }
}
