//! Message bus side of the relay.
//!
//! One [`LogBus`] holds a single pattern subscription to `logs:*` on the
//! Redis-compatible bus. Build tasks publish plain text lines to
//! `logs:<projectId>`; every message is handed to
//! [`RelayHub::forward`](crate::RelayHub::forward) unchanged, in the
//! order the bus delivered it.

use std::time::Duration;

use fred::clients::SubscriberClient;
use fred::prelude::*;
use fred::types::Message;
use shipyard_types::{ServerEvent, LOG_CHANNEL_PATTERN};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::error::RelayBusError;
use crate::hub::RelayHub;

/// Notice sent to every client while the bus connection is down.
pub const BUS_DOWN_NOTICE: &str = "log relay disconnected; logs are not being forwarded";

/// How often [`LogBus::run`] checks the bus connection by default.
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the client's internal message and event channels.
///
/// fred's own default (32) is small for a stream of build logs; a relay
/// that falls further behind than this skips messages on every topic.
pub const DEFAULT_BUS_BROADCAST_CAPACITY: usize = 4096;

/// Change in bus connectivity seen between two health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusTransition {
    /// The connection dropped since the last check.
    Lost,
    /// The connection came back since the last check.
    Restored,
}

/// Compare the connection state from the previous check with the current
/// one. Returns `None` when nothing changed.
pub const fn health_transition(was_connected: bool, now_connected: bool) -> Option<BusTransition> {
    match (was_connected, now_connected) {
        (true, false) => Some(BusTransition::Lost),
        (false, true) => Some(BusTransition::Restored),
        _ => None,
    }
}

/// Subscriber connection to the log bus.
#[derive(Clone)]
pub struct LogBus {
    client: SubscriberClient,
}

impl LogBus {
    /// Connect a subscriber client to the bus at `url`.
    ///
    /// The client reconnects with exponential backoff (100ms up to 30s)
    /// and restores its subscriptions after every reconnect. Its message
    /// and event channels hold `broadcast_capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`RelayBusError::Config`] if the URL cannot be parsed.
    /// Returns [`RelayBusError::Bus`] if the connection fails.
    pub async fn connect(url: &str, broadcast_capacity: usize) -> Result<Self, RelayBusError> {
        let config = Config::from_url(url)
            .map_err(|e| RelayBusError::Config(format!("Invalid bus URL: {e}")))?;

        let mut builder = Builder::from_config(config);
        builder
            .set_policy(ReconnectPolicy::new_exponential(0, 100, 30_000, 2))
            .with_performance_config(|perf| {
                perf.broadcast_channel_capacity = broadcast_capacity.max(1);
            });
        let client = builder.build_subscriber_client()?;
        client.init().await?;

        info!(broadcast_capacity, "Connected to log bus");
        Ok(Self { client })
    }

    /// Subscribe to `logs:*` and forward every message into `hub`.
    ///
    /// Runs until the bus message stream closes. Every connection error
    /// the client reports is logged at `error` and sent to all clients as
    /// a [`ServerEvent::Error`]; every reconnect is logged. The connection
    /// state is also checked every `health_interval` so a drop that raised
    /// no error event is still surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`RelayBusError::Bus`] if the subscription cannot be made,
    /// or [`RelayBusError::Closed`] when the message stream ends.
    pub async fn run(&self, hub: RelayHub, health_interval: Duration) -> Result<(), RelayBusError> {
        let mut messages = self.client.message_rx();
        let mut errors = self.client.error_rx();
        let mut reconnects = self.client.reconnect_rx();
        let _resubscribe = self.client.manage_subscriptions();
        self.client.psubscribe(LOG_CHANNEL_PATTERN).await?;
        info!(pattern = LOG_CHANNEL_PATTERN, "log relay subscribed");

        let mut health = tokio::time::interval(health_interval);
        let mut connected = true;

        loop {
            tokio::select! {
                received = messages.recv() => {
                    match received {
                        Ok(message) => relay(&hub, &message).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "log relay lagged behind the bus, messages skipped");
                        }
                        Err(RecvError::Closed) => {
                            error!("log bus message stream closed");
                            return Err(RelayBusError::Closed);
                        }
                    }
                }
                received = errors.recv() => {
                    match received {
                        Ok((err, server)) => {
                            error!(error = %err, server = ?server, "log bus connection error");
                            notify_bus_down(&hub).await;
                            connected = false;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            error!(skipped, "log bus errors arrived faster than they were read");
                            notify_bus_down(&hub).await;
                            connected = false;
                        }
                        Err(RecvError::Closed) => {
                            error!("log bus error stream closed");
                            return Err(RelayBusError::Closed);
                        }
                    }
                }
                received = reconnects.recv() => {
                    match received {
                        Ok(server) => {
                            info!(server = %server, "log bus connection restored");
                            connected = true;
                        }
                        Err(RecvError::Lagged(_)) => {
                            info!("log bus connection restored");
                            connected = true;
                        }
                        Err(RecvError::Closed) => {
                            error!("log bus reconnect stream closed");
                            return Err(RelayBusError::Closed);
                        }
                    }
                }
                _ = health.tick() => {
                    let now = self.client.is_connected();
                    match health_transition(connected, now) {
                        Some(BusTransition::Lost) => {
                            error!("log bus connection lost, forwarding suspended");
                            notify_bus_down(&hub).await;
                        }
                        Some(BusTransition::Restored) => info!("log bus connection restored"),
                        None => {}
                    }
                    connected = now;
                }
            }
        }
    }

    /// Close the bus connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayBusError::Bus`] if the QUIT command fails.
    pub async fn quit(&self) -> Result<(), RelayBusError> {
        self.client.quit().await?;
        Ok(())
    }
}

/// Tell every connected client that logs are not being forwarded.
async fn notify_bus_down(hub: &RelayHub) -> usize {
    let notified = hub
        .notify_all(&ServerEvent::Error(String::from(BUS_DOWN_NOTICE)))
        .await;
    debug!(notified, "clients told about bus outage");
    notified
}

async fn relay(hub: &RelayHub, message: &Message) {
    let channel: &str = &message.channel;
    let payload = payload_text(&message.value);
    let delivery = hub.forward(channel, &payload).await;
    debug!(
        channel,
        delivered = delivery.delivered,
        dropped = delivery.dropped,
        "log line relayed"
    );
}

/// Render a bus payload as text. Invalid UTF-8 is replaced, not rejected.
fn payload_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => other
            .as_str()
            .map(std::borrow::Cow::into_owned)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fred::bytes::Bytes;
    use fred::types::MessageKind;

    use super::*;
    use crate::hub::ClientHandle;

    fn bus_message(channel: &str, text: &str) -> Message {
        Message {
            channel: String::from(channel).into(),
            value: Value::String(String::from(text).into()),
            kind: MessageKind::PMessage,
            server: Server::new(String::from("localhost"), 6379),
        }
    }

    fn drain(client: &mut ClientHandle) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = client.events.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn only_state_changes_are_transitions() {
        assert_eq!(health_transition(true, false), Some(BusTransition::Lost));
        assert_eq!(health_transition(false, true), Some(BusTransition::Restored));
        assert_eq!(health_transition(true, true), None);
        assert_eq!(health_transition(false, false), None);
    }

    #[tokio::test]
    async fn bus_message_reaches_the_room_named_by_its_channel() {
        let hub = RelayHub::new(8);
        let mut watcher = hub.connect().await;
        let mut other = hub.connect().await;
        hub.subscribe(watcher.id, "logs:abc").await.unwrap();
        hub.subscribe(other.id, "logs:xyz").await.unwrap();
        drain(&mut watcher);
        drain(&mut other);

        relay(&hub, &bus_message("logs:abc", "Cloning repository")).await;

        assert_eq!(
            drain(&mut watcher),
            vec![ServerEvent::Message(String::from("Cloning repository"))]
        );
        assert!(drain(&mut other).is_empty());
    }

    #[tokio::test]
    async fn lost_connection_sends_the_outage_notice_to_everyone() {
        let hub = RelayHub::new(8);
        let mut joined = hub.connect().await;
        let mut idle = hub.connect().await;
        hub.subscribe(joined.id, "logs:abc").await.unwrap();
        drain(&mut joined);

        assert_eq!(health_transition(true, false), Some(BusTransition::Lost));
        assert_eq!(notify_bus_down(&hub).await, 2);

        let notice = ServerEvent::Error(String::from(BUS_DOWN_NOTICE));
        assert_eq!(drain(&mut joined), vec![notice.clone()]);
        assert_eq!(drain(&mut idle), vec![notice]);
    }

    #[test]
    fn text_payloads_pass_through_unchanged() {
        let value = Value::String("Step 3/7 : RUN npm install".into());
        assert_eq!(payload_text(&value), "Step 3/7 : RUN npm install");
    }

    #[test]
    fn byte_payloads_are_decoded_lossily() {
        let value = Value::Bytes(Bytes::from_static(b"ok \xff done"));
        assert_eq!(payload_text(&value), "ok \u{fffd} done");
    }

    #[test]
    fn numeric_payloads_render_as_text() {
        assert_eq!(payload_text(&Value::Integer(42)), "42");
    }
}
