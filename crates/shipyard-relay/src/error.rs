//! Error types for the log relay.

use shipyard_types::ConnectionId;

/// Errors from hub operations on behalf of one connection.
///
/// These never affect other connections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The connection was never registered or already left.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The connection's queue had no room for the join acknowledgement,
    /// so the connection was not joined.
    #[error("queue of connection {0} is full")]
    QueueFull(ConnectionId),

    /// A subscribe request named no channel.
    #[error("channel name must not be empty")]
    EmptyTopic,
}

/// Errors from the message bus subscription. Any of these stops log
/// forwarding for every topic.
#[derive(Debug, thiserror::Error)]
pub enum RelayBusError {
    /// The bus URL could not be parsed.
    #[error("bus config error: {0}")]
    Config(String),

    /// A bus command failed.
    #[error("bus error: {0}")]
    Bus(#[from] fred::error::Error),

    /// The bus message stream ended.
    #[error("bus message stream closed")]
    Closed,
}
