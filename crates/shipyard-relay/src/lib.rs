//! Realtime log relay for Shipyard.
//!
//! Build tasks publish log lines to `logs:<projectId>` on a Redis-compatible
//! bus. The [`LogBus`] holds one pattern subscription to `logs:*` and hands
//! each message to the [`RelayHub`], which fans it out to the realtime
//! connections that joined the matching room.
//!
//! The hub knows nothing about sockets: a connection is a bounded queue of
//! [`ServerEvent`](shipyard_types::ServerEvent)s that the transport layer
//! drains.

pub mod bus;
pub mod error;
pub mod hub;

pub use bus::{
    health_transition, BusTransition, LogBus, BUS_DOWN_NOTICE, DEFAULT_BUS_BROADCAST_CAPACITY,
    DEFAULT_HEALTH_INTERVAL,
};
pub use error::{HubError, RelayBusError};
pub use hub::{ClientHandle, Delivery, RelayHub, DEFAULT_CLIENT_QUEUE_CAPACITY};
