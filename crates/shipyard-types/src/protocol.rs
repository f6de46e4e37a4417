//! Realtime socket protocol.
//!
//! Every frame is a JSON text frame of the form
//! `{"event": <name>, "data": <payload>}`.
//!
//! | Direction | Event | Payload |
//! |-----------|-------|---------|
//! | client -> server | `subscribe` | channel name, e.g. `logs:calm-eager-otter` |
//! | server -> client | `message` | join acknowledgement or a relayed log line |
//! | server -> client | `error` | relay disruption notice |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Join the room for the given channel.
    Subscribe(String),
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A join acknowledgement or a log line, carried verbatim.
    Message(String),
    /// The relay stopped forwarding logs.
    Error(String),
}

impl ServerEvent {
    /// Acknowledgement sent after a successful subscribe.
    pub fn joined(channel: &str) -> Self {
        Self::Message(format!("Joined: {channel}"))
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`]; in practice encoding a
    /// string payload cannot fail.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientEvent {
    /// Decode a JSON text frame sent by a client.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] for malformed or unknown events.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_decodes() {
        let event = ClientEvent::from_frame(r#"{"event":"subscribe","data":"logs:abc"}"#).unwrap();
        assert_eq!(event, ClientEvent::Subscribe(String::from("logs:abc")));
    }

    #[test]
    fn unknown_events_are_errors() {
        assert!(ClientEvent::from_frame(r#"{"event":"unsubscribe","data":"logs:abc"}"#).is_err());
        assert!(ClientEvent::from_frame("logs:abc").is_err());
    }

    #[test]
    fn join_ack_echoes_channel() {
        let frame = ServerEvent::joined("logs:abc").to_frame().unwrap();
        assert_eq!(frame, r#"{"event":"message","data":"Joined: logs:abc"}"#);
    }

    #[test]
    fn payload_is_carried_verbatim() {
        let line = "{\"level\":\"info\",\"msg\":\"npm run build\"}\n";
        let frame = ServerEvent::Message(String::from(line)).to_frame().unwrap();
        let back: ServerEvent = serde_json::from_str(&frame).unwrap();
        assert_eq!(back, ServerEvent::Message(String::from(line)));
    }
}
