//! Wire envelope exchanged on every tab-to-relay channel.
//!
//! Every frame is a JSON object:
//!
//! ```json
//! { "type": "CSRF_TOKEN", "connectionId": 1, "msg": { "name": "x-csrf-header", "value": "abc" } }
//! ```
//!
//! `type` is either a reserved relay tag ([`CONNECTION`], [`ERROR`]) or an
//! application-defined tag. `connectionId` names the sender on tab-to-relay
//! frames and the assignee on `CONNECTION` frames. Older clients send it as
//! `port`, which is accepted on input.
//!
//! Frames travel as serialized text, so every receiver decodes its own copy
//! of the payload.

use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// Reserved tag of the relay-to-tab identifier assignment.
pub const CONNECTION: &str = "CONNECTION";

/// Reserved tag of relay-to-tab error reports.
pub const ERROR: &str = "ERROR";

/// One message on a relay channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag used for dispatch.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Sender (tab to relay) or assignee (relay to tab).
    #[serde(rename = "connectionId", alias = "port", default)]
    pub connection_id: ConnectionId,
    /// Opaque application payload.
    #[serde(default)]
    pub msg: serde_json::Value,
}

impl Envelope {
    /// Creates an application envelope.
    #[must_use]
    pub fn new(
        msg_type: impl Into<String>,
        connection_id: ConnectionId,
        msg: serde_json::Value,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            connection_id,
            msg,
        }
    }

    /// Builds the `CONNECTION` frame that tells a tab its identifier.
    #[must_use]
    pub fn connection(assigned: ConnectionId) -> Self {
        Self::new(CONNECTION, assigned, serde_json::Value::Null)
    }

    /// Builds a relay-originated `ERROR` frame.
    #[must_use]
    pub fn error(code: u16, message: &str) -> Self {
        Self::new(
            ERROR,
            ConnectionId::UNASSIGNED,
            serde_json::json!({ "code": code, "message": message }),
        )
    }

    /// Returns `true` if this is a `CONNECTION` assignment.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        self.msg_type == CONNECTION
    }

    /// Returns `true` if the tag is reserved for relay-originated frames.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.msg_type == CONNECTION || self.msg_type == ERROR
    }

    /// Encodes the envelope as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the payload cannot be serialized.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes an envelope from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the frame is not a valid envelope.
    pub fn from_frame(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn connection_frame_shape() {
        let frame = Envelope::connection(ConnectionId::new(3))
            .to_frame()
            .unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap_or_default();
        assert_eq!(value["type"], "CONNECTION");
        assert_eq!(value["connectionId"], 3);
    }

    #[test]
    fn accepts_port_alias() {
        let Ok(env) = Envelope::from_frame(r#"{"type":"CSRF_TOKEN","port":2,"msg":"abc"}"#) else {
            panic!("port alias should decode");
        };
        assert_eq!(env.connection_id, ConnectionId::new(2));
        assert_eq!(env.msg, serde_json::json!("abc"));
    }

    #[test]
    fn missing_msg_decodes_as_null() {
        let Ok(env) = Envelope::from_frame(r#"{"type":"PING","connectionId":1}"#) else {
            panic!("msg should be optional");
        };
        assert!(env.msg.is_null());
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(Envelope::from_frame(r#"{"connectionId":1,"msg":null}"#).is_err());
        assert!(Envelope::from_frame("not json").is_err());
    }

    #[test]
    fn reserved_tags() {
        assert!(Envelope::connection(ConnectionId::new(1)).is_reserved());
        assert!(Envelope::error(400, "bad").is_reserved());
        assert!(!Envelope::new("CSRF_TOKEN", ConnectionId::new(1), serde_json::Value::Null).is_reserved());
    }

    #[test]
    fn decoded_copies_are_independent() {
        let original = Envelope::new(
            "CSRF_TOKEN",
            ConnectionId::new(1),
            serde_json::json!({"value": "abc"}),
        );
        let frame = original.to_frame().unwrap_or_default();
        let Ok(mut first) = Envelope::from_frame(&frame) else {
            panic!("decode failed");
        };
        let Ok(second) = Envelope::from_frame(&frame) else {
            panic!("decode failed");
        };
        first.msg["value"] = serde_json::json!("mutated");
        assert_eq!(second, original);
    }
}
