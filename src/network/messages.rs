//! Wire frames for the push feed.
//!
//! Every frame in both directions is one envelope: `topic` scopes it to a
//! channel, `event` names what happened, `payload` carries the row data and
//! `ref` correlates replies to the requests that caused them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

pub mod builders {
    use super::*;

    fn new_ref() -> Option<String> {
        Some(Uuid::new_v4().to_string())
    }

    /// Join a channel; the feed starts delivering events for `topic` once
    /// the server acknowledges.
    pub fn join(topic: &str) -> Envelope {
        Envelope {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: serde_json::json!({}),
            reference: new_ref(),
        }
    }

    pub fn leave(topic: &str) -> Envelope {
        Envelope {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: serde_json::json!({}),
            reference: new_ref(),
        }
    }

    /// Keepalive frame; the feed drops silent connections.
    pub fn heartbeat() -> Envelope {
        Envelope {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: serde_json::json!({}),
            reference: new_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_has_expected_shape() {
        let frame = builders::join("messages:receiver_id=eq.u1");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["topic"], "messages:receiver_id=eq.u1");
        assert_eq!(json["event"], "phx_join");
        assert!(json["ref"].is_string());
    }

    #[test]
    fn refs_are_unique_per_frame() {
        let a = builders::join("t");
        let b = builders::join("t");
        assert_ne!(a.reference, b.reference);
    }

    #[test]
    fn envelope_round_trips_ref_field() {
        let raw = r#"{"topic":"t","event":"INSERT","payload":{"x":1},"ref":null}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.event, "INSERT");
        assert!(env.reference.is_none());
    }
}
