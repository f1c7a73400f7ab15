//! Realtime wiring for the chat view.
//!
//! Owns exactly one subscription: the per-user message channel. The handle
//! (topic plus handler `Rc`) is kept so teardown releases precisely the
//! handler it registered and nothing else.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::MESSAGES_TOPIC_PREFIX;
use crate::debug_log;
use crate::messages::Message;
use crate::models::{ChatMessage, MessageRow};
use crate::network::channel_manager::{ChannelHandler, ChannelManager, Topic};
use crate::network::realtime_client::SendError;
use crate::network::Envelope;
use crate::warn_log;

pub struct ChatRtManager {
    channel_manager: Rc<RefCell<ChannelManager>>,
    topic: Topic,
    handler: ChannelHandler,
}

impl ChatRtManager {
    /// Subscribe to the current user's inbound-message channel.
    pub fn initialize(
        user_id: &str,
        channel_manager: Rc<RefCell<ChannelManager>>,
    ) -> Result<Self, SendError> {
        let topic: Topic = format!("{}{}", MESSAGES_TOPIC_PREFIX, user_id);
        debug_log!("Subscribing chat manager to {}", topic);

        let handler: ChannelHandler = Rc::new(RefCell::new(move |envelope: Envelope| {
            if let Some((chat_id, message)) = decode_message_event(&envelope) {
                crate::state::dispatch_global_message(Message::ReceiveChatMessage {
                    chat_id,
                    message,
                });
            }
        }));

        channel_manager
            .borrow_mut()
            .subscribe(topic.clone(), handler.clone())?;

        Ok(Self {
            channel_manager,
            topic,
            handler,
        })
    }

    /// Release the subscription registered by `initialize`.
    pub fn cleanup(&self) -> Result<(), SendError> {
        debug_log!("Unsubscribing chat manager from {}", self.topic);
        self.channel_manager
            .borrow_mut()
            .unsubscribe_handler(&self.topic, &self.handler)
    }
}

/// Extract the inserted message row from a push frame. Replies, presence
/// frames and non-insert events are ignored.
fn decode_message_event(envelope: &Envelope) -> Option<(String, ChatMessage)> {
    if envelope.event != "INSERT" {
        return None;
    }
    // The row sits under "record"; older feed versions put it at the top
    // level of the payload.
    let raw = envelope
        .payload
        .get("record")
        .unwrap_or(&envelope.payload)
        .clone();
    let row: MessageRow = match serde_json::from_value(raw) {
        Ok(row) => row,
        Err(e) => {
            warn_log!("Undecodable message event: {}", e);
            return None;
        }
    };
    let chat_id = row.chat_id.clone();
    match ChatMessage::try_from(row) {
        Ok(message) => Some((chat_id, message)),
        Err(e) => {
            warn_log!("Dropping message event: {}", e);
            None
        }
    }
}

thread_local! {
    static CHAT_RT: RefCell<Option<ChatRtManager>> = RefCell::new(None);
}

/// Install the singleton chat subscription during bootstrap.
pub fn init_chat_rt(
    user_id: &str,
    channel_manager: Rc<RefCell<ChannelManager>>,
) -> Result<(), SendError> {
    let manager = ChatRtManager::initialize(user_id, channel_manager)?;
    CHAT_RT.with(|cell| *cell.borrow_mut() = Some(manager));
    Ok(())
}

/// Tear down the singleton subscription (sign-out).
pub fn cleanup_chat_rt() -> Result<(), SendError> {
    CHAT_RT.with(|cell| {
        if let Some(manager) = cell.borrow_mut().take() {
            manager.cleanup()?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::realtime_client::{ConnectionState, IRealtimeClient};
    use serde_json::Value;
    use std::any::Any;

    struct MockRealtimeClient {
        sent: Rc<RefCell<Vec<Envelope>>>,
        state: ConnectionState,
    }

    impl IRealtimeClient for MockRealtimeClient {
        fn connect(&mut self) -> Result<(), SendError> {
            Ok(())
        }
        fn send_envelope(&self, frame: &Envelope) -> Result<(), SendError> {
            if self.state != ConnectionState::Connected {
                return Err(SendError("socket not connected".into()));
            }
            self.sent.borrow_mut().push(frame.clone());
            Ok(())
        }
        fn connection_state(&self) -> ConnectionState {
            self.state.clone()
        }
        fn close(&mut self) {}
        fn set_on_connect(&mut self, _: Box<dyn FnMut() + 'static>) {}
        fn set_on_message(&mut self, _: Box<dyn FnMut(Value) + 'static>) {}
        fn set_on_disconnect(&mut self, _: Box<dyn FnMut() + 'static>) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn manager_with_state(
        state: ConnectionState,
    ) -> (Rc<RefCell<ChannelManager>>, Rc<RefCell<Vec<Envelope>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let client: Rc<RefCell<dyn IRealtimeClient>> = Rc::new(RefCell::new(MockRealtimeClient {
            sent: sent.clone(),
            state,
        }));
        (Rc::new(RefCell::new(ChannelManager::new(client))), sent)
    }

    fn manager_with_mock() -> (Rc<RefCell<ChannelManager>>, Rc<RefCell<Vec<Envelope>>>) {
        manager_with_state(ConnectionState::Connected)
    }

    #[test]
    fn initialize_joins_the_per_user_topic() {
        let (mgr, sent) = manager_with_mock();
        let rt = ChatRtManager::initialize("user-1", mgr.clone()).unwrap();

        assert!(mgr.borrow().has_subscription("messages:receiver_id=eq.user-1"));
        assert_eq!(sent.borrow()[0].event, "phx_join");

        rt.cleanup().unwrap();
        assert!(!mgr.borrow().has_subscription("messages:receiver_id=eq.user-1"));
        assert_eq!(sent.borrow().last().map(|e| e.event.clone()).as_deref(), Some("phx_leave"));
    }

    #[test]
    fn initialize_succeeds_before_socket_opens() {
        // Bootstrap subscribes right after connect() returns, while the
        // socket is still opening; the join is deferred, not an error.
        let (mgr, sent) = manager_with_state(ConnectionState::Connecting);
        let rt = ChatRtManager::initialize("user-1", mgr.clone()).unwrap();

        assert!(mgr.borrow().has_subscription("messages:receiver_id=eq.user-1"));
        assert!(sent.borrow().is_empty());
        drop(rt);
    }

    #[test]
    fn decode_extracts_row_from_record_payload() {
        let envelope = Envelope {
            topic: "messages:receiver_id=eq.u2".into(),
            event: "INSERT".into(),
            payload: serde_json::json!({
                "record": {
                    "id": "m1",
                    "chat_id": "c1",
                    "sender_id": "u1",
                    "receiver_id": "u2",
                    "content": "hi",
                    "timestamp": "2026-03-01T10:00:00Z",
                    "read": false,
                }
            }),
            reference: None,
        };
        let (chat_id, message) = decode_message_event(&envelope).unwrap();
        assert_eq!(chat_id, "c1");
        assert_eq!(message.id, "m1");
    }

    #[test]
    fn decode_ignores_replies_and_malformed_payloads() {
        let reply = Envelope {
            topic: "messages:receiver_id=eq.u2".into(),
            event: "phx_reply".into(),
            payload: serde_json::json!({"status": "ok"}),
            reference: Some("r1".into()),
        };
        assert!(decode_message_event(&reply).is_none());

        let malformed = Envelope {
            topic: "messages:receiver_id=eq.u2".into(),
            event: "INSERT".into(),
            payload: serde_json::json!({"record": {"id": "m1"}}),
            reference: None,
        };
        assert!(decode_message_event(&malformed).is_none());
    }
}
