use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use super::messages::{builders, Envelope};
use super::realtime_client::{ConnectionState, IRealtimeClient, SendError};
use crate::debug_log;
use crate::error_log;
use crate::warn_log;

/// A channel topic string, e.g. "messages:receiver_id=eq.<user-id>".
pub type Topic = String;

/// Handler for frames delivered on a subscribed topic.
pub type ChannelHandler = Rc<RefCell<dyn FnMut(Envelope)>>;

/// Manages channel joins and routes incoming frames to topic handlers.
///
/// The server is joined once per topic regardless of how many local handlers
/// are registered; the join is released when the last handler goes away.
pub struct ChannelManager {
    topic_handlers: HashMap<Topic, Vec<ChannelHandler>>,
    joined_topics: HashSet<Topic>,
    client: Rc<RefCell<dyn IRealtimeClient>>,
}

impl ChannelManager {
    pub fn new(client: Rc<RefCell<dyn IRealtimeClient>>) -> Self {
        Self {
            topic_handlers: HashMap::new(),
            joined_topics: HashSet::new(),
            client,
        }
    }

    /// Register a handler for a topic, joining the channel on the server if
    /// this is the first local interest in it.
    ///
    /// Subscribing before the socket is open is fine: the topic is recorded
    /// and its join is issued by the `rejoin_all` pass that runs on connect.
    pub fn subscribe(&mut self, topic: Topic, handler: ChannelHandler) -> Result<(), SendError> {
        let is_new_topic = !self.joined_topics.contains(&topic);

        self.topic_handlers
            .entry(topic.clone())
            .or_default()
            .push(handler);

        if is_new_topic {
            self.joined_topics.insert(topic.clone());
            if self.client_connected() {
                self.send_frame(&builders::join(&topic))?;
            } else {
                debug_log!("Deferring join for {} until the feed connects", topic);
            }
        }
        Ok(())
    }

    /// Remove one specific handler (by `Rc` identity). Leaves the channel
    /// when the last handler for the topic is gone.
    pub fn unsubscribe_handler(
        &mut self,
        topic: &Topic,
        handler_to_remove: &ChannelHandler,
    ) -> Result<(), SendError> {
        let mut last_removed = false;

        if let Some(handlers) = self.topic_handlers.get_mut(topic) {
            if let Some(pos) = handlers.iter().position(|h| Rc::ptr_eq(h, handler_to_remove)) {
                handlers.remove(pos);
                debug_log!("Removed handler for topic {}", topic);
                last_removed = handlers.is_empty();
            } else {
                warn_log!("Handler not found for topic {} during unsubscribe", topic);
            }
        }

        if last_removed {
            self.topic_handlers.remove(topic);
            // A leave frame only makes sense on a live socket; a dropped
            // socket loses its server-side membership anyway.
            if self.joined_topics.remove(topic) && self.client_connected() {
                self.send_frame(&builders::leave(topic))?;
            }
        }
        Ok(())
    }

    /// Re-join every tracked topic. Called after the socket reconnects,
    /// since server-side channel membership does not survive a drop.
    pub fn rejoin_all(&self) -> Result<(), SendError> {
        for topic in &self.joined_topics {
            debug_log!("Re-joining topic {}", topic);
            self.send_frame(&builders::join(topic))?;
        }
        Ok(())
    }

    fn client_connected(&self) -> bool {
        matches!(
            self.client.try_borrow().map(|c| c.connection_state()),
            Ok(ConnectionState::Connected)
        )
    }

    fn send_frame(&self, frame: &Envelope) -> Result<(), SendError> {
        match self.client.try_borrow() {
            Ok(client) => client.send_envelope(frame),
            Err(_) => Err(SendError("realtime client is busy".into())),
        }
    }

    fn handlers_for(&self, topic: &str) -> Vec<ChannelHandler> {
        self.topic_handlers
            .get(topic)
            .map(|v| v.to_vec())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn has_subscription(&self, topic: &str) -> bool {
        self.joined_topics.contains(topic)
    }
}

/// Route one incoming frame to the handlers registered for its topic.
///
/// The manager borrow is held only long enough to clone the handler list;
/// handlers then run with no outstanding borrow, so a handler is free to
/// re-enter the manager (subscribe, unsubscribe) without panicking.
pub fn route_incoming(manager: &Rc<RefCell<ChannelManager>>, frame: Value) {
    let envelope = match serde_json::from_value::<Envelope>(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            error_log!("Dropping frame with invalid envelope: {}", e);
            return;
        }
    };

    let handlers = manager.borrow().handlers_for(&envelope.topic);
    if handlers.is_empty() {
        debug_log!("No handlers for topic {}", envelope.topic);
        return;
    }
    for handler in handlers {
        (handler.borrow_mut())(envelope.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    /// Recording stand-in for the socket client.
    struct MockRealtimeClient {
        sent: Rc<RefCell<Vec<Envelope>>>,
        state: Rc<RefCell<ConnectionState>>,
    }

    impl MockRealtimeClient {
        fn new() -> (Rc<RefCell<dyn IRealtimeClient>>, Rc<RefCell<Vec<Envelope>>>) {
            let (client, sent, _) = Self::with_state(ConnectionState::Connected);
            (client, sent)
        }

        fn with_state(
            initial: ConnectionState,
        ) -> (
            Rc<RefCell<dyn IRealtimeClient>>,
            Rc<RefCell<Vec<Envelope>>>,
            Rc<RefCell<ConnectionState>>,
        ) {
            let sent = Rc::new(RefCell::new(Vec::new()));
            let state = Rc::new(RefCell::new(initial));
            let client = Rc::new(RefCell::new(MockRealtimeClient {
                sent: sent.clone(),
                state: state.clone(),
            }));
            (client, sent, state)
        }
    }

    impl IRealtimeClient for MockRealtimeClient {
        fn connect(&mut self) -> Result<(), SendError> {
            Ok(())
        }
        fn send_envelope(&self, frame: &Envelope) -> Result<(), SendError> {
            if *self.state.borrow() != ConnectionState::Connected {
                return Err(SendError("socket not connected".into()));
            }
            self.sent.borrow_mut().push(frame.clone());
            Ok(())
        }
        fn connection_state(&self) -> ConnectionState {
            self.state.borrow().clone()
        }
        fn close(&mut self) {}
        fn set_on_connect(&mut self, _: Box<dyn FnMut() + 'static>) {}
        fn set_on_message(&mut self, _: Box<dyn FnMut(Value) + 'static>) {}
        fn set_on_disconnect(&mut self, _: Box<dyn FnMut() + 'static>) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn noop_handler() -> ChannelHandler {
        Rc::new(RefCell::new(|_: Envelope| {}))
    }

    fn events(sent: &Rc<RefCell<Vec<Envelope>>>) -> Vec<(String, String)> {
        sent.borrow()
            .iter()
            .map(|e| (e.topic.clone(), e.event.clone()))
            .collect()
    }

    #[test]
    fn first_subscription_joins_channel_once() {
        let (client, sent) = MockRealtimeClient::new();
        let mut mgr = ChannelManager::new(client);

        mgr.subscribe("messages:receiver_id=eq.u1".into(), noop_handler())
            .unwrap();
        mgr.subscribe("messages:receiver_id=eq.u1".into(), noop_handler())
            .unwrap();

        assert_eq!(
            events(&sent),
            vec![("messages:receiver_id=eq.u1".to_string(), "phx_join".to_string())]
        );
    }

    #[test]
    fn last_handler_removal_leaves_channel() {
        let (client, sent) = MockRealtimeClient::new();
        let mut mgr = ChannelManager::new(client);
        let topic: Topic = "messages:receiver_id=eq.u1".into();

        let h1 = noop_handler();
        let h2 = noop_handler();
        mgr.subscribe(topic.clone(), h1.clone()).unwrap();
        mgr.subscribe(topic.clone(), h2.clone()).unwrap();

        mgr.unsubscribe_handler(&topic, &h1).unwrap();
        assert!(mgr.has_subscription(&topic));

        mgr.unsubscribe_handler(&topic, &h2).unwrap();
        assert!(!mgr.has_subscription(&topic));
        assert_eq!(events(&sent).last().map(|e| e.1.clone()).as_deref(), Some("phx_leave"));
    }

    #[test]
    fn subscribe_before_connect_defers_join_until_rejoin() {
        let (client, sent, state) = MockRealtimeClient::with_state(ConnectionState::Connecting);
        let mut mgr = ChannelManager::new(client);
        let topic: Topic = "messages:receiver_id=eq.u1".into();

        // Session wiring subscribes before the socket has finished opening.
        mgr.subscribe(topic.clone(), noop_handler()).unwrap();
        assert!(mgr.has_subscription(&topic));
        assert!(sent.borrow().is_empty());

        // Once the socket opens, the on-connect rejoin pass issues the join.
        *state.borrow_mut() = ConnectionState::Connected;
        mgr.rejoin_all().unwrap();
        assert_eq!(
            events(&sent),
            vec![(topic, "phx_join".to_string())]
        );
    }

    #[test]
    fn rejoin_all_resends_joins_for_tracked_topics() {
        let (client, sent) = MockRealtimeClient::new();
        let mut mgr = ChannelManager::new(client);
        mgr.subscribe("messages:receiver_id=eq.u1".into(), noop_handler())
            .unwrap();

        sent.borrow_mut().clear();
        mgr.rejoin_all().unwrap();
        assert_eq!(
            events(&sent),
            vec![("messages:receiver_id=eq.u1".to_string(), "phx_join".to_string())]
        );
    }

    #[test]
    fn incoming_frames_reach_the_topic_handler() {
        let (client, _sent) = MockRealtimeClient::new();
        let mgr = Rc::new(RefCell::new(ChannelManager::new(client)));

        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler: ChannelHandler = Rc::new(RefCell::new(move |env: Envelope| {
            seen_clone.borrow_mut().push(env.event);
        }));
        mgr.borrow_mut()
            .subscribe("messages:receiver_id=eq.u1".into(), handler)
            .unwrap();

        route_incoming(
            &mgr,
            serde_json::json!({
                "topic": "messages:receiver_id=eq.u1",
                "event": "INSERT",
                "payload": {"id": "m1"},
                "ref": null,
            }),
        );
        route_incoming(
            &mgr,
            serde_json::json!({
                "topic": "other:topic",
                "event": "INSERT",
                "payload": {},
                "ref": null,
            }),
        );

        assert_eq!(*seen.borrow(), vec!["INSERT".to_string()]);
    }

    #[test]
    fn handler_may_reenter_the_manager_during_dispatch() {
        let (client, _sent) = MockRealtimeClient::new();
        let mgr = Rc::new(RefCell::new(ChannelManager::new(client)));

        let mgr_clone = mgr.clone();
        let handler: ChannelHandler = Rc::new(RefCell::new(move |_: Envelope| {
            mgr_clone
                .borrow_mut()
                .subscribe("presence:u1".into(), Rc::new(RefCell::new(|_: Envelope| {})))
                .unwrap();
        }));
        mgr.borrow_mut()
            .subscribe("messages:receiver_id=eq.u1".into(), handler)
            .unwrap();

        route_incoming(
            &mgr,
            serde_json::json!({
                "topic": "messages:receiver_id=eq.u1",
                "event": "INSERT",
                "payload": {},
                "ref": null,
            }),
        );

        assert!(mgr.borrow().has_subscription("presence:u1"));
    }
}
