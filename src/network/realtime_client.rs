//! Push-feed socket client.
//!
//! [`IRealtimeClient`] is the seam the channel layer talks through; the
//! production [`RealtimeClient`] wraps a browser WebSocket with reconnect
//! and heartbeat, and tests substitute a recording mock.

use std::any::Any;

use serde_json::Value;
use thiserror::Error;

use super::messages::Envelope;

#[derive(Debug, Error)]
#[error("realtime send failed: {0}")]
pub struct SendError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

pub trait IRealtimeClient: Any {
    fn connect(&mut self) -> Result<(), SendError>;
    fn send_envelope(&self, frame: &Envelope) -> Result<(), SendError>;
    fn connection_state(&self) -> ConnectionState;
    fn close(&mut self);
    fn set_on_connect(&mut self, callback: Box<dyn FnMut() + 'static>);
    fn set_on_message(&mut self, callback: Box<dyn FnMut(Value) + 'static>);
    fn set_on_disconnect(&mut self, callback: Box<dyn FnMut() + 'static>);
    fn as_any(&self) -> &dyn Any;
}

#[cfg(target_arch = "wasm32")]
pub use wasm::RealtimeClient;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{MessageEvent, WebSocket};

    use crate::debug_log;
    use crate::error_log;
    use crate::network::messages::builders;
    use crate::warn_log;

    const INITIAL_BACKOFF_MS: u32 = 1_000;
    const MAX_BACKOFF_MS: u32 = 30_000;
    const HEARTBEAT_MS: u32 = 30_000;

    type Callback = Rc<RefCell<dyn FnMut()>>;
    type MessageCallback = Rc<RefCell<dyn FnMut(Value)>>;

    /// Browser WebSocket wrapper with capped exponential-backoff reconnect
    /// and a periodic heartbeat frame.
    ///
    /// The socket slot is shared across clones: the reconnect task runs on a
    /// clone, and the replacement socket must be visible to the handle held
    /// inside the app state.
    #[derive(Clone)]
    pub struct RealtimeClient {
        url: String,
        websocket: Rc<RefCell<Option<WebSocket>>>,
        state: Rc<RefCell<ConnectionState>>,
        reconnect_attempt: Rc<RefCell<u32>>,
        on_connect_callback: Option<Callback>,
        on_message_callback: Option<MessageCallback>,
        on_disconnect_callback: Option<Callback>,
    }

    impl RealtimeClient {
        pub fn new(url: String) -> Self {
            Self {
                url,
                websocket: Rc::new(RefCell::new(None)),
                state: Rc::new(RefCell::new(ConnectionState::Disconnected)),
                reconnect_attempt: Rc::new(RefCell::new(0)),
                on_connect_callback: None,
                on_message_callback: None,
                on_disconnect_callback: None,
            }
        }

        fn backoff_ms(&self) -> u32 {
            let attempt = *self.reconnect_attempt.borrow();
            (INITIAL_BACKOFF_MS * 2_u32.pow(attempt.min(10))).min(MAX_BACKOFF_MS)
        }

        fn establish_connection(&mut self) -> Result<WebSocket, SendError> {
            let ws = WebSocket::new(&self.url)
                .map_err(|e| SendError(format!("WebSocket::new failed: {e:?}")))?;

            let state_clone = self.state.clone();
            let reconnect_attempt_clone = self.reconnect_attempt.clone();
            let on_connect_cb = self.on_connect_callback.clone();
            let ws_for_heartbeat = ws.clone();

            let onopen = Closure::wrap(Box::new(move |_: web_sys::Event| {
                debug_log!("Push feed connected");
                *state_clone.borrow_mut() = ConnectionState::Connected;
                *reconnect_attempt_clone.borrow_mut() = 0;

                start_heartbeat(ws_for_heartbeat.clone(), state_clone.clone());

                if let Some(cb) = &on_connect_cb {
                    (cb.borrow_mut())();
                }
            }) as Box<dyn FnMut(web_sys::Event)>);
            ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
            onopen.forget();

            let onerror = Closure::wrap(Box::new(move |e: web_sys::Event| {
                error_log!("Push feed socket error: {:?}", e);
                // Errors surface as a close; state changes there.
            }) as Box<dyn FnMut(web_sys::Event)>);
            ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();

            let state_clone = self.state.clone();
            let reconnect_attempt_clone = self.reconnect_attempt.clone();
            let on_disconnect_cb = self.on_disconnect_callback.clone();
            let client_for_reconnect = self.clone();
            let onclose = Closure::wrap(Box::new(move |_: web_sys::Event| {
                debug_log!("Push feed closed");
                *state_clone.borrow_mut() = ConnectionState::Disconnected;

                if let Some(cb) = &on_disconnect_cb {
                    (cb.borrow_mut())();
                }

                *reconnect_attempt_clone.borrow_mut() += 1;
                client_for_reconnect.schedule_reconnect();
            }) as Box<dyn FnMut(web_sys::Event)>);
            ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
            onclose.forget();

            let on_message_cb = self.on_message_callback.clone();
            let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
                let Ok(text) = event.data().dyn_into::<js_sys::JsString>() else {
                    warn_log!("Ignoring non-text push frame");
                    return;
                };
                let Some(raw) = text.as_string() else { return };
                match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => {
                        if let Some(cb) = &on_message_cb {
                            (cb.borrow_mut())(value);
                        }
                    }
                    Err(e) => error_log!("Unparseable push frame: {} ({})", raw, e),
                }
            }) as Box<dyn FnMut(MessageEvent)>);
            ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            onmessage.forget();

            Ok(ws)
        }

        fn schedule_reconnect(&self) {
            let delay = self.backoff_ms();
            let mut client = self.clone();
            debug_log!("Reconnecting push feed in {}ms", delay);
            spawn_local(async move {
                TimeoutFuture::new(delay).await;
                if *client.state.borrow() != ConnectionState::Disconnected {
                    return;
                }
                *client.state.borrow_mut() = ConnectionState::Connecting;
                match client.establish_connection() {
                    Ok(ws) => *client.websocket.borrow_mut() = Some(ws),
                    Err(e) => {
                        error_log!("Reconnect attempt failed: {}", e);
                        *client.state.borrow_mut() = ConnectionState::Disconnected;
                        *client.reconnect_attempt.borrow_mut() += 1;
                        client.schedule_reconnect();
                    }
                }
            });
        }
    }

    /// One heartbeat loop per connection; exits as soon as the connection
    /// it was started for is no longer the connected one.
    fn start_heartbeat(ws: WebSocket, state: Rc<RefCell<ConnectionState>>) {
        spawn_local(async move {
            loop {
                TimeoutFuture::new(HEARTBEAT_MS).await;
                if *state.borrow() != ConnectionState::Connected {
                    break;
                }
                let frame = builders::heartbeat();
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(_) => break,
                };
                if ws.send_with_str(&json).is_err() {
                    break;
                }
            }
        });
    }

    impl IRealtimeClient for RealtimeClient {
        fn connect(&mut self) -> Result<(), SendError> {
            debug_log!("Opening push feed connection");
            *self.reconnect_attempt.borrow_mut() = 0;
            *self.state.borrow_mut() = ConnectionState::Connecting;
            let ws = self.establish_connection()?;
            *self.websocket.borrow_mut() = Some(ws);
            Ok(())
        }

        fn send_envelope(&self, frame: &Envelope) -> Result<(), SendError> {
            let slot = self.websocket.borrow();
            let Some(ws) = slot.as_ref() else {
                return Err(SendError("socket not initialized".into()));
            };
            if *self.state.borrow() != ConnectionState::Connected {
                return Err(SendError("socket not connected".into()));
            }
            let json = serde_json::to_string(frame)
                .map_err(|e| SendError(format!("serialization error: {e}")))?;
            ws.send_with_str(&json)
                .map_err(|e| SendError(format!("{e:?}")))
        }

        fn connection_state(&self) -> ConnectionState {
            self.state.borrow().clone()
        }

        fn close(&mut self) {
            if let Some(ws) = self.websocket.borrow_mut().take() {
                // Detach the close handler first so a deliberate close never
                // triggers the reconnect path.
                ws.set_onclose(None);
                *self.state.borrow_mut() = ConnectionState::Disconnected;
                let _ = ws.close();
            }
        }

        fn set_on_connect(&mut self, callback: Box<dyn FnMut() + 'static>) {
            self.on_connect_callback = Some(Rc::new(RefCell::new(callback)));
        }

        fn set_on_message(&mut self, callback: Box<dyn FnMut(Value) + 'static>) {
            self.on_message_callback = Some(Rc::new(RefCell::new(callback)));
        }

        fn set_on_disconnect(&mut self, callback: Box<dyn FnMut() + 'static>) {
            self.on_disconnect_callback = Some(Rc::new(RefCell::new(callback)));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}
