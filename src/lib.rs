//! taskhive-frontend: state core of the TaskHive web client.
//!
//! The JS shell owns rendering and sign-in; this crate owns the application
//! model. Events enter through the exported functions below (and the push
//! feed), run through the reducers, and the shell re-reads state when a
//! `taskhive:render:*` DOM event fires.

mod macros;

pub mod auth;
pub mod command_executors;
pub mod components;
pub mod constants;
pub mod errors;
pub mod messages;
pub mod models;
pub mod network;
pub mod reducers;
pub mod state;
pub mod toast;
pub mod update;
pub mod utils;

#[cfg(test)]
mod merge_prop_test;

use wasm_bindgen::prelude::*;

use crate::messages::Message;
use crate::state::dispatch_global_message;

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    if let Ok(config) = network::config::ApiConfig::from_env() {
        network::config::init_api_config(config);
    }

    crate::debug_log!("taskhive frontend starting");

    if let Some(user) = auth::load_session() {
        wire_session(user)?;
    } else {
        crate::debug_log!("No cached session; waiting for sign-in");
    }
    Ok(())
}

/// Install backend routing at runtime, overriding any compile-time values.
/// Must run before sign-in completes.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_backend_config(url: &str, anon_key: &str) {
    network::config::init_api_config(network::config::ApiConfig::from_parts(url, anon_key));
}

/// Called by the shell when the identity provider completes sign-in.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn session_started(user_json: &str, jwt: &str) -> Result<(), JsValue> {
    let user: models::CurrentUser = serde_json::from_str(user_json)
        .map_err(|e| JsValue::from_str(&format!("invalid session payload: {e}")))?;
    auth::save_session(&user, jwt);
    wire_session(user)
}

/// Sign-out: release the push subscription, drop the cached session and
/// reset the whole model.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn session_ended() {
    if let Err(e) = components::chat::rt_manager::cleanup_chat_rt() {
        crate::warn_log!("Could not release chat subscription: {}", e);
    }
    auth::clear_session();
    dispatch_global_message(Message::SessionCleared);
}

/// Establish the session in state, open the push feed and kick off the
/// initial loads.
#[cfg(target_arch = "wasm32")]
fn wire_session(user: models::CurrentUser) -> Result<(), JsValue> {
    use std::cell::RefCell;
    use std::rc::Rc;

    use network::channel_manager::{route_incoming, ChannelManager};
    use network::realtime_client::{IRealtimeClient, RealtimeClient};

    dispatch_global_message(Message::CurrentUserLoaded(user.clone()));

    let ws_url = network::config::with_config(|c| c.ws_url());
    let client: Rc<RefCell<dyn IRealtimeClient>> =
        Rc::new(RefCell::new(RealtimeClient::new(ws_url)));
    let manager = Rc::new(RefCell::new(ChannelManager::new(client.clone())));

    {
        let mgr = manager.clone();
        client
            .borrow_mut()
            .set_on_message(Box::new(move |value| route_incoming(&mgr, value)));

        // Server-side channel membership dies with the socket; re-join on
        // every (re)connect. This pass also issues joins for subscriptions
        // made while the socket was still opening. After a reconnect the
        // feed has lost anything delivered while offline, so the
        // conversation list is re-pulled.
        let mgr = manager.clone();
        let first_connect = std::cell::Cell::new(true);
        client.borrow_mut().set_on_connect(Box::new(move || {
            if let Err(e) = mgr.borrow().rejoin_all() {
                crate::warn_log!("Re-join after reconnect failed: {}", e);
            }
            if first_connect.get() {
                first_connect.set(false);
            } else {
                dispatch_global_message(Message::LoadConversations);
            }
        }));
    }

    client
        .borrow_mut()
        .connect()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    state::APP_STATE.with(|state_ref| {
        state_ref.borrow_mut().channel_manager = Some(manager.clone());
    });

    components::chat::rt_manager::init_chat_rt(&user.id, manager)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    dispatch_global_message(Message::LoadConversations);
    dispatch_global_message(Message::LoadTasks);
    Ok(())
}

// ---------------------------------------------------------------------------
// Shell-facing event entry points
// ---------------------------------------------------------------------------

/// Switch the main view. Profile and leaderboard loads piggyback on the
/// switch so their data is fresh when the view appears.
#[wasm_bindgen]
pub fn show_view(name: &str) {
    let view = match name {
        "tasks" => state::ActiveView::TaskBoard,
        "chat" => state::ActiveView::Chat,
        "profile" => state::ActiveView::Profile,
        "leaderboard" => state::ActiveView::Leaderboard,
        other => {
            crate::warn_log!("Unknown view name: {}", other);
            return;
        }
    };
    dispatch_global_message(Message::ToggleView(view));
    match view {
        state::ActiveView::Leaderboard => dispatch_global_message(Message::LoadLeaderboard),
        state::ActiveView::Profile => {
            let user_id = state::APP_STATE.with(|state_ref| {
                state_ref
                    .borrow()
                    .current_user
                    .as_ref()
                    .map(|u| u.id.clone())
            });
            if let Some(user_id) = user_id {
                dispatch_global_message(Message::LoadProfileStats(user_id));
            }
        }
        _ => {}
    }
}

#[wasm_bindgen]
pub fn select_conversation(chat_id: &str) {
    dispatch_global_message(Message::SelectConversation(chat_id.to_string()));
}

#[wasm_bindgen]
pub fn close_conversation() {
    dispatch_global_message(Message::ClearActiveConversation);
}

#[wasm_bindgen]
pub fn send_chat_message(content: &str) {
    dispatch_global_message(Message::RequestSendMessage(content.to_string()));
}

#[wasm_bindgen]
pub fn start_chat_with(username: &str) {
    dispatch_global_message(Message::StartChatWithUsername(username.to_string()));
}

#[wasm_bindgen]
pub fn create_task(title: &str, description: &str, reward: f64) {
    dispatch_global_message(Message::RequestCreateTask {
        title: title.to_string(),
        description: description.to_string(),
        reward,
    });
}

#[wasm_bindgen]
pub fn refresh_conversations() {
    dispatch_global_message(Message::LoadConversations);
}

#[wasm_bindgen]
pub fn refresh_tasks() {
    dispatch_global_message(Message::LoadTasks);
}
