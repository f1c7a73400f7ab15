//! Session cache.
//!
//! The identity provider runs in the JS shell; it hands this crate a signed
//! session (user record plus JWT) which is cached in localStorage so a page
//! reload can restore it without another sign-in round-trip.

use crate::constants::{JWT_STORAGE_KEY, SESSION_STORAGE_KEY};
use crate::models::CurrentUser;
use crate::warn_log;

fn storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub fn save_session(user: &CurrentUser, jwt: &str) {
    let Some(storage) = storage() else { return };
    match serde_json::to_string(user) {
        Ok(json) => {
            let _ = storage.set_item(SESSION_STORAGE_KEY, &json);
            let _ = storage.set_item(JWT_STORAGE_KEY, jwt);
        }
        Err(e) => warn_log!("Could not serialize session: {}", e),
    }
}

pub fn load_session() -> Option<CurrentUser> {
    let storage = storage()?;
    let json = storage.get_item(SESSION_STORAGE_KEY).ok()??;
    match serde_json::from_str(&json) {
        Ok(user) => Some(user),
        Err(e) => {
            // Stale or hand-edited cache; treat as signed out.
            warn_log!("Discarding unreadable session cache: {}", e);
            clear_session();
            None
        }
    }
}

pub fn current_jwt() -> Option<String> {
    storage()?.get_item(JWT_STORAGE_KEY).ok()?
}

pub fn clear_session() {
    if let Some(storage) = storage() {
        let _ = storage.remove_item(SESSION_STORAGE_KEY);
        let _ = storage.remove_item(JWT_STORAGE_KEY);
    }
}
