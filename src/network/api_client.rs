//! REST client for the hosted relational backend.
//!
//! Tables are reached through predicate-filtered endpoints
//! (`/rest/v1/messages?chat_id=eq.X`), aggregations through stored
//! procedures (`/rest/v1/rpc/...`). All methods return the raw response
//! body; row decoding happens in `command_executors` at the boundary.

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::config::with_config;
use crate::constants::{HISTORY_PAGE_SIZE, LEADERBOARD_LIMIT, TASK_PAGE_SIZE};

pub struct ApiClient;

impl ApiClient {
    // ---------------- Conversations & messages ----------------

    /// One summary row per chat the current user participates in, with
    /// counterpart metadata and unread counts computed server-side.
    pub async fn get_conversation_summaries() -> Result<String, JsValue> {
        let url = with_config(|c| c.rpc_url("conversation_summaries"));
        Self::fetch_json(&url, "POST", Some("{}"), None).await
    }

    /// Ordered message history for one chat, oldest first.
    pub async fn get_chat_messages(chat_id: &str) -> Result<String, JsValue> {
        let url = with_config(|c| {
            format!(
                "{}?chat_id=eq.{}&order=timestamp.asc&limit={}",
                c.table_url("messages"),
                chat_id,
                HISTORY_PAGE_SIZE
            )
        });
        Self::fetch_json(&url, "GET", None, None).await
    }

    /// Insert one message row; the created row (with its server-assigned id
    /// and timestamp) is returned.
    pub async fn insert_message(
        chat_id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<String, JsValue> {
        let url = with_config(|c| c.table_url("messages"));
        let body = serde_json::json!({
            "chat_id": chat_id,
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "content": content,
        });
        Self::fetch_json(&url, "POST", Some(&body.to_string()), Some("return=representation"))
            .await
    }

    /// Batched read-acknowledgment: one update-by-predicate call flipping
    /// every unread row addressed to `receiver_id` in this chat.
    pub async fn mark_chat_read(chat_id: &str, receiver_id: &str) -> Result<String, JsValue> {
        let url = with_config(|c| {
            format!(
                "{}?chat_id=eq.{}&receiver_id=eq.{}&read=eq.false",
                c.table_url("messages"),
                chat_id,
                receiver_id
            )
        });
        Self::fetch_json(&url, "PATCH", Some(r#"{"read":true}"#), None).await
    }

    // ---------------- Profiles ----------------

    /// Exact-match profile lookup by username. Empty array when unknown.
    pub async fn find_profile_by_username(username: &str) -> Result<String, JsValue> {
        let encoded = js_sys::encode_uri_component(username);
        let url = with_config(|c| {
            format!("{}?username=eq.{}&limit=1", c.table_url("profiles"), encoded)
        });
        Self::fetch_json(&url, "GET", None, None).await
    }

    /// Find-or-create the chat row between two users; returns the row either
    /// way, so starting a conversation is idempotent.
    pub async fn ensure_chat(user_a: &str, user_b: &str) -> Result<String, JsValue> {
        let url = with_config(|c| c.rpc_url("ensure_chat"));
        let body = serde_json::json!({ "a": user_a, "b": user_b });
        Self::fetch_json(&url, "POST", Some(&body.to_string()), None).await
    }

    pub async fn get_profile_stats(user_id: &str) -> Result<String, JsValue> {
        let url = with_config(|c| c.rpc_url("profile_stats"));
        let body = serde_json::json!({ "target": user_id });
        Self::fetch_json(&url, "POST", Some(&body.to_string()), None).await
    }

    pub async fn get_leaderboard() -> Result<String, JsValue> {
        let url = with_config(|c| c.rpc_url("leaderboard"));
        let body = serde_json::json!({ "entry_limit": LEADERBOARD_LIMIT });
        Self::fetch_json(&url, "POST", Some(&body.to_string()), None).await
    }

    // ---------------- Task board ----------------

    /// Open tasks, newest first, with poster usernames denormalized in by
    /// the `task_board` view.
    pub async fn get_open_tasks() -> Result<String, JsValue> {
        let url = with_config(|c| {
            format!(
                "{}?status=eq.open&order=created_at.desc&limit={}",
                c.table_url("task_board"),
                TASK_PAGE_SIZE
            )
        });
        Self::fetch_json(&url, "GET", None, None).await
    }

    pub async fn insert_task(
        poster_id: &str,
        title: &str,
        description: &str,
        reward: f64,
    ) -> Result<String, JsValue> {
        let url = with_config(|c| c.table_url("tasks"));
        let body = serde_json::json!({
            "poster_id": poster_id,
            "title": title,
            "description": description,
            "reward": reward,
            "status": "open",
        });
        Self::fetch_json(&url, "POST", Some(&body.to_string()), Some("return=representation"))
            .await
    }

    // Helper function to make fetch requests
    pub async fn fetch_json(
        url: &str,
        method: &str,
        body: Option<&str>,
        prefer: Option<&str>,
    ) -> Result<String, JsValue> {
        use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

        let opts = RequestInit::new();
        opts.set_method(method);
        opts.set_mode(RequestMode::Cors);

        let headers = Headers::new()?;
        let anon_key = with_config(|c| c.anon_key().to_string());
        headers.append("apikey", &anon_key)?;
        // The session JWT scopes row access to the current user; without one
        // the anonymous key is used and the backend rejects user-scoped rows.
        let bearer = crate::auth::current_jwt().unwrap_or_else(|| anon_key.clone());
        headers.append("Authorization", &format!("Bearer {}", bearer))?;

        if let Some(data) = body {
            opts.set_body(&JsValue::from_str(data));
            headers.append("Content-Type", "application/json")?;
        }
        if let Some(value) = prefer {
            headers.append("Prefer", value)?;
        }
        opts.set_headers(&headers);

        let request = Request::new_with_str_and_init(url, &opts)?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
        let resp: Response = resp_value.dyn_into()?;

        if !resp.ok() {
            let status = resp.status();
            // 401: session expired. Drop the cached session so the shell can
            // send the user back through sign-in.
            if status == 401 {
                crate::auth::clear_session();
            }
            return Err(JsValue::from_str(&format!(
                "request failed: {} {}",
                status,
                resp.status_text()
            )));
        }

        let text = JsFuture::from(resp.text()?).await?;
        Ok(text.as_string().unwrap_or_default())
    }
}
