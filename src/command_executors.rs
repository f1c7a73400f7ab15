//! Executes the effects reducers request.
//!
//! Every network call runs in its own `spawn_local` task; results re-enter
//! the app as messages via `dispatch_global_message`. Rows are decoded and
//! converted to entities here, at the boundary, so reducers only ever see
//! strict types. User-visible failures surface as toasts with the error
//! texts from `errors.rs`.

use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::debug_log;
use crate::errors::ApiError;
use crate::error_log;
use crate::messages::{Command, Message};
use crate::models::{
    ChatMessage, ChatRow, Conversation, ConversationSummaryRow, LeaderboardEntry, LeaderboardRow,
    MessageRow, ProfileRow, ProfileStatsRow, Task, TaskRow,
};
use crate::network::ApiClient;
use crate::state::{dispatch_global_message, APP_STATE};
use crate::warn_log;

fn js_err(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

fn current_user_id() -> Option<String> {
    APP_STATE.with(|state_ref| {
        state_ref
            .borrow()
            .current_user
            .as_ref()
            .map(|u| u.id.clone())
    })
}

/// Decode an array of rows and convert each to its entity, skipping rows
/// that fail conversion (one bad row must not blank the whole view).
fn decode_rows<R, E>(json: &str) -> Result<Vec<E>, serde_json::Error>
where
    R: serde::de::DeserializeOwned,
    E: TryFrom<R>,
    <E as TryFrom<R>>::Error: std::fmt::Display,
{
    let rows: Vec<R> = serde_json::from_str(json)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match E::try_from(row) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn_log!("Skipping undecodable row: {}", e);
                None
            }
        })
        .collect())
}

/// What a completed send means: a confirmed row to merge, or a Write
/// notice. A failure yields no message, so the Message Store is never
/// touched by a send that did not reach the backend.
fn sent_message_outcome(
    chat_id: String,
    result: Result<String, String>,
) -> Result<Message, ApiError> {
    let json = result.map_err(|detail| ApiError::write("message", detail))?;
    let mut messages = decode_rows::<MessageRow, ChatMessage>(&json)
        .map_err(|e| ApiError::write("message", e.to_string()))?;
    if messages.is_empty() {
        return Err(ApiError::write("message", "insert returned no row"));
    }
    Ok(Message::ChatMessageSent {
        chat_id,
        message: messages.remove(0),
    })
}

/// Resolve a username lookup result: the first matching profile, or the
/// notice to surface. An unknown username is a Lookup notice and no chat
/// gets created for it.
fn recipient_outcome(
    username: &str,
    result: Result<String, String>,
) -> Result<ProfileRow, ApiError> {
    let json = result.map_err(|detail| ApiError::fetch("profile", detail))?;
    let profiles: Vec<ProfileRow> =
        serde_json::from_str(&json).map_err(|e| ApiError::fetch("profile", e.to_string()))?;
    profiles.into_iter().next().ok_or_else(|| ApiError::Lookup {
        username: username.to_string(),
    })
}

pub fn execute(cmd: Command) {
    match cmd {
        Command::FetchConversations { seq } => {
            spawn_local(async move {
                match ApiClient::get_conversation_summaries().await {
                    Ok(json) => match decode_rows::<ConversationSummaryRow, Conversation>(&json) {
                        Ok(conversations) => dispatch_global_message(
                            Message::ConversationsLoaded { seq, conversations },
                        ),
                        Err(e) => {
                            error_log!("Failed to parse conversation summaries: {}", e);
                            crate::toast::error(
                                &ApiError::fetch("conversations", e.to_string()).to_string(),
                            );
                        }
                    },
                    Err(e) => {
                        crate::toast::error(
                            &ApiError::fetch("conversations", js_err(e)).to_string(),
                        );
                    }
                }
            });
        }

        Command::FetchChatHistory { chat_id, seq } => {
            spawn_local(async move {
                match ApiClient::get_chat_messages(&chat_id).await {
                    Ok(json) => match decode_rows::<MessageRow, ChatMessage>(&json) {
                        Ok(messages) => dispatch_global_message(Message::ChatHistoryLoaded {
                            chat_id,
                            seq,
                            messages,
                        }),
                        Err(e) => {
                            history_failed();
                            crate::toast::error(
                                &ApiError::fetch("messages", e.to_string()).to_string(),
                            );
                        }
                    },
                    Err(e) => {
                        history_failed();
                        crate::toast::error(&ApiError::fetch("messages", js_err(e)).to_string());
                    }
                }
            });
        }

        Command::SendChatMessage {
            chat_id,
            receiver_id,
            content,
        } => {
            let Some(sender_id) = current_user_id() else {
                warn_log!("SendChatMessage dropped: no active user");
                return;
            };
            spawn_local(async move {
                let result = ApiClient::insert_message(&chat_id, &sender_id, &receiver_id, &content)
                    .await
                    .map_err(js_err);
                match sent_message_outcome(chat_id, result) {
                    Ok(message) => dispatch_global_message(message),
                    Err(e) => crate::toast::error(&e.to_string()),
                }
            });
        }

        Command::MarkConversationRead { chat_id } => {
            let Some(receiver_id) = current_user_id() else {
                return;
            };
            spawn_local(async move {
                // Log-only on failure: the local flip stands and the rows
                // are re-acknowledged the next time the chat is opened.
                if let Err(e) = ApiClient::mark_chat_read(&chat_id, &receiver_id).await {
                    warn_log!("Read acknowledgment failed for {}: {}", chat_id, js_err(e));
                }
            });
        }

        Command::LookupRecipient { username } => {
            let Some(me) = current_user_id() else {
                return;
            };
            spawn_local(async move {
                let result = ApiClient::find_profile_by_username(&username)
                    .await
                    .map_err(js_err);
                let profile = match recipient_outcome(&username, result) {
                    Ok(profile) => profile,
                    Err(e) => {
                        crate::toast::error(&e.to_string());
                        return;
                    }
                };

                match ApiClient::ensure_chat(&me, &profile.id).await {
                    Ok(json) => match serde_json::from_str::<ChatRow>(&json) {
                        Ok(chat) => dispatch_global_message(Message::RecipientResolved {
                            profile,
                            chat_id: chat.id,
                        }),
                        Err(e) => {
                            crate::toast::error(
                                &ApiError::write("conversation", e.to_string()).to_string(),
                            );
                        }
                    },
                    Err(e) => {
                        crate::toast::error(
                            &ApiError::write("conversation", js_err(e)).to_string(),
                        );
                    }
                }
            });
        }

        Command::FetchTasks { seq } => {
            spawn_local(async move {
                match ApiClient::get_open_tasks().await {
                    Ok(json) => match decode_rows::<TaskRow, Task>(&json) {
                        Ok(tasks) => {
                            debug_log!("Fetched {} open tasks", tasks.len());
                            dispatch_global_message(Message::TasksLoaded { seq, tasks });
                        }
                        Err(e) => {
                            tasks_failed();
                            crate::toast::error(
                                &ApiError::fetch("tasks", e.to_string()).to_string(),
                            );
                        }
                    },
                    Err(e) => {
                        tasks_failed();
                        crate::toast::error(&ApiError::fetch("tasks", js_err(e)).to_string());
                    }
                }
            });
        }

        Command::CreateTask {
            title,
            description,
            reward,
        } => {
            let Some(poster_id) = current_user_id() else {
                warn_log!("CreateTask dropped: no active user");
                return;
            };
            spawn_local(async move {
                match ApiClient::insert_task(&poster_id, &title, &description, reward).await {
                    Ok(json) => match decode_rows::<TaskRow, Task>(&json) {
                        Ok(mut tasks) if !tasks.is_empty() => {
                            crate::toast::success("Task posted");
                            dispatch_global_message(Message::TaskCreated(tasks.remove(0)));
                        }
                        Ok(_) => error_log!("Task insert returned no row"),
                        Err(e) => {
                            crate::toast::error(&ApiError::write("task", e.to_string()).to_string());
                        }
                    },
                    Err(e) => {
                        crate::toast::error(&ApiError::write("task", js_err(e)).to_string());
                    }
                }
            });
        }

        Command::FetchProfileStats { user_id } => {
            spawn_local(async move {
                match ApiClient::get_profile_stats(&user_id).await {
                    Ok(json) => match serde_json::from_str::<ProfileStatsRow>(&json)
                        .map_err(|e| e.to_string())
                        .and_then(|row| row.try_into().map_err(|e: crate::models::RowError| e.to_string()))
                    {
                        Ok(stats) => dispatch_global_message(Message::ProfileStatsLoaded(stats)),
                        Err(e) => {
                            crate::toast::error(&ApiError::fetch("profile stats", e).to_string());
                        }
                    },
                    Err(e) => {
                        crate::toast::error(
                            &ApiError::fetch("profile stats", js_err(e)).to_string(),
                        );
                    }
                }
            });
        }

        Command::FetchLeaderboard => {
            spawn_local(async move {
                match ApiClient::get_leaderboard().await {
                    Ok(json) => match serde_json::from_str::<Vec<LeaderboardRow>>(&json) {
                        Ok(rows) => {
                            let entries: Vec<LeaderboardEntry> =
                                rows.into_iter().map(Into::into).collect();
                            dispatch_global_message(Message::LeaderboardLoaded(entries));
                        }
                        Err(e) => {
                            crate::toast::error(
                                &ApiError::fetch("leaderboard", e.to_string()).to_string(),
                            );
                        }
                    },
                    Err(e) => {
                        crate::toast::error(&ApiError::fetch("leaderboard", js_err(e)).to_string());
                    }
                }
            });
        }

        // Handled inline by the dispatch loop; reaching here is a bug.
        Command::SendMessage(_) | Command::UpdateUI(_) => {
            warn_log!("Command {} leaked into the executor", cmd.name());
        }
    }
}

fn history_failed() {
    APP_STATE.with(|state_ref| {
        state_ref.borrow_mut().is_chat_loading = false;
    });
}

fn tasks_failed() {
    APP_STATE.with(|state_ref| {
        state_ref.borrow_mut().is_tasks_loading = false;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_send_becomes_a_write_notice_with_no_confirmation() {
        match sent_message_outcome("c1".into(), Err("HTTP 500".into())) {
            Err(ApiError::Write { what, .. }) => assert_eq!(what, "message"),
            _ => panic!("expected a Write notice"),
        }
    }

    #[test]
    fn send_without_a_returned_row_is_a_write_notice() {
        assert!(matches!(
            sent_message_outcome("c1".into(), Ok("[]".into())),
            Err(ApiError::Write { .. })
        ));
    }

    #[test]
    fn confirmed_send_yields_the_row_as_a_sent_message() {
        let json = r#"[{
            "id": "m1", "chat_id": "c1", "sender_id": "u1", "receiver_id": "u2",
            "content": "hi", "timestamp": "2026-03-01T10:00:00Z", "read": false
        }]"#;
        match sent_message_outcome("c1".into(), Ok(json.into())) {
            Ok(Message::ChatMessageSent { chat_id, message }) => {
                assert_eq!(chat_id, "c1");
                assert_eq!(message.id, "m1");
            }
            _ => panic!("expected a sent-message confirmation"),
        }
    }

    #[test]
    fn unknown_username_is_a_lookup_notice_and_no_chat() {
        match recipient_outcome("ghost", Ok("[]".into())) {
            Err(ApiError::Lookup { username }) => assert_eq!(username, "ghost"),
            _ => panic!("expected a Lookup notice"),
        }
    }

    #[test]
    fn resolved_username_returns_the_first_profile() {
        let json = r#"[{"id": "u9", "username": "bee"}]"#;
        let profile = recipient_outcome("bee", Ok(json.into())).unwrap();
        assert_eq!(profile.id, "u9");
        assert_eq!(profile.username, "bee");
    }

    #[test]
    fn lookup_transport_failure_is_a_fetch_notice() {
        assert!(matches!(
            recipient_outcome("bee", Err("HTTP 500".into())),
            Err(ApiError::Fetch { .. })
        ));
    }
}
