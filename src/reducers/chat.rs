//! Chat reducer: conversation index, per-chat message store, live event
//! merging and read reconciliation.
//!
//! The push feed and the fetch gateway can both deliver the same row (a
//! push can race an in-flight history fetch), so every insert goes through
//! [`merge_message`], which is idempotent on message id. Read flags are
//! monotonic: once a message is read locally it is never flipped back, even
//! if a later fetch still carries `read = false`.

use crate::debug_log;
use crate::messages::{Command, Message};
use crate::models::ChatMessage;
use crate::state::AppState;
use crate::warn_log;

/// Returns `true` when the message was handled by the chat reducer.
pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::LoadConversations => {
            if state.current_user.is_none() {
                warn_log!("LoadConversations ignored: no active user");
                return true;
            }
            state.chat.conversations_fetch_seq = state.chat.conversations_fetch_seq.wrapping_add(1);
            cmds.push(Command::FetchConversations {
                seq: state.chat.conversations_fetch_seq,
            });
            true
        }

        Message::ConversationsLoaded { seq, conversations } => {
            if *seq != state.chat.conversations_fetch_seq {
                debug_log!("Dropping stale conversation list (seq {})", seq);
                return true;
            }
            // Wholesale replacement of the index; never patched in place.
            let mut next = conversations.clone();
            next.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
            if let Some(active) = state.chat.active_chat_id.clone() {
                if let Some(conv) = next.iter_mut().find(|c| c.chat_id == active) {
                    conv.unread = 0;
                }
            }
            state.chat.conversations = next;
            push_render(cmds);
            true
        }

        Message::SelectConversation(chat_id) => {
            if state.current_user.is_none() {
                warn_log!("SelectConversation ignored: no active user");
                return true;
            }
            state.chat.active_chat_id = Some(chat_id.clone());

            if state.chat.messages.contains_key(chat_id) {
                reconcile_read(state, chat_id, cmds);
            } else {
                if let Some(conv) = state.chat.conversation_mut(chat_id) {
                    conv.unread = 0;
                }
                state.chat.history_fetch_seq = state.chat.history_fetch_seq.wrapping_add(1);
                state.is_chat_loading = true;
                cmds.push(Command::FetchChatHistory {
                    chat_id: chat_id.clone(),
                    seq: state.chat.history_fetch_seq,
                });
            }
            push_render(cmds);
            true
        }

        Message::ClearActiveConversation => {
            state.chat.active_chat_id = None;
            state.is_chat_loading = false;
            // Invalidate any in-flight history fetch so its completion is
            // discarded instead of mutating state for a torn-down view.
            state.chat.history_fetch_seq = state.chat.history_fetch_seq.wrapping_add(1);
            true
        }

        Message::ChatHistoryLoaded {
            chat_id,
            seq,
            messages,
        } => {
            if *seq != state.chat.history_fetch_seq {
                debug_log!(
                    "Dropping stale history for chat {} (seq {} != {})",
                    chat_id,
                    seq,
                    state.chat.history_fetch_seq
                );
                return true;
            }
            state.is_chat_loading = false;

            // Merge the fetched snapshot with anything the push feed
            // delivered while the fetch was in flight, keeping read flags
            // monotonic across the two sources.
            let previous = state.chat.messages.remove(chat_id).unwrap_or_default();
            let mut merged: Vec<ChatMessage> = messages.clone();
            for m in merged.iter_mut() {
                if previous.iter().any(|p| p.id == m.id && p.read) {
                    m.read = true;
                }
            }
            for p in previous {
                if !merged.iter().any(|m| m.id == p.id) {
                    merged.push(p);
                }
            }
            merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
            state.chat.messages.insert(chat_id.clone(), merged);

            if state.chat.is_active(chat_id) {
                reconcile_read(state, chat_id, cmds);
            }
            push_render(cmds);
            true
        }

        Message::ReceiveChatMessage { chat_id, message } => {
            merge_message(state, chat_id, message, cmds);
            true
        }

        Message::ChatMessageSent { chat_id, message } => {
            // Confirmed send: same idempotent path as the push feed. The
            // push feed only carries rows addressed *to* us, so our own
            // sends arrive here and nowhere else.
            merge_message(state, chat_id, message, cmds);
            true
        }

        Message::RequestSendMessage(content) => {
            if state.current_user.is_none() {
                warn_log!("RequestSendMessage ignored: no active user");
                return true;
            }
            let Some(chat_id) = state.chat.active_chat_id.clone() else {
                warn_log!("RequestSendMessage ignored: no conversation selected");
                return true;
            };
            let content = content.trim();
            if content.is_empty() {
                return true;
            }
            let Some(conv) = state.chat.conversation(&chat_id) else {
                warn_log!("RequestSendMessage: active chat {} missing from index", chat_id);
                return true;
            };
            cmds.push(Command::SendChatMessage {
                chat_id,
                receiver_id: conv.counterpart_id.clone(),
                content: content.to_string(),
            });
            true
        }

        Message::StartChatWithUsername(username) => {
            if state.current_user.is_none() {
                warn_log!("StartChatWithUsername ignored: no active user");
                return true;
            }
            let username = username.trim();
            if username.is_empty() {
                return true;
            }
            cmds.push(Command::LookupRecipient {
                username: username.to_string(),
            });
            true
        }

        Message::RecipientResolved { profile, chat_id } => {
            // The lookup returned full counterpart metadata, so an index
            // entry can be constructed directly (unlike push events for
            // unknown chats, which only carry a message row).
            if state.chat.conversation(chat_id).is_none() {
                state.chat.conversations.insert(
                    0,
                    crate::models::Conversation {
                        chat_id: chat_id.clone(),
                        counterpart_id: profile.id.clone(),
                        counterpart_name: profile
                            .display_name
                            .clone()
                            .unwrap_or_else(|| profile.username.clone()),
                        counterpart_avatar: profile.avatar_url.clone(),
                        last_message: None,
                        last_message_at: None,
                        unread: 0,
                    },
                );
            }
            cmds.push(Command::SendMessage(Box::new(Message::SelectConversation(
                chat_id.clone(),
            ))));
            // Refresh the index from the backend so server truth wins.
            cmds.push(Command::SendMessage(Box::new(Message::LoadConversations)));
            true
        }

        _ => false,
    }
}

/// Idempotent insert of one message into the store plus the index update.
///
/// Unread policy: the active conversation's badge stays at zero and an
/// immediate read-acknowledgment is issued; any other conversation gains
/// one unread per inbound message.
fn merge_message(
    state: &mut AppState,
    chat_id: &str,
    incoming: &ChatMessage,
    cmds: &mut Vec<Command>,
) {
    let Some(me) = state.current_user.as_ref().map(|u| u.id.clone()) else {
        warn_log!("Discarding message event: no active user");
        return;
    };

    if state.chat.conversation(chat_id).is_none() {
        // First message from a new counterpart. A message row has no
        // counterpart metadata, so rather than synthesizing a partial
        // Conversation the whole index is re-fetched.
        debug_log!("Message for unknown chat {}; re-fetching conversations", chat_id);
        state.chat.conversations_fetch_seq = state.chat.conversations_fetch_seq.wrapping_add(1);
        cmds.push(Command::FetchConversations {
            seq: state.chat.conversations_fetch_seq,
        });
        return;
    }

    let active = state.chat.is_active(chat_id);
    let inbound = incoming.receiver_id == me;

    let entry = state.chat.messages.entry(chat_id.to_string()).or_default();
    if entry.iter().any(|m| m.id == incoming.id) {
        debug_log!("Duplicate delivery of message {}; ignoring", incoming.id);
        return;
    }

    let mut message = incoming.clone();
    let mut ack = false;
    if active && inbound && !message.read {
        // Read immediately: the user is looking at this conversation.
        message.read = true;
        ack = true;
    }

    // Keep the per-chat sequence ordered by timestamp even when the push
    // feed interleaves with fetch results.
    let pos = entry
        .iter()
        .rposition(|m| m.timestamp <= message.timestamp)
        .map(|p| p + 1)
        .unwrap_or(0);
    entry.insert(pos, message.clone());

    if let Some(conv) = state.chat.conversation_mut(chat_id) {
        conv.last_message = Some(crate::utils::preview(&message.content));
        conv.last_message_at = Some(message.timestamp);
        if active {
            conv.unread = 0;
        } else if inbound {
            conv.unread += 1;
        }
    }
    state.chat.resort_conversations();

    if ack {
        cmds.push(Command::MarkConversationRead {
            chat_id: chat_id.to_string(),
        });
    }
    push_render(cmds);
}

/// Flip every unread inbound message of `chat_id` locally and issue one
/// batched acknowledgment. The flip is optimistic; a failed ack is handled
/// by the executor and never reverses it (flags stay monotonic).
fn reconcile_read(state: &mut AppState, chat_id: &str, cmds: &mut Vec<Command>) {
    let Some(me) = state.current_user.as_ref().map(|u| u.id.clone()) else {
        return;
    };

    let mut flipped = false;
    if let Some(messages) = state.chat.messages.get_mut(chat_id) {
        for m in messages.iter_mut() {
            if !m.read && m.receiver_id == me {
                m.read = true;
                flipped = true;
            }
        }
    }
    if let Some(conv) = state.chat.conversation_mut(chat_id) {
        conv.unread = 0;
    }
    if flipped {
        cmds.push(Command::MarkConversationRead {
            chat_id: chat_id.to_string(),
        });
    }
}

fn push_render(cmds: &mut Vec<Command>) {
    cmds.push(Command::UpdateUI(Box::new(|| {
        crate::components::notify_render("chat");
    })));
}
