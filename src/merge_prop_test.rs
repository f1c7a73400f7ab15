//! Property test for the message-merge path: arbitrary interleavings of
//! push deliveries (with duplicates) and history completions must leave the
//! store with each message exactly once, in timestamp order, and the unread
//! badge counting exactly the messages that first arrived by push.

#![cfg(test)]

use std::collections::HashSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::messages::Message;
use crate::models::{ChatMessage, Conversation, CurrentUser};
use crate::state::AppState;

const ME: &str = "user-me";
const POOL: usize = 10;

#[derive(Clone, Debug)]
enum Op {
    /// Push delivery of pool message `i` (may repeat).
    Push(usize),
    /// History completion carrying the first `len` pool messages.
    History(usize),
}

fn pool_message(i: usize) -> ChatMessage {
    ChatMessage {
        id: format!("m{i:02}"),
        sender_id: "user-bob".into(),
        sender_name: "Bob".into(),
        receiver_id: ME.into(),
        content: format!("body {i}"),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, i as u32).unwrap(),
        read: false,
    }
}

fn fresh_state() -> AppState {
    let mut state = AppState::new();
    state.current_user = Some(CurrentUser {
        id: ME.into(),
        email: "me@example.com".into(),
        username: "me".into(),
    });
    state.chat.conversations.push(Conversation {
        chat_id: "c1".into(),
        counterpart_id: "user-bob".into(),
        counterpart_name: "Bob".into(),
        counterpart_avatar: None,
        last_message: None,
        last_message_at: None,
        unread: 0,
    });
    state
}

fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0..POOL).prop_map(Op::Push),
        (0..=POOL).prop_map(Op::History),
    ];
    prop::collection::vec(op, 0..40)
}

#[test]
fn merge_is_idempotent_ordered_and_counts_unread_once() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&op_strategy(), |ops| {
            let mut state = fresh_state();

            // Model: which ids are in the store, and how many first arrived
            // by push (those are the ones that may bump the badge).
            let mut in_store: HashSet<String> = HashSet::new();
            let mut expected_unread = 0u32;

            for op in &ops {
                match op {
                    Op::Push(i) => {
                        let message = pool_message(*i);
                        if in_store.insert(message.id.clone()) {
                            expected_unread += 1;
                        }
                        let _ = state.dispatch(Message::ReceiveChatMessage {
                            chat_id: "c1".into(),
                            message,
                        });
                    }
                    Op::History(len) => {
                        let messages: Vec<ChatMessage> = (0..*len).map(pool_message).collect();
                        for m in &messages {
                            in_store.insert(m.id.clone());
                        }
                        let seq = state.chat.history_fetch_seq;
                        let _ = state.dispatch(Message::ChatHistoryLoaded {
                            chat_id: "c1".into(),
                            seq,
                            messages,
                        });
                    }
                }
            }

            let stored = state.chat.messages.get("c1").cloned().unwrap_or_default();

            // Exactly-once: every delivered id appears exactly once.
            let ids: Vec<&str> = stored.iter().map(|m| m.id.as_str()).collect();
            let distinct: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(ids.len(), distinct.len());
            let expected: HashSet<&str> = in_store.iter().map(|s| s.as_str()).collect();
            prop_assert_eq!(distinct, expected);

            // Ordered by timestamp.
            for pair in stored.windows(2) {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }

            // No conversation is active, so the badge counts each message
            // that first arrived by push, exactly once.
            prop_assert_eq!(
                state.chat.conversation("c1").map(|c| c.unread),
                Some(expected_unread)
            );

            Ok(())
        })
        .expect("property test failed");
}
