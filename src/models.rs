//! Domain entities and the backend row shapes they are derived from.
//!
//! Rows mirror the hosted backend tables/RPCs verbatim (loosely typed,
//! string timestamps, nullable columns). They are converted into the strict
//! entity structs at the network boundary and never flow past it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("unparseable timestamp \"{0}\"")]
    Timestamp(String),
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RowError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RowError::Timestamp(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Backend rows (wire shapes)
// ---------------------------------------------------------------------------

/// One row of the `chats` table: a two-party thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: Option<String>,
}

/// One row of the `messages` table, also the payload shape of the push feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: String,
    pub read: bool,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// Output row of the `conversation_summaries` RPC: one per chat the current
/// user participates in, with counterpart metadata denormalized in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSummaryRow {
    pub chat_id: String,
    pub counterpart_id: String,
    pub counterpart_username: String,
    #[serde(default)]
    pub counterpart_display_name: Option<String>,
    #[serde(default)]
    pub counterpart_avatar_url: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
    #[serde(default)]
    pub unread_count: i64,
}

/// One row of the `profiles` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// One row of the `tasks` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub reward: f64,
    pub status: String,
    pub poster_id: String,
    #[serde(default)]
    pub poster_username: Option<String>,
    pub created_at: String,
}

/// Output row of the `leaderboard` RPC, already aggregated server-side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub points: i64,
    pub tasks_completed: i64,
}

/// Output row of the `profile_stats` RPC.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileStatsRow {
    pub user_id: String,
    pub username: String,
    pub tasks_posted: i64,
    pub tasks_completed: i64,
    pub points: i64,
    #[serde(default)]
    pub member_since: Option<String>,
}

// ---------------------------------------------------------------------------
// Strict entities (the in-memory model)
// ---------------------------------------------------------------------------

/// The authenticated user, as supplied by the identity collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// A two-party messaging thread as shown in the conversation list.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub chat_id: String,
    pub counterpart_id: String,
    pub counterpart_name: String,
    pub counterpart_avatar: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread: u32,
}

/// A single chat message. Immutable except for `read`, which only ever
/// transitions false -> true.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: f64,
    pub status: String,
    pub poster_id: String,
    pub poster_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub points: i64,
    pub tasks_completed: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfileStats {
    pub user_id: String,
    pub username: String,
    pub tasks_posted: i64,
    pub tasks_completed: i64,
    pub points: i64,
    pub member_since: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Boundary conversions
// ---------------------------------------------------------------------------

impl TryFrom<MessageRow> for ChatMessage {
    type Error = RowError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let timestamp = parse_ts(&row.timestamp)?;
        Ok(ChatMessage {
            sender_name: row.sender_name.unwrap_or_else(|| row.sender_id.clone()),
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            timestamp,
            read: row.read,
        })
    }
}

impl TryFrom<ConversationSummaryRow> for Conversation {
    type Error = RowError;

    fn try_from(row: ConversationSummaryRow) -> Result<Self, Self::Error> {
        let last_message_at = match row.last_message_at {
            Some(raw) => Some(parse_ts(&raw)?),
            None => None,
        };
        Ok(Conversation {
            chat_id: row.chat_id,
            counterpart_id: row.counterpart_id,
            counterpart_name: row
                .counterpart_display_name
                .unwrap_or(row.counterpart_username),
            counterpart_avatar: row.counterpart_avatar_url,
            last_message: row.last_message,
            last_message_at,
            unread: row.unread_count.max(0) as u32,
        })
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = RowError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let created_at = parse_ts(&row.created_at)?;
        Ok(Task {
            poster_name: row.poster_username.unwrap_or_else(|| row.poster_id.clone()),
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            reward: row.reward,
            status: row.status,
            poster_id: row.poster_id,
            created_at,
        })
    }
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        LeaderboardEntry {
            user_id: row.user_id,
            username: row.username,
            avatar: row.avatar_url,
            points: row.points,
            tasks_completed: row.tasks_completed,
        }
    }
}

impl TryFrom<ProfileStatsRow> for ProfileStats {
    type Error = RowError;

    fn try_from(row: ProfileStatsRow) -> Result<Self, Self::Error> {
        let member_since = match row.member_since {
            Some(raw) => Some(parse_ts(&raw)?),
            None => None,
        };
        Ok(ProfileStats {
            user_id: row.user_id,
            username: row.username,
            tasks_posted: row.tasks_posted,
            tasks_completed: row.tasks_completed,
            points: row.points,
            member_since,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_row_maps_into_strict_entity() {
        let row = MessageRow {
            id: "m1".into(),
            chat_id: "c1".into(),
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            content: "hi".into(),
            timestamp: "2026-03-01T10:00:00Z".into(),
            read: false,
            sender_name: Some("Alice".into()),
        };
        let msg = ChatMessage::try_from(row).unwrap();
        assert_eq!(msg.sender_name, "Alice");
        assert!(!msg.read);
        assert_eq!(msg.timestamp.timezone(), Utc);
    }

    #[test]
    fn bad_timestamp_is_rejected_at_the_boundary() {
        let row = MessageRow {
            id: "m1".into(),
            chat_id: "c1".into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            content: "x".into(),
            timestamp: "not-a-date".into(),
            read: false,
            sender_name: None,
        };
        assert!(ChatMessage::try_from(row).is_err());
    }

    #[test]
    fn summary_row_prefers_display_name_and_clamps_unread() {
        let row = ConversationSummaryRow {
            chat_id: "c1".into(),
            counterpart_id: "u2".into(),
            counterpart_username: "bob99".into(),
            counterpart_display_name: Some("Bob".into()),
            counterpart_avatar_url: None,
            last_message: Some("see you".into()),
            last_message_at: Some("2026-03-01T10:00:00Z".into()),
            unread_count: -3,
        };
        let conv = Conversation::try_from(row).unwrap();
        assert_eq!(conv.counterpart_name, "Bob");
        assert_eq!(conv.unread, 0);
    }
}
