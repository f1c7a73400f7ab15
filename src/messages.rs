// src/messages.rs
//
// The events that can occur in the app, and the effects reducers may request.

use crate::models::{
    ChatMessage, Conversation, CurrentUser, LeaderboardEntry, ProfileRow, ProfileStats, Task,
};
use crate::state::ActiveView;

#[derive(Debug, Clone)]
pub enum Message {
    // View switching
    ToggleView(ActiveView),

    // Session
    CurrentUserLoaded(CurrentUser),
    SessionCleared,

    // Conversation list
    LoadConversations,
    ConversationsLoaded {
        seq: u32,
        conversations: Vec<Conversation>,
    },

    // Conversation selection / teardown
    SelectConversation(String),
    ClearActiveConversation,

    // Message history
    ChatHistoryLoaded {
        chat_id: String,
        seq: u32,
        messages: Vec<ChatMessage>,
    },

    // Live event merger input (push feed) and send confirmation. Both run
    // through the same idempotent merge.
    ReceiveChatMessage {
        chat_id: String,
        message: ChatMessage,
    },
    ChatMessageSent {
        chat_id: String,
        message: ChatMessage,
    },

    // Sending
    RequestSendMessage(String),

    // Starting a chat by username
    StartChatWithUsername(String),
    RecipientResolved {
        profile: ProfileRow,
        chat_id: String,
    },

    // Task board
    LoadTasks,
    TasksLoaded {
        seq: u32,
        tasks: Vec<Task>,
    },
    RequestCreateTask {
        title: String,
        description: String,
        reward: f64,
    },
    TaskCreated(Task),

    // Profile & leaderboard
    LoadProfileStats(String),
    ProfileStatsLoaded(ProfileStats),
    LoadLeaderboard,
    LeaderboardLoaded(Vec<LeaderboardEntry>),
}

/// Side effects requested by reducers, executed after the state borrow is
/// released (see `command_executors`).
pub enum Command {
    /// Chain another message through the dispatch loop.
    SendMessage(Box<Message>),

    /// Execute a UI update callback after the state change.
    UpdateUI(Box<dyn FnOnce() + 'static>),

    /// Pull the conversation summary list for the current user.
    FetchConversations { seq: u32 },

    /// Pull the ordered message history for one conversation.
    FetchChatHistory { chat_id: String, seq: u32 },

    /// Insert a message row; confirmation comes back as `ChatMessageSent`.
    SendChatMessage {
        chat_id: String,
        receiver_id: String,
        content: String,
    },

    /// Batched read-acknowledgment: flip every unread inbound row of the
    /// conversation via one update-by-predicate call.
    MarkConversationRead { chat_id: String },

    /// Resolve a username to a profile and ensure a chat row exists.
    LookupRecipient { username: String },

    /// Pull the open-task board.
    FetchTasks { seq: u32 },

    /// Insert a task row.
    CreateTask {
        title: String,
        description: String,
        reward: f64,
    },

    /// Pull aggregated stats for one profile.
    FetchProfileStats { user_id: String },

    /// Pull the leaderboard.
    FetchLeaderboard,
}

impl Command {
    /// Short tag for logging; the closure variant has no useful payload.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SendMessage(_) => "SendMessage",
            Command::UpdateUI(_) => "UpdateUI",
            Command::FetchConversations { .. } => "FetchConversations",
            Command::FetchChatHistory { .. } => "FetchChatHistory",
            Command::SendChatMessage { .. } => "SendChatMessage",
            Command::MarkConversationRead { .. } => "MarkConversationRead",
            Command::LookupRecipient { .. } => "LookupRecipient",
            Command::FetchTasks { .. } => "FetchTasks",
            Command::CreateTask { .. } => "CreateTask",
            Command::FetchProfileStats { .. } => "FetchProfileStats",
            Command::FetchLeaderboard => "FetchLeaderboard",
        }
    }
}
