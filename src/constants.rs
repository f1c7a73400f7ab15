// Shared defaults - these are the single source of truth for tunables.

/// Maximum number of grapheme clusters shown in a conversation preview.
pub const PREVIEW_MAX_GRAPHEMES: usize = 48;

/// Page size used when pulling message history for a conversation.
pub const HISTORY_PAGE_SIZE: u32 = 200;

/// Page size for the open-task board.
pub const TASK_PAGE_SIZE: u32 = 50;

/// Number of rows requested for the leaderboard.
pub const LEADERBOARD_LIMIT: u32 = 25;

/// Topic prefix for the per-user inbound message feed.
pub const MESSAGES_TOPIC_PREFIX: &str = "messages:receiver_id=eq.";

/// localStorage key holding the cached session blob.
pub const SESSION_STORAGE_KEY: &str = "taskhive_session";
pub const JWT_STORAGE_KEY: &str = "taskhive_jwt";
