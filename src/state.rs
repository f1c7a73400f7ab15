//! Global application state and the dispatch loop.
//!
//! All mutation happens on the single browser execution context: reducers
//! mutate `AppState` synchronously and request effects as `Command`s, which
//! are executed only after the state borrow is released.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::debug_log;
use crate::messages::{Command, Message};
use crate::models::{ChatMessage, Conversation, CurrentUser, LeaderboardEntry, ProfileStats, Task};
use crate::network::channel_manager::ChannelManager;
use crate::update::update;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveView {
    TaskBoard,
    Chat,
    Profile,
    Leaderboard,
}

/// Session-scoped chat model: the conversation index plus the per-chat
/// message store. Rebuilt from the backend on every load; nothing persists.
pub struct ChatState {
    /// Conversation summaries, ordered by last activity (newest first).
    pub conversations: Vec<Conversation>,
    /// chat id -> messages ordered by timestamp ascending. Append-only per
    /// chat except for read-flag flips.
    pub messages: HashMap<String, Vec<ChatMessage>>,
    /// The conversation currently open in the chat view, if any.
    pub active_chat_id: Option<String>,
    /// Generation token for history fetches. Bumped on every new fetch and
    /// on view teardown; completions carrying a stale token are discarded.
    pub history_fetch_seq: u32,
    /// Same, for conversation-list fetches.
    pub conversations_fetch_seq: u32,
}

impl ChatState {
    fn new() -> Self {
        Self {
            conversations: Vec::new(),
            messages: HashMap::new(),
            active_chat_id: None,
            history_fetch_seq: 0,
            conversations_fetch_seq: 0,
        }
    }

    pub fn conversation(&self, chat_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.chat_id == chat_id)
    }

    pub fn conversation_mut(&mut self, chat_id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.chat_id == chat_id)
    }

    pub fn is_active(&self, chat_id: &str) -> bool {
        self.active_chat_id.as_deref() == Some(chat_id)
    }

    /// Re-derive the index ordering after a preview/activity update. Built
    /// as a fresh sorted vector so no half-ordered state is ever observable.
    pub fn resort_conversations(&mut self) {
        let mut next = std::mem::take(&mut self.conversations);
        next.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        self.conversations = next;
    }
}

// Store global application state
pub struct AppState {
    /// Supplied by the identity collaborator; `None` disables all fetch and
    /// send operations.
    pub current_user: Option<CurrentUser>,
    pub active_view: ActiveView,

    pub chat: ChatState,
    pub is_chat_loading: bool,

    pub tasks: Vec<Task>,
    pub tasks_fetch_seq: u32,
    pub is_tasks_loading: bool,

    pub leaderboard: Vec<LeaderboardEntry>,
    pub profile_stats: Option<ProfileStats>,

    /// Realtime channel routing; installed during bootstrap, absent in unit
    /// tests and before the socket is up.
    pub channel_manager: Option<Rc<RefCell<ChannelManager>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            current_user: None,
            active_view: ActiveView::TaskBoard,
            chat: ChatState::new(),
            is_chat_loading: false,
            tasks: Vec::new(),
            tasks_fetch_seq: 0,
            is_tasks_loading: false,
            leaderboard: Vec::new(),
            profile_stats: None,
            channel_manager: None,
        }
    }

    /// Apply one message and collect the effects it requested.
    pub fn dispatch(&mut self, msg: Message) -> Vec<Command> {
        let mut cmds = Vec::new();
        update(self, &msg, &mut cmds);
        cmds
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// We use thread_local to store our app state
thread_local! {
    pub static APP_STATE: RefCell<AppState> = RefCell::new(AppState::new());
}

/// Dispatch a message against the global state, then run the commands it
/// produced. The mutable borrow is released before any command executes, so
/// commands (and the messages they chain) can re-enter the dispatch loop.
pub fn dispatch_global_message(msg: Message) {
    let cmds = APP_STATE.with(|state_ref| {
        let mut state = state_ref.borrow_mut();
        state.dispatch(msg)
    });

    for cmd in cmds {
        match cmd {
            Command::SendMessage(next) => dispatch_global_message(*next),
            Command::UpdateUI(callback) => callback(),
            other => {
                debug_log!("Executing command: {}", other.name());
                crate::command_executors::execute(other);
            }
        }
    }
}
