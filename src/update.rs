//! Root reducer: session and view handling, then delegation to the
//! per-domain reducers.

use crate::debug_log;
use crate::messages::{Command, Message};
use crate::reducers;
use crate::state::AppState;
use crate::warn_log;

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) {
    match msg {
        Message::ToggleView(view) => {
            state.active_view = *view;
            cmds.push(Command::UpdateUI(Box::new(|| {
                crate::components::notify_render("view");
            })));
            return;
        }

        Message::CurrentUserLoaded(user) => {
            debug_log!("Session established for {}", user.username);
            state.current_user = Some(user.clone());
            return;
        }

        Message::SessionCleared => {
            // Drop everything tied to the old session in one replacement.
            *state = AppState::new();
            cmds.push(Command::UpdateUI(Box::new(|| {
                crate::components::notify_render("view");
            })));
            return;
        }

        _ => {}
    }

    if reducers::chat::update(state, msg, cmds) {
        return;
    }
    if reducers::tasks::update(state, msg, cmds) {
        return;
    }
    if reducers::profile::update(state, msg, cmds) {
        return;
    }

    warn_log!("Unhandled message: {:?}", msg);
}
