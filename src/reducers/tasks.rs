//! Task-board reducer: open-task listing and task creation.

use crate::debug_log;
use crate::messages::{Command, Message};
use crate::state::AppState;
use crate::warn_log;

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::LoadTasks => {
            if state.current_user.is_none() {
                warn_log!("LoadTasks ignored: no active user");
                return true;
            }
            state.tasks_fetch_seq = state.tasks_fetch_seq.wrapping_add(1);
            state.is_tasks_loading = true;
            cmds.push(Command::FetchTasks {
                seq: state.tasks_fetch_seq,
            });
            true
        }

        Message::TasksLoaded { seq, tasks } => {
            if *seq != state.tasks_fetch_seq {
                debug_log!("Dropping stale task list (seq {})", seq);
                return true;
            }
            state.is_tasks_loading = false;
            state.tasks = tasks.clone();
            push_render(cmds);
            true
        }

        Message::RequestCreateTask {
            title,
            description,
            reward,
        } => {
            if state.current_user.is_none() {
                warn_log!("RequestCreateTask ignored: no active user");
                return true;
            }
            let title = title.trim();
            if title.is_empty() || !reward.is_finite() || *reward < 0.0 {
                warn_log!("RequestCreateTask ignored: invalid title or reward");
                return true;
            }
            cmds.push(Command::CreateTask {
                title: title.to_string(),
                description: description.trim().to_string(),
                reward: *reward,
            });
            true
        }

        Message::TaskCreated(task) => {
            // The insert returns the created row; show it immediately. A
            // concurrent board refresh may already have delivered it.
            if !state.tasks.iter().any(|t| t.id == task.id) {
                state.tasks.insert(0, task.clone());
            }
            push_render(cmds);
            true
        }

        _ => false,
    }
}

fn push_render(cmds: &mut Vec<Command>) {
    cmds.push(Command::UpdateUI(Box::new(|| {
        crate::components::notify_render("tasks");
    })));
}
