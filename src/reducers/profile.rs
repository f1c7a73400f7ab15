//! Profile-stats and leaderboard reducer.

use crate::messages::{Command, Message};
use crate::state::AppState;

pub fn update(state: &mut AppState, msg: &Message, cmds: &mut Vec<Command>) -> bool {
    match msg {
        Message::LoadProfileStats(user_id) => {
            cmds.push(Command::FetchProfileStats {
                user_id: user_id.clone(),
            });
            true
        }

        Message::ProfileStatsLoaded(stats) => {
            state.profile_stats = Some(stats.clone());
            push_render(cmds);
            true
        }

        Message::LoadLeaderboard => {
            cmds.push(Command::FetchLeaderboard);
            true
        }

        Message::LeaderboardLoaded(entries) => {
            // The RPC orders by points, but ties come back in table order;
            // settle them deterministically before display.
            let mut ranked = entries.clone();
            ranked.sort_by(|a, b| {
                b.points
                    .cmp(&a.points)
                    .then(b.tasks_completed.cmp(&a.tasks_completed))
                    .then(a.username.cmp(&b.username))
            });
            state.leaderboard = ranked;
            push_render(cmds);
            true
        }

        _ => false,
    }
}

fn push_render(cmds: &mut Vec<Command>) {
    cmds.push(Command::UpdateUI(Box::new(|| {
        crate::components::notify_render("profile");
    })));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaderboardEntry;

    fn entry(username: &str, points: i64, tasks_completed: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: format!("u-{username}"),
            username: username.into(),
            avatar: None,
            points,
            tasks_completed,
        }
    }

    #[test]
    fn leaderboard_breaks_ties_by_tasks_then_username() {
        let mut state = AppState::new();
        let mut cmds = Vec::new();
        let handled = update(
            &mut state,
            &Message::LeaderboardLoaded(vec![
                entry("carol", 50, 2),
                entry("alice", 80, 5),
                entry("bob", 50, 4),
                entry("dave", 50, 2),
            ]),
            &mut cmds,
        );
        assert!(handled);

        let order: Vec<&str> = state.leaderboard.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(order, vec!["alice", "bob", "carol", "dave"]);
    }
}
