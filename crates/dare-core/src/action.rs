//! Player actions and the rules that apply them to a room.
//!
//! [`Room::apply`] is the only way the board changes during play. It runs
//! while the caller holds the room's write lock, validates the action in a
//! fixed order and either records it (possibly advancing the phase) or
//! rejects it without touching anything.

use serde::{Deserialize, Serialize};

use crate::board::Phase;
use crate::error::ActionError;
use crate::room::Room;

/// An untrusted request to act on a room's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Name of the acting player.
    pub player: String,
    /// Phase the client believed was current when it submitted.
    pub phase: Phase,
    /// Suggestion text, voted dare text, or voted player name, by phase.
    #[serde(default)]
    pub entry: String,
    /// Skip validation and move on even if some players have not answered.
    #[serde(default)]
    pub force_continue: bool,
}

impl Action {
    pub fn submit(player: impl Into<String>, phase: Phase, entry: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            phase,
            entry: entry.into(),
            force_continue: false,
        }
    }

    pub fn force(player: impl Into<String>, phase: Phase) -> Self {
        Self {
            player: player.into(),
            phase,
            entry: String::new(),
            force_continue: true,
        }
    }
}

/// What a successful [`Room::apply`] did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was recorded; the phase is unchanged.
    Recorded,
    /// The phase moved forward by one.
    Advanced { to: Phase, forced: bool },
    /// The board rolled over from [`Phase::Finished`] to a fresh one.
    Reset,
}

impl Room {
    /// Validate `action` against the current board and apply it.
    ///
    /// Checks run in order and the first failure wins: stale phase, unknown
    /// player, then the phase-specific entry rule. A rejected action leaves
    /// the room unchanged.
    pub fn apply(&mut self, action: &Action) -> Result<Outcome, ActionError> {
        if action.phase != self.board.phase {
            return Err(ActionError::StalePhase);
        }
        let Some((_, player)) = self.find_player_by_name(&action.player) else {
            return Err(ActionError::UnknownPlayer);
        };
        let name = player.name().to_string();

        // Forced or finished: move on without recording, and without the
        // auto-advance check below.
        if action.force_continue || self.board.phase == Phase::Finished {
            let outcome = self.advance(true);
            tracing::debug!(room = %self.code(), player = %name, ?outcome, "Forced continue");
            return Ok(outcome);
        }

        let entry = &action.entry;
        match self.board.phase {
            Phase::Suggestion => {
                if entry.is_empty() {
                    return Err(ActionError::EmptySuggestion);
                }
            }
            Phase::DareVoting => {
                if !self.board.is_suggested(entry) {
                    return Err(ActionError::UnknownDare);
                }
            }
            Phase::PeopleVoting => {
                if self.find_player_by_name(entry).is_none() {
                    return Err(ActionError::UnknownVoteTarget);
                }
            }
            Phase::Finished => return Ok(Outcome::Recorded),
        }

        if let Some(responses) = self.board.active_responses_mut() {
            responses.insert(name, entry.clone());
        }

        if !self.players.is_empty() && !self.is_waiting_for_anyone() {
            let outcome = self.advance(false);
            tracing::debug!(room = %self.code(), ?outcome, "Everyone responded");
            return Ok(outcome);
        }
        Ok(Outcome::Recorded)
    }

    /// Move to the next phase, replacing the board once past the end.
    fn advance(&mut self, forced: bool) -> Outcome {
        match self.board.phase.next() {
            Some(to) => {
                self.board.phase = to;
                Outcome::Advanced { to, forced }
            }
            None => {
                self.reset();
                Outcome::Reset
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::room::Settings;

    fn room_with(names: &[&str]) -> Room {
        let mut room = Room::new("ROOM1", Settings::default());
        for name in names {
            room.join(name, None).unwrap();
        }
        room
    }

    fn ok(room: &mut Room, action: Action) -> Outcome {
        room.apply(&action).unwrap()
    }

    /// Drive a two-player room to `phase` with "jump"/"sing" suggestions.
    fn room_in(phase: Phase) -> Room {
        let mut room = room_with(&["Alice", "Bob"]);
        while room.board().phase() != phase {
            let current = room.board().phase();
            ok(&mut room, Action::force("Alice", current));
        }
        room.board.dare_suggestions.insert("Alice".into(), "jump".into());
        room.board.dare_suggestions.insert("Bob".into(), "sing".into());
        room
    }

    #[test]
    fn stale_phase_is_rejected_without_mutation() {
        let mut room = room_with(&["Alice", "Bob"]);
        let before = room.board().clone();

        for action in [
            Action::submit("Alice", Phase::DareVoting, "jump"),
            Action::submit("Nobody", Phase::Finished, ""),
            Action::force("Alice", Phase::PeopleVoting),
        ] {
            assert_eq!(room.apply(&action), Err(ActionError::StalePhase));
        }
        assert_eq!(room.board(), &before);
    }

    #[test]
    fn stale_check_runs_before_player_check() {
        let mut room = room_with(&["Alice"]);
        let action = Action::submit("Mallory", Phase::DareVoting, "x");
        assert_eq!(room.apply(&action), Err(ActionError::StalePhase));
    }

    #[test]
    fn unknown_player_is_rejected() {
        let mut room = room_with(&["Alice"]);
        let action = Action::submit("alice", Phase::Suggestion, "jump");
        assert_eq!(room.apply(&action), Err(ActionError::UnknownPlayer));

        let action = Action::force("Mallory", Phase::Suggestion);
        assert_eq!(room.apply(&action), Err(ActionError::UnknownPlayer));
        assert_eq!(room.board().phase(), Phase::Suggestion);
    }

    #[test]
    fn empty_suggestion_is_rejected() {
        let mut room = room_with(&["Alice", "Bob"]);
        let action = Action::submit("Alice", Phase::Suggestion, "");
        assert_eq!(room.apply(&action), Err(ActionError::EmptySuggestion));
        assert!(room.board().dare_suggestions().is_empty());
    }

    #[test]
    fn resubmitting_a_suggestion_overwrites() {
        let mut room = room_with(&["Alice", "Bob"]);
        ok(&mut room, Action::submit("Alice", Phase::Suggestion, "jump"));
        let outcome = ok(&mut room, Action::submit("Alice", Phase::Suggestion, "fly"));

        assert_eq!(outcome, Outcome::Recorded);
        assert_eq!(room.board().dare_suggestions().len(), 1);
        assert_eq!(room.board().dare_suggestions()["Alice"], "fly");
        assert_eq!(room.board().phase(), Phase::Suggestion);
    }

    #[test]
    fn dare_vote_must_match_a_suggestion_text() {
        let mut room = room_in(Phase::DareVoting);

        // Author names are not suggestion texts.
        for entry in ["fly", "Bob", ""] {
            let action = Action::submit("Alice", Phase::DareVoting, entry);
            assert_eq!(room.apply(&action), Err(ActionError::UnknownDare));
        }
        assert!(room.board().dare_votes().is_empty());

        ok(&mut room, Action::submit("Alice", Phase::DareVoting, "sing"));
        assert_eq!(room.board().dare_votes()["Alice"], "sing");
    }

    #[test]
    fn people_vote_must_name_a_roster_player() {
        let mut room = room_in(Phase::PeopleVoting);

        let action = Action::submit("Alice", Phase::PeopleVoting, "Carol");
        assert_eq!(room.apply(&action), Err(ActionError::UnknownVoteTarget));
        assert!(room.board().people_votes().is_empty());

        ok(&mut room, Action::submit("Alice", Phase::PeopleVoting, "Alice"));
        assert_eq!(room.board().people_votes()["Alice"], "Alice");
    }

    #[test]
    fn last_response_advances_exactly_once() {
        let mut room = room_with(&["Alice", "Bob"]);

        let outcome = ok(&mut room, Action::submit("Alice", Phase::Suggestion, "jump"));
        assert_eq!(outcome, Outcome::Recorded);

        let outcome = ok(&mut room, Action::submit("Bob", Phase::Suggestion, "sing"));
        assert_eq!(
            outcome,
            Outcome::Advanced {
                to: Phase::DareVoting,
                forced: false
            }
        );
        assert_eq!(room.board().phase(), Phase::DareVoting);

        ok(&mut room, Action::submit("Alice", Phase::DareVoting, "sing"));
        assert_eq!(room.board().phase(), Phase::DareVoting);
        ok(&mut room, Action::submit("Bob", Phase::DareVoting, "jump"));
        assert_eq!(room.board().phase(), Phase::PeopleVoting);

        ok(&mut room, Action::submit("Alice", Phase::PeopleVoting, "Bob"));
        ok(&mut room, Action::submit("Bob", Phase::PeopleVoting, "Bob"));
        assert_eq!(room.board().phase(), Phase::Finished);

        // Earlier maps survive the phase change.
        assert_eq!(room.board().dare_suggestions().len(), 2);
        assert_eq!(room.board().dare_votes().len(), 2);
        assert_eq!(room.board().people_votes().len(), 2);
    }

    #[test]
    fn force_continue_skips_validation_and_records_nothing() {
        let mut room = room_with(&["Alice", "Bob"]);
        let action = Action {
            entry: String::new(),
            ..Action::force("Bob", Phase::Suggestion)
        };

        let outcome = ok(&mut room, action);
        assert_eq!(
            outcome,
            Outcome::Advanced {
                to: Phase::DareVoting,
                forced: true
            }
        );
        assert!(room.board().dare_suggestions().is_empty());
        assert!(room.board().dare_votes().is_empty());
    }

    #[test]
    fn forced_advance_is_not_double_counted() {
        // Every response is in, so the auto-advance check would also fire if
        // the forced branch did not return early.
        let mut room = room_with(&["Alice"]);
        room.board.dare_suggestions.insert("Alice".into(), "jump".into());

        ok(&mut room, Action::force("Alice", Phase::Suggestion));
        assert_eq!(room.board().phase(), Phase::DareVoting);
    }

    #[test]
    fn any_action_on_finished_board_resets() {
        let mut room = room_in(Phase::Finished);
        room.board.dare_votes.insert("Alice".into(), "jump".into());
        room.board.people_votes.insert("Bob".into(), "Alice".into());

        let outcome = ok(&mut room, Action::submit("Bob", Phase::Finished, ""));
        assert_eq!(outcome, Outcome::Reset);
        assert_eq!(room.board(), &Board::new());
    }

    #[test]
    fn forced_from_finished_resets() {
        let mut room = room_in(Phase::Finished);
        let outcome = ok(&mut room, Action::force("Alice", Phase::Finished));
        assert_eq!(outcome, Outcome::Reset);
        assert_eq!(room.board().phase(), Phase::Suggestion);
        assert!(room.board().dare_suggestions().is_empty());
    }

    #[test]
    fn full_cycle_visits_every_phase() {
        let mut room = room_with(&["Alice"]);
        let mut seen = vec![room.board().phase()];
        for _ in 0..4 {
            let current = room.board().phase();
            ok(&mut room, Action::force("Alice", current));
            seen.push(room.board().phase());
        }
        assert_eq!(
            seen,
            vec![
                Phase::Suggestion,
                Phase::DareVoting,
                Phase::PeopleVoting,
                Phase::Finished,
                Phase::Suggestion,
            ]
        );
    }

    #[test]
    fn alice_and_bob_scenario() {
        let mut room = room_with(&["Alice", "Bob"]);

        ok(&mut room, Action::submit("Alice", Phase::Suggestion, "jump"));
        assert_eq!(room.board().phase(), Phase::Suggestion);

        let empty = Action::submit("Bob", Phase::Suggestion, "");
        assert_eq!(room.apply(&empty), Err(ActionError::EmptySuggestion));

        ok(&mut room, Action::submit("Bob", Phase::Suggestion, "sing"));
        assert_eq!(room.board().dare_suggestions().len(), 2);
        assert_eq!(room.board().phase(), Phase::DareVoting);

        ok(&mut room, Action::submit("Alice", Phase::DareVoting, "sing"));
        let retry = Action::submit("Alice", Phase::DareVoting, "fly");
        assert_eq!(room.apply(&retry), Err(ActionError::UnknownDare));
        assert_eq!(room.board().phase(), Phase::DareVoting);
        assert_eq!(room.board().dare_votes()["Alice"], "sing");
    }

    #[test]
    fn action_decodes_with_defaults() {
        let action: Action = serde_json::from_str(r#"{"player":"Alice","phase":3}"#).unwrap();
        assert_eq!(action, Action::submit("Alice", Phase::Finished, ""));

        let bad = serde_json::from_str::<Action>(r#"{"player":"Alice","phase":4}"#);
        assert!(bad.is_err());
    }
}
