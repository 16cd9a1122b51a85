//! The game board: the current phase plus the three phase-scoped response maps.
//!
//! A [`Board`] is plain data. It can say which response map is active and
//! whether a player has answered in the current phase, but it never validates
//! or advances anything itself; all mutation goes through
//! [`Room::apply`](crate::room::Room::apply) while the room is write-locked.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player name → submitted entry.
pub type Responses = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The four ordered stages of a round.
///
/// On the wire a phase is its ordinal (`0..=3`), so clients can compare and
/// increment it as a plain number. Decoding any other value fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    /// Every player proposes a dare.
    #[default]
    Suggestion,
    /// Every player votes for one of the suggested dares.
    DareVoting,
    /// Every player votes for the person who should perform it.
    PeopleVoting,
    /// Results are shown; the next action starts a fresh round.
    Finished,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Suggestion,
        Phase::DareVoting,
        Phase::PeopleVoting,
        Phase::Finished,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// The phase that follows this one, or `None` past [`Phase::Finished`].
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Suggestion => Some(Phase::DareVoting),
            Phase::DareVoting => Some(Phase::PeopleVoting),
            Phase::PeopleVoting => Some(Phase::Finished),
            Phase::Finished => None,
        }
    }

    /// Human-readable label for logs and UI display.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Suggestion => "Suggestion",
            Phase::DareVoting => "Dare voting",
            Phase::PeopleVoting => "People voting",
            Phase::Finished => "Finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.ordinal()
    }
}

/// A phase ordinal outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid phase {0}, expected 0-3")]
pub struct InvalidPhase(pub u8);

impl TryFrom<u8> for Phase {
    type Error = InvalidPhase;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(InvalidPhase(value))
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Current phase and every response recorded so far this round.
///
/// Maps of earlier phases stay populated after the phase moves on, so the
/// final screen can show who suggested and voted for what. They are only
/// cleared when the whole board is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub(crate) phase: Phase,
    pub(crate) dare_suggestions: Responses,
    pub(crate) dare_votes: Responses,
    pub(crate) people_votes: Responses,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dare_suggestions(&self) -> &Responses {
        &self.dare_suggestions
    }

    pub fn dare_votes(&self) -> &Responses {
        &self.dare_votes
    }

    pub fn people_votes(&self) -> &Responses {
        &self.people_votes
    }

    /// The response map written during the current phase.
    ///
    /// [`Phase::Finished`] collects no responses and returns `None`.
    pub fn active_responses(&self) -> Option<&Responses> {
        match self.phase {
            Phase::Suggestion => Some(&self.dare_suggestions),
            Phase::DareVoting => Some(&self.dare_votes),
            Phase::PeopleVoting => Some(&self.people_votes),
            Phase::Finished => None,
        }
    }

    pub(crate) fn active_responses_mut(&mut self) -> Option<&mut Responses> {
        match self.phase {
            Phase::Suggestion => Some(&mut self.dare_suggestions),
            Phase::DareVoting => Some(&mut self.dare_votes),
            Phase::PeopleVoting => Some(&mut self.people_votes),
            Phase::Finished => None,
        }
    }

    /// Whether `name` has an entry in the active response map.
    ///
    /// Always `false` when no map is active: a finished board is never
    /// "waiting" on anyone, but nobody has "responded" to it either.
    pub fn has_responded(&self, name: &str) -> bool {
        self.active_responses()
            .is_some_and(|responses| responses.contains_key(name))
    }

    /// Whether some player suggested exactly `text`.
    pub fn is_suggested(&self, text: &str) -> bool {
        self.dare_suggestions.values().any(|dare| dare == text)
    }

    /// Dare votes counted per suggestion text, most votes first.
    pub fn dare_tally(&self) -> Vec<Tally> {
        tally(&self.dare_votes)
    }

    /// Person votes counted per player name, most votes first.
    pub fn people_tally(&self) -> Vec<Tally> {
        tally(&self.people_votes)
    }

    /// The dare with strictly the most votes, if there is one.
    pub fn winning_dare(&self) -> Option<Tally> {
        unique_leader(self.dare_tally())
    }

    /// The player with strictly the most votes, if there is one.
    pub fn chosen_player(&self) -> Option<Tally> {
        unique_leader(self.people_tally())
    }
}

// ---------------------------------------------------------------------------
// Tallies
// ---------------------------------------------------------------------------

/// Number of votes one entry received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub entry: String,
    pub votes: usize,
}

/// Count votes per entry. Ties are broken alphabetically so the order is
/// stable across snapshots.
fn tally(votes: &Responses) -> Vec<Tally> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in votes.values() {
        *counts.entry(entry.as_str()).or_default() += 1;
    }

    let mut tally: Vec<Tally> = counts
        .into_iter()
        .map(|(entry, votes)| Tally {
            entry: entry.to_string(),
            votes,
        })
        .collect();
    tally.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.entry.cmp(&b.entry)));
    tally
}

fn unique_leader(tally: Vec<Tally>) -> Option<Tally> {
    if let [first, second, ..] = tally.as_slice()
        && first.votes == second.votes
    {
        return None;
    }
    tally.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(pairs: &[(&str, &str)]) -> Responses {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn new_board_starts_in_suggestion_with_empty_maps() {
        let board = Board::new();
        assert_eq!(board.phase(), Phase::Suggestion);
        assert!(board.dare_suggestions().is_empty());
        assert!(board.dare_votes().is_empty());
        assert!(board.people_votes().is_empty());
    }

    #[test]
    fn phase_order_ends_at_finished() {
        assert_eq!(Phase::Suggestion.next(), Some(Phase::DareVoting));
        assert_eq!(Phase::DareVoting.next(), Some(Phase::PeopleVoting));
        assert_eq!(Phase::PeopleVoting.next(), Some(Phase::Finished));
        assert_eq!(Phase::Finished.next(), None);
    }

    #[test]
    fn phase_round_trips_through_its_ordinal() {
        for phase in Phase::ALL {
            assert_eq!(Phase::try_from(phase.ordinal()), Ok(phase));
        }
        assert_eq!(Phase::try_from(4), Err(InvalidPhase(4)));
        assert_eq!(Phase::try_from(255), Err(InvalidPhase(255)));
    }

    #[test]
    fn phase_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Phase::PeopleVoting).unwrap(), "2");
        let phase: Phase = serde_json::from_str("1").unwrap();
        assert_eq!(phase, Phase::DareVoting);
        assert!(serde_json::from_str::<Phase>("7").is_err());
        assert!(serde_json::from_str::<Phase>("-1").is_err());
    }

    #[test]
    fn active_map_follows_phase() {
        let mut board = Board::new();
        board.dare_suggestions = responses(&[("Alice", "jump")]);
        board.dare_votes = responses(&[("Bob", "jump")]);
        board.people_votes = responses(&[("Carol", "Alice")]);

        assert_eq!(board.active_responses(), Some(&board.dare_suggestions));
        board.phase = Phase::DareVoting;
        assert_eq!(board.active_responses(), Some(&board.dare_votes));
        board.phase = Phase::PeopleVoting;
        assert_eq!(board.active_responses(), Some(&board.people_votes));
        board.phase = Phase::Finished;
        assert_eq!(board.active_responses(), None);
    }

    #[test]
    fn has_responded_only_looks_at_active_map() {
        let mut board = Board::new();
        board.dare_suggestions = responses(&[("Alice", "jump")]);

        assert!(board.has_responded("Alice"));
        assert!(!board.has_responded("Bob"));
        assert!(!board.has_responded("alice"));

        board.phase = Phase::DareVoting;
        assert!(!board.has_responded("Alice"));

        board.phase = Phase::Finished;
        assert!(!board.has_responded("Alice"));
    }

    #[test]
    fn is_suggested_matches_text_not_author() {
        let mut board = Board::new();
        board.dare_suggestions = responses(&[("Alice", "jump"), ("Bob", "sing")]);

        assert!(board.is_suggested("sing"));
        assert!(!board.is_suggested("Bob"));
        assert!(!board.is_suggested("Sing"));
    }

    #[test]
    fn tally_orders_by_votes_then_entry() {
        let mut board = Board::new();
        board.dare_votes = responses(&[
            ("Alice", "sing"),
            ("Bob", "jump"),
            ("Carol", "sing"),
            ("Dave", "dance"),
        ]);

        let tally = board.dare_tally();
        assert_eq!(
            tally,
            vec![
                Tally { entry: "sing".into(), votes: 2 },
                Tally { entry: "dance".into(), votes: 1 },
                Tally { entry: "jump".into(), votes: 1 },
            ]
        );
        assert_eq!(board.winning_dare().map(|t| t.entry), Some("sing".to_string()));
    }

    #[test]
    fn tied_vote_has_no_leader() {
        let mut board = Board::new();
        board.people_votes = responses(&[("Alice", "Bob"), ("Bob", "Alice")]);
        assert_eq!(board.people_tally().len(), 2);
        assert_eq!(board.chosen_player(), None);
        assert_eq!(Board::new().winning_dare(), None);
    }
}
