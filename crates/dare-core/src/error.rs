//! Errors returned by room operations.
//!
//! None of these are fatal: each one is reported back to the connection that
//! caused it and the room is left exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an [`Action`](crate::action::Action) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionError {
    /// The action targeted a phase other than the board's current one.
    #[error("action submitted with stale state")]
    StalePhase,

    /// The acting player is not on the room's roster.
    #[error("no such player in lobby")]
    UnknownPlayer,

    /// An empty dare was suggested.
    #[error("must provide a dare suggestion in suggestion phase")]
    EmptySuggestion,

    /// The voted dare text matches no suggestion.
    #[error("could not find chosen dare to vote for")]
    UnknownDare,

    /// The voted name matches no player on the roster.
    #[error("could not find chosen player to vote for")]
    UnknownVoteTarget,
}

/// Why a player could not join a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("player name must be at most {max} characters")]
    NameTooLong { max: usize },
}
