//! Core game logic for the dare party game.
//!
//! Players in a [`Room`](room::Room) suggest dares, vote for one, then vote
//! for who has to do it. The room's [`Board`](board::Board) enforces the
//! phase order; [`SharedRoom`](shared::SharedRoom) makes it safe to drive
//! from many connections at once.

pub mod action;
pub mod board;
pub mod error;
pub mod protocol;
pub mod room;
pub mod shared;

pub use action::{Action, Outcome};
pub use board::{Board, Phase};
pub use error::{ActionError, JoinError};
pub use room::{ConnectionId, Player, Room, Settings};
pub use shared::SharedRoom;
