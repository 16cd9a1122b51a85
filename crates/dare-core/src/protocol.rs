use serde::{Deserialize, Serialize};

use crate::board::{Board, Phase, Tally};
use crate::error::ActionError;
use crate::room::Settings;

/// Serializable player info for the wire protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummary {
    pub name: String,
    /// Number of live connections (tabs) using this name.
    pub connections: usize,
    /// Whether the current phase still expects a response from this player.
    pub waiting: bool,
}

/// Vote counts shown once a round is finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomResults {
    pub dare_tally: Vec<Tally>,
    pub people_tally: Vec<Tally>,
    pub winning_dare: Option<Tally>,
    pub chosen_player: Option<Tally>,
}

/// Full view of a room, pushed to every connection after each change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub code: String,
    pub players: Vec<PlayerSummary>,
    pub board: Board,
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RoomResults>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Create a room with a fresh code and join it.
    CreateRoom {
        name: String,
        #[serde(default)]
        settings: Settings,
    },

    /// Join the room with the given code, creating it if it does not exist.
    /// `settings` only apply when this join creates the room.
    JoinRoom {
        code: String,
        name: String,
        #[serde(default)]
        settings: Option<Settings>,
    },

    /// Submit an entry for the current phase, or force the room onward.
    Submit {
        phase: Phase,
        #[serde(default)]
        entry: String,
        #[serde(default)]
        force_continue: bool,
    },

    /// Remind everyone the room is still waiting on.
    Nudge,

    /// Request the current room snapshot.
    GetRoom,

    /// Leave the room's roster.
    Leave,

    /// Ping to check connection
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Successfully joined a room.
    RoomJoined {
        code: String,
        name: String,
        /// `true` if the name was already on the roster.
        rejoined: bool,
    },

    /// The room changed; here is its new state.
    Board { room: RoomSnapshot },

    /// Another player is waiting for you.
    Nudge { from: String },

    /// Your action was rejected; the board is unchanged.
    Rejected { error: ActionError, message: String },

    /// You left the room.
    Left,

    /// Room-related error (e.g. invalid code, bad name).
    RoomError { message: String },

    /// Pong response to ping
    Pong,

    /// Any other failure on this connection: a malformed frame, a message
    /// out of lobby/room order, or a nudge or leave that could not be done.
    Error { message: String },
}

impl ServerMessage {
    pub fn rejected(error: ActionError) -> Self {
        ServerMessage::Rejected {
            error,
            message: error.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room code validation
// ---------------------------------------------------------------------------

/// Length of generated room codes.
pub const ROOM_CODE_LEN: usize = 6;

/// Validate a room code and normalise it to upper case.
///
/// Room codes must be non-empty, alphanumeric, and fewer than 20 characters.
pub fn validate_room_code(code: &str) -> Result<String, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Room code cannot be empty".to_string());
    }
    if code.len() >= 20 {
        return Err("Room code must be fewer than 20 characters".to_string());
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Room code must be alphanumeric".to_string());
    }
    Ok(code.to_ascii_uppercase())
}
