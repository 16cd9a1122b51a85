//! Rooms, their roster, and the read-only queries over them.
//!
//! A [`Room`] owns one [`Board`], an ordered roster of [`Player`]s and the
//! room's [`Settings`]. The mutating entry point, [`Room::apply`], lives in
//! [`crate::action`]; concurrent access goes through
//! [`SharedRoom`](crate::shared::SharedRoom).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Phase};
use crate::error::JoinError;
use crate::protocol::{PlayerSummary, RoomResults, RoomSnapshot};

/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Opaque identifier of one live connection.
///
/// The transport owns the actual socket; rooms only remember which
/// identifiers belong to which player so the transport knows where to fan
/// out board updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Optional rule variants chosen when the room is created.
///
/// Phase advancement does not read these; they are carried for clients that
/// hide authors or restrict votes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub vote_own_dare: bool,
    #[serde(default)]
    pub vote_self: bool,
    #[serde(default)]
    pub anonymous_dare_voting: bool,
    #[serde(default)]
    pub anonymous_person_voting: bool,
}

/// A named identity in a room plus its live connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    name: String,
    connections: HashSet<ConnectionId>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connections: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connections(&self) -> &HashSet<ConnectionId> {
        &self.connections
    }

    /// A player with no live connection is still on the roster.
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub(crate) fn attach(&mut self, conn: ConnectionId) -> bool {
        self.connections.insert(conn)
    }

    pub(crate) fn detach(&mut self, conn: ConnectionId) -> bool {
        self.connections.remove(&conn)
    }
}

/// Result of [`Room::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    /// A new player was appended to the roster.
    New { index: usize },
    /// The name was already on the roster; the connection was attached to it.
    Existing { index: usize },
}

impl Joined {
    pub fn index(self) -> usize {
        match self {
            Joined::New { index } | Joined::Existing { index } => index,
        }
    }
}

/// One game room.
#[derive(Debug, Clone)]
pub struct Room {
    code: String,
    pub(crate) players: Vec<Player>,
    pub(crate) board: Board,
    settings: Settings,
}

impl Room {
    /// Create an empty room: no players, a fresh board.
    pub fn new(code: impl Into<String>, settings: Settings) -> Self {
        Self {
            code: code.into(),
            players: Vec::new(),
            board: Board::new(),
            settings,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Look up a player and their roster index by exact name.
    pub fn find_player_by_name(&self, name: &str) -> Option<(usize, &Player)> {
        self.players
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// Look up a player and their name by roster index.
    pub fn find_player_by_index(&self, index: usize) -> Option<(&Player, &str)> {
        self.players.get(index).map(|p| (p, p.name.as_str()))
    }

    /// Whether the current phase still expects a response from `player`.
    ///
    /// A phase without an active response map (Finished) waits on nobody.
    pub fn is_waiting_for(&self, player: &Player) -> bool {
        self.board
            .active_responses()
            .is_some_and(|responses| !responses.contains_key(&player.name))
    }

    /// Whether any roster player still owes a response. An empty roster is
    /// never waiting.
    pub fn is_waiting_for_anyone(&self) -> bool {
        self.players.iter().any(|p| self.is_waiting_for(p))
    }

    /// Players the current phase is still waiting on, in roster order.
    pub fn waiting_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| self.is_waiting_for(p))
    }

    /// Every live connection of every roster player.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.players
            .iter()
            .flat_map(|p| p.connections.iter().copied())
            .collect()
    }

    pub fn has_connections(&self) -> bool {
        self.players.iter().any(Player::is_connected)
    }

    // ── Roster management ────────────────────────────────────────────────

    /// Add `name` to the roster, or attach `conn` to the player already
    /// using that name.
    ///
    /// This is where name uniqueness is enforced: a second join under an
    /// existing name is treated as another tab of the same player.
    pub fn join(&mut self, name: &str, conn: Option<ConnectionId>) -> Result<Joined, JoinError> {
        let name = validate_player_name(name)?;

        let joined = match self.players.iter().position(|p| p.name == name) {
            Some(index) => Joined::Existing { index },
            None => {
                self.players.push(Player::new(name));
                Joined::New {
                    index: self.players.len() - 1,
                }
            }
        };

        if let Some(conn) = conn {
            self.players[joined.index()].attach(conn);
        }
        Ok(joined)
    }

    /// Remove a player from the roster. Their recorded responses stay on the
    /// board until it is reset.
    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.name == name)?;
        Some(self.players.remove(index))
    }

    /// Detach a connection from whichever player holds it, returning that
    /// player's name.
    pub fn detach_connection(&mut self, conn: ConnectionId) -> Option<&str> {
        self.players
            .iter_mut()
            .find(|p| p.connections.contains(&conn))
            .map(|p| {
                p.detach(conn);
                p.name.as_str()
            })
    }

    /// Replace the board with a fresh one.
    pub fn reset(&mut self) {
        self.board = Board::new();
    }

    // ── Snapshots ────────────────────────────────────────────────────────

    /// Serializable view of the room for broadcasting to clients.
    pub fn snapshot(&self) -> RoomSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| PlayerSummary {
                name: p.name.clone(),
                connections: p.connections.len(),
                waiting: self.is_waiting_for(p),
            })
            .collect();

        let results = (self.board.phase == Phase::Finished).then(|| RoomResults {
            dare_tally: self.board.dare_tally(),
            people_tally: self.board.people_tally(),
            winning_dare: self.board.winning_dare(),
            chosen_player: self.board.chosen_player(),
        });

        RoomSnapshot {
            code: self.code.clone(),
            players,
            board: self.board.clone(),
            settings: self.settings,
            results,
        }
    }
}

/// Trim and check a player name.
pub fn validate_player_name(name: &str) -> Result<&str, JoinError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(JoinError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(JoinError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name)
}
