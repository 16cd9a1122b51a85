//! Room registry for the multi-room dare server.
//!
//! Rooms are looked up by code. Each [`RoomEntry`] pairs the game room with
//! an [`mpsc`] sender per live connection. The room itself only knows
//! connection ids; turning those into socket writes happens here, after the
//! room lock has been released.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dare_core::board::Phase;
use dare_core::protocol::{ROOM_CODE_LEN, ServerMessage, validate_room_code};
use dare_core::room::{Joined, validate_player_name};
use dare_core::{ConnectionId, Room, Settings, SharedRoom};
use tokio::sync::{Mutex, RwLock, mpsc};

/// Handle to a per-connection outbound channel.
///
/// The WebSocket write loop drains this receiver and forwards messages as
/// text frames.
pub type ConnTx = mpsc::UnboundedSender<ServerMessage>;
pub type ConnRx = mpsc::UnboundedReceiver<ServerMessage>;

/// A room plus the outbound channels of everyone connected to it.
pub struct RoomEntry {
    pub room: SharedRoom,
    senders: Mutex<HashMap<ConnectionId, ConnTx>>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room: SharedRoom::new(room),
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Send a message to each of the given connections.
    pub async fn send_to(&self, conns: &[ConnectionId], msg: &ServerMessage) {
        let senders = self.senders.lock().await;
        for conn in conns {
            if let Some(tx) = senders.get(conn) {
                // Ignore send failure: the connection may have just closed.
                let _ = tx.send(msg.clone());
            }
        }
    }

    pub async fn send_to_connection(&self, conn: ConnectionId, msg: &ServerMessage) {
        self.send_to(&[conn], msg).await;
    }

    /// Push the current room snapshot to every connection of every roster
    /// player.
    ///
    /// The senders lock is held from snapshot to enqueue, so concurrent
    /// broadcasts reach every channel in the order their snapshots were
    /// taken. Nothing else locks the senders while holding the room.
    pub async fn broadcast_board(&self) {
        let senders = self.senders.lock().await;
        let (snapshot, conns) = {
            let room = self.room.read().await;
            (room.snapshot(), room.connection_ids())
        };
        let msg = ServerMessage::Board { room: snapshot };
        for conn in &conns {
            if let Some(tx) = senders.get(conn) {
                let _ = tx.send(msg.clone());
            }
        }
    }

    /// Remind every player the room is still waiting on, other than `from`.
    ///
    /// Returns how many connections were nudged.
    pub async fn nudge(&self, from: &str) -> Result<usize, String> {
        let conns: Vec<ConnectionId> = {
            let room = self.room.read().await;
            if room.board().phase() == Phase::Finished {
                return Err("The game has ended".to_string());
            }
            room.waiting_players()
                .filter(|p| p.name() != from)
                .flat_map(|p| p.connections().iter().copied())
                .collect()
        };
        self.send_to(
            &conns,
            &ServerMessage::Nudge {
                from: from.to_string(),
            },
        )
        .await;
        Ok(conns.len())
    }

    async fn connection_count(&self) -> usize {
        self.senders.lock().await.len()
    }
}

/// A connection that has been bound to a room and player.
pub struct JoinedRoom {
    pub code: String,
    /// The player's name as stored on the roster (trimmed).
    pub name: String,
    /// `true` if the name was already on the roster.
    pub rejoined: bool,
    pub rx: ConnRx,
    pub entry: Arc<RoomEntry>,
}

/// Manages all active rooms.
///
/// Lock order is always registry first, then room. Joins hold the registry
/// write lock while attaching so a concurrent reap cannot remove the room
/// between lookup and attach.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<RoomEntry>>>,
    next_connection: AtomicU64,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a room under a freshly generated code and join it as `name`.
    pub async fn create_room(
        &self,
        name: &str,
        conn: ConnectionId,
        settings: Settings,
    ) -> Result<JoinedRoom, String> {
        validate_player_name(name).map_err(|e| e.to_string())?;

        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };
        let entry = Arc::new(RoomEntry::new(Room::new(code.clone(), settings)));
        rooms.insert(code.clone(), Arc::clone(&entry));
        tracing::info!(room = %code, "Created room");

        attach(entry, code, name, conn).await
    }

    /// Join the room with the given code, creating it if nobody has asked for
    /// it yet. `settings` are only used when the room is created here.
    pub async fn join_room(
        &self,
        code: &str,
        name: &str,
        conn: ConnectionId,
        settings: Option<Settings>,
    ) -> Result<JoinedRoom, String> {
        let code = validate_room_code(code)?;
        validate_player_name(name).map_err(|e| e.to_string())?;

        let mut rooms = self.rooms.write().await;
        let entry = match rooms.get(&code) {
            Some(entry) => Arc::clone(entry),
            None => {
                let entry = Arc::new(RoomEntry::new(Room::new(
                    code.clone(),
                    settings.unwrap_or_default(),
                )));
                rooms.insert(code.clone(), Arc::clone(&entry));
                tracing::info!(room = %code, "Created room");
                entry
            }
        };

        attach(entry, code, name, conn).await
    }

    /// Look up a room by code.
    pub async fn get_room(&self, code: &str) -> Option<Arc<RoomEntry>> {
        let code = validate_room_code(code).ok()?;
        let rooms = self.rooms.read().await;
        rooms.get(&code).cloned()
    }

    /// Remove `name` from the room's roster and tell everyone else.
    pub async fn leave_room(&self, code: &str, name: &str) -> bool {
        let Some(entry) = self.get_room(code).await else {
            return false;
        };
        let removed = entry.room.write().await.remove_player(name);
        let Some(player) = removed else {
            return false;
        };

        // Every tab of the player gets `Left`; dropping the senders then ends
        // their write loops.
        {
            let mut senders = entry.senders.lock().await;
            for conn in player.connections() {
                if let Some(tx) = senders.remove(conn) {
                    let _ = tx.send(ServerMessage::Left);
                }
            }
        }
        tracing::info!(room = %code, player = %name, "Player left");
        entry.broadcast_board().await;
        true
    }

    /// Forget a closed connection. The player stays on the roster; the room
    /// is removed once nobody is connected to it any more.
    pub async fn disconnect(&self, code: &str, conn: ConnectionId) {
        let Ok(code) = validate_room_code(code) else {
            return;
        };
        let Some(entry) = self.get_room(&code).await else {
            return;
        };

        entry.senders.lock().await.remove(&conn);
        let (player, still_connected) = {
            let mut room = entry.room.write().await;
            let player = room.detach_connection(conn).map(str::to_string);
            (player, room.has_connections())
        };
        tracing::info!(room = %code, player = ?player, %conn, "Connection closed");

        if still_connected {
            // Connection counts are part of the snapshot.
            entry.broadcast_board().await;
            return;
        }

        let mut rooms = self.rooms.write().await;
        let is_current = rooms
            .get(&code)
            .is_some_and(|current| Arc::ptr_eq(current, &entry));
        if is_current
            && !entry.room.read().await.has_connections()
            && entry.connection_count().await == 0
        {
            rooms.remove(&code);
            tracing::info!(room = %code, "Removed empty room");
        }
    }

    /// List active room codes.
    pub async fn list_rooms(&self) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut codes: Vec<String> = rooms.keys().cloned().collect();
        codes.sort();
        codes
    }
}

/// Register `conn`'s outbound channel and attach it to `name` on the roster.
///
/// The sender goes in first so that any broadcast which sees the new
/// connection on the roster can also reach it.
async fn attach(
    entry: Arc<RoomEntry>,
    code: String,
    name: &str,
    conn: ConnectionId,
) -> Result<JoinedRoom, String> {
    let (tx, rx) = mpsc::unbounded_channel();
    entry.senders.lock().await.insert(conn, tx);

    let joined = {
        let mut room = entry.room.write().await;
        room.join(name, Some(conn)).map(|joined| {
            let name = room.players()[joined.index()].name().to_string();
            (joined, name)
        })
    };

    match joined {
        Ok((joined, name)) => {
            let rejoined = matches!(joined, Joined::Existing { .. });
            tracing::info!(room = %code, player = %name, %conn, rejoined, "Player joined");
            Ok(JoinedRoom {
                code,
                name,
                rejoined,
                rx,
                entry,
            })
        }
        Err(e) => {
            entry.senders.lock().await.remove(&conn);
            Err(e.to_string())
        }
    }
}

/// Generate a random upper-case alphanumeric room code.
fn generate_room_code() -> String {
    use rand::RngExt;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}
