//! WebSocket handler for the Axum dare server.
//!
//! Each WebSocket connection follows this lifecycle:
//!
//! 1. Client sends `CreateRoom` or `JoinRoom`.
//! 2. On success the connection is bound to a room code + player name.
//! 3. Subsequent `ClientMessage`s are applied to that room; every change is
//!    broadcast to all connections in the room, every rejection goes back to
//!    this connection only.
//! 4. On disconnect the connection is detached and the room may be reaped.
//!    A connection whose outbound channel is closed (the player left from
//!    another tab) ends the same way.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dare_core::protocol::{ClientMessage, ServerMessage};
use dare_core::{Action, ConnectionId, Outcome};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::registry::{ConnRx, JoinedRoom, RoomEntry, RoomManager};

type WsSink = Arc<Mutex<futures_util::stream::SplitSink<WebSocket, Message>>>;

/// Drive a single WebSocket connection.
///
/// Called after the Axum upgrade; `socket` is the full-duplex WebSocket.
pub async fn handle_socket(socket: WebSocket, room_manager: Arc<RoomManager>) {
    let (ws_sink, mut ws_stream) = socket.split();
    let ws_sink: WsSink = Arc::new(Mutex::new(ws_sink));
    let conn = room_manager.next_connection_id();

    // ── Lobby: wait for room assignment ──────────────────────────────────
    let joined: JoinedRoom = loop {
        let text = match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return,
            _ => continue,
        };
        let msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                let err = ServerMessage::Error {
                    message: format!("Invalid message: {e}"),
                };
                send_one(&ws_sink, &err).await;
                continue;
            }
        };

        let result = match msg {
            ClientMessage::CreateRoom { name, settings } => {
                room_manager.create_room(&name, conn, settings).await
            }
            ClientMessage::JoinRoom {
                code,
                name,
                settings,
            } => room_manager.join_room(&code, &name, conn, settings).await,
            ClientMessage::Ping => {
                send_one(&ws_sink, &ServerMessage::Pong).await;
                continue;
            }
            _ => {
                send_one(
                    &ws_sink,
                    &ServerMessage::Error {
                        message: "Must create or join a room first".to_string(),
                    },
                )
                .await;
                continue;
            }
        };

        match result {
            Ok(joined) => break joined,
            Err(message) => send_one(&ws_sink, &ServerMessage::RoomError { message }).await,
        }
    };

    let JoinedRoom {
        code,
        name,
        rejoined,
        rx,
        entry,
    } = joined;

    let mut write_handle = tokio::spawn(forward(rx, Arc::clone(&ws_sink)));

    // Confirmation goes through the channel so it arrives before the first
    // board broadcast.
    entry
        .send_to_connection(
            conn,
            &ServerMessage::RoomJoined {
                code: code.clone(),
                name: name.clone(),
                rejoined,
            },
        )
        .await;
    entry.broadcast_board().await;

    // ── Game loop ────────────────────────────────────────────────────────
    let session = Session {
        code: &code,
        name: &name,
        conn,
        entry: &entry,
        room_manager: &room_manager,
    };
    let mut left = false;
    let mut write_done = false;
    loop {
        let frame = tokio::select! {
            frame = ws_stream.next() => frame,
            _ = &mut write_handle => {
                write_done = true;
                break;
            }
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                let msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        session
                            .reply(&ServerMessage::Error {
                                message: format!("Invalid message: {e}"),
                            })
                            .await;
                        continue;
                    }
                };

                if session.process(msg).await == Flow::Left {
                    left = true;
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            _ => continue,
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────────
    if left {
        // The sender is already gone; let the write task flush `Left`.
        let _ = write_handle.await;
    } else if !write_done {
        write_handle.abort();
    }
    room_manager.disconnect(&code, conn).await;
}

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Drain the connection's channel into the sink as JSON text frames.
///
/// Returns once every sender is gone or the sink stops accepting frames.
async fn forward<S>(mut rx: ConnRx, sink: Arc<Mutex<S>>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let json = match serde_json::to_string(&msg) {
            Ok(j) => j,
            Err(_) => continue,
        };
        let mut sink = sink.lock().await;
        if sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Send a single `ServerMessage` directly on the raw WebSocket sink
/// (used during the lobby phase before the mpsc channel exists).
async fn send_one(sink: &WsSink, msg: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(msg) {
        let mut s = sink.lock().await;
        let _ = s.send(Message::Text(json.into())).await;
    }
}

// ─── Message processing ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Left,
}

/// A connection bound to a room and player.
struct Session<'a> {
    code: &'a str,
    name: &'a str,
    conn: ConnectionId,
    entry: &'a Arc<RoomEntry>,
    room_manager: &'a RoomManager,
}

impl Session<'_> {
    async fn reply(&self, msg: &ServerMessage) {
        self.entry.send_to_connection(self.conn, msg).await;
    }

    /// Process a single [`ClientMessage`] within an established room session.
    async fn process(&self, msg: ClientMessage) -> Flow {
        match msg {
            // ── Join / room ops are no-ops once in a room ────────────────
            ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } => {
                self.reply(&ServerMessage::Error {
                    message: "Already in a room".to_string(),
                })
                .await;
            }

            ClientMessage::Ping => self.reply(&ServerMessage::Pong).await,

            ClientMessage::GetRoom => {
                let room = self.entry.room.snapshot().await;
                self.reply(&ServerMessage::Board { room }).await;
            }

            ClientMessage::Submit {
                phase,
                entry,
                force_continue,
            } => {
                let action = Action {
                    player: self.name.to_string(),
                    phase,
                    entry,
                    force_continue,
                };
                self.submit(&action).await;
            }

            ClientMessage::Nudge => match self.entry.nudge(self.name).await {
                Ok(nudged) => {
                    tracing::info!(room = %self.code, player = %self.name, nudged, "Nudged room");
                }
                Err(message) => self.reply(&ServerMessage::Error { message }).await,
            },

            ClientMessage::Leave => {
                if self.room_manager.leave_room(self.code, self.name).await {
                    return Flow::Left;
                }
                self.reply(&ServerMessage::Error {
                    message: "Not on the roster".to_string(),
                })
                .await;
            }
        }
        Flow::Continue
    }

    /// Apply an action; broadcast the board on success, reply on rejection.
    async fn submit(&self, action: &Action) {
        match self.entry.room.apply(action).await {
            Ok(outcome) => {
                match outcome {
                    Outcome::Recorded => {
                        tracing::debug!(room = %self.code, player = %self.name, phase = %action.phase, "Recorded entry");
                    }
                    Outcome::Advanced { to, forced } => {
                        tracing::info!(room = %self.code, player = %self.name, phase = %to, forced, "Phase advanced");
                    }
                    Outcome::Reset => {
                        tracing::info!(room = %self.code, player = %self.name, "Board reset");
                    }
                }
                self.entry.broadcast_board().await;
            }
            Err(error) => {
                tracing::debug!(room = %self.code, player = %self.name, %error, "Rejected action");
                self.reply(&ServerMessage::rejected(error)).await;
            }
        }
    }
}
