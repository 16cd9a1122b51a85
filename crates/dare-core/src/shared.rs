//! A [`Room`] behind a readers-writer lock.
//!
//! Every mutation (actions, joins, leaves, connection changes) takes the
//! write lock for its whole duration, so two submissions in the same phase
//! can never interleave. Queries and snapshots share the read lock. Nothing
//! here awaits while holding a guard except the lock acquisition itself, so
//! callers can send over slow sockets after the call returns.

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::action::{Action, Outcome};
use crate::error::ActionError;
use crate::protocol::RoomSnapshot;
use crate::room::{Player, Room};

pub struct SharedRoom {
    inner: RwLock<Room>,
}

impl SharedRoom {
    pub fn new(room: Room) -> Self {
        Self {
            inner: RwLock::new(room),
        }
    }

    /// Apply an action under the exclusive lock.
    pub async fn apply(&self, action: &Action) -> Result<Outcome, ActionError> {
        self.inner.write().await.apply(action)
    }

    pub async fn find_player_by_name(&self, name: &str) -> Option<(usize, Player)> {
        let room = self.inner.read().await;
        room.find_player_by_name(name)
            .map(|(index, player)| (index, player.clone()))
    }

    pub async fn find_player_by_index(&self, index: usize) -> Option<(Player, String)> {
        let room = self.inner.read().await;
        room.find_player_by_index(index)
            .map(|(player, name)| (player.clone(), name.to_string()))
    }

    pub async fn is_waiting_for(&self, player: &Player) -> bool {
        self.inner.read().await.is_waiting_for(player)
    }

    pub async fn is_waiting_for_anyone(&self) -> bool {
        self.inner.read().await.is_waiting_for_anyone()
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        self.inner.read().await.snapshot()
    }

    /// Shared access for multi-step reads that must see one consistent room.
    pub async fn read(&self) -> RwLockReadGuard<'_, Room> {
        self.inner.read().await
    }

    /// Exclusive access for roster changes.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Room> {
        self.inner.write().await
    }
}
