//! In-memory host implementations for headless hosts and tests.

use super::{CommandSender, Messenger, TrackedPlayer, WorldQuery};
use crate::types::{Location, PlayerId, WorldId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

/// Snapshot of a simulated player.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPlayer {
    pub id: PlayerId,
    pub name: String,
    pub location: Location,
    pub dead: bool,
    pub synthetic: bool,
}

impl TrackedPlayer for SimulatedPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// A [`WorldQuery`] backed by a map of online players.
///
/// With no explicitly loaded worlds, every world counts as loaded.
#[derive(Debug, Default)]
pub struct SimulatedWorld {
    players: RwLock<HashMap<PlayerId, SimulatedPlayer>>,
    loaded_worlds: RwLock<HashSet<WorldId>>,
}

impl SimulatedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the loaded worlds to the ones passed here.
    pub fn load_world(&self, world: impl Into<WorldId>) {
        write(&self.loaded_worlds).insert(world.into());
    }

    pub fn join(&self, name: impl Into<String>, location: Location) -> PlayerId {
        let id = PlayerId::new();
        let player = SimulatedPlayer {
            id,
            name: name.into(),
            location,
            dead: false,
            synthetic: false,
        };
        write(&self.players).insert(id, player);
        id
    }

    /// Brings a player back online under their old id.
    pub fn rejoin(&self, player: SimulatedPlayer) {
        write(&self.players).insert(player.id, player);
    }

    pub fn quit(&self, player: PlayerId) -> Option<SimulatedPlayer> {
        write(&self.players).remove(&player)
    }

    pub fn move_to(&self, player: PlayerId, location: Location) -> bool {
        match write(&self.players).get_mut(&player) {
            Some(p) => {
                p.location = location;
                true
            }
            None => false,
        }
    }

    pub fn set_dead(&self, player: PlayerId, dead: bool) {
        if let Some(p) = write(&self.players).get_mut(&player) {
            p.dead = dead;
        }
    }

    pub fn set_synthetic(&self, player: PlayerId, synthetic: bool) {
        if let Some(p) = write(&self.players).get_mut(&player) {
            p.synthetic = synthetic;
        }
    }

    pub fn player(&self, player: PlayerId) -> Option<SimulatedPlayer> {
        read(&self.players).get(&player).cloned()
    }
}

impl WorldQuery for SimulatedWorld {
    fn players_in(&self, world: &WorldId) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = read(&self.players)
            .values()
            .filter(|p| p.location.world == *world)
            .map(|p| p.id)
            .collect();
        players.sort();
        players
    }

    fn player_location(&self, player: PlayerId) -> Option<Location> {
        read(&self.players).get(&player).map(|p| p.location.clone())
    }

    fn find_player(&self, name: &str) -> Option<PlayerId> {
        read(&self.players)
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id)
    }

    fn player_name(&self, player: PlayerId) -> Option<String> {
        read(&self.players).get(&player).map(|p| p.name.clone())
    }

    fn teleport(&self, player: PlayerId, location: &Location) -> bool {
        self.move_to(player, location.clone())
    }

    fn is_world_loaded(&self, world: &WorldId) -> bool {
        let loaded = read(&self.loaded_worlds);
        loaded.is_empty() || loaded.contains(world)
    }
}

/// A message captured by [`MemoryMessenger`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub error: bool,
}

/// A [`Messenger`] that records everything it is asked to send.
#[derive(Debug, Default)]
pub struct MemoryMessenger {
    messages: Mutex<Vec<SentMessage>>,
}

impl MemoryMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Text of every message, in send order.
    pub fn lines(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.text).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.error)
            .map(|m| m.text)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
    }

    fn push(&self, recipient: &CommandSender, text: &str, error: bool) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(SentMessage {
                recipient: recipient.name().to_string(),
                text: text.to_string(),
                error,
            });
        }
    }
}

impl Messenger for MemoryMessenger {
    fn tell(&self, recipient: &CommandSender, message: &str) {
        self.push(recipient, message, false);
    }

    fn tell_error(&self, recipient: &CommandSender, message: &str) {
        self.push(recipient, message, true);
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
