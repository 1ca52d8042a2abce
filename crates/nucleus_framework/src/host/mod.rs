//! # Host Platform Interfaces
//!
//! The framework runs inside a host server that owns the world, the players and
//! the chat channel. This module defines what the framework needs from it.
//!
//! ## Core Services
//!
//! - **World Query** ([`WorldQuery`]) - Which players are where
//! - **Tracked Players** ([`TrackedPlayer`]) - Identity plus dead/synthetic flags
//! - **Messaging** ([`Messenger`]) - Where command output and errors are rendered
//! - **Command Senders** ([`CommandSender`]) - Who issued a command
//!
//! Scheduling lives in [`crate::scheduler`] and permissions in
//! [`crate::permissions`].
//!
//! ## Thread Safety
//!
//! Every interface is `Send + Sync`. The region tracker calls
//! [`WorldQuery::players_in`] from the main thread only, but hosts should not
//! rely on that.

mod memory;

pub use memory::{MemoryMessenger, SentMessage, SimulatedPlayer, SimulatedWorld};

use crate::types::{Location, PlayerId, WorldId};
use std::fmt;
use tracing::{info, warn};

// ============================================================================
// World & Player Queries
// ============================================================================

/// Read access to the host's world and entity model.
pub trait WorldQuery: Send + Sync {
    /// Players currently present in `world`.
    fn players_in(&self, world: &WorldId) -> Vec<PlayerId>;

    /// Current location of an online player.
    fn player_location(&self, player: PlayerId) -> Option<Location>;

    /// Resolves an online player by name, case-insensitively.
    fn find_player(&self, name: &str) -> Option<PlayerId>;

    /// Display name of an online player.
    fn player_name(&self, player: PlayerId) -> Option<String>;

    /// Moves an online player. Returns `false` if the player is offline.
    fn teleport(&self, player: PlayerId, location: &Location) -> bool;

    fn is_online(&self, player: PlayerId) -> bool {
        self.player_location(player).is_some()
    }

    fn is_world_loaded(&self, _world: &WorldId) -> bool {
        true
    }
}

/// A player as seen by the region tracker.
pub trait TrackedPlayer {
    fn id(&self) -> PlayerId;

    fn is_dead(&self) -> bool;

    /// Synthetic players (NPCs and other non-interactive proxies) are never tracked.
    fn is_synthetic(&self) -> bool;
}

// ============================================================================
// Command Senders
// ============================================================================

/// Kind of entity that issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderType {
    Console,
    Player,
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::Console => f.write_str("console"),
            SenderType::Player => f.write_str("player"),
        }
    }
}

/// The issuer of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandSender {
    Console,
    Player {
        id: PlayerId,
        name: String,
        op: bool,
    },
}

impl CommandSender {
    pub fn player(id: PlayerId, name: impl Into<String>) -> Self {
        CommandSender::Player {
            id,
            name: name.into(),
            op: false,
        }
    }

    pub fn operator(id: PlayerId, name: impl Into<String>) -> Self {
        CommandSender::Player {
            id,
            name: name.into(),
            op: true,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CommandSender::Console => "CONSOLE",
            CommandSender::Player { name, .. } => name,
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            CommandSender::Console => None,
            CommandSender::Player { id, .. } => Some(*id),
        }
    }

    /// Console is always treated as an operator.
    pub fn is_op(&self) -> bool {
        match self {
            CommandSender::Console => true,
            CommandSender::Player { op, .. } => *op,
        }
    }

    pub fn sender_type(&self) -> SenderType {
        match self {
            CommandSender::Console => SenderType::Console,
            CommandSender::Player { .. } => SenderType::Player,
        }
    }
}

// ============================================================================
// Messaging
// ============================================================================

/// Chat sink for command output.
pub trait Messenger: Send + Sync {
    fn tell(&self, recipient: &CommandSender, message: &str);

    fn tell_error(&self, recipient: &CommandSender, message: &str);

    fn tell_success(&self, recipient: &CommandSender, message: &str) {
        self.tell(recipient, message)
    }
}

/// Renders chat through `tracing`, for headless hosts where the console is the
/// only reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessenger;

impl Messenger for TracingMessenger {
    fn tell(&self, recipient: &CommandSender, message: &str) {
        info!(target: "chat", recipient = recipient.name(), "{}", message);
    }

    fn tell_error(&self, recipient: &CommandSender, message: &str) {
        warn!(target: "chat", recipient = recipient.name(), "{}", message);
    }

    fn tell_success(&self, recipient: &CommandSender, message: &str) {
        info!(target: "chat", recipient = recipient.name(), "✅ {}", message);
    }
}
