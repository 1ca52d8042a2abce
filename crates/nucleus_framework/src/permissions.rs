//! # Permissions
//!
//! [`PermissionProvider`] is the contract the command pipeline checks senders
//! against. Registering many permissions at once (command trees) or checking
//! many at once (help rendering) happens inside a [`PermissionBatch`], which
//! defers the provider's recalculation until the outermost batch ends.
//!
//! [`MemoryPermissions`] is the bundled provider.

use crate::host::CommandSender;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Who holds a permission when nothing was granted explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDefault {
    /// Everyone.
    True,
    /// No one.
    False,
    /// Operators only.
    #[default]
    Op,
    /// Everyone except operators.
    NotOp,
}

impl PermissionDefault {
    pub fn allows(&self, sender: &CommandSender) -> bool {
        match self {
            PermissionDefault::True => true,
            PermissionDefault::False => false,
            PermissionDefault::Op => sender.is_op(),
            PermissionDefault::NotOp => !sender.is_op(),
        }
    }
}

/// A registered permission.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionInfo {
    pub name: String,
    pub default: PermissionDefault,
    pub description: String,
}

/// Permission backend provided by the host.
pub trait PermissionProvider: Send + Sync {
    fn has(&self, sender: &CommandSender, permission: &str) -> bool;

    /// Registers `permission`. Registering an existing name updates it.
    fn register(&self, permission: &str, default: PermissionDefault, description: &str);

    fn begin_batch(&self);

    fn end_batch(&self);
}

/// Batch scope over a [`PermissionProvider`]. The batch ends on drop.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::permissions::{MemoryPermissions, PermissionBatch, PermissionDefault, PermissionProvider};
///
/// let permissions = MemoryPermissions::new();
/// {
///     let _batch = PermissionBatch::new(&permissions);
///     permissions.register("nucleus.commands.jail", PermissionDefault::Op, "");
///     permissions.register("nucleus.commands.jail.addtp", PermissionDefault::Op, "");
/// }
/// assert_eq!(permissions.recalculations(), 1);
/// ```
pub struct PermissionBatch<'a> {
    provider: &'a dyn PermissionProvider,
}

impl<'a> PermissionBatch<'a> {
    pub fn new(provider: &'a dyn PermissionProvider) -> Self {
        provider.begin_batch();
        Self { provider }
    }
}

impl Drop for PermissionBatch<'_> {
    fn drop(&mut self) {
        self.provider.end_batch();
    }
}

// ============================================================================
// In-memory Provider
// ============================================================================

#[derive(Debug, Default)]
struct PermissionState {
    registered: HashMap<String, PermissionInfo>,
    grants: HashMap<PlayerId, HashMap<String, bool>>,
    batch_depth: usize,
    dirty: bool,
    recalculations: u64,
}

impl PermissionState {
    fn changed(&mut self) {
        if self.batch_depth > 0 {
            self.dirty = true;
        } else {
            self.recalculations += 1;
        }
    }
}

/// Permission provider backed by in-memory maps.
///
/// Explicit grants win over the registered default. Unregistered permissions
/// default to [`PermissionDefault::Op`]. The console holds every permission.
#[derive(Debug, Default)]
pub struct MemoryPermissions {
    state: Mutex<PermissionState>,
}

impl MemoryPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, player: PlayerId, permission: &str) {
        self.set(player, permission, true);
    }

    pub fn deny(&self, player: PlayerId, permission: &str) {
        self.set(player, permission, false);
    }

    /// Removes an explicit grant or denial.
    pub fn revoke(&self, player: PlayerId, permission: &str) -> bool {
        let mut state = self.lock();
        let removed = state
            .grants
            .get_mut(&player)
            .map(|grants| grants.remove(&permission.to_lowercase()).is_some())
            .unwrap_or(false);
        if removed {
            state.changed();
        }
        removed
    }

    pub fn permission(&self, name: &str) -> Option<PermissionInfo> {
        self.lock().registered.get(&name.to_lowercase()).cloned()
    }

    /// Registered permission names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().registered.keys().cloned().collect();
        names.sort();
        names
    }

    /// How many times the permission tree was recalculated.
    pub fn recalculations(&self) -> u64 {
        self.lock().recalculations
    }

    fn set(&self, player: PlayerId, permission: &str, value: bool) {
        let mut state = self.lock();
        state
            .grants
            .entry(player)
            .or_default()
            .insert(permission.to_lowercase(), value);
        state.changed();
    }

    fn lock(&self) -> MutexGuard<'_, PermissionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PermissionProvider for MemoryPermissions {
    fn has(&self, sender: &CommandSender, permission: &str) -> bool {
        let CommandSender::Player { id, .. } = sender else {
            return true;
        };

        let key = permission.to_lowercase();
        let state = self.lock();
        if let Some(granted) = state.grants.get(id).and_then(|grants| grants.get(&key)) {
            return *granted;
        }

        state
            .registered
            .get(&key)
            .map(|info| info.default)
            .unwrap_or_default()
            .allows(sender)
    }

    fn register(&self, permission: &str, default: PermissionDefault, description: &str) {
        let name = permission.to_lowercase();
        trace!("Registering permission {}", name);

        let mut state = self.lock();
        state.registered.insert(
            name.clone(),
            PermissionInfo {
                name,
                default,
                description: description.to_string(),
            },
        );
        state.changed();
    }

    fn begin_batch(&self) {
        self.lock().batch_depth += 1;
    }

    fn end_batch(&self) {
        let mut state = self.lock();
        state.batch_depth = state.batch_depth.saturating_sub(1);
        if state.batch_depth == 0 && state.dirty {
            state.dirty = false;
            state.recalculations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_holds_everything() {
        let permissions = MemoryPermissions::new();
        permissions.register("nucleus.secret", PermissionDefault::False, "");
        assert!(permissions.has(&CommandSender::Console, "nucleus.secret"));
    }

    #[test]
    fn test_defaults_and_grants() {
        let permissions = MemoryPermissions::new();
        let id = PlayerId::new();
        let player = CommandSender::player(id, "Steve");
        let op = CommandSender::operator(PlayerId::new(), "Admin");

        permissions.register("nucleus.commands.jail", PermissionDefault::Op, "Jail commands");
        assert!(!permissions.has(&player, "nucleus.commands.jail"));
        assert!(permissions.has(&op, "nucleus.commands.jail"));

        permissions.grant(id, "Nucleus.Commands.Jail");
        assert!(permissions.has(&player, "nucleus.commands.jail"));

        assert!(permissions.revoke(id, "nucleus.commands.jail"));
        assert!(!permissions.has(&player, "nucleus.commands.jail"));

        permissions.register("nucleus.commands.about", PermissionDefault::NotOp, "");
        assert!(permissions.has(&player, "nucleus.commands.about"));
        assert!(!permissions.has(&op, "nucleus.commands.about"));
    }

    #[test]
    fn test_unregistered_permission_requires_op() {
        let permissions = MemoryPermissions::new();
        let player = CommandSender::player(PlayerId::new(), "Steve");
        assert!(!permissions.has(&player, "nucleus.unknown"));
    }

    #[test]
    fn test_nested_batches_recalculate_once() {
        let permissions = MemoryPermissions::new();
        {
            let _outer = PermissionBatch::new(&permissions);
            permissions.register("a", PermissionDefault::True, "");
            {
                let _inner = PermissionBatch::new(&permissions);
                permissions.register("b", PermissionDefault::True, "");
            }
            assert_eq!(permissions.recalculations(), 0);
        }
        assert_eq!(permissions.recalculations(), 1);

        permissions.register("c", PermissionDefault::True, "");
        assert_eq!(permissions.recalculations(), 2);
    }

    #[test]
    fn test_empty_batch_does_not_recalculate() {
        let permissions = MemoryPermissions::new();
        drop(PermissionBatch::new(&permissions));
        assert_eq!(permissions.recalculations(), 0);
    }
}
