//! # Jail Service
//!
//! Jails are named sets of teleport locations plus a release location.
//! Imprisoning a player moves them to a random teleport of the jail and opens a
//! session that the warden closes once it expires.
//!
//! ## Warden
//!
//! The warden runs on the main thread every `warden_interval_ticks` (one minute
//! at 20 ticks per second). For every session that expired or was released it
//! teleports the player to the release location, or records a late release
//! when the player is offline so the teleport happens on their next join.
//! Players still serving time are reminded when at most 5 minutes remain and
//! on every multiple of 10 minutes.

use crate::config::JailConfig;
use crate::host::{CommandSender, Messenger, WorldQuery};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::types::{Location, PlayerId};
use crate::utils::{current_timestamp, normalize_name};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the jail every [`JailManager`] creates for its owner.
pub const DEFAULT_JAIL: &str = "default";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JailError {
    #[error("There is already a location named '{0}'.")]
    DuplicateTeleport(String),

    #[error("Teleport location names cannot be empty.")]
    EmptyName,

    #[error("Jail '{0}' is already registered.")]
    DuplicateJail(String),

    #[error("Jail '{0}' has no teleport locations.")]
    NoTeleports(String),

    #[error("Sentence must be at least one minute.")]
    InvalidSentence,

    #[error("A sentence of {0} minutes is too long.")]
    SentenceTooLong(u64),
}

// ============================================================================
// Jail
// ============================================================================

/// A teleport location with a name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocation {
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Default)]
struct JailState {
    teleports: BTreeMap<String, NamedLocation>,
    release: Option<Location>,
}

/// A jail owned by a plugin.
#[derive(Debug)]
pub struct Jail {
    owner: String,
    name: String,
    state: RwLock<JailState>,
}

impl Jail {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            state: RwLock::new(JailState::default()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry key: `{owner}:{name}`, lower-cased.
    pub fn key(&self) -> String {
        jail_key(&self.owner, &self.name)
    }

    /// Adds a teleport location. Names are case-insensitive and unique.
    pub fn add_teleport(&self, name: &str, location: Location) -> Result<(), JailError> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(JailError::EmptyName);
        }

        let mut state = write(&self.state);
        if state.teleports.contains_key(&key) {
            return Err(JailError::DuplicateTeleport(key));
        }
        state.teleports.insert(key.clone(), NamedLocation { name: key, location });
        Ok(())
    }

    pub fn remove_teleport(&self, name: &str) -> bool {
        write(&self.state).teleports.remove(&normalize_name(name)).is_some()
    }

    pub fn teleport(&self, name: &str) -> Option<NamedLocation> {
        read(&self.state).teleports.get(&normalize_name(name)).cloned()
    }

    /// All teleport locations, sorted by name.
    pub fn teleports(&self) -> Vec<NamedLocation> {
        read(&self.state).teleports.values().cloned().collect()
    }

    pub fn random_teleport(&self) -> Option<NamedLocation> {
        let teleports = self.teleports();
        teleports.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn release_location(&self) -> Option<Location> {
        read(&self.state).release.clone()
    }

    /// Sets or clears the release location.
    pub fn set_release_location(&self, location: Option<Location>) {
        write(&self.state).release = location;
    }
}

fn jail_key(owner: &str, name: &str) -> String {
    format!("{}:{}", normalize_name(owner), normalize_name(name))
}

// ============================================================================
// Sessions
// ============================================================================

/// A player serving time in a jail.
#[derive(Debug, Clone)]
pub struct JailSession {
    pub player: PlayerId,
    pub jail: Arc<Jail>,
    /// Unix timestamp in seconds.
    pub expires_at: u64,
    pub released: bool,
}

impl JailSession {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    /// Whole minutes left, rounded up.
    pub fn remaining_minutes(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now).div_ceil(60)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Owns the jails, the sessions and the warden.
pub struct JailManager {
    config: JailConfig,
    worlds: Arc<dyn WorldQuery>,
    messenger: Arc<dyn Messenger>,
    default_jail: Arc<Jail>,
    jails: DashMap<String, Arc<Jail>>,
    sessions: Mutex<HashMap<PlayerId, JailSession>>,
    late_releases: Mutex<HashMap<PlayerId, Location>>,
    warden: Mutex<Option<TaskHandle>>,
}

impl JailManager {
    /// Creates the manager and its default jail, owned by `owner`.
    pub fn new(config: JailConfig, owner: &str, worlds: Arc<dyn WorldQuery>, messenger: Arc<dyn Messenger>) -> Self {
        let default_jail = Arc::new(Jail::new(owner, DEFAULT_JAIL));
        let jails = DashMap::new();
        jails.insert(default_jail.key(), default_jail.clone());

        Self {
            config,
            worlds,
            messenger,
            default_jail,
            jails,
            sessions: Mutex::new(HashMap::new()),
            late_releases: Mutex::new(HashMap::new()),
            warden: Mutex::new(None),
        }
    }

    pub fn default_jail(&self) -> Arc<Jail> {
        self.default_jail.clone()
    }

    pub fn worlds(&self) -> &Arc<dyn WorldQuery> {
        &self.worlds
    }

    pub fn register_jail(&self, jail: Arc<Jail>) -> Result<(), JailError> {
        let key = jail.key();
        if self.jails.contains_key(&key) {
            return Err(JailError::DuplicateJail(key));
        }
        debug!("Registered jail '{}'", key);
        self.jails.insert(key, jail);
        Ok(())
    }

    /// The default jail cannot be unregistered.
    pub fn unregister_jail(&self, owner: &str, name: &str) -> bool {
        let key = jail_key(owner, name);
        if key == self.default_jail.key() {
            return false;
        }
        self.jails.remove(&key).is_some()
    }

    pub fn jail(&self, owner: &str, name: &str) -> Option<Arc<Jail>> {
        self.jails.get(&jail_key(owner, name)).map(|entry| entry.value().clone())
    }

    /// Every registered jail, sorted by key.
    pub fn jails(&self) -> Vec<Arc<Jail>> {
        let mut jails: Vec<Arc<Jail>> = self.jails.iter().map(|entry| entry.value().clone()).collect();
        jails.sort_by_key(|jail| jail.key());
        jails
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Jails `player` for `minutes` and moves them to a random teleport of the jail.
    ///
    /// # Errors
    ///
    /// [`JailError::InvalidSentence`] for zero minutes and
    /// [`JailError::SentenceTooLong`] when the release time is not representable.
    pub fn imprison(&self, player: PlayerId, jail: Arc<Jail>, minutes: u64) -> Result<JailSession, JailError> {
        if minutes == 0 {
            return Err(JailError::InvalidSentence);
        }
        let expires_at = minutes
            .checked_mul(60)
            .and_then(|seconds| current_timestamp().checked_add(seconds))
            .ok_or(JailError::SentenceTooLong(minutes))?;
        self.imprison_until(player, jail, expires_at)
    }

    /// Jails `player` until the Unix timestamp `expires_at`.
    pub fn imprison_until(&self, player: PlayerId, jail: Arc<Jail>, expires_at: u64) -> Result<JailSession, JailError> {
        let Some(cell) = jail.random_teleport() else {
            return Err(JailError::NoTeleports(jail.name().to_string()));
        };

        self.worlds.teleport(player, &cell.location);
        let session = JailSession {
            player,
            jail,
            expires_at,
            released: false,
        };
        lock(&self.sessions).insert(player, session.clone());
        lock(&self.late_releases).remove(&player);

        info!("🔒 Player {} jailed in '{}' ({})", player, session.jail.name(), cell.name);
        Ok(session)
    }

    pub fn session(&self, player: PlayerId) -> Option<JailSession> {
        lock(&self.sessions).get(&player).cloned()
    }

    pub fn sessions(&self) -> Vec<JailSession> {
        lock(&self.sessions).values().cloned().collect()
    }

    pub fn is_prisoner(&self, player: PlayerId) -> bool {
        lock(&self.sessions).contains_key(&player)
    }

    /// Releases a prisoner now. Returns `false` if the player is not jailed.
    pub fn release(&self, player: PlayerId) -> bool {
        let found = match lock(&self.sessions).get_mut(&player) {
            Some(session) => {
                session.released = true;
                true
            }
            None => false,
        };

        if found {
            self.run_warden(true);
        }
        found
    }

    pub fn is_late_release(&self, player: PlayerId) -> bool {
        lock(&self.late_releases).contains_key(&player)
    }

    /// Completes a late release for a player who just joined. Returns `true` if
    /// the player was teleported to their release location.
    pub fn on_player_join(&self, player: PlayerId) -> bool {
        if self.is_prisoner(player) {
            return false;
        }
        let Some(location) = lock(&self.late_releases).remove(&player) else {
            return false;
        };
        self.worlds.teleport(player, &location)
    }

    // ========================================================================
    // Warden
    // ========================================================================

    /// Installs the warden on the scheduler. Calling it again returns the
    /// existing handle.
    pub fn start_warden(self: &Arc<Self>, scheduler: &dyn Scheduler) -> TaskHandle {
        let mut warden = lock(&self.warden);
        if let Some(handle) = warden.as_ref().filter(|handle| !handle.is_cancelled()) {
            return handle.clone();
        }

        let manager = Arc::downgrade(self);
        let handle = scheduler.run_repeating(
            self.config.warden_delay_ticks,
            self.config.warden_interval_ticks,
            Box::new(move || {
                if let Some(manager) = manager.upgrade() {
                    manager.run_warden(false);
                }
            }),
        );

        info!("👮 Jail warden started (every {} ticks)", self.config.warden_interval_ticks);
        *warden = Some(handle.clone());
        handle
    }

    pub fn stop_warden(&self) {
        if let Some(handle) = lock(&self.warden).take() {
            handle.cancel();
        }
    }

    /// One warden pass. `silent` suppresses release reminders.
    pub fn run_warden(&self, silent: bool) {
        self.run_warden_at(current_timestamp(), silent);
    }

    pub(crate) fn run_warden_at(&self, now: u64, silent: bool) {
        let (due, reminders) = {
            let mut sessions = lock(&self.sessions);
            if sessions.is_empty() {
                return;
            }

            let late = lock(&self.late_releases);
            let due_players: Vec<PlayerId> = sessions
                .values()
                .filter(|s| s.released || s.is_expired(now) || late.contains_key(&s.player))
                .map(|s| s.player)
                .collect();
            drop(late);

            let due: Vec<JailSession> = due_players.iter().filter_map(|p| sessions.remove(p)).collect();
            let reminders: Vec<(PlayerId, u64)> = sessions
                .values()
                .map(|s| (s.player, s.remaining_minutes(now)))
                .filter(|(_, minutes)| *minutes <= 5 || *minutes % 10 == 0)
                .collect();
            (due, reminders)
        };

        for session in due {
            self.release_session(session);
        }

        if silent {
            return;
        }
        for (player, minutes) in reminders {
            if let Some(name) = self.worlds.player_name(player) {
                let recipient = CommandSender::player(player, name);
                self.messenger.tell(&recipient, &format!("Release in {} minutes.", minutes));
            }
        }
    }

    fn release_session(&self, session: JailSession) {
        let player = session.player;
        let late = lock(&self.late_releases).remove(&player);
        let Some(location) = late.or_else(|| session.jail.release_location()) else {
            warn!(
                "⚠️ Jail '{}' has no release location, player {} released in place",
                session.jail.name(),
                player
            );
            return;
        };

        if self.worlds.is_online(player) && self.worlds.teleport(player, &location) {
            info!("🔓 Player {} released from '{}'", player, session.jail.name());
        } else {
            debug!("Player {} is offline, release deferred to next join", player);
            lock(&self.late_releases).insert(player, location);
        }
    }

    /// Stops the warden. Sessions and late releases are kept.
    pub fn shutdown(&self) {
        self.stop_warden();
        info!("🛑 Jail warden stopped");
    }
}

impl std::fmt::Debug for JailManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JailManager")
            .field("config", &self.config)
            .field("jails", &self.jails.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryMessenger, SimulatedWorld};

    struct Fixture {
        world: Arc<SimulatedWorld>,
        messenger: Arc<MemoryMessenger>,
        jails: Arc<JailManager>,
    }

    fn fixture() -> Fixture {
        let world = Arc::new(SimulatedWorld::new());
        let messenger = Arc::new(MemoryMessenger::new());
        let jails = Arc::new(JailManager::new(
            JailConfig::default(),
            "nucleus",
            world.clone(),
            messenger.clone(),
        ));
        let jail = jails.default_jail();
        jail.add_teleport("Cell", Location::new("world", 100.0, 64.0, 100.0)).unwrap();
        jail.set_release_location(Some(Location::new("world", 0.0, 64.0, 0.0)));
        Fixture { world, messenger, jails }
    }

    #[test]
    fn test_teleport_names_are_unique_and_case_insensitive() {
        let jail = Jail::new("nucleus", "default");
        jail.add_teleport("Yard", Location::new("world", 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(
            jail.add_teleport("yard", Location::new("world", 1.0, 0.0, 0.0)),
            Err(JailError::DuplicateTeleport("yard".into()))
        );
        assert!(jail.teleport("YARD").is_some());
        assert!(jail.remove_teleport("Yard"));
        assert!(jail.random_teleport().is_none());
    }

    #[test]
    fn test_imprison_moves_player_to_a_cell() {
        let f = fixture();
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));

        f.jails.imprison(player, f.jails.default_jail(), 30).unwrap();

        assert!(f.jails.is_prisoner(player));
        assert_eq!(f.world.player(player).unwrap().location.position.x, 100.0);
        assert_eq!(
            f.jails.imprison(player, f.jails.default_jail(), 0).unwrap_err(),
            JailError::InvalidSentence
        );
    }

    #[test]
    fn test_overlong_sentence_is_rejected() {
        let f = fixture();
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
        let minutes = u64::MAX / 30;

        assert_eq!(
            f.jails.imprison(player, f.jails.default_jail(), minutes).unwrap_err(),
            JailError::SentenceTooLong(minutes)
        );
        assert!(!f.jails.is_prisoner(player));
        assert_eq!(f.world.player(player).unwrap().location.position.x, 5.0);
    }

    #[test]
    fn test_expired_session_releases_online_player() {
        let f = fixture();
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
        let now = current_timestamp();
        f.jails.imprison_until(player, f.jails.default_jail(), now + 60).unwrap();

        f.jails.run_warden_at(now + 61, false);

        assert!(!f.jails.is_prisoner(player));
        assert_eq!(f.world.player(player).unwrap().location.position.x, 0.0);
    }

    #[test]
    fn test_offline_release_is_deferred_to_join() {
        let f = fixture();
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
        let now = current_timestamp();
        f.jails.imprison_until(player, f.jails.default_jail(), now + 60).unwrap();
        let offline = f.world.quit(player).unwrap();

        f.jails.run_warden_at(now + 120, false);
        assert!(f.jails.is_late_release(player));

        f.world.rejoin(offline);
        assert!(f.jails.on_player_join(player));
        assert!(!f.jails.is_late_release(player));
        assert_eq!(f.world.player(player).unwrap().location.position.x, 0.0);
    }

    #[test]
    fn test_release_reminders() {
        let f = fixture();
        let soon = f.world.join("Soon", Location::new("world", 5.0, 64.0, 5.0));
        let later = f.world.join("Later", Location::new("world", 5.0, 64.0, 5.0));
        let odd = f.world.join("Odd", Location::new("world", 5.0, 64.0, 5.0));
        let now = current_timestamp();
        let jail = f.jails.default_jail();
        f.jails.imprison_until(soon, jail.clone(), now + 4 * 60 + 30).unwrap();
        f.jails.imprison_until(later, jail.clone(), now + 20 * 60).unwrap();
        f.jails.imprison_until(odd, jail, now + 17 * 60).unwrap();

        f.jails.run_warden_at(now, false);

        let mut lines = f.messenger.messages();
        lines.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        let lines: Vec<(String, String)> = lines.into_iter().map(|m| (m.recipient, m.text)).collect();
        assert_eq!(
            lines,
            vec![
                ("Later".to_string(), "Release in 20 minutes.".to_string()),
                ("Soon".to_string(), "Release in 5 minutes.".to_string()),
            ]
        );
    }

    #[test]
    fn test_release_now() {
        let f = fixture();
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
        f.jails.imprison(player, f.jails.default_jail(), 60).unwrap();

        assert!(f.jails.release(player));
        assert!(!f.jails.is_prisoner(player));
        assert!(!f.jails.release(player));
        assert!(f.messenger.messages().is_empty());
    }

    #[test]
    fn test_jail_registry() {
        let f = fixture();
        let arena = Arc::new(Jail::new("Games", "Arena"));
        f.jails.register_jail(arena.clone()).unwrap();
        assert!(f.jails.register_jail(arena).is_err());
        assert!(f.jails.jail("games", "arena").is_some());
        assert_eq!(f.jails.jails().len(), 2);
        assert!(!f.jails.unregister_jail("nucleus", DEFAULT_JAIL));
        assert!(f.jails.unregister_jail("games", "arena"));
    }

    #[tokio::test]
    async fn test_warden_runs_on_schedule() {
        use crate::scheduler::TickScheduler;

        let f = fixture();
        let scheduler = TickScheduler::new(tokio::runtime::Handle::current());
        let player = f.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
        f.jails.imprison_until(player, f.jails.default_jail(), 0).unwrap();

        let handle = f.jails.start_warden(&scheduler);
        scheduler.tick_n(19);
        assert!(f.jails.is_prisoner(player));
        scheduler.tick();
        assert!(!f.jails.is_prisoner(player));

        f.jails.shutdown();
        assert!(handle.is_cancelled());
    }
}
