//! # Framework Context
//!
//! The [`NucleusContext`] wires the framework services of one plugin together:
//! the region tracker, the jail service and the command dispatcher, on top of
//! the host's scheduler, worlds, permissions and chat.
//!
//! ## Lifecycle
//!
//! 1. Build the context with [`NucleusContext::builder`]
//! 2. Register commands through [`NucleusContext::dispatcher_mut`]
//! 3. [`NucleusContext::start`] installs the region watcher and the jail warden
//! 4. Feed host events: commands, moves, joins and quits
//! 5. [`NucleusContext::shutdown`] cancels the repeating tasks
//!
//! ## Example
//!
//! ```rust
//! use nucleus_framework::context::{NucleusContext, PluginManifest};
//! use nucleus_framework::host::SimulatedWorld;
//! use nucleus_framework::scheduler::TickScheduler;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), nucleus_framework::context::ContextError> {
//! let scheduler = Arc::new(TickScheduler::new(tokio::runtime::Handle::current()));
//! let context = NucleusContext::builder(PluginManifest::new("Nucleus", "1.0.0"))
//!     .scheduler(scheduler)
//!     .worlds(Arc::new(SimulatedWorld::new()))
//!     .build()?;
//!
//! assert_eq!(context.manifest().name, "Nucleus");
//! # Ok(())
//! # }
//! ```

use crate::commands::builtin::JailCommand;
use crate::commands::{CommandDispatcher, DispatchOutcome};
use crate::config::{CommandConfig, JailConfig, RegionConfig};
use crate::host::{CommandSender, Messenger, TrackedPlayer, TracingMessenger, WorldQuery};
use crate::jail::JailManager;
use crate::permissions::{MemoryPermissions, PermissionProvider};
use crate::regions::{LeaveRegionReason, RegionManager, RegionReason};
use crate::scheduler::Scheduler;
use crate::services::Services;
use crate::shutdown::ShutdownState;
use crate::types::{Location, PlayerId};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Manifest
// ============================================================================

/// What a plugin declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Labels registered as top-level commands. Other commands go under the
    /// plugin's default root.
    #[serde(default)]
    pub commands: Vec<String>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_command(mut self, label: impl Into<String>) -> Self {
        self.commands.push(label.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("No scheduler was provided")]
    MissingScheduler,

    #[error("No world query was provided")]
    MissingWorlds,

    #[error("Plugin name cannot be empty")]
    EmptyName,
}

// ============================================================================
// Context
// ============================================================================

/// Builder for [`NucleusContext`]. A scheduler and a world query are required.
pub struct NucleusContextBuilder {
    manifest: PluginManifest,
    scheduler: Option<Arc<dyn Scheduler>>,
    worlds: Option<Arc<dyn WorldQuery>>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    messenger: Option<Arc<dyn Messenger>>,
    region_config: RegionConfig,
    command_config: CommandConfig,
    jail_config: JailConfig,
    services: Services,
}

impl NucleusContextBuilder {
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn worlds(mut self, worlds: Arc<dyn WorldQuery>) -> Self {
        self.worlds = Some(worlds);
        self
    }

    /// Defaults to [`MemoryPermissions`].
    pub fn permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Defaults to [`TracingMessenger`].
    pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn region_config(mut self, config: RegionConfig) -> Self {
        self.region_config = config;
        self
    }

    pub fn command_config(mut self, config: CommandConfig) -> Self {
        self.command_config = config;
        self
    }

    pub fn jail_config(mut self, config: JailConfig) -> Self {
        self.jail_config = config;
        self
    }

    /// Makes `service` reachable from commands through `CommandContext::service`.
    pub fn service<T: Any + Send + Sync>(mut self, service: Arc<T>) -> Self {
        self.services.insert(service);
        self
    }

    pub fn build(self) -> Result<NucleusContext, ContextError> {
        if self.manifest.name.trim().is_empty() {
            return Err(ContextError::EmptyName);
        }
        let scheduler = self.scheduler.ok_or(ContextError::MissingScheduler)?;
        let worlds = self.worlds.ok_or(ContextError::MissingWorlds)?;
        let permissions = self
            .permissions
            .unwrap_or_else(|| Arc::new(MemoryPermissions::new()));
        let messenger = self.messenger.unwrap_or_else(|| Arc::new(TracingMessenger));

        let regions = Arc::new(RegionManager::new(self.region_config, scheduler.clone(), worlds.clone()));
        let jails = Arc::new(JailManager::new(
            self.jail_config,
            &self.manifest.name,
            worlds.clone(),
            messenger.clone(),
        ));

        let mut services = self.services;
        services.insert(regions.clone());
        services.insert(jails.clone());

        let manifest = Arc::new(self.manifest);
        let dispatcher = CommandDispatcher::new(
            manifest.clone(),
            self.command_config,
            permissions.clone(),
            messenger.clone(),
            Arc::new(services),
        );

        info!("🔧 Framework context ready for {} v{}", manifest.name, manifest.version);
        Ok(NucleusContext {
            manifest,
            scheduler,
            worlds,
            permissions,
            messenger,
            regions,
            jails,
            dispatcher,
            shutdown: ShutdownState::new(),
        })
    }
}

/// Framework services of one plugin.
pub struct NucleusContext {
    manifest: Arc<PluginManifest>,
    scheduler: Arc<dyn Scheduler>,
    worlds: Arc<dyn WorldQuery>,
    permissions: Arc<dyn PermissionProvider>,
    messenger: Arc<dyn Messenger>,
    regions: Arc<RegionManager>,
    jails: Arc<JailManager>,
    dispatcher: CommandDispatcher,
    shutdown: ShutdownState,
}

impl NucleusContext {
    pub fn builder(manifest: PluginManifest) -> NucleusContextBuilder {
        NucleusContextBuilder {
            manifest,
            scheduler: None,
            worlds: None,
            permissions: None,
            messenger: None,
            region_config: RegionConfig::default(),
            command_config: CommandConfig::default(),
            jail_config: JailConfig::default(),
            services: Services::new(),
        }
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn worlds(&self) -> &Arc<dyn WorldQuery> {
        &self.worlds
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionProvider> {
        &self.permissions
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    pub fn regions(&self) -> &Arc<RegionManager> {
        &self.regions
    }

    pub fn jails(&self) -> &Arc<JailManager> {
        &self.jails
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher {
        &mut self.dispatcher
    }

    pub fn shutdown_state(&self) -> &ShutdownState {
        &self.shutdown
    }

    /// Registers the `/jail` commands.
    pub fn register_builtin_commands(&mut self) -> bool {
        self.dispatcher.register::<JailCommand>()
    }

    /// Installs the region watcher and the jail warden.
    pub fn start(&self) {
        self.regions.start_watcher();
        self.jails.start_warden(self.scheduler.as_ref());
        info!("✅ {} started", self.manifest.name);
    }

    // ========================================================================
    // Host Events
    // ========================================================================

    /// Dispatches a command. Refused once shutdown has begun.
    pub fn on_command(&self, sender: &CommandSender, label: &str, args: &[&str]) -> Option<DispatchOutcome> {
        if self.shutdown.is_stopping() {
            debug!("Ignoring /{} during shutdown", label);
            return None;
        }
        Some(self.dispatcher.on_command(sender, label, args))
    }

    pub fn on_tab_complete(&self, sender: &CommandSender, label: &str, args: &[&str]) -> Vec<String> {
        self.dispatcher.on_tab_complete(sender, label, args)
    }

    /// Queues a location sample for the region tracker.
    pub fn on_player_move(&self, player: &dyn TrackedPlayer, location: Location, reason: RegionReason) {
        if self.shutdown.is_stopping() {
            return;
        }
        self.regions.update_player_location(player, location, reason);
    }

    /// Completes a pending jail release. Returns `true` if the player was moved.
    pub fn on_player_join(&self, player: PlayerId) -> bool {
        self.jails.on_player_join(player)
    }

    /// Leaves every region the player is in. Returns how many were left.
    pub fn on_player_quit(&self, player: PlayerId) -> usize {
        self.regions.leave_all_regions(player, LeaveRegionReason::QuitServer)
    }

    /// Stops the watcher and the warden. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.shutdown.begin() {
            return;
        }
        self.regions.shutdown();
        self.jails.shutdown();
        self.shutdown.complete();
    }
}

impl std::fmt::Debug for NucleusContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NucleusContext")
            .field("manifest", &self.manifest)
            .field("dispatcher", &self.dispatcher)
            .field("stopping", &self.shutdown.is_stopping())
            .finish()
    }
}
