//! Main application logic and lifecycle management.
//!
//! The `Application` hosts one plugin context on top of a simulated world. It
//! drives the tick scheduler, feeds console input to the framework and shuts
//! everything down on a termination signal.

use crate::cli::CliArgs;
use crate::config::{AppConfig, ZoneSettings};
use crate::console::ConsoleInput;
use crate::logging::display_banner;
use crate::signals::{wait_for_shutdown_signal, wait_for_signal_silent};
use anyhow::{anyhow, Context as _};
use nucleus_framework::regions::RegionHandle;
use nucleus_framework::{
    BasicRegion, CommandSender, EnterRegionReason, LeaveRegionReason, Location, Messenger, NucleusContext, PlayerId,
    Position, RegionEventListener, RegionReason, SimulatedWorld, TickScheduler, TracingMessenger, WorldQuery,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

// ============================================================================
// Zone Announcer
// ============================================================================

/// Listener of the configured zones: logs traffic and greets players.
struct ZoneAnnouncer {
    enter_message: Option<String>,
    leave_message: Option<String>,
    messenger: Arc<dyn Messenger>,
    worlds: Arc<dyn WorldQuery>,
}

impl ZoneAnnouncer {
    fn announce(&self, player: PlayerId, message: Option<&String>) {
        let (Some(message), Some(name)) = (message, self.worlds.player_name(player)) else {
            return;
        };
        self.messenger.tell(&CommandSender::player(player, name), message);
    }
}

impl RegionEventListener for ZoneAnnouncer {
    fn on_player_enter(&self, region: &RegionHandle, player: PlayerId, reason: EnterRegionReason) {
        info!("🚪 {} entered zone '{}' ({:?})", player, region.name(), reason);
        self.announce(player, self.enter_message.as_ref());
    }

    fn on_player_leave(&self, region: &RegionHandle, player: PlayerId, reason: LeaveRegionReason) {
        info!("🚶 {} left zone '{}' ({:?})", player, region.name(), reason);
        self.announce(player, self.leave_message.as_ref());
    }
}

// ============================================================================
// Application
// ============================================================================

/// The console host.
///
/// # Architecture
///
/// * **Scheduler**: a [`TickScheduler`] advanced by a tokio interval
/// * **World**: a [`SimulatedWorld`] moved around from the console
/// * **Context**: the plugin's regions, jail and commands
pub struct Application {
    config: AppConfig,
    scheduler: Arc<TickScheduler>,
    world: Arc<SimulatedWorld>,
    context: NucleusContext,
    operators: HashSet<PlayerId>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Build the framework context
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path)
            .await
            .with_context(|| format!("loading {}", args.config_path.display()))?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(tick_ms) = args.tick_ms {
            config.server.tick_interval_ms = tick_ms;
        }

        display_banner(&config.server.name);
        Self::with_messenger(config, Arc::new(TracingMessenger))
    }

    /// Builds the host from an already loaded configuration.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_messenger(config: AppConfig, messenger: Arc<dyn Messenger>) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;
        info!("✅ Configuration loaded and validated successfully");

        let scheduler = Arc::new(TickScheduler::new(tokio::runtime::Handle::current()));
        let world = Arc::new(SimulatedWorld::new());
        for name in &config.server.worlds {
            world.load_world(name.as_str());
        }

        let mut context = NucleusContext::builder(config.manifest())
            .scheduler(scheduler.clone())
            .worlds(world.clone())
            .messenger(messenger)
            .region_config(config.regions.clone())
            .command_config(config.commands.clone())
            .jail_config(config.jail.clone())
            .build()?;

        if !context.register_builtin_commands() {
            warn!("❌ Jail commands were not registered");
        }

        let app = Self {
            config,
            scheduler,
            world,
            context,
            operators: HashSet::new(),
        };
        for zone in &app.config.zones {
            app.register_zone(zone)?;
        }
        Ok(app)
    }

    fn register_zone(&self, zone: &ZoneSettings) -> anyhow::Result<()> {
        let [ax, ay, az] = zone.min;
        let [bx, by, bz] = zone.max;
        let listener = Arc::new(ZoneAnnouncer {
            enter_message: zone.enter_message.clone(),
            leave_message: zone.leave_message.clone(),
            messenger: self.context.messenger().clone(),
            worlds: self.context.worlds().clone(),
        });
        let region = BasicRegion::builder(zone.name.as_str(), self.config.server.name.as_str())
            .world(zone.world.as_str())
            .corners(Position::new(ax, ay, az), Position::new(bx, by, bz))
            .enter_priority(zone.enter_priority)
            .leave_priority(zone.leave_priority)
            .listener(listener)
            .build();

        self.context
            .regions()
            .register(Arc::new(region))
            .with_context(|| format!("registering zone '{}'", zone.name))?;
        info!("🗺️ Zone '{}' registered in {}", zone.name, zone.world);
        Ok(())
    }

    pub fn context(&self) -> &NucleusContext {
        &self.context
    }

    pub fn world(&self) -> &Arc<SimulatedWorld> {
        &self.world
    }

    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }

    /// Runs until a termination signal, a `stop` line or a fatal error.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.log_configuration_summary();
        self.context.start();

        let (line_tx, mut lines) = mpsc::channel::<String>(64);
        let console = tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        if line_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("❌ Console read failed: {e}");
                        break;
                    }
                }
            }
        });

        let mut interval = tokio::time::interval(Duration::from_millis(self.config.server.tick_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);
        let mut console_open = true;

        info!("✅ {} is now running", self.config.server.name);
        info!("🛑 Press Ctrl+C or type 'stop' to shut down");

        loop {
            tokio::select! {
                _ = interval.tick() => self.scheduler.tick(),
                line = lines.recv(), if console_open => match line {
                    Some(line) => {
                        if !self.handle_line(&line) {
                            break;
                        }
                    }
                    None => {
                        info!("Console input closed");
                        console_open = false;
                    }
                },
                result = &mut signal => {
                    result.context("listening for shutdown signals")?;
                    break;
                }
            }
        }

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("🛑 Beginning graceful shutdown...");
        console.abort();
        self.context.shutdown();

        if tokio::time::timeout(Duration::from_secs(5), self.scheduler.wait_async())
            .await
            .is_err()
        {
            warn!("⏰ Async tasks did not finish within timeout");
        }

        info!("📊 Final Statistics:");
        info!("  - Ticks run: {}", self.scheduler.current_tick());
        info!("  - Regions: {}", self.context.regions().region_count());
        info!("  - Prisoners: {}", self.context.jails().sessions().len());
        info!("✅ {} shutdown complete", self.config.server.name);
        Ok(())
    }

    /// Handles one console line. Returns `false` once the host should stop.
    pub fn handle_line(&mut self, line: &str) -> bool {
        match ConsoleInput::parse(line) {
            Ok(ConsoleInput::Stop) => return false,
            Ok(input) => self.handle_input(input),
            Err(e) => warn!("❌ {e}"),
        }
        true
    }

    fn handle_input(&mut self, input: ConsoleInput) {
        match input {
            ConsoleInput::Join { player, location } => self.join(&player, location),
            ConsoleInput::Move { player, x, y, z } => {
                if let Some((id, current)) = self.locate(&player) {
                    self.relocate(id, Location::new(current.world, x, y, z), RegionReason::Move);
                }
            }
            ConsoleInput::Teleport { player, location } => {
                if let Some((id, current)) = self.locate(&player) {
                    let reason = if current.world == location.world {
                        RegionReason::Teleport
                    } else {
                        RegionReason::WorldChange
                    };
                    self.relocate(id, location, reason);
                }
            }
            ConsoleInput::Quit { player } => {
                if let Some((id, _)) = self.locate(&player) {
                    let left = self.context.on_player_quit(id);
                    self.world.quit(id);
                    self.operators.remove(&id);
                    info!("👋 {} left the server ({} regions)", player, left);
                }
            }
            ConsoleInput::Op { player } => {
                if let Some((id, _)) = self.locate(&player) {
                    self.operators.insert(id);
                    info!("👮 {} is now an operator", player);
                }
            }
            ConsoleInput::Imprison { player, minutes } => self.imprison(&player, minutes),
            ConsoleInput::As { player, label, args } => {
                if let Some((id, _)) = self.locate(&player) {
                    let sender = if self.operators.contains(&id) {
                        CommandSender::operator(id, player)
                    } else {
                        CommandSender::player(id, player)
                    };
                    self.dispatch(&sender, &label, &args);
                }
            }
            ConsoleInput::Command { label, args } => self.dispatch(&CommandSender::Console, &label, &args),
            ConsoleInput::Complete { label, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                let options = self.context.on_tab_complete(&CommandSender::Console, &label, &args);
                info!("💡 {}", options.join(" "));
            }
            ConsoleInput::Stop | ConsoleInput::Empty => {}
        }
    }

    fn dispatch(&self, sender: &CommandSender, label: &str, args: &[String]) {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if self.context.on_command(sender, label, &args).is_none() {
            warn!("Commands are unavailable while shutting down");
        }
    }

    fn join(&mut self, name: &str, location: Location) {
        if self.world.find_player(name).is_some() {
            warn!("❌ {} is already online", name);
            return;
        }
        if !self.world.is_world_loaded(&location.world) {
            warn!("❌ Unknown world '{}'", location.world);
            return;
        }

        let id = self.world.join(name, location.clone());
        info!("👋 {} joined at {}", name, location);
        if let Some(snapshot) = self.world.player(id) {
            self.context.on_player_move(&snapshot, location, RegionReason::JoinServer);
        }
        self.context.on_player_join(id);
    }

    fn imprison(&self, name: &str, minutes: u64) {
        let Some((id, _)) = self.locate(name) else {
            return;
        };
        let jails = self.context.jails();
        match jails.imprison(id, jails.default_jail(), minutes) {
            Ok(_) => {
                info!("🔒 {} jailed for {} minutes", name, minutes);
                if let (Some(snapshot), Some(location)) = (self.world.player(id), self.world.player_location(id)) {
                    self.context.on_player_move(&snapshot, location, RegionReason::Teleport);
                }
            }
            Err(e) => warn!("❌ Could not jail {}: {}", name, e),
        }
    }

    fn locate(&self, name: &str) -> Option<(PlayerId, Location)> {
        let found = self
            .world
            .find_player(name)
            .and_then(|id| self.world.player_location(id).map(|location| (id, location)));
        if found.is_none() {
            warn!("❌ Player '{}' is not online", name);
        }
        found
    }

    fn relocate(&self, player: PlayerId, location: Location, reason: RegionReason) {
        if !self.world.move_to(player, location.clone()) {
            warn!("❌ Cannot move to {}", location);
            return;
        }
        if let Some(snapshot) = self.world.player(player) {
            self.context.on_player_move(&snapshot, location, reason);
        }
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🧩 Plugin: {} (commands: {})", self.config.server.name, self.config.server.commands.join(", "));
        info!("  🌍 Worlds: {}", self.config.server.worlds.join(", "));
        info!("  🗺️ Zones: {}", self.config.zones.len());
        info!("  ⏱️ Tick interval: {}ms", self.config.server.tick_interval_ms);
        info!("  👀 Region watcher every {} ticks", self.config.regions.watcher_interval_ticks);
        info!("  👮 Jail warden every {} ticks", self.config.jail.warden_interval_ticks);
    }
}
