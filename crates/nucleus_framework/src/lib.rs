//! # Nucleus Framework
//!
//! Cross-cutting services for plugins running inside a tick-driven game server:
//! region tracking with enter/leave callbacks, hierarchical command dispatch and
//! a jail service, all written against a small set of host interfaces.
//!
//! ## Core Features
//!
//! - **Region Tracking**: R*-tree indexed regions, per-player containment
//!   caches and prioritized enter/leave callbacks on the main thread
//! - **Command Dispatch**: typed command trees with aliases, permissions,
//!   argument coercion, paginated help and tab completion
//! - **Jails**: teleport cells, timed sessions and a warden that releases
//!   expired prisoners, online or not
//! - **Host Abstraction**: the world, chat, permissions and scheduler are
//!   traits, with in-memory implementations for headless hosts and tests
//!
//! ## Architecture Overview
//!
//! ### Threading
//! - **Main thread**: the host drives [`TickScheduler::tick`]; samplers and
//!   every listener callback run here
//! - **Async pool**: containment is resolved off the main thread and results
//!   are scheduled back
//!
//! ### Services
//! - [`RegionManager`] owns every region index and the watcher
//! - [`CommandDispatcher`] owns a plugin's command tree
//! - [`JailManager`] owns jails, sessions and the warden
//! - [`NucleusContext`] wires them together for one plugin
//!
//! ## Quick Start Example
//!
//! ```rust
//! use nucleus_framework::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Arc::new(TickScheduler::new(tokio::runtime::Handle::current()));
//!     let world = Arc::new(SimulatedWorld::new());
//!
//!     let mut context = NucleusContext::builder(PluginManifest::new("Nucleus", "1.0.0").with_command("jail"))
//!         .scheduler(scheduler.clone())
//!         .worlds(world.clone())
//!         .build()?;
//!     context.register_builtin_commands();
//!     context.start();
//!
//!     let spawn = BasicRegion::builder("spawn", "nucleus")
//!         .world("world")
//!         .corners(Position::new(-16.0, 0.0, -16.0), Position::new(16.0, 255.0, 16.0))
//!         .build();
//!     context.regions().register(Arc::new(spawn))?;
//!
//!     // Drive the server loop
//!     scheduler.tick_n(20);
//!     scheduler.wait_async().await;
//!
//!     context.shutdown();
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod context;
pub mod host;
pub mod jail;
pub mod messaging;
pub mod permissions;
pub mod regions;
pub mod scheduler;
pub mod services;
pub mod shutdown;
pub mod types;
pub mod utils;

pub use commands::{
    Command, CommandArguments, CommandContext, CommandDispatcher, CommandError, CommandInfo, DispatchOutcome,
    ParamKind, SubCommands,
};
pub use config::{CommandConfig, JailConfig, RegionConfig};
pub use context::{ContextError, NucleusContext, NucleusContextBuilder, PluginManifest};
pub use host::{
    CommandSender, MemoryMessenger, Messenger, SenderType, SimulatedWorld, TrackedPlayer, TracingMessenger,
    WorldQuery,
};
pub use jail::{Jail, JailError, JailManager, JailSession, NamedLocation};
pub use messaging::ChatPaginator;
pub use permissions::{MemoryPermissions, PermissionDefault, PermissionProvider};
pub use regions::{
    BasicRegion, EnterRegionReason, LeaveRegionReason, Region, RegionError, RegionEventListener, RegionManager,
    RegionReason,
};
pub use scheduler::{Scheduler, TaskHandle, TickScheduler};
pub use services::Services;
pub use shutdown::ShutdownState;
pub use types::*;
pub use utils::current_timestamp;

pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;

/// Returns the framework name and version.
pub fn nucleus_build_info() -> String {
    format!("Nucleus Framework v{}", env!("CARGO_PKG_VERSION"))
}
