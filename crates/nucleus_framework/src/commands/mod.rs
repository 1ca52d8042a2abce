//! # Command Dispatch
//!
//! Hierarchical commands with typed arguments, permissions and paginated help.
//!
//! ## Components
//!
//! - [`Command`] - behavior of one node, registered by type
//! - [`CommandInfo`] - static metadata: names, parameters, flags, permission default
//! - [`CommandTree`] - arena of nodes with parent links and permission names
//! - [`CommandParser`] - greedy token resolution and tab completion
//! - [`CommandArguments`] - coercion of the remaining tokens into named values
//! - [`CommandDispatcher`] - the invocation pipeline of one plugin
//!
//! ## Example
//!
//! ```rust
//! use nucleus_framework::commands::{
//!     Command, CommandArguments, CommandContext, CommandError, CommandExecutor, CommandInfo,
//! };
//!
//! #[derive(Default)]
//! struct HealCommand;
//!
//! impl Command for HealCommand {
//!     fn info(&self) -> CommandInfo {
//!         CommandInfo::builder("heal")
//!             .alias("h")
//!             .static_param("target")
//!             .flag("silent")
//!             .build()
//!     }
//!
//!     fn executor(&self) -> Option<&dyn CommandExecutor> {
//!         Some(self)
//!     }
//! }
//!
//! impl CommandExecutor for HealCommand {
//!     fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
//!         if !args.flag("silent") {
//!             ctx.tell(&format!("Healed {}.", args.string("target")?));
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod arguments;
pub mod builtin;
mod command;
mod dispatcher;
mod error;
mod help;
mod info;
mod parser;
mod tree;

#[cfg(test)]
mod tests;

pub use arguments::CommandArguments;
pub use command::{Command, CommandContext, CommandExecutor, SubCommands};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use error::CommandError;
pub use help::{help_usage, render_help, usage};
pub use info::{CommandInfo, CommandInfoBuilder, ParamKind, ParameterSpec};
pub use parser::{CommandParser, Resolution, TabCompletion};
pub use tree::{CommandId, CommandTree};
