//! The [`Command`] contract, its execution context and sub-command registration.

use super::arguments::CommandArguments;
use super::error::CommandError;
use super::info::CommandInfo;
use crate::context::PluginManifest;
use crate::host::{CommandSender, Messenger};
use crate::services::Services;
use crate::types::PlayerId;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// A node in a command tree.
///
/// Commands are registered by type and instantiated through `Default`, so they
/// carry no state of their own; shared state is reached through
/// [`CommandContext::service`].
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::commands::{
///     Command, CommandArguments, CommandContext, CommandError, CommandExecutor, CommandInfo,
/// };
///
/// #[derive(Default)]
/// struct PingCommand;
///
/// impl Command for PingCommand {
///     fn info(&self) -> CommandInfo {
///         CommandInfo::builder("ping").description("Replies with pong.").build()
///     }
///
///     fn executor(&self) -> Option<&dyn CommandExecutor> {
///         Some(self)
///     }
/// }
///
/// impl CommandExecutor for PingCommand {
///     fn execute(&self, ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
///         ctx.tell("pong");
///         Ok(())
///     }
/// }
/// ```
pub trait Command: Send + Sync + 'static {
    /// Called once, when the command is registered.
    fn info(&self) -> CommandInfo;

    /// The handler run when an invocation ends on this command.
    ///
    /// Commands that only group sub-commands keep the default `None`; the
    /// command is executable exactly when this returns a handler.
    fn executor(&self) -> Option<&dyn CommandExecutor> {
        None
    }

    /// Declares the sub-commands of this command.
    fn register_sub_commands(&self, _commands: &mut SubCommands) {}

    /// Adjusts tab-completion candidates. `args` are the tokens after this command.
    fn on_tab_complete(&self, _ctx: &CommandContext<'_>, _args: &[String], _matches: &mut Vec<String>) {}
}

/// Body of an executable [`Command`], handed out by [`Command::executor`].
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError>;
}

/// A command instance waiting to be placed in a tree.
pub(crate) struct PendingCommand {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) command: Box<dyn Command>,
}

impl PendingCommand {
    pub(crate) fn of<C: Command>(command: C) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: type_name::<C>(),
            command: Box::new(command),
        }
    }
}

/// Collects the sub-commands a [`Command`] declares.
#[derive(Default)]
pub struct SubCommands {
    pub(crate) pending: Vec<PendingCommand>,
}

impl SubCommands {
    pub fn add<C: Command + Default>(&mut self) -> &mut Self {
        self.pending.push(PendingCommand::of(C::default()));
        self
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Everything a command can reach while it runs.
pub struct CommandContext<'a> {
    sender: &'a CommandSender,
    root: &'a str,
    messenger: &'a dyn Messenger,
    services: &'a Services,
    manifest: &'a PluginManifest,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        sender: &'a CommandSender,
        root: &'a str,
        messenger: &'a dyn Messenger,
        services: &'a Services,
        manifest: &'a PluginManifest,
    ) -> Self {
        Self {
            sender,
            root,
            messenger,
            services,
            manifest,
        }
    }

    pub fn sender(&self) -> &CommandSender {
        self.sender
    }

    /// The label the command was invoked under.
    pub fn root_label(&self) -> &str {
        self.root
    }

    pub fn manifest(&self) -> &PluginManifest {
        self.manifest
    }

    pub fn messenger(&self) -> &dyn Messenger {
        self.messenger
    }

    pub fn tell(&self, message: &str) {
        self.messenger.tell(self.sender, message);
    }

    pub fn tell_error(&self, message: &str) {
        self.messenger.tell_error(self.sender, message);
    }

    pub fn tell_success(&self, message: &str) {
        self.messenger.tell_success(self.sender, message);
    }

    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Like [`service`](Self::service), failing the command when the service is absent.
    pub fn require_service<T: Any + Send + Sync>(&self) -> Result<Arc<T>, CommandError> {
        self.service::<T>()
            .ok_or_else(|| CommandError::Failed(format!("Service unavailable: {}", type_name::<T>())))
    }

    /// The sender's player id, or an invalid sender error for the console.
    pub fn require_player(&self) -> Result<PlayerId, CommandError> {
        self.sender.player_id().ok_or_else(CommandError::console_not_allowed)
    }
}
