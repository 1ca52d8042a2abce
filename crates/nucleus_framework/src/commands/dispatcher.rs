//! # Command Dispatcher
//!
//! Entry point for every command invocation of one plugin.
//!
//! ## Pipeline
//!
//! 1. **Resolve** the tokens against the tree ([`CommandParser`])
//! 2. **Permission** check on the resolved command, before anything else
//! 3. **Help** short-circuit for `?`, `help` (optional page) and `??` (detailed)
//! 4. **Incomplete** commands stop here
//! 5. **Coerce** the remaining tokens ([`CommandArguments::parse`])
//! 6. **Execute**
//!
//! Every [`CommandError`] is rendered to the sender and returned as
//! [`DispatchOutcome::Failed`]. Panics are not caught.

use super::arguments::CommandArguments;
use super::builtin::AboutCommand;
use super::command::{Command, CommandContext, PendingCommand};
use super::error::CommandError;
use super::help::{render_help, usage};
use super::info::ParamKind;
use super::parser::{is_help_token, CommandParser, Resolution};
use super::tree::{CommandId, CommandTree};
use crate::config::CommandConfig;
use crate::context::PluginManifest;
use crate::host::{CommandSender, Messenger};
use crate::permissions::{PermissionBatch, PermissionProvider};
use crate::services::Services;
use crate::utils::normalize_name;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Executed,
    Help,
    Failed(CommandError),
}

/// Routes invocations of a plugin's commands.
pub struct CommandDispatcher {
    manifest: Arc<PluginManifest>,
    config: CommandConfig,
    permissions: Arc<dyn PermissionProvider>,
    messenger: Arc<dyn Messenger>,
    services: Arc<Services>,
    declared: HashSet<String>,
    tree: CommandTree,
    roots: HashMap<String, CommandId>,
    default_root: CommandId,
}

impl CommandDispatcher {
    pub fn new(
        manifest: Arc<PluginManifest>,
        config: CommandConfig,
        permissions: Arc<dyn PermissionProvider>,
        messenger: Arc<dyn Messenger>,
        services: Arc<Services>,
    ) -> Self {
        let mut tree = CommandTree::new(&manifest.name);
        let default_root = tree.insert_root(AboutCommand);
        tree.set_default_root(default_root);
        tree.attach(default_root, &normalize_name(&manifest.name), permissions.as_ref());

        let declared = manifest.commands.iter().map(|c| normalize_name(c)).collect();

        Self {
            manifest,
            config,
            permissions,
            messenger,
            services,
            declared,
            tree,
            roots: HashMap::new(),
            default_root,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a top-level command.
    ///
    /// Commands whose name is declared in the manifest become roots; anything
    /// else is placed under the default root.
    pub fn register<C: Command + Default>(&mut self) -> bool {
        self.register_command(C::default())
    }

    pub fn register_command<C: Command>(&mut self, command: C) -> bool {
        let pending = PendingCommand::of(command);
        let info = pending.command.info();
        let _batch = PermissionBatch::new(self.permissions.as_ref());

        if self.roots.values().any(|root| self.tree.type_id(*root) == pending.type_id) {
            debug!("Failed to register command {}: already registered", pending.type_name);
            return false;
        }

        let label = info
            .names()
            .iter()
            .map(|name| normalize_name(name))
            .find(|name| self.declared.contains(name) && !self.roots.contains_key(name));

        let Some(label) = label else {
            let type_name = pending.type_name;
            let placed = self
                .tree
                .add_pending_child(self.default_root, pending, self.permissions.as_ref())
                .is_some();
            if placed {
                debug!("Registered command '{}' under /{}", info.name(), self.tree.plugin());
            } else {
                debug!("Failed to register command {}", type_name);
            }
            return placed;
        };

        let root = self.tree.insert_pending_root(pending);
        self.tree.attach(root, &label, self.permissions.as_ref());
        for name in info.names().iter().map(|name| normalize_name(name)) {
            if self.declared.contains(&name) {
                self.roots.entry(name).or_insert(root);
            }
        }

        info!("🔧 Registered command /{}", label);
        true
    }

    /// Unregisters a command of type `C`, from the roots or the default root.
    pub fn unregister<C: Command>(&mut self) -> bool {
        let type_id = TypeId::of::<C>();
        let root = self.roots.values().copied().find(|root| self.tree.type_id(*root) == type_id);

        if let Some(root) = root {
            self.roots.retain(|_, id| *id != root);
            self.tree.detach(root);
            return true;
        }

        self.tree.remove_child::<C>(self.default_root)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn default_root(&self) -> CommandId {
        self.default_root
    }

    /// A root by label, or a child of the default root by name.
    pub fn command(&self, name: &str) -> Option<CommandId> {
        self.roots
            .get(&normalize_name(name))
            .copied()
            .or_else(|| self.tree.child(self.default_root, name))
    }

    /// Registered root labels, sorted.
    pub fn root_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.roots.keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn parser(&self) -> CommandParser<'_> {
        CommandParser::new(&self.tree, &self.roots, self.default_root)
    }

    /// Resolves `args` typed under `label` without running anything.
    pub fn resolve(&self, label: &str, args: &[&str]) -> Resolution {
        let tokens: Vec<&str> = std::iter::once(label).chain(args.iter().copied()).collect();
        self.parser().parse(&tokens)
    }

    pub fn usage(&self, id: CommandId) -> String {
        usage(&self.tree, id)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Runs one invocation and renders any failure to the sender.
    pub fn on_command(&self, sender: &CommandSender, label: &str, args: &[&str]) -> DispatchOutcome {
        let outcome = self.dispatch(sender, label, args);
        if let DispatchOutcome::Failed(error) = &outcome {
            self.render_error(sender, error);
        }
        outcome
    }

    fn dispatch(&self, sender: &CommandSender, label: &str, args: &[&str]) -> DispatchOutcome {
        let (command, raw, incomplete) = match self.resolve(label, args) {
            Resolution::NotFound => {
                return DispatchOutcome::Failed(CommandError::NotFound {
                    root: label.to_string(),
                })
            }
            Resolution::Found { command, args } => (command, args, false),
            Resolution::Incomplete { command, args } => (command, args, true),
        };

        let allowed = self
            .tree
            .permission(command)
            .map(|permission| self.permissions.has(sender, permission))
            .unwrap_or(false);
        if !allowed {
            return DispatchOutcome::Failed(CommandError::AccessDenied);
        }

        if let Some(first) = raw.first().filter(|token| is_help_token(token)) {
            let page = match raw.get(1) {
                None => 1,
                Some(page) => match page.parse::<usize>() {
                    Ok(page) => page,
                    Err(_) => return DispatchOutcome::Failed(CommandError::wrong_kind("page", ParamKind::Integer, None)),
                },
            };
            self.show_help(sender, command, page, first == "??");
            return DispatchOutcome::Help;
        }

        if incomplete {
            return DispatchOutcome::Failed(CommandError::Incomplete {
                root: label.to_string(),
            });
        }

        let info = self.tree.info(command);
        let arguments = match CommandArguments::parse(info, &self.usage(command), &raw) {
            Ok(arguments) => arguments,
            Err(error) => return DispatchOutcome::Failed(error),
        };

        let ctx = self.context(sender, label);
        let Some(executor) = self.tree.command(command).executor() else {
            return DispatchOutcome::Failed(CommandError::Incomplete {
                root: label.to_string(),
            });
        };
        match executor.execute(&ctx, &arguments) {
            Ok(()) => DispatchOutcome::Executed,
            Err(error) => DispatchOutcome::Failed(error),
        }
    }

    /// Completion candidates for a partially typed invocation. The last entry
    /// of `args` is the token being typed.
    pub fn on_tab_complete(&self, sender: &CommandSender, label: &str, args: &[&str]) -> Vec<String> {
        let tokens: Vec<&str> = std::iter::once(label).chain(args.iter().copied()).collect();
        let completion = self.parser().parse_tab_complete(&tokens);

        let Some(command) = completion.command else {
            return Vec::new();
        };

        let mut matches = completion.matches;
        let ctx = self.context(sender, label);
        self.tree.command(command).on_tab_complete(&ctx, &completion.args, &mut matches);

        let typing_nothing = match completion.args.as_slice() {
            [] => true,
            [only] => only.is_empty(),
            _ => false,
        };
        if matches.len() > 1 && typing_nothing {
            matches.push("?".to_string());
        }
        matches
    }

    /// Renders help for `id` to `sender`.
    pub fn show_help(&self, sender: &CommandSender, id: CommandId, page: usize, detailed: bool) {
        let pages = render_help(
            &self.tree,
            id,
            sender,
            self.permissions.as_ref(),
            self.config.help_page_size,
            detailed,
        );
        pages.show(self.messenger.as_ref(), sender, page);
    }

    fn context<'a>(&'a self, sender: &'a CommandSender, label: &'a str) -> CommandContext<'a> {
        CommandContext::new(sender, label, self.messenger.as_ref(), &self.services, &self.manifest)
    }

    fn render_error(&self, sender: &CommandSender, error: &CommandError) {
        self.messenger.tell_error(sender, &error.to_string());
        for (line, is_error) in error.details() {
            if is_error {
                self.messenger.tell_error(sender, &line);
            } else {
                self.messenger.tell(sender, &line);
            }
        }
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("plugin", &self.manifest.name)
            .field("roots", &self.root_labels())
            .finish()
    }
}
