//! # Command Tree
//!
//! Arena of command nodes with parent links. Every node keeps its children
//! keyed by lower-cased name and alias, plus a lazily sorted view by primary
//! name.
//!
//! ## Attachment
//!
//! A node is attached once it knows the label of its root and its permission
//! name. Sub-commands declared before that are queued on the node and placed
//! when it attaches; children of an attached node attach as soon as they are
//! added. Permissions are registered with the provider at attach time.
//!
//! ## Detaching
//!
//! Detached subtrees are dropped and their slots reused. Ids carry the
//! generation of their slot, so an id held past a detach never aliases the
//! node that later takes its place.

use super::command::{Command, PendingCommand, SubCommands};
use super::info::CommandInfo;
use crate::permissions::PermissionProvider;
use crate::utils::normalize_name;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Handle of a node in a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Attachment {
    root: String,
    permission: String,
}

struct CommandNode {
    command: Box<dyn Command>,
    info: CommandInfo,
    type_id: TypeId,
    parent: Option<CommandId>,
    children: HashMap<String, CommandId>,
    child_types: HashMap<TypeId, CommandId>,
    sorted: OnceLock<Vec<CommandId>>,
    attachment: Option<Attachment>,
    pending: Vec<PendingCommand>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<CommandNode>,
}

/// Tree of commands owned by one plugin.
pub struct CommandTree {
    plugin: String,
    slots: Vec<Slot>,
    free: Vec<usize>,
    default_root: Option<CommandId>,
}

impl CommandTree {
    pub fn new(plugin: &str) -> Self {
        Self {
            plugin: normalize_name(plugin),
            slots: Vec::new(),
            free: Vec::new(),
            default_root: None,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Adds an unattached root node. Its declared sub-commands are queued.
    pub fn insert_root<C: Command>(&mut self, command: C) -> CommandId {
        self.insert_pending_root(PendingCommand::of(command))
    }

    pub(crate) fn insert_pending_root(&mut self, pending: PendingCommand) -> CommandId {
        let info = pending.command.info();
        self.insert_node(None, pending, info)
    }

    /// Marks `id` as the plugin's catch-all root. Its name stays out of the
    /// permission names of its children.
    pub fn set_default_root(&mut self, id: CommandId) {
        self.default_root = Some(id);
    }

    pub fn default_root(&self) -> Option<CommandId> {
        self.default_root
    }

    /// Attaches a root under `label`, registers its permission and places every
    /// queued sub-command, recursively.
    ///
    /// Attaching an attached node does nothing.
    pub fn attach(&mut self, id: CommandId, label: &str, permissions: &dyn PermissionProvider) {
        if self.node(id).attachment.is_some() {
            return;
        }

        let permission = self.permission_name(id);
        let info = &self.node(id).info;
        permissions.register(&permission, info.permission_default(), info.description());
        self.node_mut(id).attachment = Some(Attachment {
            root: label.to_string(),
            permission,
        });

        let pending = std::mem::take(&mut self.node_mut(id).pending);
        for command in pending {
            self.place_child(id, command, permissions);
        }
    }

    /// Adds `C` under `parent`, queued if `parent` is not attached yet.
    ///
    /// Returns the new node, or `None` when the child was rejected or queued.
    pub fn add_child<C: Command + Default>(
        &mut self,
        parent: CommandId,
        permissions: &dyn PermissionProvider,
    ) -> Option<CommandId> {
        self.add_pending_child(parent, PendingCommand::of(C::default()), permissions)
    }

    pub(crate) fn add_pending_child(
        &mut self,
        parent: CommandId,
        command: PendingCommand,
        permissions: &dyn PermissionProvider,
    ) -> Option<CommandId> {
        assert_ne!(
            command.type_id, self.node(parent).type_id,
            "Cannot register a command as a sub command of itself: {}",
            command.type_name
        );

        if self.node(parent).attachment.is_none() {
            self.node_mut(parent).pending.push(command);
            return None;
        }
        self.place_child(parent, command, permissions)
    }

    fn place_child(
        &mut self,
        parent: CommandId,
        command: PendingCommand,
        permissions: &dyn PermissionProvider,
    ) -> Option<CommandId> {
        assert_ne!(
            command.type_id, self.node(parent).type_id,
            "Cannot register a command as a sub command of itself: {}",
            command.type_name
        );

        let parent_node = self.node(parent);
        if parent_node.child_types.contains_key(&command.type_id) {
            debug!(
                "Failed to register sub command {}: already registered under '{}'",
                command.type_name,
                parent_node.info.name()
            );
            return None;
        }

        let info = command.command.info();
        if let Some(declared) = info.parent() {
            if !parent_node.info.has_name(declared) {
                debug!(
                    "Failed to register sub command {}. Registered with incorrect parent '{}' (declared '{}')",
                    command.type_name,
                    parent_node.info.name(),
                    declared
                );
                return None;
            }
        }

        let primary = normalize_name(info.name());
        if parent_node.children.contains_key(&primary) {
            debug!(
                "Failed to register sub command {}: '{}' already names another command",
                command.type_name, primary
            );
            return None;
        }

        let names: Vec<String> = info.names().iter().map(|n| normalize_name(n)).collect();
        let type_id = command.type_id;
        let id = self.insert_node(Some(parent), command, info);

        let root = self.root_label(parent).unwrap_or_default().to_string();
        let parent_node = self.node_mut(parent);
        for name in names {
            if parent_node.children.contains_key(&name) {
                debug!("Alias '{}' is already taken under '{}'", name, parent_node.info.name());
                continue;
            }
            parent_node.children.insert(name, id);
        }
        parent_node.child_types.insert(type_id, id);
        parent_node.sorted = OnceLock::new();

        self.attach(id, &root, permissions);
        Some(id)
    }

    fn insert_node(&mut self, parent: Option<CommandId>, command: PendingCommand, info: CommandInfo) -> CommandId {
        let PendingCommand { type_id, command, .. } = command;

        let mut declared = SubCommands::default();
        command.register_sub_commands(&mut declared);

        let node = CommandNode {
            command,
            info,
            type_id,
            parent,
            children: HashMap::new(),
            child_types: HashMap::new(),
            sorted: OnceLock::new(),
            attachment: None,
            pending: declared.pending,
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.node = Some(node);
        CommandId {
            index,
            generation: slot.generation,
        }
    }

    /// Removes the child of type `C` from `parent`, with its whole subtree.
    pub fn remove_child<C: Command>(&mut self, parent: CommandId) -> bool {
        let Some(child) = self.node(parent).child_types.get(&TypeId::of::<C>()).copied() else {
            return false;
        };
        self.detach(child);
        true
    }

    /// Removes `id` from its parent's maps and frees its whole subtree.
    ///
    /// Detaching a detached node does nothing.
    pub fn detach(&mut self, id: CommandId) {
        if self.is_detached(id) {
            return;
        }
        if let Some(parent) = self.node(id).parent {
            let parent_node = self.node_mut(parent);
            parent_node.children.retain(|_, child| *child != id);
            parent_node.child_types.retain(|_, child| *child != id);
            parent_node.sorted = OnceLock::new();
        }
        if self.default_root == Some(id) {
            self.default_root = None;
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let slot = &mut self.slots[next.index];
            if let Some(node) = slot.node.take() {
                stack.extend(node.child_types.values().copied());
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(next.index);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn info(&self, id: CommandId) -> &CommandInfo {
        &self.node(id).info
    }

    pub fn command(&self, id: CommandId) -> &dyn Command {
        self.node(id).command.as_ref()
    }

    pub fn type_id(&self, id: CommandId) -> TypeId {
        self.node(id).type_id
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.node(id).parent
    }

    pub fn is_attached(&self, id: CommandId) -> bool {
        self.node(id).attachment.is_some()
    }

    /// Whether `id` no longer names a live node.
    pub fn is_detached(&self, id: CommandId) -> bool {
        self.slots
            .get(id.index)
            .map_or(true, |slot| slot.generation != id.generation || slot.node.is_none())
    }

    /// Whether an invocation can end on `id`.
    pub fn is_executable(&self, id: CommandId) -> bool {
        self.node(id).command.executor().is_some()
    }

    /// Live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Direct child by name or alias, case-insensitively.
    pub fn child(&self, parent: CommandId, name: &str) -> Option<CommandId> {
        self.node(parent).children.get(&normalize_name(name)).copied()
    }

    pub fn child_of_type<C: Command>(&self, parent: CommandId) -> Option<CommandId> {
        self.node(parent).child_types.get(&TypeId::of::<C>()).copied()
    }

    /// Direct children sorted by primary name.
    pub fn children(&self, id: CommandId) -> &[CommandId] {
        let node = self.node(id);
        node.sorted.get_or_init(|| {
            let mut children: Vec<CommandId> = node.child_types.values().copied().collect();
            children.sort_by(|a, b| {
                let a = self.node(*a).info.name().to_lowercase();
                let b = self.node(*b).info.name().to_lowercase();
                a.cmp(&b)
            });
            children
        })
    }

    pub fn has_children(&self, id: CommandId) -> bool {
        !self.node(id).child_types.is_empty()
    }

    /// Sub-commands still waiting for the node to attach.
    pub fn pending_count(&self, id: CommandId) -> usize {
        self.node(id).pending.len()
    }

    /// Label of the root this node hangs under, once attached.
    pub fn root_label(&self, id: CommandId) -> Option<&str> {
        self.node(id).attachment.as_ref().map(|a| a.root.as_str())
    }

    /// Permission name, once attached.
    pub fn permission(&self, id: CommandId) -> Option<&str> {
        self.node(id).attachment.as_ref().map(|a| a.permission.as_str())
    }

    /// Primary names from the root's first child down to `id`.
    pub fn path(&self, id: CommandId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(self.node(current).info.name());
            current = parent;
        }
        path.reverse();
        path
    }

    /// `{plugin}.commands.{names}` where the names run from the root down to
    /// `id`, leaving out the default root.
    fn permission_name(&self, id: CommandId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if Some(node) != self.default_root || node == id {
                names.push(normalize_name(self.node(node).info.name()));
            }
            current = self.node(node).parent;
        }
        names.reverse();
        format!("{}.commands.{}", self.plugin, names.join("."))
    }

    /// # Panics
    ///
    /// When `id` was detached.
    fn node(&self, id: CommandId) -> &CommandNode {
        match self.slots[id.index].node.as_ref() {
            Some(node) if self.slots[id.index].generation == id.generation => node,
            _ => panic!("Command {:?} is detached", id),
        }
    }

    fn node_mut(&mut self, id: CommandId) -> &mut CommandNode {
        let slot = &mut self.slots[id.index];
        match slot.node.as_mut() {
            Some(node) if slot.generation == id.generation => node,
            _ => panic!("Command {:?} is detached", id),
        }
    }
}

impl std::fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTree")
            .field("plugin", &self.plugin)
            .field("nodes", &self.len())
            .finish()
    }
}
