//! Usage lines and paginated help.

use super::tree::{CommandId, CommandTree};
use crate::host::CommandSender;
use crate::messaging::ChatPaginator;
use crate::permissions::{PermissionBatch, PermissionProvider};

/// `/{root} {path} <static> [optional] --floating <floating> [--flag]`.
pub fn usage(tree: &CommandTree, id: CommandId) -> String {
    let info = tree.info(id);
    let mut parts = vec![command_line(tree, id)];

    for param in info.static_params() {
        if param.is_optional() {
            parts.push(format!("[{}]", param.name));
        } else {
            parts.push(format!("<{}>", param.name));
        }
    }

    for param in info.floating_params() {
        if param.is_optional() {
            parts.push(format!("[--{} <{}>]", param.name, param.name));
        } else {
            parts.push(format!("--{} <{}>", param.name, param.name));
        }
    }

    for flag in info.flags() {
        parts.push(format!("[--{}]", flag));
    }

    parts.join(" ")
}

/// What a sender types to get help for `id`: `/{root} {path} ?`.
pub fn help_usage(tree: &CommandTree, id: CommandId) -> String {
    format!("{} ?", command_line(tree, id))
}

fn command_line(tree: &CommandTree, id: CommandId) -> String {
    let root = tree.root_label(id).unwrap_or(tree.plugin());
    let path = tree.path(id);
    if path.is_empty() {
        format!("/{}", root)
    } else {
        format!("/{} {}", root, path.join(" "))
    }
}

/// Builds the help listing of `id` as seen by `sender`.
///
/// Order: the command's own usage when it executes, then leaf sub-commands,
/// then sub-commands with children of their own as a link to their help. Each
/// group is sorted by name. Hidden commands and commands the sender lacks
/// permission for are left out. With `detailed`, every usage line is followed
/// by its documented parameters.
pub fn render_help(
    tree: &CommandTree,
    id: CommandId,
    sender: &CommandSender,
    permissions: &dyn PermissionProvider,
    page_size: usize,
    detailed: bool,
) -> ChatPaginator {
    let mut pages = ChatPaginator::new("Commands", page_size);

    if tree.is_executable(id) {
        add_usage(&mut pages, tree, id, detailed);
    }

    let _batch = PermissionBatch::new(permissions);
    let visible = |child: &CommandId| {
        tree.info(*child).is_help_visible()
            && tree
                .permission(*child)
                .map(|permission| permissions.has(sender, permission))
                .unwrap_or(false)
    };

    let (branches, leaves): (Vec<CommandId>, Vec<CommandId>) = tree
        .children(id)
        .iter()
        .copied()
        .filter(visible)
        .partition(|child| tree.has_children(*child));

    for leaf in leaves {
        add_usage(&mut pages, tree, leaf, detailed);
    }
    for branch in branches {
        pages.add_definition(help_usage(tree, branch), tree.info(branch).description());
    }

    pages
}

fn add_usage(pages: &mut ChatPaginator, tree: &CommandTree, id: CommandId, detailed: bool) {
    let info = tree.info(id);
    pages.add_definition(usage(tree, id), info.description());

    if !detailed {
        return;
    }

    let params = info
        .static_params()
        .iter()
        .chain(info.floating_params().iter())
        .map(|p| p.name.as_str())
        .chain(info.flags().iter().map(String::as_str));
    for param in params {
        if let Some(description) = info.param_description(param) {
            pages.add_definition(format!("  {}", param), description);
        }
    }
}
