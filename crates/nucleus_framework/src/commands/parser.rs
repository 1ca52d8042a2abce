//! Greedy resolution of raw tokens against a [`CommandTree`].

use super::tree::{CommandId, CommandTree};
use std::collections::HashMap;

/// Outcome of walking the tree with an invocation's tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// An executable command, with the tokens left after its name.
    Found { command: CommandId, args: Vec<String> },
    /// The walk stopped on a command that only groups sub-commands.
    Incomplete { command: CommandId, args: Vec<String> },
    NotFound,
}

/// What tab completion resolved to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabCompletion {
    pub command: Option<CommandId>,
    /// Tokens after the resolved command, including the one being typed.
    pub args: Vec<String>,
    /// Visible sub-command names matching the token being typed, sorted.
    pub matches: Vec<String>,
}

/// Resolves invocations for one plugin's roots.
pub struct CommandParser<'a> {
    tree: &'a CommandTree,
    roots: &'a HashMap<String, CommandId>,
    default_root: CommandId,
}

pub(crate) fn is_help_token(token: &str) -> bool {
    token == "?" || token == "??" || token.eq_ignore_ascii_case("help")
}

impl<'a> CommandParser<'a> {
    pub fn new(tree: &'a CommandTree, roots: &'a HashMap<String, CommandId>, default_root: CommandId) -> Self {
        Self {
            tree,
            roots,
            default_root,
        }
    }

    /// Resolves `tokens`, where the first token is the root label.
    ///
    /// Labels without a registered root go to the default root, which only
    /// accepts no arguments, a help request, or one of its own children.
    ///
    /// # Examples
    ///
    /// For a `jail` root holding `addtp`, `["jail", "addtp", "home"]` resolves to
    /// `Found { addtp, ["home"] }` and `["jail", "nope"]` to `Incomplete { jail, ["nope"] }`.
    pub fn parse(&self, tokens: &[&str]) -> Resolution {
        let Some((label, rest)) = tokens.split_first() else {
            return Resolution::NotFound;
        };

        let root = match self.roots.get(&label.trim().to_lowercase()) {
            Some(root) => *root,
            None => {
                let opens_default = match rest.first() {
                    None => true,
                    Some(first) => is_help_token(first) || self.tree.child(self.default_root, first).is_some(),
                };
                if !opens_default {
                    return Resolution::NotFound;
                }
                self.default_root
            }
        };

        let (command, consumed) = self.walk(root, rest, rest.len());
        let args: Vec<String> = rest[consumed..].iter().map(|s| s.to_string()).collect();

        if self.tree.is_executable(command) {
            Resolution::Found { command, args }
        } else {
            Resolution::Incomplete { command, args }
        }
    }

    /// Resolves a partially typed invocation. The last token is the one being typed.
    pub fn parse_tab_complete(&self, tokens: &[&str]) -> TabCompletion {
        let Some((label, rest)) = tokens.split_first() else {
            return TabCompletion::default();
        };

        let root = self
            .roots
            .get(&label.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_root);

        // Never consume the token being typed.
        let (command, consumed) = self.walk(root, rest, rest.len().saturating_sub(1));
        let args: Vec<String> = rest[consumed..].iter().map(|s| s.to_string()).collect();

        let matches = match args.as_slice() {
            [] => self.child_names(command, ""),
            [typing] => self.child_names(command, &typing.to_lowercase()),
            _ => Vec::new(),
        };

        TabCompletion {
            command: Some(command),
            args,
            matches,
        }
    }

    fn walk(&self, root: CommandId, tokens: &[&str], limit: usize) -> (CommandId, usize) {
        let mut current = root;
        let mut consumed = 0;
        while consumed < limit {
            match self.tree.child(current, tokens[consumed]) {
                Some(child) => {
                    current = child;
                    consumed += 1;
                }
                None => break,
            }
        }
        (current, consumed)
    }

    fn child_names(&self, command: CommandId, prefix: &str) -> Vec<String> {
        self.tree
            .children(command)
            .iter()
            .map(|child| self.tree.info(*child))
            .filter(|info| info.is_help_visible())
            .map(|info| info.name().to_lowercase())
            .filter(|name| name.starts_with(prefix))
            .collect()
    }
}
