//! The hierarchical command tree.
//!
//! A [`Command`] owns its children; the back-reference to its parent is a
//! [`Weak`] pointer set exactly once, when the command is attached. A node
//! therefore has at most one parent and the tree cannot contain cycles.
//!
//! Each node keeps two maps under its own read-write lock: children by name,
//! and child aliases to child names. Lookups only take read locks.
//!
//! ```rust,ignore
//! let admin = Command::builder("admin")
//!     .description("Administration")
//!     .subcommand(
//!         Command::builder("ban")
//!             .alias("b")
//!             .usage("admin ban <user>")
//!             .handler_fn(ban),
//!     )
//!     .build();
//!
//! let (cmd, rest) = admin.find(&["b".into(), "userX".into()]);
//! assert_eq!(cmd.name(), "ban");
//! assert_eq!(rest, ["userX"]);
//! ```

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::future::Future;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use tower::BoxError;
use tracing::warn;

use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::handler::{CommandHandler, Middleware, compose, handler_fn};

/// Separator between names in a command's full path.
pub const PATH_SEPARATOR: &str = " ";

#[derive(Default)]
struct Children {
    commands: HashMap<String, Arc<Command>>,
    /// Alias -> child name.
    aliases: HashMap<String, String>,
}

/// A named, possibly nested, invocable unit.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    handler: RwLock<Option<CommandHandler>>,
    parent: OnceLock<Weak<Command>>,
    full_path: OnceLock<String>,
    children: RwLock<Children>,
}

impl Command {
    /// Starts building a command called `name`.
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    /// The command's own name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names accepted in place of [`name`](Self::name).
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The space-separated path from the top-level command to this one.
    ///
    /// Falls back to the bare name until the command is registered.
    pub fn full_path(&self) -> &str {
        self.full_path.get().map_or(self.name.as_str(), String::as_str)
    }

    /// The parent command, if attached and still alive.
    pub fn parent(&self) -> Option<Arc<Command>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Returns the (middleware-wrapped) handler, if one is set.
    pub fn handler(&self) -> Option<CommandHandler> {
        self.handler.read().clone()
    }

    /// Returns `true` once a handler is set. Registration sets one on every
    /// node of the subtree.
    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Resolves `token` against direct children, by name first, then alias.
    pub fn child(&self, token: &str) -> Option<Arc<Command>> {
        let children = self.children.read();
        children
            .commands
            .get(token)
            .or_else(|| {
                children
                    .aliases
                    .get(token)
                    .and_then(|name| children.commands.get(name))
            })
            .cloned()
    }

    /// Direct children, sorted by name.
    pub fn subcommands(&self) -> Vec<Arc<Command>> {
        let mut subcommands: Vec<_> = self.children.read().commands.values().cloned().collect();
        subcommands.sort_by(|a, b| a.name.cmp(&b.name));
        subcommands
    }

    /// This command and every descendant, in pre-order.
    pub fn subtree(self: &Arc<Self>) -> Vec<Arc<Command>> {
        let mut nodes = Vec::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(node) = stack.pop() {
            // Reverse so the sorted first child is visited first.
            stack.extend(node.subcommands().into_iter().rev());
            nodes.push(node);
        }
        nodes
    }

    /// Descends greedily from this command, consuming one token per level.
    ///
    /// Stops at the first token that matches no child and returns the node
    /// reached together with every unconsumed token.
    pub fn find<'a>(self: &Arc<Self>, args: &'a [String]) -> (Arc<Command>, &'a [String]) {
        let mut node = Arc::clone(self);
        let mut rest = args;
        while let Some((token, tail)) = rest.split_first() {
            let Some(child) = node.child(token) else {
                break;
            };
            node = child;
            rest = tail;
        }
        (node, rest)
    }

    /// Attaches `child` below this command.
    ///
    /// The child's aliases are indexed unless they collide with an existing
    /// sibling name or alias, in which case they are skipped with a warning.
    /// If this command already has a full path, the child's subtree gets
    /// its paths immediately.
    pub fn add_command(self: &Arc<Self>, child: Arc<Command>) -> CommandResult<()> {
        if let Some(parent) = child.parent.get() {
            return Err(CommandError::AlreadyAttached {
                name: child.name.clone(),
                parent: parent.upgrade().map(|p| p.name.clone()).unwrap_or_default(),
            });
        }

        let mut ancestor = Some(Arc::clone(self));
        while let Some(node) = ancestor {
            if Arc::ptr_eq(&node, &child) {
                return Err(CommandError::Cycle {
                    child: child.name.clone(),
                    parent: self.name.clone(),
                });
            }
            ancestor = node.parent();
        }

        {
            let mut children = self.children.write();
            if children.commands.contains_key(&child.name) {
                return Err(CommandError::DuplicateName {
                    parent: self.name.clone(),
                    name: child.name.clone(),
                });
            }
            // Lost a race with another attachment of the same child.
            if child.parent.set(Arc::downgrade(self)).is_err() {
                return Err(CommandError::AlreadyAttached {
                    name: child.name.clone(),
                    parent: child.parent().map(|p| p.name.clone()).unwrap_or_default(),
                });
            }

            if let Some(owner) = children.aliases.remove(&child.name) {
                warn!(
                    parent = %self.name,
                    name = %child.name,
                    shadowed = %owner,
                    "Subcommand name shadows a sibling alias"
                );
            }
            for alias in &child.aliases {
                if children.commands.contains_key(alias) || children.aliases.contains_key(alias) {
                    warn!(
                        parent = %self.name,
                        command = %child.name,
                        alias = %alias,
                        "Ignoring alias that collides with a sibling"
                    );
                    continue;
                }
                children.aliases.insert(alias.clone(), child.name.clone());
            }
            children.commands.insert(child.name.clone(), Arc::clone(&child));
        }

        if let Some(path) = self.full_path.get() {
            child.assign_full_paths(format!("{path}{PATH_SEPARATOR}{}", child.name));
        }
        Ok(())
    }

    /// Sets the full path of this command and, pre-order, of its subtree.
    ///
    /// Paths are set at most once; nodes that already have one keep it.
    pub(crate) fn assign_full_paths(self: &Arc<Self>, path: String) {
        let mut stack = vec![(Arc::clone(self), path)];
        while let Some((node, path)) = stack.pop() {
            let _ = node.full_path.set(path);
            let base = node.full_path();
            for child in node.subcommands() {
                let child_path = format!("{base}{PATH_SEPARATOR}{}", child.name);
                stack.push((child, child_path));
            }
        }
    }

    /// Wraps the handler of every command in the subtree with `middlewares`.
    ///
    /// Group nodes without a handler get [`reply_help`] first, so invoking a
    /// group runs the same middleware stack as its subcommands.
    pub(crate) fn wrap_handlers(self: &Arc<Self>, middlewares: &[Middleware]) {
        for node in self.subtree() {
            let mut handler = node.handler.write();
            let inner = handler.take().unwrap_or_else(|| handler_fn(reply_help));
            *handler = Some(compose(inner, middlewares));
        }
    }

    /// Human-readable help: path, description, usage, aliases, subcommands.
    pub fn help_text(&self) -> String {
        let mut help = String::new();
        let _ = writeln!(help, "Command: {}", self.full_path());
        if !self.description.is_empty() {
            let _ = writeln!(help, "Description: {}", self.description);
        }
        if !self.usage.is_empty() {
            let _ = writeln!(help, "Usage: {}", self.usage);
        }
        if !self.aliases.is_empty() {
            let _ = writeln!(help, "Aliases: {}", self.aliases.join(", "));
        }

        let subcommands = self.subcommands();
        if !subcommands.is_empty() {
            help.push_str("Subcommands:\n");
            for sub in subcommands {
                if sub.description.is_empty() {
                    let _ = writeln!(help, "  {}", sub.name);
                } else {
                    let _ = writeln!(help, "  {} - {}", sub.name, sub.description);
                }
            }
        }
        help
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("full_path", &self.full_path.get())
            .field("has_handler", &self.has_handler())
            .field(
                "subcommands",
                &self.children.read().commands.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Replies with the help text of the invoked command.
async fn reply_help(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
    ctx.reply_text(ctx.command().help_text());
    Ok(())
}

// ============================================================================
// CommandBuilder
// ============================================================================

/// Builder for [`Command`] trees.
#[must_use = "call `build` to obtain the command"]
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    handler: Option<CommandHandler>,
    subcommands: Vec<Arc<Command>>,
}

impl CommandBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            usage: String::new(),
            handler: None,
            subcommands: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Sets an already-built handler service.
    pub fn handler(mut self, handler: CommandHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the handler from an async function.
    pub fn handler_fn<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Arc<CommandContext>, Vec<String>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.handler(handler_fn(handler))
    }

    /// Adds a subcommand, attached when the command is built.
    pub fn subcommand(mut self, command: impl Into<Arc<Command>>) -> Self {
        self.subcommands.push(command.into());
        self
    }

    fn into_parts(self) -> (Arc<Command>, Vec<Arc<Command>>) {
        let command = Arc::new(Command {
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            usage: self.usage,
            handler: RwLock::new(self.handler),
            parent: OnceLock::new(),
            full_path: OnceLock::new(),
            children: RwLock::default(),
        });
        (command, self.subcommands)
    }

    /// Builds the command, failing on the first subcommand that cannot be
    /// attached.
    pub fn try_build(self) -> CommandResult<Arc<Command>> {
        let (command, subcommands) = self.into_parts();
        for sub in subcommands {
            command.add_command(sub)?;
        }
        Ok(command)
    }

    /// Builds the command, skipping subcommands that cannot be attached.
    pub fn build(self) -> Arc<Command> {
        let (command, subcommands) = self.into_parts();
        for sub in subcommands {
            if let Err(err) = command.add_command(sub) {
                warn!(command = %command.name, error = %err, "Skipping subcommand");
            }
        }
        command
    }
}

impl From<CommandBuilder> for Arc<Command> {
    fn from(builder: CommandBuilder) -> Self {
        builder.build()
    }
}
