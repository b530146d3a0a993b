//! Error types for the Switchboard framework.

use thiserror::Error;

/// Errors raised while assembling a command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The child command already has a parent.
    #[error("command '{name}' is already attached to '{parent}'")]
    AlreadyAttached {
        /// Name of the child being attached.
        name: String,
        /// Name of its existing parent.
        parent: String,
    },

    /// Attaching the child would make a command its own ancestor.
    #[error("attaching '{child}' under '{parent}' would create a cycle")]
    Cycle {
        /// Name of the child being attached.
        child: String,
        /// Name of the intended parent.
        parent: String,
    },

    /// A sibling with the same name is already attached.
    #[error("'{parent}' already has a subcommand named '{name}'")]
    DuplicateName {
        /// Name of the intended parent.
        parent: String,
        /// The conflicting name.
        name: String,
    },
}

/// Result type for command tree operations.
pub type CommandResult<T> = Result<T, CommandError>;
