//! Error types for VDL parsing, tree mutation and backend access.

use thiserror::Error;

/// Errors from parsing VDL fragments or mutating the variable tree.
#[derive(Debug, Error)]
pub enum VdlError {
    /// The fragment does not follow the VDL grammar.
    #[error("VDL parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset into the fragment where parsing failed.
        offset: usize,
        /// Human-readable description of the problem.
        message: String,
    },

    /// The node has no assignment template, so it cannot be written back.
    #[error("variable is not assignable: {0}")]
    NotAssignable(String),

    /// The node id refers to a node that has since been removed.
    #[error("node no longer exists")]
    StaleNode,

    /// The backend refused or failed a request.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The tree owner task has stopped processing commands.
    #[error("tree owner has shut down")]
    OwnerClosed,
}

/// Errors reported by a [`DebuggerBackend`](crate::backend::DebuggerBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The debugger connection is gone.
    #[error("debugger backend disconnected")]
    Disconnected,

    /// The debugger rejected the command.
    #[error("debugger rejected command: {0}")]
    Rejected(String),
}
