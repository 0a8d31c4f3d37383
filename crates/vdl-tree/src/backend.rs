//! Collaborators injected into the tree engine.
//!
//! The engine never talks to a debugger directly. It hands chase requests
//! and assignment statements to a [`DebuggerBackend`], and reports every
//! expand/collapse to an [`OpenNodeStore`] so the caller can persist which
//! nodes were open across stops.

use serde::Serialize;

use crate::controller::ChaseReplier;
use crate::error::BackendError;
use crate::node::NodeId;

/// Extra evaluation options forwarded with every chase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChaseOptions {
    /// Include members inherited from base classes (`-r`).
    pub inherited_members: bool,
    /// Evaluate using the dynamic type of the target (`-d`).
    pub dynamic_type: bool,
}

/// Which scope a chase was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaseFlavor {
    Local,
    Watch,
}

/// One pointer dereference to be evaluated by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaseRequest {
    pub node: NodeId,
    pub expr: String,
    pub flavor: ChaseFlavor,
    pub options: ChaseOptions,
}

impl ChaseRequest {
    /// Argument string for the backend's dereference command.
    pub fn command_line(&self) -> String {
        let mut line = String::new();
        if self.options.inherited_members {
            line.push_str("-r ");
        }
        if self.options.dynamic_type {
            line.push_str("-d ");
        }
        line.push_str(&self.expr);
        line
    }
}

/// Debugger side of the engine.
///
/// Both calls must return promptly. `chase` answers later through the
/// replier, from any thread.
pub trait DebuggerBackend: Send {
    /// Start evaluating `request`; the result is delivered via `replier`.
    fn chase(&mut self, request: ChaseRequest, replier: ChaseReplier) -> Result<(), BackendError>;

    /// Run an assignment statement built from a node's template.
    fn execute(&mut self, statement: &str) -> Result<(), BackendError>;
}

/// Expansion change of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenNodeChange {
    /// Identity key of the top-level local or watch owning the node.
    pub owner_key: String,
    pub node_key: String,
    pub expanded: bool,
    pub is_local: bool,
    pub is_pointer: bool,
}

/// Receiver of expand/collapse notifications.
pub trait OpenNodeStore: Send {
    fn notify_open_node(&mut self, change: &OpenNodeChange);
}

/// Store that forgets every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpenNodes;

impl OpenNodeStore for NoOpenNodes {
    fn notify_open_node(&mut self, _change: &OpenNodeChange) {}
}
