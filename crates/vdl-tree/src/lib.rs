//! vdl-tree — variable inspection engine for native debugger backends.
//!
//! This crate turns the backend's Variable Description Language (VDL)
//! replies into a live tree of locals and watches. It parses VDL
//! fragments, builds and refreshes the node arena in place, and chases
//! pointers asynchronously through a single owner task.

pub mod backend;
pub mod builder;
pub mod controller;
pub mod error;
pub mod flags;
pub mod inspector;
pub mod node;
pub mod parser;

// Re-export key types for convenience.
pub use backend::{
    ChaseFlavor, ChaseOptions, ChaseRequest, DebuggerBackend, NoOpenNodes, OpenNodeChange,
    OpenNodeStore,
};
pub use builder::{attach_children, clean_pointer_name, refresh, BuildOptions};
pub use controller::{spawn, ChaseReplier, TreeCommand, TreeHandle, TreeSnapshot, WatchView};
pub use error::{BackendError, VdlError};
pub use flags::ValueFlags;
pub use inspector::{
    ChaseFailure, ChaseOutcome, ExpandedItem, Inspector, InspectorOptions, NodeView, Scope,
    ValueItem,
};
pub use node::{DerefTokens, NodeId, NodeKind, VariableNode, VariableTree};
pub use parser::{parse, AggregateStart, DerefDirective, SimpleValue, VdlEvent};
