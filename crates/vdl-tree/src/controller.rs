//! Owner task serializing every tree mutation.
//!
//! All structural changes go through one tokio task reading an unbounded
//! command channel. Callers hold a cloneable [`TreeHandle`]; backends answer
//! chases through a [`ChaseReplier`] that queues the reply as a command, so
//! replies are applied between commands and never race with each other.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::DebuggerBackend;
use crate::error::VdlError;
use crate::inspector::{ChaseOutcome, ExpandedItem, Inspector, NodeView, Scope, ValueItem};
use crate::node::NodeId;

/// Commands processed by the owner task.
#[derive(Debug)]
pub enum TreeCommand {
    SetLocals(Vec<ValueItem>),
    SetWatch {
        watch_id: u32,
        item: ValueItem,
    },
    RemoveWatch(u32),
    SetExpandedNodes {
        scope: Scope,
        items: Vec<ExpandedItem>,
    },
    Expand(NodeId),
    Collapse(NodeId),
    ChaseCompleted {
        node: NodeId,
        outcome: ChaseOutcome,
    },
    Assign {
        node: NodeId,
        text: String,
        reply: oneshot::Sender<Result<(), VdlError>>,
    },
    FindByKey {
        scope: Scope,
        key: String,
        reply: oneshot::Sender<Option<NodeId>>,
    },
    Snapshot(oneshot::Sender<TreeSnapshot>),
    Shutdown,
}

/// Rendered state of every scope at one point in the command stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub locals: Vec<NodeView>,
    pub watches: Vec<WatchView>,
    pub pending_chases: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchView {
    pub watch_id: u32,
    #[serde(flatten)]
    pub node: NodeView,
}

/// Sending half of the owner task's queue.
#[derive(Debug, Clone)]
pub struct TreeHandle {
    tx: mpsc::UnboundedSender<TreeCommand>,
}

impl TreeHandle {
    fn send(&self, command: TreeCommand) -> Result<(), VdlError> {
        self.tx.send(command).map_err(|_| VdlError::OwnerClosed)
    }

    pub fn set_locals(&self, items: Vec<ValueItem>) -> Result<(), VdlError> {
        self.send(TreeCommand::SetLocals(items))
    }

    pub fn set_watch(&self, watch_id: u32, item: ValueItem) -> Result<(), VdlError> {
        self.send(TreeCommand::SetWatch { watch_id, item })
    }

    pub fn remove_watch(&self, watch_id: u32) -> Result<(), VdlError> {
        self.send(TreeCommand::RemoveWatch(watch_id))
    }

    pub fn set_expanded_nodes(&self, scope: Scope, items: Vec<ExpandedItem>) -> Result<(), VdlError> {
        self.send(TreeCommand::SetExpandedNodes { scope, items })
    }

    pub fn expand(&self, node: NodeId) -> Result<(), VdlError> {
        self.send(TreeCommand::Expand(node))
    }

    pub fn collapse(&self, node: NodeId) -> Result<(), VdlError> {
        self.send(TreeCommand::Collapse(node))
    }

    /// Write `text` into `node` through the backend.
    pub async fn assign(&self, node: NodeId, text: impl Into<String>) -> Result<(), VdlError> {
        let (reply, rx) = oneshot::channel();
        self.send(TreeCommand::Assign {
            node,
            text: text.into(),
            reply,
        })?;
        rx.await.map_err(|_| VdlError::OwnerClosed)?
    }

    pub async fn find_by_key(&self, scope: Scope, key: impl Into<String>) -> Result<Option<NodeId>, VdlError> {
        let (reply, rx) = oneshot::channel();
        self.send(TreeCommand::FindByKey {
            scope,
            key: key.into(),
            reply,
        })?;
        rx.await.map_err(|_| VdlError::OwnerClosed)
    }

    pub async fn snapshot(&self) -> Result<TreeSnapshot, VdlError> {
        let (reply, rx) = oneshot::channel();
        self.send(TreeCommand::Snapshot(reply))?;
        rx.await.map_err(|_| VdlError::OwnerClosed)
    }

    pub fn shutdown(&self) -> Result<(), VdlError> {
        self.send(TreeCommand::Shutdown)
    }
}

/// Completion callback handed to the backend with each chase.
#[derive(Debug)]
pub struct ChaseReplier {
    node: NodeId,
    tx: mpsc::UnboundedSender<TreeCommand>,
}

impl ChaseReplier {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Queue the chase result for the owner task. Safe from any thread.
    pub fn complete(self, outcome: ChaseOutcome) {
        let command = TreeCommand::ChaseCompleted {
            node: self.node,
            outcome,
        };
        if self.tx.send(command).is_err() {
            debug!("chase reply after owner shutdown dropped");
        }
    }
}

/// Start the owner task for `inspector`.
///
/// The task ends on [`TreeHandle::shutdown`] or once every handle and
/// outstanding replier is dropped, and yields the inspector back.
pub fn spawn(inspector: Inspector, backend: Box<dyn DebuggerBackend>) -> (TreeHandle, JoinHandle<Inspector>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let weak = tx.downgrade();
    let task = tokio::spawn(owner_task(rx, weak, inspector, backend));
    (TreeHandle { tx }, task)
}

/// Command loop. Runs until shutdown or until the queue closes.
pub async fn owner_task(
    mut rx: mpsc::UnboundedReceiver<TreeCommand>,
    replies: mpsc::WeakUnboundedSender<TreeCommand>,
    mut inspector: Inspector,
    mut backend: Box<dyn DebuggerBackend>,
) -> Inspector {
    while let Some(command) = rx.recv().await {
        match command {
            TreeCommand::SetLocals(items) => {
                if let Err(e) = inspector.set_locals(items) {
                    warn!(error = %e, "locals update had malformed VDL");
                }
            }
            TreeCommand::SetWatch { watch_id, item } => {
                if let Err(e) = inspector.set_watch(watch_id, item) {
                    warn!(watch_id, error = %e, "watch update had malformed VDL");
                }
            }
            TreeCommand::RemoveWatch(watch_id) => {
                if !inspector.remove_watch(watch_id) {
                    debug!(watch_id, "remove for unknown watch ignored");
                }
            }
            TreeCommand::SetExpandedNodes { scope, items } => {
                if let Err(e) = inspector.set_expanded_nodes(scope, items) {
                    warn!(error = %e, "expanded node restore had malformed VDL");
                }
            }
            TreeCommand::Expand(node) => handle_expand(node, &mut inspector, backend.as_mut(), &replies),
            TreeCommand::Collapse(node) => inspector.note_collapsed(node),
            TreeCommand::ChaseCompleted { node, outcome } => {
                if let Err(e) = inspector.complete_chase(node, outcome) {
                    warn!(error = %e, "chase reply had malformed VDL");
                }
            }
            TreeCommand::Assign { node, text, reply } => {
                let result = inspector.assign(node, &text).and_then(|statement| match statement {
                    Some(statement) => backend.execute(&statement).map_err(VdlError::from),
                    None => Ok(()),
                });
                let _ = reply.send(result);
            }
            TreeCommand::FindByKey { scope, key, reply } => {
                let _ = reply.send(inspector.find_by_key(scope, &key));
            }
            TreeCommand::Snapshot(reply) => {
                let _ = reply.send(snapshot(&inspector));
            }
            TreeCommand::Shutdown => {
                info!("tree owner shutting down");
                break;
            }
        }
    }
    inspector
}

fn handle_expand(
    node: NodeId,
    inspector: &mut Inspector,
    backend: &mut dyn DebuggerBackend,
    replies: &mpsc::WeakUnboundedSender<TreeCommand>,
) {
    let Some(request) = inspector.note_expanded(node) else {
        return;
    };
    let Some(tx) = replies.upgrade() else {
        debug!("queue closing, chase not issued");
        inspector.clear_chase_guard(node);
        return;
    };
    debug!(expr = %request.expr, flavor = ?request.flavor, "issuing chase");
    let replier = ChaseReplier { node, tx };
    match panic::catch_unwind(AssertUnwindSafe(|| backend.chase(request, replier))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(error = %e, "chase dispatch failed");
            inspector.clear_chase_guard(node);
        }
        Err(_) => {
            warn!("chase dispatch panicked");
            inspector.clear_chase_guard(node);
        }
    }
}

fn snapshot(inspector: &Inspector) -> TreeSnapshot {
    TreeSnapshot {
        locals: inspector
            .locals()
            .iter()
            .filter_map(|id| inspector.view(*id))
            .collect(),
        watches: inspector
            .watches()
            .iter()
            .filter_map(|(watch_id, id)| {
                inspector.view(*id).map(|node| WatchView {
                    watch_id: *watch_id,
                    node,
                })
            })
            .collect(),
        pending_chases: inspector.pending_chases(),
    }
}
