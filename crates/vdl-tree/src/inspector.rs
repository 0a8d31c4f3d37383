//! Locals and watch scopes over one variable arena.
//!
//! The [`Inspector`] is plain synchronous state. It is owned by the
//! controller's task, which is the only place that calls its mutating
//! methods.

use serde::Serialize;
use tracing::{debug, trace};

use crate::backend::{
    ChaseFlavor, ChaseOptions, ChaseRequest, NoOpenNodes, OpenNodeChange, OpenNodeStore,
};
use crate::builder::{self, BuildOptions};
use crate::error::VdlError;
use crate::flags::ValueFlags;
use crate::node::{NodeId, NodeKind, VariableNode, VariableTree};

/// Which top-level collection a lookup runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Locals,
    Watches,
}

/// A local or watch as reported by the backend at a stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueItem {
    /// Unqualified name; items without one are skipped.
    pub name: Option<String>,
    /// VDL describing the value, valid when `flags` is empty.
    pub vdl: Option<String>,
    pub flags: ValueFlags,
}

/// A node the backend reports as still expanded, with its fresh children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedItem {
    /// Identity key of the node.
    pub key: String,
    pub vdl: Option<String>,
    pub flags: ValueFlags,
}

/// Result of a chase as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChaseOutcome {
    /// VDL describing the pointer target.
    Success(String),
    Failure(ChaseFailure),
}

/// A chase the backend could not evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaseFailure {
    pub flags: ValueFlags,
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectorOptions {
    pub chase: ChaseOptions,
    pub clean_pointer_names: bool,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            chase: ChaseOptions::default(),
            clean_pointer_names: true,
        }
    }
}

/// Read-only rendering snapshot of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub key: String,
    pub is_leaf: bool,
    pub expanded: bool,
    pub delta: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeView>,
}

/// Locals and watches of one debugging session.
pub struct Inspector {
    tree: VariableTree,
    locals: Vec<NodeId>,
    watches: Vec<(u32, NodeId)>,
    open_nodes: Box<dyn OpenNodeStore>,
    options: InspectorOptions,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(Box::new(NoOpenNodes), InspectorOptions::default())
    }
}

impl Inspector {
    pub fn new(open_nodes: Box<dyn OpenNodeStore>, options: InspectorOptions) -> Self {
        Self {
            tree: VariableTree::new(),
            locals: Vec::new(),
            watches: Vec::new(),
            open_nodes,
            options,
        }
    }

    pub fn tree(&self) -> &VariableTree {
        &self.tree
    }

    pub fn locals(&self) -> &[NodeId] {
        &self.locals
    }

    pub fn watches(&self) -> &[(u32, NodeId)] {
        &self.watches
    }

    pub fn watch(&self, watch_id: u32) -> Option<NodeId> {
        self.watches
            .iter()
            .find(|(id, _)| *id == watch_id)
            .map(|(_, node)| *node)
    }

    /// Apply the locals of a new stop.
    ///
    /// Locals are matched by name so that open subtrees survive the stop.
    /// Every item is applied; the first malformed fragment is returned.
    pub fn set_locals(&mut self, items: Vec<ValueItem>) -> Result<(), VdlError> {
        let mut first_error = None;
        let mut next = Vec::with_capacity(items.len());

        for item in items {
            let Some(name) = item.name.as_deref() else {
                trace!("local without a name skipped");
                continue;
            };
            let existing = self.locals.iter().copied().find(|id| {
                !next.contains(id) && self.tree.get(*id).is_some_and(|n| n.name == name)
            });
            let id = match existing {
                Some(id) => id,
                None => self.tree.insert(VariableNode::new(name, false)),
            };
            next.push(id);
            if let Err(e) = self.apply_item(id, &item) {
                first_error.get_or_insert(e);
            }
        }

        for old in std::mem::replace(&mut self.locals, next) {
            if !self.locals.contains(&old) {
                self.tree.remove(old);
            }
        }
        debug!(locals = self.locals.len(), "locals updated");
        first_error.map_or(Ok(()), Err)
    }

    /// Create or refresh the watch `watch_id`.
    pub fn set_watch(&mut self, watch_id: u32, item: ValueItem) -> Result<(), VdlError> {
        let id = match self.watch(watch_id) {
            Some(id) => id,
            None => {
                let name = item.name.clone().unwrap_or_default();
                let id = self.tree.insert(VariableNode::new(name, true));
                self.watches.push((watch_id, id));
                id
            }
        };
        if let (Some(name), Some(node)) = (item.name.as_deref(), self.tree.get_mut(id)) {
            if node.name != name {
                debug!(watch_id, from = %node.name, to = name, "watch renamed");
                node.name = name.to_string();
                node.qualified_name = name.to_string();
            }
        }
        self.apply_item(id, &item)
    }

    /// Drop the watch `watch_id`. Returns `false` when it did not exist.
    pub fn remove_watch(&mut self, watch_id: u32) -> bool {
        let Some(pos) = self.watches.iter().position(|(id, _)| *id == watch_id) else {
            return false;
        };
        let (_, node) = self.watches.remove(pos);
        self.tree.remove(node);
        true
    }

    /// Restore expanded nodes reported by the backend after a stop.
    pub fn set_expanded_nodes(&mut self, scope: Scope, items: Vec<ExpandedItem>) -> Result<(), VdlError> {
        let mut first_error = None;
        for item in items {
            let Some(id) = self.find_by_key(scope, &item.key) else {
                trace!(key = %item.key, "expanded node not found");
                continue;
            };
            if let Some(node) = self.tree.get_mut(id) {
                node.expanded = true;
            }
            if item.flags.is_ok() {
                if let Err(e) = self.set_children(id, item.vdl.as_deref()) {
                    first_error.get_or_insert(e);
                }
            } else {
                let failure = ChaseFailure {
                    flags: item.flags,
                    name: item.key,
                    type_name: String::new(),
                };
                self.set_children_error(id, &failure);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Record that `id` was expanded.
    ///
    /// Returns the chase to issue when the node is a pointer whose target
    /// is not loaded yet. At most one chase per node is outstanding.
    pub fn note_expanded(&mut self, id: NodeId) -> Option<ChaseRequest> {
        let chase_options = self.options.chase;
        let node = self.tree.get_mut(id)?;
        if node.expanded {
            return None;
        }
        let mut request = None;
        match node.kind {
            NodeKind::Leaf => return None,
            NodeKind::Pointer { .. } if !node.foreign => {
                let Some(expr) = node.resolved.expr.clone() else {
                    debug!(name = %node.name, "pointer has no deref expression");
                    return None;
                };
                node.expanded = true;
                if node.children().is_empty() && !node.chase_in_flight {
                    node.chase_in_flight = true;
                    request = Some(ChaseRequest {
                        node: id,
                        expr,
                        flavor: if node.is_watch {
                            ChaseFlavor::Watch
                        } else {
                            ChaseFlavor::Local
                        },
                        options: chase_options,
                    });
                }
            }
            _ => node.expanded = true,
        }
        self.notify(id, true);
        request
    }

    /// Record that `id` was collapsed. Always notifies the open-node store.
    pub fn note_collapsed(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.expanded = false;
        self.notify(id, false);
    }

    /// Replace the children of `id` with the target described by `fragment`.
    ///
    /// No fragment means the pointer turned out to be null.
    pub fn set_children(&mut self, id: NodeId, fragment: Option<&str>) -> Result<(), VdlError> {
        if !self.tree.contains(id) {
            debug!("children for a removed node dropped");
            return Ok(());
        }
        let result = match fragment.filter(|f| !f.trim().is_empty()) {
            None => {
                self.tree.clear_children(id);
                if let Some(node) = self.tree.get_mut(id) {
                    node.kind = NodeKind::Leaf;
                    node.expanded = false;
                }
                Ok(())
            }
            Some(fragment) => {
                let options = self.build_options(id);
                builder::attach_children(&mut self.tree, id, fragment, options)
            }
        };
        self.clear_chase_guard(id);
        result
    }

    /// Replace the children of `id` with a single error placeholder.
    pub fn set_children_error(&mut self, id: NodeId, failure: &ChaseFailure) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let mut placeholder = VariableNode::new(failure.name.as_str(), node.is_watch);
        placeholder.type_name = failure.type_name.clone();
        placeholder.value = failure.flags.error_text().unwrap_or_default().to_string();

        self.tree.clear_children(id);
        self.tree.insert_child(id, placeholder);
        if let Some(node) = self.tree.get_mut(id) {
            node.kind = match node.kind {
                NodeKind::Pointer { .. } => NodeKind::Pointer { chased: true },
                _ => NodeKind::Aggregate,
            };
            node.chase_in_flight = false;
        }
    }

    /// Apply a chase reply. Replies for removed nodes, or for nodes whose
    /// chase was already settled, are ignored.
    pub fn complete_chase(&mut self, id: NodeId, outcome: ChaseOutcome) -> Result<(), VdlError> {
        match self.tree.get(id) {
            None => {
                debug!("chase reply for a removed node ignored");
                return Ok(());
            }
            Some(node) if !node.chase_in_flight => {
                debug!(name = %node.name, "chase reply without pending request ignored");
                return Ok(());
            }
            Some(_) => {}
        }
        match outcome {
            ChaseOutcome::Success(vdl) => self.set_children(id, Some(&vdl)),
            ChaseOutcome::Failure(failure) => {
                self.set_children_error(id, &failure);
                Ok(())
            }
        }
    }

    pub fn clear_chase_guard(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            node.chase_in_flight = false;
        }
    }

    /// Build the assignment statement for writing `text` into `id`.
    ///
    /// Returns `None` when `text` equals the current value.
    pub fn assign(&self, id: NodeId, text: &str) -> Result<Option<String>, VdlError> {
        let node = self.tree.get(id).ok_or(VdlError::StaleNode)?;
        let Some(template) = node.assign_template.as_deref() else {
            return Err(VdlError::NotAssignable(node.name.clone()));
        };
        if text == node.value {
            return Ok(None);
        }
        Ok(Some(format!("{template}{}", normalize_assignment(text))))
    }

    /// Depth-first lookup of a node by identity key.
    pub fn find_by_key(&self, scope: Scope, key: &str) -> Option<NodeId> {
        match scope {
            Scope::Locals => self.tree.find_by_key(&self.locals, key),
            Scope::Watches => {
                let roots: Vec<NodeId> = self.watches.iter().map(|(_, id)| *id).collect();
                self.tree.find_by_key(&roots, key)
            }
        }
    }

    /// Number of chases waiting for a reply.
    pub fn pending_chases(&self) -> usize {
        let mut stack: Vec<NodeId> = self.locals.clone();
        stack.extend(self.watches.iter().map(|(_, id)| *id));
        let mut pending = 0;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.tree.get(id) {
                pending += usize::from(node.chase_in_flight);
                stack.extend_from_slice(node.children());
            }
        }
        pending
    }

    pub fn view(&self, id: NodeId) -> Option<NodeView> {
        let node = self.tree.get(id)?;
        Some(NodeView {
            name: node.name.clone(),
            type_name: node.type_name.clone(),
            value: node.value.clone(),
            kind: node.kind,
            key: node.key().to_string(),
            is_leaf: node.is_leaf(),
            expanded: node.expanded,
            delta: node.delta,
            children: node.children().iter().filter_map(|c| self.view(*c)).collect(),
        })
    }

    fn apply_item(&mut self, id: NodeId, item: &ValueItem) -> Result<(), VdlError> {
        let options = self.build_options(id);
        if let Some(text) = item.flags.error_text() {
            self.tree.clear_children(id);
            if let Some(node) = self.tree.get_mut(id) {
                node.kind = NodeKind::Leaf;
                node.value = text.to_string();
                node.expanded = false;
                node.chase_in_flight = false;
                node.resolved.clear();
            }
            return Ok(());
        }
        match item.vdl.as_deref() {
            Some(vdl) => builder::refresh(&mut self.tree, id, vdl, options),
            None => Ok(()),
        }
    }

    fn build_options(&self, id: NodeId) -> BuildOptions {
        BuildOptions {
            is_watch: self.tree.get(id).is_some_and(|n| n.is_watch),
            clean_pointer_names: self.options.clean_pointer_names,
        }
    }

    fn notify(&mut self, id: NodeId, expanded: bool) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let owner_key = self
            .tree
            .root_of(id)
            .and_then(|root| self.tree.get(root))
            .map_or_else(String::new, |root| root.key().to_string());
        let change = OpenNodeChange {
            owner_key,
            node_key: node.key().to_string(),
            expanded,
            is_local: !node.is_watch,
            is_pointer: node.is_pointer(),
        };
        self.open_nodes.notify_open_node(&change);
    }
}

/// Strip an echoed `type "` prefix from user-entered assignment text.
fn normalize_assignment(text: &str) -> &str {
    match (text.find(' '), text.find('"')) {
        (Some(space), Some(quote)) if space < quote => &text[quote..],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingStore(Arc<Mutex<Vec<OpenNodeChange>>>);

    impl OpenNodeStore for RecordingStore {
        fn notify_open_node(&mut self, change: &OpenNodeChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    fn local(name: &str, vdl: &str) -> ValueItem {
        ValueItem {
            name: Some(name.into()),
            vdl: Some(vdl.into()),
            flags: ValueFlags::empty(),
        }
    }

    fn pointer_local(inspector: &mut Inspector) -> NodeId {
        inspector
            .set_locals(vec![local(
                "p",
                r#"(val name="p" type="int *" value="0x10" (deref id="p" expr="*p"))"#,
            )])
            .unwrap();
        inspector.locals()[0]
    }

    #[test]
    fn locals_are_reused_by_name() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![
                local("a", r#"(val name="a" value="1")"#),
                local("b", r#"(val name="b" value="2")"#),
            ])
            .unwrap();
        let a = inspector.locals()[0];
        let b = inspector.locals()[1];

        inspector
            .set_locals(vec![local("a", r#"(val name="a" value="5")"#)])
            .unwrap();
        assert_eq!(inspector.locals(), &[a]);
        assert_eq!(inspector.tree().get(a).unwrap().value, "5");
        assert!(!inspector.tree().contains(b));
    }

    #[test]
    fn unnamed_locals_are_skipped() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![ValueItem {
                name: None,
                vdl: Some(r#"(val value="1")"#.into()),
                flags: ValueFlags::empty(),
            }])
            .unwrap();
        assert!(inspector.locals().is_empty());
        assert!(inspector.tree().is_empty());
    }

    #[test]
    fn flagged_local_shows_error_text() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![ValueItem {
                name: Some("gone".into()),
                vdl: None,
                flags: ValueFlags::OUT_OF_SCOPE,
            }])
            .unwrap();
        let node = inspector.tree().get(inspector.locals()[0]).unwrap();
        assert_eq!(node.value, "<OUT_OF_SCOPE>");
        assert!(node.is_leaf());
    }

    #[test]
    fn malformed_local_reports_error_but_applies_rest() {
        let mut inspector = Inspector::default();
        let err = inspector
            .set_locals(vec![
                local("bad", "(val name="),
                local("good", r#"(val name="good" value="3")"#),
            ])
            .unwrap_err();
        assert!(matches!(err, VdlError::Parse { .. }));
        assert_eq!(inspector.locals().len(), 2);
        let good = inspector.tree().get(inspector.locals()[1]).unwrap();
        assert_eq!(good.value, "3");
    }

    #[test]
    fn two_expands_issue_one_chase() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);

        let request = inspector.note_expanded(p).expect("first expand chases");
        assert_eq!(request.expr, "*p");
        assert_eq!(request.flavor, ChaseFlavor::Local);
        assert!(inspector.note_expanded(p).is_none());

        inspector.note_collapsed(p);
        assert!(inspector.note_expanded(p).is_none(), "guard still raised");
        assert_eq!(inspector.pending_chases(), 1);
    }

    #[test]
    fn expand_with_loaded_children_skips_chase() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![local(
                "p",
                r#"(val name="p" value="0x10" (deref expr="*p" (val name="*p" value="1")))"#,
            )])
            .unwrap();
        let p = inspector.locals()[0];
        assert!(inspector.note_expanded(p).is_none());
        assert!(inspector.tree().get(p).unwrap().expanded);
    }

    #[test]
    fn expand_without_expression_is_noop() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![local("p", r#"(val name="p" value="0x10" (deref id="p#1"))"#)])
            .unwrap();
        let p = inspector.locals()[0];
        assert!(inspector.note_expanded(p).is_none());
        assert!(!inspector.tree().get(p).unwrap().expanded);
    }

    #[test]
    fn chase_reply_attaches_children_and_clears_guard() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        inspector.note_expanded(p).unwrap();

        inspector
            .complete_chase(p, ChaseOutcome::Success(r#"(val name="*p" value="42")"#.into()))
            .unwrap();
        let node = inspector.tree().get(p).unwrap();
        assert!(!node.chase_in_flight());
        assert_eq!(node.kind, NodeKind::Pointer { chased: true });
        assert_eq!(node.children().len(), 1);
        assert_eq!(inspector.pending_chases(), 0);
    }

    #[test]
    fn chase_failure_attaches_placeholder() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        inspector.note_expanded(p).unwrap();
        inspector
            .complete_chase(
                p,
                ChaseOutcome::Failure(ChaseFailure {
                    flags: ValueFlags::NOT_ALLOC,
                    name: "*p".into(),
                    type_name: "int".into(),
                }),
            )
            .unwrap();
        let view = inspector.view(p).unwrap();
        assert_eq!(view.children.len(), 1);
        assert_eq!(view.children[0].value, "<NOT_ALLOC>");
        assert_eq!(view.children[0].type_name, "int");
    }

    #[test]
    fn stale_chase_reply_is_noop() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        inspector.note_expanded(p).unwrap();
        inspector.set_locals(Vec::new()).unwrap();
        assert!(inspector.tree().is_empty());

        inspector
            .complete_chase(p, ChaseOutcome::Success(r#"(val name="*p" value="1")"#.into()))
            .unwrap();
        assert!(inspector.tree().is_empty());
    }

    #[test]
    fn reply_without_pending_request_is_ignored() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        inspector
            .complete_chase(p, ChaseOutcome::Success(r#"(val name="*p" value="1")"#.into()))
            .unwrap();
        assert!(inspector.tree().children(p).is_empty());
    }

    #[test]
    fn empty_children_make_null_leaf() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        inspector.note_expanded(p).unwrap();
        inspector.set_children(p, None).unwrap();
        let node = inspector.tree().get(p).unwrap();
        assert_eq!(node.kind, NodeKind::Leaf);
        assert!(!node.chase_in_flight());
    }

    #[test]
    fn open_node_store_sees_every_transition() {
        let store = RecordingStore::default();
        let mut inspector = Inspector::new(Box::new(store.clone()), InspectorOptions::default());
        let p = pointer_local(&mut inspector);

        inspector.note_expanded(p);
        inspector.note_collapsed(p);
        inspector.note_collapsed(p);

        let changes = store.0.lock().unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes[0].expanded);
        assert!(changes[0].is_local && changes[0].is_pointer);
        assert_eq!(changes[0].node_key, "*p");
        assert_eq!(changes[0].owner_key, "*p");
        assert!(!changes[2].expanded);
    }

    #[test]
    fn watches_rename_and_remove() {
        let mut inspector = Inspector::default();
        inspector
            .set_watch(7, local("x", r#"(val name="x" value="1")"#))
            .unwrap();
        let id = inspector.watch(7).unwrap();
        assert!(inspector.tree().get(id).unwrap().is_watch);

        inspector
            .set_watch(7, local("x + 1", r#"(val name="x + 1" value="2")"#))
            .unwrap();
        assert_eq!(inspector.watch(7), Some(id));
        assert_eq!(inspector.tree().get(id).unwrap().name, "x + 1");

        assert!(inspector.remove_watch(7));
        assert!(!inspector.remove_watch(7));
        assert!(inspector.tree().is_empty());
    }

    #[test]
    fn watch_chase_has_watch_flavor() {
        let mut inspector = Inspector::new(
            Box::new(NoOpenNodes),
            InspectorOptions {
                chase: ChaseOptions {
                    inherited_members: true,
                    dynamic_type: false,
                },
                clean_pointer_names: true,
            },
        );
        inspector
            .set_watch(
                1,
                local("q", r#"(val name="q" value="0x8" (deref expr="*q"))"#),
            )
            .unwrap();
        let request = inspector.note_expanded(inspector.watch(1).unwrap()).unwrap();
        assert_eq!(request.flavor, ChaseFlavor::Watch);
        assert_eq!(request.command_line(), "-r *q");
    }

    #[test]
    fn expanded_nodes_are_restored_by_key() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![local(
                "s",
                r#"(agg name="s" (val name="p" value="0x40" (deref id="s.p" expr="*s.p")))"#,
            )])
            .unwrap();
        inspector
            .set_expanded_nodes(
                Scope::Locals,
                vec![
                    ExpandedItem {
                        key: "*s.p".into(),
                        vdl: Some(r#"(val name="*s.p" value="9")"#.into()),
                        flags: ValueFlags::empty(),
                    },
                    ExpandedItem {
                        key: "missing".into(),
                        ..ExpandedItem::default()
                    },
                ],
            )
            .unwrap();
        let p = inspector.find_by_key(Scope::Locals, "*s.p").unwrap();
        let view = inspector.view(p).unwrap();
        assert!(view.expanded);
        assert_eq!(view.children[0].value, "9");
        assert!(inspector.find_by_key(Scope::Watches, "*s.p").is_none());
    }

    #[test]
    fn assign_builds_statement() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![local("i", r#"(val name="i" value="3" assign="i=")"#)])
            .unwrap();
        let i = inspector.locals()[0];
        assert_eq!(inspector.assign(i, "3").unwrap(), None);
        assert_eq!(inspector.assign(i, "4").unwrap().as_deref(), Some("i=4"));
        assert_eq!(
            inspector.assign(i, r#"char * "abc""#).unwrap().as_deref(),
            Some(r#"i="abc""#)
        );
    }

    #[test]
    fn assign_without_template_fails() {
        let mut inspector = Inspector::default();
        inspector
            .set_locals(vec![local("k", r#"(val name="k" value="1")"#)])
            .unwrap();
        let err = inspector.assign(inspector.locals()[0], "2").unwrap_err();
        assert!(matches!(err, VdlError::NotAssignable(name) if name == "k"));
    }

    #[test]
    fn normalize_keeps_plain_strings() {
        assert_eq!(normalize_assignment(r#""a b""#), r#""a b""#);
        assert_eq!(normalize_assignment("1 + 2"), "1 + 2");
    }

    #[test]
    fn view_serializes_kind_inline() {
        let mut inspector = Inspector::default();
        let p = pointer_local(&mut inspector);
        let json = serde_json::to_value(inspector.view(p).unwrap()).unwrap();
        assert_eq!(json["kind"], "pointer");
        assert_eq!(json["chased"], false);
        assert_eq!(json["type"], "int *");
        assert!(json.get("children").is_none());
    }
}
