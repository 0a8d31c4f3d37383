//! Tree builder: applies parsed VDL events to the variable tree.
//!
//! The builder keeps a stack of build contexts. Each context names the node
//! that receives children at that nesting level, the children collected so
//! far, and whether the level holds children at all. A context that holds
//! no children stands for the node itself, so a value arriving there
//! refreshes the node in place instead of allocating a new one.
//!
//! Children are matched against the previous children of the same parent
//! by qualified name, so refreshing an unchanged fragment mutates the
//! existing nodes and their ids stay valid.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::VdlError;
use crate::node::{DerefTokens, NodeId, NodeKind, VariableNode, VariableTree};
use crate::parser::{self, AggregateStart, DerefDirective, SimpleValue, VdlEvent};

/// Options for one builder pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// The tree being built belongs to a watch rather than a local.
    pub is_watch: bool,
    /// Shorten the names of freshly resolved pointer targets.
    pub clean_pointer_names: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            is_watch: false,
            clean_pointer_names: true,
        }
    }
}

/// Apply a fragment describing `root`'s own value.
///
/// Used for locals and watch snapshots.
///
/// # Errors
///
/// Returns [`VdlError::Parse`] when the fragment is malformed; the tree is
/// left untouched in that case.
pub fn refresh(
    tree: &mut VariableTree,
    root: NodeId,
    fragment: &str,
    options: BuildOptions,
) -> Result<(), VdlError> {
    run(tree, root, fragment, options, false)
}

/// Apply a fragment describing `root`'s children, i.e. a chased pointer
/// target.
///
/// # Errors
///
/// Returns [`VdlError::Parse`] when the fragment is malformed; the tree is
/// left untouched in that case.
pub fn attach_children(
    tree: &mut VariableTree,
    root: NodeId,
    fragment: &str,
    options: BuildOptions,
) -> Result<(), VdlError> {
    run(tree, root, fragment, options, true)
}

/// Shorten a scoped backend name to its last component.
///
/// Drops everything up to the last `.`; if that leaves a backquoted scope
/// qualifier (`` cc`func()`var ``) the qualifier prefix goes too. Then drops
/// everything up to the last `:`.
pub fn clean_pointer_name(name: &str) -> &str {
    let mut short = name;
    if let Some(dot) = short.rfind('.') {
        short = &short[dot + 1..];
        if let Some(tick) = short.find('`') {
            short = &short[tick + 1..];
        }
    }
    if let Some(colon) = short.rfind(':') {
        short = &short[colon + 1..];
    }
    short
}

fn run(
    tree: &mut VariableTree,
    root: NodeId,
    fragment: &str,
    options: BuildOptions,
    children: bool,
) -> Result<(), VdlError> {
    let events = parser::parse(fragment)?;
    if !tree.contains(root) {
        debug!("builder root no longer exists, fragment dropped");
        return Ok(());
    }
    let mut builder = TreeBuilder {
        tree,
        root,
        options,
        contexts: vec![BuildContext::new(root, children, None)],
        seen_aggregate: false,
        orphans: 0,
        claimed: HashSet::new(),
    };
    builder.apply(events)?;
    builder.finish();
    Ok(())
}

#[derive(Debug)]
struct BuildContext {
    node: NodeId,
    pending: Vec<NodeId>,
    may_have_children: bool,
    /// The level stands for a pointer target: its first aggregate binds to
    /// `node` itself rather than to a new child.
    target: bool,
    /// Something was already placed at this level.
    bound: bool,
    /// Tokens computed by the deref step that opened this level.
    resolved: Option<DerefTokens>,
}

impl BuildContext {
    fn new(node: NodeId, target: bool, resolved: Option<DerefTokens>) -> Self {
        Self {
            node,
            pending: Vec::new(),
            may_have_children: target,
            target,
            bound: false,
            resolved,
        }
    }
}

struct TreeBuilder<'t> {
    tree: &'t mut VariableTree,
    root: NodeId,
    options: BuildOptions,
    contexts: Vec<BuildContext>,
    seen_aggregate: bool,
    /// Aggregates opened while no context was active; their closes are
    /// swallowed.
    orphans: usize,
    claimed: HashSet<NodeId>,
}

impl TreeBuilder<'_> {
    fn apply(&mut self, events: Vec<VdlEvent>) -> Result<(), VdlError> {
        for event in events {
            match event {
                VdlEvent::SetLeaf(leaf) => self.on_set_leaf(leaf),
                VdlEvent::SetType {
                    type_name,
                    array_type,
                } => {
                    if let Some(node) = self.header_node() {
                        node.type_name = type_name;
                        node.array_type = array_type;
                    }
                }
                VdlEvent::SetJava(java) => self.on_set_java(java),
                VdlEvent::SetDelta(delta) => {
                    if let Some(node) = self.header_node() {
                        node.delta = delta;
                    }
                }
                VdlEvent::SimpleValue(value) => self.on_simple_value(value)?,
                VdlEvent::StartAggregate(start) => self.on_start_aggregate(start),
                VdlEvent::EndAggregate => self.on_end_aggregate(),
            }
        }
        Ok(())
    }

    /// Header events describe the value of a context that stands for its
    /// node; inside a children level they describe a target we already
    /// represent and are dropped.
    fn header_node(&mut self) -> Option<&mut VariableNode> {
        let ctx = self.contexts.last().filter(|c| !c.may_have_children)?;
        self.tree.get_mut(ctx.node)
    }

    fn on_set_leaf(&mut self, leaf: bool) {
        let Some(ctx) = self.contexts.last().filter(|c| !c.may_have_children) else {
            return;
        };
        let id = ctx.node;
        if leaf && self.tree.children(id).is_empty() {
            if let Some(node) = self.tree.get_mut(id) {
                node.kind = NodeKind::Leaf;
                node.expanded = false;
            }
        }
    }

    fn on_set_java(&mut self, java: bool) {
        let Some(ctx) = self.contexts.last() else {
            return;
        };
        let (id, reuse) = (ctx.node, !ctx.may_have_children);
        if let Some(node) = self.tree.get_mut(id) {
            if reuse || java {
                node.foreign = java;
            }
        }
    }

    fn on_simple_value(&mut self, value: SimpleValue) -> Result<(), VdlError> {
        let Some(top) = self.contexts.len().checked_sub(1) else {
            debug!(name = %value.name, "value outside any open level ignored");
            return Ok(());
        };

        let id = if self.contexts[top].may_have_children {
            let parent = self.contexts[top].node;
            let clean = self.contexts[top].target;
            let Some(child) = self.claim_child(parent, &value.name, clean) else {
                return Ok(());
            };
            self.contexts[top].pending.push(child);
            self.contexts[top].bound = true;
            self.mark_non_leaf(parent);
            child
        } else {
            self.contexts[top].node
        };

        let is_nil = matches!(value.value.as_str(), "(nil)" | "((nil))");
        let Some(node) = self.tree.get_mut(id) else {
            return Ok(());
        };
        trace!(name = %value.name, value = %value.value, "simple value");
        node.type_name = value.type_name;
        node.array_type = value.array_type;
        node.is_static = value.is_static;
        node.value = value.value;
        node.assign_template = value.assign_template;
        node.literal = value.hint.as_deref() == Some("literal");
        node.hint = value.hint;
        node.delta = value.delta;
        if let Some(deref_id) = value.deref_id {
            node.raw.id = Some(deref_id);
        }

        match value.deref {
            Some(deref) if !is_nil => self.on_pointer(id, deref),
            _ => {
                // Scalars and null pointers.
                node.kind = NodeKind::Leaf;
                node.expanded = false;
                node.chase_in_flight = false;
                node.raw.expr = None;
                node.resolved.clear();
                self.tree.clear_children(id);
                Ok(())
            }
        }
    }

    fn on_pointer(&mut self, id: NodeId, deref: DerefDirective) -> Result<(), VdlError> {
        let resolved = DerefTokens {
            id: deref.id,
            expr: deref.expr,
        };
        let has_children = !self.tree.children(id).is_empty();
        if let Some(node) = self.tree.get_mut(id) {
            node.raw.expr = resolved.expr.clone();
            node.resolved = resolved.clone();
            node.kind = NodeKind::Pointer {
                chased: has_children,
            };
        }
        if deref.target.is_empty() {
            return Ok(());
        }

        let events = parser::parse(&deref.target)?;
        let at_root = id == self.root && self.contexts.len() == 1 && self.contexts[0].node == id;
        if at_root {
            // The root's own level becomes the target level; no second
            // frame for the same node.
            let ctx = &mut self.contexts[0];
            ctx.may_have_children = true;
            ctx.target = true;
            ctx.resolved = Some(resolved);
            return self.apply(events);
        }

        let depth = self.contexts.len();
        self.contexts.push(BuildContext::new(id, true, Some(resolved)));
        self.apply(events)?;
        while self.contexts.len() > depth {
            if let Some(ctx) = self.contexts.pop() {
                self.close(ctx);
            }
        }
        Ok(())
    }

    fn on_start_aggregate(&mut self, start: AggregateStart) {
        let Some(top) = self.contexts.len().checked_sub(1) else {
            debug!(name = %start.name, "aggregate outside any open level ignored");
            self.orphans += 1;
            return;
        };
        let first = !self.seen_aggregate;
        self.seen_aggregate = true;

        let ctx = &self.contexts[top];
        let (parent, target) = (ctx.node, ctx.target);
        let in_place = if target {
            !ctx.bound
        } else {
            first && top == 0 && !ctx.may_have_children
        };

        if in_place {
            let id = parent;
            let ctx = &mut self.contexts[top];
            ctx.may_have_children = true;
            ctx.bound = true;
            if let Some(node) = self.tree.get_mut(id) {
                if !target {
                    node.type_name = start.type_name;
                    node.array_type = start.array_type;
                    node.is_static = start.is_static;
                    node.delta = start.delta;
                    if let Some(deref_id) = start.deref_id {
                        node.raw.id = Some(deref_id);
                    }
                }
                if !node.is_pointer() {
                    node.kind = NodeKind::Aggregate;
                }
                if start.open {
                    node.expanded = true;
                }
            }
            return;
        }

        let Some(child) = self.claim_child(parent, &start.name, target) else {
            self.orphans += 1;
            return;
        };
        self.contexts[top].pending.push(child);
        self.contexts[top].bound = true;
        self.mark_non_leaf(parent);
        if let Some(node) = self.tree.get_mut(child) {
            node.type_name = start.type_name;
            node.array_type = start.array_type;
            node.is_static = start.is_static;
            node.delta = start.delta;
            node.kind = NodeKind::Aggregate;
            node.resolved.clear();
            if let Some(deref_id) = start.deref_id {
                node.raw.id = Some(deref_id);
            }
            if start.open {
                node.expanded = true;
            }
        }
        let mut ctx = BuildContext::new(child, false, None);
        ctx.may_have_children = true;
        self.contexts.push(ctx);
    }

    fn on_end_aggregate(&mut self) {
        if self.orphans > 0 {
            self.orphans -= 1;
            return;
        }
        match self.contexts.pop() {
            Some(ctx) => self.close(ctx),
            None => debug!("unmatched aggregate close ignored"),
        }
    }

    /// Pop-time work: hand the collected children to the level's node.
    fn close(&mut self, ctx: BuildContext) {
        let parent = ctx.node;
        let Some(node) = self.tree.get(parent) else {
            return;
        };
        let is_pointer = node.is_pointer();

        if ctx.pending.is_empty() {
            self.tree.clear_children(parent);
            if let Some(node) = self.tree.get_mut(parent) {
                if is_pointer {
                    node.kind = NodeKind::Pointer { chased: false };
                }
            }
            return;
        }

        if let (true, Some(resolved)) = (is_pointer, ctx.resolved) {
            if let Some(node) = self.tree.get_mut(parent) {
                node.resolved = resolved;
            }
        }
        self.tree.replace_children(parent, ctx.pending);

        let composite = {
            let Some(node) = self.tree.get(parent) else {
                return;
            };
            if !node.is_pointer() || node.foreign {
                let values: Vec<&str> = node
                    .children()
                    .iter()
                    .filter_map(|c| self.tree.get(*c))
                    .map(|c| c.value.as_str())
                    .collect();
                Some(format!("({})", values.join(",")))
            } else {
                None
            }
        };
        if let Some(node) = self.tree.get_mut(parent) {
            if let Some(composite) = composite {
                node.value = composite;
            }
            node.kind = match node.kind {
                NodeKind::Pointer { .. } => NodeKind::Pointer { chased: true },
                _ => NodeKind::Aggregate,
            };
        }
    }

    /// Levels still open at the end of input: children levels hand over
    /// what they collected, in-place levels have nothing to do.
    fn finish(&mut self) {
        while let Some(ctx) = self.contexts.pop() {
            if ctx.may_have_children {
                self.close(ctx);
            }
        }
    }

    fn mark_non_leaf(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            node.kind = match node.kind {
                NodeKind::Leaf | NodeKind::Aggregate => NodeKind::Aggregate,
                NodeKind::Pointer { .. } => NodeKind::Pointer { chased: true },
            };
        }
    }

    /// Find the previous child of `parent` called `qualified`, or create it.
    fn claim_child(&mut self, parent: NodeId, qualified: &str, clean: bool) -> Option<NodeId> {
        let existing = self.tree.children(parent).iter().copied().find(|c| {
            !self.claimed.contains(c)
                && self
                    .tree
                    .get(*c)
                    .is_some_and(|n| n.qualified_name == qualified)
        });
        let id = match existing {
            Some(id) => id,
            None => {
                let mut node = VariableNode::new(qualified, self.options.is_watch);
                node.foreign = self.tree.get(parent).is_some_and(|p| p.foreign);
                self.tree.insert_child(parent, node)?
            }
        };
        self.claimed.insert(id);

        let display = if clean && !self.options.is_watch && self.options.clean_pointer_names {
            clean_pointer_name(qualified)
        } else {
            qualified
        };
        if let Some(node) = self.tree.get_mut(id) {
            node.name = display.to_string();
        }
        Some(id)
    }
}
