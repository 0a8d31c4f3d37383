//! Variable nodes and the arena that owns them.

use serde::Serialize;

/// Stable handle to a node in a [`VariableTree`].
///
/// Handles carry a generation so that a handle to a removed node is never
/// confused with a later node that happens to reuse the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// What a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NodeKind {
    /// Scalar value, never has children.
    Leaf,
    /// Pointer whose children, when present, are the chased target.
    Pointer {
        /// `true` once the target has been attached.
        chased: bool,
    },
    /// Struct, class, union or array with children filled at parse time.
    Aggregate,
}

/// Backend correlation id / expression pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerefTokens {
    pub id: Option<String>,
    pub expr: Option<String>,
}

impl DerefTokens {
    pub fn clear(&mut self) {
        self.id = None;
        self.expr = None;
    }
}

/// One inspected program value.
#[derive(Debug, Clone)]
pub struct VariableNode {
    /// Label shown to the user.
    pub name: String,
    /// Name exactly as the backend sent it.
    pub qualified_name: String,
    pub type_name: String,
    pub array_type: String,
    pub value: String,
    pub kind: NodeKind,
    pub expanded: bool,
    pub is_static: bool,
    pub literal: bool,
    /// Value changed since the previous stop.
    pub delta: bool,
    /// Value belongs to a foreign (non-native) language domain.
    pub foreign: bool,
    pub is_watch: bool,
    /// Tokens exactly as received, for diagnostics.
    pub raw: DerefTokens,
    /// Tokens used to chase the pointer again.
    pub resolved: DerefTokens,
    pub assign_template: Option<String>,
    pub hint: Option<String>,
    pub(crate) chase_in_flight: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl VariableNode {
    /// A fresh, collapsed leaf.
    pub fn new(name: impl Into<String>, is_watch: bool) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            name,
            type_name: String::new(),
            array_type: String::new(),
            value: String::new(),
            kind: NodeKind::Leaf,
            expanded: false,
            is_static: false,
            literal: false,
            delta: false,
            foreign: false,
            is_watch,
            raw: DerefTokens::default(),
            resolved: DerefTokens::default(),
            assign_template: None,
            hint: None,
            chase_in_flight: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, NodeKind::Pointer { .. })
    }

    /// A node is drawn without an expander when it is a scalar or an
    /// aggregate that turned out to be empty.
    pub fn is_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Leaf => true,
            NodeKind::Aggregate => self.children.is_empty(),
            NodeKind::Pointer { .. } => false,
        }
    }

    /// `true` while a chase request for this node is outstanding.
    pub fn chase_in_flight(&self) -> bool {
        self.chase_in_flight
    }

    /// Key used to match this node across refreshes and in the open-node set.
    pub fn key(&self) -> &str {
        let key = if self.is_pointer() {
            self.resolved.expr.as_deref().or(self.resolved.id.as_deref())
        } else {
            self.raw.id.as_deref()
        };
        key.unwrap_or(&self.qualified_name)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<VariableNode>,
}

/// Arena owning every variable node of a session.
///
/// Parent/child relations are stored as [`NodeId`]s; a node exclusively
/// owns its children and removing it frees the whole subtree.
#[derive(Debug, Default)]
pub struct VariableTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl VariableTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a detached node and return its handle.
    pub fn insert(&mut self, mut node: VariableNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Insert `node` as the last child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, node: VariableNode) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let id = self.insert(node);
        if let Some(n) = self.get_mut(id) {
            n.parent = Some(parent);
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        Some(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&VariableNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut VariableNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(VariableNode::children).unwrap_or(&[])
    }

    /// Walk up to the top-level node owning `id`.
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.get(current)?.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    /// Replace the children of `parent` with `children`.
    ///
    /// Previous children not present in the new list are freed together
    /// with their subtrees.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let old = std::mem::replace(&mut p.children, children.clone());
        for id in old {
            if !children.contains(&id) {
                self.free_subtree(id);
            }
        }
        for id in children {
            if let Some(child) = self.get_mut(id) {
                child.parent = Some(parent);
            }
        }
    }

    /// Free every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        self.replace_children(parent, Vec::new());
    }

    /// Detach `id` from its parent and free it with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).map(|n| n.parent) else {
            return;
        };
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.retain(|c| *c != id);
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.len -= 1;
                stack.extend(node.children);
            }
        }
    }

    /// Depth-first search below (and including) `roots` for a node whose
    /// identity key equals `key`.
    pub fn find_by_key(&self, roots: &[NodeId], key: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if node.key() == key {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }
}
