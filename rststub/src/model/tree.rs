//! Arena-backed document tree.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Moving a
//! subtree only rewrites parent and child indices. Detached nodes stay in the
//! arena until the tree is dropped.

use super::node::{Node, NodeId};

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// An empty tree with a [`Node::Document`] root.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create(Node::Document);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Add a detached node.
    pub fn create(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.0].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.slots[child.0].parent = Some(parent);
        self.slots[parent.0].children.push(child);
    }

    /// Create `node` and append it to `parent`.
    pub fn append_new(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.create(node);
        self.append(parent, id);
        id
    }

    /// Move `child` to position `index` of `parent`, clamped to the end.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.slots[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.slots[child.0].parent = Some(parent);
    }

    /// Unlink `id` from its parent. The subtree below it stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id.0].parent.take() {
            self.slots[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.detach(new);
        let Some(parent) = self.parent(old) else {
            return;
        };
        let Some(index) = self.index_of(parent, old) else {
            return;
        };
        self.slots[parent.0].children[index] = new;
        self.slots[new.0].parent = Some(parent);
        self.slots[old.0].parent = None;
    }

    /// Preorder walk below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Parents of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    pub fn first_child(&self, id: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| pred(self.node(*c)))
    }

    /// Copy the subtree at `id` into a new detached subtree.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let copy = self.create(self.node(id).clone());
        for child in self.children(id).to_vec() {
            let child_copy = self.deep_copy(child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Copy the subtree at `id` of `other` into this tree, detached.
    pub fn graft(&mut self, other: &Tree, id: NodeId) -> NodeId {
        let copy = self.create(other.node(id).clone());
        for child in other.children(id) {
            let child_copy = self.graft(other, *child);
            self.append(copy, child_copy);
        }
        copy
    }
}
