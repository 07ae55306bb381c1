//! Node arena: owns every [`Node`], keyed by [`NodeId`] (design notes §9).

use crate::error::{CoreError, CoreResult};
use crate::scene::dirty::DirtyBits;
use crate::scene::events::NodeEvent;
use crate::scene::node::{Node, NodeId};
use slotmap::SlotMap;

pub struct Arena {
    nodes: SlotMap<NodeId, Node>,
    pub root: NodeId,
}

impl Arena {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root_id = nodes.insert_with_key(Node::new);
        Self {
            nodes,
            root: root_id,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Creates a node as a child of `parent`, returning its id.
    pub fn create_node(&mut self, parent: NodeId) -> CoreResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(CoreError::InvalidTree(
                "parent node does not exist".into(),
            ));
        }
        let id = self.nodes.insert_with_key(Node::new);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        self.nodes[parent].dirty |= DirtyBits::CHILDREN;
        Ok(id)
    }

    /// `node` may not become its own ancestor; rejected with `InvalidTree`
    /// per spec §4.1 failure semantics.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> CoreResult<()> {
        if node == self.root {
            return Err(CoreError::InvalidTree("cannot reparent the root".into()));
        }
        if !self.nodes.contains_key(node) || !self.nodes.contains_key(new_parent) {
            return Err(CoreError::InvalidTree("node does not exist".into()));
        }
        if node == new_parent || self.is_ancestor(node, new_parent) {
            return Err(CoreError::InvalidTree(
                "reparenting would create a cycle".into(),
            ));
        }

        if let Some(old_parent) = self.nodes[node].parent {
            self.nodes[old_parent].children.retain(|&c| c != node);
            self.nodes[old_parent].dirty |= DirtyBits::CHILDREN;
        }
        self.nodes[node].parent = Some(new_parent);
        self.nodes[new_parent].children.push(node);
        self.nodes[new_parent].dirty |= DirtyBits::CHILDREN;
        self.nodes[node].dirty |= DirtyBits::TRANSFORM
            | DirtyBits::WORLD_ALPHA
            | DirtyBits::WORLD_COLOR
            | DirtyBits::CLIPPING
            | DirtyBits::RENDER_BOUNDS;
        Ok(())
    }

    /// True if `ancestor_candidate` is `descendant`'s ancestor (or itself).
    fn is_ancestor(&self, ancestor_candidate: NodeId, descendant: NodeId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor_candidate {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Destroys `node` and its subtree transitively. Snapshotting children
    /// before recursing keeps this safe even if a `beforeDestroy` listener
    /// mutates the tree (spec §4.1 "destroying a node during iteration is
    /// safe").
    pub fn destroy(&mut self, node: NodeId) -> Vec<NodeId> {
        let parent = self.nodes.get(node).and_then(|n| n.parent);
        let mut destroyed = Vec::new();
        self.destroy_inner(node, &mut destroyed);
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.dirty |= DirtyBits::CHILDREN;
        }
        destroyed
    }

    fn destroy_inner(&mut self, node: NodeId, destroyed: &mut Vec<NodeId>) {
        let Some(children) = self.nodes.get(node).map(|n| n.children.clone()) else {
            return;
        };
        for child in children {
            self.destroy_inner(child, destroyed);
        }

        if let Some(n) = self.nodes.get_mut(node) {
            n.events.emit(&NodeEvent::BeforeDestroy);
            n.destroyed = true;
            if let Some(parent) = n.parent {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.retain(|&c| c != node);
                }
            }
        }
        self.nodes.remove(node);
        destroyed.push(node);
    }

    /// Depth-first pre-order traversal starting at `root`, snapshotting each
    /// node's children before visiting them so destruction mid-walk cannot
    /// invalidate the iterator.
    pub fn traverse_preorder(&self, root: NodeId, mut visit: impl FnMut(NodeId)) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.nodes.contains_key(id) {
                continue;
            }
            visit(id);
            let children: Vec<NodeId> = self.nodes[id].children.clone();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_node_attaches_to_parent_children() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        assert_eq!(arena.get(arena.root).unwrap().children, vec![child]);
        assert_eq!(arena.get(child).unwrap().parent, Some(arena.root));
    }

    #[test]
    fn reparent_to_self_is_rejected() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        let result = arena.reparent(child, child);
        assert!(matches!(result, Err(CoreError::InvalidTree(_))));
    }

    #[test]
    fn reparent_to_descendant_is_rejected() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        let grandchild = arena.create_node(child).unwrap();
        let result = arena.reparent(child, grandchild);
        assert!(matches!(result, Err(CoreError::InvalidTree(_))));
    }

    #[test]
    fn destroy_removes_subtree_transitively() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        let grandchild = arena.create_node(child).unwrap();
        let destroyed = arena.destroy(child);
        assert_eq!(destroyed.len(), 2);
        assert!(!arena.contains(child));
        assert!(!arena.contains(grandchild));
        assert!(arena.get(arena.root).unwrap().children.is_empty());
    }

    #[test]
    fn traverse_preorder_visits_parent_before_children() {
        let mut arena = Arena::new();
        let child = arena.create_node(arena.root).unwrap();
        let grandchild = arena.create_node(child).unwrap();
        let mut order = Vec::new();
        arena.traverse_preorder(arena.root, |id| order.push(id));
        assert_eq!(order, vec![arena.root, child, grandchild]);
    }

    #[test]
    fn destroy_during_traversal_is_safe() {
        let mut arena = Arena::new();
        let a = arena.create_node(arena.root).unwrap();
        let _b = arena.create_node(arena.root).unwrap();
        let mut order = Vec::new();
        let snapshot: Vec<NodeId> = arena.get(arena.root).unwrap().children.clone();
        for id in snapshot {
            order.push(id);
        }
        arena.destroy(a);
        // The snapshot taken above is still valid to have iterated even
        // though `a` no longer exists now.
        assert_eq!(order.len(), 2);
        assert!(!arena.contains(a));
    }
}
