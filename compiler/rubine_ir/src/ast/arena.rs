//! Flat arena for surface nodes.

use crate::{Node, NodeId, NodeKind, NodeRange, Span};

/// Arena of surface nodes plus flattened child lists.
///
/// Child lists (`NodeRange`) index into a single side vector so that
/// `NodeKind` stays `Copy`. The arena is append-only; the desugarer reads
/// each node exactly once.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    lists: Vec<NodeId>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena sized for roughly `nodes` entries.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            lists: Vec::with_capacity(nodes / 2),
        }
    }

    /// Allocate a node, returning its ID.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX - 1` nodes.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let Ok(index) = u32::try_from(self.nodes.len()) else {
            panic!("surface arena exceeded u32 capacity");
        };
        debug_assert!(index != u32::MAX, "surface arena exceeded u32 capacity");
        self.nodes.push(node);
        NodeId::new(index)
    }

    /// Allocate a node from kind and span.
    pub fn alloc_kind(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.alloc(Node::new(kind, span))
    }

    /// Allocate a child list, returning its range.
    ///
    /// # Panics
    /// Panics if the side table exceeds `u32::MAX` entries.
    pub fn alloc_list<I>(&mut self, ids: I) -> NodeRange
    where
        I: IntoIterator<Item = NodeId>,
    {
        let Ok(start) = u32::try_from(self.lists.len()) else {
            panic!("surface arena child lists exceeded u32 capacity");
        };
        self.lists.extend(ids);
        let Ok(end) = u32::try_from(self.lists.len()) else {
            panic!("surface arena child lists exceeded u32 capacity");
        };
        NodeRange::new(start, end - start)
    }

    /// Get the kind of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Get the span of a node.
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Get the IDs in a child list.
    pub fn list(&self, range: NodeRange) -> &[NodeId] {
        let start = range.start as usize;
        &self.lists[start..start + range.len()]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
