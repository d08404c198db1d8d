//! Flat arena for core IR nodes.

use crate::{CoreId, CoreKind, CoreNode, CorePair, CoreParam, CoreRange, PairRange, ParamRange,
            Span};

/// Arena of core nodes plus side tables for child lists, formal parameters,
/// and hash pairs.
#[derive(Debug, Default)]
pub struct CoreArena {
    nodes: Vec<CoreNode>,
    lists: Vec<CoreId>,
    params: Vec<CoreParam>,
    pairs: Vec<CorePair>,
}

impl CoreArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena sized for roughly `nodes` entries.
    ///
    /// Desugaring grows the tree; callers typically pass the surface node
    /// count plus headroom.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            lists: Vec::with_capacity(nodes / 2),
            params: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Push a node, returning its ID.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX - 1` nodes.
    pub fn push(&mut self, kind: CoreKind, span: Span) -> CoreId {
        let Ok(index) = u32::try_from(self.nodes.len()) else {
            panic!("core arena exceeded u32 capacity");
        };
        debug_assert!(index != u32::MAX, "core arena exceeded u32 capacity");
        self.nodes.push(CoreNode::new(kind, span));
        CoreId::new(index)
    }

    /// Allocate a child list.
    ///
    /// # Panics
    /// Panics if the side table exceeds `u32::MAX` entries.
    pub fn alloc_list<I>(&mut self, ids: I) -> CoreRange
    where
        I: IntoIterator<Item = CoreId>,
    {
        let Ok(start) = u32::try_from(self.lists.len()) else {
            panic!("core arena child lists exceeded u32 capacity");
        };
        self.lists.extend(ids);
        let Ok(end) = u32::try_from(self.lists.len()) else {
            panic!("core arena child lists exceeded u32 capacity");
        };
        CoreRange::new(start, end - start)
    }

    /// Allocate a formal-parameter list.
    ///
    /// # Panics
    /// Panics if the side table exceeds `u32::MAX` entries.
    pub fn alloc_params<I>(&mut self, items: I) -> ParamRange
    where
        I: IntoIterator<Item = CoreParam>,
    {
        let Ok(start) = u32::try_from(self.params.len()) else {
            panic!("core arena param table exceeded u32 capacity");
        };
        self.params.extend(items);
        let Ok(end) = u32::try_from(self.params.len()) else {
            panic!("core arena param table exceeded u32 capacity");
        };
        ParamRange::new(start, end - start)
    }

    /// Allocate a hash-pair list.
    ///
    /// # Panics
    /// Panics if the side table exceeds `u32::MAX` entries.
    pub fn alloc_pairs<I>(&mut self, items: I) -> PairRange
    where
        I: IntoIterator<Item = CorePair>,
    {
        let Ok(start) = u32::try_from(self.pairs.len()) else {
            panic!("core arena pair table exceeded u32 capacity");
        };
        self.pairs.extend(items);
        let Ok(end) = u32::try_from(self.pairs.len()) else {
            panic!("core arena pair table exceeded u32 capacity");
        };
        PairRange::new(start, end - start)
    }

    /// Get the kind of a node.
    pub fn kind(&self, id: CoreId) -> &CoreKind {
        &self.nodes[id.index()].kind
    }

    /// Get the span of a node.
    pub fn span(&self, id: CoreId) -> Span {
        self.nodes[id.index()].span
    }

    /// Get the IDs in a child list.
    pub fn list(&self, range: CoreRange) -> &[CoreId] {
        let start = range.start as usize;
        &self.lists[start..start + range.len()]
    }

    /// Get the parameters in a range.
    pub fn params(&self, range: ParamRange) -> &[CoreParam] {
        let start = range.start as usize;
        &self.params[start..start + range.len()]
    }

    /// Get the pairs in a range.
    pub fn pairs(&self, range: PairRange) -> &[CorePair] {
        let start = range.start as usize;
        &self.pairs[start..start + range.len()]
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lit, ParamKind};
    use crate::Name;

    #[test]
    fn push_and_read_back() {
        let mut arena = CoreArena::new();
        let id = arena.push(CoreKind::Lit(Lit::Int(42)), Span::new(0, 2));
        assert_eq!(*arena.kind(id), CoreKind::Lit(Lit::Int(42)));
        assert_eq!(arena.span(id), Span::new(0, 2));
    }

    #[test]
    fn param_table_round_trip() {
        let mut arena = CoreArena::new();
        let name = Name::new(0, 3);
        let range = arena.alloc_params([CoreParam::plain(ParamKind::Required, name)]);
        assert_eq!(arena.params(range).len(), 1);
        assert_eq!(arena.params(range)[0].kind, ParamKind::Required);
    }

    #[test]
    fn pair_table_round_trip() {
        let mut arena = CoreArena::new();
        let k = arena.push(CoreKind::Lit(Lit::Sym(Name::EMPTY)), Span::DUMMY);
        let v = arena.push(CoreKind::Lit(Lit::Int(1)), Span::DUMMY);
        let range = arena.alloc_pairs([CorePair { key: k, value: v }]);
        assert_eq!(arena.pairs(range), &[CorePair { key: k, value: v }]);
    }
}
