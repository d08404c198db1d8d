//! Duplicate-key tracking for hash literals and keyword-argument lists.
//!
//! One tracker lives for exactly one literal. Symbol keys and string keys
//! occupy independent namespaces: `{a: 1, "a" => 2}` is not a duplicate.

use rubine_ir::{Name, Span};
use rustc_hash::FxHashMap;

#[derive(Default)]
pub(crate) struct DupKeyTracker {
    syms: FxHashMap<Name, Span>,
    strs: FxHashMap<Name, Span>,
}

impl DupKeyTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a symbol key; returns the first occurrence's span if this one
    /// is a duplicate.
    pub(crate) fn record_sym(&mut self, name: Name, span: Span) -> Option<Span> {
        match self.syms.get(&name) {
            Some(&first) => Some(first),
            None => {
                self.syms.insert(name, span);
                None
            }
        }
    }

    /// Record a string key; same contract as [`Self::record_sym`].
    pub(crate) fn record_str(&mut self, name: Name, span: Span) -> Option<Span> {
        match self.strs.get(&name) {
            Some(&first) => Some(first),
            None => {
                self.strs.insert(name, span);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_symbol_reports_first_span() {
        let mut tracker = DupKeyTracker::new();
        let key = Name::new(0, 5);
        assert_eq!(tracker.record_sym(key, Span::new(0, 2)), None);
        assert_eq!(tracker.record_sym(key, Span::new(10, 12)), Some(Span::new(0, 2)));
    }

    #[test]
    fn symbol_and_string_namespaces_are_independent() {
        let mut tracker = DupKeyTracker::new();
        let key = Name::new(0, 5);
        assert_eq!(tracker.record_sym(key, Span::new(0, 2)), None);
        assert_eq!(tracker.record_str(key, Span::new(4, 6)), None);
        assert_eq!(tracker.record_str(key, Span::new(8, 10)), Some(Span::new(4, 6)));
    }
}
