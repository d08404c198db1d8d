//! Arena indices and ranges for the flat surface and core trees.
//!
//! Both trees use `u32` indices instead of boxed children: 4 bytes per edge,
//! O(1) equality, and contiguous storage. `INVALID` (`u32::MAX`) is the
//! sentinel for optional children (no else branch, no receiver, ...).

use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Invalid ID (sentinel for optional children).
            pub const INVALID: $name = $name(u32::MAX);

            /// Create a new ID.
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Get the index into the arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Get the raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Check if this is a valid ID.
            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                } else {
                    write!(f, concat!(stringify!($name), "::INVALID"))
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    };
}

arena_id! {
    /// Index into the surface node arena.
    NodeId
}

arena_id! {
    /// Index into the core IR arena.
    CoreId
}

macro_rules! arena_range {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        #[repr(C)]
        pub struct $name {
            pub start: u32,
            pub len: u32,
        }

        impl $name {
            /// Empty range.
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            /// Create a new range.
            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $name { start, len }
            }

            /// Number of elements in the range.
            #[inline]
            pub const fn len(self) -> usize {
                self.len as usize
            }

            /// Check if the range is empty.
            #[inline]
            pub const fn is_empty(self) -> bool {
                self.len == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}..{})"),
                    self.start,
                    self.start + self.len
                )
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::EMPTY
            }
        }
    };
}

arena_range! {
    /// Range of surface nodes in the arena's flattened child lists.
    NodeRange
}

arena_range! {
    /// Range of core nodes in the arena's flattened child lists.
    CoreRange
}

arena_range! {
    /// Range of formal parameters in the core arena's param table.
    ParamRange
}

arena_range! {
    /// Range of key/value pairs in the core arena's pair table.
    PairRange
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_sentinel() {
        assert!(!NodeId::INVALID.is_valid());
        assert!(NodeId::new(0).is_valid());
        assert_eq!(CoreId::default(), CoreId::INVALID);
    }

    #[test]
    fn range_len() {
        let r = CoreRange::new(4, 3);
        assert_eq!(r.len(), 3);
        assert!(!r.is_empty());
        assert!(NodeRange::EMPTY.is_empty());
    }
}
