//! Rubine IR - Tree Representations for the Ruby Front End
//!
//! This crate contains the data structures shared across the Rubine front
//! end:
//! - Spans for source locations
//! - Names for interned identifiers, plus the sharded string interner
//! - The surface syntax tree handed over by the parser
//! - The core intermediate representation the desugarer lowers into
//! - Arena allocation for both trees
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → Name(u32)
//! - **Flatten Everything**: No `Box<Node>`, use `NodeId(u32)`/`CoreId(u32)`
//!   indices into append-only arenas
//!
//! Both node-kind enums are `Copy` so the desugarer can copy a kind out of
//! the arena and recurse without holding a borrow. Floats are stored as u64
//! bits for Hash compatibility.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
pub mod core;
mod ids;
mod interner;
mod name;
mod span;

pub use ast::{Node, NodeArena, NodeKind};
pub use self::core::{
    build,
    ClassKind,
    CoreArena,
    CoreKind,
    CoreNode,
    CorePair,
    CoreParam,
    IdentKind,
    Lit,
    ParamKind,
};
pub use ids::{CoreId, CoreRange, NodeId, NodeRange, PairRange, ParamRange};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::{Span, SpanError};

// IDs are embedded in every node; keep them at a single word.
static_assert_size!(NodeId, 4);
static_assert_size!(CoreId, 4);
static_assert_size!(Name, 4);
static_assert_size!(Span, 8);
