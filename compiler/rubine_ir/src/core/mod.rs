//! Core intermediate representation.
//!
//! The closed node set the desugarer lowers into: every Ruby construct is
//! expressed through these ~25 kinds. The tree is strict — exactly one owner
//! per node, no back-edges — and every node carries a span (possibly
//! zero-length for synthesized structure).
//!
//! Runtime primitives the core cannot express directly (splat expansion,
//! calls with statically-unknown arity, string interpolation, the
//! identity-style nil check behind safe navigation) are encoded as `Send`s
//! to the reserved `<Magic>` constant with reserved selectors; the reserved
//! names live in a namespace user code cannot occupy.

mod arena;
pub mod build;

pub use arena::CoreArena;

use crate::{CoreId, CoreRange, Name, PairRange, ParamRange, Span};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Core node: kind plus source span.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct CoreNode {
    pub kind: CoreKind,
    pub span: Span,
}

impl CoreNode {
    pub fn new(kind: CoreKind, span: Span) -> Self {
        CoreNode { kind, span }
    }
}

impl Hash for CoreNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.span.hash(state);
    }
}

impl fmt::Debug for CoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

/// Literal values.
///
/// Floats are stored as bits so `Lit` stays `Eq`/`Hash`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Lit {
    Nil,
    True,
    False,
    Int(i64),
    Float(u64),
    Str(Name),
    Sym(Name),
}

impl Lit {
    /// Float literal from an `f64` value.
    pub fn float(value: f64) -> Self {
        Lit::Float(value.to_bits())
    }
}

/// Which pre-resolution identifier namespace an [`CoreKind::IdentRef`] is in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IdentKind {
    /// `@a` — resolved against the enclosing class later
    Instance,
    /// `@@a`
    Class,
    /// `$a`
    Global,
}

/// Whether a [`CoreKind::ClassDef`] came from `class` or `module`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ClassKind {
    Class,
    Module,
}

/// Formal parameter kinds on methods and blocks.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParamKind {
    Required,
    Optional,
    Rest,
    Keyword,
    KeywordOptional,
    KwRest,
    Block,
    Shadow,
}

/// One formal parameter.
///
/// `default` is a lowered expression for `Optional`/`KeywordOptional`, and
/// `CoreId::INVALID` otherwise.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CoreParam {
    pub kind: ParamKind,
    pub name: Name,
    pub default: CoreId,
}

impl CoreParam {
    /// Parameter with no default.
    pub fn plain(kind: ParamKind, name: Name) -> Self {
        CoreParam {
            kind,
            name,
            default: CoreId::INVALID,
        }
    }
}

/// One key/value entry of a [`CoreKind::HashLit`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CorePair {
    pub key: CoreId,
    pub value: CoreId,
}

/// Core IR variants.
///
/// Optional children are `CoreId::INVALID`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CoreKind {
    /// Literal value
    Lit(Lit),
    /// Local variable read
    LocalRef(Name),
    /// Local variable write — value INVALID when the node is a bare
    /// assignment target (rescue binders, destructuring intermediates)
    LocalAsgn { name: Name, value: CoreId },
    /// Unresolved instance/class/global variable read
    IdentRef { kind: IdentKind, name: Name },
    /// Unresolved instance/class/global variable write
    IdentAsgn { kind: IdentKind, name: Name, value: CoreId },
    /// Unresolved constant read — scope INVALID means lexical scope
    ConstRef { scope: CoreId, name: Name },
    /// Constant definition
    ConstAsgn { scope: CoreId, name: Name, value: CoreId },
    /// Message send. `recv` INVALID = private self call. `kwargs` is an
    /// inlined trailing keyword `HashLit` or INVALID. `block` is a
    /// `BlockFn` or INVALID.
    Send {
        recv: CoreId,
        selector: Name,
        args: CoreRange,
        kwargs: CoreId,
        block: CoreId,
    },
    /// Block literal attached to a send
    BlockFn { params: ParamRange, body: CoreId },
    /// Two-way conditional — either branch may be INVALID (lowered to nil
    /// by evaluation, kept INVALID here to preserve "no branch written")
    If { cond: CoreId, then_: CoreId, else_: CoreId },
    /// Pre-condition loop
    While { cond: CoreId, body: CoreId },
    /// Instruction sequence: ordered statements plus the value-producing
    /// final expression — the core's only way to sequence side effects
    Seq { stmts: CoreRange, result: CoreId },
    /// Array literal of already-lowered elements (no splats)
    ArrayLit(CoreRange),
    /// Hash literal of already-lowered pairs (no double-splats)
    HashLit(PairRange),
    /// Exception handling region
    Rescue {
        body: CoreId,
        cases: CoreRange,
        else_: CoreId,
        ensure_: CoreId,
    },
    /// One rescue clause: exception types, a binder target, and a handler
    RescueCase {
        exceptions: CoreRange,
        binder: CoreId,
        body: CoreId,
    },
    /// `return [value]`
    Return { value: CoreId },
    /// `break [value]`
    Break { value: CoreId },
    /// `next [value]`
    Next { value: CoreId },
    /// `retry`
    Retry,
    /// Method definition — `self_method` for `def self.name`
    MethodDef {
        name: Name,
        self_method: bool,
        params: ParamRange,
        body: CoreId,
    },
    /// Class or module definition — `name` is a `ConstRef` (or a fresh
    /// local for singleton classes), body is a statement list
    ClassDef {
        kind: ClassKind,
        name: CoreId,
        superclass: CoreId,
        body: CoreRange,
    },
    /// No-op sentinel, also the placeholder for unsupported constructs
    EmptyTree,
}
