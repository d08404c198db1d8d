//! Surface syntax tree.
//!
//! One node kind per Ruby grammar production, as handed over by the parser.
//! Children are `NodeId`/`NodeRange` indices into a [`NodeArena`], never
//! boxes, so `NodeKind` stays `Copy` and the desugarer can copy a kind out
//! of the arena without holding a borrow across recursion.
//!
//! The parser guarantees shape invariants the desugarer relies on: parameter
//! lists contain only parameter kinds, `Pair`/`KwSplat` appear only inside
//! `Hash`, `BlockPass` only in call argument lists, and every node span is
//! non-empty unless the node is synthetic.

mod arena;

pub use arena::NodeArena;

use crate::{Name, NodeId, NodeRange, Span};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Surface node: one grammar production plus its source span.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }
}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.span.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}", self.kind, self.span)
    }
}

/// Surface node variants, one per grammar production.
///
/// Optional children are `NodeId::INVALID`; absent names are `Name::EMPTY`
/// (anonymous rest/kwrest/block parameters). Numeric literal *text* is
/// carried as an interned string and parsed during lowering, so malformed
/// literals surface as desugar diagnostics rather than parser failures.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NodeKind {
    // Literals
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `self`
    SelfRef,
    /// Integer literal, raw text: `42`, `1_000`, `0x1f`
    Integer(Name),
    /// Float literal, raw text: `3.14`, `2.5e-8`
    Float(Name),
    /// Plain string literal (already unescaped by the parser)
    Str(Name),
    /// Symbol literal: `:foo`
    Sym(Name),
    /// Interpolated string: `"a#{b}c"` — parts are `Str` or expression nodes
    DStr { parts: NodeRange },
    /// Interpolated symbol: `:"a#{b}"`
    DSym { parts: NodeRange },
    /// Backtick command string: `` `ls #{dir}` ``
    XStr { parts: NodeRange },
    /// Regexp literal: `/a#{b}/i` — opts is the raw flags text
    Regexp { parts: NodeRange, opts: Name },
    /// Inclusive range literal: `a..b` (either end may be absent)
    IRange { from: NodeId, to: NodeId },
    /// Exclusive range literal: `a...b`
    ERange { from: NodeId, to: NodeId },
    /// `__FILE__`
    FileLiteral,
    /// `__LINE__`
    LineLiteral,
    /// `__ENCODING__`
    EncodingLiteral,

    // Variables
    /// Local variable read
    LocalRef(Name),
    /// Instance variable read: `@a`
    InstanceRef(Name),
    /// Class variable read: `@@a`
    ClassRef(Name),
    /// Global variable read: `$a`
    GlobalRef(Name),
    /// Regexp capture reference: `$1` .. `$9`
    NthRef(u8),
    /// Regexp back-reference: `` $` ``, `$&`, `$'`, `$+`
    BackRef(Name),
    /// Constant read, possibly scoped: `A`, `A::B`, `::A`
    Const { scope: NodeId, name: Name },
    /// The `::` root scope marker in `::A`
    Cbase,

    // Assignment
    /// `x = v` — value INVALID when used as a bare destructuring target
    LocalAsgn { name: Name, value: NodeId },
    /// `@x = v`
    InstanceAsgn { name: Name, value: NodeId },
    /// `@@x = v`
    ClassAsgn { name: Name, value: NodeId },
    /// `$x = v`
    GlobalAsgn { name: Name, value: NodeId },
    /// `A = v`, `A::B = v`
    ConstAsgn { scope: NodeId, name: Name, value: NodeId },
    /// Destructuring assignment: `a, *b, c = rhs` — lhs is an `Mlhs`
    Masgn { lhs: NodeId, rhs: NodeId },
    /// Left-hand target list of a destructuring assignment
    Mlhs { targets: NodeRange },
    /// `target op= v` for a binary operator `op`
    OpAsgn { target: NodeId, op: Name, value: NodeId },
    /// `target &&= v`
    AndAsgn { target: NodeId, value: NodeId },
    /// `target ||= v`
    OrAsgn { target: NodeId, value: NodeId },

    // Message sends and blocks
    /// `recv.sel(args)` — recv INVALID for a self call
    Send { recv: NodeId, selector: Name, args: NodeRange },
    /// Safe navigation: `recv&.sel(args)`
    CSend { recv: NodeId, selector: Name, args: NodeRange },
    /// `call { |params| body }` — params is `Params`, `NumParams`, or INVALID
    Block { call: NodeId, params: NodeId, body: NodeId },
    /// Numbered block parameters: `max` is the highest `_N` referenced
    NumParams { max: u8 },
    /// `&value` in an argument list — value INVALID for anonymous `&`
    BlockPass { value: NodeId },
    /// `*value` — value INVALID for a bare `*` destructuring target
    Splat { value: NodeId },
    /// `**value` in a hash or argument list
    KwSplat { value: NodeId },
    /// `...` at a call site
    ForwardedArgs,
    /// Anonymous `*` at a call site (forwarding an anonymous rest)
    ForwardedRest,
    /// Anonymous `**` at a call site
    ForwardedKwRest,

    // Formal parameters
    /// Parameter list of a `def` or block
    Params { list: NodeRange },
    /// `def f(a)`
    RequiredParam(Name),
    /// `def f(a = expr)`
    OptParam { name: Name, default: NodeId },
    /// `def f(*a)` — name EMPTY for anonymous `*`
    RestParam { name: Name },
    /// `def f(a:)`
    KwParam(Name),
    /// `def f(a: expr)`
    KwOptParam { name: Name, default: NodeId },
    /// `def f(**a)` — name EMPTY for anonymous `**`
    KwRestParam { name: Name },
    /// `def f(&a)` — name EMPTY for anonymous `&`
    BlockParam { name: Name },
    /// Block-local variable: `{ |a; b| }`
    ShadowParam(Name),
    /// `def f(...)`
    ForwardParam,

    // Control flow
    /// `a && b`
    And { left: NodeId, right: NodeId },
    /// `a || b`
    Or { left: NodeId, right: NodeId },
    /// `!a`, `not a`
    Not { value: NodeId },
    /// `if`/`unless`/ternary, already normalized by the parser
    If { cond: NodeId, then_: NodeId, else_: NodeId },
    /// `case scrutinee when ... end` — scrutinee INVALID for caseless form
    Case { scrutinee: NodeId, whens: NodeRange, else_: NodeId },
    /// One `when patterns then body` clause
    When { patterns: NodeRange, body: NodeId },
    /// `case ... in ...` pattern matching
    CaseMatch { scrutinee: NodeId, in_bodies: NodeRange, else_: NodeId },
    /// One `in pattern [if guard] then body` clause
    InPattern { pattern: NodeId, guard: NodeId, body: NodeId },
    /// `while cond; body; end`
    While { cond: NodeId, body: NodeId },
    /// `begin body end while cond` — body runs at least once
    WhilePost { cond: NodeId, body: NodeId },
    /// `until cond; body; end`
    Until { cond: NodeId, body: NodeId },
    /// `begin body end until cond`
    UntilPost { cond: NodeId, body: NodeId },
    /// `for var in collection; body; end`
    For { var: NodeId, collection: NodeId, body: NodeId },
    /// `break [args]`
    Break { args: NodeRange },
    /// `next [args]`
    Next { args: NodeRange },
    /// `return [args]`
    Return { args: NodeRange },
    /// `retry`
    Retry,
    /// `redo`
    Redo,
    /// `yield [args]`
    Yield { args: NodeRange },
    /// `super(args)`
    Super { args: NodeRange },
    /// Bare `super` (forwards the enclosing method's arguments)
    ZSuper,
    /// `defined?(value)`
    Defined { value: NodeId },

    // Definitions
    /// `def name(params) body end`
    Def { name: Name, params: NodeId, body: NodeId },
    /// `def definee.name(params) body end`
    DefS { definee: NodeId, name: Name, params: NodeId, body: NodeId },
    /// `class Name < Superclass; body; end`
    Class { name: NodeId, superclass: NodeId, body: NodeId },
    /// `class << expr; body; end`
    SClass { expr: NodeId, body: NodeId },
    /// `module Name; body; end`
    Module { name: NodeId, body: NodeId },
    /// `alias to from`
    Alias { to: NodeId, from: NodeId },
    /// `undef a, b`
    Undef { names: NodeRange },

    // Collections
    /// `[a, *b, c]`
    Array { elements: NodeRange },
    /// `{k => v, **h}` — `braces: false` for trailing keyword-argument syntax
    Hash { pairs: NodeRange, braces: bool },
    /// One `key => value` / `key: value` entry
    Pair { key: NodeId, value: NodeId },

    // Sequencing and exceptions
    /// Parenthesized or implicit statement sequence
    Begin { stmts: NodeRange },
    /// `begin ... end` (keyword form)
    KwBegin { stmts: NodeRange },
    /// `body rescue-clauses [else]` — cases are `Resbody` nodes
    Rescue { body: NodeId, cases: NodeRange, else_: NodeId },
    /// One `rescue ExcType => binder; body` clause — binder is an
    /// assignment-target node with INVALID value, or INVALID if unbound
    Resbody { exceptions: NodeRange, binder: NodeId, body: NodeId },
    /// `body ensure ensure-body end`
    Ensure { body: NodeId, ensure_: NodeId },
    /// `BEGIN { body }`
    PreExe { body: NodeId },
    /// `END { body }`
    PostExe { body: NodeId },
}
