//! Surface → core lowering.
//!
//! The [`Lowerer`] owns the target arena and the diagnostic queue; one
//! instance lowers exactly one compilation unit. Rule families live in
//! sibling modules:
//! - `expr` — the exhaustive dispatch over `NodeKind`
//! - `assign` — plain/multiple/op-assign forms
//! - `control` — boolean operators, conditionals, `case`, loops, jumps
//! - `calls` — sends, argument lists, blocks, parameters
//! - `collections` — array/hash literals, interpolation, ranges
//! - `exceptions` — `rescue`/`ensure`/`retry`
//! - `defs` — method, class, module, and singleton definitions

mod assign;
mod calls;
mod collections;
mod control;
mod defs;
mod exceptions;
mod expr;

#[cfg(test)]
mod tests;

use rubine_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use rubine_ir::{build, CoreArena, CoreId, CoreKind, Name, NodeArena, Span,
                StringInterner};

use crate::InternalError;

/// Maximum surface-tree nesting depth before lowering substitutes a
/// placeholder instead of recursing further. Prevents stack overflow on
/// pathological input; deeper trees get a recoverable `E4010` diagnostic.
pub const MAX_DEPTH: u32 = 4096;

/// Per-call lowering context.
///
/// Immutable during recursion; a rule that changes the context (entering a
/// method, block, or module body) passes an adjusted copy downward.
#[derive(Copy, Clone)]
pub(crate) struct Ctx {
    /// Enclosing method name, `Name::EMPTY` at the top level.
    pub(crate) method_name: Name,
    /// Declaration span of the enclosing method.
    pub(crate) method_span: Span,
    /// Enclosing method's explicit block parameter. `Name::EMPTY` when the
    /// method declares none (the implicit `<blk>` still exists) and outside
    /// any method.
    pub(crate) block_param: Name,
    /// Inside a block literal. Changes the legality of anonymous rest
    /// parameters and switches bare `super` to the untyped form.
    pub(crate) in_block: bool,
    /// Inside a module body rather than a method. Changes how bare `super`
    /// is lowered.
    pub(crate) in_module_body: bool,
    /// Lower `&&`/`||`/op-assign to marker calls instead of expanding them.
    pub(crate) preserve_concrete_syntax: bool,
}

impl Ctx {
    pub(crate) fn top_level(preserve_concrete_syntax: bool) -> Self {
        Ctx {
            method_name: Name::EMPTY,
            method_span: Span::DUMMY,
            block_param: Name::EMPTY,
            in_block: false,
            in_module_body: false,
            preserve_concrete_syntax,
        }
    }
}

/// State for the surface-to-core lowering pass.
///
/// Holds the read-only source arena and interner, and owns the core arena
/// and diagnostic queue being built. The fresh-name counter and depth guard
/// live here rather than on [`Ctx`] because they are genuinely mutable.
pub(crate) struct Lowerer<'a> {
    /// Source arena (read-only).
    pub(crate) src: &'a NodeArena,
    /// Shared string interner; the only cross-unit shared state.
    pub(crate) interner: &'a StringInterner,
    /// Target core arena (being built).
    pub(crate) arena: CoreArena,
    /// Recoverable problems found so far.
    pub(crate) diagnostics: DiagnosticQueue,
    /// First fatal invariant violation, surfaced as `Err` by the driver.
    pub(crate) internal: Option<InternalError>,
    /// Sequence for hygienic names. Saved and reset at method and class
    /// boundaries so generated names stay short and deterministic.
    pub(crate) fresh_seq: u32,
    /// Current recursion depth, bounded by [`MAX_DEPTH`].
    pub(crate) depth: u32,

    // Reserved names. `<` cannot appear in a user identifier, so none of
    // these can collide with user code.
    pub(crate) name_magic: Name,
    pub(crate) name_root: Name,
    pub(crate) name_self: Name,
    pub(crate) name_blk: Name,
    pub(crate) name_singleton: Name,
    pub(crate) name_rest: Name,
    pub(crate) name_kwrest: Name,
    pub(crate) name_fwd_args: Name,
    pub(crate) name_fwd_kwargs: Name,
    pub(crate) name_fwd_block: Name,
    pub(crate) name_super: Name,
    pub(crate) name_zsuper: Name,
    pub(crate) name_zsuper_untyped: Name,
    pub(crate) name_backtick: Name,

    // Reserved selectors on `<Magic>`.
    pub(crate) sel_expand_splat: Name,
    pub(crate) sel_call_with_splat: Name,
    pub(crate) sel_call_with_block: Name,
    pub(crate) sel_call_with_splat_and_block: Name,
    pub(crate) sel_string_interpolate: Name,
    pub(crate) sel_nil_p: Name,
    pub(crate) sel_check_match_array: Name,
    pub(crate) sel_defined: Name,
    pub(crate) sel_build_range: Name,
    pub(crate) sel_regexp_new: Name,
    pub(crate) sel_splat: Name,
    pub(crate) sel_to_hash_dup: Name,
    pub(crate) sel_to_hash_nodup: Name,
    pub(crate) sel_merge_hash: Name,
    pub(crate) sel_and: Name,
    pub(crate) sel_or: Name,
    pub(crate) sel_op_asgn: Name,
    pub(crate) sel_and_asgn: Name,
    pub(crate) sel_or_asgn: Name,
    pub(crate) sel_suggest_constant: Name,

    // Pre-interned ordinary selectors.
    pub(crate) name_call: Name,
    pub(crate) name_any: Name,
    pub(crate) name_each: Name,
    pub(crate) name_concat: Name,
    pub(crate) name_bang: Name,
    pub(crate) name_case_eq: Name,
    pub(crate) name_index: Name,
    pub(crate) name_index_asgn: Name,
    pub(crate) name_intern: Name,
    pub(crate) name_alias_method: Name,
    pub(crate) name_undef_method: Name,
}

impl<'a> Lowerer<'a> {
    pub(crate) fn new(src: &'a NodeArena, interner: &'a StringInterner) -> Self {
        // Desugaring grows the tree; reserve the surface count plus headroom.
        let estimated = src.len() + src.len() / 4;

        Self {
            src,
            interner,
            arena: CoreArena::with_capacity(estimated),
            diagnostics: DiagnosticQueue::new(),
            internal: None,
            fresh_seq: 0,
            depth: 0,

            name_magic: interner.intern("<Magic>"),
            name_root: interner.intern("<root>"),
            name_self: interner.intern("<self>"),
            name_blk: interner.intern("<blk>"),
            name_singleton: interner.intern("<singleton>"),
            name_rest: interner.intern("<rest>"),
            name_kwrest: interner.intern("<kwrest>"),
            name_fwd_args: interner.intern("<fwd-args>"),
            name_fwd_kwargs: interner.intern("<fwd-kwargs>"),
            name_fwd_block: interner.intern("<fwd-block>"),
            name_super: interner.intern("<super>"),
            name_zsuper: interner.intern("<zsuper>"),
            name_zsuper_untyped: interner.intern("<zsuper-untyped>"),
            name_backtick: interner.intern("<backtick>"),

            sel_expand_splat: interner.intern("<expand-splat>"),
            sel_call_with_splat: interner.intern("<call-with-splat>"),
            sel_call_with_block: interner.intern("<call-with-block>"),
            sel_call_with_splat_and_block: interner.intern("<call-with-splat-and-block>"),
            sel_string_interpolate: interner.intern("<string-interpolate>"),
            sel_nil_p: interner.intern("<nil-p>"),
            sel_check_match_array: interner.intern("<check-match-array>"),
            sel_defined: interner.intern("<defined?>"),
            sel_build_range: interner.intern("<build-range>"),
            sel_regexp_new: interner.intern("<regexp-new>"),
            sel_splat: interner.intern("<splat>"),
            sel_to_hash_dup: interner.intern("<to-hash-dup>"),
            sel_to_hash_nodup: interner.intern("<to-hash-nodup>"),
            sel_merge_hash: interner.intern("<merge-hash>"),
            sel_and: interner.intern("<and>"),
            sel_or: interner.intern("<or>"),
            sel_op_asgn: interner.intern("<op-asgn>"),
            sel_and_asgn: interner.intern("<and-asgn>"),
            sel_or_asgn: interner.intern("<or-asgn>"),
            sel_suggest_constant: interner.intern("<suggest-constant>"),

            name_call: interner.intern("call"),
            name_any: interner.intern("any?"),
            name_each: interner.intern("each"),
            name_concat: interner.intern("concat"),
            name_bang: interner.intern("!"),
            name_case_eq: interner.intern("==="),
            name_index: interner.intern("[]"),
            name_index_asgn: interner.intern("[]="),
            name_intern: interner.intern("intern"),
            name_alias_method: interner.intern("alias_method"),
            name_undef_method: interner.intern("undef_method"),
        }
    }

    /// Push a core node into the arena.
    pub(crate) fn push(&mut self, kind: CoreKind, span: Span) -> CoreId {
        self.arena.push(kind, span)
    }

    /// Mint a hygienic temporary, anchored to the enclosing method name for
    /// readable generated output.
    pub(crate) fn fresh(&mut self, purpose: &str, ctx: Ctx) -> Name {
        let base = if ctx.method_name == Name::EMPTY {
            self.name_root
        } else {
            ctx.method_name
        };
        let seq = self.fresh_seq;
        self.fresh_seq += 1;
        self.interner.fresh(purpose, base, seq)
    }

    /// Report a recoverable diagnostic.
    pub(crate) fn report(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    /// Placeholder path: report an unsupported construct and substitute an
    /// empty node so the rest of the unit still lowers.
    pub(crate) fn unsupported(&mut self, span: Span, what: &'static str) -> CoreId {
        tracing::trace!(?span, what, "unsupported construct");
        self.report(
            Diagnostic::error(ErrorCode::E4001)
                .with_message(format!("unsupported construct: {what}"))
                .with_label(span, "this construct is not lowered"),
        );
        build::empty(&mut self.arena, span)
    }

    /// Record a fatal invariant violation and substitute a placeholder.
    ///
    /// Only the first failure is kept; the driver turns it into `Err` once
    /// the unit finishes (or is abandoned).
    pub(crate) fn internal_error(&mut self, span: Span, what: &'static str) -> CoreId {
        if self.internal.is_none() {
            self.internal = Some(InternalError::UnexpectedShape { what, span });
        }
        build::empty(&mut self.arena, span)
    }

    /// Send to the reserved `<Magic>` constant.
    pub(crate) fn magic(&mut self, span: Span, selector: Name, args: &[CoreId]) -> CoreId {
        build::magic_send(&mut self.arena, span, self.name_magic, selector, args)
    }

    /// Re-push a leaf node so a cheap reference can appear in two branches
    /// without re-lowering (and without aliasing in the strict tree).
    pub(crate) fn reread_leaf(&mut self, id: CoreId) -> CoreId {
        let kind = *self.arena.kind(id);
        let span = self.arena.span(id);
        self.arena.push(kind, span)
    }

    /// The `self` receiver as a core read.
    pub(crate) fn self_ref(&mut self, span: Span) -> CoreId {
        build::local(&mut self.arena, span, self.name_self)
    }
}
