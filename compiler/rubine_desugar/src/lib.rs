//! Surface AST → core IR lowering for the Rubine front end.
//!
//! Rewrites every surface node kind — one per Ruby grammar production — into
//! the closed core node set in `rubine_ir::core`:
//! - direct mappings for constructs the core expresses natively (literals,
//!   variable reads/writes, conditionals, while loops, method and class
//!   definitions)
//! - desugarings for everything else: multiple assignment, op-assign, safe
//!   navigation, `case`/`when`, post-condition loops, `for`, blocks and
//!   numbered parameters, splat calls, string interpolation, hash and array
//!   splats, `rescue`/`ensure`
//! - runtime primitives the core cannot express become sends to the reserved
//!   `<Magic>` constant
//!
//! The pass preserves evaluation order and evaluation count of side-effecting
//! sub-expressions, binding anything it must read twice to a hygienic
//! temporary. Constructs with no lowering rule produce an `EmptyTree`
//! placeholder plus an `E4001` diagnostic; the rest of the unit still lowers.

mod dup_keys;
mod lower;
mod validate;

pub use lower::MAX_DEPTH;

use rubine_diagnostic::queue::{self, DiagnosticQueue};
use rubine_ir::{build, ClassKind, CoreArena, CoreId, CoreKind, NodeArena, NodeId, Span,
                StringInterner};
use thiserror::Error;

use lower::{Ctx, Lowerer};

/// Fatal lowering failure: the surface tree violated an invariant the parser
/// is supposed to guarantee. Not attributable to user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// A node kind appeared in a position the grammar makes impossible.
    #[error("{what} at {span:?} violates a parser invariant")]
    UnexpectedShape { what: &'static str, span: Span },
}

/// Output of a successful lowering pass.
///
/// `root` is always the implicit top-level class scope wrapping the unit's
/// statements; `diagnostics` holds every recoverable problem found on the
/// way (the pass never aborts on user errors).
#[derive(Debug)]
pub struct DesugarResult {
    pub arena: CoreArena,
    pub root: CoreId,
    pub diagnostics: DiagnosticQueue,
}

/// Lower one compilation unit from surface syntax to core IR.
///
/// `root` is the parser's root node (`NodeId::INVALID` for an empty unit).
/// `preserve_concrete_syntax` switches `&&`, `||`, and the op-assign family
/// to marker-call lowerings so source-range-sensitive editor refactors keep
/// working; it is held constant for the whole unit.
///
/// # Errors
/// Returns [`InternalError`] when the surface tree has a shape the grammar
/// should have made impossible. User-level problems never produce an `Err`;
/// they are reported through `DesugarResult::diagnostics` with a placeholder
/// node standing in for the offending construct.
pub fn lower(
    src: &NodeArena,
    root: NodeId,
    interner: &StringInterner,
    preserve_concrete_syntax: bool,
) -> Result<DesugarResult, InternalError> {
    let mut lowerer = Lowerer::new(src, interner);

    if !root.is_valid() {
        return Ok(lowerer.finish_empty());
    }

    tracing::debug!(surface_nodes = src.len(), "lowering compilation unit");

    let ctx = Ctx::top_level(preserve_concrete_syntax);
    let body = lowerer.lower_expr(root, ctx);
    let span = src.span(root);
    let result = lowerer.finish(body, span)?;

    #[cfg(debug_assertions)]
    validate::validate(&result.arena, result.root);

    tracing::debug!(
        core_nodes = result.arena.len(),
        diagnostics = result.diagnostics.len(),
        "lowering complete"
    );

    Ok(result)
}

impl Lowerer<'_> {
    /// Wrap the lowered unit in the implicit root class scope and surface
    /// any recorded internal failure.
    fn finish(mut self, body: CoreId, span: Span) -> Result<DesugarResult, InternalError> {
        if let Some(err) = self.internal.take() {
            return Err(err);
        }

        if self.diagnostics.limit_reached() {
            let limit = self.diagnostics.error_count();
            self.diagnostics.push_unfiltered(queue::too_many_errors(limit));
        }

        let name = build::const_ref(&mut self.arena, span.zero_len(), self.name_root);
        let stmts = self.arena.alloc_list([body]);
        let root = self.arena.push(
            CoreKind::ClassDef {
                kind: ClassKind::Class,
                name,
                superclass: CoreId::INVALID,
                body: stmts,
            },
            span,
        );

        Ok(DesugarResult {
            arena: self.arena,
            root,
            diagnostics: self.diagnostics,
        })
    }

    /// Result for an empty compilation unit: a root scope around nothing.
    fn finish_empty(mut self) -> DesugarResult {
        let span = Span::DUMMY;
        let name = build::const_ref(&mut self.arena, span, self.name_root);
        let empty = build::empty(&mut self.arena, span);
        let stmts = self.arena.alloc_list([empty]);
        let root = self.arena.push(
            CoreKind::ClassDef {
                kind: ClassKind::Class,
                name,
                superclass: CoreId::INVALID,
                body: stmts,
            },
            span,
        );
        DesugarResult {
            arena: self.arena,
            root,
            diagnostics: self.diagnostics,
        }
    }
}
