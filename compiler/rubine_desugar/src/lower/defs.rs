//! Definition lowering: methods, classes, modules, singleton classes,
//! `alias`, and `undef`.
//!
//! Method and class boundaries save and reset the hygienic-name counter so
//! generated temporaries number from zero within each scope; resets cannot
//! collide because the enclosing scope name is part of every fresh name.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, ClassKind, CoreId, CoreKind, CoreRange, Name, NodeId, NodeKind, NodeRange,
                Span};

use super::{Ctx, Lowerer};

impl Lowerer<'_> {
    /// `def name(params) body end`
    pub(crate) fn lower_def(
        &mut self,
        span: Span,
        name: Name,
        params: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        self.lower_method(span, name, false, params, body, ctx)
    }

    /// `def definee.name(params) body end`
    pub(crate) fn lower_defs(
        &mut self,
        span: Span,
        definee: NodeId,
        name: Name,
        params: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        if !matches!(*self.src.kind(definee), NodeKind::SelfRef) {
            self.report(
                Diagnostic::error(ErrorCode::E4009)
                    .with_message("singleton method definition on an arbitrary expression")
                    .with_label(self.src.span(definee), "only `def self.name` is supported")
                    .with_note("move the method into `class << self` or define it on self"),
            );
        }
        self.lower_method(span, name, true, params, body, ctx)
    }

    fn lower_method(
        &mut self,
        span: Span,
        name: Name,
        self_method: bool,
        params: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let saved_seq = self.fresh_seq;
        self.fresh_seq = 0;

        let mut mctx = ctx;
        mctx.method_name = name;
        mctx.method_span = span;
        mctx.in_block = false;
        mctx.in_module_body = false;

        let (params, block_param) = self.lower_params(params, true, mctx);
        mctx.block_param = block_param;
        let body = self.lower_optional(body, mctx);

        self.fresh_seq = saved_seq;
        self.push(
            CoreKind::MethodDef {
                name,
                self_method,
                params,
                body,
            },
            span,
        )
    }

    /// `class Name < Superclass; body; end`
    pub(crate) fn lower_class(
        &mut self,
        span: Span,
        name: NodeId,
        superclass: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let name = self.lower_expr(name, ctx);
        let superclass = self.lower_optional(superclass, ctx);
        let body = self.lower_scope_body(body, false, ctx);
        self.push(
            CoreKind::ClassDef {
                kind: ClassKind::Class,
                name,
                superclass,
                body,
            },
            span,
        )
    }

    /// `module Name; body; end`
    pub(crate) fn lower_module(
        &mut self,
        span: Span,
        name: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let name = self.lower_expr(name, ctx);
        let body = self.lower_scope_body(body, true, ctx);
        self.push(
            CoreKind::ClassDef {
                kind: ClassKind::Module,
                name,
                superclass: CoreId::INVALID,
                body,
            },
            span,
        )
    }

    /// `class << self; body; end` — any other receiver has no static
    /// meaning for this front end.
    pub(crate) fn lower_sclass(
        &mut self,
        span: Span,
        expr: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        if !matches!(*self.src.kind(expr), NodeKind::SelfRef) {
            self.report(
                Diagnostic::error(ErrorCode::E4009)
                    .with_message("singleton class of an arbitrary expression")
                    .with_label(self.src.span(expr), "only `class << self` is supported"),
            );
            return build::empty(&mut self.arena, span);
        }
        let name = build::local(&mut self.arena, span.zero_len(), self.name_singleton);
        let body = self.lower_scope_body(body, false, ctx);
        self.push(
            CoreKind::ClassDef {
                kind: ClassKind::Class,
                name,
                superclass: CoreId::INVALID,
                body,
            },
            span,
        )
    }

    /// Class/module body as a statement list, in a fresh scope context with
    /// its own temporary numbering.
    fn lower_scope_body(&mut self, body: NodeId, is_module: bool, ctx: Ctx) -> CoreRange {
        let saved_seq = self.fresh_seq;
        self.fresh_seq = 0;

        let mut sctx = Ctx::top_level(ctx.preserve_concrete_syntax);
        sctx.in_module_body = is_module;

        let stmts: Vec<CoreId> = if body.is_valid() {
            match *self.src.kind(body) {
                NodeKind::Begin { stmts } | NodeKind::KwBegin { stmts } => {
                    let ids = self.src.list(stmts).to_vec();
                    ids.into_iter().map(|id| self.lower_expr(id, sctx)).collect()
                }
                _ => vec![self.lower_expr(body, sctx)],
            }
        } else {
            Vec::new()
        };

        self.fresh_seq = saved_seq;
        self.arena.alloc_list(stmts)
    }

    /// `alias to from` → `self.alias_method(to, from)`
    pub(crate) fn lower_alias(&mut self, span: Span, to: NodeId, from: NodeId, ctx: Ctx) -> CoreId {
        let recv = self.self_ref(span.zero_len());
        let to = self.lower_expr(to, ctx);
        let from = self.lower_expr(from, ctx);
        build::send(&mut self.arena, span, recv, self.name_alias_method, &[to, from])
    }

    /// `undef a, b` → `self.undef_method(a, b)`
    pub(crate) fn lower_undef(
        &mut self,
        span: Span,
        names: NodeRange,
        ctx: Ctx,
    ) -> CoreId {
        let recv = self.self_ref(span.zero_len());
        let names = self.src.list(names).to_vec();
        let args: Vec<CoreId> = names.into_iter().map(|n| self.lower_expr(n, ctx)).collect();
        build::send(&mut self.arena, span, recv, self.name_undef_method, &args)
    }
}
