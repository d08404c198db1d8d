//! Exception-handling lowering.
//!
//! `rescue` and `ensure` share one core `Rescue` node: an `ensure` whose
//! body is itself a surface `rescue` merges into that node instead of
//! nesting two handlers. Clauses that do not bind the raised value get a
//! hygienic binder so later phases always have a name to resolve.

use rubine_ir::{CoreId, CoreKind, IdentKind, NodeId, NodeKind, NodeRange, Span};

use super::{Ctx, Lowerer};

impl Lowerer<'_> {
    pub(crate) fn lower_rescue(
        &mut self,
        span: Span,
        body: NodeId,
        cases: NodeRange,
        else_: NodeId,
        ensure_: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let body = self.lower_optional(body, ctx);

        let case_nodes = self.src.list(cases).to_vec();
        let mut lowered_cases: Vec<CoreId> = Vec::with_capacity(case_nodes.len());
        for case in case_nodes {
            let cspan = self.src.span(case);
            let NodeKind::Resbody {
                exceptions,
                binder,
                body,
            } = *self.src.kind(case)
            else {
                return self.internal_error(cspan, "rescue clause changed shape");
            };

            let exception_nodes = self.src.list(exceptions).to_vec();
            let mut lowered_exceptions: Vec<CoreId> = Vec::with_capacity(exception_nodes.len());
            for exception in exception_nodes {
                lowered_exceptions.push(self.lower_expr(exception, ctx));
            }
            let exceptions = self.arena.alloc_list(lowered_exceptions);

            let binder = self.lower_binder(cspan, binder, ctx);
            let body = self.lower_optional(body, ctx);
            lowered_cases.push(self.push(
                CoreKind::RescueCase {
                    exceptions,
                    binder,
                    body,
                },
                cspan,
            ));
        }
        let cases = self.arena.alloc_list(lowered_cases);

        let else_ = self.lower_optional(else_, ctx);
        let ensure_ = self.lower_optional(ensure_, ctx);
        self.push(
            CoreKind::Rescue {
                body,
                cases,
                else_,
                ensure_,
            },
            span,
        )
    }

    pub(crate) fn lower_ensure(
        &mut self,
        span: Span,
        body: NodeId,
        ensure_: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        // `begin ... rescue ... ensure ... end` parses as Ensure(Rescue(..));
        // the ensure body belongs on the same handler node.
        if body.is_valid() {
            if let NodeKind::Rescue {
                body: inner,
                cases,
                else_,
            } = *self.src.kind(body)
            {
                return self.lower_rescue(span, inner, cases, else_, ensure_, ctx);
            }
        }

        let body = self.lower_optional(body, ctx);
        let cases = self.arena.alloc_list([]);
        let ensure_ = self.lower_optional(ensure_, ctx);
        self.push(
            CoreKind::Rescue {
                body,
                cases,
                else_: CoreId::INVALID,
                ensure_,
            },
            span,
        )
    }

    /// The clause's binder as a bare assignment target (value stays
    /// INVALID). An unbound clause still gets a fresh name.
    fn lower_binder(&mut self, cspan: Span, binder: NodeId, ctx: Ctx) -> CoreId {
        if !binder.is_valid() {
            let name = self.fresh("rescue", ctx);
            return self.push(
                CoreKind::LocalAsgn {
                    name,
                    value: CoreId::INVALID,
                },
                cspan.zero_len(),
            );
        }

        let span = self.src.span(binder);
        match *self.src.kind(binder) {
            NodeKind::LocalAsgn { name, .. } => self.push(
                CoreKind::LocalAsgn {
                    name,
                    value: CoreId::INVALID,
                },
                span,
            ),
            NodeKind::InstanceAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Instance,
                    name,
                    value: CoreId::INVALID,
                },
                span,
            ),
            NodeKind::ClassAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Class,
                    name,
                    value: CoreId::INVALID,
                },
                span,
            ),
            NodeKind::GlobalAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Global,
                    name,
                    value: CoreId::INVALID,
                },
                span,
            ),
            _ => self.unsupported(span, "rescue binding through this target"),
        }
    }
}
