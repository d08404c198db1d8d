//! Assignment lowering: constants, destructuring, and the op-assign family.
//!
//! Destructuring routes through the `<expand-splat>` primitive so the
//! runtime pads or trims the right-hand side once; individual targets then
//! index into the expanded temporary. Op-assign targets that are themselves
//! calls bind the receiver and every argument to temporaries so each source
//! sub-expression is evaluated exactly once.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, CoreId, CoreKind, IdentKind, Name, NodeId, NodeKind, Span};

use super::{Ctx, Lowerer};

/// Clamp a target count to `i64` for index literals. Counts are bounded by
/// the arena size, so the clamp never fires in practice.
fn idx(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Lowerer<'_> {
    pub(crate) fn lower_const_asgn(
        &mut self,
        span: Span,
        scope: NodeId,
        name: Name,
        value: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        if !value.is_valid() {
            return self.internal_error(span, "assignment target outside multiple assignment");
        }
        if ctx.method_name != Name::EMPTY {
            return self.const_in_method(span, value, ctx);
        }
        let scope = self.lower_optional(scope, ctx);
        let value = self.lower_expr(value, ctx);
        self.push(CoreKind::ConstAsgn { scope, name, value }, span)
    }

    /// Constant assignment where Ruby forbids it (inside a method body) or
    /// as an op-assign target. The value still lowers, wrapped in a
    /// `<suggest-constant>` marker so later phases can propose a fix.
    fn const_in_method(&mut self, span: Span, value: NodeId, ctx: Ctx) -> CoreId {
        self.report(
            Diagnostic::error(ErrorCode::E4005)
                .with_message("dynamic constant assignment")
                .with_label(span, "constants cannot be assigned here")
                .with_note("assign the constant at class or module level instead"),
        );
        let value = self.lower_expr(value, ctx);
        self.magic(span, self.sel_suggest_constant, &[value])
    }

    /// `a, *b, c = rhs`
    pub(crate) fn lower_masgn(&mut self, span: Span, lhs: NodeId, rhs: NodeId, ctx: Ctx) -> CoreId {
        let NodeKind::Mlhs { targets } = *self.src.kind(lhs) else {
            return self.internal_error(
                self.src.span(lhs),
                "multiple assignment without a target list",
            );
        };
        let targets = self.src.list(targets).to_vec();
        let value = self.lower_expr(rhs, ctx);
        self.destructure(span, &targets, value, ctx)
    }

    /// Bind `value` once, expand it through `<expand-splat>`, and assign
    /// each target from the expansion. The whole expression evaluates to the
    /// original right-hand side, not the last bound target.
    pub(crate) fn destructure(
        &mut self,
        span: Span,
        targets: &[NodeId],
        value: CoreId,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();

        let mut splat_at: Option<usize> = None;
        for (i, &t) in targets.iter().enumerate() {
            if matches!(*self.src.kind(t), NodeKind::Splat { .. }) {
                if splat_at.is_some() {
                    return self
                        .internal_error(span, "multiple splats in one destructuring target list");
                }
                splat_at = Some(i);
            }
        }
        let before = splat_at.unwrap_or(targets.len());
        let after = splat_at.map_or(0, |i| targets.len() - i - 1);

        let rhs_tmp = self.fresh("masgn", ctx);
        let bind_rhs = build::local_asgn(&mut self.arena, syn, rhs_tmp, value);

        let rhs_read = build::local(&mut self.arena, syn, rhs_tmp);
        let before_lit = build::int(&mut self.arena, syn, idx(before));
        let after_lit = build::int(&mut self.arena, syn, idx(after));
        let expanded = self.magic(syn, self.sel_expand_splat, &[rhs_read, before_lit, after_lit]);
        let exp_tmp = self.fresh("masgn", ctx);
        let bind_exp = build::local_asgn(&mut self.arena, syn, exp_tmp, expanded);

        let mut stmts = vec![bind_rhs, bind_exp];
        for (i, &target) in targets.iter().enumerate() {
            let tspan = self.src.span(target);
            if splat_at == Some(i) {
                let NodeKind::Splat { value: inner } = *self.src.kind(target) else {
                    return self.internal_error(tspan, "splat target changed shape");
                };
                if !inner.is_valid() {
                    // Bare `*` discards the middle.
                    continue;
                }
                // Everything the fixed ends do not claim:
                // expanded[before, -(after + 1)]
                let arr = build::local(&mut self.arena, syn, exp_tmp);
                let start = build::int(&mut self.arena, syn, idx(before));
                let len = build::int(&mut self.arena, syn, -(idx(after) + 1));
                let read = build::send(&mut self.arena, tspan, arr, self.name_index, &[start, len]);
                stmts.push(self.assign_target(inner, read, ctx));
                continue;
            }

            // Fixed positions index from the front before the splat and from
            // the back after it.
            let index = match splat_at {
                Some(s) if i > s => idx(i) - idx(targets.len()),
                _ => idx(i),
            };
            let arr = build::local(&mut self.arena, syn, exp_tmp);
            let index = build::int(&mut self.arena, syn, index);
            let read = build::send(&mut self.arena, tspan, arr, self.name_index, &[index]);
            stmts.push(self.assign_target(target, read, ctx));
        }

        let result = build::local(&mut self.arena, syn, rhs_tmp);
        stmts.push(result);
        build::seq(&mut self.arena, span, stmts)
    }

    /// Assign an already-lowered value to one destructuring target.
    pub(crate) fn assign_target(&mut self, target: NodeId, value: CoreId, ctx: Ctx) -> CoreId {
        let kind = *self.src.kind(target);
        let span = self.src.span(target);
        match kind {
            NodeKind::LocalAsgn { name, .. } => {
                self.push(CoreKind::LocalAsgn { name, value }, span)
            }
            NodeKind::InstanceAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Instance,
                    name,
                    value,
                },
                span,
            ),
            NodeKind::ClassAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Class,
                    name,
                    value,
                },
                span,
            ),
            NodeKind::GlobalAsgn { name, .. } => self.push(
                CoreKind::IdentAsgn {
                    kind: IdentKind::Global,
                    name,
                    value,
                },
                span,
            ),
            NodeKind::ConstAsgn { scope, name, .. } => {
                if ctx.method_name != Name::EMPTY {
                    self.report(
                        Diagnostic::error(ErrorCode::E4005)
                            .with_message("dynamic constant assignment")
                            .with_label(span, "constants cannot be assigned here"),
                    );
                    return self.magic(span, self.sel_suggest_constant, &[value]);
                }
                let scope = self.lower_optional(scope, ctx);
                self.push(CoreKind::ConstAsgn { scope, name, value }, span)
            }
            NodeKind::Send {
                recv,
                selector,
                args,
            } => {
                // `a.b, ... = rhs` / `a[i], ... = rhs` — call the writer.
                let recv = self.lower_optional(recv, ctx);
                let arg_ids = self.src.list(args).to_vec();
                let mut lowered: Vec<CoreId> = Vec::with_capacity(arg_ids.len() + 1);
                for arg in arg_ids {
                    lowered.push(self.lower_expr(arg, ctx));
                }
                lowered.push(value);
                let writer = self.write_selector(selector);
                build::send(&mut self.arena, span, recv, writer, &lowered)
            }
            NodeKind::Mlhs { targets } => {
                let targets = self.src.list(targets).to_vec();
                self.destructure(span, &targets, value, ctx)
            }
            _ => {
                self.report(
                    Diagnostic::error(ErrorCode::E4007)
                        .with_message("unsupported destructuring target")
                        .with_label(span, "cannot assign through this target"),
                );
                build::empty(&mut self.arena, span)
            }
        }
    }

    /// `target op= value` for a binary operator.
    pub(crate) fn lower_op_asgn(
        &mut self,
        span: Span,
        target: NodeId,
        op: Name,
        value: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        if ctx.preserve_concrete_syntax {
            let read = self.lower_target_read(target, ctx);
            let op_sym = build::sym(&mut self.arena, span.zero_len(), op);
            let value = self.lower_expr(value, ctx);
            return self.magic(span, self.sel_op_asgn, &[read, op_sym, value]);
        }

        let kind = *self.src.kind(target);
        let tspan = self.src.span(target);
        match kind {
            NodeKind::LocalAsgn { name, .. } => {
                let read = build::local(&mut self.arena, tspan, name);
                let value = self.lower_expr(value, ctx);
                let new = build::send(&mut self.arena, span, read, op, &[value]);
                self.push(CoreKind::LocalAsgn { name, value: new }, span)
            }
            NodeKind::InstanceAsgn { name, .. } => {
                self.ident_op_asgn(span, tspan, IdentKind::Instance, name, op, value, ctx)
            }
            NodeKind::ClassAsgn { name, .. } => {
                self.ident_op_asgn(span, tspan, IdentKind::Class, name, op, value, ctx)
            }
            NodeKind::GlobalAsgn { name, .. } => {
                self.ident_op_asgn(span, tspan, IdentKind::Global, name, op, value, ctx)
            }
            NodeKind::ConstAsgn { .. } => self.const_reassignment(span, value, ctx),
            NodeKind::Send {
                recv,
                selector,
                args,
            } => {
                let mut stmts = Vec::new();
                let recv_tmp = if recv.is_valid() {
                    let lowered = self.lower_expr(recv, ctx);
                    let tmp = self.fresh("opAsgn", ctx);
                    stmts.push(build::local_asgn(&mut self.arena, span.zero_len(), tmp, lowered));
                    Some(tmp)
                } else {
                    None
                };
                let arg_ids = self.src.list(args).to_vec();
                let Some(inner) =
                    self.op_asgn_write(span, recv_tmp, selector, &arg_ids, op, value, ctx)
                else {
                    return self.unsupported(span, "splat argument in an op-assign target");
                };
                stmts.push(inner);
                build::seq(&mut self.arena, span, stmts)
            }
            NodeKind::CSend {
                recv,
                selector,
                args,
            } => {
                // Combined rule for `recv&.field op= v`: the op-assign logic
                // is built directly inside the not-nil branch.
                let syn = span.zero_len();
                let lowered = self.lower_expr(recv, ctx);
                let tmp = self.fresh("csend", ctx);
                let bind = build::local_asgn(&mut self.arena, syn, tmp, lowered);
                let tref = build::local(&mut self.arena, syn, tmp);
                let is_nil = self.magic(syn, self.sel_nil_p, &[tref]);
                let nil_branch = build::nil(&mut self.arena, syn);
                let arg_ids = self.src.list(args).to_vec();
                let Some(write) =
                    self.op_asgn_write(span, Some(tmp), selector, &arg_ids, op, value, ctx)
                else {
                    return self.unsupported(span, "splat argument in an op-assign target");
                };
                let cond = build::if_(&mut self.arena, span, is_nil, nil_branch, write);
                build::seq(&mut self.arena, span, vec![bind, cond])
            }
            _ => self.internal_error(tspan, "op-assign against a non-assignable target"),
        }
    }

    fn ident_op_asgn(
        &mut self,
        span: Span,
        tspan: Span,
        kind: IdentKind,
        name: Name,
        op: Name,
        value: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let read = self.push(CoreKind::IdentRef { kind, name }, tspan);
        let value = self.lower_expr(value, ctx);
        let new = build::send(&mut self.arena, span, read, op, &[value]);
        self.push(CoreKind::IdentAsgn { kind, name, value: new }, span)
    }

    fn const_reassignment(&mut self, span: Span, value: NodeId, ctx: Ctx) -> CoreId {
        self.report(
            Diagnostic::error(ErrorCode::E4005)
                .with_message("constant reassignment")
                .with_label(span, "constants cannot be reassigned")
                .with_note("remove the assignment or introduce a local variable"),
        );
        let value = self.lower_expr(value, ctx);
        self.magic(span, self.sel_suggest_constant, &[value])
    }

    /// Read-modify-write against a receiver that is already bound (or
    /// `None` for a private self call): bind each index argument once, read
    /// via the getter, apply `op`, call the writer with the new value.
    ///
    /// Returns `None` when an argument cannot be bound to a temporary
    /// (splats and forwarding markers have no fixed-arity write form).
    fn op_asgn_write(
        &mut self,
        span: Span,
        recv_tmp: Option<Name>,
        selector: Name,
        args: &[NodeId],
        op: Name,
        value: NodeId,
        ctx: Ctx,
    ) -> Option<CoreId> {
        let syn = span.zero_len();
        if args.iter().any(|&a| {
            matches!(
                *self.src.kind(a),
                NodeKind::Splat { .. }
                    | NodeKind::KwSplat { .. }
                    | NodeKind::BlockPass { .. }
                    | NodeKind::ForwardedArgs
                    | NodeKind::ForwardedRest
                    | NodeKind::ForwardedKwRest
            )
        }) {
            return None;
        }

        let mut stmts = Vec::new();
        let mut arg_tmps = Vec::with_capacity(args.len());
        for &arg in args {
            let lowered = self.lower_expr(arg, ctx);
            let tmp = self.fresh("opAsgn", ctx);
            stmts.push(build::local_asgn(&mut self.arena, syn, tmp, lowered));
            arg_tmps.push(tmp);
        }

        let recv_read = |lowerer: &mut Self| match recv_tmp {
            Some(tmp) => build::local(&mut lowerer.arena, syn, tmp),
            None => CoreId::INVALID,
        };

        let recv = recv_read(self);
        let mut reads = Vec::with_capacity(arg_tmps.len());
        for &tmp in &arg_tmps {
            reads.push(build::local(&mut self.arena, syn, tmp));
        }
        let current = build::send(&mut self.arena, span, recv, selector, &reads);
        let value = self.lower_expr(value, ctx);
        let new = build::send(&mut self.arena, span, current, op, &[value]);

        let recv = recv_read(self);
        let mut wargs = Vec::with_capacity(arg_tmps.len() + 1);
        for &tmp in &arg_tmps {
            wargs.push(build::local(&mut self.arena, syn, tmp));
        }
        wargs.push(new);
        let writer = self.write_selector(selector);
        stmts.push(build::send(&mut self.arena, span, recv, writer, &wargs));
        Some(build::seq(&mut self.arena, span, stmts))
    }

    /// `target &&= value` / `target ||= value`.
    pub(crate) fn lower_and_or_asgn(
        &mut self,
        span: Span,
        target: NodeId,
        value: NodeId,
        is_and: bool,
        ctx: Ctx,
    ) -> CoreId {
        if ctx.preserve_concrete_syntax {
            let read = self.lower_target_read(target, ctx);
            let value = self.lower_expr(value, ctx);
            let selector = if is_and { self.sel_and_asgn } else { self.sel_or_asgn };
            return self.magic(span, selector, &[read, value]);
        }

        let kind = *self.src.kind(target);
        let tspan = self.src.span(target);
        match kind {
            NodeKind::LocalAsgn { name, .. } => {
                let read = build::local(&mut self.arena, tspan, name);
                let value = self.lower_expr(value, ctx);
                let write = self.push(CoreKind::LocalAsgn { name, value }, span);
                let reread = build::local(&mut self.arena, tspan, name);
                self.and_or_branches(span, read, write, reread, is_and)
            }
            NodeKind::InstanceAsgn { name, .. } => {
                self.ident_and_or_asgn(span, tspan, IdentKind::Instance, name, value, is_and, ctx)
            }
            NodeKind::ClassAsgn { name, .. } => {
                self.ident_and_or_asgn(span, tspan, IdentKind::Class, name, value, is_and, ctx)
            }
            NodeKind::GlobalAsgn { name, .. } => {
                self.ident_and_or_asgn(span, tspan, IdentKind::Global, name, value, is_and, ctx)
            }
            NodeKind::ConstAsgn { .. } => self.const_reassignment(span, value, ctx),
            NodeKind::Send {
                recv,
                selector,
                args,
            } => {
                let mut stmts = Vec::new();
                let recv_tmp = if recv.is_valid() {
                    let lowered = self.lower_expr(recv, ctx);
                    let tmp = self.fresh("opAsgn", ctx);
                    stmts.push(build::local_asgn(&mut self.arena, span.zero_len(), tmp, lowered));
                    Some(tmp)
                } else {
                    None
                };
                let arg_ids = self.src.list(args).to_vec();
                let Some(inner) =
                    self.send_and_or_write(span, recv_tmp, selector, &arg_ids, value, is_and, ctx)
                else {
                    return self.unsupported(span, "splat argument in an op-assign target");
                };
                stmts.push(inner);
                build::seq(&mut self.arena, span, stmts)
            }
            NodeKind::CSend {
                recv,
                selector,
                args,
            } => {
                let syn = span.zero_len();
                let lowered = self.lower_expr(recv, ctx);
                let tmp = self.fresh("csend", ctx);
                let bind = build::local_asgn(&mut self.arena, syn, tmp, lowered);
                let tref = build::local(&mut self.arena, syn, tmp);
                let is_nil = self.magic(syn, self.sel_nil_p, &[tref]);
                let nil_branch = build::nil(&mut self.arena, syn);
                let arg_ids = self.src.list(args).to_vec();
                let Some(inner) =
                    self.send_and_or_write(span, Some(tmp), selector, &arg_ids, value, is_and, ctx)
                else {
                    return self.unsupported(span, "splat argument in an op-assign target");
                };
                let cond = build::if_(&mut self.arena, span, is_nil, nil_branch, inner);
                build::seq(&mut self.arena, span, vec![bind, cond])
            }
            _ => self.internal_error(tspan, "op-assign against a non-assignable target"),
        }
    }

    fn ident_and_or_asgn(
        &mut self,
        span: Span,
        tspan: Span,
        kind: IdentKind,
        name: Name,
        value: NodeId,
        is_and: bool,
        ctx: Ctx,
    ) -> CoreId {
        let read = self.push(CoreKind::IdentRef { kind, name }, tspan);
        let value = self.lower_expr(value, ctx);
        let write = self.push(CoreKind::IdentAsgn { kind, name, value }, span);
        let reread = self.push(CoreKind::IdentRef { kind, name }, tspan);
        self.and_or_branches(span, read, write, reread, is_and)
    }

    /// `x &&= v` → `if x then x = v else x`; `x ||= v` swaps the branches.
    fn and_or_branches(
        &mut self,
        span: Span,
        read: CoreId,
        write: CoreId,
        reread: CoreId,
        is_and: bool,
    ) -> CoreId {
        if is_and {
            build::if_(&mut self.arena, span, read, write, reread)
        } else {
            build::if_(&mut self.arena, span, read, reread, write)
        }
    }

    /// Call-target `&&=`/`||=`: the getter runs exactly once into a
    /// temporary; the setter runs only on the branch that assigns.
    fn send_and_or_write(
        &mut self,
        span: Span,
        recv_tmp: Option<Name>,
        selector: Name,
        args: &[NodeId],
        value: NodeId,
        is_and: bool,
        ctx: Ctx,
    ) -> Option<CoreId> {
        let syn = span.zero_len();
        if args.iter().any(|&a| {
            matches!(
                *self.src.kind(a),
                NodeKind::Splat { .. }
                    | NodeKind::KwSplat { .. }
                    | NodeKind::BlockPass { .. }
                    | NodeKind::ForwardedArgs
                    | NodeKind::ForwardedRest
                    | NodeKind::ForwardedKwRest
            )
        }) {
            return None;
        }

        let mut stmts = Vec::new();
        let mut arg_tmps = Vec::with_capacity(args.len());
        for &arg in args {
            let lowered = self.lower_expr(arg, ctx);
            let tmp = self.fresh("opAsgn", ctx);
            stmts.push(build::local_asgn(&mut self.arena, syn, tmp, lowered));
            arg_tmps.push(tmp);
        }

        let recv = match recv_tmp {
            Some(tmp) => build::local(&mut self.arena, syn, tmp),
            None => CoreId::INVALID,
        };
        let mut reads = Vec::with_capacity(arg_tmps.len());
        for &tmp in &arg_tmps {
            reads.push(build::local(&mut self.arena, syn, tmp));
        }
        let current = build::send(&mut self.arena, span, recv, selector, &reads);
        let read_tmp = self.fresh("opAsgn", ctx);
        stmts.push(build::local_asgn(&mut self.arena, syn, read_tmp, current));

        let value = self.lower_expr(value, ctx);
        let recv = match recv_tmp {
            Some(tmp) => build::local(&mut self.arena, syn, tmp),
            None => CoreId::INVALID,
        };
        let mut wargs = Vec::with_capacity(arg_tmps.len() + 1);
        for &tmp in &arg_tmps {
            wargs.push(build::local(&mut self.arena, syn, tmp));
        }
        wargs.push(value);
        let writer = self.write_selector(selector);
        let write = build::send(&mut self.arena, span, recv, writer, &wargs);

        let cond = build::local(&mut self.arena, syn, read_tmp);
        let reread = build::local(&mut self.arena, syn, read_tmp);
        stmts.push(self.and_or_branches(span, cond, write, reread, is_and));
        Some(build::seq(&mut self.arena, span, stmts))
    }

    /// Lower an assignment-target node as a *read*, for the
    /// preserve-concrete-syntax marker calls.
    fn lower_target_read(&mut self, target: NodeId, ctx: Ctx) -> CoreId {
        let kind = *self.src.kind(target);
        let span = self.src.span(target);
        match kind {
            NodeKind::LocalAsgn { name, .. } => build::local(&mut self.arena, span, name),
            NodeKind::InstanceAsgn { name, .. } => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Instance,
                    name,
                },
                span,
            ),
            NodeKind::ClassAsgn { name, .. } => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Class,
                    name,
                },
                span,
            ),
            NodeKind::GlobalAsgn { name, .. } => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Global,
                    name,
                },
                span,
            ),
            NodeKind::ConstAsgn { scope, name, .. } => {
                let scope = self.lower_optional(scope, ctx);
                self.push(CoreKind::ConstRef { scope, name }, span)
            }
            NodeKind::Send {
                recv,
                selector,
                args,
            } => self.lower_call(span, recv, selector, args, false, None, ctx),
            NodeKind::CSend {
                recv,
                selector,
                args,
            } => self.lower_call(span, recv, selector, args, true, None, ctx),
            _ => self.internal_error(span, "op-assign against a non-assignable target"),
        }
    }

    /// Map a read selector to its write form: `[]` → `[]=`, `b` → `b=`.
    pub(crate) fn write_selector(&self, selector: Name) -> Name {
        if selector == self.name_index {
            self.name_index_asgn
        } else {
            let text = self.interner.lookup(selector);
            self.interner.intern_owned(format!("{text}="))
        }
    }
}
