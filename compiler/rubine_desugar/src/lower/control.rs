//! Control-flow lowering: boolean operators, `case`, loops, jumps, and
//! `defined?`.
//!
//! `&&`/`||` become two-way conditionals; a left operand that is not a bare
//! reference is bound once to a temporary so its side effects run exactly
//! once. `case` becomes a right-associated conditional chain testing the
//! bound scrutinee with case-equality.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, CoreId, CoreKind, CoreParam, Lit, Name, NodeId, NodeKind, NodeRange,
                ParamKind, Span};

use super::{Ctx, Lowerer};

impl Lowerer<'_> {
    /// A lowered operand that can be re-read by re-pushing the node instead
    /// of binding a temporary.
    fn is_cheap_operand(&self, id: NodeId) -> bool {
        matches!(
            *self.src.kind(id),
            NodeKind::Nil
                | NodeKind::True
                | NodeKind::False
                | NodeKind::SelfRef
                | NodeKind::LocalRef(_)
                | NodeKind::InstanceRef(_)
                | NodeKind::ClassRef(_)
                | NodeKind::GlobalRef(_)
        )
    }

    /// `left && right`
    pub(crate) fn lower_and(&mut self, span: Span, left: NodeId, right: NodeId, ctx: Ctx) -> CoreId {
        if ctx.preserve_concrete_syntax {
            let left = self.lower_expr(left, ctx);
            let right = self.lower_expr(right, ctx);
            return self.magic(span, self.sel_and, &[left, right]);
        }
        if self.is_cheap_operand(left) {
            let cond = self.lower_expr(left, ctx);
            let right = self.lower_expr(right, ctx);
            let reread = self.reread_leaf(cond);
            return build::if_(&mut self.arena, span, cond, right, reread);
        }
        let syn = span.zero_len();
        let left = self.lower_expr(left, ctx);
        let tmp = self.fresh("andAnd", ctx);
        let bind = build::local_asgn(&mut self.arena, syn, tmp, left);
        let cond = build::local(&mut self.arena, syn, tmp);
        let right = self.lower_expr(right, ctx);
        let reread = build::local(&mut self.arena, syn, tmp);
        let branch = build::if_(&mut self.arena, span, cond, right, reread);
        build::seq(&mut self.arena, span, vec![bind, branch])
    }

    /// `left || right`
    pub(crate) fn lower_or(&mut self, span: Span, left: NodeId, right: NodeId, ctx: Ctx) -> CoreId {
        if ctx.preserve_concrete_syntax {
            let left = self.lower_expr(left, ctx);
            let right = self.lower_expr(right, ctx);
            return self.magic(span, self.sel_or, &[left, right]);
        }
        if self.is_cheap_operand(left) {
            let cond = self.lower_expr(left, ctx);
            let reread = self.reread_leaf(cond);
            let right = self.lower_expr(right, ctx);
            return build::if_(&mut self.arena, span, cond, reread, right);
        }
        let left = self.lower_expr(left, ctx);
        let right = self.lower_expr(right, ctx);
        self.or_combine(span, left, right, ctx)
    }

    /// `left || right` over already-lowered operands, binding the left once.
    fn or_combine(&mut self, span: Span, left: CoreId, right: CoreId, ctx: Ctx) -> CoreId {
        let syn = span.zero_len();
        let tmp = self.fresh("orOr", ctx);
        let bind = build::local_asgn(&mut self.arena, syn, tmp, left);
        let cond = build::local(&mut self.arena, syn, tmp);
        let reread = build::local(&mut self.arena, syn, tmp);
        let branch = build::if_(&mut self.arena, span, cond, reread, right);
        build::seq(&mut self.arena, span, vec![bind, branch])
    }

    /// `case [scrutinee] when ... [else] end`
    pub(crate) fn lower_case(
        &mut self,
        span: Span,
        scrutinee: NodeId,
        whens: NodeRange,
        else_: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();
        let whens = self.src.list(whens).to_vec();

        let scrutinee_tmp = if scrutinee.is_valid() {
            let value = self.lower_expr(scrutinee, ctx);
            let tmp = self.fresh("case", ctx);
            Some((tmp, build::local_asgn(&mut self.arena, syn, tmp, value)))
        } else {
            None
        };

        let mut chain = if else_.is_valid() {
            self.lower_expr(else_, ctx)
        } else {
            build::nil(&mut self.arena, syn)
        };

        for &when in whens.iter().rev() {
            let wspan = self.src.span(when);
            let NodeKind::When { patterns, body } = *self.src.kind(when) else {
                return self.internal_error(wspan, "when clause changed shape");
            };
            let patterns = self.src.list(patterns).to_vec();

            let mut test: Option<CoreId> = None;
            for &pattern in &patterns {
                let one = self.lower_when_test(pattern, scrutinee_tmp.map(|(t, _)| t), ctx);
                test = Some(match test {
                    None => one,
                    Some(prev) => self.or_combine(wspan, prev, one, ctx),
                });
            }
            let Some(test) = test else {
                return self.internal_error(wspan, "when clause without patterns");
            };
            let body = self.lower_optional(body, ctx);
            chain = build::if_(&mut self.arena, wspan, test, body, chain);
        }

        match scrutinee_tmp {
            Some((_, bind)) => build::seq(&mut self.arena, span, vec![bind, chain]),
            None => chain,
        }
    }

    /// One `when` pattern against the bound scrutinee: `pattern === value`,
    /// or the splat-array primitive for `when *patterns`. Caseless `case`
    /// uses the pattern itself as the condition; a caseless splat asks the
    /// collection whether any element is truthy.
    fn lower_when_test(
        &mut self,
        pattern: NodeId,
        scrutinee_tmp: Option<Name>,
        ctx: Ctx,
    ) -> CoreId {
        let pspan = self.src.span(pattern);
        if let NodeKind::Splat { value } = *self.src.kind(pattern) {
            if !value.is_valid() {
                return self.internal_error(pspan, "bare splat as a when pattern");
            }
            let values = self.lower_expr(value, ctx);
            return match scrutinee_tmp {
                Some(tmp) => {
                    let scrutinee = build::local(&mut self.arena, pspan.zero_len(), tmp);
                    self.magic(pspan, self.sel_check_match_array, &[values, scrutinee])
                }
                None => build::send(&mut self.arena, pspan, values, self.name_any, &[]),
            };
        }
        let Some(tmp) = scrutinee_tmp else {
            return self.lower_expr(pattern, ctx);
        };
        let pattern = self.lower_expr(pattern, ctx);
        let scrutinee = build::local(&mut self.arena, pspan.zero_len(), tmp);
        build::send(&mut self.arena, pspan, pattern, self.name_case_eq, &[scrutinee])
    }

    /// `begin body end while cond` and the `until` variant: the body runs at
    /// least once inside an unconditional loop ending in a conditional break.
    pub(crate) fn lower_post_loop(
        &mut self,
        span: Span,
        cond: NodeId,
        body: NodeId,
        until: bool,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();
        let body = self.lower_expr(body, ctx);
        let cond = self.lower_expr(cond, ctx);
        let brk = self.push(CoreKind::Break { value: CoreId::INVALID }, syn);
        let check = if until {
            build::if_(&mut self.arena, syn, cond, brk, CoreId::INVALID)
        } else {
            build::if_(&mut self.arena, syn, cond, CoreId::INVALID, brk)
        };
        let loop_body = build::seq(&mut self.arena, span, vec![body, check]);
        let forever = build::true_(&mut self.arena, syn);
        self.push(
            CoreKind::While {
                cond: forever,
                body: loop_body,
            },
            span,
        )
    }

    /// `for var in collection; body; end` → `collection.each { |tmp| var = tmp; body }`
    ///
    /// Unlike a handwritten block, `for` keeps its variable visible after
    /// the loop; binding a real block parameter and assigning through the
    /// surface target preserves that.
    pub(crate) fn lower_for(
        &mut self,
        span: Span,
        var: NodeId,
        collection: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();
        let collection = self.lower_expr(collection, ctx);
        let tmp = self.fresh("for", ctx);

        let mut block_ctx = ctx;
        block_ctx.in_block = true;

        let value = build::local(&mut self.arena, syn, tmp);
        let assign = match *self.src.kind(var) {
            NodeKind::Mlhs { targets } => {
                let targets = self.src.list(targets).to_vec();
                self.destructure(self.src.span(var), &targets, value, block_ctx)
            }
            _ => self.assign_target(var, value, block_ctx),
        };
        let body = self.lower_optional(body, block_ctx);
        let block_body = if body.is_valid() {
            build::seq(&mut self.arena, span, vec![assign, body])
        } else {
            assign
        };

        let params = self.arena.alloc_params([CoreParam::plain(ParamKind::Required, tmp)]);
        let block = self.push(
            CoreKind::BlockFn {
                params,
                body: block_body,
            },
            span,
        );
        let args = self.arena.alloc_list([]);
        self.push(
            CoreKind::Send {
                recv: collection,
                selector: self.name_each,
                args,
                kwargs: CoreId::INVALID,
                block,
            },
            span,
        )
    }

    /// Value of a `return`/`break`/`next`: none, one, or an implicit array.
    /// A block-pass in this position cannot be given a meaning and is
    /// reported then dropped.
    pub(crate) fn lower_jump_value(&mut self, span: Span, args: NodeRange, ctx: Ctx) -> CoreId {
        let mut elems: Vec<NodeId> = Vec::new();
        for &arg in self.src.list(args) {
            if matches!(*self.src.kind(arg), NodeKind::BlockPass { .. }) {
                self.report(
                    Diagnostic::error(ErrorCode::E4008)
                        .with_message("block argument given to a control-flow keyword")
                        .with_label(self.src.span(arg), "cannot pass a block here"),
                );
                continue;
            }
            elems.push(arg);
        }

        match elems.as_slice() {
            [] => CoreId::INVALID,
            [single] if !matches!(*self.src.kind(*single), NodeKind::Splat { .. }) => {
                self.lower_expr(*single, ctx)
            }
            _ => self.lower_array_elems(span, &elems, ctx),
        }
    }

    /// `defined?(expr)` — flatten a name chain (`A::B.c`, `@x`, `self`)
    /// into its textual segments for the runtime primitive. Anything that is
    /// not a name chain gets the zero-argument form, which always answers
    /// "expression".
    pub(crate) fn lower_defined(&mut self, span: Span, value: NodeId) -> CoreId {
        let mut parts: Vec<Name> = Vec::new();
        let mut cursor = value;
        loop {
            match *self.src.kind(cursor) {
                NodeKind::LocalRef(name)
                | NodeKind::InstanceRef(name)
                | NodeKind::ClassRef(name)
                | NodeKind::GlobalRef(name) => {
                    parts.push(name);
                    break;
                }
                NodeKind::SelfRef => {
                    parts.push(self.name_self);
                    break;
                }
                NodeKind::Const { scope, name } => {
                    parts.push(name);
                    if scope.is_valid() {
                        cursor = scope;
                    } else {
                        break;
                    }
                }
                NodeKind::Cbase => break,
                NodeKind::Send { recv, selector, .. } => {
                    parts.push(selector);
                    if recv.is_valid() {
                        cursor = recv;
                    } else {
                        break;
                    }
                }
                _ => {
                    parts.clear();
                    break;
                }
            }
        }
        parts.reverse();

        let syn = span.zero_len();
        let args: Vec<CoreId> = parts
            .into_iter()
            .map(|name| self.push(CoreKind::Lit(Lit::Str(name)), syn))
            .collect();
        self.magic(span, self.sel_defined, &args)
    }
}
