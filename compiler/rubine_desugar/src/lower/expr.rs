//! Expression dispatch — the main `lower_expr` function.
//!
//! Contains the central match that maps each `NodeKind` variant to its core
//! lowering, plus the numeric-literal parsers and the statement-sequence
//! helper. Family-specific rules live in the sibling modules; this file only
//! routes to them.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, CoreId, CoreKind, IdentKind, Lit, Name, NodeId, NodeKind, NodeRange,
                Span};

use super::{Ctx, Lowerer, MAX_DEPTH};

impl Lowerer<'_> {
    /// Lower a single surface node to a core node.
    ///
    /// Copies the [`NodeKind`] out of the source arena (`NodeKind` is
    /// `Copy`), then matches on it. This avoids borrow conflicts — we never
    /// hold a reference into `self.src` while pushing into `self.arena`.
    pub(crate) fn lower_expr(&mut self, id: NodeId, ctx: Ctx) -> CoreId {
        let span = self.src.span(id);
        if self.depth >= MAX_DEPTH {
            self.report(
                Diagnostic::error(ErrorCode::E4010)
                    .with_message("expression nesting too deep")
                    .with_label(span, format!("nested more than {MAX_DEPTH} levels")),
            );
            return build::empty(&mut self.arena, span);
        }
        self.depth += 1;
        let out = self.lower_expr_inner(id, ctx);
        self.depth -= 1;
        out
    }

    /// Lower an optional child (`NodeId::INVALID` stays `CoreId::INVALID`).
    pub(crate) fn lower_optional(&mut self, id: NodeId, ctx: Ctx) -> CoreId {
        if id.is_valid() {
            self.lower_expr(id, ctx)
        } else {
            CoreId::INVALID
        }
    }

    fn lower_expr_inner(&mut self, id: NodeId, ctx: Ctx) -> CoreId {
        let kind = *self.src.kind(id);
        let span = self.src.span(id);

        match kind {
            // Literals
            NodeKind::Nil => self.push(CoreKind::Lit(Lit::Nil), span),
            NodeKind::True => self.push(CoreKind::Lit(Lit::True), span),
            NodeKind::False => self.push(CoreKind::Lit(Lit::False), span),
            NodeKind::SelfRef => self.self_ref(span),
            NodeKind::Integer(text) => self.lower_integer(span, text),
            NodeKind::Float(text) => self.lower_float(span, text),
            NodeKind::Str(value) => self.push(CoreKind::Lit(Lit::Str(value)), span),
            NodeKind::Sym(value) => self.push(CoreKind::Lit(Lit::Sym(value)), span),
            NodeKind::DStr { parts } => self.lower_interpolation(span, parts, ctx),
            NodeKind::DSym { parts } => {
                let string = self.lower_interpolation(span, parts, ctx);
                build::send(&mut self.arena, span, string, self.name_intern, &[])
            }
            NodeKind::XStr { parts } => {
                let string = self.lower_interpolation(span, parts, ctx);
                let recv = self.self_ref(span.zero_len());
                build::send(&mut self.arena, span, recv, self.name_backtick, &[string])
            }
            NodeKind::Regexp { parts, opts } => self.lower_regexp(span, parts, opts, ctx),
            NodeKind::IRange { from, to } => self.lower_range(span, from, to, false, ctx),
            NodeKind::ERange { from, to } => self.lower_range(span, from, to, true, ctx),
            NodeKind::FileLiteral => self.unsupported(span, "__FILE__"),
            NodeKind::LineLiteral => self.unsupported(span, "__LINE__"),
            NodeKind::EncodingLiteral => self.unsupported(span, "__ENCODING__"),

            // Variables
            NodeKind::LocalRef(name) => self.push(CoreKind::LocalRef(name), span),
            NodeKind::InstanceRef(name) => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Instance,
                    name,
                },
                span,
            ),
            NodeKind::ClassRef(name) => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Class,
                    name,
                },
                span,
            ),
            NodeKind::GlobalRef(name) => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Global,
                    name,
                },
                span,
            ),
            NodeKind::NthRef(n) => {
                let name = self.interner.intern_owned(format!("${n}"));
                self.push(
                    CoreKind::IdentRef {
                        kind: IdentKind::Global,
                        name,
                    },
                    span,
                )
            }
            NodeKind::BackRef(name) => self.push(
                CoreKind::IdentRef {
                    kind: IdentKind::Global,
                    name,
                },
                span,
            ),
            NodeKind::Const { scope, name } => {
                let scope = self.lower_optional(scope, ctx);
                self.push(CoreKind::ConstRef { scope, name }, span)
            }
            NodeKind::Cbase => {
                let name = self.name_root;
                self.push(
                    CoreKind::ConstRef {
                        scope: CoreId::INVALID,
                        name,
                    },
                    span,
                )
            }

            // Assignment
            NodeKind::LocalAsgn { name, value } => {
                if !value.is_valid() {
                    return self
                        .internal_error(span, "assignment target outside multiple assignment");
                }
                let value = self.lower_expr(value, ctx);
                self.push(CoreKind::LocalAsgn { name, value }, span)
            }
            NodeKind::InstanceAsgn { name, value } => {
                self.lower_ident_asgn(span, IdentKind::Instance, name, value, ctx)
            }
            NodeKind::ClassAsgn { name, value } => {
                self.lower_ident_asgn(span, IdentKind::Class, name, value, ctx)
            }
            NodeKind::GlobalAsgn { name, value } => {
                self.lower_ident_asgn(span, IdentKind::Global, name, value, ctx)
            }
            NodeKind::ConstAsgn { scope, name, value } => {
                self.lower_const_asgn(span, scope, name, value, ctx)
            }
            NodeKind::Masgn { lhs, rhs } => self.lower_masgn(span, lhs, rhs, ctx),
            NodeKind::Mlhs { .. } => {
                self.internal_error(span, "destructuring target list outside multiple assignment")
            }
            NodeKind::OpAsgn { target, op, value } => {
                self.lower_op_asgn(span, target, op, value, ctx)
            }
            NodeKind::AndAsgn { target, value } => {
                self.lower_and_or_asgn(span, target, value, true, ctx)
            }
            NodeKind::OrAsgn { target, value } => {
                self.lower_and_or_asgn(span, target, value, false, ctx)
            }

            // Sends and blocks
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
            NodeKind::Block { call, params, body } => self.lower_block(span, call, params, body, ctx),
            NodeKind::NumParams { .. } => {
                self.internal_error(span, "numbered-parameter marker outside a block")
            }
            NodeKind::BlockPass { .. } => {
                self.internal_error(span, "block-pass argument outside a call")
            }
            NodeKind::Splat { .. } => {
                self.internal_error(span, "splat outside an expansion context")
            }
            NodeKind::KwSplat { .. } => {
                self.internal_error(span, "double-splat outside a hash or argument list")
            }
            NodeKind::ForwardedArgs | NodeKind::ForwardedRest | NodeKind::ForwardedKwRest => {
                self.internal_error(span, "argument forwarding outside a call")
            }

            // Formal parameters only appear under definitions and blocks.
            NodeKind::Params { .. }
            | NodeKind::RequiredParam(_)
            | NodeKind::OptParam { .. }
            | NodeKind::RestParam { .. }
            | NodeKind::KwParam(_)
            | NodeKind::KwOptParam { .. }
            | NodeKind::KwRestParam { .. }
            | NodeKind::BlockParam { .. }
            | NodeKind::ShadowParam(_)
            | NodeKind::ForwardParam => {
                self.internal_error(span, "formal parameter outside a definition")
            }

            // Control flow
            NodeKind::And { left, right } => self.lower_and(span, left, right, ctx),
            NodeKind::Or { left, right } => self.lower_or(span, left, right, ctx),
            NodeKind::Not { value } => {
                let value = self.lower_expr(value, ctx);
                build::send(&mut self.arena, span, value, self.name_bang, &[])
            }
            NodeKind::If { cond, then_, else_ } => {
                let cond = self.lower_expr(cond, ctx);
                let then_ = self.lower_optional(then_, ctx);
                let else_ = self.lower_optional(else_, ctx);
                self.push(CoreKind::If { cond, then_, else_ }, span)
            }
            NodeKind::Case {
                scrutinee,
                whens,
                else_,
            } => self.lower_case(span, scrutinee, whens, else_, ctx),
            NodeKind::When { .. } => self.internal_error(span, "when clause outside case"),
            NodeKind::CaseMatch { .. } => self.unsupported(span, "pattern matching (case/in)"),
            NodeKind::InPattern { .. } => {
                self.internal_error(span, "in clause outside case/in")
            }
            NodeKind::While { cond, body } => {
                let cond = self.lower_expr(cond, ctx);
                let body = self.lower_optional(body, ctx);
                self.push(CoreKind::While { cond, body }, span)
            }
            NodeKind::Until { cond, body } => {
                let cond = self.lower_expr(cond, ctx);
                let cond = build::send(&mut self.arena, span.zero_len(), cond, self.name_bang, &[]);
                let body = self.lower_optional(body, ctx);
                self.push(CoreKind::While { cond, body }, span)
            }
            NodeKind::WhilePost { cond, body } => self.lower_post_loop(span, cond, body, false, ctx),
            NodeKind::UntilPost { cond, body } => self.lower_post_loop(span, cond, body, true, ctx),
            NodeKind::For {
                var,
                collection,
                body,
            } => self.lower_for(span, var, collection, body, ctx),
            NodeKind::Break { args } => {
                let value = self.lower_jump_value(span, args, ctx);
                self.push(CoreKind::Break { value }, span)
            }
            NodeKind::Next { args } => {
                let value = self.lower_jump_value(span, args, ctx);
                self.push(CoreKind::Next { value }, span)
            }
            NodeKind::Return { args } => {
                let value = self.lower_jump_value(span, args, ctx);
                self.push(CoreKind::Return { value }, span)
            }
            NodeKind::Retry => self.push(CoreKind::Retry, span),
            NodeKind::Redo => self.unsupported(span, "redo"),
            NodeKind::Yield { args } => self.lower_yield(span, args, ctx),
            NodeKind::Super { args } => self.lower_super(span, args, None, ctx),
            NodeKind::ZSuper => {
                let recv = self.self_ref(span.zero_len());
                let selector = self.zsuper_selector(ctx);
                build::send(&mut self.arena, span, recv, selector, &[])
            }
            NodeKind::Defined { value } => self.lower_defined(span, value),

            // Definitions
            NodeKind::Def { name, params, body } => self.lower_def(span, name, params, body, ctx),
            NodeKind::DefS {
                definee,
                name,
                params,
                body,
            } => self.lower_defs(span, definee, name, params, body, ctx),
            NodeKind::Class {
                name,
                superclass,
                body,
            } => self.lower_class(span, name, superclass, body, ctx),
            NodeKind::SClass { expr, body } => self.lower_sclass(span, expr, body, ctx),
            NodeKind::Module { name, body } => self.lower_module(span, name, body, ctx),
            NodeKind::Alias { to, from } => self.lower_alias(span, to, from, ctx),
            NodeKind::Undef { names } => self.lower_undef(span, names, ctx),

            // Collections
            NodeKind::Array { elements } => self.lower_array(span, elements, ctx),
            NodeKind::Hash { pairs, braces: _ } => self.lower_hash(span, pairs, ctx),
            NodeKind::Pair { .. } => self.internal_error(span, "key/value pair outside a hash"),

            // Sequencing and exceptions
            NodeKind::Begin { stmts } | NodeKind::KwBegin { stmts } => {
                self.lower_body(span, stmts, ctx)
            }
            NodeKind::Rescue { body, cases, else_ } => {
                self.lower_rescue(span, body, cases, else_, NodeId::INVALID, ctx)
            }
            NodeKind::Resbody { .. } => self.internal_error(span, "rescue clause outside rescue"),
            NodeKind::Ensure { body, ensure_ } => self.lower_ensure(span, body, ensure_, ctx),
            NodeKind::PreExe { .. } => self.unsupported(span, "BEGIN block"),
            NodeKind::PostExe { .. } => self.unsupported(span, "END block"),
        }
    }

    /// Lower a statement list into a `Seq` (empty lists become `nil`).
    pub(crate) fn lower_body(&mut self, span: Span, stmts: NodeRange, ctx: Ctx) -> CoreId {
        let ids = self.src.list(stmts).to_vec();
        if ids.is_empty() {
            return build::nil(&mut self.arena, span);
        }
        let lowered: Vec<CoreId> = ids.into_iter().map(|n| self.lower_expr(n, ctx)).collect();
        build::seq(&mut self.arena, span, lowered)
    }

    fn lower_ident_asgn(
        &mut self,
        span: Span,
        kind: IdentKind,
        name: Name,
        value: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        if !value.is_valid() {
            return self.internal_error(span, "assignment target outside multiple assignment");
        }
        let value = self.lower_expr(value, ctx);
        self.push(CoreKind::IdentAsgn { kind, name, value }, span)
    }

    // Numeric literals arrive as raw text so that malformed literals surface
    // here as diagnostics instead of parser failures.

    fn lower_integer(&mut self, span: Span, text: Name) -> CoreId {
        let raw = self.interner.lookup(text);
        match parse_integer(raw) {
            Some(value) => self.push(CoreKind::Lit(Lit::Int(value)), span),
            None => {
                self.report(
                    Diagnostic::error(ErrorCode::E4002)
                        .with_message(format!("invalid integer literal `{raw}`"))
                        .with_label(span, "not a valid integer")
                        .with_note("integer literals must fit in 64 bits"),
                );
                self.push(CoreKind::Lit(Lit::Int(0)), span)
            }
        }
    }

    fn lower_float(&mut self, span: Span, text: Name) -> CoreId {
        let raw = self.interner.lookup(text);
        let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
        match cleaned.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                self.push(CoreKind::Lit(Lit::float(value)), span)
            }
            _ => {
                self.report(
                    Diagnostic::error(ErrorCode::E4003)
                        .with_message(format!("invalid float literal `{raw}`"))
                        .with_label(span, "not a valid float"),
                );
                self.push(CoreKind::Lit(Lit::float(0.0)), span)
            }
        }
    }
}

/// Parse Ruby integer literal text: underscores, `0x`/`0b`/`0o` prefixes,
/// and the bare leading-zero octal form.
fn parse_integer(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let (digits, radix) = if let Some(rest) =
        cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X"))
    {
        (rest, 16)
    } else if let Some(rest) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        (rest, 8)
    } else if cleaned.len() > 1 && cleaned.starts_with('0') {
        (&cleaned[1..], 8)
    } else {
        (cleaned.as_str(), 10)
    };
    i64::from_str_radix(digits, radix).ok()
}
