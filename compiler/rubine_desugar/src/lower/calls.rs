//! Call lowering: sends, safe navigation, argument lists, blocks, formal
//! parameters, `yield`, and `super`.
//!
//! The argument pipeline peels at most one trailing block-pass, inlines a
//! trailing keyword-syntax hash as keyword arguments, and falls back to the
//! `<call-with-splat>` family of primitives whenever the positional argument
//! count is not statically known.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, CoreId, CoreKind, CoreParam, Name, NodeId, NodeKind, NodeRange,
                ParamKind, ParamRange, Span};

use super::collections::SplatElem;
use super::{Ctx, Lowerer};

/// Unlowered block literal captured from a surface `Block` node.
#[derive(Copy, Clone)]
pub(crate) struct BlockLiteral {
    pub(crate) params: NodeId,
    pub(crate) body: NodeId,
}

/// Receiver of a call being lowered.
#[derive(Copy, Clone)]
enum Recv {
    /// Private self call (`foo(1)`).
    SelfImplicit,
    /// Ordinary receiver expression, not yet lowered.
    Node(NodeId),
    /// Already bound to a temporary or reserved local.
    Bound(Name),
}

impl Lowerer<'_> {
    /// `recv.selector(args)` / `recv&.selector(args)`, optionally with an
    /// attached block literal.
    pub(crate) fn lower_call(
        &mut self,
        span: Span,
        recv: NodeId,
        selector: Name,
        args: NodeRange,
        is_csend: bool,
        block: Option<BlockLiteral>,
        ctx: Ctx,
    ) -> CoreId {
        if is_csend {
            // `recv&.m` binds the receiver once, checks it against nil with
            // the identity primitive, and calls on the temporary otherwise.
            // The two-branch shape is relied on by the op-assign rule.
            let syn = span.zero_len();
            let lowered = self.lower_expr(recv, ctx);
            let tmp = self.fresh("csend", ctx);
            let bind = build::local_asgn(&mut self.arena, syn, tmp, lowered);
            let tref = build::local(&mut self.arena, syn, tmp);
            let is_nil = self.magic(syn, self.sel_nil_p, &[tref]);
            let nil_branch = build::nil(&mut self.arena, syn);
            let call = self.lower_call_parts(span, Recv::Bound(tmp), selector, args, block, ctx);
            let cond = build::if_(&mut self.arena, span, is_nil, nil_branch, call);
            return build::seq(&mut self.arena, span, vec![bind, cond]);
        }

        let recv = if recv.is_valid() {
            Recv::Node(recv)
        } else {
            Recv::SelfImplicit
        };
        self.lower_call_parts(span, recv, selector, args, block, ctx)
    }

    /// `yield args` → call the enclosing method's block parameter.
    pub(crate) fn lower_yield(&mut self, span: Span, args: NodeRange, ctx: Ctx) -> CoreId {
        let blk = if ctx.block_param == Name::EMPTY {
            self.yield_without_block(span, ctx);
            self.name_blk
        } else {
            ctx.block_param
        };
        self.lower_call_parts(span, Recv::Bound(blk), self.name_call, args, None, ctx)
    }

    /// `yield` with no declared block parameter. The method still gets the
    /// implicit `<blk>`, so the call lowers either way; repeated yields in
    /// one method collapse through queue deduplication.
    fn yield_without_block(&mut self, span: Span, ctx: Ctx) {
        if ctx.method_name == Name::EMPTY {
            self.report(
                Diagnostic::error(ErrorCode::E4011)
                    .with_message("`yield` used outside of a method")
                    .with_label(span, "there is no enclosing method to supply a block"),
            );
            return;
        }
        let name = self.interner.lookup(ctx.method_name);
        self.report(
            Diagnostic::error(ErrorCode::E4011)
                .with_message(format!(
                    "method `{name}` uses `yield` but declares no block parameter"
                ))
                .with_label(ctx.method_span, "this method never names its block")
                .with_secondary_label(span, "`yield` used here")
                .with_note("declare `&blk` in the parameter list"),
        );
    }

    /// `super(args)` — an ordinary send of the reserved `<super>` selector
    /// to self, so later phases can resolve it against the enclosing method.
    pub(crate) fn lower_super(
        &mut self,
        span: Span,
        args: NodeRange,
        block: Option<BlockLiteral>,
        ctx: Ctx,
    ) -> CoreId {
        let selector = self.name_super;
        self.lower_call_parts(span, Recv::Bound(self.name_self), selector, args, block, ctx)
    }

    /// Bare `super` forwards the enclosing method's arguments implicitly. A
    /// module body has no method to forward from, and a block's own
    /// parameters shadow the method's, so both cases get the untyped form.
    pub(crate) fn zsuper_selector(&self, ctx: Ctx) -> Name {
        if ctx.in_module_body || ctx.in_block {
            self.name_zsuper_untyped
        } else {
            self.name_zsuper
        }
    }

    /// Bare `super` with a block literal attached.
    fn lower_zsuper(&mut self, span: Span, block: BlockLiteral, ctx: Ctx) -> CoreId {
        let recv = self.self_ref(span.zero_len());
        let selector = self.zsuper_selector(ctx);
        let lowered_block = self.lower_block_fn(span, block, ctx);
        let args = self.arena.alloc_list([]);
        self.push(
            CoreKind::Send {
                recv,
                selector,
                args,
                kwargs: CoreId::INVALID,
                block: lowered_block,
            },
            span,
        )
    }

    /// Surface `Block` node: route the block literal to whatever call shape
    /// it is attached to.
    pub(crate) fn lower_block(
        &mut self,
        span: Span,
        call: NodeId,
        params: NodeId,
        body: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let literal = BlockLiteral { params, body };
        match *self.src.kind(call) {
            NodeKind::Send {
                recv,
                selector,
                args,
            } => self.lower_call(span, recv, selector, args, false, Some(literal), ctx),
            NodeKind::CSend {
                recv,
                selector,
                args,
            } => self.lower_call(span, recv, selector, args, true, Some(literal), ctx),
            NodeKind::Super { args } => self.lower_super(span, args, Some(literal), ctx),
            NodeKind::ZSuper => self.lower_zsuper(span, literal, ctx),
            _ => self.unsupported(span, "block attached to this construct"),
        }
    }

    /// Lower a block literal to a `BlockFn`.
    fn lower_block_fn(&mut self, span: Span, block: BlockLiteral, ctx: Ctx) -> CoreId {
        let (params, _) = self.lower_params(block.params, false, ctx);
        let mut block_ctx = ctx;
        block_ctx.in_block = true;
        let body = self.lower_optional(block.body, block_ctx);
        self.push(CoreKind::BlockFn { params, body }, span)
    }

    fn lower_call_parts(
        &mut self,
        span: Span,
        recv: Recv,
        selector: Name,
        args: NodeRange,
        block: Option<BlockLiteral>,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();
        let mut args = self.src.list(args).to_vec();

        // At most one block-pass, and only in the final position.
        let mut block_pass: Option<NodeId> = None;
        if let Some(&last) = args.last() {
            if matches!(*self.src.kind(last), NodeKind::BlockPass { .. }) {
                args.pop();
                block_pass = Some(last);
            }
        }
        if args
            .iter()
            .any(|&a| matches!(*self.src.kind(a), NodeKind::BlockPass { .. }))
        {
            return self.internal_error(span, "block-pass before the final argument");
        }
        if block.is_some() && block_pass.is_some() {
            return self.internal_error(span, "both a block literal and a block-pass");
        }

        // `...` forwards positionals, keywords, and the block in one marker.
        let forwards_all = args
            .iter()
            .any(|&a| matches!(*self.src.kind(a), NodeKind::ForwardedArgs));

        // A trailing keyword-syntax hash of plain pairs inlines as keyword
        // arguments; one carrying a double-splat stays a single opaque
        // argument so its merge order is preserved.
        let mut kwargs = CoreId::INVALID;
        if let Some(&last) = args.last() {
            if let NodeKind::Hash {
                pairs,
                braces: false,
            } = *self.src.kind(last)
            {
                let plain = self
                    .src
                    .list(pairs)
                    .iter()
                    .all(|&p| matches!(*self.src.kind(p), NodeKind::Pair { .. }));
                if plain {
                    args.pop();
                    kwargs = self.lower_hash(self.src.span(last), pairs, ctx);
                }
            }
        }

        let has_splat = args.iter().any(|&a| {
            matches!(
                *self.src.kind(a),
                NodeKind::Splat { .. } | NodeKind::ForwardedArgs | NodeKind::ForwardedRest
            )
        });

        if has_splat {
            return self.lower_splat_call(
                span, recv, selector, &args, kwargs, block, block_pass, forwards_all, ctx,
            );
        }

        let recv = self.lower_recv(syn, recv, ctx);
        let mut lowered: Vec<CoreId> = Vec::with_capacity(args.len());
        for arg in args {
            lowered.push(self.lower_arg(arg, ctx));
        }

        if let Some(pass) = block_pass {
            return self
                .lower_block_pass_call(span, recv, selector, &lowered, kwargs, pass, ctx);
        }

        let block = match block {
            Some(literal) => self.lower_block_fn(span, literal, ctx),
            None => CoreId::INVALID,
        };
        let args = self.arena.alloc_list(lowered);
        self.push(
            CoreKind::Send {
                recv,
                selector,
                args,
                kwargs,
                block,
            },
            span,
        )
    }

    fn lower_recv(&mut self, syn: Span, recv: Recv, ctx: Ctx) -> CoreId {
        match recv {
            Recv::SelfImplicit => CoreId::INVALID,
            Recv::Node(id) => self.lower_expr(id, ctx),
            Recv::Bound(name) => build::local(&mut self.arena, syn, name),
        }
    }

    /// Like [`Self::lower_recv`], but a private self call still needs a
    /// concrete receiver value for the primitive's argument list.
    fn lower_recv_value(&mut self, syn: Span, recv: Recv, ctx: Ctx) -> CoreId {
        match recv {
            Recv::SelfImplicit => self.self_ref(syn),
            Recv::Node(id) => self.lower_expr(id, ctx),
            Recv::Bound(name) => build::local(&mut self.arena, syn, name),
        }
    }

    /// One positional argument outside the splat path. Forwarding markers
    /// read the reserved forwarding locals bound at the declaration site.
    fn lower_arg(&mut self, arg: NodeId, ctx: Ctx) -> CoreId {
        let span = self.src.span(arg);
        match *self.src.kind(arg) {
            NodeKind::ForwardedKwRest => build::local(&mut self.arena, span, self.name_fwd_kwargs),
            _ => self.lower_expr(arg, ctx),
        }
    }

    /// Statically-unknown arity: assemble the positional arguments into one
    /// array value, then call through the splat primitive.
    #[expect(clippy::too_many_arguments, reason = "one pipeline stage per argument")]
    fn lower_splat_call(
        &mut self,
        span: Span,
        recv: Recv,
        selector: Name,
        args: &[NodeId],
        kwargs: CoreId,
        block: Option<BlockLiteral>,
        block_pass: Option<NodeId>,
        forwards_all: bool,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();

        let mut elems: Vec<SplatElem> = Vec::with_capacity(args.len());
        for &arg in args {
            let aspan = self.src.span(arg);
            match *self.src.kind(arg) {
                NodeKind::Splat { value } => {
                    if value.is_valid() {
                        let value = self.lower_expr(value, ctx);
                        elems.push(SplatElem::Splat(value));
                    } else {
                        return self
                            .internal_error(aspan, "bare splat in a call argument list");
                    }
                }
                NodeKind::ForwardedArgs => {
                    let read = build::local(&mut self.arena, aspan, self.name_fwd_args);
                    elems.push(SplatElem::Splat(read));
                }
                NodeKind::ForwardedRest => {
                    let read = build::local(&mut self.arena, aspan, self.name_rest);
                    elems.push(SplatElem::Splat(read));
                }
                _ => {
                    let value = self.lower_arg(arg, ctx);
                    elems.push(SplatElem::Plain(value));
                }
            }
        }
        let array = self.concat_chain(span, elems);

        let recv = self.lower_recv_value(syn, recv, ctx);
        let selector = build::sym(&mut self.arena, syn, selector);
        let kwrep = if forwards_all && !kwargs.is_valid() {
            build::local(&mut self.arena, syn, self.name_fwd_kwargs)
        } else if kwargs.is_valid() {
            kwargs
        } else {
            build::nil(&mut self.arena, syn)
        };

        let block_value = match block_pass {
            Some(pass) => Some(self.lower_block_pass_value(pass, ctx)),
            None if forwards_all => {
                Some(build::local(&mut self.arena, syn, self.name_fwd_block))
            }
            None => None,
        };

        match block_value {
            Some(block_value) => self.magic(
                span,
                self.sel_call_with_splat_and_block,
                &[recv, selector, array, kwrep, block_value],
            ),
            None => {
                let call = self.magic(
                    span,
                    self.sel_call_with_splat,
                    &[recv, selector, array, kwrep],
                );
                if let Some(literal) = block {
                    let lowered = self.lower_block_fn(span, literal, ctx);
                    self.attach_block(call, lowered, span)
                } else {
                    call
                }
            }
        }
    }

    /// Rebuild a lowered send with a block attached. The send was just
    /// produced by the splat path, so its kind is known.
    fn attach_block(&mut self, call: CoreId, block: CoreId, span: Span) -> CoreId {
        let CoreKind::Send {
            recv,
            selector,
            args,
            kwargs,
            ..
        } = *self.arena.kind(call)
        else {
            return self.internal_error(span, "splat primitive changed shape");
        };
        self.push(
            CoreKind::Send {
                recv,
                selector,
                args,
                kwargs,
                block,
            },
            span,
        )
    }

    /// Fixed-arity call with a block-pass argument.
    ///
    /// `&:sym` synthesizes the symbol-to-proc block; anything else routes
    /// through the `<call-with-block>` primitive so the runtime can convert
    /// the passed value.
    #[expect(clippy::too_many_arguments, reason = "one pipeline stage per argument")]
    fn lower_block_pass_call(
        &mut self,
        span: Span,
        recv: CoreId,
        selector: Name,
        args: &[CoreId],
        kwargs: CoreId,
        pass: NodeId,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();

        // `&:sym` — one required parameter plus a variadic rest, calling
        // `sym` on the first argument and forwarding the rest.
        if let NodeKind::BlockPass { value } = *self.src.kind(pass) {
            if value.is_valid() {
                if let NodeKind::Sym(name) = *self.src.kind(value) {
                    let block = self.symbol_to_proc(self.src.span(value), name, ctx);
                    let args = self.arena.alloc_list(args.iter().copied());
                    return self.push(
                        CoreKind::Send {
                            recv,
                            selector,
                            args,
                            kwargs,
                            block,
                        },
                        span,
                    );
                }
            }
        }

        let block_value = self.lower_block_pass_value(pass, ctx);

        let recv = if recv.is_valid() {
            recv
        } else {
            self.self_ref(syn)
        };
        let selector = build::sym(&mut self.arena, syn, selector);
        let mut magic_args = vec![recv, selector, block_value];
        magic_args.extend_from_slice(args);
        if kwargs.is_valid() {
            magic_args.push(kwargs);
        }
        self.magic(span, self.sel_call_with_block, &magic_args)
    }

    /// The value carried by a block-pass argument. Anonymous `&` forwards
    /// the enclosing anonymous block parameter.
    fn lower_block_pass_value(&mut self, pass: NodeId, ctx: Ctx) -> CoreId {
        let span = self.src.span(pass);
        let NodeKind::BlockPass { value } = *self.src.kind(pass) else {
            return self.internal_error(span, "block-pass argument changed shape");
        };
        if value.is_valid() {
            self.lower_expr(value, ctx)
        } else {
            build::local(&mut self.arena, span, self.name_blk)
        }
    }

    /// `&:name` → `{ |tmp, *rest| tmp.name(*rest) }`
    fn symbol_to_proc(&mut self, span: Span, name: Name, ctx: Ctx) -> CoreId {
        let syn = span.zero_len();
        let first = self.fresh("toProc", ctx);
        let rest = self.fresh("toProc", ctx);
        let params = self.arena.alloc_params([
            CoreParam::plain(ParamKind::Required, first),
            CoreParam::plain(ParamKind::Rest, rest),
        ]);
        let recv = build::local(&mut self.arena, syn, first);
        let selector = build::sym(&mut self.arena, syn, name);
        let rest_read = build::local(&mut self.arena, syn, rest);
        let nil = build::nil(&mut self.arena, syn);
        let body = self.magic(
            span,
            self.sel_call_with_splat,
            &[recv, selector, rest_read, nil],
        );
        self.push(CoreKind::BlockFn { params, body }, span)
    }

    /// Lower a formal parameter list.
    ///
    /// Returns the parameter range plus the explicit block parameter's name,
    /// `Name::EMPTY` when the declaration has none. Methods without one
    /// still get the implicit `<blk>` so `yield` always has something to
    /// call; blocks never do.
    pub(crate) fn lower_params(
        &mut self,
        params: NodeId,
        for_method: bool,
        ctx: Ctx,
    ) -> (ParamRange, Name) {
        let mut lowered: Vec<CoreParam> = Vec::new();
        let mut block_param = Name::EMPTY;

        if params.is_valid() {
            let span = self.src.span(params);
            match *self.src.kind(params) {
                NodeKind::NumParams { max } => {
                    for i in 1..=max {
                        let name = self.interner.intern_owned(format!("_{i}"));
                        lowered.push(CoreParam::plain(ParamKind::Required, name));
                    }
                }
                NodeKind::Params { list } => {
                    let list = self.src.list(list).to_vec();
                    for param in list {
                        self.lower_one_param(param, for_method, &mut lowered, &mut block_param, ctx);
                    }
                }
                _ => {
                    self.internal_error(span, "parameter list changed shape");
                }
            }
        }

        if for_method && block_param == Name::EMPTY {
            lowered.push(CoreParam::plain(ParamKind::Block, self.name_blk));
        }

        (self.arena.alloc_params(lowered), block_param)
    }

    fn lower_one_param(
        &mut self,
        param: NodeId,
        for_method: bool,
        out: &mut Vec<CoreParam>,
        block_param: &mut Name,
        ctx: Ctx,
    ) {
        let span = self.src.span(param);
        match *self.src.kind(param) {
            NodeKind::RequiredParam(name) => {
                out.push(CoreParam::plain(ParamKind::Required, name));
            }
            NodeKind::OptParam { name, default } => {
                let default = self.lower_expr(default, ctx);
                out.push(CoreParam {
                    kind: ParamKind::Optional,
                    name,
                    default,
                });
            }
            NodeKind::RestParam { name } => {
                let name = if name == Name::EMPTY {
                    if !for_method {
                        self.report(
                            Diagnostic::error(ErrorCode::E4006)
                                .with_message("anonymous rest parameter in a block")
                                .with_label(span, "blocks cannot declare an anonymous `*`")
                                .with_note("name the parameter to use it inside the block"),
                        );
                    }
                    self.name_rest
                } else {
                    name
                };
                out.push(CoreParam::plain(ParamKind::Rest, name));
            }
            NodeKind::KwParam(name) => {
                out.push(CoreParam::plain(ParamKind::Keyword, name));
            }
            NodeKind::KwOptParam { name, default } => {
                let default = self.lower_expr(default, ctx);
                out.push(CoreParam {
                    kind: ParamKind::KeywordOptional,
                    name,
                    default,
                });
            }
            NodeKind::KwRestParam { name } => {
                let name = if name == Name::EMPTY { self.name_kwrest } else { name };
                out.push(CoreParam::plain(ParamKind::KwRest, name));
            }
            NodeKind::BlockParam { name } => {
                let name = if name == Name::EMPTY { self.name_blk } else { name };
                *block_param = name;
                out.push(CoreParam::plain(ParamKind::Block, name));
            }
            NodeKind::ShadowParam(name) => {
                out.push(CoreParam::plain(ParamKind::Shadow, name));
            }
            NodeKind::ForwardParam => {
                out.push(CoreParam::plain(ParamKind::Rest, self.name_fwd_args));
                out.push(CoreParam::plain(ParamKind::KwRest, self.name_fwd_kwargs));
                *block_param = self.name_fwd_block;
                out.push(CoreParam::plain(ParamKind::Block, self.name_fwd_block));
            }
            _ => {
                self.internal_error(span, "non-parameter in a parameter list");
            }
        }
    }
}
