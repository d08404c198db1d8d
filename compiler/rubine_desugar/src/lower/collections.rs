//! Collection lowering: array and hash literals, splat expansion chains,
//! string interpolation, regexps, and ranges.

use rubine_diagnostic::{Diagnostic, ErrorCode};
use rubine_ir::{build, CoreId, CoreKind, CorePair, Lit, Name, NodeId, NodeKind, NodeRange, Span};

use crate::dup_keys::DupKeyTracker;

use super::{Ctx, Lowerer};

/// One element of an argument list or array literal with splats: either an
/// already-lowered single value or an already-lowered splatted collection.
pub(crate) enum SplatElem {
    Plain(CoreId),
    Splat(CoreId),
}

impl Lowerer<'_> {
    /// `[a, *b, c]`
    pub(crate) fn lower_array(&mut self, span: Span, elements: NodeRange, ctx: Ctx) -> CoreId {
        let elements = self.src.list(elements).to_vec();
        self.lower_array_elems(span, &elements, ctx)
    }

    pub(crate) fn lower_array_elems(
        &mut self,
        span: Span,
        elements: &[NodeId],
        ctx: Ctx,
    ) -> CoreId {
        let mut elems: Vec<SplatElem> = Vec::with_capacity(elements.len());
        for &element in elements {
            match *self.src.kind(element) {
                NodeKind::Splat { value } => {
                    if value.is_valid() {
                        let value = self.lower_expr(value, ctx);
                        elems.push(SplatElem::Splat(value));
                    } else {
                        return self.internal_error(
                            self.src.span(element),
                            "bare splat in an array literal",
                        );
                    }
                }
                _ => {
                    let value = self.lower_expr(element, ctx);
                    elems.push(SplatElem::Plain(value));
                }
            }
        }
        self.concat_chain(span, elems)
    }

    /// Build the minimal concat chain over plain runs and splats:
    /// `[a, *b, c]` becomes `[a].concat(b).concat([c])`. A leading splat
    /// starts the chain with the `<splat>` primitive so the splatted source
    /// itself is never mutated. No splats at all builds one `ArrayLit`.
    pub(crate) fn concat_chain(&mut self, span: Span, elems: Vec<SplatElem>) -> CoreId {
        let syn = span.zero_len();
        let mut acc: Option<CoreId> = None;
        let mut run: Vec<CoreId> = Vec::new();

        for elem in elems {
            match elem {
                SplatElem::Plain(value) => run.push(value),
                SplatElem::Splat(value) => {
                    match acc.take() {
                        None if run.is_empty() => {
                            acc = Some(self.magic(syn, self.sel_splat, &[value]));
                        }
                        None => {
                            let lead = build::array(&mut self.arena, span, &run);
                            run.clear();
                            acc = Some(build::send(
                                &mut self.arena,
                                span,
                                lead,
                                self.name_concat,
                                &[value],
                            ));
                        }
                        Some(prev) => {
                            let prev = self.flush_run(span, prev, &mut run);
                            acc = Some(build::send(
                                &mut self.arena,
                                span,
                                prev,
                                self.name_concat,
                                &[value],
                            ));
                        }
                    }
                }
            }
        }

        match acc {
            None => build::array(&mut self.arena, span, &run),
            Some(prev) => self.flush_run(span, prev, &mut run),
        }
    }

    /// Concat a pending plain run onto the accumulator, if any.
    fn flush_run(&mut self, span: Span, acc: CoreId, run: &mut Vec<CoreId>) -> CoreId {
        if run.is_empty() {
            return acc;
        }
        let tail = build::array(&mut self.arena, span, run);
        run.clear();
        build::send(&mut self.arena, span, acc, self.name_concat, &[tail])
    }

    /// `{k => v, **h}` — plain pairs build one `HashLit`; double-splats
    /// trigger the duplicate-then-merge chain so the literal's own sources
    /// are never mutated in place.
    pub(crate) fn lower_hash(&mut self, span: Span, pairs: NodeRange, ctx: Ctx) -> CoreId {
        let entries = self.src.list(pairs).to_vec();
        let mut tracker = DupKeyTracker::new();

        // Sources for the merge chain: literal-pair groups and splatted
        // hash expressions, in source order.
        let mut sources: Vec<CoreId> = Vec::new();
        let mut group: Vec<CorePair> = Vec::new();
        let mut has_splat = false;

        for entry in entries {
            let espan = self.src.span(entry);
            match *self.src.kind(entry) {
                NodeKind::Pair { key, value } => {
                    self.check_dup_key(&mut tracker, key, espan);
                    let key = self.lower_expr(key, ctx);
                    let value = self.lower_expr(value, ctx);
                    group.push(CorePair { key, value });
                }
                NodeKind::KwSplat { value } => {
                    has_splat = true;
                    if !group.is_empty() {
                        let pairs = self.arena.alloc_pairs(group.drain(..));
                        sources.push(self.push(CoreKind::HashLit(pairs), span));
                    }
                    sources.push(self.lower_expr(value, ctx));
                }
                NodeKind::ForwardedKwRest => {
                    has_splat = true;
                    if !group.is_empty() {
                        let pairs = self.arena.alloc_pairs(group.drain(..));
                        sources.push(self.push(CoreKind::HashLit(pairs), span));
                    }
                    sources.push(build::local(&mut self.arena, espan, self.name_kwrest));
                }
                _ => {
                    return self.internal_error(espan, "non-pair entry in a hash literal");
                }
            }
        }

        if !has_splat {
            let pairs = self.arena.alloc_pairs(group);
            return self.push(CoreKind::HashLit(pairs), span);
        }
        if !group.is_empty() {
            let pairs = self.arena.alloc_pairs(group);
            sources.push(self.push(CoreKind::HashLit(pairs), span));
        }

        // acc = <to-hash-dup>(s1); acc = <merge-hash>(acc, <to-hash-nodup>(sN))
        let mut iter = sources.into_iter();
        let Some(first) = iter.next() else {
            return self.internal_error(span, "splat hash without sources");
        };
        let mut acc = self.magic(span, self.sel_to_hash_dup, &[first]);
        for source in iter {
            let nodup = self.magic(span, self.sel_to_hash_nodup, &[source]);
            acc = self.magic(span, self.sel_merge_hash, &[acc, nodup]);
        }
        acc
    }

    fn check_dup_key(&mut self, tracker: &mut DupKeyTracker, key: NodeId, entry: Span) {
        let span = self.src.span(key);
        let first = match *self.src.kind(key) {
            NodeKind::Sym(name) => tracker.record_sym(name, span),
            NodeKind::Str(name) => tracker.record_str(name, span),
            _ => None,
        };
        if let Some(first) = first {
            self.report(
                Diagnostic::warning(ErrorCode::E4004)
                    .with_message("duplicate key in hash literal")
                    .with_label(span, "this key overwrites an earlier entry")
                    .with_secondary_label(first, "first used here")
                    .with_fix("remove the duplicate entry", entry, ""),
            );
        }
    }

    /// Interpolated string parts. A single literal part collapses back to a
    /// plain string; everything else routes through the runtime primitive.
    pub(crate) fn lower_interpolation(
        &mut self,
        span: Span,
        parts: NodeRange,
        ctx: Ctx,
    ) -> CoreId {
        let parts = self.src.list(parts).to_vec();
        match parts.as_slice() {
            [] => self.push(CoreKind::Lit(Lit::Str(Name::EMPTY)), span),
            [single] if matches!(*self.src.kind(*single), NodeKind::Str(_)) => {
                self.lower_expr(*single, ctx)
            }
            _ => {
                let lowered: Vec<CoreId> =
                    parts.into_iter().map(|p| self.lower_expr(p, ctx)).collect();
                self.magic(span, self.sel_string_interpolate, &lowered)
            }
        }
    }

    /// `/pat#{expr}/flags` → `<regexp-new>(parts..., "flags")`
    pub(crate) fn lower_regexp(
        &mut self,
        span: Span,
        parts: NodeRange,
        opts: Name,
        ctx: Ctx,
    ) -> CoreId {
        let parts = self.src.list(parts).to_vec();
        let mut args: Vec<CoreId> = Vec::with_capacity(parts.len() + 1);
        for part in parts {
            args.push(self.lower_expr(part, ctx));
        }
        args.push(self.push(CoreKind::Lit(Lit::Str(opts)), span.zero_len()));
        self.magic(span, self.sel_regexp_new, &args)
    }

    /// `a..b` / `a...b` — beginless and endless ends become nil.
    pub(crate) fn lower_range(
        &mut self,
        span: Span,
        from: NodeId,
        to: NodeId,
        exclusive: bool,
        ctx: Ctx,
    ) -> CoreId {
        let syn = span.zero_len();
        let from = if from.is_valid() {
            self.lower_expr(from, ctx)
        } else {
            build::nil(&mut self.arena, syn)
        };
        let to = if to.is_valid() {
            self.lower_expr(to, ctx)
        } else {
            build::nil(&mut self.arena, syn)
        };
        let excl = if exclusive {
            build::true_(&mut self.arena, syn)
        } else {
            self.push(CoreKind::Lit(Lit::False), syn)
        };
        self.magic(span, self.sel_build_range, &[from, to, excl])
    }
}
