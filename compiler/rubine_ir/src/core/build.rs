//! Smart constructors for core IR nodes.
//!
//! Thin helpers the desugarer uses to assemble well-formed core nodes from
//! already-lowered children, keeping location bookkeeping in one place.
//! Anything synthesized (no user-authored counterpart) should be built with
//! a zero-length span via [`crate::Span::zero_len`] at the call site.

use crate::{CoreArena, CoreId, CoreKind, Lit, Name, Span};

/// `nil` literal.
pub fn nil(arena: &mut CoreArena, span: Span) -> CoreId {
    arena.push(CoreKind::Lit(Lit::Nil), span)
}

/// `true` literal.
pub fn true_(arena: &mut CoreArena, span: Span) -> CoreId {
    arena.push(CoreKind::Lit(Lit::True), span)
}

/// Integer literal.
pub fn int(arena: &mut CoreArena, span: Span, value: i64) -> CoreId {
    arena.push(CoreKind::Lit(Lit::Int(value)), span)
}

/// Symbol literal.
pub fn sym(arena: &mut CoreArena, span: Span, name: Name) -> CoreId {
    arena.push(CoreKind::Lit(Lit::Sym(name)), span)
}

/// Local variable read.
pub fn local(arena: &mut CoreArena, span: Span, name: Name) -> CoreId {
    arena.push(CoreKind::LocalRef(name), span)
}

/// Local variable write.
pub fn local_asgn(arena: &mut CoreArena, span: Span, name: Name, value: CoreId) -> CoreId {
    arena.push(CoreKind::LocalAsgn { name, value }, span)
}

/// The no-op sentinel.
pub fn empty(arena: &mut CoreArena, span: Span) -> CoreId {
    arena.push(CoreKind::EmptyTree, span)
}

/// Plain send with positional arguments only.
pub fn send(
    arena: &mut CoreArena,
    span: Span,
    recv: CoreId,
    selector: Name,
    args: &[CoreId],
) -> CoreId {
    let args = arena.alloc_list(args.iter().copied());
    arena.push(
        CoreKind::Send {
            recv,
            selector,
            args,
            kwargs: CoreId::INVALID,
            block: CoreId::INVALID,
        },
        span,
    )
}

/// Lexically-scoped constant reference.
pub fn const_ref(arena: &mut CoreArena, span: Span, name: Name) -> CoreId {
    arena.push(
        CoreKind::ConstRef {
            scope: CoreId::INVALID,
            name,
        },
        span,
    )
}

/// Send to a runtime primitive: `<Magic>.selector(args)`.
///
/// `magic` is the pre-interned `<Magic>` constant name; the reserved
/// receiver is synthesized with a zero-length span.
pub fn magic_send(
    arena: &mut CoreArena,
    span: Span,
    magic: Name,
    selector: Name,
    args: &[CoreId],
) -> CoreId {
    let recv = const_ref(arena, span.zero_len(), magic);
    send(arena, span, recv, selector, args)
}

/// Two-way conditional.
pub fn if_(arena: &mut CoreArena, span: Span, cond: CoreId, then_: CoreId, else_: CoreId) -> CoreId {
    arena.push(CoreKind::If { cond, then_, else_ }, span)
}

/// Instruction sequence from a non-empty statement list; the last element
/// becomes the value-producing result. An empty list becomes `EmptyTree`.
pub fn seq(arena: &mut CoreArena, span: Span, mut stmts: Vec<CoreId>) -> CoreId {
    match stmts.len() {
        0 => empty(arena, span),
        1 => stmts[0],
        _ => {
            let result = match stmts.pop() {
                Some(id) => id,
                None => return empty(arena, span),
            };
            let stmts = arena.alloc_list(stmts);
            arena.push(CoreKind::Seq { stmts, result }, span)
        }
    }
}

/// Array literal from already-lowered elements.
pub fn array(arena: &mut CoreArena, span: Span, elems: &[CoreId]) -> CoreId {
    let range = arena.alloc_list(elems.iter().copied());
    arena.push(CoreKind::ArrayLit(range), span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_collapses_singletons() {
        let mut arena = CoreArena::new();
        let a = int(&mut arena, Span::new(0, 1), 1);
        assert_eq!(seq(&mut arena, Span::new(0, 1), vec![a]), a);
    }

    #[test]
    fn seq_splits_result() {
        let mut arena = CoreArena::new();
        let a = int(&mut arena, Span::new(0, 1), 1);
        let b = int(&mut arena, Span::new(3, 4), 2);
        let s = seq(&mut arena, Span::new(0, 4), vec![a, b]);
        match *arena.kind(s) {
            CoreKind::Seq { stmts, result } => {
                assert_eq!(arena.list(stmts), &[a]);
                assert_eq!(result, b);
            }
            ref other => panic!("expected Seq, got {other:?}"),
        }
    }

    #[test]
    fn magic_send_shape() {
        let mut arena = CoreArena::new();
        let magic = Name::new(0, 9);
        let selector = Name::new(0, 10);
        let arg = nil(&mut arena, Span::DUMMY);
        let id = magic_send(&mut arena, Span::new(2, 9), magic, selector, &[arg]);
        match *arena.kind(id) {
            CoreKind::Send { recv, selector: sel, args, .. } => {
                assert_eq!(sel, selector);
                assert_eq!(arena.list(args), &[arg]);
                assert!(matches!(
                    *arena.kind(recv),
                    CoreKind::ConstRef { name, .. } if name == magic
                ));
                assert!(arena.span(recv).is_empty());
            }
            ref other => panic!("expected Send, got {other:?}"),
        }
    }
}
