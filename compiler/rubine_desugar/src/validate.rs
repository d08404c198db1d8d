//! Debug-build sanity walk over a freshly lowered core tree.
//!
//! Checks every node reference and range for bounds, so a lowering bug
//! surfaces at the end of the pass instead of as a mystery index panic in a
//! later phase. Compiled into debug builds only.

#![cfg(debug_assertions)]

use rubine_ir::{CoreArena, CoreId, CoreKind};

fn check(arena: &CoreArena, id: CoreId) {
    debug_assert!(id.is_valid(), "required child is INVALID");
    debug_assert!(id.index() < arena.len(), "child {id:?} out of bounds");
}

fn check_opt(arena: &CoreArena, id: CoreId) {
    if id.is_valid() {
        debug_assert!(id.index() < arena.len(), "child {id:?} out of bounds");
    }
}

pub(crate) fn validate(arena: &CoreArena, root: CoreId) {
    check(arena, root);

    for index in 0..arena.len() {
        let Ok(raw) = u32::try_from(index) else {
            return;
        };
        let id = CoreId::new(raw);
        match *arena.kind(id) {
            CoreKind::Lit(_)
            | CoreKind::LocalRef(_)
            | CoreKind::IdentRef { .. }
            | CoreKind::Retry
            | CoreKind::EmptyTree => {}
            CoreKind::LocalAsgn { value, .. } | CoreKind::IdentAsgn { value, .. } => {
                check_opt(arena, value);
            }
            CoreKind::ConstRef { scope, .. } => check_opt(arena, scope),
            CoreKind::ConstAsgn { scope, value, .. } => {
                check_opt(arena, scope);
                check(arena, value);
            }
            CoreKind::Send {
                recv,
                args,
                kwargs,
                block,
                ..
            } => {
                check_opt(arena, recv);
                for &arg in arena.list(args) {
                    check(arena, arg);
                }
                check_opt(arena, kwargs);
                check_opt(arena, block);
            }
            CoreKind::BlockFn { params, body } => {
                for param in arena.params(params) {
                    check_opt(arena, param.default);
                }
                check_opt(arena, body);
            }
            CoreKind::If { cond, then_, else_ } => {
                check(arena, cond);
                check_opt(arena, then_);
                check_opt(arena, else_);
            }
            CoreKind::While { cond, body } => {
                check(arena, cond);
                check_opt(arena, body);
            }
            CoreKind::Seq { stmts, result } => {
                for &stmt in arena.list(stmts) {
                    check(arena, stmt);
                }
                check(arena, result);
            }
            CoreKind::ArrayLit(elems) => {
                for &elem in arena.list(elems) {
                    check(arena, elem);
                }
            }
            CoreKind::HashLit(pairs) => {
                for pair in arena.pairs(pairs) {
                    check(arena, pair.key);
                    check(arena, pair.value);
                }
            }
            CoreKind::Rescue {
                body,
                cases,
                else_,
                ensure_,
            } => {
                check_opt(arena, body);
                for &case in arena.list(cases) {
                    check(arena, case);
                    debug_assert!(
                        matches!(*arena.kind(case), CoreKind::RescueCase { .. }),
                        "rescue case {case:?} has the wrong kind"
                    );
                }
                check_opt(arena, else_);
                check_opt(arena, ensure_);
            }
            CoreKind::RescueCase {
                exceptions,
                binder,
                body,
            } => {
                for &exception in arena.list(exceptions) {
                    check(arena, exception);
                }
                check(arena, binder);
                check_opt(arena, body);
            }
            CoreKind::Return { value } | CoreKind::Break { value } | CoreKind::Next { value } => {
                check_opt(arena, value);
            }
            CoreKind::MethodDef { params, body, .. } => {
                for param in arena.params(params) {
                    check_opt(arena, param.default);
                }
                check_opt(arena, body);
            }
            CoreKind::ClassDef {
                name,
                superclass,
                body,
                ..
            } => {
                check(arena, name);
                check_opt(arena, superclass);
                for &stmt in arena.list(body) {
                    check(arena, stmt);
                }
            }
        }
    }
}
