//! Behavior tests for the lowering pass, built on hand-assembled surface
//! arenas. Each test lowers one small unit and checks the shape of the
//! resulting core tree or the diagnostics it produced.

use pretty_assertions::assert_eq;
use rubine_diagnostic::{ErrorCode, Severity};
use rubine_ir::{CoreArena, CoreId, CoreKind, Lit, Name, NodeArena, NodeId, NodeKind, NodeRange,
                ParamKind, Span, StringInterner};

use crate::DesugarResult;

/// Surface-tree builder with auto-advancing spans, so every node gets a
/// distinct location and diagnostic dedup never collapses test output.
struct Src<'i> {
    arena: NodeArena,
    interner: &'i StringInterner,
    cursor: u32,
}

impl<'i> Src<'i> {
    fn new(interner: &'i StringInterner) -> Self {
        Src {
            arena: NodeArena::new(),
            interner,
            cursor: 0,
        }
    }

    fn name(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    fn node(&mut self, kind: NodeKind) -> NodeId {
        let start = self.cursor;
        self.cursor += 4;
        self.arena.alloc_kind(kind, Span::new(start, start + 3))
    }

    fn local(&mut self, name: &str) -> NodeId {
        let name = self.name(name);
        self.node(NodeKind::LocalRef(name))
    }

    fn int(&mut self, text: &str) -> NodeId {
        let text = self.name(text);
        self.node(NodeKind::Integer(text))
    }

    fn sym(&mut self, text: &str) -> NodeId {
        let text = self.name(text);
        self.node(NodeKind::Sym(text))
    }

    fn list(&mut self, ids: impl IntoIterator<Item = NodeId>) -> NodeRange {
        self.arena.alloc_list(ids)
    }

    fn send(&mut self, recv: NodeId, selector: &str, args: Vec<NodeId>) -> NodeId {
        let selector = self.name(selector);
        let args = self.list(args);
        self.node(NodeKind::Send {
            recv,
            selector,
            args,
        })
    }

    fn self_call(&mut self, selector: &str, args: Vec<NodeId>) -> NodeId {
        self.send(NodeId::INVALID, selector, args)
    }

    /// Bare local assignment target (as it appears in masgn/op-assign).
    fn local_target(&mut self, name: &str) -> NodeId {
        let name = self.name(name);
        self.node(NodeKind::LocalAsgn {
            name,
            value: NodeId::INVALID,
        })
    }

    fn lower(&self, root: NodeId) -> DesugarResult {
        self.lower_mode(root, false)
    }

    fn lower_mode(&self, root: NodeId, preserve_concrete_syntax: bool) -> DesugarResult {
        match crate::lower(&self.arena, root, self.interner, preserve_concrete_syntax) {
            Ok(result) => result,
            Err(err) => panic!("lowering failed: {err}"),
        }
    }
}

fn ids(arena: &CoreArena) -> Vec<CoreId> {
    (0..arena.len())
        .filter_map(|i| u32::try_from(i).ok().map(CoreId::new))
        .collect()
}

fn count_matching(arena: &CoreArena, pred: impl Fn(&CoreKind) -> bool) -> usize {
    ids(arena).into_iter().filter(|&id| pred(arena.kind(id))).count()
}

fn find_first(arena: &CoreArena, pred: impl Fn(&CoreKind) -> bool) -> Option<CoreId> {
    ids(arena).into_iter().find(|&id| pred(arena.kind(id)))
}

fn count_selector(arena: &CoreArena, selector: Name) -> usize {
    count_matching(arena, |kind| {
        matches!(*kind, CoreKind::Send { selector: s, .. } if s == selector)
    })
}

fn codes(result: &mut DesugarResult) -> Vec<ErrorCode> {
    result.diagnostics.flush().into_iter().map(|d| d.code).collect()
}

#[test]
fn empty_unit_still_gets_a_root_scope() {
    let interner = StringInterner::new();
    let src = Src::new(&interner);
    let result = src.lower(NodeId::INVALID);
    assert!(matches!(*result.arena.kind(result.root), CoreKind::ClassDef { .. }));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn root_scope_is_named_after_the_reserved_root() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let root = src.node(NodeKind::Nil);
    let result = src.lower(root);
    let CoreKind::ClassDef { name, body, .. } = *result.arena.kind(result.root) else {
        panic!("root is not a scope");
    };
    assert!(matches!(
        *result.arena.kind(name),
        CoreKind::ConstRef { name, .. } if interner.lookup(name) == "<root>"
    ));
    assert_eq!(result.arena.list(body).len(), 1);
}

#[test]
fn numeric_literals_parse_during_lowering() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let int = src.int("1_000");
    let float = {
        let text = src.name("2.5");
        src.node(NodeKind::Float(text))
    };
    let stmts = src.list([int, float]);
    let root = src.node(NodeKind::Begin { stmts });
    let result = src.lower(root);
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Int(1000))),
        1
    );
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::float(2.5))),
        1
    );
}

#[test]
fn malformed_integer_recovers_with_zero() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let root = src.int("0x");
    let mut result = src.lower(root);
    assert_eq!(codes(&mut result), vec![ErrorCode::E4002]);
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Int(0))),
        1
    );
}

#[test]
fn and_with_cheap_left_rereads_it() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let left = src.local("x");
    let right = src.local("y");
    let root = src.node(NodeKind::And { left, right });
    let result = src.lower(root);

    assert_eq!(count_matching(&result.arena, |k| matches!(k, CoreKind::LocalAsgn { .. })), 0);
    let x = interner.intern("x");
    let cond_if = find_first(&result.arena, |k| matches!(k, CoreKind::If { .. }));
    let Some(cond_if) = cond_if else { panic!("no conditional produced") };
    let CoreKind::If { cond, else_, .. } = *result.arena.kind(cond_if) else {
        unreachable!();
    };
    assert!(matches!(*result.arena.kind(cond), CoreKind::LocalRef(n) if n == x));
    assert!(matches!(*result.arena.kind(else_), CoreKind::LocalRef(n) if n == x));
}

#[test]
fn and_with_effectful_left_binds_a_temporary() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let left = src.self_call("probe", vec![]);
    let right = src.local("y");
    let root = src.node(NodeKind::And { left, right });
    let result = src.lower(root);

    let binds: Vec<Name> = ids(&result.arena)
        .into_iter()
        .filter_map(|id| match *result.arena.kind(id) {
            CoreKind::LocalAsgn { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(binds.len(), 1);
    assert!(interner.lookup(binds[0]).starts_with("<andAnd$"));
    assert_eq!(count_selector(&result.arena, interner.intern("probe")), 1);
}

#[test]
fn preserve_concrete_syntax_keeps_boolean_markers() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let left = src.local("x");
    let right = src.local("y");
    let root = src.node(NodeKind::And { left, right });
    let result = src.lower_mode(root, true);

    assert_eq!(count_selector(&result.arena, interner.intern("<and>")), 1);
    assert_eq!(count_matching(&result.arena, |k| matches!(k, CoreKind::If { .. })), 0);
}

#[test]
fn or_asgn_on_a_local_assigns_only_when_falsy() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let target = src.local_target("x");
    let value = src.int("1");
    let root = src.node(NodeKind::OrAsgn { target, value });
    let result = src.lower(root);

    let x = interner.intern("x");
    let Some(cond_if) = find_first(&result.arena, |k| matches!(k, CoreKind::If { .. })) else {
        panic!("no conditional produced");
    };
    let CoreKind::If { cond, then_, else_ } = *result.arena.kind(cond_if) else {
        unreachable!();
    };
    assert!(matches!(*result.arena.kind(cond), CoreKind::LocalRef(n) if n == x));
    assert!(matches!(*result.arena.kind(then_), CoreKind::LocalRef(n) if n == x));
    assert!(matches!(*result.arena.kind(else_), CoreKind::LocalAsgn { name, .. } if name == x));
}

#[test]
fn op_asgn_evaluates_call_receiver_once() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // lookup().count += 1
    let recv = src.self_call("lookup", vec![]);
    let args = src.list([]);
    let target = {
        let selector = src.name("count");
        src.node(NodeKind::Send {
            recv,
            selector,
            args,
        })
    };
    let op = src.name("+");
    let value = src.int("1");
    let root = src.node(NodeKind::OpAsgn { target, op, value });
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("lookup")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("count")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("count=")), 1);
}

#[test]
fn or_asgn_on_a_call_target_binds_an_op_asgn_temporary() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // a.b ||= 1
    let recv = src.local("a");
    let args = src.list([]);
    let target = {
        let selector = src.name("b");
        src.node(NodeKind::Send {
            recv,
            selector,
            args,
        })
    };
    let value = src.int("1");
    let root = src.node(NodeKind::OrAsgn { target, value });
    let result = src.lower(root);

    let binds: Vec<&str> = ids(&result.arena)
        .into_iter()
        .filter_map(|id| match *result.arena.kind(id) {
            CoreKind::LocalAsgn { name, .. } => Some(interner.lookup(name)),
            _ => None,
        })
        .collect();
    assert!(binds.iter().all(|n| n.starts_with("<opAsgn$")));
    assert!(!binds.is_empty());
}

#[test]
fn op_asgn_on_safe_navigation_shares_the_nil_check() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // a&.b += 1
    let recv = src.local("a");
    let args = src.list([]);
    let target = {
        let selector = src.name("b");
        src.node(NodeKind::CSend {
            recv,
            selector,
            args,
        })
    };
    let op = src.name("+");
    let value = src.int("1");
    let root = src.node(NodeKind::OpAsgn { target, op, value });
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("<nil-p>")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("b=")), 1);
    let Some(cond_if) = find_first(&result.arena, |k| matches!(k, CoreKind::If { .. })) else {
        panic!("no conditional produced");
    };
    let CoreKind::If { then_, .. } = *result.arena.kind(cond_if) else {
        unreachable!();
    };
    assert_eq!(*result.arena.kind(then_), CoreKind::Lit(Lit::Nil));
}

#[test]
fn op_asgn_on_a_constant_is_rejected() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let target = {
        let name = src.name("LIMIT");
        src.node(NodeKind::ConstAsgn {
            scope: NodeId::INVALID,
            name,
            value: NodeId::INVALID,
        })
    };
    let op = src.name("+");
    let value = src.int("1");
    let root = src.node(NodeKind::OpAsgn { target, op, value });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4005]);
    assert_eq!(
        count_selector(&result.arena, interner.intern("<suggest-constant>")),
        1
    );
}

#[test]
fn masgn_expands_once_and_evaluates_to_the_rhs() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // a, *b, c = xs
    let a = src.local_target("a");
    let b = src.local_target("b");
    let splat = src.node(NodeKind::Splat { value: b });
    let c = src.local_target("c");
    let targets = src.list([a, splat, c]);
    let lhs = src.node(NodeKind::Mlhs { targets });
    let rhs = src.local("xs");
    let root = src.node(NodeKind::Masgn { lhs, rhs });
    let result = src.lower(root);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<expand-splat>")),
        1
    );
    // One indexed read per target: a -> [0], *b -> [1, -2], c -> [-1].
    assert_eq!(count_selector(&result.arena, interner.intern("[]")), 3);
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Int(-1))),
        1
    );
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Int(-2))),
        1
    );

    let Some(seq) = find_first(&result.arena, |k| matches!(k, CoreKind::Seq { .. })) else {
        panic!("no sequence produced");
    };
    let CoreKind::Seq { result: value, .. } = *result.arena.kind(seq) else {
        unreachable!();
    };
    let CoreKind::LocalRef(name) = *result.arena.kind(value) else {
        panic!("masgn does not evaluate to the bound right-hand side");
    };
    assert!(interner.lookup(name).starts_with("<masgn$"));
}

#[test]
fn safe_navigation_produces_the_two_branch_shape() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let recv = src.local("a");
    let args = src.list([]);
    let root = {
        let selector = src.name("b");
        src.node(NodeKind::CSend {
            recv,
            selector,
            args,
        })
    };
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("<nil-p>")), 1);
    let Some(cond_if) = find_first(&result.arena, |k| matches!(k, CoreKind::If { .. })) else {
        panic!("no conditional produced");
    };
    let CoreKind::If { then_, else_, .. } = *result.arena.kind(cond_if) else {
        unreachable!();
    };
    assert_eq!(*result.arena.kind(then_), CoreKind::Lit(Lit::Nil));
    let CoreKind::Send { recv, selector, .. } = *result.arena.kind(else_) else {
        panic!("not-nil branch is not the original call");
    };
    assert_eq!(interner.lookup(selector), "b");
    let CoreKind::LocalRef(tmp) = *result.arena.kind(recv) else {
        panic!("call receiver is not the bound temporary");
    };
    assert!(interner.lookup(tmp).starts_with("<csend$"));
}

#[test]
fn case_chains_conditionals_over_one_scrutinee() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let scrutinee = src.local("x");
    let one = src.int("1");
    let two = src.int("2");
    let body = src.sym("small");
    let patterns = src.list([one, two]);
    let when = src.node(NodeKind::When { patterns, body });
    let whens = src.list([when]);
    let else_ = src.sym("other");
    let root = src.node(NodeKind::Case {
        scrutinee,
        whens,
        else_,
    });
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("===")), 2);
    let case_binds = ids(&result.arena)
        .into_iter()
        .filter(|&id| match *result.arena.kind(id) {
            CoreKind::LocalAsgn { name, .. } => interner.lookup(name).starts_with("<case$"),
            _ => false,
        })
        .count();
    assert_eq!(case_binds, 1);
    let other = interner.intern("other");
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Sym(other))),
        1
    );
}

#[test]
fn caseless_when_splat_tests_the_collection_for_a_truthy_element() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // case; when *conds then :hit; end
    let conds = src.local("conds");
    let splat = src.node(NodeKind::Splat { value: conds });
    let body = src.sym("hit");
    let patterns = src.list([splat]);
    let when = src.node(NodeKind::When { patterns, body });
    let whens = src.list([when]);
    let root = src.node(NodeKind::Case {
        scrutinee: NodeId::INVALID,
        whens,
        else_: NodeId::INVALID,
    });
    let mut result = src.lower(root);

    assert!(codes(&mut result).is_empty());
    assert_eq!(count_selector(&result.arena, interner.intern("any?")), 1);
    assert_eq!(
        count_selector(&result.arena, interner.intern("<check-match-array>")),
        0
    );
}

#[test]
fn until_negates_its_condition() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let cond = src.local("done");
    let body = src.self_call("step", vec![]);
    let root = src.node(NodeKind::Until { cond, body });
    let result = src.lower(root);

    let Some(while_) = find_first(&result.arena, |k| matches!(k, CoreKind::While { .. })) else {
        panic!("no loop produced");
    };
    let CoreKind::While { cond, .. } = *result.arena.kind(while_) else {
        unreachable!();
    };
    let CoreKind::Send { selector, .. } = *result.arena.kind(cond) else {
        panic!("until condition is not negated");
    };
    assert_eq!(interner.lookup(selector), "!");
}

#[test]
fn post_condition_loop_runs_the_body_first() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let cond = src.local("done");
    let body = src.self_call("step", vec![]);
    let root = src.node(NodeKind::UntilPost { cond, body });
    let result = src.lower(root);

    let Some(while_) = find_first(&result.arena, |k| matches!(k, CoreKind::While { .. })) else {
        panic!("no loop produced");
    };
    let CoreKind::While { cond, .. } = *result.arena.kind(while_) else {
        unreachable!();
    };
    assert_eq!(*result.arena.kind(cond), CoreKind::Lit(Lit::True));
    assert_eq!(
        count_matching(&result.arena, |k| matches!(k, CoreKind::Break { .. })),
        1
    );
}

#[test]
fn for_lowers_to_each_with_a_fresh_parameter() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let var = src.local_target("item");
    let collection = src.local("items");
    let body = src.self_call("handle", vec![]);
    let root = src.node(NodeKind::For {
        var,
        collection,
        body,
    });
    let result = src.lower(root);

    let Some(each) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "each")
    }) else {
        panic!("no each call produced");
    };
    let CoreKind::Send { block, .. } = *result.arena.kind(each) else {
        unreachable!();
    };
    let CoreKind::BlockFn { params, .. } = *result.arena.kind(block) else {
        panic!("each call has no block");
    };
    let params = result.arena.params(params);
    assert_eq!(params.len(), 1);
    assert!(interner.lookup(params[0].name).starts_with("<for$"));
    let item = interner.intern("item");
    assert_eq!(
        count_matching(&result.arena, |k| {
            matches!(*k, CoreKind::LocalAsgn { name, .. } if name == item)
        }),
        1
    );
}

#[test]
fn jump_values_follow_the_implicit_array_rule() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let two = src.int("2");
    let args = src.list([one, two]);
    let ret = src.node(NodeKind::Return { args });
    let no_args = src.list([]);
    let brk = src.node(NodeKind::Break { args: no_args });
    let stmts = src.list([ret, brk]);
    let root = src.node(NodeKind::Begin { stmts });
    let result = src.lower(root);

    let Some(ret) = find_first(&result.arena, |k| matches!(k, CoreKind::Return { .. })) else {
        panic!("no return produced");
    };
    let CoreKind::Return { value } = *result.arena.kind(ret) else {
        unreachable!();
    };
    let CoreKind::ArrayLit(elems) = *result.arena.kind(value) else {
        panic!("multiple return values did not become an array");
    };
    assert_eq!(result.arena.list(elems).len(), 2);

    let Some(brk) = find_first(&result.arena, |k| matches!(k, CoreKind::Break { .. })) else {
        panic!("no break produced");
    };
    let CoreKind::Break { value } = *result.arena.kind(brk) else {
        unreachable!();
    };
    assert!(!value.is_valid());
}

#[test]
fn block_pass_to_return_is_rejected() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let blk = src.local("blk");
    let pass = src.node(NodeKind::BlockPass { value: blk });
    let args = src.list([pass]);
    let root = src.node(NodeKind::Return { args });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4008]);
    let Some(ret) = find_first(&result.arena, |k| matches!(k, CoreKind::Return { .. })) else {
        panic!("no return produced");
    };
    let CoreKind::Return { value } = *result.arena.kind(ret) else {
        unreachable!();
    };
    assert!(!value.is_valid(), "rejected block-pass must be treated as absent");
}

#[test]
fn methods_get_an_implicit_block_parameter_for_yield() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let args = src.list([one]);
    let body = src.node(NodeKind::Yield { args });
    let root = {
        let name = src.name("m");
        src.node(NodeKind::Def {
            name,
            params: NodeId::INVALID,
            body,
        })
    };
    let result = src.lower(root);

    let Some(def) = find_first(&result.arena, |k| matches!(k, CoreKind::MethodDef { .. })) else {
        panic!("no method produced");
    };
    let CoreKind::MethodDef { params, .. } = *result.arena.kind(def) else {
        unreachable!();
    };
    let params = result.arena.params(params);
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].kind, ParamKind::Block);
    assert_eq!(interner.lookup(params[0].name), "<blk>");

    let Some(call) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "call")
    }) else {
        panic!("yield did not become a call");
    };
    let CoreKind::Send { recv, .. } = *result.arena.kind(call) else {
        unreachable!();
    };
    assert!(matches!(
        *result.arena.kind(recv),
        CoreKind::LocalRef(n) if interner.lookup(n) == "<blk>"
    ));
}

#[test]
fn yield_without_a_declared_block_parameter_is_flagged() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let args = src.list([]);
    let body = src.node(NodeKind::Yield { args });
    let root = {
        let name = src.name("m");
        src.node(NodeKind::Def {
            name,
            params: NodeId::INVALID,
            body,
        })
    };
    let def_span = src.arena.span(root);
    let mut result = src.lower(root);

    let flushed = result.diagnostics.flush();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].code, ErrorCode::E4011);
    assert_eq!(flushed[0].primary_span(), Some(def_span));
    // The implicit block parameter still carries the call.
    assert_eq!(count_selector(&result.arena, interner.intern("call")), 1);
}

#[test]
fn yield_calls_the_declared_block_parameter() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let blk = {
        let name = src.name("cb");
        src.node(NodeKind::BlockParam { name })
    };
    let list = src.list([blk]);
    let params = src.node(NodeKind::Params { list });
    let args = src.list([]);
    let body = src.node(NodeKind::Yield { args });
    let root = {
        let name = src.name("m");
        src.node(NodeKind::Def { name, params, body })
    };
    let result = src.lower(root);

    assert!(result.diagnostics.is_empty());
    let Some(call) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "call")
    }) else {
        panic!("yield did not become a call");
    };
    let CoreKind::Send { recv, .. } = *result.arena.kind(call) else {
        unreachable!();
    };
    assert!(matches!(
        *result.arena.kind(recv),
        CoreKind::LocalRef(n) if interner.lookup(n) == "cb"
    ));
}

#[test]
fn yield_outside_a_method_is_flagged() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let args = src.list([]);
    let root = src.node(NodeKind::Yield { args });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4011]);
}

#[test]
fn numbered_parameters_synthesize_positionals() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let recv = src.local("xs");
    let call = src.send(recv, "map", vec![]);
    let params = src.node(NodeKind::NumParams { max: 3 });
    let body = src.local("_3");
    let root = src.node(NodeKind::Block { call, params, body });
    let result = src.lower(root);

    let Some(block) = find_first(&result.arena, |k| matches!(k, CoreKind::BlockFn { .. })) else {
        panic!("no block produced");
    };
    let CoreKind::BlockFn { params, .. } = *result.arena.kind(block) else {
        unreachable!();
    };
    let params = result.arena.params(params);
    let names: Vec<&str> = params.iter().map(|p| interner.lookup(p.name)).collect();
    assert_eq!(names, vec!["_1", "_2", "_3"]);
    assert!(params.iter().all(|p| p.kind == ParamKind::Required));
}

#[test]
fn anonymous_rest_parameter_in_a_block_is_rejected() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let recv = src.local("xs");
    let call = src.send(recv, "map", vec![]);
    let rest = src.node(NodeKind::RestParam { name: Name::EMPTY });
    let list = src.list([rest]);
    let params = src.node(NodeKind::Params { list });
    let body = src.node(NodeKind::Nil);
    let root = src.node(NodeKind::Block { call, params, body });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4006]);
}

#[test]
fn symbol_to_proc_synthesizes_a_forwarding_block() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let recv = src.local("xs");
    let sym = src.sym("name");
    let pass = src.node(NodeKind::BlockPass { value: sym });
    let root = src.send(recv, "map", vec![pass]);
    let result = src.lower(root);

    let Some(map) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "map")
    }) else {
        panic!("no map call produced");
    };
    let CoreKind::Send { block, .. } = *result.arena.kind(map) else {
        unreachable!();
    };
    let CoreKind::BlockFn { params, .. } = *result.arena.kind(block) else {
        panic!("symbol-to-proc did not attach a block");
    };
    let params = result.arena.params(params);
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].kind, ParamKind::Required);
    assert_eq!(params[1].kind, ParamKind::Rest);
    assert_eq!(
        count_selector(&result.arena, interner.intern("<call-with-splat>")),
        1
    );
}

#[test]
fn splat_argument_routes_through_the_splat_primitive() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let xs = src.local("xs");
    let splat = src.node(NodeKind::Splat { value: xs });
    let root = src.self_call("f", vec![one, splat]);
    let result = src.lower(root);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<call-with-splat>")),
        1
    );
    assert_eq!(count_selector(&result.arena, interner.intern("concat")), 1);
    let f = interner.intern("f");
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Sym(f))),
        1
    );
}

#[test]
fn array_splats_become_a_concat_chain() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let xs = src.local("xs");
    let splat = src.node(NodeKind::Splat { value: xs });
    let two = src.int("2");
    let elements = src.list([one, splat, two]);
    let root = src.node(NodeKind::Array { elements });
    let result = src.lower(root);

    // [1].concat(xs).concat([2])
    assert_eq!(count_selector(&result.arena, interner.intern("concat")), 2);
    assert_eq!(
        count_matching(&result.arena, |k| matches!(k, CoreKind::ArrayLit(_))),
        2
    );
}

#[test]
fn leading_splat_starts_with_the_splat_primitive() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let xs = src.local("xs");
    let splat = src.node(NodeKind::Splat { value: xs });
    let one = src.int("1");
    let elements = src.list([splat, one]);
    let root = src.node(NodeKind::Array { elements });
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("<splat>")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("concat")), 1);
}

#[test]
fn hash_double_splat_duplicates_then_merges() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let key = src.sym("a");
    let one = src.int("1");
    let pair = src.node(NodeKind::Pair { key, value: one });
    let h = src.local("h");
    let kwsplat = src.node(NodeKind::KwSplat { value: h });
    let pairs = src.list([pair, kwsplat]);
    let root = src.node(NodeKind::Hash {
        pairs,
        braces: true,
    });
    let result = src.lower(root);

    assert_eq!(count_selector(&result.arena, interner.intern("<to-hash-dup>")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("<to-hash-nodup>")), 1);
    assert_eq!(count_selector(&result.arena, interner.intern("<merge-hash>")), 1);
}

#[test]
fn duplicate_hash_keys_warn_once_per_namespace() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let k1 = src.sym("a");
    let v1 = src.int("1");
    let p1 = src.node(NodeKind::Pair { key: k1, value: v1 });
    let k2 = src.sym("a");
    let v2 = src.int("2");
    let p2 = src.node(NodeKind::Pair { key: k2, value: v2 });
    // Same text as a string key is a different namespace: no warning.
    let k3 = {
        let text = src.name("a");
        src.node(NodeKind::Str(text))
    };
    let v3 = src.int("3");
    let p3 = src.node(NodeKind::Pair { key: k3, value: v3 });
    let pairs = src.list([p1, p2, p3]);
    let root = src.node(NodeKind::Hash {
        pairs,
        braces: true,
    });
    let mut result = src.lower(root);

    let flushed = result.diagnostics.flush();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].code, ErrorCode::E4004);
    assert_eq!(flushed[0].severity, Severity::Warning);
}

#[test]
fn trailing_keyword_hash_inlines_as_kwargs() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let key = src.sym("k");
    let v = src.local("v");
    let pair = src.node(NodeKind::Pair { key, value: v });
    let pairs = src.list([pair]);
    let hash = src.node(NodeKind::Hash {
        pairs,
        braces: false,
    });
    let root = src.self_call("f", vec![one, hash]);
    let result = src.lower(root);

    let Some(call) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "f")
    }) else {
        panic!("no call produced");
    };
    let CoreKind::Send { args, kwargs, .. } = *result.arena.kind(call) else {
        unreachable!();
    };
    assert_eq!(result.arena.list(args).len(), 1);
    assert!(matches!(*result.arena.kind(kwargs), CoreKind::HashLit(_)));
}

#[test]
fn keyword_hash_with_double_splat_stays_positional() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let h = src.local("h");
    let kwsplat = src.node(NodeKind::KwSplat { value: h });
    let pairs = src.list([kwsplat]);
    let hash = src.node(NodeKind::Hash {
        pairs,
        braces: false,
    });
    let root = src.self_call("f", vec![hash]);
    let result = src.lower(root);

    let Some(call) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "f")
    }) else {
        panic!("no call produced");
    };
    let CoreKind::Send { args, kwargs, .. } = *result.arena.kind(call) else {
        unreachable!();
    };
    assert_eq!(result.arena.list(args).len(), 1);
    assert!(!kwargs.is_valid());
}

#[test]
fn constant_assignment_in_a_method_is_rejected() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let one = src.int("1");
    let body = {
        let name = src.name("LIMIT");
        src.node(NodeKind::ConstAsgn {
            scope: NodeId::INVALID,
            name,
            value: one,
        })
    };
    let root = {
        let name = src.name("m");
        src.node(NodeKind::Def {
            name,
            params: NodeId::INVALID,
            body,
        })
    };
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4005]);
    assert_eq!(
        count_selector(&result.arena, interner.intern("<suggest-constant>")),
        1
    );
}

#[test]
fn fresh_counter_resets_per_method() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let mut defs = Vec::new();
    for method in ["first", "second"] {
        let left = src.self_call("probe", vec![]);
        let right = src.local("y");
        let body = src.node(NodeKind::And { left, right });
        let name = src.name(method);
        defs.push(src.node(NodeKind::Def {
            name,
            params: NodeId::INVALID,
            body,
        }));
    }
    let stmts = src.list(defs);
    let root = src.node(NodeKind::Begin { stmts });
    let result = src.lower(root);

    let names: Vec<&str> = ids(&result.arena)
        .into_iter()
        .filter_map(|id| match *result.arena.kind(id) {
            CoreKind::LocalAsgn { name, .. } => Some(interner.lookup(name)),
            _ => None,
        })
        .filter(|n| n.starts_with("<andAnd$"))
        .collect();
    assert_eq!(names, vec!["<andAnd$first$0>", "<andAnd$second$0>"]);
}

#[test]
fn singleton_class_of_self_gets_the_reserved_name() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let expr = src.node(NodeKind::SelfRef);
    let body = src.node(NodeKind::Nil);
    let root = src.node(NodeKind::SClass { expr, body });
    let result = src.lower(root);

    let singleton = ids(&result.arena).into_iter().any(|id| {
        matches!(
            *result.arena.kind(id),
            CoreKind::LocalRef(n) if interner.lookup(n) == "<singleton>"
        )
    });
    assert!(singleton, "singleton class scope is missing its reserved name");
}

#[test]
fn singleton_class_of_an_expression_is_rejected() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let expr = src.local("obj");
    let body = src.node(NodeKind::Nil);
    let root = src.node(NodeKind::SClass { expr, body });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4009]);
}

#[test]
fn bare_super_in_a_module_body_switches_selector() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let zsuper_in_module = src.node(NodeKind::ZSuper);
    let module = {
        let name = src.name("M");
        let const_name = src.node(NodeKind::Const {
            scope: NodeId::INVALID,
            name,
        });
        src.node(NodeKind::Module {
            name: const_name,
            body: zsuper_in_module,
        })
    };
    let result = src.lower(module);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<zsuper-untyped>")),
        1
    );
    assert_eq!(count_selector(&result.arena, interner.intern("<zsuper>")), 0);
}

#[test]
fn bare_super_inside_a_block_goes_untyped() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    // def m; each { super }; end
    let call = src.self_call("each", vec![]);
    let zsuper = src.node(NodeKind::ZSuper);
    let block = src.node(NodeKind::Block {
        call,
        params: NodeId::INVALID,
        body: zsuper,
    });
    let root = {
        let name = src.name("m");
        src.node(NodeKind::Def {
            name,
            params: NodeId::INVALID,
            body: block,
        })
    };
    let result = src.lower(root);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<zsuper-untyped>")),
        1
    );
    assert_eq!(count_selector(&result.arena, interner.intern("<zsuper>")), 0);
}

#[test]
fn defined_flattens_the_name_chain() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let outer = {
        let name = src.name("A");
        src.node(NodeKind::Const {
            scope: NodeId::INVALID,
            name,
        })
    };
    let value = {
        let name = src.name("B");
        src.node(NodeKind::Const { scope: outer, name })
    };
    let root = src.node(NodeKind::Defined { value });
    let result = src.lower(root);

    let Some(defined) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "<defined?>")
    }) else {
        panic!("no defined? primitive produced");
    };
    let CoreKind::Send { args, .. } = *result.arena.kind(defined) else {
        unreachable!();
    };
    let parts: Vec<&str> = result
        .arena
        .list(args)
        .iter()
        .map(|&arg| match *result.arena.kind(arg) {
            CoreKind::Lit(Lit::Str(n)) => interner.lookup(n),
            ref other => panic!("non-string defined? segment: {other:?}"),
        })
        .collect();
    assert_eq!(parts, vec!["A", "B"]);
}

#[test]
fn unsupported_constructs_lower_to_placeholders() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let first = src.node(NodeKind::Redo);
    let second = src.node(NodeKind::Redo);
    let stmts = src.list([first, second]);
    let root = src.node(NodeKind::Begin { stmts });
    let mut result = src.lower(root);

    assert_eq!(codes(&mut result), vec![ErrorCode::E4001, ErrorCode::E4001]);
    assert!(
        count_matching(&result.arena, |k| matches!(k, CoreKind::EmptyTree)) >= 2,
        "each unsupported construct needs its own placeholder"
    );
}

#[test]
fn error_flood_ends_with_the_cap_notice() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let stmts: Vec<NodeId> = (0..120).map(|_| src.node(NodeKind::Redo)).collect();
    let stmts = src.list(stmts);
    let root = src.node(NodeKind::Begin { stmts });
    let mut result = src.lower(root);

    let flushed = codes(&mut result);
    assert_eq!(flushed.len(), 101);
    assert!(flushed[..100].iter().all(|&c| c == ErrorCode::E4001));
    assert_eq!(flushed[100], ErrorCode::E9002);
}

#[test]
fn string_interpolation_uses_the_primitive() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let lit = {
        let text = src.name("a");
        src.node(NodeKind::Str(text))
    };
    let expr = src.local("b");
    let parts = src.list([lit, expr]);
    let root = src.node(NodeKind::DStr { parts });
    let result = src.lower(root);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<string-interpolate>")),
        1
    );
}

#[test]
fn single_part_interpolation_collapses_to_a_string() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let lit = {
        let text = src.name("plain");
        src.node(NodeKind::Str(text))
    };
    let parts = src.list([lit]);
    let root = src.node(NodeKind::DStr { parts });
    let result = src.lower(root);

    assert_eq!(
        count_selector(&result.arena, interner.intern("<string-interpolate>")),
        0
    );
    let plain = interner.intern("plain");
    assert_eq!(
        count_matching(&result.arena, |k| *k == CoreKind::Lit(Lit::Str(plain))),
        1
    );
}

#[test]
fn alias_lowers_to_alias_method() {
    let interner = StringInterner::new();
    let mut src = Src::new(&interner);
    let to = src.sym("newer");
    let from = src.sym("older");
    let root = src.node(NodeKind::Alias { to, from });
    let result = src.lower(root);

    let Some(call) = find_first(&result.arena, |k| {
        matches!(*k, CoreKind::Send { selector, .. } if interner.lookup(selector) == "alias_method")
    }) else {
        panic!("no alias_method call produced");
    };
    let CoreKind::Send { args, .. } = *result.arena.kind(call) else {
        unreachable!();
    };
    assert_eq!(result.arena.list(args).len(), 2);
}

#[test]
fn pathological_nesting_hits_the_depth_guard() {
    let builder = std::thread::Builder::new().stack_size(16 * 1024 * 1024);
    let handle = builder.spawn(|| {
        let interner = StringInterner::new();
        let mut src = Src::new(&interner);
        let mut value = src.local("x");
        for _ in 0..5000 {
            value = src.node(NodeKind::Not { value });
        }
        let mut result = src.lower(value);
        codes(&mut result)
    });
    let codes = match handle {
        Ok(handle) => match handle.join() {
            Ok(codes) => codes,
            Err(_) => panic!("lowering thread panicked"),
        },
        Err(err) => panic!("could not spawn lowering thread: {err}"),
    };
    assert!(codes.contains(&ErrorCode::E4010));
}
