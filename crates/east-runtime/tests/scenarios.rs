//! End-to-end scenarios, each a small IR program built and run directly
//! against a fresh `Context` rather than through any source-text frontend
//! (building IR from source is out of scope for this crate).

use std::rc::Rc;

use east_codec::{json, text};
use east_core::value::Value as V;
use east_core::{Field, Type};
use east_runtime::ir::{MatchArm, Node, NodeKind, Var};
use east_runtime::{compile, Context, PlatformTable};

fn n(kind: NodeKind, ty: Type) -> Node {
    Node::new(kind, ty, east_core::Location::default())
}

fn fresh_ctx() -> Context {
    Context::new(Rc::new(PlatformTable::new()), 2048)
}

#[test]
fn s1_closure_captures_and_applies() {
    let multiplier = Var::new("multiplier", Type::Integer, false, true);
    let x = Var::new("x", Type::Integer, false, false);
    let body = n(
        NodeKind::Builtin {
            name: "IntegerMul".into(),
            type_params: vec![],
            args: vec![
                n(NodeKind::Variable(x.clone()), Type::Integer),
                n(NodeKind::Variable(multiplier.clone()), Type::Integer),
            ],
        },
        Type::Integer,
    );
    let f_ty = Type::function(vec![Type::Integer], Type::Integer);
    let f_node = n(
        NodeKind::Function { params: vec![x], captures: vec![multiplier.clone()], body: Box::new(body) },
        f_ty.clone(),
    );
    let f_var = Var::new("f", f_ty.clone(), false, false);
    let program_node = n(
        NodeKind::Let {
            var: multiplier,
            value: Box::new(n(NodeKind::Value(V::Integer(3)), Type::Integer)),
            body: Box::new(n(
                NodeKind::Let {
                    var: f_var.clone(),
                    value: Box::new(f_node),
                    body: Box::new(n(
                        NodeKind::Call {
                            callee: Box::new(n(NodeKind::Variable(f_var), f_ty)),
                            args: vec![n(NodeKind::Value(V::Integer(4)), Type::Integer)],
                        },
                        Type::Integer,
                    )),
                },
                Type::Integer,
            )),
        },
        Type::Integer,
    );
    let result = compile(&program_node).run(&fresh_ctx()).unwrap();
    assert_eq!(result, V::Integer(12));
}

/// `ListType = μL. variant{nil: Null, cons: {head: Integer, tail: L}}`; the
/// walk is expressed as a `while true { match cur { cons => .., nil => break } }`
/// loop rather than recursion, since the evaluator's own recursion is bounded
/// by `max_call_depth` and this scenario is about the recursive *type*, not
/// recursive *calls*.
#[test]
fn s2_linked_list_sum_over_a_recursive_type() {
    let cons_payload_ty =
        Type::strct(vec![Field::new("head", Type::Integer), Field::new("tail", Type::RecursiveMarker(0))]).unwrap();
    let list_ty = Type::mk_recursive(|marker| {
        let cons_payload_ty =
            Type::strct(vec![Field::new("head", Type::Integer), Field::new("tail", marker)]).unwrap();
        Type::variant(vec![Field::new("nil", Type::Null), Field::new("cons", cons_payload_ty)])
    })
    .unwrap();

    let cons = |head: i64, tail: V| V::new_variant("cons", V::new_struct(vec![V::Integer(head), tail]));
    let list = cons(1, cons(2, cons(3, V::new_variant("nil", V::Null))));

    let sum_var = Var::new("sum", Type::Integer, true, false);
    let cur_var = Var::new("cur", list_ty.clone(), true, false);
    let payload_var = Var::new("payload", cons_payload_ty.clone(), false, false);

    let cons_arm_body = n(
        NodeKind::Block(vec![
            n(
                NodeKind::Assign {
                    var: sum_var.clone(),
                    value: Box::new(n(
                        NodeKind::Builtin {
                            name: "IntegerAdd".into(),
                            type_params: vec![],
                            args: vec![
                                n(NodeKind::Variable(sum_var.clone()), Type::Integer),
                                n(
                                    NodeKind::GetField { base: Box::new(n(NodeKind::Variable(payload_var.clone()), cons_payload_ty.clone())), field: "head".into() },
                                    Type::Integer,
                                ),
                            ],
                        },
                        Type::Integer,
                    )),
                },
                Type::Null,
            ),
            n(
                NodeKind::Assign {
                    var: cur_var.clone(),
                    value: Box::new(n(
                        NodeKind::GetField { base: Box::new(n(NodeKind::Variable(payload_var.clone()), cons_payload_ty.clone())), field: "tail".into() },
                        Type::RecursiveMarker(0),
                    )),
                },
                Type::Null,
            ),
        ]),
        Type::Null,
    );
    let nil_arm_body = n(NodeKind::Break(None), Type::Null);

    let loop_body = n(
        NodeKind::Match {
            scrutinee: Box::new(n(NodeKind::Variable(cur_var.clone()), list_ty.clone())),
            arms: vec![
                MatchArm { case: "cons".into(), binder: Some(payload_var), body: cons_arm_body },
                MatchArm { case: "nil".into(), binder: None, body: nil_arm_body },
            ],
        },
        Type::Null,
    );
    let loop_node = n(
        NodeKind::While {
            label: None,
            cond: Box::new(n(NodeKind::Value(V::Boolean(true)), Type::Boolean)),
            body: Box::new(loop_body),
        },
        Type::Null,
    );

    let program_node = n(
        NodeKind::Let {
            var: sum_var.clone(),
            value: Box::new(n(NodeKind::Value(V::Integer(0)), Type::Integer)),
            body: Box::new(n(
                NodeKind::Let {
                    var: cur_var,
                    value: Box::new(n(NodeKind::Value(list), list_ty)),
                    body: Box::new(n(
                        NodeKind::Block(vec![loop_node, n(NodeKind::Variable(sum_var), Type::Integer)]),
                        Type::Integer,
                    )),
                },
                Type::Integer,
            )),
        },
        Type::Integer,
    );
    let result = compile(&program_node).run(&fresh_ctx()).unwrap();
    assert_eq!(result, V::Integer(6));
}

#[test]
fn s3_text_round_trips_a_struct_with_a_variant_field() {
    let status_ty = Type::variant(vec![Field::new("none", Type::Null), Field::new("some", Type::Integer)]).unwrap();
    let ty = Type::strct(vec![Field::new("name", Type::String), Field::new("status", status_ty)]).unwrap();
    let value = V::new_struct(vec![V::string("Alice"), V::new_variant("some", V::Integer(30))]);

    let printed = text::print(&ty, &value);
    assert_eq!(printed, "(name=\"Alice\", status=.some 30)");
    assert_eq!(text::parse(&ty, &printed).unwrap(), value);
}

#[test]
fn s4_json_round_trips_the_largest_representable_integer() {
    let printed = json::to_string(&Type::Integer, &V::Integer(i64::MAX));
    assert_eq!(printed, "\"9223372036854775807\"");
    assert_eq!(json::from_str(&Type::Integer, &printed).unwrap(), V::Integer(i64::MAX));
}

#[test]
fn s5_regex_replace_swaps_capture_groups_but_rejects_the_ampersand_token() {
    use east_runtime::builtins::string;

    let swapped = string::dispatch(
        "RegexReplace",
        &[V::string("hello world"), V::string(r"(\w+) (\w+)"), V::string(""), V::string("$2 $1")],
    )
    .unwrap()
    .unwrap();
    assert_eq!(swapped, V::string("world hello"));

    let rejected =
        string::dispatch("RegexReplace", &[V::string("hello world"), V::string(r"(\w+)"), V::string(""), V::string("[$&]")])
            .unwrap();
    assert!(matches!(rejected, Err(east_core::EastError::DomainError { .. })));
}

#[test]
fn s6_dict_iterates_and_prints_in_key_order_regardless_of_insertion_order() {
    use east_runtime::builtins::collections;

    let ctx = fresh_ctx();
    let dict = V::new_dict(east_core::sorted::SortedMap::new());
    for (k, v) in [(3, "c"), (1, "a"), (2, "b")] {
        collections::dispatch(&ctx, "DictInsert", &[dict.clone(), V::Integer(k), V::string(v)]).unwrap().unwrap();
    }
    let ty = Type::dict(Type::Integer, Type::String);
    let printed = json::to_string(&ty, &dict);
    assert_eq!(
        printed,
        r#"[{"key":"1","value":"a"},{"key":"2","value":"b"},{"key":"3","value":"c"}]"#
    );
}

#[test]
fn s7_mutation_during_foreach_raises_concurrent_mutation_and_leaves_the_array_unchanged() {
    use east_core::value::FunctionValue;
    use east_runtime::builtins::collections;
    use east_runtime::eval::closure::Closure;
    use east_runtime::eval::unwind::Unwind;

    let ctx = fresh_ctx();
    let arr = V::new_array(vec![V::Integer(1), V::Integer(2), V::Integer(3)]);
    let target = arr.clone();
    let mutator = Closure {
        label: "mutator".into(),
        params: vec![Var::new("x", Type::Integer, false, false)],
        captures: vec![],
        body: Rc::new(move |ctx: &Context| {
            collections::dispatch(ctx, "ArrayInsert", &[target.clone(), V::Integer(0), V::Integer(99)])
                .expect("ArrayInsert is a known builtin")
                .map_err(Unwind::from)
        }),
    };
    let callback = V::Function(FunctionValue { callable: Rc::new(mutator), is_async: false });

    let result = collections::dispatch(&ctx, "ArrayForEach", &[arr.clone(), callback]).unwrap();
    assert!(matches!(result, Err(east_core::EastError::ConcurrentMutation { .. })));
    if let V::Array(a) = &arr {
        assert_eq!(a.items.borrow().len(), 3);
    } else {
        unreachable!()
    }
}
