//! The closure evaluator (§4.F): compiles a checked `Node` tree into a
//! callable once, then runs that callable against a `Context` as many times
//! as needed. Each IR node compiles to a boxed closure over its already
//! -compiled children, per §4.F.1.
//!
//! ## Asynchrony
//!
//! The engine is single-threaded and cooperative (§5): there is no
//! multi-task scheduler in this core, so "awaiting" a platform task or an
//! `AsyncFunction` call is modelled as running the deferred work to
//! completion at the await point, rather than yielding to another task.
//! This preserves every ordering guarantee §5 actually requires (left-to-
//! right argument evaluation, left-to-right awaiting, deterministic
//! iteration) without pulling in an executor a single-threaded core has no
//! use for. `Call` and `CallAsync` therefore invoke identically; the
//! distinction that matters is the `is_async` marker §4.D computes at IR
//! construction time, which is what a host inspects to decide whether a
//! given call site may suspend.

pub mod closure;
pub mod context;
pub mod unwind;

use std::rc::Rc;

use east_core::value::{Callable, Value};
use east_core::{EastError, EastResult, Location, Type};

use crate::builtins;
use crate::ir::{Label, MatchArm, Node, NodeKind, Var};

use closure::{Closure, CompiledNode};
use context::Context;
use unwind::{EvalResult, Unwind};

/// A fully compiled program: call `run` with a fresh top-level `Context`.
pub struct CompiledProgram {
    body: CompiledNode,
}

impl CompiledProgram {
    pub fn run(&self, ctx: &Context) -> EastResult<Value> {
        tracing::trace!("running compiled program");
        match (self.body)(ctx) {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => {
                tracing::debug!(%err, "program run ended in an error");
                Err(err)
            }
            Err(Unwind::Break(_)) | Err(Unwind::Continue(_)) => {
                Err(EastError::internal("break/continue escaped the top-level program"))
            }
        }
    }
}

/// Compile a checked IR tree into a callable (§4.I: `compile(ir, platform_table) -> callable`).
pub fn compile(ir: &Node) -> CompiledProgram {
    tracing::debug!("compiling IR tree");
    CompiledProgram { body: compile_node(ir) }
}

fn loc_of(node: &Node) -> Location {
    node.loc.clone()
}

fn struct_field_index(struct_ty: &Type, field: &str) -> usize {
    match struct_ty {
        Type::Struct(fields) => fields
            .iter()
            .position(|f| f.name == field)
            .unwrap_or_else(|| panic!("IR checker bug: unknown struct field \"{field}\"")),
        other => panic!("IR checker bug: GetField base is not a Struct ({other:?})"),
    }
}

fn compile_node(node: &Node) -> CompiledNode {
    let loc = loc_of(node);
    match &node.kind {
        NodeKind::Value(v) => {
            let v = v.clone();
            Rc::new(move |_ctx| Ok(v.clone()))
        }

        NodeKind::As(inner) | NodeKind::UnwrapRecursive(inner) | NodeKind::WrapRecursive(inner) => {
            // Recursive wrap/unwrap and type ascription are erased at
            // runtime: a `Recursive` type unfolds to the same value shape,
            // so the value itself carries no recursion marker to strip or
            // add (§3.1.2's "transparent" unfolding is a type-level fact).
            compile_node(inner)
        }

        NodeKind::Variable(var) => {
            let name = var.name.clone();
            Rc::new(move |ctx| ctx.get(&name).map_err(Unwind::from))
        }

        NodeKind::Let { var, value, body } => {
            let value_c = compile_node(value);
            let body_c = compile_node(body);
            let var = var.clone();
            Rc::new(move |ctx| {
                let v = value_c(ctx)?;
                let child = ctx.child();
                child.define(var.name.clone(), v, var.captured);
                body_c(&child)
            })
        }

        NodeKind::Assign { var, value } => {
            let value_c = compile_node(value);
            let name = var.name.clone();
            Rc::new(move |ctx| {
                let v = value_c(ctx)?;
                ctx.assign(&name, v).map_err(Unwind::from)?;
                Ok(Value::Null)
            })
        }

        NodeKind::Block(items) => {
            let compiled: Vec<CompiledNode> = items.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let mut result = Value::Null;
                for c in &compiled {
                    result = c(ctx)?;
                }
                Ok(result)
            })
        }

        NodeKind::IfElse { cond, then_branch, else_branch } => {
            let cond_c = compile_node(cond);
            let then_c = compile_node(then_branch);
            let else_c = compile_node(else_branch);
            Rc::new(move |ctx| match cond_c(ctx)? {
                Value::Boolean(true) => then_c(ctx),
                Value::Boolean(false) => else_c(ctx),
                other => Err(Unwind::from(EastError::internal(format!(
                    "IfElse condition did not evaluate to a Boolean: {other:?}"
                )))),
            })
        }

        NodeKind::Match { scrutinee, arms } => compile_match(scrutinee, arms),

        NodeKind::While { label, cond, body } => {
            let cond_c = compile_node(cond);
            let body_c = compile_node(body);
            let label = label.clone();
            Rc::new(move |ctx| run_while(ctx, &cond_c, &body_c, &label))
        }

        NodeKind::ForArray { label, iterable, binder, body } => {
            compile_for_array(iterable, binder, body, label)
        }
        NodeKind::ForSet { label, iterable, binder, body } => {
            compile_for_set(iterable, binder, body, label)
        }
        NodeKind::ForDict { label, iterable, key_binder, value_binder, body } => {
            compile_for_dict(iterable, key_binder, value_binder, body, label)
        }

        NodeKind::Return(expr) => {
            let expr_c = expr.as_ref().map(|e| compile_node(e));
            Rc::new(move |ctx| {
                let value = match &expr_c {
                    Some(c) => c(ctx)?,
                    None => Value::Null,
                };
                Err(Unwind::Return(value))
            })
        }
        NodeKind::Continue(label) => {
            let label = label.clone();
            Rc::new(move |_ctx| Err(Unwind::Continue(label.clone())))
        }
        NodeKind::Break(label) => {
            let label = label.clone();
            Rc::new(move |_ctx| Err(Unwind::Break(label.clone())))
        }

        NodeKind::Error(message) => {
            let message_c = compile_node(message);
            let loc = loc.clone();
            Rc::new(move |ctx| {
                let msg = match message_c(ctx)? {
                    Value::String(s) => s.to_rust_string(),
                    other => format!("{other:?}"),
                };
                Err(Unwind::Error(EastError::UserError { message: msg, stack: vec![loc.clone()] }))
            })
        }

        NodeKind::TryCatch { try_body, message_var, stack_var, catch_body, finally_body } => {
            compile_try_catch(try_body, message_var, stack_var, catch_body, finally_body.as_deref())
        }

        NodeKind::Function { params, captures, body } => {
            compile_closure_literal(params, captures, body, false)
        }
        NodeKind::AsyncFunction { params, captures, body } => {
            compile_closure_literal(params, captures, body, true)
        }

        NodeKind::Call { callee, args } | NodeKind::CallAsync { callee, args } => {
            let callee_c = compile_node(callee);
            let args_c: Vec<CompiledNode> = args.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let callee_value = callee_c(ctx)?;
                let mut arg_values = Vec::with_capacity(args_c.len());
                for a in &args_c {
                    arg_values.push(a(ctx)?);
                }
                invoke_value(ctx, &callee_value, &arg_values)
            })
        }

        NodeKind::NewRef(inner) => {
            let inner_c = compile_node(inner);
            Rc::new(move |ctx| Ok(Value::new_ref(inner_c(ctx)?)))
        }
        NodeKind::NewArray(items) => {
            let compiled: Vec<CompiledNode> = items.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let mut values = Vec::with_capacity(compiled.len());
                for c in &compiled {
                    values.push(c(ctx)?);
                }
                Ok(Value::new_array(values))
            })
        }
        NodeKind::NewSet(items) => {
            let compiled: Vec<CompiledNode> = items.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let mut set = east_core::sorted::SortedSet::new();
                for c in &compiled {
                    set.insert(c(ctx)?).map_err(Unwind::from)?;
                }
                Ok(Value::Set(east_core::value::SetValue {
                    header: Rc::new(east_core::container::ContainerHeader::new()),
                    items: Rc::new(std::cell::RefCell::new(set)),
                }))
            })
        }
        NodeKind::NewDict(pairs) => {
            let compiled: Vec<(CompiledNode, CompiledNode)> =
                pairs.iter().map(|(k, v)| (compile_node(k), compile_node(v))).collect();
            Rc::new(move |ctx| {
                let mut map = east_core::sorted::SortedMap::new();
                for (k_c, v_c) in &compiled {
                    let k = k_c(ctx)?;
                    let v = v_c(ctx)?;
                    map.insert(k, v).map_err(Unwind::from)?;
                }
                Ok(Value::Dict(east_core::value::DictValue {
                    header: Rc::new(east_core::container::ContainerHeader::new()),
                    items: Rc::new(std::cell::RefCell::new(map)),
                }))
            })
        }

        NodeKind::Struct(fields) => {
            let compiled: Vec<CompiledNode> = fields.iter().map(|(_, n)| compile_node(n)).collect();
            Rc::new(move |ctx| {
                let mut values = Vec::with_capacity(compiled.len());
                for c in &compiled {
                    values.push(c(ctx)?);
                }
                Ok(Value::new_struct(values))
            })
        }
        NodeKind::GetField { base, field } => {
            let index = struct_field_index(&base.ty, field);
            let base_c = compile_node(base);
            Rc::new(move |ctx| match base_c(ctx)? {
                Value::Struct(fields) => Ok(fields[index].clone()),
                other => Err(Unwind::from(EastError::internal(format!(
                    "GetField base is not a Struct: {other:?}"
                )))),
            })
        }
        NodeKind::Variant { case, payload } => {
            let case = case.clone();
            let payload_c = compile_node(payload);
            Rc::new(move |ctx| Ok(Value::new_variant(case.clone(), payload_c(ctx)?)))
        }

        NodeKind::Builtin { name, type_params, args } => {
            let name = name.clone();
            let type_params = type_params.clone();
            let args_c: Vec<CompiledNode> = args.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let mut values = Vec::with_capacity(args_c.len());
                for c in &args_c {
                    values.push(c(ctx)?);
                }
                builtins::dispatch(ctx, &name, &type_params, &values).map_err(Unwind::from)
            })
        }

        NodeKind::Platform { name, args, is_async } => {
            let name = name.clone();
            let is_async = *is_async;
            let args_c: Vec<CompiledNode> = args.iter().map(compile_node).collect();
            Rc::new(move |ctx| {
                let mut values = Vec::with_capacity(args_c.len());
                for c in &args_c {
                    values.push(c(ctx)?);
                }
                if is_async {
                    let task = ctx.platform.call_async(&name, &values).map_err(Unwind::from)?;
                    task.resolve().map_err(Unwind::from)
                } else {
                    ctx.platform.call(&name, &values).map_err(Unwind::from)
                }
            })
        }
    }
}

/// Call any `Value::Function` produced by this evaluator. Exposed so the
/// builtin library (`forEach`/`map`/`reduce`/…) can invoke a user-supplied
/// callback without depending on the node compiler.
pub fn call_value(ctx: &Context, callee: &Value, args: &[Value]) -> EastResult<Value> {
    match callee {
        Value::Function(f) => {
            let closure = f
                .callable
                .as_any()
                .downcast_ref::<Closure>()
                .ok_or_else(|| EastError::internal("callable was not produced by this evaluator"))?;
            closure.invoke(ctx, args)
        }
        other => Err(EastError::internal(format!("attempted to call a non-function value: {other:?}"))),
    }
}

fn invoke_value(ctx: &Context, callee: &Value, args: &[Value]) -> EvalResult {
    call_value(ctx, callee, args).map_err(Unwind::from)
}

fn compile_closure_literal(params: &[Var], captures: &[Var], body: &Node, is_async: bool) -> CompiledNode {
    let params = params.to_vec();
    let captures = captures.to_vec();
    let body_c = compile_node(body);
    let label = format!("{}closure", if is_async { "async " } else { "" });
    Rc::new(move |ctx: &Context| {
        let mut captured_values = Vec::with_capacity(captures.len());
        for var in &captures {
            captured_values.push((var.clone(), ctx.get(&var.name).map_err(Unwind::from)?));
        }
        let closure = Closure {
            label: label.clone(),
            params: params.clone(),
            captures: captured_values,
            body: body_c.clone(),
        };
        Ok(Value::Function(east_core::value::FunctionValue {
            callable: Rc::new(closure),
            is_async,
        }))
    })
}

fn compile_match(scrutinee: &Node, arms: &[MatchArm]) -> CompiledNode {
    let scrutinee_c = compile_node(scrutinee);
    let compiled_arms: Vec<(std::rc::Rc<str>, Option<Var>, CompiledNode)> = arms
        .iter()
        .map(|arm| (arm.case.clone(), arm.binder.clone(), compile_node(&arm.body)))
        .collect();
    Rc::new(move |ctx| {
        let scrutinee_value = scrutinee_c(ctx)?;
        let variant = match scrutinee_value {
            Value::Variant(v) => v,
            other => {
                return Err(Unwind::from(EastError::internal(format!(
                    "Match scrutinee is not a Variant: {other:?}"
                ))))
            }
        };
        for (case, binder, body_c) in &compiled_arms {
            if **case == *variant.case {
                let child = ctx.child();
                if let Some(binder) = binder {
                    child.define(binder.name.clone(), (*variant.payload).clone(), binder.captured);
                }
                return body_c(&child);
            }
        }
        Err(Unwind::from(EastError::internal(format!(
            "Match has no arm for case \"{}\" (IR checker bug)",
            variant.case
        ))))
    })
}

fn run_while(ctx: &Context, cond_c: &CompiledNode, body_c: &CompiledNode, label: &Label) -> EvalResult {
    loop {
        match cond_c(ctx)? {
            Value::Boolean(true) => {}
            Value::Boolean(false) => return Ok(Value::Null),
            other => {
                return Err(Unwind::from(EastError::internal(format!(
                    "While condition did not evaluate to a Boolean: {other:?}"
                ))))
            }
        }
        match body_c(ctx) {
            Ok(_) => {}
            Err(Unwind::Break(requested)) if Unwind::matches_label(label, &requested) => {
                return Ok(Value::Null)
            }
            Err(Unwind::Continue(requested)) if Unwind::matches_label(label, &requested) => continue,
            Err(other) => return Err(other),
        }
    }
}

fn compile_for_array(iterable: &Node, binder: &Var, body: &Node, label: &Label) -> CompiledNode {
    let iterable_c = compile_node(iterable);
    let body_c = compile_node(body);
    let binder = binder.clone();
    let label = label.clone();
    Rc::new(move |ctx| {
        let arr = match iterable_c(ctx)? {
            Value::Array(a) => a,
            other => {
                return Err(Unwind::from(EastError::internal(format!(
                    "ForArray iterable is not an Array: {other:?}"
                ))))
            }
        };
        let _lock = arr.header.acquire_lock();
        let snapshot: Vec<Value> = arr.items.borrow().clone();
        for item in snapshot {
            let child = ctx.child();
            child.define(binder.name.clone(), item, binder.captured);
            match body_c(&child) {
                Ok(_) => {}
                Err(Unwind::Break(requested)) if Unwind::matches_label(&label, &requested) => {
                    return Ok(Value::Null)
                }
                Err(Unwind::Continue(requested)) if Unwind::matches_label(&label, &requested) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    })
}

fn compile_for_set(iterable: &Node, binder: &Var, body: &Node, label: &Label) -> CompiledNode {
    let iterable_c = compile_node(iterable);
    let body_c = compile_node(body);
    let binder = binder.clone();
    let label = label.clone();
    Rc::new(move |ctx| {
        let set = match iterable_c(ctx)? {
            Value::Set(s) => s,
            other => {
                return Err(Unwind::from(EastError::internal(format!(
                    "ForSet iterable is not a Set: {other:?}"
                ))))
            }
        };
        let _lock = set.header.acquire_lock();
        let snapshot: Vec<Value> = set.items.borrow().iter().cloned().collect();
        for item in snapshot {
            let child = ctx.child();
            child.define(binder.name.clone(), item, binder.captured);
            match body_c(&child) {
                Ok(_) => {}
                Err(Unwind::Break(requested)) if Unwind::matches_label(&label, &requested) => {
                    return Ok(Value::Null)
                }
                Err(Unwind::Continue(requested)) if Unwind::matches_label(&label, &requested) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    })
}

fn compile_for_dict(
    iterable: &Node,
    key_binder: &Var,
    value_binder: &Var,
    body: &Node,
    label: &Label,
) -> CompiledNode {
    let iterable_c = compile_node(iterable);
    let body_c = compile_node(body);
    let key_binder = key_binder.clone();
    let value_binder = value_binder.clone();
    let label = label.clone();
    Rc::new(move |ctx| {
        let dict = match iterable_c(ctx)? {
            Value::Dict(d) => d,
            other => {
                return Err(Unwind::from(EastError::internal(format!(
                    "ForDict iterable is not a Dict: {other:?}"
                ))))
            }
        };
        let _lock = dict.header.acquire_lock();
        let snapshot: Vec<(Value, Value)> =
            dict.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        for (k, v) in snapshot {
            let child = ctx.child();
            child.define(key_binder.name.clone(), k, key_binder.captured);
            child.define(value_binder.name.clone(), v, value_binder.captured);
            match body_c(&child) {
                Ok(_) => {}
                Err(Unwind::Break(requested)) if Unwind::matches_label(&label, &requested) => {
                    return Ok(Value::Null)
                }
                Err(Unwind::Continue(requested)) if Unwind::matches_label(&label, &requested) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    })
}

fn compile_try_catch(
    try_body: &Node,
    message_var: &Var,
    stack_var: &Var,
    catch_body: &Node,
    finally_body: Option<&Node>,
) -> CompiledNode {
    let try_c = compile_node(try_body);
    let catch_c = compile_node(catch_body);
    let finally_c = finally_body.map(compile_node);
    let message_var = message_var.clone();
    let stack_var = stack_var.clone();
    Rc::new(move |ctx| {
        let try_ctx = ctx.child();
        let result = match try_c(&try_ctx) {
            Err(Unwind::Error(err)) if err.is_catchable() => {
                let catch_ctx = ctx.child();
                let stack_values: Vec<Value> = match &err {
                    EastError::UserError { stack, .. } => {
                        stack.iter().map(|l| Value::string(l.to_string())).collect()
                    }
                    _ => Vec::new(),
                };
                catch_ctx.define(message_var.name.clone(), Value::string(err.to_string()), message_var.captured);
                catch_ctx.define(stack_var.name.clone(), Value::new_array(stack_values), stack_var.captured);
                catch_c(&catch_ctx)
            }
            other => other,
        };
        // §4.F.5: finally always runs, on every exit path, including one
        // where `catch` itself did not run (an uncaught/InternalError
        // unwind) or where the try/catch body carries a return/break/
        // continue unwind through this node.
        match &finally_c {
            Some(finally_c) => match finally_c(ctx) {
                Ok(_) => result,
                Err(finally_unwind) => Err(finally_unwind),
            },
            None => result,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PlatformTable;
    use crate::ir::NodeKind;
    use east_core::value::Value as V;

    fn n(kind: NodeKind, ty: Type) -> Node {
        Node::new(kind, ty, Location::default())
    }

    fn fresh_ctx() -> Context {
        Context::new(Rc::new(PlatformTable::new()), 1024)
    }

    #[test]
    fn s1_closure_captures_and_applies() {
        // multiplier := 3
        // f(x) := x * multiplier
        // f(4) = 12
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
        let f_node = n(
            NodeKind::Function { params: vec![x], captures: vec![multiplier.clone()], body: Box::new(body) },
            Type::function(vec![Type::Integer], Type::Integer),
        );
        let let_node = n(
            NodeKind::Let {
                var: multiplier.clone(),
                value: Box::new(n(NodeKind::Value(V::Integer(3)), Type::Integer)),
                body: Box::new(n(
                    NodeKind::Let {
                        var: Var::new("f", f_node.ty.clone(), false, false),
                        value: Box::new(f_node.clone()),
                        body: Box::new(n(
                            NodeKind::Call {
                                callee: Box::new(n(
                                    NodeKind::Variable(Var::new("f", f_node.ty.clone(), false, false)),
                                    f_node.ty.clone(),
                                )),
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
        let program = compile(&let_node);
        let result = program.run(&fresh_ctx()).unwrap();
        assert_eq!(result, V::Integer(12));
    }

    #[test]
    fn try_finally_runs_on_every_exit_path() {
        let log = Rc::new(std::cell::RefCell::new(Vec::<&'static str>::new()));
        let mut platform = PlatformTable::new();
        {
            let log = log.clone();
            platform.register_sync("log-run", move |_| {
                log.borrow_mut().push("finally");
                Ok(V::Null)
            });
        }
        let finally_body = n(
            NodeKind::Platform { name: "log-run".into(), args: vec![], is_async: false },
            Type::Null,
        );
        let throwing_try = n(
            NodeKind::Error(Box::new(n(NodeKind::Value(V::string("boom")), Type::String))),
            Type::Never,
        );
        let message_var = Var::new("message", Type::String, false, false);
        let stack_var = Var::new("stack", Type::array(Type::String), false, false);
        let catch_body = n(NodeKind::Variable(message_var.clone()), Type::String);
        let node = n(
            NodeKind::TryCatch {
                try_body: Box::new(throwing_try),
                message_var,
                stack_var,
                catch_body: Box::new(catch_body),
                finally_body: Some(Box::new(finally_body)),
            },
            Type::String,
        );
        let ctx = Context::new(Rc::new(platform), 1024);
        let program = compile(&node);
        let result = program.run(&ctx).unwrap();
        assert_eq!(result, V::string("boom"));
        assert_eq!(*log.borrow(), vec!["finally"]);
    }

    #[test]
    fn for_array_break_stops_iteration_and_leaves_array_unchanged() {
        let arr = V::new_array(vec![V::Integer(1), V::Integer(2), V::Integer(3)]);
        let array_var = Var::new("xs", Type::array(Type::Integer), false, false);
        let binder = Var::new("x", Type::Integer, false, false);
        let body = n(NodeKind::Break(None), Type::Null);
        let for_node = n(
            NodeKind::ForArray {
                label: None,
                iterable: Box::new(n(NodeKind::Variable(array_var.clone()), array_var.ty.clone())),
                binder,
                body: Box::new(body),
            },
            Type::Null,
        );
        let ctx = fresh_ctx();
        ctx.define(array_var.name.clone(), arr.clone(), false);
        let program = compile(&for_node);
        program.run(&ctx).unwrap();
        if let V::Array(a) = arr {
            assert_eq!(a.items.borrow().len(), 3);
            assert!(!a.header.is_locked());
        } else {
            unreachable!()
        }
    }
}
