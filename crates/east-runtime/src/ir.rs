//! The IR model (§4.D): a tagged tree of executable nodes. Building an IR
//! tree from source text or from a host's fluent AST builder is out of
//! scope (§1) — this module only needs to expose a constructor for every
//! node kind and the metadata (`Node::ty`, `Node::loc`, `Node::is_async`)
//! the evaluator and checker rely on.

use std::rc::Rc;

use east_core::{Location, Type};
use east_core::value::Value as CoreValue;

/// A resolved variable: name, declared type, whether it may be reassigned,
/// and whether a closure nested under its binding captures it. Captured
/// mutable variables are boxed into a one-slot cell by the evaluator
/// (§4.F.1); this flag is what tells the compiler to do so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: Rc<str>,
    pub ty: Type,
    pub mutable: bool,
    pub captured: bool,
}

impl Var {
    pub fn new(name: impl Into<Rc<str>>, ty: Type, mutable: bool, captured: bool) -> Self {
        Var { name: name.into(), ty, mutable, captured }
    }
}

/// A loop or block label used to disambiguate `break`/`continue` targets in
/// nested loops. `None` refers to the innermost enclosing loop.
pub type Label = Option<Rc<str>>;

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub case: Rc<str>,
    pub binder: Option<Var>,
    pub body: Node,
}

/// The closed set of IR node kinds (§4.D).
#[derive(Debug, Clone)]
pub enum NodeKind {
    // --- Control ---
    Value(CoreValue),
    As(Box<Node>),
    UnwrapRecursive(Box<Node>),
    WrapRecursive(Box<Node>),
    Variable(Var),
    Let { var: Var, value: Box<Node>, body: Box<Node> },
    Assign { var: Var, value: Box<Node> },
    Block(Vec<Node>),
    IfElse { cond: Box<Node>, then_branch: Box<Node>, else_branch: Box<Node> },
    Match { scrutinee: Box<Node>, arms: Vec<MatchArm> },
    While { label: Label, cond: Box<Node>, body: Box<Node> },
    ForArray { label: Label, iterable: Box<Node>, binder: Var, body: Box<Node> },
    ForSet { label: Label, iterable: Box<Node>, binder: Var, body: Box<Node> },
    ForDict { label: Label, iterable: Box<Node>, key_binder: Var, value_binder: Var, body: Box<Node> },
    Return(Option<Box<Node>>),
    Continue(Label),
    Break(Label),
    Error(Box<Node>),
    TryCatch { try_body: Box<Node>, message_var: Var, stack_var: Var, catch_body: Box<Node>, finally_body: Option<Box<Node>> },

    // --- Expressions ---
    Function { params: Vec<Var>, captures: Vec<Var>, body: Box<Node> },
    AsyncFunction { params: Vec<Var>, captures: Vec<Var>, body: Box<Node> },
    Call { callee: Box<Node>, args: Vec<Node> },
    CallAsync { callee: Box<Node>, args: Vec<Node> },
    NewRef(Box<Node>),
    NewArray(Vec<Node>),
    NewSet(Vec<Node>),
    NewDict(Vec<(Node, Node)>),
    Struct(Vec<(Rc<str>, Node)>),
    GetField { base: Box<Node>, field: Rc<str> },
    Variant { case: Rc<str>, payload: Box<Node> },

    // --- Extensibility ---
    Builtin { name: Rc<str>, type_params: Vec<Type>, args: Vec<Node> },
    Platform { name: Rc<str>, args: Vec<Node>, is_async: bool },
}

/// A single IR node: its kind, its statically known result type, its source
/// location, and whether evaluating it may suspend (§4.D: "Every node has
/// an isAsync marker").
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    pub loc: Location,
    pub is_async: bool,
}

impl Node {
    pub fn new(kind: NodeKind, ty: Type, loc: Location) -> Self {
        let is_async = compute_is_async(&kind);
        Node { kind, ty, loc, is_async }
    }
}

/// A function is async if any node in its body is async: a `CallAsync`, a
/// `Platform` effect declared async, or (transitively) a call to an async
/// value. Nested `Function`/`AsyncFunction` bodies do not propagate their
/// own asynchrony outward — a closure literal is synchronous to construct
/// even if calling it later suspends.
fn compute_is_async(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::CallAsync { .. } => true,
        NodeKind::Platform { is_async, .. } => *is_async,
        NodeKind::Value(_)
        | NodeKind::Variable(_)
        | NodeKind::Continue(_)
        | NodeKind::Break(_)
        | NodeKind::Function { .. }
        | NodeKind::AsyncFunction { .. } => false,
        NodeKind::As(n)
        | NodeKind::UnwrapRecursive(n)
        | NodeKind::WrapRecursive(n)
        | NodeKind::NewRef(n)
        | NodeKind::Error(n)
        | NodeKind::Return(Some(n)) => n.is_async,
        NodeKind::Return(None) => false,
        NodeKind::Let { value, body, .. } => value.is_async || body.is_async,
        NodeKind::Assign { value, .. } => value.is_async,
        NodeKind::Block(items) => items.iter().any(|n| n.is_async),
        NodeKind::IfElse { cond, then_branch, else_branch } => {
            cond.is_async || then_branch.is_async || else_branch.is_async
        }
        NodeKind::Match { scrutinee, arms } => {
            scrutinee.is_async || arms.iter().any(|a| a.body.is_async)
        }
        NodeKind::While { cond, body, .. } => cond.is_async || body.is_async,
        NodeKind::ForArray { iterable, body, .. }
        | NodeKind::ForSet { iterable, body, .. }
        | NodeKind::ForDict { iterable, body, .. } => iterable.is_async || body.is_async,
        NodeKind::TryCatch { try_body, catch_body, finally_body, .. } => {
            try_body.is_async
                || catch_body.is_async
                || finally_body.as_ref().is_some_and(|n| n.is_async)
        }
        NodeKind::Call { callee, args } => callee.is_async || args.iter().any(|n| n.is_async),
        NodeKind::NewArray(items) | NodeKind::NewSet(items) => items.iter().any(|n| n.is_async),
        NodeKind::NewDict(pairs) => pairs.iter().any(|(k, v)| k.is_async || v.is_async),
        NodeKind::Struct(fields) => fields.iter().any(|(_, n)| n.is_async),
        NodeKind::GetField { base, .. } => base.is_async,
        NodeKind::Variant { payload, .. } => payload.is_async,
        NodeKind::Builtin { args, .. } => args.iter().any(|n| n.is_async),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::default()
    }

    #[test]
    fn call_async_marks_the_node_async() {
        let callee = Node::new(NodeKind::Value(CoreValue::Null), Type::Null, loc());
        let node = Node::new(
            NodeKind::CallAsync { callee: Box::new(callee), args: vec![] },
            Type::Null,
            loc(),
        );
        assert!(node.is_async);
    }

    #[test]
    fn block_is_async_if_any_child_is() {
        let sync_leaf = Node::new(NodeKind::Value(CoreValue::Null), Type::Null, loc());
        let platform_async = Node::new(
            NodeKind::Platform { name: "fetch".into(), args: vec![], is_async: true },
            Type::Null,
            loc(),
        );
        let block = Node::new(
            NodeKind::Block(vec![sync_leaf, platform_async]),
            Type::Null,
            loc(),
        );
        assert!(block.is_async);
    }

    #[test]
    fn a_function_literal_is_synchronous_even_if_its_body_suspends() {
        let platform_async = Node::new(
            NodeKind::Platform { name: "fetch".into(), args: vec![], is_async: true },
            Type::Null,
            loc(),
        );
        let function = Node::new(
            NodeKind::AsyncFunction { params: vec![], captures: vec![], body: Box::new(platform_async) },
            Type::async_function(vec![], Type::Null),
            loc(),
        );
        assert!(!function.is_async);
    }
}
