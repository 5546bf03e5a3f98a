//! Runtime variable context (§4.F.1).
//!
//! Compilation produces a per-node closure over child closures; a context is
//! the mutable frame those closures run against. Non-captured mutable
//! variables live inline (an `Inline` slot, mutated in place); variables
//! referenced by a nested closure are `Boxed` into a one-slot `Rc<RefCell<_>>`
//! cell so that assignments through the outer frame are visible to the
//! closure that captured them, and vice versa.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use east_core::value::Value;
use east_core::{EastError, EastResult};

use crate::host::PlatformTable;

#[derive(Debug, Clone)]
enum Slot {
    Inline(Value),
    Boxed(Rc<RefCell<Value>>),
}

#[derive(Debug, Default)]
struct Scope {
    vars: RefCell<HashMap<Rc<str>, Slot>>,
}

/// The evaluator's runtime frame. Cheap to clone (an `Rc`-backed scope
/// chain plus a shared platform table), which is what lets `ForArray`/
/// `ForSet`/`ForDict`/`While` open a fresh per-iteration child context
/// without re-walking the whole program.
#[derive(Clone)]
pub struct Context {
    scopes: Vec<Rc<Scope>>,
    pub platform: Rc<PlatformTable>,
    pub call_depth: usize,
    pub max_call_depth: usize,
}

impl Context {
    pub fn new(platform: Rc<PlatformTable>, max_call_depth: usize) -> Self {
        Context { scopes: vec![Rc::new(Scope::default())], platform, call_depth: 0, max_call_depth }
    }

    /// A fresh child scope sharing every outer binding. Used for block
    /// bodies, loop iterations, function calls and `TryCatch` catch bodies.
    /// §4.F.1: "a second fresh context is elided whenever the parent has
    /// already allocated one" — callers that know a block is the sole body
    /// of a node that already pushed a scope (e.g. a function call binding
    /// parameters) should reuse `self` via `with_bindings` instead of
    /// calling `child()` again.
    pub fn child(&self) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(Rc::new(Scope::default()));
        Context { scopes, platform: self.platform.clone(), call_depth: self.call_depth, max_call_depth: self.max_call_depth }
    }

    pub fn define(&self, name: Rc<str>, value: Value, captured: bool) {
        let scope = self.scopes.last().expect("context always has at least one scope");
        let slot = if captured { Slot::Boxed(Rc::new(RefCell::new(value))) } else { Slot::Inline(value) };
        scope.vars.borrow_mut().insert(name, slot);
    }

    pub fn get(&self, name: &str) -> EastResult<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.vars.borrow().get(name) {
                return Ok(match slot {
                    Slot::Inline(v) => v.clone(),
                    Slot::Boxed(cell) => cell.borrow().clone(),
                });
            }
        }
        Err(EastError::internal(format!("unresolved variable \"{name}\" (IR checker bug)")))
    }

    pub fn assign(&self, name: &str, value: Value) -> EastResult<()> {
        for scope in self.scopes.iter().rev() {
            let mut vars = scope.vars.borrow_mut();
            if let Some(slot) = vars.get_mut(name) {
                match slot {
                    Slot::Inline(v) => *v = value,
                    Slot::Boxed(cell) => *cell.borrow_mut() = value,
                }
                return Ok(());
            }
        }
        Err(EastError::internal(format!("assignment to unresolved variable \"{name}\" (IR checker bug)")))
    }

    pub fn enter_call(&self) -> EastResult<Context> {
        let depth = self.call_depth + 1;
        if depth > self.max_call_depth {
            return Err(EastError::internal("maximum call depth exceeded"));
        }
        let mut ctx = self.child();
        ctx.call_depth = depth;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_variable_assignment_is_visible_in_same_scope() {
        let ctx = Context::new(Rc::new(PlatformTable::new()), 1024);
        ctx.define("x".into(), Value::Integer(1), false);
        ctx.assign("x", Value::Integer(2)).unwrap();
        assert_eq!(ctx.get("x").unwrap(), Value::Integer(2));
    }

    #[test]
    fn boxed_capture_is_shared_between_parent_and_child_scope() {
        let ctx = Context::new(Rc::new(PlatformTable::new()), 1024);
        ctx.define("multiplier".into(), Value::Integer(3), true);
        let child = ctx.child();
        child.assign("multiplier", Value::Integer(5)).unwrap();
        // Both the defining scope and the child observe the same cell.
        assert_eq!(ctx.get("multiplier").unwrap(), Value::Integer(5));
    }
}
