//! The concrete `Callable` behind every `Value::Function` produced by this
//! evaluator: a compiled body closed over its captured variables (§4.F.1).

use std::fmt;
use std::rc::Rc;

use east_core::value::{Callable, Value};
use east_core::EastResult;

use crate::eval::context::Context;
use crate::eval::unwind::{EvalResult, Unwind};
use crate::ir::Var;

pub type CompiledNode = Rc<dyn Fn(&Context) -> EvalResult>;

/// `env`: the captured values, snapshotted at closure-creation time (§4.F.1:
/// "a closure record: captured variables + parameter arity + body
/// closure"). `Context::define` re-boxes a captured variable's current
/// value so later mutation of that same boxed cell in the *defining* scope
/// is still observed if the cell is shared — capture happens by re-reading
/// the defining context's current cell for each `Var` market `captured`.
pub struct Closure {
    pub label: String,
    pub params: Vec<Var>,
    pub captures: Vec<(Var, Value)>,
    pub body: CompiledNode,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("label", &self.label)
            .field("arity", &self.params.len())
            .finish()
    }
}

impl Callable for Closure {
    fn arity(&self) -> usize {
        self.params.len()
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Closure {
    /// Build the call frame: a fresh child context binding parameters and
    /// re-establishing captures, then run the compiled body. `Return`
    /// unwinds are caught here and become the call's ordinary result
    /// (§4.F.2: "Call sites catch ReturnUnwind and yield its payload").
    pub fn invoke(&self, caller: &Context, args: &[Value]) -> EastResult<Value> {
        let mut call_ctx = caller.enter_call()?;
        call_ctx = call_ctx.child();
        for (var, value) in &self.captures {
            call_ctx.define(var.name.clone(), value.clone(), var.captured);
        }
        for (var, value) in self.params.iter().zip(args.iter()) {
            call_ctx.define(var.name.clone(), value.clone(), var.captured);
        }
        match (self.body)(&call_ctx) {
            Ok(value) => Ok(value),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Break(_)) | Err(Unwind::Continue(_)) => {
                Err(east_core::EastError::internal(
                    "break/continue escaped its enclosing loop into a function boundary",
                ))
            }
        }
    }
}
