//! Typed unwinds (§4.F.2, §9): `return`/`break`/`continue` propagate as
//! values threaded through `Result`, not as out-of-band exceptions — the
//! redesign §9 calls for when the target has no cheap native unwind. `Error`
//! nodes and builtin failures share the same `Result::Err` channel so `?`
//! composes uniformly; only `TryCatch` and loop/call boundaries need to
//! distinguish the four cases.

use east_core::EastError;
use east_core::value::Value;

use crate::ir::Label;

/// Every non-local exit from a compiled node's evaluation.
#[derive(Debug, Clone)]
pub enum Unwind {
    /// `return expr` — caught by the nearest enclosing `Call`.
    Return(Value),
    /// `break` — caught by the loop matching `label` (innermost if `None`).
    Break(Label),
    /// `continue` — caught by the loop matching `label`.
    Continue(Label),
    /// An `EastError` propagating out of a node. `TryCatch` catches every
    /// variant here except `InternalError` (§7); unmatched `Break`/
    /// `Continue` that reach the program root, and any `InternalError`,
    /// are bugs in the host's IR construction, not catchable failures.
    Error(EastError),
}

impl From<EastError> for Unwind {
    fn from(err: EastError) -> Self {
        Unwind::Error(err)
    }
}

pub type EvalResult = Result<Value, Unwind>;

impl Unwind {
    pub fn is_error(&self) -> bool {
        matches!(self, Unwind::Error(_))
    }

    /// Loop labels match either a `None` (innermost) request or an exact
    /// name; a labelled loop also accepts an unlabelled `break`/`continue`
    /// meant for it when it is the innermost loop (checked by the caller,
    /// which only offers unwinds that reached it without being consumed by
    /// a more deeply nested loop first).
    pub fn matches_label(target: &Label, requested: &Label) -> bool {
        match requested {
            None => true,
            Some(_) => requested == target,
        }
    }
}
