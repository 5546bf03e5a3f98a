//! §4.E: the builtin operator library, dispatched by name from the `Builtin`
//! IR node. Each family module owns a slice of the name space and returns
//! `None` from its `dispatch` when a name isn't one of its own, so the
//! top-level `dispatch` here is a plain fallthrough chain rather than a
//! giant match.

pub mod collections;
pub mod datetime;
pub mod primitive;
pub mod refs;
pub mod serialization;
pub mod string;

use east_core::value::Value;
use east_core::{EastError, EastResult, Type};

use crate::eval::context::Context;

pub fn dispatch(ctx: &Context, name: &str, type_params: &[Type], args: &[Value]) -> EastResult<Value> {
    if let Some(result) = primitive::dispatch(name, args) {
        return result;
    }
    if let Some(result) = string::dispatch(name, args) {
        return result;
    }
    if let Some(result) = datetime::dispatch(name, args) {
        return result;
    }
    if let Some(result) = collections::dispatch(ctx, name, args) {
        return result;
    }
    if let Some(result) = refs::dispatch(ctx, name, args) {
        return result;
    }
    if let Some(result) = serialization::dispatch(type_params, name, args) {
        return result;
    }
    tracing::warn!(builtin = name, "dispatch reached no family handler");
    Err(EastError::internal(format!("unknown builtin \"{name}\"")))
}
