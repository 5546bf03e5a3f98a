//! §4.E.5: the three `Ref` operators. `Ref` has no freeze/lock discipline of
//! its own beyond the header every mutable container carries (§3.3) — a
//! single-slot cell has nothing to iterate, so only `check_mutable` applies,
//! never `acquire_lock`.

use east_core::value::Value;
use east_core::EastError;
use east_core::EastResult;

use crate::eval::call_value;
use crate::eval::context::Context;

fn want_ref(v: &Value) -> EastResult<&east_core::value::RefValue> {
    match v {
        Value::Ref(r) => Ok(r),
        other => Err(EastError::internal(format!("expected Ref, got {other:?}"))),
    }
}

pub fn dispatch(ctx: &Context, name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    Some(match (name, args) {
        ("RefGet", [r]) => want_ref(r).map(|r| r.slot.borrow().clone()),
        ("RefUpdate", [r, new_value]) => (|| {
            let r = want_ref(r)?;
            r.header.check_mutable()?;
            *r.slot.borrow_mut() = new_value.clone();
            Ok(Value::Null)
        })(),
        // `merge(existing, new) -> combined`: combines the slot's current
        // contents with an incoming value through a user callback, then
        // stores and returns the result — the same resolver shape
        // `SortedMap::union_with` takes for dict conflicts (§4.E.4).
        ("RefMerge", [r, incoming, combine]) => (|| {
            let r = want_ref(r)?;
            r.header.check_mutable()?;
            let existing = r.slot.borrow().clone();
            let combined = call_value(ctx, combine, &[existing, incoming.clone()])?;
            *r.slot.borrow_mut() = combined.clone();
            Ok(combined)
        })(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PlatformTable;
    use std::rc::Rc;

    fn fresh_ctx() -> Context {
        Context::new(Rc::new(PlatformTable::new()), 1024)
    }

    #[test]
    fn update_replaces_the_slot_contents() {
        let ctx = fresh_ctx();
        let r = Value::new_ref(Value::Integer(1));
        dispatch(&ctx, "RefUpdate", &[r.clone(), Value::Integer(2)]).unwrap().unwrap();
        let got = dispatch(&ctx, "RefGet", &[r]).unwrap().unwrap();
        assert_eq!(got, Value::Integer(2));
    }

    #[test]
    fn update_on_a_frozen_ref_is_rejected() {
        let ctx = fresh_ctx();
        let r = Value::new_ref(Value::Integer(1));
        if let Value::Ref(rv) = &r {
            rv.header.freeze();
        }
        let result = dispatch(&ctx, "RefUpdate", &[r, Value::Integer(2)]).unwrap();
        assert!(matches!(result, Err(EastError::FrozenMutation { .. })));
    }
}
