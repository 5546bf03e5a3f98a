//! §4.E.4: `Array`/`Set`/`Dict` operators.
//!
//! Every mutating operator checks `ContainerHeader::check_mutable` first
//! (raising `FrozenMutation`/`ConcurrentMutation`); every operator that
//! walks the whole container (`sort`, the bisection family, `forEach`,
//! `map`, `filter`, …) holds an iteration lock for the walk's duration so a
//! callback cannot mutate the container it is being called over (§4.E.4
//! rules 1-3, §3.3).

use std::cmp::Ordering;
use std::cell::RefCell;
use std::rc::Rc;

use east_core::container::ContainerHeader;
use east_core::sorted::{SortedMap, SortedSet};
use east_core::value::{compare, values_equal, ArrayValue, DictValue, SetValue, Value};
use east_core::{EastError, EastResult};

use crate::eval::call_value;
use crate::eval::context::Context;

fn want_array(v: &Value) -> EastResult<&ArrayValue> {
    match v {
        Value::Array(a) => Ok(a),
        other => Err(EastError::internal(format!("expected Array, got {other:?}"))),
    }
}
fn want_set(v: &Value) -> EastResult<&SetValue> {
    match v {
        Value::Set(s) => Ok(s),
        other => Err(EastError::internal(format!("expected Set, got {other:?}"))),
    }
}
fn want_dict(v: &Value) -> EastResult<&DictValue> {
    match v {
        Value::Dict(d) => Ok(d),
        other => Err(EastError::internal(format!("expected Dict, got {other:?}"))),
    }
}
fn want_int(v: &Value) -> EastResult<i64> {
    match v {
        Value::Integer(n) => Ok(*n),
        other => Err(EastError::internal(format!("expected Integer, got {other:?}"))),
    }
}

fn is_some_variant(v: &Value) -> Option<Value> {
    match v {
        Value::Variant(variant) if &*variant.case == "Some" => Some((*variant.payload).clone()),
        _ => None,
    }
}

fn fresh_array(items: Vec<Value>) -> Value {
    Value::Array(ArrayValue { header: Rc::new(ContainerHeader::new()), items: Rc::new(RefCell::new(items)) })
}
fn fresh_set(set: SortedSet) -> Value {
    Value::Set(SetValue { header: Rc::new(ContainerHeader::new()), items: Rc::new(RefCell::new(set)) })
}
fn fresh_dict(map: SortedMap) -> Value {
    Value::Dict(DictValue { header: Rc::new(ContainerHeader::new()), items: Rc::new(RefCell::new(map)) })
}

pub fn dispatch(ctx: &Context, name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    Some(match (name, args) {
        // --- size / has / clear / copy, uniform across the three shapes ---
        ("ArraySize", [a]) => want_array(a).map(|a| Value::Integer(a.items.borrow().len() as i64)),
        ("SetSize", [s]) => want_set(s).map(|s| Value::Integer(s.items.borrow().len() as i64)),
        ("DictSize", [d]) => want_dict(d).map(|d| Value::Integer(d.items.borrow().len() as i64)),

        ("ArrayHas", [a, needle]) => want_array(a)
            .map(|a| Value::Boolean(a.items.borrow().iter().any(|v| values_equal(v, needle)))),
        ("SetHas", [s, needle]) => want_set(s).map(|s| Value::Boolean(s.items.borrow().has(needle))),
        ("DictHas", [d, key]) => want_dict(d).map(|d| Value::Boolean(d.items.borrow().has(key))),

        ("DictGet", [d, key]) => (|| {
            let d = want_dict(d)?;
            let items = d.items.borrow();
            items.get(key).cloned().ok_or_else(|| EastError::missing_key("key not present in dict"))
        })(),
        ("DictTryGet", [d, key]) => (|| {
            let d = want_dict(d)?;
            let items = d.items.borrow();
            Ok(match items.get(key) {
                Some(v) => Value::new_variant("Some", v.clone()),
                None => Value::new_variant("None", Value::Null),
            })
        })(),

        ("ArrayClear", [a]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            a.items.borrow_mut().clear();
            Ok(Value::Null)
        })(),
        ("SetClear", [s]) => (|| {
            let s = want_set(s)?;
            s.header.check_mutable()?;
            s.items.borrow_mut().clear();
            Ok(Value::Null)
        })(),
        ("DictClear", [d]) => (|| {
            let d = want_dict(d)?;
            d.header.check_mutable()?;
            d.items.borrow_mut().clear();
            Ok(Value::Null)
        })(),

        ("ArrayCopy", [a]) => want_array(a).map(|a| fresh_array(a.items.borrow().clone())),
        ("SetCopy", [s]) => want_set(s).map(|s| fresh_set(s.items.borrow().clone())),
        ("DictCopy", [d]) => want_dict(d).map(|d| fresh_dict(d.items.borrow().clone())),

        // --- insert / delete, throwing and try variants ---
        ("ArrayInsert", [a, index, value]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            let idx = want_int(index)?;
            let mut items = a.items.borrow_mut();
            if idx < 0 || idx as usize > items.len() {
                return Err(EastError::missing_key("ArrayInsert: index out of bounds"));
            }
            items.insert(idx as usize, value.clone());
            Ok(Value::Null)
        })(),
        ("ArrayTryInsert", [a, index, value]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            let idx = want_int(index)?;
            let mut items = a.items.borrow_mut();
            if idx < 0 || idx as usize > items.len() {
                return Ok(Value::Boolean(false));
            }
            items.insert(idx as usize, value.clone());
            Ok(Value::Boolean(true))
        })(),
        ("ArrayDelete", [a, index]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            let idx = want_int(index)?;
            let mut items = a.items.borrow_mut();
            if idx < 0 || idx as usize >= items.len() {
                return Err(EastError::missing_key("ArrayDelete: index out of bounds"));
            }
            Ok(items.remove(idx as usize))
        })(),
        ("ArrayTryDelete", [a, index]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            let idx = want_int(index)?;
            let mut items = a.items.borrow_mut();
            if idx < 0 || idx as usize >= items.len() {
                return Ok(Value::new_variant("None", Value::Null));
            }
            Ok(Value::new_variant("Some", items.remove(idx as usize)))
        })(),

        ("SetInsert", [s, value]) => (|| {
            let s = want_set(s)?;
            s.header.check_mutable()?;
            s.items.borrow_mut().insert(value.clone())?;
            Ok(Value::Null)
        })(),
        ("SetTryInsert", [s, value]) => (|| {
            let s = want_set(s)?;
            s.header.check_mutable()?;
            let already_present = s.items.borrow().has(value);
            s.items.borrow_mut().insert_or_replace(value.clone());
            Ok(Value::Boolean(!already_present))
        })(),
        ("SetDelete", [s, value]) => (|| {
            let s = want_set(s)?;
            s.header.check_mutable()?;
            s.items.borrow_mut().remove(value)?;
            Ok(Value::Null)
        })(),
        ("SetTryDelete", [s, value]) => (|| {
            let s = want_set(s)?;
            s.header.check_mutable()?;
            Ok(Value::Boolean(s.items.borrow_mut().try_remove(value)))
        })(),

        ("DictInsert", [d, key, value]) => (|| {
            let d = want_dict(d)?;
            d.header.check_mutable()?;
            d.items.borrow_mut().insert(key.clone(), value.clone())?;
            Ok(Value::Null)
        })(),
        ("DictTryInsert", [d, key, value]) => (|| {
            let d = want_dict(d)?;
            d.header.check_mutable()?;
            let previous = d.items.borrow_mut().insert_or_replace(key.clone(), value.clone());
            Ok(match previous {
                Some(v) => Value::new_variant("Some", v),
                None => Value::new_variant("None", Value::Null),
            })
        })(),
        ("DictDelete", [d, key]) => (|| {
            let d = want_dict(d)?;
            d.header.check_mutable()?;
            d.items.borrow_mut().remove(key)
        })(),
        ("DictTryDelete", [d, key]) => (|| {
            let d = want_dict(d)?;
            d.header.check_mutable()?;
            Ok(match d.items.borrow_mut().try_remove(key) {
                Some(v) => Value::new_variant("Some", v),
                None => Value::new_variant("None", Value::Null),
            })
        })(),

        // --- union, with a conflict resolver callback for dicts ---
        ("SetUnion", [a, b]) => (|| Ok(fresh_set(want_set(a)?.items.borrow().union_with(&want_set(b)?.items.borrow()))))(),
        ("DictUnion", [a, b, resolve]) => (|| {
            let (a, b) = (want_dict(a)?, want_dict(b)?);
            let mut err = None;
            let merged = a.items.borrow().union_with(&b.items.borrow(), |existing, incoming| {
                match call_value(ctx, resolve, &[existing.clone(), incoming.clone()]) {
                    Ok(v) => v,
                    Err(e) => {
                        err.get_or_insert(e);
                        Value::Null
                    }
                }
            });
            match err {
                Some(e) => Err(e),
                None => Ok(fresh_dict(merged)),
            }
        })(),

        // --- traversal: forEach / map / filter / filterMap / firstMap / reduce ---
        ("ArrayForEach", [a, f]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            for item in a.items.borrow().clone() {
                call_value(ctx, f, &[item])?;
            }
            Ok(Value::Null)
        })(),
        ("SetForEach", [s, f]) => (|| {
            let s = want_set(s)?;
            let _lock = s.header.acquire_lock();
            for item in s.items.borrow().iter().cloned().collect::<Vec<_>>() {
                call_value(ctx, f, &[item])?;
            }
            Ok(Value::Null)
        })(),
        ("DictForEach", [d, f]) => (|| {
            let d = want_dict(d)?;
            let _lock = d.header.acquire_lock();
            let pairs: Vec<(Value, Value)> = d.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in pairs {
                call_value(ctx, f, &[k, v])?;
            }
            Ok(Value::Null)
        })(),

        ("ArrayMap", [a, f]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut out = Vec::with_capacity(a.items.borrow().len());
            for item in a.items.borrow().clone() {
                out.push(call_value(ctx, f, &[item])?);
            }
            Ok(fresh_array(out))
        })(),
        ("SetMap", [s, f]) => (|| {
            let s = want_set(s)?;
            let _lock = s.header.acquire_lock();
            let mut out = SortedSet::new();
            for item in s.items.borrow().iter().cloned().collect::<Vec<_>>() {
                out.insert_or_replace(call_value(ctx, f, &[item])?);
            }
            Ok(fresh_set(out))
        })(),
        ("DictMap", [d, f]) => (|| {
            let d = want_dict(d)?;
            let _lock = d.header.acquire_lock();
            let mut out = SortedMap::new();
            let pairs: Vec<(Value, Value)> = d.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in pairs {
                let mapped = call_value(ctx, f, &[k.clone(), v])?;
                out.insert_or_replace(k, mapped);
            }
            Ok(fresh_dict(out))
        })(),

        ("ArrayFilter", [a, pred]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut out = Vec::new();
            for item in a.items.borrow().clone() {
                if want_bool(&call_value(ctx, pred, &[item.clone()])?)? {
                    out.push(item);
                }
            }
            Ok(fresh_array(out))
        })(),
        ("SetFilter", [s, pred]) => (|| {
            let s = want_set(s)?;
            let _lock = s.header.acquire_lock();
            let mut out = SortedSet::new();
            for item in s.items.borrow().iter().cloned().collect::<Vec<_>>() {
                if want_bool(&call_value(ctx, pred, &[item.clone()])?)? {
                    out.insert_or_replace(item);
                }
            }
            Ok(fresh_set(out))
        })(),
        ("DictFilter", [d, pred]) => (|| {
            let d = want_dict(d)?;
            let _lock = d.header.acquire_lock();
            let mut out = SortedMap::new();
            let pairs: Vec<(Value, Value)> = d.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in pairs {
                if want_bool(&call_value(ctx, pred, &[k.clone(), v.clone()])?)? {
                    out.insert_or_replace(k, v);
                }
            }
            Ok(fresh_dict(out))
        })(),

        ("ArrayFilterMap", [a, f]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut out = Vec::new();
            for item in a.items.borrow().clone() {
                if let Some(v) = is_some_variant(&call_value(ctx, f, &[item])?) {
                    out.push(v);
                }
            }
            Ok(fresh_array(out))
        })(),
        ("ArrayFirstMap", [a, f]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            for item in a.items.borrow().clone() {
                if let Some(v) = is_some_variant(&call_value(ctx, f, &[item])?) {
                    return Ok(Value::new_variant("Some", v));
                }
            }
            Ok(Value::new_variant("None", Value::Null))
        })(),

        ("ArrayReduce", [a, init, f]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut acc = init.clone();
            for item in a.items.borrow().clone() {
                acc = call_value(ctx, f, &[acc, item])?;
            }
            Ok(acc)
        })(),
        ("SetReduce", [s, init, f]) => (|| {
            let s = want_set(s)?;
            let _lock = s.header.acquire_lock();
            let mut acc = init.clone();
            for item in s.items.borrow().iter().cloned().collect::<Vec<_>>() {
                acc = call_value(ctx, f, &[acc, item])?;
            }
            Ok(acc)
        })(),
        ("DictReduce", [d, init, f]) => (|| {
            let d = want_dict(d)?;
            let _lock = d.header.acquire_lock();
            let mut acc = init.clone();
            let pairs: Vec<(Value, Value)> = d.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (k, v) in pairs {
                acc = call_value(ctx, f, &[acc, k, v])?;
            }
            Ok(acc)
        })(),
        ("ArrayMapReduce", [a, map_fn, combine_fn, identity]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut acc = identity.clone();
            for item in a.items.borrow().clone() {
                let mapped = call_value(ctx, map_fn, &[item])?;
                acc = call_value(ctx, combine_fn, &[acc, mapped])?;
            }
            Ok(acc)
        })(),

        // --- array-specific ordering operators ---
        ("ArraySort", [a, key_fn]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let mut items = a.items.borrow().clone();
            sort_by_projection(ctx, &mut items, key_fn)?;
            Ok(fresh_array(items))
        })(),
        ("ArraySortInPlace", [a, key_fn]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            let _lock = a.header.acquire_lock();
            let mut items = a.items.borrow().clone();
            sort_by_projection(ctx, &mut items, key_fn)?;
            *a.items.borrow_mut() = items;
            Ok(Value::Null)
        })(),
        ("ArrayReverse", [a]) => want_array(a).map(|a| {
            let mut items = a.items.borrow().clone();
            items.reverse();
            fresh_array(items)
        }),
        ("ArrayReverseInPlace", [a]) => (|| {
            let a = want_array(a)?;
            a.header.check_mutable()?;
            a.items.borrow_mut().reverse();
            Ok(Value::Null)
        })(),
        ("ArrayIsSorted", [a, key_fn]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let keys = project_all(ctx, &a.items.borrow(), key_fn)?;
            Ok(Value::Boolean(keys.windows(2).all(|w| compare(&w[0], &w[1]) != Ordering::Greater)))
        })(),
        ("ArrayFindSortedFirst", [a, key_fn, target]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let keys = project_all(ctx, &a.items.borrow(), key_fn)?;
            Ok(Value::Integer(lower_bound(&keys, target) as i64))
        })(),
        ("ArrayFindSortedLast", [a, key_fn, target]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let keys = project_all(ctx, &a.items.borrow(), key_fn)?;
            Ok(Value::Integer(upper_bound(&keys, target) as i64 - 1))
        })(),
        ("ArrayFindSortedRange", [a, key_fn, target]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            let keys = project_all(ctx, &a.items.borrow(), key_fn)?;
            let lo = lower_bound(&keys, target);
            let hi = upper_bound(&keys, target);
            Ok(Value::new_struct(vec![Value::Integer(lo as i64), Value::Integer(hi as i64)]))
        })(),
        ("ArrayFindFirst", [a, pred]) => (|| {
            let a = want_array(a)?;
            let _lock = a.header.acquire_lock();
            for (i, item) in a.items.borrow().clone().into_iter().enumerate() {
                if want_bool(&call_value(ctx, pred, &[item])?)? {
                    return Ok(Value::Integer(i as i64));
                }
            }
            Ok(Value::Integer(-1))
        })(),

        // --- conversions, with a conflict resolver for collapsing into Set/Dict ---
        ("ArrayToSet", [a]) => (|| {
            let a = want_array(a)?;
            let mut set = SortedSet::new();
            for item in a.items.borrow().clone() {
                set.insert_or_replace(item);
            }
            Ok(fresh_set(set))
        })(),
        ("ArrayToDict", [a, key_fn, value_fn, resolve]) => (|| {
            let a = want_array(a)?;
            let mut map = SortedMap::new();
            for item in a.items.borrow().clone() {
                let k = call_value(ctx, key_fn, &[item.clone()])?;
                let v = call_value(ctx, value_fn, &[item])?;
                if let Some(existing) = map.get(&k).cloned() {
                    let merged = call_value(ctx, resolve, &[existing, v])?;
                    map.insert_or_replace(k, merged);
                } else {
                    map.insert_or_replace(k, v);
                }
            }
            Ok(fresh_dict(map))
        })(),
        ("SetToArray", [s]) => want_set(s).map(|s| fresh_array(s.items.borrow().iter().cloned().collect())),
        ("DictToArray", [d]) => want_dict(d).map(|d| {
            fresh_array(d.items.borrow().iter().map(|(k, v)| Value::new_struct(vec![k.clone(), v.clone()])).collect())
        }),
        ("DictToSet", [d]) => want_dict(d)
            .map(|d| fresh_set(SortedSet::from_values(d.items.borrow().iter().map(|(k, _)| k.clone()), true).expect("keys are already unique"))),

        // --- flatten / group / generate ---
        ("ArrayFlattenToArray", [a]) => (|| {
            let outer = want_array(a)?;
            let mut out = Vec::new();
            for inner in outer.items.borrow().clone() {
                out.extend(want_array(&inner)?.items.borrow().iter().cloned());
            }
            Ok(fresh_array(out))
        })(),
        ("ArrayFlattenToSet", [a]) => (|| {
            let outer = want_array(a)?;
            let mut set = SortedSet::new();
            for inner in outer.items.borrow().clone() {
                for item in want_array(&inner)?.items.borrow().iter().cloned() {
                    set.insert_or_replace(item);
                }
            }
            Ok(fresh_set(set))
        })(),
        ("ArrayFlattenToDict", [a, resolve]) => (|| {
            let outer = want_array(a)?;
            let mut map = SortedMap::new();
            for inner in outer.items.borrow().clone() {
                for pair in want_dict(&inner)?.items.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>() {
                    let (k, v) = pair;
                    if let Some(existing) = map.get(&k).cloned() {
                        let merged = call_value(ctx, resolve, &[existing, v])?;
                        map.insert_or_replace(k, merged);
                    } else {
                        map.insert_or_replace(k, v);
                    }
                }
            }
            Ok(fresh_dict(map))
        })(),

        ("ArrayGroupFold", [a, key_fn, init, fold_fn]) => (|| {
            let arr = want_array(a)?;
            let mut groups = SortedMap::new();
            for item in arr.items.borrow().clone() {
                let key = call_value(ctx, key_fn, &[item.clone()])?;
                let acc = groups.get(&key).cloned().unwrap_or_else(|| init.clone());
                let folded = call_value(ctx, fold_fn, &[acc, item])?;
                groups.insert_or_replace(key, folded);
            }
            Ok(fresh_dict(groups))
        })(),

        ("DictGenerate", [n, key_fn, value_fn]) => (|| {
            let n = want_int(n)?;
            let mut map = SortedMap::new();
            for i in 0..n.max(0) {
                let k = call_value(ctx, key_fn, &[Value::Integer(i)])?;
                let v = call_value(ctx, value_fn, &[Value::Integer(i)])?;
                map.insert(k, v)?;
            }
            Ok(fresh_dict(map))
        })(),

        _ => return None,
    })
}

fn want_bool(v: &Value) -> EastResult<bool> {
    match v {
        Value::Boolean(b) => Ok(*b),
        other => Err(EastError::internal(format!("expected Boolean from callback, got {other:?}"))),
    }
}

fn sort_by_projection(ctx: &Context, items: &mut [Value], key_fn: &Value) -> EastResult<()> {
    let keys = project_all(ctx, items, key_fn)?;
    let mut indexed: Vec<(Value, Value)> = keys.into_iter().zip(items.iter().cloned()).collect();
    indexed.sort_by(|(ka, _), (kb, _)| compare(ka, kb));
    for (slot, (_, v)) in items.iter_mut().zip(indexed.into_iter()) {
        *slot = v;
    }
    Ok(())
}

fn project_all(ctx: &Context, items: &[Value], key_fn: &Value) -> EastResult<Vec<Value>> {
    items.iter().map(|item| call_value(ctx, key_fn, &[item.clone()])).collect()
}

fn lower_bound(keys: &[Value], target: &Value) -> usize {
    keys.partition_point(|k| compare(k, target) == Ordering::Less)
}

fn upper_bound(keys: &[Value], target: &Value) -> usize {
    keys.partition_point(|k| compare(k, target) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PlatformTable;

    fn fresh_ctx() -> Context {
        Context::new(Rc::new(PlatformTable::new()), 1024)
    }

    #[test]
    fn array_insert_out_of_bounds_raises_missing_key() {
        let ctx = fresh_ctx();
        let arr = fresh_array(vec![Value::Integer(1)]);
        let result = dispatch(&ctx, "ArrayInsert", &[arr, Value::Integer(5), Value::Integer(2)]).unwrap();
        assert!(matches!(result, Err(EastError::MissingKey { .. })));
    }

    #[test]
    fn set_insert_rejects_duplicates_by_default() {
        let ctx = fresh_ctx();
        let set = fresh_set(SortedSet::from_values([Value::Integer(1)], false).unwrap());
        let result = dispatch(&ctx, "SetInsert", &[set, Value::Integer(1)]).unwrap();
        assert!(matches!(result, Err(EastError::DuplicateKey { .. })));
    }

    #[test]
    fn mutation_on_a_locked_array_is_rejected() {
        let ctx = fresh_ctx();
        let arr = fresh_array(vec![Value::Integer(1), Value::Integer(2)]);
        let header = match &arr {
            Value::Array(a) => a.header.clone(),
            _ => unreachable!(),
        };
        let guard = header.acquire_lock();
        assert!(header.is_locked());
        let result = dispatch(&ctx, "ArrayClear", &[arr]).unwrap();
        assert!(matches!(result, Err(EastError::ConcurrentMutation { .. })));
        drop(guard);
    }

    #[test]
    fn find_sorted_range_brackets_every_equal_key() {
        let ctx = fresh_ctx();
        let arr = fresh_array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(2), Value::Integer(3)]);
        let identity = crate::eval::closure::Closure {
            label: "identity".into(),
            params: vec![crate::ir::Var::new("x", east_core::Type::Integer, false, false)],
            captures: vec![],
            body: Rc::new(|ctx: &Context| ctx.get("x").map_err(crate::eval::unwind::Unwind::from)),
        };
        let key_fn = Value::Function(east_core::value::FunctionValue { callable: Rc::new(identity), is_async: false });
        let result = dispatch(&ctx, "ArrayFindSortedRange", &[arr, key_fn, Value::Integer(2)]).unwrap().unwrap();
        assert_eq!(result, Value::new_struct(vec![Value::Integer(1), Value::Integer(3)]));
    }
}
