//! §4.E.6: the Blob binary codec family. The wire format itself is out of
//! scope (§1 non-goals) — it only has to round-trip (§8 property 3) — so
//! this is a self-describing `bincode` encoding of a shape that mirrors
//! `Value` one-for-one, with `Beast2` adding a one-byte format tag so a
//! decoder can reject a `Beast`-encoded blob fed to `decodeBeast2` and vice
//! versa.

use serde::{Deserialize, Serialize};

use east_core::error::PathStep;
use east_core::value::{Blob, DateTime, Value};
use east_core::{EastError, EastResult, Type};

const BEAST2_TAG: u8 = 2;

#[derive(Serialize, Deserialize)]
enum Wire {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(i64),
    Blob(Vec<u8>),
    Ref(Box<Wire>),
    Array(Vec<Wire>),
    Set(Vec<Wire>),
    Dict(Vec<(Wire, Wire)>),
    Struct(Vec<Wire>),
    Variant(String, Box<Wire>),
}

fn to_wire(v: &Value) -> EastResult<Wire> {
    Ok(match v {
        Value::Null => Wire::Null,
        Value::Boolean(b) => Wire::Boolean(*b),
        Value::Integer(n) => Wire::Integer(*n),
        Value::Float(x) => Wire::Float(*x),
        Value::String(s) => Wire::String(s.to_rust_string()),
        Value::DateTime(dt) => Wire::DateTime(dt.0),
        Value::Blob(b) => Wire::Blob(b.as_bytes().to_vec()),
        Value::Ref(r) => Wire::Ref(Box::new(to_wire(&r.slot.borrow())?)),
        Value::Array(a) => Wire::Array(a.items.borrow().iter().map(to_wire).collect::<EastResult<_>>()?),
        Value::Set(s) => Wire::Set(s.items.borrow().iter().map(to_wire).collect::<EastResult<_>>()?),
        Value::Dict(d) => Wire::Dict(
            d.items
                .borrow()
                .iter()
                .map(|(k, val)| Ok((to_wire(k)?, to_wire(val)?)))
                .collect::<EastResult<_>>()?,
        ),
        Value::Struct(fields) => Wire::Struct(fields.iter().map(to_wire).collect::<EastResult<_>>()?),
        Value::Variant(variant) => {
            Wire::Variant(variant.case.to_string(), Box::new(to_wire(&variant.payload)?))
        }
        Value::Function(_) => return Err(EastError::domain("functions cannot be binary-encoded")),
    })
}

/// Reconstruct a `Value`, checking the wire shape against `ty` as it goes
/// (field count, case membership, dict key uniqueness) the same way
/// `json::parse_json` validates a parsed JSON tree against a type.
fn from_wire(ty: &Type, wire: Wire, path: &mut Vec<PathStep>) -> EastResult<Value> {
    let ty_resolved = match ty {
        Type::Recursive(_) => east_core::types::unfold(ty),
        other => other.clone(),
    };
    let fail = |reason: &str| -> EastError {
        EastError::ParseError {
            reason: reason.to_string(),
            got: "<binary>".to_string(),
            path: path.clone(),
            line: 0,
            col: 0,
            type_name: format!("{ty_resolved:?}"),
        }
    };
    match (&ty_resolved, wire) {
        (Type::Null, Wire::Null) => Ok(Value::Null),
        (Type::Boolean, Wire::Boolean(b)) => Ok(Value::Boolean(b)),
        (Type::Integer, Wire::Integer(n)) => Ok(Value::Integer(n)),
        (Type::Float, Wire::Float(x)) => Ok(Value::Float(x)),
        (Type::String, Wire::String(s)) => Ok(Value::string(s)),
        (Type::DateTime, Wire::DateTime(ms)) => Ok(Value::DateTime(DateTime(ms))),
        (Type::Blob, Wire::Blob(bytes)) => Ok(Value::Blob(Blob::from_bytes(bytes))),
        (Type::Ref(inner), Wire::Ref(boxed)) => from_wire(inner, *boxed, path).map(Value::new_ref),
        (Type::Array(elem), Wire::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(PathStep::Index(i));
                let v = from_wire(elem, item, path);
                path.pop();
                out.push(v?);
            }
            Ok(Value::new_array(out))
        }
        (Type::Set(elem), Wire::Set(items)) => {
            let mut set = east_core::sorted::SortedSet::new();
            for (i, item) in items.into_iter().enumerate() {
                path.push(PathStep::Index(i));
                let v = from_wire(elem, item, path);
                path.pop();
                let v = v?;
                if set.has(&v) {
                    return Err(fail("duplicate element in encoded set"));
                }
                set.insert_or_replace(v);
            }
            Ok(Value::new_set(set))
        }
        (Type::Dict(key_ty, val_ty), Wire::Dict(pairs)) => {
            let mut map = east_core::sorted::SortedMap::new();
            for (key_wire, val_wire) in pairs {
                let key = from_wire(key_ty, key_wire, path)?;
                let val = from_wire(val_ty, val_wire, path)?;
                if map.has(&key) {
                    return Err(fail("duplicate key in encoded dict"));
                }
                map.insert_or_replace(key, val);
            }
            Ok(Value::new_dict(map))
        }
        (Type::Struct(fields), Wire::Struct(values)) => {
            if values.len() != fields.len() {
                return Err(fail("struct field count mismatch"));
            }
            let mut out = Vec::with_capacity(fields.len());
            for (field, value_wire) in fields.iter().zip(values.into_iter()) {
                path.push(PathStep::Field(field.name.clone()));
                let v = from_wire(&field.ty, value_wire, path);
                path.pop();
                out.push(v?);
            }
            Ok(Value::new_struct(out))
        }
        (Type::Variant(cases), Wire::Variant(case_name, payload)) => {
            let case = cases
                .iter()
                .find(|c| c.name == case_name)
                .ok_or_else(|| fail("unknown variant case in encoded value"))?;
            path.push(PathStep::Case(case_name.clone()));
            let v = from_wire(&case.ty, *payload, path);
            path.pop();
            Ok(Value::new_variant(case.name.clone(), v?))
        }
        _ => Err(fail("encoded shape does not match the expected type")),
    }
}

pub fn encode_beast(v: &Value) -> EastResult<Vec<u8>> {
    bincode::serialize(&to_wire(v)?).map_err(|e| EastError::domain(format!("beast encode failed: {e}")))
}

pub fn decode_beast(ty: &Type, bytes: &[u8]) -> EastResult<Value> {
    let wire: Wire = bincode::deserialize(bytes).map_err(|e| EastError::domain(format!("beast decode failed: {e}")))?;
    from_wire(ty, wire, &mut Vec::new())
}

pub fn encode_beast2(v: &Value) -> EastResult<Vec<u8>> {
    let mut out = vec![BEAST2_TAG];
    out.extend(encode_beast(v)?);
    Ok(out)
}

pub fn decode_beast2(ty: &Type, bytes: &[u8]) -> EastResult<Value> {
    match bytes.split_first() {
        Some((&BEAST2_TAG, rest)) => decode_beast(ty, rest),
        _ => Err(EastError::domain("not a Beast2-tagged blob")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use east_core::Field;

    #[test]
    fn struct_round_trips_through_beast() {
        let ty = Type::strct(vec![Field::new("n", Type::Integer), Field::new("s", Type::String)]).unwrap();
        let v = Value::new_struct(vec![Value::Integer(7), Value::string("ok")]);
        let bytes = encode_beast(&v).unwrap();
        assert_eq!(decode_beast(&ty, &bytes).unwrap(), v);
    }

    #[test]
    fn beast2_rejects_a_beast1_payload() {
        let bytes = encode_beast(&Value::Integer(1)).unwrap();
        let err = decode_beast2(&Type::Integer, &bytes).unwrap_err();
        assert!(matches!(err, EastError::DomainError { .. }));
    }
}
