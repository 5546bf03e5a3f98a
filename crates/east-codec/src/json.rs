//! §4.H: the canonical JSON mapping used by `StringPrintJSON`/`StringParseJSON`.
//!
//! Integers round-trip as decimal strings (hosts without bigints would
//! otherwise lose precision past 2^53); floats are JSON numbers except for
//! the handful of values JSON numbers can't represent exactly, which become
//! strings instead.

use chrono::{TimeZone, Utc};
use serde_json::{Map, Number, Value as Json};

use east_core::error::PathStep;
use east_core::types::unfold;
use east_core::value::{Blob, DateTime, Value};
use east_core::{EastError, EastResult, Field, Type};

pub fn print_json(ty: &Type, v: &Value) -> Json {
    let ty = match ty {
        Type::Recursive(_) => unfold(ty),
        other => other.clone(),
    };
    match (&ty, v) {
        (_, Value::Null) => Json::Null,
        (_, Value::Boolean(b)) => Json::Bool(*b),
        (_, Value::Integer(n)) => Json::String(n.to_string()),
        (_, Value::Float(x)) => print_float(*x),
        (_, Value::String(s)) => Json::String(s.to_rust_string()),
        (_, Value::DateTime(dt)) => Json::String(print_datetime(*dt)),
        (_, Value::Blob(b)) => Json::String(print_blob(b)),
        (Type::Ref(inner), Value::Ref(r)) => print_json(inner, &r.slot.borrow()),
        (Type::Array(elem), Value::Array(a)) => {
            Json::Array(a.items.borrow().iter().map(|item| print_json(elem, item)).collect())
        }
        (Type::Set(elem), Value::Set(s)) => {
            Json::Array(s.items.borrow().iter().map(|item| print_json(elem, item)).collect())
        }
        (Type::Dict(key_ty, val_ty), Value::Dict(d)) => Json::Array(
            d.items
                .borrow()
                .iter()
                .map(|(k, val)| {
                    let mut obj = Map::new();
                    obj.insert("key".into(), print_json(key_ty, k));
                    obj.insert("value".into(), print_json(val_ty, val));
                    Json::Object(obj)
                })
                .collect(),
        ),
        (Type::Struct(fields), Value::Struct(values)) => {
            let mut obj = Map::new();
            for (field, val) in fields.iter().zip(values.iter()) {
                obj.insert(field.name.clone(), print_json(&field.ty, val));
            }
            Json::Object(obj)
        }
        (Type::Variant(cases), Value::Variant(variant)) => {
            let mut obj = Map::new();
            obj.insert("type".into(), Json::String(variant.case.to_string()));
            if let Some(case) = cases.iter().find(|c| c.name.as_str() == &*variant.case) {
                obj.insert("value".into(), print_json(&case.ty, &variant.payload));
            }
            Json::Object(obj)
        }
        _ => Json::Null,
    }
}

fn print_float(x: f64) -> Json {
    if x.is_nan() {
        return Json::String("NaN".into());
    }
    if x == f64::INFINITY {
        return Json::String("Infinity".into());
    }
    if x == f64::NEG_INFINITY {
        return Json::String("-Infinity".into());
    }
    if x == 0.0 && x.is_sign_negative() {
        return Json::String("-0.0".into());
    }
    Number::from_f64(x).map(Json::Number).unwrap_or_else(|| Json::String(x.to_string()))
}

fn print_blob(b: &Blob) -> String {
    format!("0x{}", hex::encode(b.as_bytes()))
}

fn print_datetime(dt: DateTime) -> String {
    let instant = Utc.timestamp_millis_opt(dt.0).single().expect("DateTime values are always total");
    instant.format("%Y-%m-%dT%H:%M:%S%.3f+00:00").to_string()
}

pub fn to_string(ty: &Type, v: &Value) -> String {
    print_json(ty, v).to_string()
}

pub fn from_str(ty: &Type, input: &str) -> EastResult<Value> {
    let json: Json = serde_json::from_str(input)
        .map_err(|e| parse_error(format!("invalid JSON: {e}"), input, &[], ty))?;
    parse_json(ty, &json, &mut Vec::new())
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Never => "Never".into(),
        Type::Null => "Null".into(),
        Type::Boolean => "Boolean".into(),
        Type::Integer => "Integer".into(),
        Type::Float => "Float".into(),
        Type::String => "String".into(),
        Type::DateTime => "DateTime".into(),
        Type::Blob => "Blob".into(),
        Type::Ref(_) => "Ref".into(),
        Type::Array(_) => "Array".into(),
        Type::Set(_) => "Set".into(),
        Type::Dict(_, _) => "Dict".into(),
        Type::Struct(_) => "Struct".into(),
        Type::Variant(_) => "Variant".into(),
        Type::Recursive(_) | Type::RecursiveMarker(_) => "Recursive".into(),
        Type::Function(_, _) | Type::AsyncFunction(_, _) => "Function".into(),
    }
}

fn parse_error(reason: impl Into<String>, fragment: impl std::fmt::Display, path: &[PathStep], ty: &Type) -> EastError {
    EastError::ParseError {
        reason: reason.into(),
        got: fragment.to_string(),
        path: path.to_vec(),
        line: 0,
        col: 0,
        type_name: type_name(ty),
    }
}

fn parse_json(ty: &Type, json: &Json, path: &mut Vec<PathStep>) -> EastResult<Value> {
    match ty {
        Type::Recursive(_) => parse_json(&unfold(ty), json, path),
        Type::Never => Err(parse_error("Never has no values", json, path, ty)),
        Type::Null => match json {
            Json::Null => Ok(Value::Null),
            other => Err(parse_error("expected null", other, path, ty)),
        },
        Type::Boolean => match json {
            Json::Bool(b) => Ok(Value::Boolean(*b)),
            other => Err(parse_error("expected a boolean", other, path, ty)),
        },
        Type::Integer => match json {
            Json::String(s) => {
                s.parse::<i64>().map(Value::Integer).map_err(|_| parse_error(format!("integer string \"{s}\" out of i64 range"), json, path, ty))
            }
            other => Err(parse_error("expected an integer encoded as a decimal string", other, path, ty)),
        },
        Type::Float => match json {
            Json::Number(n) => n.as_f64().map(Value::Float).ok_or_else(|| parse_error("float is not representable as f64", json, path, ty)),
            Json::String(s) => match s.as_str() {
                "NaN" => Ok(Value::Float(f64::NAN)),
                "Infinity" => Ok(Value::Float(f64::INFINITY)),
                "-Infinity" => Ok(Value::Float(f64::NEG_INFINITY)),
                "-0.0" => Ok(Value::Float(-0.0)),
                other => Err(parse_error(format!("unrecognised float string \"{other}\""), json, path, ty)),
            },
            other => Err(parse_error("expected a float", other, path, ty)),
        },
        Type::String => match json {
            Json::String(s) => Ok(Value::string(s)),
            other => Err(parse_error("expected a string", other, path, ty)),
        },
        Type::DateTime => match json {
            Json::String(s) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|_| parse_error(format!("invalid RFC-3339 datetime \"{s}\""), json, path, ty))?;
                Ok(Value::DateTime(DateTime(parsed.timestamp_millis())))
            }
            other => Err(parse_error("expected an RFC-3339 datetime string", other, path, ty)),
        },
        Type::Blob => match json {
            Json::String(s) => {
                let digits = s.strip_prefix("0x").ok_or_else(|| parse_error("blob string must start with \"0x\"", json, path, ty))?;
                let bytes = hex::decode(digits).map_err(|e| parse_error(format!("invalid hex: {e}"), json, path, ty))?;
                Ok(Value::Blob(Blob::from_bytes(bytes)))
            }
            other => Err(parse_error("expected a hex-encoded blob string", other, path, ty)),
        },
        Type::Ref(inner) => parse_json(inner, json, path).map(Value::new_ref),
        Type::Array(elem) => match json {
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(PathStep::Index(i));
                    let v = parse_json(elem, item, path);
                    path.pop();
                    out.push(v?);
                }
                Ok(Value::new_array(out))
            }
            other => Err(parse_error("expected a JSON array", other, path, ty)),
        },
        Type::Set(elem) => match json {
            Json::Array(items) => {
                let mut set = east_core::sorted::SortedSet::new();
                for (i, item) in items.iter().enumerate() {
                    path.push(PathStep::Index(i));
                    let v = parse_json(elem, item, path);
                    path.pop();
                    let v = v?;
                    if set.has(&v) {
                        return Err(parse_error("duplicate element in set array", item, path, ty));
                    }
                    set.insert_or_replace(v);
                }
                Ok(Value::new_set(set))
            }
            other => Err(parse_error("expected a JSON array", other, path, ty)),
        },
        Type::Dict(key_ty, val_ty) => match json {
            Json::Array(items) => {
                let mut map = east_core::sorted::SortedMap::new();
                for (i, item) in items.iter().enumerate() {
                    path.push(PathStep::Index(i));
                    let obj = item.as_object().ok_or_else(|| parse_error("expected a {key, value} object", item, path, ty))?;
                    let key_json = obj.get("key").ok_or_else(|| parse_error("missing \"key\" field", item, path, ty))?;
                    let val_json = obj.get("value").ok_or_else(|| parse_error("missing \"value\" field", item, path, ty))?;
                    path.push(PathStep::Field("key".into()));
                    let key = parse_json(key_ty, key_json, path);
                    path.pop();
                    let key = key?;
                    path.push(PathStep::Field("value".into()));
                    let val = parse_json(val_ty, val_json, path);
                    path.pop();
                    let val = val?;
                    path.pop();
                    if map.has(&key) {
                        return Err(parse_error("duplicate key in dict array", item, path, ty));
                    }
                    map.insert_or_replace(key, val);
                }
                Ok(Value::new_dict(map))
            }
            other => Err(parse_error("expected a JSON array", other, path, ty)),
        },
        Type::Struct(fields) => match json {
            Json::Object(obj) => {
                let mut values = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    let field_json = obj
                        .get(&field.name)
                        .ok_or_else(|| parse_error(format!("missing field \"{}\"", field.name), json, path, ty))?;
                    path.push(PathStep::Field(field.name.clone()));
                    let v = parse_json(&field.ty, field_json, path);
                    path.pop();
                    values.push(v?);
                }
                let known: std::collections::HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                if let Some(extra) = obj.keys().find(|k| !known.contains(k.as_str())) {
                    return Err(parse_error(format!("unexpected field \"{extra}\""), json, path, ty));
                }
                Ok(Value::new_struct(values))
            }
            other => Err(parse_error("expected a JSON object", other, path, ty)),
        },
        Type::Variant(cases) => match json {
            Json::Object(obj) => {
                let case_name = obj
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| parse_error("missing \"type\" field", json, path, ty))?;
                let case: &Field = cases
                    .iter()
                    .find(|c| c.name == case_name)
                    .ok_or_else(|| parse_error(format!("unknown variant case \"{case_name}\""), json, path, ty))?;
                let payload = match obj.get("value") {
                    Some(val_json) => {
                        path.push(PathStep::Case(case_name.to_string()));
                        let v = parse_json(&case.ty, val_json, path);
                        path.pop();
                        v?
                    }
                    None if case.ty == Type::Null => Value::Null,
                    None => return Err(parse_error(format!("variant case \"{case_name}\" requires a \"value\" field"), json, path, ty)),
                };
                Ok(Value::new_variant(case.name.clone(), payload))
            }
            other => Err(parse_error("expected a JSON object", other, path, ty)),
        },
        Type::RecursiveMarker(_) => Err(parse_error("unresolved recursive marker", json, path, ty)),
        Type::Function(_, _) | Type::AsyncFunction(_, _) => {
            Err(parse_error("functions are not JSON-serialisable", json, path, ty))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_serialise_as_decimal_strings() {
        let printed = print_json(&Type::Integer, &Value::Integer(i64::MAX));
        assert_eq!(printed, Json::String(i64::MAX.to_string()));
    }

    #[test]
    fn dict_round_trips_through_key_value_array() {
        let ty = Type::dict(Type::String, Type::Integer);
        let mut map = east_core::sorted::SortedMap::new();
        map.insert(Value::string("b"), Value::Integer(2)).unwrap();
        map.insert(Value::string("a"), Value::Integer(1)).unwrap();
        let v = Value::new_dict(map);
        let printed = to_string(&ty, &v);
        assert_eq!(printed, r#"[{"key":"a","value":"1"},{"key":"b","value":"2"}]"#);
        assert_eq!(from_str(&ty, &printed).unwrap(), v);
    }

    #[test]
    fn unknown_struct_field_is_rejected() {
        let ty = Type::strct(vec![Field::new("x", Type::Integer)]).unwrap();
        let err = from_str(&ty, r#"{"x":"1","y":"2"}"#).unwrap_err();
        assert!(matches!(err, EastError::ParseError { .. }));
    }
}
