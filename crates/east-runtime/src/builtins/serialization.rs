//! §4.E.6: the serialization family. Every operator here carries a single
//! type parameter (the data type being printed/parsed/encoded) rather than
//! a callback, so `dispatch` takes `type_params` instead of a `Context`.

use east_core::value::{Blob, Value};
use east_core::{EastError, EastResult, Type};

fn want_string(v: &Value) -> EastResult<String> {
    match v {
        Value::String(s) => Ok(s.to_rust_string()),
        other => Err(EastError::internal(format!("expected String, got {other:?}"))),
    }
}

fn want_blob(v: &Value) -> EastResult<&Blob> {
    match v {
        Value::Blob(b) => Ok(b),
        other => Err(EastError::internal(format!("expected Blob, got {other:?}"))),
    }
}

pub fn dispatch(type_params: &[Type], name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    let ty = type_params.first();
    Some(match (name, ty, args) {
        ("Print", Some(ty), [v]) => Ok(Value::string(east_codec::text::print(ty, v))),
        ("Parse", Some(ty), [s]) => (|| east_codec::text::parse(ty, &want_string(s)?))(),
        ("StringPrintJSON", Some(ty), [v]) => Ok(Value::string(east_codec::json::to_string(ty, v))),
        ("StringParseJSON", Some(ty), [s]) => (|| east_codec::json::from_str(ty, &want_string(s)?))(),
        ("encodeBeast", _, [v]) => east_codec::beast::encode_beast(v).map(|bytes| Value::Blob(Blob::from_bytes(bytes))),
        ("decodeBeast", Some(ty), [b]) => (|| east_codec::beast::decode_beast(ty, want_blob(b)?.as_bytes()))(),
        ("encodeBeast2", _, [v]) => east_codec::beast::encode_beast2(v).map(|bytes| Value::Blob(Blob::from_bytes(bytes))),
        ("decodeBeast2", Some(ty), [b]) => (|| east_codec::beast::decode_beast2(ty, want_blob(b)?.as_bytes()))(),
        ("encodeCsv", Some(ty), [rows]) => (|| {
            let row_ty = match ty {
                Type::Array(elem) => elem.as_ref(),
                other => other,
            };
            east_codec::csv::encode_csv(row_ty, rows).map(Value::string)
        })(),
        ("decodeCsv", Some(ty), [s]) => (|| {
            let row_ty = match ty {
                Type::Array(elem) => elem.as_ref(),
                other => other,
            };
            east_codec::csv::decode_csv(row_ty, &want_string(s)?)
        })(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use east_core::Field;

    #[test]
    fn print_parse_round_trips_an_integer() {
        let printed = dispatch(&[Type::Integer], "Print", &[Value::Integer(42)]).unwrap().unwrap();
        assert_eq!(printed, Value::string("42"));
        let parsed = dispatch(&[Type::Integer], "Parse", &[printed]).unwrap().unwrap();
        assert_eq!(parsed, Value::Integer(42));
    }

    #[test]
    fn json_round_trips_a_struct() {
        let ty = Type::strct(vec![Field::new("n", Type::Integer)]).unwrap();
        let v = Value::new_struct(vec![Value::Integer(5)]);
        let printed = dispatch(&[ty.clone()], "StringPrintJSON", &[v.clone()]).unwrap().unwrap();
        let parsed = dispatch(&[ty], "StringParseJSON", &[printed]).unwrap().unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn beast_round_trips_a_value() {
        let ty = Type::Integer;
        let encoded = dispatch(&[ty.clone()], "encodeBeast", &[Value::Integer(99)]).unwrap().unwrap();
        let decoded = dispatch(&[ty], "decodeBeast", &[encoded]).unwrap().unwrap();
        assert_eq!(decoded, Value::Integer(99));
    }
}
