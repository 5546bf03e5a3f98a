//! `encodeCsv`/`decodeCsv` (§4.E.6): a tabular rendering of `Array<Struct>`
//! of scalar fields, RFC-4180-ish (comma-separated, `"` doubled inside
//! quoted fields, `\r\n` line endings, a header row of field names).

use east_core::value::{Blob, DateTime, Value};
use east_core::{EastError, EastResult, Field, Type};

fn scalar_cell(ty: &Type, v: &Value) -> EastResult<String> {
    Ok(match (ty, v) {
        (_, Value::Null) => String::new(),
        (Type::Boolean, Value::Boolean(b)) => b.to_string(),
        (Type::Integer, Value::Integer(n)) => n.to_string(),
        (Type::Float, Value::Float(x)) => crate::text::print(&Type::Float, &Value::Float(*x)),
        (Type::String, Value::String(s)) => s.to_rust_string(),
        (Type::DateTime, Value::DateTime(dt)) => crate::text::print(&Type::DateTime, &Value::DateTime(*dt)),
        (Type::Blob, Value::Blob(b)) => format!("0x{}", hex::encode(b.as_bytes())),
        _ => return Err(EastError::domain("encodeCsv only supports scalar struct fields")),
    })
}

fn quote_if_needed(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn encode_csv(row_ty: &Type, rows: &Value) -> EastResult<String> {
    let fields: &[Field] = match row_ty {
        Type::Struct(fields) => fields,
        _ => return Err(EastError::domain("encodeCsv requires an Array<Struct> type")),
    };
    let array = match rows {
        Value::Array(a) => a,
        _ => return Err(EastError::domain("encodeCsv requires an Array value")),
    };
    let mut out = String::new();
    out.push_str(&fields.iter().map(|f| quote_if_needed(&f.name)).collect::<Vec<_>>().join(","));
    out.push_str("\r\n");
    for row in array.items.borrow().iter() {
        let values = match row {
            Value::Struct(values) => values,
            _ => return Err(EastError::domain("row is not a Struct value")),
        };
        let cells: Vec<String> = fields
            .iter()
            .zip(values.iter())
            .map(|(f, v)| scalar_cell(&f.ty, v).map(|c| quote_if_needed(&c)))
            .collect::<EastResult<_>>()?;
        out.push_str(&cells.join(","));
        out.push_str("\r\n");
    }
    Ok(out)
}

fn parse_scalar_cell(ty: &Type, cell: &str) -> EastResult<Value> {
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    Ok(match ty {
        Type::Boolean => Value::Boolean(cell.parse::<bool>().map_err(|_| EastError::domain(format!("invalid boolean \"{cell}\"")))?),
        Type::Integer => Value::Integer(cell.parse::<i64>().map_err(|_| EastError::domain(format!("invalid integer \"{cell}\"")))?),
        Type::Float => crate::text::parse(&Type::Float, cell)?,
        Type::String => Value::string(cell),
        Type::DateTime => crate::text::parse(&Type::DateTime, cell)?,
        Type::Blob => {
            let digits = cell.strip_prefix("0x").ok_or_else(|| EastError::domain("blob cell must start with \"0x\""))?;
            Value::Blob(Blob::from_bytes(hex::decode(digits).map_err(|e| EastError::domain(format!("invalid hex: {e}")))?))
        }
        _ => return Err(EastError::domain("decodeCsv only supports scalar struct fields")),
    })
}

/// Minimal RFC-4180 row splitter: handles quoted fields with embedded
/// commas/newlines and doubled-quote escapes.
fn split_rows(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                other => field.push(other),
            }
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

pub fn decode_csv(row_ty: &Type, input: &str) -> EastResult<Value> {
    let fields: &[Field] = match row_ty {
        Type::Struct(fields) => fields,
        _ => return Err(EastError::domain("decodeCsv requires an Array<Struct> type")),
    };
    let rows = split_rows(input);
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or_else(|| EastError::domain("CSV input is missing a header row"))?;
    if header.len() != fields.len() || header.iter().zip(fields.iter()).any(|(h, f)| h != &f.name) {
        return Err(EastError::domain("CSV header does not match the expected struct fields"));
    }
    let mut out = Vec::new();
    for row in rows {
        if row.len() != fields.len() {
            return Err(EastError::domain("CSV row has the wrong number of fields"));
        }
        let values = fields
            .iter()
            .zip(row.iter())
            .map(|(f, cell)| parse_scalar_cell(&f.ty, cell))
            .collect::<EastResult<_>>()?;
        out.push(Value::new_struct(values));
    }
    Ok(Value::new_array(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_table() {
        let ty = Type::strct(vec![Field::new("name", Type::String), Field::new("age", Type::Integer)]).unwrap();
        let rows = Value::new_array(vec![
            Value::new_struct(vec![Value::string("Ada"), Value::Integer(36)]),
            Value::new_struct(vec![Value::string("Grace"), Value::Integer(85)]),
        ]);
        let csv = encode_csv(&ty, &rows).unwrap();
        assert_eq!(csv, "name,age\r\nAda,36\r\nGrace,85\r\n");
        let array_ty = Type::array(ty.clone());
        let _ = array_ty;
        assert_eq!(decode_csv(&ty, &csv).unwrap(), rows);
    }

    #[test]
    fn quotes_a_field_containing_a_comma() {
        let ty = Type::strct(vec![Field::new("note", Type::String)]).unwrap();
        let rows = Value::new_array(vec![Value::new_struct(vec![Value::string("a, b")])]);
        let csv = encode_csv(&ty, &rows).unwrap();
        assert_eq!(csv, "note\r\n\"a, b\"\r\n");
    }
}
