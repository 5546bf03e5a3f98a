//! §4.G: the canonical printed form and its strict parser.
//!
//! Printing is untyped (a value already knows its own shape); parsing is
//! type-directed, which is what lets the grammar stay ambiguity-free
//! without lookahead tricks (a `{}` is a set or a dict purely depending on
//! what the caller asked to parse).

use std::fmt::Write as _;

use chrono::{TimeZone, Utc};

use east_core::error::PathStep;
use east_core::types::unfold;
use east_core::value::{Blob, DateTime, EastString, Value};
use east_core::{EastError, EastResult, Type};

// ---------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------

pub fn print(ty: &Type, v: &Value) -> String {
    let mut out = String::new();
    print_into(&mut out, ty, v);
    out
}

fn print_into(out: &mut String, ty: &Type, v: &Value) {
    let ty = match ty {
        Type::Recursive(_) => unfold(ty),
        other => other.clone(),
    };
    match (&ty, v) {
        (_, Value::Null) => out.push_str("null"),
        (_, Value::Boolean(b)) => out.push_str(if *b { "true" } else { "false" }),
        (_, Value::Integer(n)) => {
            let _ = write!(out, "{n}");
        }
        (_, Value::Float(x)) => out.push_str(&print_float(*x)),
        (_, Value::String(s)) => print_string(out, s),
        (_, Value::DateTime(dt)) => out.push_str(&print_datetime(*dt)),
        (_, Value::Blob(b)) => out.push_str(&print_blob(b)),
        (Type::Ref(inner), Value::Ref(r)) => {
            out.push('&');
            print_into(out, inner, &r.slot.borrow());
        }
        (Type::Array(elem), Value::Array(a)) => {
            out.push('[');
            for (i, item) in a.items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_into(out, elem, item);
            }
            out.push(']');
        }
        (Type::Set(elem), Value::Set(s)) => {
            let items = s.items.borrow();
            if items.is_empty() {
                out.push_str("{}");
            } else {
                out.push('{');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    print_into(out, elem, item);
                }
                out.push('}');
            }
        }
        (Type::Dict(key_ty, val_ty), Value::Dict(d)) => {
            let items = d.items.borrow();
            if items.is_empty() {
                out.push_str("{:}");
            } else {
                out.push('{');
                for (i, (k, val)) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    print_into(out, key_ty, k);
                    out.push_str(": ");
                    print_into(out, val_ty, val);
                }
                out.push('}');
            }
        }
        (Type::Struct(fields), Value::Struct(values)) => {
            out.push('(');
            for (i, (field, val)) in fields.iter().zip(values.iter()).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}=", field.name);
                print_into(out, &field.ty, val);
            }
            out.push(')');
        }
        (Type::Variant(cases), Value::Variant(variant)) => {
            let _ = write!(out, ".{}", variant.case);
            if let Some(case) = cases.iter().find(|c| c.name.as_str() == &*variant.case) {
                out.push(' ');
                print_into(out, &case.ty, &variant.payload);
            }
        }
        _ => out.push_str("null"),
    }
}

fn print_float(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x == f64::INFINITY {
        return "Infinity".to_string();
    }
    if x == f64::NEG_INFINITY {
        return "-Infinity".to_string();
    }
    if x == 0.0 && x.is_sign_negative() {
        return "-0.0".to_string();
    }
    let s = format!("{x}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

fn print_string(out: &mut String, s: &EastString) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(*other),
        }
    }
    out.push('"');
}

fn print_blob(b: &Blob) -> String {
    format!("0x{}", hex::encode(b.as_bytes()))
}

fn print_datetime(dt: DateTime) -> String {
    let instant = Utc.timestamp_millis_opt(dt.0).single().expect("DateTime values are always total");
    instant.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

// ---------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    path: Vec<PathStep>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser { chars: input.chars().collect(), pos: 0, line: 1, col: 1, path: Vec::new() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, reason: impl Into<String>, type_name: &str) -> EastError {
        let got = match self.peek() {
            Some(c) => c.to_string(),
            None => "<eof>".to_string(),
        };
        EastError::ParseError {
            reason: reason.into(),
            got,
            path: self.path.clone(),
            line: self.line,
            col: self.col,
            type_name: type_name.to_string(),
        }
    }

    fn expect_char(&mut self, c: char, type_name: &str) -> EastResult<()> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected \"{c}\""), type_name))
        }
    }

    fn expect_literal(&mut self, lit: &str, type_name: &str) -> EastResult<()> {
        for expected in lit.chars() {
            if self.peek() != Some(expected) {
                return Err(self.error(format!("expected \"{lit}\""), type_name));
            }
            self.bump();
        }
        Ok(())
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if pred(c)) {
            s.push(self.bump().unwrap());
        }
        s
    }

    fn read_identifier(&mut self) -> String {
        self.read_while(|c| c.is_alphanumeric() || c == '_')
    }
}

pub fn parse(ty: &Type, input: &str) -> EastResult<Value> {
    let mut p = Parser::new(input);
    p.skip_ws();
    let result = (|| {
        let v = parse_value(&mut p, ty)?;
        p.skip_ws();
        if !p.at_eof() {
            return Err(p.error("unexpected trailing input", &type_name(ty)));
        }
        Ok(v)
    })();
    if let Err(err) = &result {
        tracing::debug!(%err, "text parse error");
    }
    result
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

fn parse_value(p: &mut Parser, ty: &Type) -> EastResult<Value> {
    p.skip_ws();
    match ty {
        Type::Recursive(_) => parse_value(p, &unfold(ty)),
        Type::Never => Err(p.error("Never has no values", "Never")),
        Type::Null => {
            p.expect_literal("null", "Null")?;
            Ok(Value::Null)
        }
        Type::Boolean => parse_boolean(p),
        Type::Integer => parse_integer(p),
        Type::Float => parse_float(p),
        Type::String => parse_string(p).map(Value::String),
        Type::DateTime => parse_datetime(p),
        Type::Blob => parse_blob(p),
        Type::Ref(inner) => {
            p.expect_char('&', "Ref")?;
            p.skip_ws();
            Ok(Value::new_ref(parse_value(p, inner)?))
        }
        Type::Array(elem) => parse_array(p, elem),
        Type::Set(elem) => parse_set(p, elem),
        Type::Dict(key_ty, val_ty) => parse_dict(p, key_ty, val_ty),
        Type::Struct(fields) => parse_struct(p, fields),
        Type::Variant(cases) => parse_variant(p, cases),
        Type::RecursiveMarker(_) => Err(p.error("unresolved recursive marker", "Recursive")),
        Type::Function(_, _) | Type::AsyncFunction(_, _) => {
            Err(p.error("functions are not printable/parseable data values", "Function"))
        }
    }
}

fn parse_boolean(p: &mut Parser) -> EastResult<Value> {
    if p.peek() == Some('t') {
        p.expect_literal("true", "Boolean")?;
        Ok(Value::Boolean(true))
    } else if p.peek() == Some('f') {
        p.expect_literal("false", "Boolean")?;
        Ok(Value::Boolean(false))
    } else {
        Err(p.error("expected \"true\" or \"false\"", "Boolean"))
    }
}

fn read_number_token(p: &mut Parser) -> String {
    let mut s = String::new();
    if p.peek() == Some('-') {
        s.push(p.bump().unwrap());
    }
    s.push_str(&p.read_while(|c| c.is_ascii_digit()));
    if p.peek() == Some('.') {
        let save = p.pos;
        let mut frac = String::from(".");
        let rest_pos = p.pos + 1;
        if rest_pos < p.chars.len() && p.chars[rest_pos].is_ascii_digit() {
            p.bump();
            frac.push_str(&p.read_while(|c| c.is_ascii_digit()));
            s.push_str(&frac);
        } else {
            p.pos = save;
        }
    }
    if matches!(p.peek(), Some('e') | Some('E')) {
        let save = p.pos;
        let mut exp = String::new();
        exp.push(p.bump().unwrap());
        if matches!(p.peek(), Some('+') | Some('-')) {
            exp.push(p.bump().unwrap());
        }
        let digits = p.read_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            p.pos = save;
        } else {
            exp.push_str(&digits);
            s.push_str(&exp);
        }
    }
    s
}

fn parse_integer(p: &mut Parser) -> EastResult<Value> {
    if p.peek() == Some('+') {
        return Err(p.error("integers must not carry a leading \"+\"", "Integer"));
    }
    let token = read_number_token(p);
    if token.is_empty() || token == "-" {
        return Err(p.error("expected an integer literal", "Integer"));
    }
    token
        .parse::<i64>()
        .map(Value::Integer)
        .map_err(|_| p.error(format!("integer literal \"{token}\" out of i64 range"), "Integer"))
}

fn parse_float(p: &mut Parser) -> EastResult<Value> {
    if p.peek() == Some('N') {
        p.expect_literal("NaN", "Float")?;
        return Ok(Value::Float(f64::NAN));
    }
    if p.peek() == Some('I') {
        p.expect_literal("Infinity", "Float")?;
        return Ok(Value::Float(f64::INFINITY));
    }
    if p.peek() == Some('-') && p.chars.get(p.pos + 1) == Some(&'I') {
        p.bump();
        p.expect_literal("Infinity", "Float")?;
        return Ok(Value::Float(f64::NEG_INFINITY));
    }
    let token = read_number_token(p);
    if token.is_empty() || token == "-" {
        return Err(p.error("expected a float literal", "Float"));
    }
    token.parse::<f64>().map(Value::Float).map_err(|_| p.error(format!("invalid float literal \"{token}\""), "Float"))
}

fn parse_string(p: &mut Parser) -> EastResult<EastString> {
    p.expect_char('"', "String")?;
    let mut chars = Vec::new();
    loop {
        match p.bump() {
            None => return Err(p.error("unterminated string literal", "String")),
            Some('"') => break,
            Some('\\') => match p.bump() {
                Some('"') => chars.push('"'),
                Some('\\') => chars.push('\\'),
                _ => return Err(p.error("invalid escape sequence", "String")),
            },
            Some(c) => chars.push(c),
        }
    }
    Ok(EastString::from_chars(chars))
}

fn parse_blob(p: &mut Parser) -> EastResult<Value> {
    p.expect_literal("0x", "Blob")?;
    let digits = p.read_while(|c| c.is_ascii_hexdigit());
    if digits.len() % 2 != 0 {
        return Err(p.error("blob hex literal must have even length", "Blob"));
    }
    let bytes = hex::decode(&digits).map_err(|e| p.error(format!("invalid hex: {e}"), "Blob"))?;
    Ok(Value::Blob(Blob::from_bytes(bytes)))
}

fn parse_datetime(p: &mut Parser) -> EastResult<Value> {
    let token = p.read_while(|c| c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T'));
    let parsed = chrono::NaiveDateTime::parse_from_str(&token, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| p.error(format!("invalid date/time literal \"{token}\""), "DateTime"))?;
    Ok(Value::DateTime(DateTime(parsed.and_utc().timestamp_millis())))
}

fn parse_array(p: &mut Parser, elem: &Type) -> EastResult<Value> {
    p.expect_char('[', "Array")?;
    let mut items = Vec::new();
    p.skip_ws();
    if p.peek() == Some(']') {
        p.bump();
        return Ok(Value::new_array(items));
    }
    loop {
        p.path.push(PathStep::Index(items.len()));
        let v = parse_value(p, elem);
        p.path.pop();
        items.push(v?);
        p.skip_ws();
        match p.peek() {
            Some(',') => {
                p.bump();
                p.skip_ws();
                if p.peek() == Some(']') {
                    return Err(p.error("trailing comma not allowed", "Array"));
                }
            }
            Some(']') => {
                p.bump();
                break;
            }
            _ => return Err(p.error("expected \",\" or \"]\"", "Array")),
        }
    }
    Ok(Value::new_array(items))
}

fn parse_set(p: &mut Parser, elem: &Type) -> EastResult<Value> {
    p.expect_char('{', "Set")?;
    p.skip_ws();
    let mut values = Vec::new();
    if p.peek() == Some('}') {
        p.bump();
        return Ok(Value::new_set(east_core::sorted::SortedSet::new()));
    }
    loop {
        p.path.push(PathStep::Index(values.len()));
        let v = parse_value(p, elem);
        p.path.pop();
        values.push(v?);
        p.skip_ws();
        match p.peek() {
            Some(',') => {
                p.bump();
                p.skip_ws();
            }
            Some('}') => {
                p.bump();
                break;
            }
            _ => return Err(p.error("expected \",\" or \"}\"", "Set")),
        }
    }
    let mut set = east_core::sorted::SortedSet::new();
    for v in values {
        if set.has(&v) {
            return Err(p.error("duplicate key in set literal", "Set"));
        }
        set.insert_or_replace(v);
    }
    Ok(Value::new_set(set))
}

fn parse_dict(p: &mut Parser, key_ty: &Type, val_ty: &Type) -> EastResult<Value> {
    p.expect_char('{', "Dict")?;
    p.skip_ws();
    if p.peek() == Some(':') {
        p.bump();
        p.skip_ws();
        p.expect_char('}', "Dict")?;
        return Ok(Value::new_dict(east_core::sorted::SortedMap::new()));
    }
    let mut map = east_core::sorted::SortedMap::new();
    loop {
        let key = parse_value(p, key_ty)?;
        p.skip_ws();
        p.expect_char(':', "Dict")?;
        p.skip_ws();
        p.path.push(PathStep::Key(format!("{key:?}")));
        let val = parse_value(p, val_ty);
        p.path.pop();
        let val = val?;
        if map.has(&key) {
            return Err(p.error("duplicate key in dict literal", "Dict"));
        }
        map.insert_or_replace(key, val);
        p.skip_ws();
        match p.peek() {
            Some(',') => {
                p.bump();
                p.skip_ws();
            }
            Some('}') => {
                p.bump();
                break;
            }
            _ => return Err(p.error("expected \",\" or \"}\"", "Dict")),
        }
    }
    Ok(Value::new_dict(map))
}

fn parse_struct(p: &mut Parser, fields: &[east_core::Field]) -> EastResult<Value> {
    p.expect_char('(', "Struct")?;
    p.skip_ws();
    let mut values = Vec::with_capacity(fields.len());
    if fields.is_empty() {
        p.expect_char(')', "Struct")?;
        return Ok(Value::new_struct(values));
    }
    for (i, field) in fields.iter().enumerate() {
        let name = p.read_identifier();
        if name != field.name {
            return Err(p.error(format!("expected field \".{}\"", field.name), "Struct"));
        }
        p.skip_ws();
        p.expect_char('=', "Struct")?;
        p.skip_ws();
        p.path.push(PathStep::Field(field.name.clone()));
        let v = parse_value(p, &field.ty);
        p.path.pop();
        values.push(v?);
        p.skip_ws();
        if i + 1 < fields.len() {
            p.expect_char(',', "Struct")?;
            p.skip_ws();
        }
    }
    p.skip_ws();
    p.expect_char(')', "Struct")?;
    Ok(Value::new_struct(values))
}

fn parse_variant(p: &mut Parser, cases: &[east_core::Field]) -> EastResult<Value> {
    p.expect_char('.', "Variant")?;
    let name = p.read_identifier();
    let case = cases
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| p.error(format!("unknown variant case \".{name}\""), "Variant"))?;
    p.skip_ws();
    let at_payload_boundary =
        matches!(p.peek(), None | Some(',') | Some(')') | Some(']') | Some('}'));
    let payload = if at_payload_boundary {
        if case.ty != Type::Null {
            return Err(p.error(format!("variant case \".{name}\" requires a payload"), "Variant"));
        }
        Value::Null
    } else {
        p.path.push(PathStep::Case(name.clone()));
        let v = parse_value(p, &case.ty);
        p.path.pop();
        v?
    };
    Ok(Value::new_variant(case.name.clone(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use east_core::Field;

    #[test]
    fn integers_round_trip() {
        let ty = Type::Integer;
        let v = Value::Integer(-42);
        assert_eq!(parse(&ty, &print(&ty, &v)).unwrap(), v);
    }

    #[test]
    fn struct_round_trips_with_field_names() {
        let ty = Type::strct(vec![Field::new("name", Type::String), Field::new("age", Type::Integer)]).unwrap();
        let v = Value::new_struct(vec![Value::string("Ada"), Value::Integer(36)]);
        let printed = print(&ty, &v);
        assert_eq!(printed, "(name=\"Ada\", age=36)");
        assert_eq!(parse(&ty, &printed).unwrap(), v);
    }

    #[test]
    fn floats_print_special_values_as_words() {
        assert_eq!(print(&Type::Float, &Value::Float(f64::NAN)), "NaN");
        assert_eq!(print(&Type::Float, &Value::Float(-0.0)), "-0.0");
        assert_eq!(print(&Type::Float, &Value::Float(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn trailing_comma_in_array_is_rejected() {
        let ty = Type::array(Type::Integer);
        let err = parse(&ty, "[1, 2, ]").unwrap_err();
        assert!(matches!(err, EastError::ParseError { .. }));
    }

    #[test]
    fn empty_dict_prints_as_colon_braces() {
        let ty = Type::dict(Type::String, Type::Integer);
        let v = Value::new_dict(east_core::sorted::SortedMap::new());
        assert_eq!(print(&ty, &v), "{:}");
        assert_eq!(parse(&ty, "{:}").unwrap(), v);
    }
}
