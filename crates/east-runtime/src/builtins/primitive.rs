//! §4.E.1: boolean ops, the generic comparison family, and integer/float
//! arithmetic. Integer arithmetic wraps modulo 2⁶⁴ signed (`wrapping_*`);
//! division and remainder by zero return `0` rather than raising, and `pow`
//! with a negative exponent returns `0` — all per the fixed contract rather
//! than host-library defaults (Rust's `/0` panics; East's must not).

use std::cmp::Ordering;
use std::rc::Rc;

use east_core::value::{compare, values_equal, Value};
use east_core::{EastError, EastResult};

fn want_bool(v: &Value) -> EastResult<bool> {
    match v {
        Value::Boolean(b) => Ok(*b),
        other => Err(EastError::internal(format!("expected Boolean, got {other:?}"))),
    }
}

fn want_int(v: &Value) -> EastResult<i64> {
    match v {
        Value::Integer(n) => Ok(*n),
        other => Err(EastError::internal(format!("expected Integer, got {other:?}"))),
    }
}

fn want_float(v: &Value) -> EastResult<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        other => Err(EastError::internal(format!("expected Float, got {other:?}"))),
    }
}

/// `floor(log2(n))`, domain-checked for `n <= 0` — the spec names an
/// `Integer log` operator without pinning a base; base 2 (bit-length minus
/// one) is the one integer log that stays exact over the whole domain
/// without a second argument.
fn integer_log(n: i64) -> EastResult<i64> {
    if n <= 0 {
        return Err(EastError::domain("IntegerLog is undefined for n <= 0"));
    }
    Ok(63 - n.leading_zeros() as i64)
}

fn is_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Ref(x), Value::Ref(y)) => Rc::ptr_eq(&x.slot, &y.slot),
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(&x.items, &y.items),
        (Value::Set(x), Value::Set(y)) => Rc::ptr_eq(&x.items, &y.items),
        (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(&x.items, &y.items),
        (Value::Function(x), Value::Function(y)) => {
            Rc::ptr_eq(&x.callable, &y.callable) && x.is_async == y.is_async
        }
        _ => values_equal(a, b),
    }
}

pub fn dispatch(name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    Some(match (name, args) {
        ("BooleanNot", [a]) => want_bool(a).map(|a| Value::Boolean(!a)),
        ("BooleanAnd", [a, b]) => (|| Ok(Value::Boolean(want_bool(a)? && want_bool(b)?)))(),
        ("BooleanOr", [a, b]) => (|| Ok(Value::Boolean(want_bool(a)? || want_bool(b)?)))(),
        ("BooleanXor", [a, b]) => (|| Ok(Value::Boolean(want_bool(a)? ^ want_bool(b)?)))(),

        ("Is", [a, b]) => Ok(Value::Boolean(is_identical(a, b))),
        ("Equal", [a, b]) => Ok(Value::Boolean(values_equal(a, b))),
        ("NotEqual", [a, b]) => Ok(Value::Boolean(!values_equal(a, b))),
        ("Less", [a, b]) => Ok(Value::Boolean(compare(a, b) == Ordering::Less)),
        ("LessEqual", [a, b]) => Ok(Value::Boolean(compare(a, b) != Ordering::Greater)),
        ("Greater", [a, b]) => Ok(Value::Boolean(compare(a, b) == Ordering::Greater)),
        ("GreaterEqual", [a, b]) => Ok(Value::Boolean(compare(a, b) != Ordering::Less)),

        ("IntegerNegate", [a]) => want_int(a).map(|a| Value::Integer(a.wrapping_neg())),
        ("IntegerAdd", [a, b]) => (|| Ok(Value::Integer(want_int(a)?.wrapping_add(want_int(b)?))))(),
        ("IntegerSub", [a, b]) => (|| Ok(Value::Integer(want_int(a)?.wrapping_sub(want_int(b)?))))(),
        ("IntegerMul", [a, b]) => (|| Ok(Value::Integer(want_int(a)?.wrapping_mul(want_int(b)?))))(),
        ("IntegerDiv", [a, b]) => (|| {
            let (a, b) = (want_int(a)?, want_int(b)?);
            Ok(Value::Integer(if b == 0 { 0 } else { a.wrapping_div(b) }))
        })(),
        ("IntegerRem", [a, b]) => (|| {
            let (a, b) = (want_int(a)?, want_int(b)?);
            Ok(Value::Integer(if b == 0 { 0 } else { a.wrapping_rem(b) }))
        })(),
        ("IntegerPow", [a, b]) => (|| {
            let (a, exp) = (want_int(a)?, want_int(b)?);
            Ok(Value::Integer(if exp < 0 { 0 } else { a.wrapping_pow(exp as u32) }))
        })(),
        ("IntegerAbs", [a]) => want_int(a).map(|a| Value::Integer(a.wrapping_abs())),
        ("IntegerSign", [a]) => want_int(a).map(|a| Value::Integer(a.signum())),
        ("IntegerLog", [a]) => want_int(a).and_then(integer_log).map(Value::Integer),

        ("FloatNegate", [a]) => want_float(a).map(|a| Value::Float(-a)),
        ("FloatAdd", [a, b]) => (|| Ok(Value::Float(want_float(a)? + want_float(b)?)))(),
        ("FloatSub", [a, b]) => (|| Ok(Value::Float(want_float(a)? - want_float(b)?)))(),
        ("FloatMul", [a, b]) => (|| Ok(Value::Float(want_float(a)? * want_float(b)?)))(),
        ("FloatDiv", [a, b]) => (|| Ok(Value::Float(want_float(a)? / want_float(b)?)))(),
        ("FloatRem", [a, b]) => (|| Ok(Value::Float(want_float(a)? % want_float(b)?)))(),
        ("FloatPow", [a, b]) => (|| Ok(Value::Float(want_float(a)?.powf(want_float(b)?))))(),
        ("FloatAbs", [a]) => want_float(a).map(|a| Value::Float(a.abs())),
        ("FloatSign", [a]) => want_float(a).map(|a| {
            // §9 Open Question: `FloatSign(NaN)` returns `0`, not `NaN`,
            // so the result stays within {-1, 0, 1} for every input.
            Value::Float(if a.is_nan() || a == 0.0 { 0.0 } else { a.signum() })
        }),
        ("FloatSqrt", [a]) => want_float(a).map(|a| Value::Float(a.sqrt())),
        ("FloatLog", [a]) => want_float(a).map(|a| Value::Float(a.ln())),
        ("FloatExp", [a]) => want_float(a).map(|a| Value::Float(a.exp())),
        ("FloatSin", [a]) => want_float(a).map(|a| Value::Float(a.sin())),
        ("FloatCos", [a]) => want_float(a).map(|a| Value::Float(a.cos())),
        ("FloatTan", [a]) => want_float(a).map(|a| Value::Float(a.tan())),

        ("IntegerToFloat", [a]) => want_int(a).map(|a| Value::Float(a as f64)),
        ("FloatToInteger", [a]) => want_float(a).and_then(|f| {
            if !f.is_finite() || f.fract() != 0.0 || f <= i64::MIN as f64 || f >= i64::MAX as f64 {
                Err(EastError::domain("FloatToInteger requires a finite, integral, in-range value"))
            } else {
                Ok(Value::Integer(f as i64))
            }
        }),

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_by_zero_returns_zero() {
        let result = dispatch("IntegerDiv", &[Value::Integer(7), Value::Integer(0)]).unwrap().unwrap();
        assert_eq!(result, Value::Integer(0));
    }

    #[test]
    fn integer_add_wraps_on_overflow() {
        let result =
            dispatch("IntegerAdd", &[Value::Integer(i64::MAX), Value::Integer(1)]).unwrap().unwrap();
        assert_eq!(result, Value::Integer(i64::MIN));
    }

    #[test]
    fn pow_with_negative_exponent_is_zero() {
        let result = dispatch("IntegerPow", &[Value::Integer(2), Value::Integer(-1)]).unwrap().unwrap();
        assert_eq!(result, Value::Integer(0));
    }

    #[test]
    fn float_sign_of_nan_is_zero_not_nan() {
        let result = dispatch("FloatSign", &[Value::Float(f64::NAN)]).unwrap().unwrap();
        assert_eq!(result, Value::Float(0.0));
    }

    #[test]
    fn float_to_integer_rejects_non_integral_values() {
        let result = dispatch("FloatToInteger", &[Value::Float(1.5)]).unwrap();
        assert!(matches!(result, Err(EastError::DomainError { .. })));
    }

    #[test]
    fn float_to_integer_rejects_magnitudes_at_or_beyond_two_to_the_63() {
        // i64::MAX as f64 rounds up to exactly 2^63, so both boundaries must
        // be rejected with a strict `>=`/`<=`, not just values past them.
        let two_pow_63 = 9223372036854775808.0_f64;
        assert!(matches!(
            dispatch("FloatToInteger", &[Value::Float(two_pow_63)]).unwrap(),
            Err(EastError::DomainError { .. })
        ));
        assert!(matches!(
            dispatch("FloatToInteger", &[Value::Float(-two_pow_63)]).unwrap(),
            Err(EastError::DomainError { .. })
        ));
        assert!(dispatch("FloatToInteger", &[Value::Float(123456789.0)]).unwrap().is_ok());
    }
}
