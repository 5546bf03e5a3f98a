//! Runtime value representation (§4.B / §3.2).
//!
//! A `Value` is addressed through the type that produced it; the tag carried
//! here is a structural mirror of `Type`, not a separate dynamic-typing
//! scheme. Scalars (`Null`, `Boolean`, `Integer`, `Float`) are `Copy`;
//! `String`/`Blob` are immutable sequences; `Ref`/`Array`/`Set`/`Dict` are
//! mutable heap objects sharing `ContainerHeader`; `Struct`/`Variant` are
//! algebraic and themselves immutable (mutability, where present, lives in a
//! contained `Ref`/`Array`/etc., never in the struct/variant shell itself).
//!
//! The engine's concurrency model (§5) is single-threaded cooperative, so
//! containers use `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>` — there is no
//! cross-thread sharing to guard against, only the freeze/iteration-lock
//! discipline of §3.3.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::container::ContainerHeader;
use crate::sorted::{SortedMap, SortedSet};

/// An immutable, codepoint-addressable string (§4.B: "String indexing is by
/// Unicode codepoint").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EastString {
    codepoints: Rc<[char]>,
}

impl EastString {
    pub fn from_str(s: &str) -> Self {
        EastString { codepoints: s.chars().collect::<Vec<_>>().into() }
    }

    pub fn from_chars(chars: Vec<char>) -> Self {
        EastString { codepoints: chars.into() }
    }

    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.codepoints
    }

    pub fn to_rust_string(&self) -> String {
        self.codepoints.iter().collect()
    }
}

impl fmt::Display for EastString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

impl PartialOrd for EastString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EastString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.codepoints.cmp(&other.codepoints)
    }
}

/// An immutable byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Blob(Rc<[u8]>);

impl Blob {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Blob(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// UTC millisecond instant (§3.1: "DateTime (UTC millisecond instant)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime(pub i64);

/// A named field of a `Struct` value, positional order matching the
/// producing `Type::Struct`.
pub type StructValue = Rc<[Value]>;

/// A tagged-union value: `(case_name, payload)` (§3.2).
#[derive(Debug, Clone)]
pub struct VariantValue {
    pub case: Rc<str>,
    pub payload: Rc<Value>,
}

impl PartialEq for VariantValue {
    fn eq(&self, other: &Self) -> bool {
        self.case == other.case && self.payload == other.payload
    }
}

/// A one-slot mutable cell.
#[derive(Debug, Clone)]
pub struct RefValue {
    pub header: Rc<ContainerHeader>,
    pub slot: Rc<RefCell<Value>>,
}

impl PartialEq for RefValue {
    fn eq(&self, other: &Self) -> bool {
        *self.slot.borrow() == *other.slot.borrow()
    }
}

/// A mutable ordered sequence.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub header: Rc<ContainerHeader>,
    pub items: Rc<RefCell<Vec<Value>>>,
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        *self.items.borrow() == *other.items.borrow()
    }
}

/// A mutable sorted set, keyed by the total order of §3.2.
#[derive(Debug, Clone)]
pub struct SetValue {
    pub header: Rc<ContainerHeader>,
    pub items: Rc<RefCell<SortedSet>>,
}

impl PartialEq for SetValue {
    fn eq(&self, other: &Self) -> bool {
        *self.items.borrow() == *other.items.borrow()
    }
}

/// A mutable sorted dictionary, iterating in key order.
#[derive(Debug, Clone)]
pub struct DictValue {
    pub header: Rc<ContainerHeader>,
    pub items: Rc<RefCell<SortedMap>>,
}

impl PartialEq for DictValue {
    fn eq(&self, other: &Self) -> bool {
        *self.items.borrow() == *other.items.borrow()
    }
}

/// Opaque callable backing `Function`/`AsyncFunction` values. The evaluator
/// (in `east-runtime`) provides the concrete implementation; `east-core`
/// only needs identity (functions "have no order or equality beyond
/// identity", §3.2) and a human-readable label for printing/debugging.
pub trait Callable: fmt::Debug {
    fn arity(&self) -> usize;
    fn label(&self) -> &str;
    /// Lets `east-runtime` recover its concrete `Closure` type from a
    /// `Value::Function` at call sites, without `east-core` needing to know
    /// anything about the evaluator.
    fn as_any(&self) -> &dyn std::any::Any;
}

#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub callable: Rc<dyn Callable>,
    pub is_async: bool,
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.callable) as *const (),
            Rc::as_ptr(&other.callable) as *const (),
        )
    }
}

/// The runtime value representation of §3.2 / §4.B.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(EastString),
    DateTime(DateTime),
    Blob(Blob),

    Ref(RefValue),
    Array(ArrayValue),
    Set(SetValue),
    Dict(DictValue),

    Struct(StructValue),
    Variant(VariantValue),

    Function(FunctionValue),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(EastString::from_str(s.as_ref()))
    }

    pub fn new_ref(v: Value) -> Value {
        Value::Ref(RefValue {
            header: Rc::new(ContainerHeader::new()),
            slot: Rc::new(RefCell::new(v)),
        })
    }

    pub fn new_array(items: Vec<Value>) -> Value {
        Value::Array(ArrayValue {
            header: Rc::new(ContainerHeader::new()),
            items: Rc::new(RefCell::new(items)),
        })
    }

    pub fn new_set(items: SortedSet) -> Value {
        Value::Set(SetValue { header: Rc::new(ContainerHeader::new()), items: Rc::new(RefCell::new(items)) })
    }

    pub fn new_dict(items: SortedMap) -> Value {
        Value::Dict(DictValue { header: Rc::new(ContainerHeader::new()), items: Rc::new(RefCell::new(items)) })
    }

    pub fn new_struct(fields: Vec<Value>) -> Value {
        Value::Struct(fields.into())
    }

    pub fn new_variant(case: impl Into<Rc<str>>, payload: Value) -> Value {
        Value::Variant(VariantValue { case: case.into(), payload: Rc::new(payload) })
    }

    pub fn is_data_shape(&self) -> bool {
        !matches!(self, Value::Function(_))
    }
}

/// Float total order: `-Inf < … < -0 = +0 < … < +Inf`, and `NaN` is equal to
/// `NaN` and greater than every other float (§3.2).
pub fn compare_floats(a: f64, b: f64) -> Ordering {
    if a.is_nan() && b.is_nan() {
        return Ordering::Equal;
    }
    if a.is_nan() {
        return Ordering::Greater;
    }
    if b.is_nan() {
        return Ordering::Less;
    }
    // total_cmp would distinguish -0.0 from 0.0; the spec wants them equal.
    if a == 0.0 && b == 0.0 {
        return Ordering::Equal;
    }
    a.partial_cmp(&b).expect("non-NaN floats are totally ordered")
}

/// The total order over data values fixed by §3.2. Panics (an
/// `InternalError`-class bug, not a user error) if called on two values that
/// are not the same shape, or on a `Function` value, since functions have no
/// order.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => compare_floats(*x, *y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        (Value::Ref(x), Value::Ref(y)) => compare(&x.slot.borrow(), &y.slot.borrow()),
        (Value::Array(x), Value::Array(y)) => {
            let xs = x.items.borrow();
            let ys = y.items.borrow();
            for (a, b) in xs.iter().zip(ys.iter()) {
                match compare(a, b) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Value::Struct(x), Value::Struct(y)) => {
            for (a, b) in x.iter().zip(y.iter()) {
                match compare(a, b) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Set(x), Value::Set(y)) => x.items.borrow().compare_ordered(&y.items.borrow()),
        (Value::Dict(x), Value::Dict(y)) => x.items.borrow().compare_ordered(&y.items.borrow()),
        (Value::Variant(x), Value::Variant(y)) => {
            // First compare case names lexicographically, equivalent to
            // their stored (sorted) order, then payloads.
            match x.case.cmp(&y.case) {
                Ordering::Equal => compare(&x.payload, &y.payload),
                other => other,
            }
        }
        (Value::Function(_), Value::Function(_)) => {
            panic!("Function values have no order (§3.2)")
        }
        _ => panic!("compare called on mismatched value shapes"),
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    if matches!(a, Value::Function(_)) || matches!(b, Value::Function(_)) {
        return a == b;
    }
    compare(a, b) == Ordering::Equal
}

/// Ordering wrapper used as the key type of `SortedMap`/`SortedSet`.
#[derive(Debug, Clone)]
pub struct OrdValue(pub Value);

impl PartialEq for OrdValue {
    fn eq(&self, other: &Self) -> bool {
        compare(&self.0, &other.0) == Ordering::Equal
    }
}
impl Eq for OrdValue {}
impl PartialOrd for OrdValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrdValue {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_ordering_treats_signed_zero_as_equal_and_nan_as_greatest() {
        assert_eq!(compare_floats(-0.0, 0.0), Ordering::Equal);
        assert_eq!(compare_floats(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(compare_floats(f64::INFINITY, f64::NAN), Ordering::Less);
        assert_eq!(compare_floats(f64::NEG_INFINITY, -1.0), Ordering::Less);
    }

    #[test]
    fn codepoint_length_counts_scalar_values_not_bytes() {
        let s = EastString::from_str("café");
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn struct_values_compare_lexicographically() {
        let a = Value::new_struct(vec![Value::Integer(1), Value::string("a")]);
        let b = Value::new_struct(vec![Value::Integer(1), Value::string("b")]);
        assert_eq!(compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn variant_compares_case_then_payload() {
        let a = Value::new_variant("none", Value::Null);
        let b = Value::new_variant("some", Value::Integer(1));
        assert_eq!(compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn ref_equality_is_by_contents() {
        let a = Value::new_ref(Value::Integer(1));
        let b = Value::new_ref(Value::Integer(1));
        assert!(values_equal(&a, &b));
    }
}
