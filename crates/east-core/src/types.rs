//! The type algebra (§4.A).
//!
//! Types are values: immutable, structurally compared, and reused by
//! reference. `Type` is the closed tag set of §3.1; `Recursive` nodes carry a
//! `marker` depth used both for printing (`.Recursive 2`) and for cycle-safe
//! structural comparison.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{EastError, EastResult, PathStep};

/// A named, ordered field of a `Struct` or `Variant`. Order is part of
/// identity (§3.1 invariant 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field { name: name.into(), ty }
    }
}

/// The closed type tag set of §3.1.
///
/// `Recursive` does not store its body directly; it stores a `marker`
/// depth (distance, in enclosing `Recursive` nodes, from the point where the
/// marker is bound) so that the body can be built once and shared without
/// `Rc`-cycle bookkeeping. See `Type::mk_recursive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Never,
    Null,
    Boolean,
    Integer,
    Float,
    String,
    DateTime,
    Blob,

    Ref(Arc<Type>),
    Array(Arc<Type>),
    Set(Arc<Type>),
    Dict(Arc<Type>, Arc<Type>),

    Struct(Arc<[Field]>),
    /// Cases are stored in sorted case-name order; constructors enforce this.
    Variant(Arc<[Field]>),

    /// A back-reference to the `Recursive` node `depth` enclosing nodes up
    /// from here (`depth == 0` is not a legal reference — it would mean a
    /// marker referencing itself with no body in between).
    RecursiveMarker(u32),
    /// `μX. body`. `body` must reference `RecursiveMarker(0)` for `X`
    /// at most inside itself (SCC size 1, invariant 2 of §3.1.1).
    Recursive(Arc<Type>),

    Function(Arc<[Type]>, Arc<Type>),
    AsyncFunction(Arc<[Type]>, Arc<Type>),
}

impl Type {
    pub fn array(elem: Type) -> Type {
        Type::Array(Arc::new(elem))
    }

    pub fn set(key: Type) -> Type {
        Type::Set(Arc::new(key))
    }

    pub fn dict(key: Type, value: Type) -> Type {
        Type::Dict(Arc::new(key), Arc::new(value))
    }

    pub fn reference(inner: Type) -> Type {
        Type::Ref(Arc::new(inner))
    }

    pub fn function(inputs: Vec<Type>, output: Type) -> Type {
        Type::Function(Arc::from(inputs), Arc::new(output))
    }

    pub fn async_function(inputs: Vec<Type>, output: Type) -> Type {
        Type::AsyncFunction(Arc::from(inputs), Arc::new(output))
    }

    /// Build a struct type, validating nothing beyond field-name uniqueness;
    /// order as given is the identity order (§3.1 invariant 4).
    pub fn strct(fields: Vec<Field>) -> EastResult<Type> {
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.name.clone()) {
                return Err(EastError::type_mismatch(format!(
                    "duplicate struct field \"{}\"",
                    f.name
                )));
            }
        }
        Ok(Type::Struct(Arc::from(fields)))
    }

    /// Build a variant type. Cases are re-sorted into case-name order as
    /// part of construction (§3.1 invariant 4: "Variants are *constructed*
    /// sorted").
    pub fn variant(mut cases: Vec<Field>) -> EastResult<Type> {
        let mut seen = HashSet::new();
        for c in &cases {
            if !seen.insert(c.name.clone()) {
                return Err(EastError::type_mismatch(format!(
                    "duplicate variant case \"{}\"",
                    c.name
                )));
            }
        }
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Type::Variant(Arc::from(cases)))
    }

    /// Build a `Recursive` type. `builder` receives the marker type (a
    /// `RecursiveMarker(0)`) it may embed anywhere inside the body it
    /// returns; construction rejects a body whose SCC exceeds size 1 (a
    /// nested `Recursive` in the body that itself references an *outer*
    /// marker — invariant 2 of §3.1.1).
    pub fn mk_recursive(builder: impl FnOnce(Type) -> EastResult<Type>) -> EastResult<Type> {
        let marker = Type::RecursiveMarker(0);
        let body = builder(marker)?;
        validate_recursive_scc(&body, 0)?;
        Ok(Type::Recursive(Arc::new(body)))
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }
}

/// Reject a body containing a `RecursiveMarker` whose depth does not refer
/// to the *immediately* enclosing `Recursive` (depth 0 at the point of
/// definition is fine; any `Recursive` nested inside the body must not have
/// a marker escaping into the outer one — SCC size 1).
fn validate_recursive_scc(ty: &Type, depth: u32) -> EastResult<()> {
    match ty {
        Type::RecursiveMarker(d) => {
            if *d != depth {
                return Err(EastError::type_mismatch(
                    "recursive type marker escapes its defining node (SCC size > 1)",
                ));
            }
            Ok(())
        }
        Type::Recursive(body) => validate_recursive_scc(body, depth + 1),
        Type::Ref(t) | Type::Array(t) | Type::Set(t) => validate_recursive_scc(t, depth),
        Type::Dict(k, v) => {
            validate_recursive_scc(k, depth)?;
            validate_recursive_scc(v, depth)
        }
        Type::Struct(fields) | Type::Variant(fields) => {
            for f in fields.iter() {
                validate_recursive_scc(&f.ty, depth)?;
            }
            Ok(())
        }
        Type::Function(inputs, output) | Type::AsyncFunction(inputs, output) => {
            for i in inputs.iter() {
                validate_recursive_scc(i, depth)?;
            }
            validate_recursive_scc(output, depth)
        }
        Type::Never
        | Type::Null
        | Type::Boolean
        | Type::Integer
        | Type::Float
        | Type::String
        | Type::DateTime
        | Type::Blob => Ok(()),
    }
}

/// Unfold one layer of a `Recursive` type, substituting `RecursiveMarker(0)`
/// (at the substitution depth) with the whole `Recursive` node again.
pub fn unfold(ty: &Type) -> Type {
    match ty {
        Type::Recursive(body) => substitute_marker(body, 0, ty),
        other => other.clone(),
    }
}

fn substitute_marker(ty: &Type, depth: u32, replacement: &Type) -> Type {
    match ty {
        Type::RecursiveMarker(d) if *d == depth => replacement.clone(),
        Type::Recursive(body) => {
            Type::Recursive(Arc::new(substitute_marker(body, depth + 1, replacement)))
        }
        Type::Ref(t) => Type::Ref(Arc::new(substitute_marker(t, depth, replacement))),
        Type::Array(t) => Type::Array(Arc::new(substitute_marker(t, depth, replacement))),
        Type::Set(t) => Type::Set(Arc::new(substitute_marker(t, depth, replacement))),
        Type::Dict(k, v) => Type::Dict(
            Arc::new(substitute_marker(k, depth, replacement)),
            Arc::new(substitute_marker(v, depth, replacement)),
        ),
        Type::Struct(fields) => Type::Struct(Arc::from(
            fields
                .iter()
                .map(|f| Field::new(f.name.clone(), substitute_marker(&f.ty, depth, replacement)))
                .collect::<Vec<_>>(),
        )),
        Type::Variant(fields) => Type::Variant(Arc::from(
            fields
                .iter()
                .map(|f| Field::new(f.name.clone(), substitute_marker(&f.ty, depth, replacement)))
                .collect::<Vec<_>>(),
        )),
        Type::Function(inputs, output) => Type::Function(
            Arc::from(
                inputs.iter().map(|t| substitute_marker(t, depth, replacement)).collect::<Vec<_>>(),
            ),
            Arc::new(substitute_marker(output, depth, replacement)),
        ),
        Type::AsyncFunction(inputs, output) => Type::AsyncFunction(
            Arc::from(
                inputs.iter().map(|t| substitute_marker(t, depth, replacement)).collect::<Vec<_>>(),
            ),
            Arc::new(substitute_marker(output, depth, replacement)),
        ),
        other => other.clone(),
    }
}

type PairSet = HashSet<(usize, usize)>;

fn ptr_id(ty: &Type) -> usize {
    ty as *const Type as usize
}

/// Structural equality with cycle tracking for `Recursive` (§4.A).
pub fn type_equal(a: &Type, b: &Type) -> bool {
    equal_with(a, b, &mut HashSet::new())
}

fn equal_with(a: &Type, b: &Type, seen: &mut PairSet) -> bool {
    let key = (ptr_id(a), ptr_id(b));
    if seen.contains(&key) {
        return true;
    }
    match (a, b) {
        (Type::Never, Type::Never)
        | (Type::Null, Type::Null)
        | (Type::Boolean, Type::Boolean)
        | (Type::Integer, Type::Integer)
        | (Type::Float, Type::Float)
        | (Type::String, Type::String)
        | (Type::DateTime, Type::DateTime)
        | (Type::Blob, Type::Blob) => true,
        (Type::Ref(x), Type::Ref(y))
        | (Type::Array(x), Type::Array(y))
        | (Type::Set(x), Type::Set(y)) => equal_with(x, y, seen),
        (Type::Dict(k1, v1), Type::Dict(k2, v2)) => {
            equal_with(k1, k2, seen) && equal_with(v1, v2, seen)
        }
        (Type::Struct(f1), Type::Struct(f2)) | (Type::Variant(f1), Type::Variant(f2)) => {
            f1.len() == f2.len()
                && f1.iter().zip(f2.iter()).all(|(x, y)| x.name == y.name && equal_with(&x.ty, &y.ty, seen))
        }
        (Type::RecursiveMarker(d1), Type::RecursiveMarker(d2)) => d1 == d2,
        (Type::Recursive(b1), Type::Recursive(b2)) => {
            seen.insert(key);
            equal_with(b1, b2, seen)
        }
        (Type::Function(i1, o1), Type::Function(i2, o2))
        | (Type::AsyncFunction(i1, o1), Type::AsyncFunction(i2, o2)) => {
            i1.len() == i2.len()
                && i1.iter().zip(i2.iter()).all(|(x, y)| equal_with(x, y, seen))
                && equal_with(o1, o2, seen)
        }
        _ => false,
    }
}

/// `subtype(a, b)`: is every value of `a` also a value of `b`? Rules of
/// §3.1.2.
pub fn is_subtype(a: &Type, b: &Type) -> bool {
    subtype_with(a, b, &mut HashSet::new())
}

fn subtype_with(a: &Type, b: &Type, seen: &mut PairSet) -> bool {
    if a.is_never() {
        return true;
    }
    let key = (ptr_id(a), ptr_id(b));
    if seen.contains(&key) {
        return true;
    }
    match (a, b) {
        (Type::Never, _) => true,
        (Type::Null, Type::Null)
        | (Type::Boolean, Type::Boolean)
        | (Type::Integer, Type::Integer)
        | (Type::Float, Type::Float)
        | (Type::String, Type::String)
        | (Type::DateTime, Type::DateTime)
        | (Type::Blob, Type::Blob) => true,
        // Invariant in their parameter: mutable heap objects.
        (Type::Ref(x), Type::Ref(y)) | (Type::Array(x), Type::Array(y)) | (Type::Set(x), Type::Set(y)) => {
            type_equal(x, y)
        }
        (Type::Dict(k1, v1), Type::Dict(k2, v2)) => type_equal(k1, k2) && type_equal(v1, v2),
        // Covariant field-wise; names and order must match.
        (Type::Struct(f1), Type::Struct(f2)) => {
            f1.len() == f2.len()
                && f1.iter().zip(f2.iter()).all(|(x, y)| x.name == y.name && subtype_with(&x.ty, &y.ty, seen))
        }
        // Width subtyping: every case of a present in b, contravariant... no,
        // covariant per-case.
        (Type::Variant(f1), Type::Variant(f2)) => f1.iter().all(|c1| {
            f2.iter().any(|c2| c1.name == c2.name && subtype_with(&c1.ty, &c2.ty, seen))
        }),
        (Type::RecursiveMarker(d1), Type::RecursiveMarker(d2)) => d1 == d2,
        (Type::Recursive(b1), Type::Recursive(b2)) => {
            // Invariant when both sides are recursive: body must be
            // structurally equal.
            seen.insert(key);
            equal_with(b1, b2, &mut HashSet::new())
        }
        (Type::Recursive(_), _) => subtype_with(&unfold(a), b, seen),
        (_, Type::Recursive(_)) => subtype_with(a, &unfold(b), seen),
        // Contravariant in inputs, covariant in output.
        (Type::Function(i1, o1), Type::Function(i2, o2)) => {
            i1.len() == i2.len()
                && i1.iter().zip(i2.iter()).all(|(x, y)| subtype_with(y, x, seen))
                && subtype_with(o1, o2, seen)
        }
        (Type::AsyncFunction(i1, o1), Type::AsyncFunction(i2, o2)) => {
            i1.len() == i2.len()
                && i1.iter().zip(i2.iter()).all(|(x, y)| subtype_with(y, x, seen))
                && subtype_with(o1, o2, seen)
        }
        // Function <: AsyncFunction with the same I/O.
        (Type::Function(i1, o1), Type::AsyncFunction(i2, o2)) => {
            i1.len() == i2.len()
                && i1.iter().zip(i2.iter()).all(|(x, y)| subtype_with(y, x, seen))
                && subtype_with(o1, o2, seen)
        }
        _ => false,
    }
}

/// Union of two types, §3.1.3.
pub fn union(a: &Type, b: &Type) -> EastResult<Type> {
    if a.is_never() {
        return Ok(b.clone());
    }
    if b.is_never() {
        return Ok(a.clone());
    }
    if type_equal(a, b) {
        return Ok(a.clone());
    }
    match (a, b) {
        (Type::Variant(f1), Type::Variant(f2)) => {
            let mut combined: Vec<Field> = f1.to_vec();
            for c2 in f2.iter() {
                match combined.iter().position(|c1| c1.name == c2.name) {
                    Some(i) => combined[i] = Field::new(c2.name.clone(), union(&combined[i].ty, &c2.ty)?),
                    None => combined.push(c2.clone()),
                }
            }
            Type::variant(combined)
        }
        (Type::Function(i1, o1), Type::Function(i2, o2)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot union functions of differing arity"));
            }
            let inputs = i1
                .iter()
                .zip(i2.iter())
                .map(|(x, y)| intersect(x, y))
                .collect::<EastResult<Vec<_>>>()?;
            Ok(Type::function(inputs, union(o1, o2)?))
        }
        (Type::Function(i1, o1), Type::AsyncFunction(i2, o2))
        | (Type::AsyncFunction(i2, o2), Type::Function(i1, o1)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot union functions of differing arity"));
            }
            let inputs = i1
                .iter()
                .zip(i2.iter())
                .map(|(x, y)| intersect(x, y))
                .collect::<EastResult<Vec<_>>>()?;
            Ok(Type::async_function(inputs, union(o1, o2)?))
        }
        (Type::AsyncFunction(i1, o1), Type::AsyncFunction(i2, o2)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot union functions of differing arity"));
            }
            let inputs = i1
                .iter()
                .zip(i2.iter())
                .map(|(x, y)| intersect(x, y))
                .collect::<EastResult<Vec<_>>>()?;
            Ok(Type::async_function(inputs, union(o1, o2)?))
        }
        _ if is_subtype(a, b) => Ok(b.clone()),
        _ if is_subtype(b, a) => Ok(a.clone()),
        _ => Err(EastError::type_mismatch(format!(
            "cannot union incompatible types {} and {}",
            print_type(a),
            print_type(b)
        ))),
    }
}

/// Intersection of two types, §3.1.3. Variant intersection with no common
/// case is an error.
pub fn intersect(a: &Type, b: &Type) -> EastResult<Type> {
    if a.is_never() || b.is_never() {
        return Ok(Type::Never);
    }
    if type_equal(a, b) {
        return Ok(a.clone());
    }
    match (a, b) {
        (Type::Variant(f1), Type::Variant(f2)) => {
            let mut common = Vec::new();
            for c1 in f1.iter() {
                if let Some(c2) = f2.iter().find(|c2| c2.name == c1.name) {
                    common.push(Field::new(c1.name.clone(), intersect(&c1.ty, &c2.ty)?));
                }
            }
            if common.is_empty() {
                return Err(EastError::type_mismatch("variant intersection has no common case"));
            }
            Type::variant(common)
        }
        (Type::Function(i1, o1), Type::Function(i2, o2)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot intersect functions of differing arity"));
            }
            let inputs = i1.iter().zip(i2.iter()).map(|(x, y)| union(x, y)).collect::<EastResult<Vec<_>>>()?;
            Ok(Type::function(inputs, intersect(o1, o2)?))
        }
        (Type::Function(i1, o1), Type::AsyncFunction(i2, o2))
        | (Type::AsyncFunction(i2, o2), Type::Function(i1, o1)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot intersect functions of differing arity"));
            }
            let inputs = i1.iter().zip(i2.iter()).map(|(x, y)| union(x, y)).collect::<EastResult<Vec<_>>>()?;
            Ok(Type::async_function(inputs, intersect(o1, o2)?))
        }
        (Type::AsyncFunction(i1, o1), Type::AsyncFunction(i2, o2)) => {
            if i1.len() != i2.len() {
                return Err(EastError::type_mismatch("cannot intersect functions of differing arity"));
            }
            let inputs = i1.iter().zip(i2.iter()).map(|(x, y)| union(x, y)).collect::<EastResult<Vec<_>>>()?;
            Ok(Type::async_function(inputs, intersect(o1, o2)?))
        }
        _ if is_subtype(a, b) => Ok(a.clone()),
        _ if is_subtype(b, a) => Ok(b.clone()),
        _ => Err(EastError::type_mismatch(format!(
            "cannot intersect incompatible types {} and {}",
            print_type(a),
            print_type(b)
        ))),
    }
}

/// `widen`: like `union`, but reports a domain error on functions or
/// recursives (used only when inferring a type from literal values).
pub fn widen(a: &Type, b: &Type) -> EastResult<Type> {
    if matches!(a, Type::Function(..) | Type::AsyncFunction(..) | Type::Recursive(..))
        || matches!(b, Type::Function(..) | Type::AsyncFunction(..) | Type::Recursive(..))
    {
        return Err(EastError::domain(
            "widen does not support function or recursive types",
        ));
    }
    union(a, b)
}

/// §3.1.1 invariant 1: immutable = primitive, or struct/variant/recursive
/// thereof.
pub fn is_immutable(ty: &Type) -> bool {
    is_immutable_with(ty, &mut HashSet::new())
}

fn is_immutable_with(ty: &Type, seen: &mut HashSet<usize>) -> bool {
    match ty {
        Type::Never
        | Type::Null
        | Type::Boolean
        | Type::Integer
        | Type::Float
        | Type::String
        | Type::DateTime
        | Type::Blob
        | Type::RecursiveMarker(_) => true,
        Type::Struct(fields) | Type::Variant(fields) => {
            fields.iter().all(|f| is_immutable_with(&f.ty, seen))
        }
        Type::Recursive(body) => {
            let id = ptr_id(ty);
            if !seen.insert(id) {
                return true;
            }
            is_immutable_with(body, seen)
        }
        Type::Ref(_) | Type::Array(_) | Type::Set(_) | Type::Dict(..) => false,
        Type::Function(..) | Type::AsyncFunction(..) => false,
    }
}

/// §3.1.1 invariant 3: data types exclude functions anywhere inside.
pub fn is_data(ty: &Type) -> bool {
    is_data_with(ty, &mut HashSet::new())
}

fn is_data_with(ty: &Type, seen: &mut HashSet<usize>) -> bool {
    match ty {
        Type::Function(..) | Type::AsyncFunction(..) => false,
        Type::Never
        | Type::Null
        | Type::Boolean
        | Type::Integer
        | Type::Float
        | Type::String
        | Type::DateTime
        | Type::Blob
        | Type::RecursiveMarker(_) => true,
        Type::Ref(t) | Type::Array(t) | Type::Set(t) => is_data_with(t, seen),
        Type::Dict(k, v) => is_data_with(k, seen) && is_data_with(v, seen),
        Type::Struct(fields) | Type::Variant(fields) => {
            fields.iter().all(|f| is_data_with(&f.ty, seen))
        }
        Type::Recursive(body) => {
            let id = ptr_id(ty);
            if !seen.insert(id) {
                return true;
            }
            is_data_with(body, seen)
        }
    }
}

/// Canonical one-line textual form, leading-dot rooted (§4.A).
pub fn print_type(ty: &Type) -> String {
    print_with_depth(ty, 0)
}

fn print_with_depth(ty: &Type, depth: u32) -> String {
    match ty {
        Type::Never => ".Never".into(),
        Type::Null => ".Null".into(),
        Type::Boolean => ".Boolean".into(),
        Type::Integer => ".Integer".into(),
        Type::Float => ".Float".into(),
        Type::String => ".String".into(),
        Type::DateTime => ".DateTime".into(),
        Type::Blob => ".Blob".into(),
        Type::Ref(t) => format!(".Ref {}", print_with_depth(t, depth)),
        Type::Array(t) => format!(".Array {}", print_with_depth(t, depth)),
        Type::Set(t) => format!(".Set {}", print_with_depth(t, depth)),
        Type::Dict(k, v) => {
            format!(".Dict {} {}", print_with_depth(k, depth), print_with_depth(v, depth))
        }
        Type::Struct(fields) => {
            let body = fields
                .iter()
                .map(|f| format!("(name=\"{}\", type={})", f.name, print_with_depth(&f.ty, depth)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(".Struct [{body}]")
        }
        Type::Variant(fields) => {
            let body = fields
                .iter()
                .map(|f| format!("(name=\"{}\", type={})", f.name, print_with_depth(&f.ty, depth)))
                .collect::<Vec<_>>()
                .join(", ");
            format!(".Variant [{body}]")
        }
        Type::RecursiveMarker(d) => format!(".Recursive {d}"),
        Type::Recursive(body) => {
            format!(".Recursive {} = {}", depth, print_with_depth(body, depth + 1))
        }
        Type::Function(inputs, output) => {
            let args = inputs.iter().map(|t| print_with_depth(t, depth)).collect::<Vec<_>>().join(", ");
            format!(".Function ({args}) {}", print_with_depth(output, depth))
        }
        Type::AsyncFunction(inputs, output) => {
            let args = inputs.iter().map(|t| print_with_depth(t, depth)).collect::<Vec<_>>().join(", ");
            format!(".AsyncFunction ({args}) {}", print_with_depth(output, depth))
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", print_type(self))
    }
}

pub fn assert_equal(a: &Type, b: &Type) -> EastResult<()> {
    if type_equal(a, b) {
        Ok(())
    } else {
        Err(EastError::type_mismatch(format!(
            "expected {} but found {}",
            print_type(a),
            print_type(b)
        )))
    }
}

/// Walk a struct's fields by name, annotating any resulting error with the
/// field-path step (used by the codecs' path-reporting, §4.G.2).
pub fn field_path_step(name: &str) -> PathStep {
    PathStep::Field(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_is_subtype_of_everything() {
        assert!(is_subtype(&Type::Never, &Type::Integer));
        assert!(is_subtype(&Type::Never, &Type::array(Type::String)));
    }

    #[test]
    fn struct_subtyping_is_fieldwise_covariant() {
        let narrow = Type::strct(vec![Field::new("a", Type::Integer)]).unwrap();
        let wide = Type::strct(vec![Field::new("a", Type::Integer)]).unwrap();
        assert!(is_subtype(&narrow, &wide));

        let mismatched_order = Type::Struct(Arc::from(vec![
            Field::new("b", Type::Integer),
            Field::new("a", Type::Integer),
        ]));
        assert!(!is_subtype(&mismatched_order, &wide));
    }

    #[test]
    fn variant_width_subtyping() {
        let small = Type::variant(vec![Field::new("none", Type::Null)]).unwrap();
        let big = Type::variant(vec![
            Field::new("none", Type::Null),
            Field::new("some", Type::Integer),
        ])
        .unwrap();
        assert!(is_subtype(&small, &big));
        assert!(!is_subtype(&big, &small));
    }

    #[test]
    fn function_is_contravariant_in_input_covariant_in_output() {
        // f: (Never) -> Integer  <:  g: (Integer) -> Integer
        // because callers of g can only ever pass an Integer, which is a
        // valid (trivial) input for f.
        let f = Type::function(vec![Type::Never], Type::Integer);
        let g = Type::function(vec![Type::Integer], Type::Integer);
        assert!(is_subtype(&f, &g));
        assert!(!is_subtype(&g, &f));
    }

    #[test]
    fn function_subtypes_async_function_same_io() {
        let f = Type::function(vec![Type::Integer], Type::Integer);
        let af = Type::async_function(vec![Type::Integer], Type::Integer);
        assert!(is_subtype(&f, &af));
        assert!(!is_subtype(&af, &f));
    }

    #[test]
    fn recursive_type_builds_linked_list() {
        let list = Type::mk_recursive(|marker| {
            Type::variant(vec![
                Field::new("nil", Type::Null),
                Field::new(
                    "cons",
                    Type::strct(vec![
                        Field::new("head", Type::Integer),
                        Field::new("tail", marker),
                    ])?,
                ),
            ])
        })
        .unwrap();
        assert!(is_immutable(&list));
        assert!(is_data(&list));
        assert_eq!(print_type(&list), ".Recursive 0 = .Variant [(name=\"cons\", type=.Struct [(name=\"head\", type=.Integer), (name=\"tail\", type=.Recursive 1)]), (name=\"nil\", type=.Null)]");
    }

    #[test]
    fn nested_recursive_scc_rejected() {
        let result = Type::mk_recursive(|outer_marker| {
            let inner = Type::mk_recursive(|_inner_marker| Ok(outer_marker.clone()));
            inner
        });
        assert!(result.is_err());
    }

    #[test]
    fn mutable_containers_are_not_immutable() {
        assert!(!is_immutable(&Type::array(Type::Integer)));
        assert!(!is_immutable(&Type::set(Type::Integer)));
        assert!(!is_immutable(&Type::dict(Type::Integer, Type::String)));
        assert!(!is_immutable(&Type::reference(Type::Integer)));
    }

    #[test]
    fn data_excludes_functions_anywhere_inside() {
        let has_fn = Type::strct(vec![Field::new(
            "callback",
            Type::function(vec![], Type::Null),
        )])
        .unwrap();
        assert!(!is_data(&has_fn));
        assert!(is_data(&Type::strct(vec![Field::new("n", Type::Integer)]).unwrap()));
    }

    #[test]
    fn union_on_variants_combines_cases() {
        let a = Type::variant(vec![Field::new("a", Type::Integer)]).unwrap();
        let b = Type::variant(vec![Field::new("b", Type::String)]).unwrap();
        let u = union(&a, &b).unwrap();
        if let Type::Variant(fields) = &u {
            assert_eq!(fields.len(), 2);
        } else {
            panic!("expected variant");
        }
    }

    #[test]
    fn intersect_on_disjoint_variants_errors() {
        let a = Type::variant(vec![Field::new("a", Type::Integer)]).unwrap();
        let b = Type::variant(vec![Field::new("b", Type::String)]).unwrap();
        assert!(intersect(&a, &b).is_err());
    }

    #[test]
    fn widen_rejects_functions() {
        let f = Type::function(vec![], Type::Null);
        assert!(widen(&f, &f).is_err());
    }
}
