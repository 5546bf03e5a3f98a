//! The East error taxonomy.
//!
//! One error type is threaded through the type algebra, the value model, the
//! evaluator and both codecs. Kinds mirror the taxonomy fixed by the engine's
//! specification; the payload shape is per-kind rather than a single opaque
//! string so that callers can match on the failure class.

use std::fmt;

/// A single frame in a type-path (`struct field "age"`, `[3]`, `.some`, …)
/// or in an evaluator call-stack (`Location`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Field(String),
    Case(String),
    Index(usize),
    Key(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => write!(f, ".{name}"),
            PathStep::Case(name) => write!(f, ".{name}"),
            PathStep::Index(i) => write!(f, "[{i}]"),
            PathStep::Key(k) => write!(f, "[{k:?}]"),
        }
    }
}

/// A source location used for evaluator call stacks and parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub line: u32,
    pub col: u32,
    pub label: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} (line {}, col {})", self.line, self.col),
            None => write!(f, "line {}, col {}", self.line, self.col),
        }
    }
}

fn format_path(path: &[PathStep]) -> String {
    path.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("")
}

/// The closed set of error kinds defined by §7.
#[derive(Debug, Clone, PartialEq)]
pub enum EastError {
    /// Type algebra / IR checker rejected a composition. Carries the path to
    /// the first incompatibility, as required by §4.A.
    TypeMismatch { message: String, path: Vec<PathStep> },

    /// NaN/Inf/overflow to integer, invalid regex replacement, bad hex,
    /// non-total datetime, etc.
    DomainError { message: String },

    /// Dict/Set/array lookup or insertion failure.
    MissingKey { message: String },
    DuplicateKey { message: String },

    /// §3.3 container discipline.
    FrozenMutation { message: String },
    ConcurrentMutation { message: String },

    /// Text or JSON parse failure; carries position and type path per §4.G.2.
    ParseError {
        reason: String,
        got: String,
        path: Vec<PathStep>,
        line: u32,
        col: u32,
        type_name: String,
    },

    /// Raised by an explicit `Error` IR node inside a program. Carries a
    /// growable call-stack appended to by `Call` on propagation (§4.F.2).
    UserError { message: String, stack: Vec<Location> },

    /// Invariant violated; never expected in a well-typed program.
    InternalError { message: String },
}

impl EastError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EastError::TypeMismatch { message: message.into(), path: Vec::new() }
    }

    pub fn domain(message: impl Into<String>) -> Self {
        EastError::DomainError { message: message.into() }
    }

    pub fn missing_key(message: impl Into<String>) -> Self {
        EastError::MissingKey { message: message.into() }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        EastError::DuplicateKey { message: message.into() }
    }

    pub fn frozen_mutation() -> Self {
        EastError::FrozenMutation { message: "mutation attempted on a frozen container".into() }
    }

    pub fn concurrent_mutation() -> Self {
        EastError::ConcurrentMutation {
            message: "mutation attempted while an iteration lock is held".into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EastError::InternalError { message: message.into() }
    }

    pub fn user(message: impl Into<String>) -> Self {
        EastError::UserError { message: message.into(), stack: Vec::new() }
    }

    /// Prepend a type-path segment. Used by the type algebra as it unwinds
    /// out of nested struct/variant/array composition; does not re-wrap an
    /// already-wrapped error, per §4.A.
    pub fn with_path_prefix(mut self, step: PathStep) -> Self {
        if let EastError::TypeMismatch { path, .. } = &mut self {
            path.insert(0, step);
        }
        self
    }

    /// Append a call-site location, used by the evaluator on `Call`
    /// propagation to build a backtrace (§4.F.2).
    pub fn push_call_site(mut self, loc: Location) -> Self {
        if let EastError::UserError { stack, .. } = &mut self {
            stack.push(loc);
        }
        self
    }

    /// True for every kind except `InternalError`, matching §7's
    /// catchability rule ("all errors other than InternalError are
    /// catchable by TryCatch").
    pub fn is_catchable(&self) -> bool {
        !matches!(self, EastError::InternalError { .. })
    }
}

impl fmt::Display for EastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EastError::TypeMismatch { message, path } if path.is_empty() => {
                write!(f, "type mismatch: {message}")
            }
            EastError::TypeMismatch { message, path } => {
                write!(f, "type mismatch: {message} at {}", format_path(path))
            }
            EastError::DomainError { message } => write!(f, "domain error: {message}"),
            EastError::MissingKey { message } => write!(f, "missing key: {message}"),
            EastError::DuplicateKey { message } => write!(f, "duplicate key: {message}"),
            EastError::FrozenMutation { message } => write!(f, "frozen mutation: {message}"),
            EastError::ConcurrentMutation { message } => {
                write!(f, "concurrent mutation: {message}")
            }
            EastError::ParseError { reason, got, path, line, col, type_name } => write!(
                f,
                "Error occurred because {reason}, got {got} at {} (line {line}, col {col}) while parsing value of type \"{type_name}\"",
                format_path(path)
            ),
            EastError::UserError { message, stack } => {
                write!(f, "{message}")?;
                for loc in stack {
                    write!(f, "\n  at {loc}")?;
                }
                Ok(())
            }
            EastError::InternalError { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for EastError {}

pub type EastResult<T> = Result<T, EastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_prefixes_in_reverse_unwind_order() {
        let err = EastError::type_mismatch("Integer != String")
            .with_path_prefix(PathStep::Field("age".into()))
            .with_path_prefix(PathStep::Index(0));
        assert_eq!(err.to_string(), "type mismatch: Integer != String at [0].age");
    }

    #[test]
    fn internal_error_is_not_catchable() {
        assert!(!EastError::internal("oops").is_catchable());
        assert!(EastError::domain("NaN").is_catchable());
    }
}
