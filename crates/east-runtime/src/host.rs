//! The host interface (§4.I, §6.4): the platform effect table the evaluator
//! dispatches `Platform(name, args)` nodes through, plus the regex/
//! case-mapping services the string builtins need.
//!
//! A platform function is either synchronous (`args -> value`) or
//! asynchronous (`args -> task<value>`); `async_platforms` in the spec's
//! terms is folded into the registration itself rather than kept as a
//! separate set, since every entry already knows its own kind.

use std::collections::HashMap;
use std::rc::Rc;

use east_core::value::Value;
use east_core::{EastError, EastResult};

/// The result of starting an asynchronous platform call: a thunk resolved
/// at the `CallAsync`/`Platform(..., async)` await point. This engine has no
/// first-class cancellation or cross-task scheduler (§5, §1 Non-goals); the
/// "task" a platform returns is simply deferred work, run to completion the
/// moment the IR awaits it.
pub struct Task(Box<dyn FnOnce() -> EastResult<Value>>);

impl Task {
    pub fn new(thunk: impl FnOnce() -> EastResult<Value> + 'static) -> Self {
        Task(Box::new(thunk))
    }

    pub fn ready(value: Value) -> Self {
        Task::new(move || Ok(value))
    }

    pub fn resolve(self) -> EastResult<Value> {
        (self.0)()
    }
}

type SyncFn = Rc<dyn Fn(&[Value]) -> EastResult<Value>>;
type AsyncFn = Rc<dyn Fn(&[Value]) -> EastResult<Task>>;

enum Entry {
    Sync(SyncFn),
    Async(AsyncFn),
}

/// Host-provided named effects, registered before compilation.
#[derive(Default)]
pub struct PlatformTable {
    entries: HashMap<Rc<str>, Entry>,
}

impl PlatformTable {
    pub fn new() -> Self {
        PlatformTable { entries: HashMap::new() }
    }

    pub fn register_sync(
        &mut self,
        name: impl Into<Rc<str>>,
        f: impl Fn(&[Value]) -> EastResult<Value> + 'static,
    ) {
        self.entries.insert(name.into(), Entry::Sync(Rc::new(f)));
    }

    pub fn register_async(
        &mut self,
        name: impl Into<Rc<str>>,
        f: impl Fn(&[Value]) -> EastResult<Task> + 'static,
    ) {
        self.entries.insert(name.into(), Entry::Async(Rc::new(f)));
    }

    pub fn is_async(&self, name: &str) -> Option<bool> {
        self.entries.get(name).map(|e| matches!(e, Entry::Async(_)))
    }

    /// Dispatch a synchronous platform call. Calling an async-registered
    /// platform function this way is an IR-construction bug (the checker
    /// should have required `CallAsync`/`Platform(..., async=true)`).
    pub fn call(&self, name: &str, args: &[Value]) -> EastResult<Value> {
        tracing::trace!(platform_fn = name, "dispatching synchronous platform call");
        match self.entries.get(name) {
            Some(Entry::Sync(f)) => f(args),
            Some(Entry::Async(_)) => Err(EastError::internal(format!(
                "platform function \"{name}\" is async but was called synchronously"
            ))),
            None => Err(EastError::internal(format!("unknown platform function \"{name}\""))),
        }
    }

    pub fn call_async(&self, name: &str, args: &[Value]) -> EastResult<Task> {
        tracing::trace!(platform_fn = name, "dispatching asynchronous platform call");
        match self.entries.get(name) {
            Some(Entry::Async(f)) => f(args),
            Some(Entry::Sync(f)) => {
                let value = f(args)?;
                Ok(Task::ready(value))
            }
            None => Err(EastError::internal(format!("unknown platform function \"{name}\""))),
        }
    }
}

/// The regex engine and Unicode case-mapping service the string builtins
/// depend on (§4.I). The default implementation below wraps the `regex`
/// crate and `char::to_uppercase`/`to_lowercase`, matching the rest of the
/// workspace's reliance on `regex` for pattern matching; a host embedding
/// East in a context with a different engine can swap this out.
pub trait TextServices {
    fn case_upper(&self, s: &str) -> String {
        s.chars().flat_map(|c| c.to_uppercase()).collect()
    }

    fn case_lower(&self, s: &str) -> String {
        s.chars().flat_map(|c| c.to_lowercase()).collect()
    }
}

pub struct DefaultTextServices;
impl TextServices for DefaultTextServices {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_platform_call_roundtrips() {
        let mut table = PlatformTable::new();
        table.register_sync("double", |args| match args {
            [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
            _ => Err(EastError::internal("bad arity")),
        });
        assert_eq!(table.call("double", &[Value::Integer(21)]).unwrap(), Value::Integer(42));
    }

    #[test]
    fn calling_an_async_platform_synchronously_is_an_internal_error() {
        let mut table = PlatformTable::new();
        table.register_async("fetch", |_| Ok(Task::ready(Value::Null)));
        assert!(matches!(
            table.call("fetch", &[]),
            Err(EastError::InternalError { .. })
        ));
    }

    #[test]
    fn async_call_resolves_its_task() {
        let mut table = PlatformTable::new();
        table.register_async("fetch", |_| Ok(Task::new(|| Ok(Value::Integer(7)))));
        let task = table.call_async("fetch", &[]).unwrap();
        assert_eq!(task.resolve().unwrap(), Value::Integer(7));
    }
}
