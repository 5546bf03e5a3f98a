//! Engine configuration, in the shape of `crates/compiler/src/config.rs`'s
//! `CompilerConfig`: a small, host-extensible struct rather than a global.
//! `EngineLimits` bounds recursion depth and loop iteration so a
//! misbehaving or adversarial program fails with an `InternalError` instead
//! of exhausting the host's stack — the evaluator itself has no built-in
//! notion of "too much work" beyond what's configured here.

#[cfg_attr(feature = "config", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLimits {
    /// Maximum nested `Call`/`CallAsync` depth before evaluation aborts with
    /// `InternalError`.
    pub max_call_depth: usize,
    /// Maximum number of iterations a single `While`/`ForArray`/`ForSet`/
    /// `ForDict` loop may run before evaluation aborts. `None` disables the
    /// check.
    pub max_loop_iterations: Option<u64>,
}

impl Default for EngineLimits {
    fn default() -> Self {
        EngineLimits { max_call_depth: 2048, max_loop_iterations: None }
    }
}

#[cfg(feature = "config")]
impl EngineLimits {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let limits = EngineLimits { max_call_depth: 128, max_loop_iterations: Some(10_000) };
        let text = limits.to_toml().unwrap();
        assert_eq!(EngineLimits::from_toml(&text).unwrap(), limits);
    }

    #[test]
    fn default_has_no_loop_cap() {
        assert_eq!(EngineLimits::default().max_loop_iterations, None);
    }
}
