//! `east-core`: type algebra, value model and sorted containers for East.
//!
//! This crate has no notion of IR or evaluation — it is the data layer that
//! `east-runtime` and `east-codec` build on. See the workspace root
//! `DESIGN.md` for how the pieces fit together.

pub mod container;
pub mod error;
pub mod sorted;
pub mod types;
pub mod value;

pub use error::{EastError, EastResult, Location, PathStep};
pub use types::{Field, Type};
pub use value::Value;
