//! Textual (§4.G), JSON (§4.H) and binary (§4.E.6) codecs for East values.
//!
//! Every codec here is type-directed: the caller supplies the `Type` a
//! value was produced against, so printing/parsing never needs to guess a
//! value's shape from the bytes alone.

pub mod beast;
pub mod csv;
pub mod json;
pub mod text;

pub use text::{parse, print};
