//! # noded-common
//!
//! Shared error types for the noded supervisor crates.

pub mod errors;

pub use errors::{Error, Result};
