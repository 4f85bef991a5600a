//! # mealtrace-shared
//!
//! Domain types and pure nutrition logic shared by every Mealtrace crate.
//!
//! Nothing in here performs I/O: the nutrition calculator, the advice
//! ladder and the food reference table are all deterministic functions so
//! they can be exercised without a store or a network.

pub mod advice;
pub mod constants;
pub mod foods;
pub mod nutrition;
pub mod types;

pub use types::*;
