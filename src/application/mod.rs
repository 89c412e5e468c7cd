//! Application-level error reporting.

pub mod error;
