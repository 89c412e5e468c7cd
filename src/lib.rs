//! Response cache in front of a generated documentation site.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
