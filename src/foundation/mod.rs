//! Shared plumbing: the crate-wide error type.

pub mod error;
