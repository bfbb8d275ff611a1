//! Deterministic, pure logic shared by the suppression engine and the boosts.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod annotation;
pub mod diagnostics;
pub mod types;
