//! Deterministic, pure logic shared by the toolchain.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod classpath;
pub mod jar;
pub mod types;
