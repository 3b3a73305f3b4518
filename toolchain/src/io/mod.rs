//! I/O for toolchain assembly and tool runs.

pub mod config;
pub mod launcher;
pub mod loader;
pub mod process;
pub mod resolver;
