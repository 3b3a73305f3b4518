//! Stable status codes reported by compiler runs and by the CLI.

/// Tool completed successfully.
pub const OK: i32 = 0;
/// The input program has errors.
pub const COMPILATION_ERROR: i32 = 1;
/// The tool failed internally. The CLI also exits with this code when the
/// toolchain cannot be assembled.
pub const INTERNAL_ERROR: i32 = 2;
/// A script executed by the tool failed.
pub const SCRIPT_EXECUTION_ERROR: i32 = 3;
