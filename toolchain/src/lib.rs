//! Version-isolated Kotlin compiler invocation.
//!
//! A [`Toolchain`] bundles one loading context, built from a fixed set of
//! compiler and plugin artifacts, with descriptors for the plugins it carries.
//! Invokers bind a compiler entry point to a toolchain and run it, returning
//! the compiler's status code. The architecture keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (artifact ordering, jar indexing,
//!   status taxonomy). No I/O.
//! - **[`io`]**: Side-effecting operations (config, artifact resolution,
//!   context loading, process launching).
//!
//! [`toolchain`] and [`invoker`] assemble the two into the public entry points.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod invoker;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod toolchain;

pub use crate::core::types::{EntryPoint, PluginDescriptor, PluginKind, ToolStatus};
pub use crate::error::ToolchainError;
pub use crate::invoker::{JsCompilerInvoker, JvmCompilerInvoker, ToolInvoker};
pub use crate::toolchain::{DefaultToolchain, Toolchain};
