//! Tool invokers: a toolchain entry point bound to a launcher.
//!
//! Binding checks that the entry point and its status type are defined by the
//! toolchain's artifacts, so a mismatched artifact set fails before any tool
//! runs. Invoking returns the tool's status code unchanged; interpreting it is
//! the caller's business.

use std::io::Write;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::types::EntryPoint;
use crate::error::ToolchainError;
use crate::io::launcher::{JavaLauncher, LaunchOptions, LaunchRequest, Launcher};
use crate::toolchain::Toolchain;

/// A tool entry point bound to a toolchain.
///
/// Reusable for any number of sequential invocations. Concurrent invocations
/// on one invoker are only as safe as its launcher.
#[derive(Debug)]
pub struct ToolInvoker<'t, L = JavaLauncher> {
    toolchain: &'t Toolchain,
    entry_point: EntryPoint,
    launcher: L,
}

impl<'t, L: Launcher> ToolInvoker<'t, L> {
    pub fn bind(
        toolchain: &'t Toolchain,
        entry_point: EntryPoint,
        launcher: L,
    ) -> Result<Self, ToolchainError> {
        let context = toolchain.context();
        if !context.defines(entry_point.class_name()) {
            return Err(ToolchainError::EntryPointNotFound { entry_point });
        }
        if !context.defines(entry_point.status_type()) {
            return Err(ToolchainError::StatusTypeNotFound {
                status_type: entry_point.status_type(),
            });
        }
        debug!(%entry_point, "bound tool invoker");
        Ok(Self {
            toolchain,
            entry_point,
            launcher,
        })
    }

    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }

    pub fn toolchain(&self) -> &'t Toolchain {
        self.toolchain
    }

    /// Run the tool with `args`, writing its diagnostics to `sink`.
    ///
    /// Blocks until the tool finishes and returns its status code.
    #[instrument(skip_all, fields(entry_point = %self.entry_point))]
    pub fn invoke(&self, args: &[String], sink: &mut dyn Write) -> Result<i32> {
        let request = LaunchRequest {
            context: self.toolchain.context(),
            entry_point: self.entry_point,
            args,
        };
        let status = self.launcher.execute(&request, sink)?;
        Ok(status.code())
    }
}

macro_rules! compiler_invoker {
    ($(#[$meta:meta])* $name:ident, $entry_point:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name<'t, L = JavaLauncher>(ToolInvoker<'t, L>);

        impl<'t> $name<'t> {
            /// Bind with a [`JavaLauncher`] using `options`.
            pub fn new(
                toolchain: &'t Toolchain,
                options: LaunchOptions,
            ) -> Result<Self, ToolchainError> {
                Self::with_launcher(toolchain, JavaLauncher::new(options))
            }
        }

        impl<'t, L: Launcher> $name<'t, L> {
            pub fn with_launcher(
                toolchain: &'t Toolchain,
                launcher: L,
            ) -> Result<Self, ToolchainError> {
                ToolInvoker::bind(toolchain, $entry_point, launcher).map(Self)
            }

            pub fn invoke(&self, args: &[String], sink: &mut dyn Write) -> Result<i32> {
                self.0.invoke(args, sink)
            }
        }
    };
}

compiler_invoker!(
    /// Compiles Kotlin sources to JVM class files.
    JvmCompilerInvoker,
    EntryPoint::Jvm
);

compiler_invoker!(
    /// Compiles Kotlin sources to JavaScript.
    JsCompilerInvoker,
    EntryPoint::Js
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedLauncher, TestToolchain};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn invoke_returns_status_code_unchanged() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");
        let launcher = ScriptedLauncher::new(vec![3, 7]);
        let invoker = ToolInvoker::bind(&toolchain, EntryPoint::Jvm, &launcher).expect("bind");

        let mut sink = Vec::new();
        assert_eq!(invoker.invoke(&args(&["a.kt"]), &mut sink).expect("first"), 3);
        assert_eq!(invoker.invoke(&args(&["b.kt"]), &mut sink).expect("second"), 7);

        let calls = launcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, EntryPoint::Jvm);
        assert_eq!(calls[1].1, args(&["b.kt"]));
        assert!(String::from_utf8(sink).expect("utf8").contains("scripted run 2"));
    }

    #[test]
    fn bind_fails_when_entry_point_is_absent() {
        let fixture = TestToolchain::without_js_compiler().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");

        let err = JsCompilerInvoker::with_launcher(&toolchain, ScriptedLauncher::new(vec![]))
            .unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::EntryPointNotFound {
                entry_point: EntryPoint::Js
            }
        ));
        assert!(
            JvmCompilerInvoker::with_launcher(&toolchain, ScriptedLauncher::new(vec![])).is_ok()
        );
    }

    #[test]
    fn bind_fails_when_status_type_is_absent() {
        let fixture = TestToolchain::without_status_type().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");

        let err = ToolInvoker::bind(&toolchain, EntryPoint::Jvm, ScriptedLauncher::new(vec![]))
            .unwrap_err();
        assert!(matches!(err, ToolchainError::StatusTypeNotFound { .. }));
    }

    #[test]
    fn launcher_errors_propagate() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");
        let invoker = JvmCompilerInvoker::with_launcher(&toolchain, ScriptedLauncher::new(vec![]))
            .expect("bind");

        let err = invoker.invoke(&args(&["a.kt"]), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("no scripted status left"));
    }
}
