//! Launchers run a tool entry point inside a loading context.
//!
//! The [`Launcher`] trait decouples invokers from how a tool is actually run.
//! [`JavaLauncher`] starts a fresh JVM per call whose class path is exactly
//! the context's artifacts; tests use scripted launchers that never spawn.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{EntryPoint, ToolStatus};
use crate::io::loader::LoadingContext;
use crate::io::process::{CommandOutput, run_command};

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// One tool run: which entry point, inside which context, with which arguments.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub context: &'a LoadingContext,
    pub entry_point: EntryPoint,
    pub args: &'a [String],
}

/// Status object produced by a finished tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStatus(i32);

impl RawStatus {
    pub fn new(code: i32) -> Self {
        Self(code)
    }

    /// Numeric code reported by the tool, unchanged.
    pub fn code(self) -> i32 {
        self.0
    }
}

/// Abstraction over how tool entry points are executed.
pub trait Launcher {
    /// Run the entry point to completion, writing its diagnostics to `sink`.
    fn execute(&self, request: &LaunchRequest<'_>, sink: &mut dyn Write) -> Result<RawStatus>;
}

impl<L: Launcher + ?Sized> Launcher for &L {
    fn execute(&self, request: &LaunchRequest<'_>, sink: &mut dyn Write) -> Result<RawStatus> {
        (**self).execute(request, sink)
    }
}

/// Settings applied to every JVM started by a [`JavaLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Kill the tool after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Diagnostics kept per stream before truncation.
    pub output_limit_bytes: usize,
    /// Flags passed to the JVM ahead of the class path.
    pub jvm_flags: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            jvm_flags: Vec::new(),
        }
    }
}

/// Launcher that runs each tool in its own JVM process.
#[derive(Debug, Clone, Default)]
pub struct JavaLauncher {
    options: LaunchOptions,
}

impl JavaLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    fn command(&self, request: &LaunchRequest<'_>) -> Result<Command> {
        let classpath = request
            .context
            .classpath()
            .context("join class path")?;
        let mut cmd = Command::new(request.context.java());
        cmd.args(&self.options.jvm_flags)
            .arg("-cp")
            .arg(classpath)
            .arg(request.entry_point.class_name())
            .args(request.args);
        Ok(cmd)
    }
}

impl Launcher for JavaLauncher {
    #[instrument(skip_all, fields(entry_point = %request.entry_point, args = request.args.len()))]
    fn execute(&self, request: &LaunchRequest<'_>, sink: &mut dyn Write) -> Result<RawStatus> {
        info!("starting tool");
        let cmd = self.command(request)?;
        let output = run_command(cmd, self.options.timeout, self.options.output_limit_bytes)
            .with_context(|| format!("run {}", request.entry_point))?;

        forward_diagnostics(&output, sink).context("write tool diagnostics")?;

        if output.timed_out {
            warn!(timeout = ?self.options.timeout, "tool timed out");
            bail!(
                "{} timed out after {:?}",
                request.entry_point,
                self.options.timeout.unwrap_or_default()
            );
        }
        let code = output
            .status
            .code()
            .ok_or_else(|| anyhow!("{} terminated by signal", request.entry_point))?;

        match ToolStatus::from_code(code) {
            Some(status) => debug!(code, %status, "tool finished"),
            None => warn!(code, "tool finished with code outside the known taxonomy"),
        }
        Ok(RawStatus::new(code))
    }
}

fn forward_diagnostics(output: &CommandOutput, sink: &mut dyn Write) -> std::io::Result<()> {
    sink.write_all(&output.stdout)?;
    sink.write_all(output.stdout_truncated_notice("tool").as_bytes())?;
    sink.write_all(&output.stderr)?;
    sink.write_all(output.stderr_truncated_notice("tool").as_bytes())?;
    sink.flush()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::TestToolchain;

    fn request<'a>(context: &'a LoadingContext, args: &'a [String]) -> LaunchRequest<'a> {
        LaunchRequest {
            context,
            entry_point: EntryPoint::Jvm,
            args,
        }
    }

    #[test]
    fn runs_entry_point_with_context_class_path() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");
        let source = fixture.write_source("Hello.kt", "fun main() {}\n").expect("source");
        let args = vec![source.display().to_string()];
        let launcher = JavaLauncher::new(LaunchOptions {
            jvm_flags: vec!["-Xss4m".to_string()],
            ..LaunchOptions::default()
        });

        let mut sink = Vec::new();
        let status = launcher
            .execute(&request(toolchain.context(), &args), &mut sink)
            .expect("execute");

        assert_eq!(status.code(), 0);
        let diagnostics = String::from_utf8(sink).expect("utf8");
        assert!(diagnostics.contains("main=org.jetbrains.kotlin.cli.jvm.K2JVMCompiler"));
        assert!(diagnostics.contains("flags=-Xss4m"));
        let expected = toolchain.context().classpath().expect("classpath");
        assert!(diagnostics.contains(&format!("classpath={}", expected.to_string_lossy())));
    }

    #[test]
    fn timeout_is_reported_as_error() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");
        let args = vec![crate::test_support::SLEEP_ARG.to_string()];
        let launcher = JavaLauncher::new(LaunchOptions {
            timeout: Some(Duration::from_millis(200)),
            ..LaunchOptions::default()
        });

        let err = launcher
            .execute(&request(toolchain.context(), &args), &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn unknown_codes_pass_through() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");
        let args = vec![format!("{}42", crate::test_support::EXIT_ARG_PREFIX)];

        let status = JavaLauncher::default()
            .execute(&request(toolchain.context(), &args), &mut Vec::new())
            .expect("execute");
        assert_eq!(status.code(), 42);
    }
}
