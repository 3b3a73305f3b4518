//! Shared types describing tools, plugins and their outcomes.
//!
//! These types are plain values: they carry no handles to loaded artifacts and
//! never perform I/O.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::exit_codes;

/// Outcome reported by a compiler run.
///
/// Invokers return the raw integer produced by the tool; this enum only
/// classifies a code for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Tool completed successfully.
    Ok,
    /// The input program did not compile.
    CompilationError,
    /// The tool itself failed.
    InternalError,
    /// A script run by the tool failed.
    ScriptExecutionError,
}

impl ToolStatus {
    pub fn code(self) -> i32 {
        match self {
            ToolStatus::Ok => exit_codes::OK,
            ToolStatus::CompilationError => exit_codes::COMPILATION_ERROR,
            ToolStatus::InternalError => exit_codes::INTERNAL_ERROR,
            ToolStatus::ScriptExecutionError => exit_codes::SCRIPT_EXECUTION_ERROR,
        }
    }

    /// Classify a raw status code. Codes outside the taxonomy yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            exit_codes::OK => Some(ToolStatus::Ok),
            exit_codes::COMPILATION_ERROR => Some(ToolStatus::CompilationError),
            exit_codes::INTERNAL_ERROR => Some(ToolStatus::InternalError),
            exit_codes::SCRIPT_EXECUTION_ERROR => Some(ToolStatus::ScriptExecutionError),
            _ => None,
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ToolStatus::Ok => "ok",
            ToolStatus::CompilationError => "compilation error",
            ToolStatus::InternalError => "internal error",
            ToolStatus::ScriptExecutionError => "script execution error",
        };
        f.write_str(label)
    }
}

/// Compiler plugins bundled with the toolchain, in classpath order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    JvmAbiGen,
    SkipCodeGen,
    JdepsGen,
    Kapt,
    KspApi,
    KspCommandLine,
}

impl PluginKind {
    pub const ALL: [PluginKind; 6] = [
        PluginKind::JvmAbiGen,
        PluginKind::SkipCodeGen,
        PluginKind::JdepsGen,
        PluginKind::Kapt,
        PluginKind::KspApi,
        PluginKind::KspCommandLine,
    ];

    /// Logical name used as the descriptor map key and in config files.
    pub fn name(self) -> &'static str {
        match self {
            PluginKind::JvmAbiGen => "jvm-abi-gen",
            PluginKind::SkipCodeGen => "skip-code-gen",
            PluginKind::JdepsGen => "jdeps-gen",
            PluginKind::Kapt => "kapt",
            PluginKind::KspApi => "ksp-api",
            PluginKind::KspCommandLine => "ksp-cmdline",
        }
    }

    /// Plugin identifier the compiler expects in `-P plugin:<id>:...` options.
    ///
    /// Both symbol-processing artifacts register under the same identifier.
    pub fn plugin_id(self) -> &'static str {
        match self {
            PluginKind::JvmAbiGen => "org.jetbrains.kotlin.jvm.abi",
            PluginKind::SkipCodeGen => "io.bazel.kotlin.plugin.SkipCodeGen",
            PluginKind::JdepsGen => "io.bazel.kotlin.plugin.jdeps.JDepsGen",
            PluginKind::Kapt => "org.jetbrains.kotlin.kapt3",
            PluginKind::KspApi | PluginKind::KspCommandLine => {
                "com.google.devtools.ksp.symbol-processing"
            }
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One compiler plugin known to a toolchain: where it lives and how it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub location: PathBuf,
    pub id: &'static str,
}

/// Tool entry points that can be run inside a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    /// Compiles Kotlin to JVM bytecode.
    Jvm,
    /// Compiles Kotlin to JavaScript.
    Js,
}

/// Status type returned by every compiler entry point.
pub const STATUS_TYPE: &str = "org.jetbrains.kotlin.cli.common.ExitCode";

impl EntryPoint {
    /// Fully-qualified name of the entry-point class.
    pub fn class_name(self) -> &'static str {
        match self {
            EntryPoint::Jvm => "org.jetbrains.kotlin.cli.jvm.K2JVMCompiler",
            EntryPoint::Js => "org.jetbrains.kotlin.cli.js.K2JSCompiler",
        }
    }

    pub fn status_type(self) -> &'static str {
        STATUS_TYPE
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_compiler_taxonomy() {
        assert_eq!(ToolStatus::Ok.code(), 0);
        assert_eq!(ToolStatus::CompilationError.code(), 1);
        assert_eq!(ToolStatus::InternalError.code(), 2);
        assert_eq!(ToolStatus::ScriptExecutionError.code(), 3);
        assert_eq!(ToolStatus::from_code(2), Some(ToolStatus::InternalError));
        assert_eq!(ToolStatus::from_code(137), None);
    }

    #[test]
    fn plugin_names_are_unique() {
        let mut names: Vec<&str> = PluginKind::ALL.iter().map(|kind| kind.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PluginKind::ALL.len());
    }

    #[test]
    fn symbol_processing_kinds_share_plugin_id() {
        assert_eq!(
            PluginKind::KspApi.plugin_id(),
            PluginKind::KspCommandLine.plugin_id()
        );
    }
}
