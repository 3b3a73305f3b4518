//! Command-line front end for the Kotlin toolchain.
//!
//! Assembles the toolchain described by `toolchain.toml` and runs a compiler
//! entry point inside it. The process exits with the compiler's status code,
//! or with `INTERNAL_ERROR` when the toolchain cannot be assembled.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use kt_toolchain::exit_codes;
use kt_toolchain::io::config::{DEFAULT_CONFIG_FILE, ToolchainConfig, load_config};
use kt_toolchain::io::loader::ClassOrigin;
use kt_toolchain::{JsCompilerInvoker, JvmCompilerInvoker, Toolchain, logging};

#[derive(Parser)]
#[command(
    name = "kt-toolchain",
    version,
    about = "Run Kotlin compilers inside an isolated toolchain"
)]
struct Cli {
    /// Path to the toolchain config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile for the JVM. Arguments after `--` go to the compiler.
    Jvm {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Compile to JavaScript. Arguments after `--` go to the compiler.
    Js {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the toolchain's base path, class path and plugins.
    Inspect {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print which artifact defines a class.
    Resolve {
        /// Fully-qualified class name.
        class: String,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INTERNAL_ERROR);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;
    let base_dir = config_dir(&cli.config);
    let runtime_home = runtime_home(&cfg)?;
    debug!(runtime_home = %runtime_home.display(), "using runtime home");

    let toolchain = Toolchain::from_resolver(&cfg.resolver(&base_dir), &runtime_home)
        .context("assemble toolchain")?;

    match cli.command {
        Command::Jvm { args } => {
            let invoker = JvmCompilerInvoker::new(&toolchain, cfg.launch_options())?;
            invoker.invoke(&args, &mut std::io::stderr())
        }
        Command::Js { args } => {
            let invoker = JsCompilerInvoker::new(&toolchain, cfg.launch_options())?;
            invoker.invoke(&args, &mut std::io::stderr())
        }
        Command::Inspect { json } => cmd_inspect(&toolchain, json),
        Command::Resolve { class } => cmd_resolve(&toolchain, &class),
    }
}

fn cmd_inspect(toolchain: &Toolchain, json: bool) -> Result<i32> {
    let summary = toolchain.describe();
    let mut out = std::io::stdout().lock();
    if json {
        let payload = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        writeln!(out, "{payload}")?;
        return Ok(exit_codes::OK);
    }

    writeln!(out, "base: {}", summary.base_path.display())?;
    writeln!(out, "java: {}", summary.java.display())?;
    if let Some(version) = &summary.runtime_version {
        writeln!(out, "runtime version: {version}")?;
    }
    writeln!(out, "classes: {}", summary.classes)?;
    writeln!(out, "classpath:")?;
    for artifact in &summary.classpath {
        writeln!(out, "  {}", artifact.display())?;
    }
    writeln!(out, "plugins:")?;
    for (name, descriptor) in &summary.plugins {
        writeln!(
            out,
            "  {name}: {} ({})",
            descriptor.id,
            descriptor.location.display()
        )?;
    }
    Ok(exit_codes::OK)
}

fn cmd_resolve(toolchain: &Toolchain, class: &str) -> Result<i32> {
    match toolchain.context().resolve(class) {
        Some(ClassOrigin::Artifact(path)) => println!("{}", path.display()),
        Some(ClassOrigin::Host) => println!("<host>"),
        None => anyhow::bail!("class {class} is not visible in the toolchain"),
    }
    Ok(exit_codes::OK)
}

fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn runtime_home(cfg: &ToolchainConfig) -> Result<PathBuf> {
    cfg.java_home
        .clone()
        .or_else(|| std::env::var_os("JAVA_HOME").map(PathBuf::from))
        .context("no java_home configured and JAVA_HOME is unset")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_jvm_passes_compiler_flags_through() {
        let cli = Cli::parse_from(["kt-toolchain", "jvm", "--", "-d", "out", "Hello.kt"]);
        match cli.command {
            Command::Jvm { args } => assert_eq!(args, vec!["-d", "out", "Hello.kt"]),
            _ => panic!("expected jvm command"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_inspect_json() {
        let cli = Cli::parse_from([
            "kt-toolchain",
            "--config",
            "ci/toolchain.toml",
            "inspect",
            "--json",
        ]);
        assert!(matches!(cli.command, Command::Inspect { json: true }));
        assert_eq!(config_dir(&cli.config), PathBuf::from("ci"));
    }

    #[test]
    fn bare_config_name_is_relative_to_cwd() {
        assert_eq!(config_dir(Path::new("toolchain.toml")), PathBuf::from("."));
    }
}
