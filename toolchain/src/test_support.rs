//! Test-only fixtures: fake jars, a fake Java home and scripted launchers.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

use crate::core::classpath::PluginArtifacts;
use crate::core::types::{EntryPoint, PluginKind};
use crate::error::ToolchainError;
use crate::io::launcher::{LaunchRequest, Launcher, RawStatus};
use crate::io::resolver::{ArtifactKey, DirectoryResolver};
use crate::toolchain::Toolchain;

/// Argument that makes the fake `java` hang until killed.
pub const SLEEP_ARG: &str = "--fake-sleep";
/// Argument prefix that makes the fake `java` exit with the given code.
pub const EXIT_ARG_PREFIX: &str = "--fake-exit=";

const JVM_COMPILER_CLASS: &str = "org/jetbrains/kotlin/cli/jvm/K2JVMCompiler.class";
const JS_COMPILER_CLASS: &str = "org/jetbrains/kotlin/cli/js/K2JSCompiler.class";
const STATUS_CLASS: &str = "org/jetbrains/kotlin/cli/common/ExitCode.class";
const CLI_TOOL_CLASS: &str = "org/jetbrains/kotlin/cli/common/CLITool.class";

/// Stands in for `bin/java`: echoes how it was launched, then checks the
/// `.kt` arguments the way a compiler would report syntax errors.
const FAKE_JAVA: &str = r#"#!/bin/sh
flags=""
while [ "$#" -gt 0 ] && [ "$1" != "-cp" ]; do
  flags="$flags$1 "
  shift
done
shift
classpath="$1"
shift
main="$1"
shift
echo "main=$main"
echo "classpath=$classpath"
echo "flags=${flags% }"
case "$main" in
  org.jetbrains.kotlin.cli.jvm.K2JVMCompiler|org.jetbrains.kotlin.cli.js.K2JSCompiler) ;;
  *) echo "error: could not find or load main class $main" >&2; exit 2 ;;
esac
for arg in "$@"; do
  case "$arg" in
    --fake-sleep) exec sleep 30 ;;
    --fake-exit=*) exit "${arg#--fake-exit=}" ;;
    *.kt)
      if [ ! -f "$arg" ]; then
        echo "error: source file or directory not found: $arg" >&2
        exit 1
      fi
      if grep -q "syntax error" "$arg"; then
        echo "$arg:1:10: error: expecting ')'" >&2
        exit 1
      fi
      ;;
  esac
done
exit 0
"#;

/// Encode a jar (stored, empty entries) containing `entries`.
pub fn jar_bytes(entries: &[&str]) -> Vec<u8> {
    let raw: Vec<&[u8]> = entries.iter().map(|name| name.as_bytes()).collect();
    jar_bytes_raw(&raw)
}

/// Like [`jar_bytes`], with entry names given as raw bytes.
pub fn jar_bytes_raw(entries: &[&[u8]]) -> Vec<u8> {
    let (mut out, directory_offset, directory_len) = entries_and_directory(entries);
    let count = entries.len() as u16;
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // disk numbers
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&(directory_len as u32).to_le_bytes());
    out.extend_from_slice(&(directory_offset as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out
}

/// Archive whose directory bounds live only in the zip64 end record.
pub fn zip64_jar_bytes(entries: &[&str]) -> Vec<u8> {
    let raw: Vec<&[u8]> = entries.iter().map(|name| name.as_bytes()).collect();
    let (mut out, directory_offset, directory_len) = entries_and_directory(&raw);
    let count = entries.len() as u64;

    let record = out.len() as u64;
    out.extend_from_slice(&0x0606_4b50u32.to_le_bytes());
    out.extend_from_slice(&44u64.to_le_bytes()); // size of the rest of the record
    out.extend_from_slice(&45u16.to_le_bytes()); // version made by
    out.extend_from_slice(&45u16.to_le_bytes()); // version needed
    out.extend_from_slice(&[0u8; 8]); // disk numbers
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&(directory_len as u64).to_le_bytes());
    out.extend_from_slice(&(directory_offset as u64).to_le_bytes());

    out.extend_from_slice(&0x0706_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // disk with the record
    out.extend_from_slice(&record.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // total disks

    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // disk numbers
    out.extend_from_slice(&u16::MAX.to_le_bytes());
    out.extend_from_slice(&u16::MAX.to_le_bytes());
    out.extend_from_slice(&u32::MAX.to_le_bytes());
    out.extend_from_slice(&u32::MAX.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out
}

/// Local entries followed by the central directory; returns the directory's
/// offset and length.
fn entries_and_directory(entries: &[&[u8]]) -> (Vec<u8>, usize, usize) {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for name in entries {
        let offset = out.len() as u32;
        let name_len = name.len() as u16;

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&[0u8; 4]); // flags, method (stored)
        out.extend_from_slice(&[0u8; 4]); // mod time, mod date
        out.extend_from_slice(&[0u8; 12]); // crc, compressed, uncompressed
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes()); // version made by
        central.extend_from_slice(&20u16.to_le_bytes()); // version needed
        central.extend_from_slice(&[0u8; 8]); // flags, method, time, date
        central.extend_from_slice(&[0u8; 12]); // crc, compressed, uncompressed
        central.extend_from_slice(&name_len.to_le_bytes());
        central.extend_from_slice(&[0u8; 8]); // extra, comment, disk, internal attrs
        central.extend_from_slice(&[0u8; 4]); // external attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name);
    }

    let directory_offset = out.len();
    out.extend_from_slice(&central);
    (out, directory_offset, central.len())
}

pub fn write_jar(path: &Path, entries: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, jar_bytes(entries)).with_context(|| format!("write {}", path.display()))
}

/// A runtime home with a scripted `bin/java` and an optional `release` file.
#[derive(Debug, Clone)]
pub struct FakeJavaHome {
    root: PathBuf,
}

impl FakeJavaHome {
    /// Create the home at `root`. A pre-9 `version` also gets `lib/tools.jar`.
    pub fn create(root: &Path, version: Option<&str>) -> Result<Self> {
        let bin = root.join("bin");
        fs::create_dir_all(&bin).with_context(|| format!("create {}", bin.display()))?;
        let java = bin.join(format!("java{}", std::env::consts::EXE_SUFFIX));
        fs::write(&java, FAKE_JAVA).with_context(|| format!("write {}", java.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&java, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("chmod {}", java.display()))?;
        }

        if let Some(version) = version {
            fs::write(root.join("release"), format!("JAVA_VERSION=\"{version}\"\n"))
                .context("write release file")?;
            if version.starts_with("1.") {
                write_jar(
                    &root.join("lib").join("tools.jar"),
                    &["com/sun/tools/javac/Main.class"],
                )?;
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

/// Artifact paths of a fixture toolchain.
#[derive(Debug, Clone)]
pub struct FakeArtifacts {
    pub compiler: PathBuf,
    pub plugins: PluginArtifacts,
    pub support: Vec<PathBuf>,
}

fn plugin_entries(kind: PluginKind) -> &'static [&'static str] {
    match kind {
        PluginKind::JvmAbiGen => &["org/jetbrains/kotlin/jvm/abi/JvmAbiComponentRegistrar.class"],
        PluginKind::SkipCodeGen => &["io/bazel/kotlin/plugin/SkipCodeGen.class"],
        PluginKind::JdepsGen => &["io/bazel/kotlin/plugin/jdeps/JdepsGenComponentRegistrar.class"],
        PluginKind::Kapt => &["org/jetbrains/kotlin/kapt3/Kapt3ComponentRegistrar.class"],
        PluginKind::KspApi => &["com/google/devtools/ksp/processing/SymbolProcessor.class"],
        PluginKind::KspCommandLine => {
            &["com/google/devtools/ksp/KotlinSymbolProcessingCommandLineProcessor.class"]
        }
    }
}

/// Write the nine default artifacts into `dir` under their conventional names.
pub fn write_default_artifacts(dir: &Path, compiler_entries: &[&str]) -> Result<FakeArtifacts> {
    let path = |key: ArtifactKey| dir.join(key.default_file_name());

    let compiler = path(ArtifactKey::Compiler);
    write_jar(&compiler, compiler_entries)?;
    for kind in PluginKind::ALL {
        write_jar(&path(ArtifactKey::Plugin(kind)), plugin_entries(kind))?;
    }
    let stdlib = path(ArtifactKey::Stdlib);
    let reflect = path(ArtifactKey::Reflect);
    write_jar(&stdlib, &["kotlin/Unit.class", "kotlin/collections/CollectionsKt.class"])?;
    write_jar(&reflect, &["kotlin/reflect/full/KClasses.class"])?;

    let plugin = |kind: PluginKind| path(ArtifactKey::Plugin(kind));
    Ok(FakeArtifacts {
        compiler,
        plugins: PluginArtifacts {
            jvm_abi_gen: plugin(PluginKind::JvmAbiGen),
            skip_code_gen: plugin(PluginKind::SkipCodeGen),
            jdeps_gen: plugin(PluginKind::JdepsGen),
            kapt: plugin(PluginKind::Kapt),
            ksp_api: plugin(PluginKind::KspApi),
            ksp_cmdline: plugin(PluginKind::KspCommandLine),
        },
        support: vec![stdlib, reflect],
    })
}

/// A temp directory holding a fake Java home and a full default artifact set.
pub struct TestToolchain {
    pub temp: tempfile::TempDir,
    pub java_home: PathBuf,
    pub artifacts_dir: PathBuf,
    pub artifacts: FakeArtifacts,
}

impl TestToolchain {
    pub fn new() -> Result<Self> {
        Self::create(
            &[JVM_COMPILER_CLASS, JS_COMPILER_CLASS, STATUS_CLASS, CLI_TOOL_CLASS],
            None,
        )
    }

    /// Fixture whose runtime reports `version` in its `release` file.
    pub fn with_runtime_version(version: &str) -> Result<Self> {
        Self::create(
            &[JVM_COMPILER_CLASS, JS_COMPILER_CLASS, STATUS_CLASS, CLI_TOOL_CLASS],
            Some(version),
        )
    }

    /// Fixture whose compiler artifact lacks the JS entry point.
    pub fn without_js_compiler() -> Result<Self> {
        Self::create(&[JVM_COMPILER_CLASS, STATUS_CLASS, CLI_TOOL_CLASS], None)
    }

    /// Fixture whose compiler artifact lacks the status type.
    pub fn without_status_type() -> Result<Self> {
        Self::create(&[JVM_COMPILER_CLASS, JS_COMPILER_CLASS, CLI_TOOL_CLASS], None)
    }

    fn create(compiler_entries: &[&str], runtime_version: Option<&str>) -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let java_home = temp.path().join("jdk");
        FakeJavaHome::create(&java_home, runtime_version)?;
        let artifacts_dir = temp.path().join("lib");
        let artifacts = write_default_artifacts(&artifacts_dir, compiler_entries)?;
        Ok(Self {
            temp,
            java_home,
            artifacts_dir,
            artifacts,
        })
    }

    pub fn build(&self) -> Result<Toolchain, ToolchainError> {
        Toolchain::create(
            &self.java_home,
            &self.artifacts.compiler,
            &self.artifacts.plugins,
            &self.artifacts.support,
        )
    }

    pub fn resolver(&self) -> DirectoryResolver {
        DirectoryResolver::new(&self.artifacts_dir)
    }

    /// Write a source file under the fixture's `src/` directory.
    pub fn write_source(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.temp.path().join("src").join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Launcher returning queued status codes and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedLauncher {
    codes: Mutex<VecDeque<i32>>,
    calls: Mutex<Vec<(EntryPoint, Vec<String>)>>,
}

impl ScriptedLauncher {
    pub fn new(codes: Vec<i32>) -> Self {
        Self {
            codes: Mutex::new(codes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(EntryPoint, Vec<String>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Launcher for ScriptedLauncher {
    fn execute(&self, request: &LaunchRequest<'_>, sink: &mut dyn Write) -> Result<RawStatus> {
        let run = {
            let mut calls = self.calls.lock().map_err(|_| anyhow!("calls lock poisoned"))?;
            calls.push((request.entry_point, request.args.to_vec()));
            calls.len()
        };
        writeln!(sink, "scripted run {run}: {}", request.entry_point)?;
        let code = self
            .codes
            .lock()
            .map_err(|_| anyhow!("codes lock poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted status left for {}", request.entry_point))?;
        Ok(RawStatus::new(code))
    }
}
