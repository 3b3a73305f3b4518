//! Ordering rules for the artifacts that make up a loading context.
//!
//! Everything here is pure path arithmetic. Reading the runtime's `release`
//! file and the artifacts themselves happens in [`crate::io::loader`].

use std::path::{Path, PathBuf};

use super::types::PluginKind;

/// Directory name of the private runtime image shipped inside pre-9 JDKs.
const LEGACY_RUNTIME_IMAGE_DIR: &str = "jre";

/// One artifact path per compiler plugin kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginArtifacts {
    pub jvm_abi_gen: PathBuf,
    pub skip_code_gen: PathBuf,
    pub jdeps_gen: PathBuf,
    pub kapt: PathBuf,
    pub ksp_api: PathBuf,
    pub ksp_cmdline: PathBuf,
}

impl PluginArtifacts {
    pub fn get(&self, kind: PluginKind) -> &Path {
        match kind {
            PluginKind::JvmAbiGen => &self.jvm_abi_gen,
            PluginKind::SkipCodeGen => &self.skip_code_gen,
            PluginKind::JdepsGen => &self.jdeps_gen,
            PluginKind::Kapt => &self.kapt,
            PluginKind::KspApi => &self.ksp_api,
            PluginKind::KspCommandLine => &self.ksp_cmdline,
        }
    }

    /// Plugin artifacts in the fixed [`PluginKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (PluginKind, &Path)> + '_ {
        PluginKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// `[compiler] ++ plugins ++ support`, the order classes are resolved in.
pub fn assemble(compiler: &Path, plugins: &PluginArtifacts, support: &[PathBuf]) -> Vec<PathBuf> {
    let mut artifacts = Vec::with_capacity(1 + PluginKind::ALL.len() + support.len());
    artifacts.push(compiler.to_path_buf());
    artifacts.extend(plugins.iter().map(|(_, path)| path.to_path_buf()));
    artifacts.extend(support.iter().cloned());
    artifacts
}

/// Base runtime location for a runtime home.
///
/// Pre-9 JDKs report their home as the nested `jre` image; the base sits one
/// level above it so that `lib/tools.jar` can be found.
pub fn base_runtime_location(runtime_home: &Path) -> PathBuf {
    match (runtime_home.file_name(), runtime_home.parent()) {
        (Some(name), Some(parent)) if name == LEGACY_RUNTIME_IMAGE_DIR => parent.to_path_buf(),
        _ => runtime_home.to_path_buf(),
    }
}

/// Location of the legacy compiler support library under a base runtime location.
pub fn legacy_system_library(base_path: &Path) -> PathBuf {
    base_path.join("lib").join("tools.jar")
}

/// Extract `JAVA_VERSION` from the contents of a runtime's `release` file.
pub fn parse_release_version(release: &str) -> Option<String> {
    release.lines().find_map(|line| {
        let value = line.trim().strip_prefix("JAVA_VERSION=")?;
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Whether a reported runtime version predates the module system (Java 9).
pub fn is_legacy_runtime(version: &str) -> bool {
    version.starts_with("1.")
}

/// Append the legacy system library when the runtime version requires it.
///
/// An unknown version is treated as modern.
pub fn with_legacy_library(
    mut artifacts: Vec<PathBuf>,
    base_path: &Path,
    runtime_version: Option<&str>,
) -> Vec<PathBuf> {
    if runtime_version.is_some_and(is_legacy_runtime) {
        artifacts.push(legacy_system_library(base_path));
    }
    artifacts
}
