//! Artifact resolution for the default toolchain.
//!
//! Resolvers turn a symbolic [`ArtifactKey`] into a verified, absolute path.
//! Everything downstream trusts their result without checking again.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::types::PluginKind;

/// The nine artifacts making up the default toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKey {
    Compiler,
    Plugin(PluginKind),
    Stdlib,
    Reflect,
}

impl ArtifactKey {
    pub const ALL: [ArtifactKey; 9] = [
        ArtifactKey::Compiler,
        ArtifactKey::Plugin(PluginKind::JvmAbiGen),
        ArtifactKey::Plugin(PluginKind::SkipCodeGen),
        ArtifactKey::Plugin(PluginKind::JdepsGen),
        ArtifactKey::Plugin(PluginKind::Kapt),
        ArtifactKey::Plugin(PluginKind::KspApi),
        ArtifactKey::Plugin(PluginKind::KspCommandLine),
        ArtifactKey::Stdlib,
        ArtifactKey::Reflect,
    ];

    /// Name used for this artifact in config files.
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKey::Compiler => "compiler",
            ArtifactKey::Plugin(kind) => kind.name(),
            ArtifactKey::Stdlib => "stdlib",
            ArtifactKey::Reflect => "reflect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// File name under the artifact root by convention.
    pub fn default_file_name(self) -> &'static str {
        match self {
            ArtifactKey::Compiler => "kotlin-compiler.jar",
            ArtifactKey::Plugin(PluginKind::JvmAbiGen) => "jvm-abi-gen.jar",
            ArtifactKey::Plugin(PluginKind::SkipCodeGen) => "skip-code-gen.jar",
            ArtifactKey::Plugin(PluginKind::JdepsGen) => "jdeps-gen.jar",
            ArtifactKey::Plugin(PluginKind::Kapt) => "kotlin-annotation-processing.jar",
            ArtifactKey::Plugin(PluginKind::KspApi) => "symbol-processing-api.jar",
            ArtifactKey::Plugin(PluginKind::KspCommandLine) => "symbol-processing-cmdline.jar",
            ArtifactKey::Stdlib => "kotlin-stdlib.jar",
            ArtifactKey::Reflect => "kotlin-reflect.jar",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps artifact keys to verified absolute file paths.
pub trait ArtifactResolver {
    fn resolve(&self, key: ArtifactKey) -> Result<PathBuf>;
}

impl<R: ArtifactResolver + ?Sized> ArtifactResolver for &R {
    fn resolve(&self, key: ArtifactKey) -> Result<PathBuf> {
        (**self).resolve(key)
    }
}

/// Resolves artifacts inside one directory using the fixed naming convention.
///
/// `overrides` replace the conventional file name of individual keys; relative
/// overrides are taken relative to `root`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
    overrides: BTreeMap<ArtifactKey, PathBuf>,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, key: ArtifactKey, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(key, path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidate(&self, key: ArtifactKey) -> PathBuf {
        match self.overrides.get(&key) {
            Some(path) => self.root.join(path),
            None => self.root.join(key.default_file_name()),
        }
    }
}

impl ArtifactResolver for DirectoryResolver {
    fn resolve(&self, key: ArtifactKey) -> Result<PathBuf> {
        let candidate = self.candidate(key);
        let metadata = fs::metadata(&candidate)
            .with_context(|| format!("artifact {key} not found at {}", candidate.display()))?;
        if !metadata.is_file() {
            bail!("artifact {key} at {} is not a file", candidate.display());
        }
        let resolved = candidate
            .canonicalize()
            .with_context(|| format!("canonicalize {}", candidate.display()))?;
        debug!(artifact = %key, path = %resolved.display(), "resolved artifact");
        Ok(resolved)
    }
}
