//! Toolchain configuration stored in `toolchain.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::launcher::{DEFAULT_OUTPUT_LIMIT_BYTES, LaunchOptions};
use crate::io::resolver::{ArtifactKey, DirectoryResolver};

pub const DEFAULT_CONFIG_FILE: &str = "toolchain.toml";

/// Toolchain configuration (TOML).
///
/// Missing fields default to values that work for a conventional artifact
/// directory next to the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Runtime home used to launch tools. The CLI falls back to `JAVA_HOME`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_home: Option<PathBuf>,

    /// Kill a tool run after this many seconds. `0` disables the limit.
    pub invocation_timeout_secs: u64,

    /// Truncate tool stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Extra flags for every tool JVM (e.g. `["-Xmx2g"]`).
    pub jvm_flags: Vec<String>,

    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding the artifacts. Relative paths are taken relative to
    /// the config file's directory.
    pub root: PathBuf,

    /// Per-artifact file overrides keyed by artifact name (`compiler`, `kapt`, ...).
    pub files: BTreeMap<String, PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("lib"),
            files: BTreeMap::new(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            java_home: None,
            invocation_timeout_secs: 0,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            jvm_flags: Vec::new(),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

impl ToolchainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.jvm_flags.iter().any(|flag| flag.trim().is_empty()) {
            return Err(anyhow!("jvm_flags must not contain empty entries"));
        }
        if let Some(unknown) = self
            .artifacts
            .files
            .keys()
            .find(|name| ArtifactKey::from_name(name).is_none())
        {
            return Err(anyhow!("artifacts.files has unknown artifact {unknown:?}"));
        }
        Ok(())
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            timeout: (self.invocation_timeout_secs > 0)
                .then(|| Duration::from_secs(self.invocation_timeout_secs)),
            output_limit_bytes: self.output_limit_bytes,
            jvm_flags: self.jvm_flags.clone(),
        }
    }

    /// Resolver for the configured artifact directory, anchored at `base_dir`.
    pub fn resolver(&self, base_dir: &Path) -> DirectoryResolver {
        let mut resolver = DirectoryResolver::new(base_dir.join(&self.artifacts.root));
        for (name, path) in &self.artifacts.files {
            if let Some(key) = ArtifactKey::from_name(name) {
                resolver = resolver.with_override(key, path);
            }
        }
        resolver
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ToolchainConfig::default()`.
pub fn load_config(path: &Path) -> Result<ToolchainConfig> {
    if !path.exists() {
        let cfg = ToolchainConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ToolchainConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ToolchainConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PluginKind;
    use crate::io::resolver::ArtifactResolver;
    use crate::test_support::write_jar;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ToolchainConfig::default());
        assert_eq!(cfg.launch_options().timeout, None);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("toolchain.toml");
        let mut cfg = ToolchainConfig {
            java_home: Some(PathBuf::from("/usr/lib/jvm/java-17")),
            invocation_timeout_secs: 600,
            jvm_flags: vec!["-Xmx2g".to_string()],
            ..ToolchainConfig::default()
        };
        cfg.artifacts
            .files
            .insert("kapt".to_string(), PathBuf::from("kapt-2.1.jar"));
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.launch_options().timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("toolchain.toml");
        fs::write(&path, "invocation_timeout_secs = 30\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.invocation_timeout_secs, 30);
        assert_eq!(cfg.output_limit_bytes, DEFAULT_OUTPUT_LIMIT_BYTES);
        assert_eq!(cfg.artifacts.root, PathBuf::from("lib"));
    }

    #[test]
    fn unknown_artifact_override_is_rejected() {
        let cfg = ToolchainConfig {
            artifacts: ArtifactsConfig {
                files: BTreeMap::from([("kotlinc".to_string(), PathBuf::from("x.jar"))]),
                ..ArtifactsConfig::default()
            },
            ..ToolchainConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("unknown artifact"));
    }

    #[test]
    fn resolver_applies_root_and_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let lib = temp.path().join("lib");
        fs::create_dir_all(&lib).expect("mkdir");
        write_jar(&lib.join("ksp-api-custom.jar"), &["a/B.class"]).expect("jar");

        let mut cfg = ToolchainConfig::default();
        cfg.artifacts
            .files
            .insert("ksp-api".to_string(), PathBuf::from("ksp-api-custom.jar"));

        let resolved = cfg
            .resolver(temp.path())
            .resolve(ArtifactKey::Plugin(PluginKind::KspApi))
            .expect("resolve");
        assert!(resolved.ends_with("lib/ksp-api-custom.jar"));
    }
}
