//! Toolchain assembly: one loading context plus its compiler plugins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::classpath::{PluginArtifacts, assemble, base_runtime_location};
use crate::core::types::{PluginDescriptor, PluginKind};
use crate::error::ToolchainError;
use crate::io::loader::LoadingContext;
use crate::io::resolver::{ArtifactKey, ArtifactResolver};

/// Immutable bundle of a loading context and the plugins preloaded into it.
///
/// Building one indexes every artifact, so a process normally builds a single
/// toolchain and shares it with every invoker.
#[derive(Debug)]
pub struct Toolchain {
    context: LoadingContext,
    plugins: BTreeMap<PluginKind, PluginDescriptor>,
}

impl Toolchain {
    /// Build a toolchain over `[compiler] ++ plugins ++ support`.
    #[instrument(
        skip_all,
        fields(base_path = %base_path.display(), compiler = %compiler.display())
    )]
    pub fn create(
        base_path: &Path,
        compiler: &Path,
        plugins: &PluginArtifacts,
        support: &[PathBuf],
    ) -> Result<Self, ToolchainError> {
        let artifacts = assemble(compiler, plugins, support);
        let context = LoadingContext::build(base_path, &artifacts)?;

        let mut descriptors = BTreeMap::new();
        for (kind, location) in plugins.iter() {
            let loaded = context.contains_artifact(location);
            debug_assert!(loaded, "descriptor {} outside the loading context", location.display());
            if !loaded {
                return Err(ToolchainError::DescriptorNotLoaded {
                    location: location.to_path_buf(),
                });
            }
            descriptors.insert(
                kind,
                PluginDescriptor {
                    location: location.to_path_buf(),
                    id: kind.plugin_id(),
                },
            );
        }

        info!(plugins = descriptors.len(), "toolchain assembled");
        Ok(Self {
            context,
            plugins: descriptors,
        })
    }

    /// Resolve the nine default artifacts and build a toolchain from them.
    ///
    /// `runtime_home` may point at a legacy `jre` image; the base runtime
    /// location is computed from it.
    pub fn from_resolver(resolver: &dyn ArtifactResolver, runtime_home: &Path) -> Result<Self> {
        let artifacts = DefaultArtifacts::resolve(resolver)?;
        let base_path = base_runtime_location(runtime_home);
        debug!(base_path = %base_path.display(), "computed base runtime location");
        let toolchain = Self::create(
            &base_path,
            &artifacts.compiler,
            &artifacts.plugins,
            &artifacts.support,
        )?;
        Ok(toolchain)
    }

    pub fn context(&self) -> &LoadingContext {
        &self.context
    }

    /// Plugin descriptors in plugin kind order.
    pub fn plugins(&self) -> &BTreeMap<PluginKind, PluginDescriptor> {
        &self.plugins
    }

    pub fn plugin(&self, kind: PluginKind) -> Option<&PluginDescriptor> {
        self.plugins.get(&kind)
    }

    pub fn describe(&self) -> ToolchainSummary {
        ToolchainSummary {
            base_path: self.context.base_path().to_path_buf(),
            java: self.context.java().to_path_buf(),
            runtime_version: self.context.runtime_version().map(str::to_string),
            classpath: self.context.artifacts().to_vec(),
            classes: self.context.class_count(),
            plugins: self
                .plugins
                .iter()
                .map(|(kind, descriptor)| (kind.name(), descriptor.clone()))
                .collect(),
        }
    }
}

/// Serializable overview of a toolchain.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainSummary {
    pub base_path: PathBuf,
    pub java: PathBuf,
    pub runtime_version: Option<String>,
    pub classpath: Vec<PathBuf>,
    pub classes: usize,
    pub plugins: BTreeMap<&'static str, PluginDescriptor>,
}

/// Paths of the default artifact set.
#[derive(Debug, Clone)]
pub struct DefaultArtifacts {
    pub compiler: PathBuf,
    pub plugins: PluginArtifacts,
    /// Compiler runtime libraries, loaded after the plugins.
    pub support: Vec<PathBuf>,
}

impl DefaultArtifacts {
    pub fn resolve(resolver: &dyn ArtifactResolver) -> Result<Self> {
        let get = |key: ArtifactKey| {
            resolver
                .resolve(key)
                .with_context(|| format!("resolve artifact {key}"))
        };
        let plugin = |kind: PluginKind| get(ArtifactKey::Plugin(kind));
        Ok(Self {
            compiler: get(ArtifactKey::Compiler)?,
            plugins: PluginArtifacts {
                jvm_abi_gen: plugin(PluginKind::JvmAbiGen)?,
                skip_code_gen: plugin(PluginKind::SkipCodeGen)?,
                jdeps_gen: plugin(PluginKind::JdepsGen)?,
                kapt: plugin(PluginKind::Kapt)?,
                ksp_api: plugin(PluginKind::KspApi)?,
                ksp_cmdline: plugin(PluginKind::KspCommandLine)?,
            },
            support: vec![get(ArtifactKey::Stdlib)?, get(ArtifactKey::Reflect)?],
        })
    }
}

/// Lazily built default toolchain, shared by everything holding this value.
///
/// The first [`DefaultToolchain::get`] builds the toolchain; concurrent and
/// later callers receive the same instance. A failed build is not cached, but
/// since assembly is deterministic the caller is expected to abort instead of
/// retrying.
pub struct DefaultToolchain<R> {
    resolver: R,
    runtime_home: PathBuf,
    cell: OnceCell<Arc<Toolchain>>,
}

impl<R: ArtifactResolver> DefaultToolchain<R> {
    pub fn new(resolver: R, runtime_home: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            runtime_home: runtime_home.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<Toolchain>> {
        self.cell
            .get_or_try_init(|| {
                Toolchain::from_resolver(&self.resolver, &self.runtime_home).map(Arc::new)
            })
            .cloned()
    }

    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestToolchain;

    #[test]
    fn descriptors_cover_every_plugin_kind() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");

        let kinds: Vec<PluginKind> = toolchain.plugins().keys().copied().collect();
        assert_eq!(kinds, PluginKind::ALL.to_vec());
        let abi = toolchain.plugin(PluginKind::JvmAbiGen).expect("abi plugin");
        assert_eq!(abi.id, "org.jetbrains.kotlin.jvm.abi");
        assert_eq!(abi.location, fixture.artifacts.plugins.jvm_abi_gen);
    }

    #[test]
    fn every_descriptor_location_is_loaded() {
        let fixture = TestToolchain::new().expect("fixture");
        let toolchain = fixture.build().expect("toolchain");

        for descriptor in toolchain.plugins().values() {
            assert!(toolchain.context().contains_artifact(&descriptor.location));
        }
    }

    #[test]
    fn summary_lists_plugins_by_logical_name() {
        let fixture = TestToolchain::new().expect("fixture");
        let summary = fixture.build().expect("toolchain").describe();

        assert_eq!(summary.classpath.len(), 9);
        assert_eq!(summary.classpath[0], fixture.artifacts.compiler);
        assert_eq!(
            summary.plugins["ksp-cmdline"].id,
            "com.google.devtools.ksp.symbol-processing"
        );
        let json = serde_json::to_value(&summary).expect("json");
        assert!(json["plugins"]["kapt"]["location"].is_string());
    }

    #[test]
    fn jre_home_resolves_to_parent_base() {
        let fixture = TestToolchain::new().expect("fixture");
        let jre = fixture.java_home.join("jre");
        std::fs::create_dir_all(&jre).expect("jre dir");

        let toolchain = Toolchain::from_resolver(&fixture.resolver(), &jre).expect("toolchain");
        assert_eq!(toolchain.context().base_path(), fixture.java_home.as_path());
    }

    #[test]
    fn default_toolchain_is_built_once() {
        let fixture = TestToolchain::new().expect("fixture");
        let default = DefaultToolchain::new(fixture.resolver(), &fixture.java_home);
        assert!(!default.is_built());

        let first = default.get().expect("first");
        let second = default.get().expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(default.is_built());
    }
}
