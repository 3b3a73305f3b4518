//! Isolated loading context over an ordered list of artifacts.
//!
//! A context is the class path a tool runs with: classes resolve from the
//! artifacts in list order (first definition wins) and only then from the
//! platform classes of the host runtime. Tools are launched as separate JVM
//! processes with exactly this class path, so nothing loaded by the caller can
//! leak into them.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::core::classpath::{parse_release_version, with_legacy_library};
use crate::core::jar;
use crate::error::{LoadFailure, ToolchainError};

/// Package prefixes the host runtime always provides.
const HOST_PACKAGES: &[&str] = &["java.", "javax.", "jdk.", "sun.", "com.sun."];

/// Where a class resolves from inside a [`LoadingContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrigin<'a> {
    /// Defined by one of the context's artifacts.
    Artifact(&'a Path),
    /// Not defined by any artifact but visible from the host runtime.
    Host,
}

/// Immutable, fully indexed class path for running tools.
#[derive(Debug)]
pub struct LoadingContext {
    base_path: PathBuf,
    java: PathBuf,
    runtime_version: Option<String>,
    artifacts: Vec<PathBuf>,
    classes: HashMap<String, usize>,
}

impl LoadingContext {
    /// Read and index every artifact, all or nothing.
    ///
    /// Pre-9 runtimes get their legacy system library appended after the
    /// given artifacts. Any failure carries `base_path` and the full artifact
    /// list.
    #[instrument(skip_all, fields(base_path = %base_path.display(), artifacts = artifacts.len()))]
    pub fn build(base_path: &Path, artifacts: &[PathBuf]) -> Result<Self, ToolchainError> {
        let runtime_version = read_runtime_version(base_path).map_err(|cause| {
            ToolchainError::Load {
                base_path: base_path.to_path_buf(),
                artifacts: artifacts.to_vec(),
                cause,
            }
        })?;
        let artifacts = with_legacy_library(
            artifacts.to_vec(),
            base_path,
            runtime_version.as_deref(),
        );

        match index_artifacts(base_path, &artifacts) {
            Ok((java, classes)) => {
                info!(
                    classes = classes.len(),
                    runtime_version = runtime_version.as_deref().unwrap_or("unknown"),
                    "loading context built"
                );
                Ok(Self {
                    base_path: base_path.to_path_buf(),
                    java,
                    runtime_version,
                    artifacts,
                    classes,
                })
            }
            Err(cause) => Err(ToolchainError::Load {
                base_path: base_path.to_path_buf(),
                artifacts,
                cause,
            }),
        }
    }

    /// Resolve a fully-qualified class name the way the tool's JVM would.
    pub fn resolve(&self, class_name: &str) -> Option<ClassOrigin<'_>> {
        if let Some(&index) = self.classes.get(class_name) {
            return Some(ClassOrigin::Artifact(&self.artifacts[index]));
        }
        HOST_PACKAGES
            .iter()
            .any(|prefix| class_name.starts_with(prefix))
            .then_some(ClassOrigin::Host)
    }

    /// Whether one of the context's artifacts defines `class_name`.
    pub fn defines(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn contains_artifact(&self, path: &Path) -> bool {
        self.artifacts.iter().any(|artifact| artifact == path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Java executable of the host runtime.
    pub fn java(&self) -> &Path {
        &self.java
    }

    pub fn runtime_version(&self) -> Option<&str> {
        self.runtime_version.as_deref()
    }

    /// Artifacts in resolution order, including any legacy system library.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Platform-joined class path suitable for `java -cp`.
    pub fn classpath(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(&self.artifacts)
    }
}

fn read_runtime_version(base_path: &Path) -> Result<Option<String>, LoadFailure> {
    let release = base_path.join("release");
    match fs::read_to_string(&release) {
        Ok(contents) => Ok(parse_release_version(&contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(LoadFailure::io(&release, err)),
    }
}

fn index_artifacts(
    base_path: &Path,
    artifacts: &[PathBuf],
) -> Result<(PathBuf, HashMap<String, usize>), LoadFailure> {
    let java = base_path
        .join("bin")
        .join(format!("java{}", std::env::consts::EXE_SUFFIX));
    if !java.is_file() {
        return Err(LoadFailure::MissingJava { path: java });
    }

    let mut classes = HashMap::new();
    for (index, artifact) in artifacts.iter().enumerate() {
        let bytes = fs::read(artifact).map_err(|err| LoadFailure::io(artifact, err))?;
        let names =
            jar::class_names(&bytes).map_err(|source| LoadFailure::MalformedArtifact {
                path: artifact.clone(),
                source,
            })?;
        debug!(artifact = %artifact.display(), classes = names.len(), "indexed artifact");
        for name in names {
            classes.entry(name).or_insert(index);
        }
    }
    Ok((java, classes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeJavaHome, write_jar};

    #[test]
    fn first_artifact_shadows_later_definitions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = FakeJavaHome::create(&temp.path().join("jdk"), None).expect("jdk");
        let first = temp.path().join("first.jar");
        let second = temp.path().join("second.jar");
        write_jar(&first, &["shared/Api.class", "first/Only.class"]).expect("first");
        write_jar(&second, &["shared/Api.class", "second/Only.class"]).expect("second");

        let context =
            LoadingContext::build(home.path(), &[first.clone(), second.clone()]).expect("build");

        assert_eq!(
            context.resolve("shared.Api"),
            Some(ClassOrigin::Artifact(first.as_path()))
        );
        assert_eq!(
            context.resolve("second.Only"),
            Some(ClassOrigin::Artifact(second.as_path()))
        );
        assert_eq!(context.class_count(), 3);
    }

    #[test]
    fn artifacts_shadow_host_classes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = FakeJavaHome::create(&temp.path().join("jdk"), None).expect("jdk");
        let jar = temp.path().join("patched.jar");
        write_jar(&jar, &["javax/annotation/Generated.class"]).expect("jar");

        let context = LoadingContext::build(home.path(), &[jar.clone()]).expect("build");

        assert_eq!(
            context.resolve("javax.annotation.Generated"),
            Some(ClassOrigin::Artifact(jar.as_path()))
        );
        assert_eq!(context.resolve("java.lang.String"), Some(ClassOrigin::Host));
        assert_eq!(context.resolve("com.example.Missing"), None);
        assert!(!context.defines("java.lang.String"));
    }

    #[test]
    fn legacy_runtime_appends_system_library() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home =
            FakeJavaHome::create(&temp.path().join("jdk8"), Some("1.8.0_392")).expect("jdk");
        let jar = temp.path().join("compiler.jar");
        write_jar(&jar, &["a/Main.class"]).expect("jar");

        let context = LoadingContext::build(home.path(), &[jar.clone()]).expect("build");

        assert_eq!(context.runtime_version(), Some("1.8.0_392"));
        assert_eq!(
            context.artifacts(),
            &[jar, home.path().join("lib").join("tools.jar")]
        );
        assert!(context.defines("com.sun.tools.javac.Main"));
    }

    #[test]
    fn modern_runtime_uses_artifacts_as_given() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = FakeJavaHome::create(&temp.path().join("jdk17"), Some("17.0.9")).expect("jdk");
        let jar = temp.path().join("compiler.jar");
        write_jar(&jar, &["a/Main.class"]).expect("jar");

        let context = LoadingContext::build(home.path(), &[jar.clone()]).expect("build");

        assert_eq!(context.artifacts(), &[jar]);
    }

    #[test]
    fn unreadable_artifact_fails_with_full_artifact_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = FakeJavaHome::create(&temp.path().join("jdk"), None).expect("jdk");
        let good = temp.path().join("good.jar");
        let missing = temp.path().join("missing.jar");
        write_jar(&good, &["a/Main.class"]).expect("jar");

        let err = LoadingContext::build(home.path(), &[good.clone(), missing.clone()])
            .unwrap_err();

        match err {
            ToolchainError::Load {
                base_path,
                artifacts,
                cause: LoadFailure::Io { path, .. },
            } => {
                assert_eq!(base_path, home.path());
                assert_eq!(artifacts, vec![good, missing.clone()]);
                assert_eq!(path, missing);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_artifact_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = FakeJavaHome::create(&temp.path().join("jdk"), None).expect("jdk");
        let bogus = temp.path().join("bogus.jar");
        fs::write(&bogus, b"not a zip archive").expect("write");

        let err = LoadingContext::build(home.path(), &[bogus]).unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::Load {
                cause: LoadFailure::MalformedArtifact { .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_java_executable_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let jar = temp.path().join("compiler.jar");
        write_jar(&jar, &["a/Main.class"]).expect("jar");

        let err = LoadingContext::build(&temp.path().join("nowhere"), &[jar]).unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::Load {
                cause: LoadFailure::MissingJava { .. },
                ..
            }
        ));
    }
}
