//! Fatal errors raised while assembling a toolchain or binding a tool.
//!
//! None of these are recoverable: the same artifact set fails the same way on
//! every attempt, so callers abort the encompassing build action.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::jar::JarError;
use crate::core::types::EntryPoint;

#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The loading context could not be built from the artifact list.
    #[error(
        "failed to build loading context at {} from [{}]",
        .base_path.display(),
        display_paths(.artifacts)
    )]
    Load {
        base_path: PathBuf,
        artifacts: Vec<PathBuf>,
        #[source]
        cause: LoadFailure,
    },

    /// The entry point class is not defined by any loaded artifact.
    #[error("entry point {entry_point} not found in loaded artifacts")]
    EntryPointNotFound { entry_point: EntryPoint },

    /// The status type of an entry point is not defined by any loaded artifact.
    #[error("status type {status_type} not found in loaded artifacts")]
    StatusTypeNotFound { status_type: &'static str },

    /// A plugin descriptor points at an artifact missing from the context.
    #[error("plugin artifact {} is not part of the loading context", .location.display())]
    DescriptorNotLoaded { location: PathBuf },
}

/// Underlying reason a loading context failed to build.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed artifact {}", .path.display())]
    MalformedArtifact {
        path: PathBuf,
        #[source]
        source: JarError,
    },

    #[error("no java executable at {}", .path.display())]
    MissingJava { path: PathBuf },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LoadFailure {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        LoadFailure::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
