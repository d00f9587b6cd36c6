//! Policy document loading.

use std::path::{Path, PathBuf};

use daylux_domain::policy::RawPolicy;

/// A policy file that cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum PolicyFileError {
    #[error("failed to read policy file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse the JSON policy document at `path`.
///
/// # Errors
///
/// Returns [`PolicyFileError::Io`] when the file cannot be read and
/// [`PolicyFileError::Parse`] when it is not a valid policy document.
pub fn load(path: &Path) -> Result<RawPolicy, PolicyFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| PolicyFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let policy = RawPolicy::from_json(&content).map_err(|source| PolicyFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bulbs = policy.bulbs.len(), "policy file loaded");
    Ok(policy)
}
