//! Filesystem storage for rendered certificates.
//!
//! Documents are written beneath a single root directory opened with
//! `cap-std`, so a relative document path can never escape the root. The
//! stored reference is the relative path itself.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};

use crate::domain::ports::{CertificateStorage, CertificateStorageError};

/// Certificate storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsCertificateStorage {
    root: PathBuf,
}

impl FsCertificateStorage {
    /// Create the root directory if needed and wrap it.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CertificateStorageError> {
        let root = root.into();
        Dir::create_ambient_dir_all(&root, ambient_authority())
            .map_err(|err| CertificateStorageError::io(format!("{}: {err}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Accept only plain relative paths without `..` or absolute components.
fn validate_relative(path: &str) -> Result<&Path, CertificateStorageError> {
    let candidate = Path::new(path);
    let plain = !path.is_empty()
        && candidate
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(candidate)
    } else {
        Err(CertificateStorageError::invalid_path(path))
    }
}

fn write_document(root: &Path, path: &str, bytes: &[u8]) -> Result<(), CertificateStorageError> {
    let relative = validate_relative(path)?;
    let dir = Dir::open_ambient_dir(root, ambient_authority())
        .map_err(|err| CertificateStorageError::io(format!("{}: {err}", root.display())))?;
    if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
        dir.create_dir_all(parent)
            .map_err(|err| CertificateStorageError::io(format!("{path}: {err}")))?;
    }
    dir.write(relative, bytes)
        .map_err(|err| CertificateStorageError::io(format!("{path}: {err}")))
}

#[async_trait]
impl CertificateStorage for FsCertificateStorage {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<String, CertificateStorageError> {
        let root = self.root.clone();
        let owned_path = path.to_owned();
        let owned_bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || write_document(&root, &owned_path, &owned_bytes))
            .await
            .map_err(|err| CertificateStorageError::io(format!("storage task failed: {err}")))??;
        Ok(path.to_owned())
    }
}
