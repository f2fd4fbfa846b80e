//! Resolving download identifiers to resources.

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncRead;

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::file::FileResource;
use crate::AsyncSeekStart;

/// A resolution service turning an identifier into a readable resource.
///
/// Nothing is cached: every call resolves against the backing storage.
pub trait Locate {
    type Reader: AsyncRead + AsyncSeekStart + Send + 'static;

    fn resolve(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<FileResource<Self::Reader>, DownloadError>> + Send;
}

/// Resolves relative paths below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsLocator {
    root: PathBuf,
}

impl FsLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLocator { root: root.into() }
    }

    pub fn from_config(config: &DownloadConfig) -> Self {
        FsLocator::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `identifier` onto the root, refusing anything that could escape it.
    fn path_for(&self, identifier: &str) -> Option<PathBuf> {
        let relative = Path::new(identifier.trim_start_matches('/'));
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

impl Locate for FsLocator {
    type Reader = File;

    async fn resolve(&self, identifier: &str) -> Result<FileResource<File>, DownloadError> {
        let not_found = || DownloadError::NotFound { identifier: identifier.to_string() };

        let Some(path) = self.path_for(identifier) else {
            tracing::warn!(identifier, "rejected download identifier outside root");
            return Err(not_found());
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                tracing::warn!(path = %path.display(), "download target is not a regular file");
                return Err(not_found());
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "download target not found");
                return Err(not_found());
            }
        }

        FileResource::open(&path).await.map_err(|err| match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => not_found(),
            _ => DownloadError::Io(err),
        })
    }
}

/// Serves in-memory resources by name, for content that never touches disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    entries: HashMap<String, Bytes>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        MemoryLocator::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, contents: impl Into<Bytes>) {
        self.entries.insert(identifier.into(), contents.into());
    }
}

impl Locate for MemoryLocator {
    type Reader = Cursor<Bytes>;

    async fn resolve(
        &self,
        identifier: &str,
    ) -> Result<FileResource<Cursor<Bytes>>, DownloadError> {
        let contents = self
            .entries
            .get(identifier)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound { identifier: identifier.to_string() })?;
        let byte_size = contents.len() as u64;
        let filename = identifier.rsplit('/').next().unwrap_or(identifier).to_string();
        Ok(FileResource::sized(Cursor::new(contents), byte_size, filename))
    }
}
