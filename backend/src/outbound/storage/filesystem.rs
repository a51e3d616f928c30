//! Filesystem blob store rooted in one capability-scoped directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::TraceId;
use crate::domain::ports::{BlobStorage, BlobStorageError, Bucket, SignedUrl};

use super::{UrlSigner, validate_key};

/// Stores each bucket as a sub-directory of the root.
#[derive(Clone)]
pub struct FilesystemBlobStorage {
    root: Arc<Dir>,
    signer: UrlSigner,
}

fn io_error(context: &str, error: &io::Error) -> BlobStorageError {
    BlobStorageError::io(format!("{context}: {error}"))
}

fn object_path(bucket: Bucket, key: &str) -> PathBuf {
    Path::new(bucket.as_str()).join(key)
}

impl FilesystemBlobStorage {
    /// Open (creating if needed) the root and every bucket directory.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStorageError::Connection`] when the root cannot be
    /// created or opened.
    pub fn open(root: &Path, signer: UrlSigner) -> Result<Self, BlobStorageError> {
        let unavailable =
            |err: io::Error| BlobStorageError::connection(format!("{}: {err}", root.display()));
        Dir::create_ambient_dir_all(root, ambient_authority()).map_err(unavailable)?;
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(unavailable)?;
        for bucket in Bucket::ALL {
            dir.create_dir_all(bucket.as_str()).map_err(unavailable)?;
        }
        Ok(Self {
            root: Arc::new(dir),
            signer,
        })
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, BlobStorageError>
    where
        F: FnOnce(&Dir) -> Result<T, BlobStorageError> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        TraceId::spawn_blocking(move || work(&root))
            .await
            .map_err(|err| BlobStorageError::io(format!("storage task failed: {err}")))?
    }
}

#[async_trait]
impl BlobStorage for FilesystemBlobStorage {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BlobStorageError> {
        validate_key(key)?;
        let path = object_path(bucket, key);
        self.blocking(move |root| {
            if let Some(parent) = path.parent() {
                root.create_dir_all(parent)
                    .map_err(|err| io_error("create directory", &err))?;
            }
            let staged = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
            root.write(&staged, &bytes)
                .map_err(|err| io_error("write object", &err))?;
            root.rename(&staged, root, &path)
                .map_err(|err| io_error("publish object", &err))
        })
        .await?;
        debug!(%bucket, key, "object stored");
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<SignedUrl>, BlobStorageError> {
        validate_key(key)?;
        let path = object_path(bucket, key);
        let exists = self
            .blocking(move |root| match root.metadata(&path) {
                Ok(metadata) => Ok(metadata.is_file()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(err) => Err(io_error("stat object", &err)),
            })
            .await?;
        if !exists {
            return Ok(None);
        }
        self.signer.issue(bucket, key, ttl).map(Some)
    }

    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, BlobStorageError> {
        self.signer.check(url)?;
        validate_key(&url.key)?;
        let key = url.key.clone();
        let path = object_path(url.bucket, &key);
        self.blocking(move |root| {
            root.read(&path).map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    BlobStorageError::not_found(key)
                } else {
                    io_error("read object", &err)
                }
            })
        })
        .await
    }
}
