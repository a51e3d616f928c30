//! Blob store kept in process memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{BlobStorage, BlobStorageError, Bucket, SignedUrl};

use super::{UrlSigner, validate_key};

/// In-memory [`BlobStorage`] sharing the signed URL scheme of the filesystem store.
#[derive(Clone)]
pub struct MemoryBlobStorage {
    objects: Arc<RwLock<HashMap<(Bucket, String), Vec<u8>>>>,
    signer: UrlSigner,
}

impl MemoryBlobStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: Arc::default(),
            signer,
        }
    }

    /// Number of objects held in `bucket`.
    pub async fn object_count(&self, bucket: Bucket) -> usize {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(stored, _)| *stored == bucket)
            .count()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BlobStorageError> {
        validate_key(key)?;
        self.objects
            .write()
            .await
            .insert((bucket, key.to_owned()), bytes);
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<SignedUrl>, BlobStorageError> {
        validate_key(key)?;
        if !self
            .objects
            .read()
            .await
            .contains_key(&(bucket, key.to_owned()))
        {
            return Ok(None);
        }
        self.signer.issue(bucket, key, ttl).map(Some)
    }

    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, BlobStorageError> {
        self.signer.check(url)?;
        self.objects
            .read()
            .await
            .get(&(url.bucket, url.key.clone()))
            .cloned()
            .ok_or_else(|| BlobStorageError::not_found(url.key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_support::FixedClock;

    #[rstest]
    #[tokio::test]
    async fn expired_urls_fail_closed() {
        let clock = Arc::new(FixedClock::at_millis(1_767_225_600_000));
        let storage = MemoryBlobStorage::new(UrlSigner::new(b"k".to_vec(), clock.clone()));
        storage
            .put(Bucket::Signed, "round.pdf", b"pdf".to_vec())
            .await
            .expect("put");
        let url = storage
            .signed_url(Bucket::Signed, "round.pdf", Duration::from_secs(30))
            .await
            .expect("sign")
            .expect("exists");

        clock.advance(Duration::from_secs(31));

        assert_eq!(
            storage.fetch(&url).await,
            Err(BlobStorageError::expired())
        );
        assert_eq!(storage.object_count(Bucket::Signed).await, 1);
    }
}
