//! Blob storage adapters and the signed URL scheme they share.
//!
//! A URL token is the hex SHA-256 over the store secret, bucket, key and
//! expiry second. Tokens are checked before any read, so an expired or
//! edited URL never reaches the backing store.

mod filesystem;
mod memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ports::{BlobStorageError, Bucket, SignedUrl};

pub use filesystem::FilesystemBlobStorage;
pub use memory::MemoryBlobStorage;

const EPHEMERAL_SECRET_BYTES: usize = 32;

/// Issues and checks signed URL tokens.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Arc<Zeroizing<Vec<u8>>>,
    clock: Arc<dyn Clock>,
}

impl UrlSigner {
    /// Sign with a configured secret.
    #[must_use]
    pub fn new(secret: Vec<u8>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: Arc::new(Zeroizing::new(secret)),
            clock,
        }
    }

    /// Sign with a random secret that lives as long as the process.
    #[must_use]
    pub fn ephemeral(clock: Arc<dyn Clock>) -> Self {
        let mut secret = vec![0_u8; EPHEMERAL_SECRET_BYTES];
        OsRng.fill_bytes(&mut secret);
        Self::new(secret, clock)
    }

    fn token(&self, bucket: Bucket, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_slice());
        hasher.update([0_u8]);
        hasher.update(bucket.as_str());
        hasher.update([0_u8]);
        hasher.update(key);
        hasher.update([0_u8]);
        hasher.update(expires.to_string());
        hex::encode(hasher.finalize())
    }

    /// Mint a URL for `key` valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStorageError::Io`] when `ttl` is out of range.
    pub fn issue(
        &self,
        bucket: Bucket,
        key: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, BlobStorageError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| BlobStorageError::io(format!("invalid url ttl: {err}")))?;
        let expires = self
            .clock
            .utc()
            .checked_add_signed(ttl)
            .map(|instant| instant.timestamp())
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .ok_or_else(|| BlobStorageError::io("url expiry overflows"))?;
        Ok(SignedUrl {
            bucket,
            key: key.to_owned(),
            expires_at: expires,
            token: self.token(bucket, key, expires.timestamp()),
        })
    }

    /// Refuse expired or forged URLs.
    ///
    /// # Errors
    ///
    /// [`BlobStorageError::Expired`] once the expiry has passed and
    /// [`BlobStorageError::InvalidToken`] when the token does not match.
    pub fn check(&self, url: &SignedUrl) -> Result<(), BlobStorageError> {
        if self.clock.utc() > url.expires_at {
            return Err(BlobStorageError::expired());
        }
        let expected = self.token(url.bucket, &url.key, url.expires_at.timestamp());
        if expected.as_bytes() == url.token.as_bytes() {
            Ok(())
        } else {
            Err(BlobStorageError::invalid_token())
        }
    }
}

/// Accept only relative keys made of safe segments.
fn validate_key(key: &str) -> Result<(), BlobStorageError> {
    let well_formed = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if well_formed {
        Ok(())
    } else {
        Err(BlobStorageError::invalid_key(key))
    }
}
