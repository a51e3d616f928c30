//! Port for document and signature-image blobs.
//!
//! Reads go through short-lived [`SignedUrl`]s. A URL is minted only for an
//! object that exists, and an expired or tampered URL fails closed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;

/// Logical storage bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Owner uploads, never modified.
    Original,
    /// Stamped artifacts, one per signing round.
    Signed,
    /// Cleaned signature images.
    Signatures,
}

impl Bucket {
    /// Every bucket, in creation order.
    pub const ALL: [Self; 3] = [Self::Original, Self::Signed, Self::Signatures];

    /// Directory and URL segment for the bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Signed => "signed",
            Self::Signatures => "signatures",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown bucket name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bucket: {0}")]
pub struct UnknownBucket(pub String);

impl FromStr for Bucket {
    type Err = UnknownBucket;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == value)
            .ok_or_else(|| UnknownBucket(value.to_owned()))
    }
}

/// A time-limited capability to read one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Bucket holding the object.
    pub bucket: Bucket,
    /// Object key.
    pub key: String,
    /// Instant after which the URL is refused.
    pub expires_at: DateTime<Utc>,
    /// Adapter-specific proof of issuance.
    pub token: String,
}

impl SignedUrl {
    /// Relative path and query under which the HTTP adapter serves the object.
    #[must_use]
    pub fn path(&self) -> String {
        format!(
            "/files/{}/{}?expires={}&token={}",
            self.bucket,
            self.key,
            self.expires_at.timestamp(),
            self.token
        )
    }
}

define_port_error! {
    /// Errors raised by blob storage adapters.
    pub enum BlobStorageError {
        /// Backend unreachable.
        Connection { message: String } =>
            "blob storage unavailable: {message}",
        /// Read or write failed.
        Io { message: String } =>
            "blob storage i/o failed: {message}",
        /// The key is not a safe relative path.
        InvalidKey { key: String } =>
            "invalid object key: {key}",
        /// The URL's validity window has passed.
        Expired =>
            "signed url expired",
        /// The URL was not issued by this store.
        InvalidToken =>
            "signed url token mismatch",
        /// The object no longer exists.
        NotFound { key: String } =>
            "object {key} not found",
    }
}

/// Port for storing blobs and issuing read capabilities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, bucket: Bucket, key: &str, bytes: Vec<u8>)
    -> Result<(), BlobStorageError>;

    /// Mint a URL valid for `ttl`, or `None` when the object does not exist.
    async fn signed_url(
        &self,
        bucket: Bucket,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<SignedUrl>, BlobStorageError>;

    /// Read the object a URL grants access to.
    async fn fetch(&self, url: &SignedUrl) -> Result<Vec<u8>, BlobStorageError>;
}
