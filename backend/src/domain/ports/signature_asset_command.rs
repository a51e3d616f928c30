//! Driving ports for a user's signature image.

use async_trait::async_trait;

use crate::domain::{Error, SignatureAsset, UserId};

/// Request to replace the active signature image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSignatureRequest {
    /// Uploading user.
    pub owner_id: UserId,
    /// Raw image bytes (PNG or JPEG).
    pub image: Vec<u8>,
    /// Extract blue ink and drop the paper background.
    pub remove_background: bool,
}

/// Driving port for signature uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureAssetCommand: Send + Sync {
    /// Clean, store and activate a new image.
    async fn upload_signature(
        &self,
        request: UploadSignatureRequest,
    ) -> Result<SignatureAsset, Error>;
}

/// Driving port for signature reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureAssetQuery: Send + Sync {
    /// The user's active image.
    async fn active_signature(&self, owner_id: &UserId) -> Result<SignatureAsset, Error>;
}

/// Fixture implementation with no stored images.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSignatureAssetService;

#[async_trait]
impl SignatureAssetCommand for FixtureSignatureAssetService {
    async fn upload_signature(
        &self,
        _request: UploadSignatureRequest,
    ) -> Result<SignatureAsset, Error> {
        Err(Error::service_unavailable("signature storage is not configured"))
    }
}

#[async_trait]
impl SignatureAssetQuery for FixtureSignatureAssetService {
    async fn active_signature(&self, _owner_id: &UserId) -> Result<SignatureAsset, Error> {
        Err(Error::not_found("no active signature"))
    }
}
