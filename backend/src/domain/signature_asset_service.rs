//! Signature image upload and lookup.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    AuditSink, BlobStorage, Bucket, SignatureAssetCommand, SignatureAssetQuery,
    SignatureAssetRepository, SignatureImageCleaner, UploadSignatureRequest,
};
use crate::domain::service_errors::{
    map_asset_error, map_image_error, map_join_error, map_storage_write_error,
};
use crate::domain::service_support::emit_audit;
use crate::domain::{
    AuditAction, AuditEvent, Error, SignatureAsset, SignatureAssetId, SigningError, TraceId,
    UserId,
};

/// Service implementing the signature asset driving ports.
#[derive(Clone)]
pub struct SignatureAssetService {
    assets: Arc<dyn SignatureAssetRepository>,
    storage: Arc<dyn BlobStorage>,
    cleaner: Arc<dyn SignatureImageCleaner>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl SignatureAssetService {
    /// Create the service.
    pub fn new(
        assets: Arc<dyn SignatureAssetRepository>,
        storage: Arc<dyn BlobStorage>,
        cleaner: Arc<dyn SignatureImageCleaner>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            assets,
            storage,
            cleaner,
            audit,
            clock,
        }
    }
}

#[async_trait]
impl SignatureAssetCommand for SignatureAssetService {
    async fn upload_signature(
        &self,
        request: UploadSignatureRequest,
    ) -> Result<SignatureAsset, Error> {
        let UploadSignatureRequest {
            owner_id,
            image,
            remove_background,
        } = request;
        if image.is_empty() {
            return Err(SigningError::validation("image", "image must not be empty").into());
        }

        let cleaner = Arc::clone(&self.cleaner);
        let cleaned =
            TraceId::spawn_blocking(move || cleaner.clean(&image, remove_background))
                .await
                .map_err(map_join_error)?
                .map_err(map_image_error)?;

        let now = self.clock.utc();
        let image_key = format!("{owner_id}/{}_{}.png", now.timestamp_millis(), Uuid::new_v4());
        self.storage
            .put(Bucket::Signatures, &image_key, cleaned.png)
            .await
            .map_err(map_storage_write_error)?;

        let asset = SignatureAsset {
            id: SignatureAssetId::random(),
            owner_id,
            image_key,
            is_active: true,
            created_at: now,
        };
        self.assets
            .activate(&asset)
            .await
            .map_err(map_asset_error)?;
        info!(%owner_id, asset_id = %asset.id, "signature activated");

        emit_audit(
            &self.audit,
            AuditEvent {
                actor_id: owner_id,
                action: AuditAction::SignatureUpload,
                entity_id: *asset.id.as_uuid(),
                details: json!({
                    "width": cleaned.width,
                    "height": cleaned.height,
                    "removeBackground": remove_background,
                }),
                occurred_at: now,
            },
        )
        .await;
        Ok(asset)
    }
}

#[async_trait]
impl SignatureAssetQuery for SignatureAssetService {
    async fn active_signature(&self, owner_id: &UserId) -> Result<SignatureAsset, Error> {
        self.assets
            .find_active(owner_id)
            .await
            .map_err(map_asset_error)?
            .ok_or_else(|| SigningError::not_found("no active signature").into())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;
    use crate::domain::CleanedSignature;
    use crate::domain::ports::{
        MockAuditSink, MockBlobStorage, MockSignatureAssetRepository, MockSignatureImageCleaner,
        SignatureImageError,
    };
    use crate::domain::service_test_helpers::{fixture_clock, fixture_timestamp};
    use crate::domain::ErrorCode;

    #[derive(Default)]
    struct Mocks {
        assets: MockSignatureAssetRepository,
        storage: MockBlobStorage,
        cleaner: MockSignatureImageCleaner,
        audit: MockAuditSink,
    }

    impl Mocks {
        fn into_service(self) -> SignatureAssetService {
            SignatureAssetService::new(
                Arc::new(self.assets),
                Arc::new(self.storage),
                Arc::new(self.cleaner),
                Arc::new(self.audit),
                fixture_clock(),
            )
        }
    }

    #[rstest]
    #[tokio::test]
    async fn upload_cleans_stores_and_activates() {
        let owner = UserId::random();
        let mut mocks = Mocks::default();
        mocks
            .cleaner
            .expect_clean()
            .withf(|bytes, remove| bytes == b"jpeg bytes" && *remove)
            .times(1)
            .return_once(|_, _| {
                Ok(CleanedSignature {
                    png: b"png bytes".to_vec(),
                    width: 400,
                    height: 120,
                })
            });
        mocks
            .storage
            .expect_put()
            .withf(move |bucket, key, bytes| {
                *bucket == Bucket::Signatures
                    && key.starts_with(&format!("{owner}/"))
                    && bytes.as_slice() == b"png bytes"
            })
            .times(1)
            .return_once(|_, _, _| Ok(()));
        mocks
            .assets
            .expect_activate()
            .withf(move |asset| asset.is_active && asset.owner_id == owner)
            .times(1)
            .return_once(|_| Ok(()));
        mocks
            .audit
            .expect_record()
            .withf(|event| event.action == AuditAction::SignatureUpload)
            .return_once(|_| Ok(()));

        let asset = mocks
            .into_service()
            .upload_signature(UploadSignatureRequest {
                owner_id: owner,
                image: b"jpeg bytes".to_vec(),
                remove_background: true,
            })
            .await
            .expect("uploaded");

        assert!(asset.is_active);
        assert_eq!(asset.created_at, fixture_timestamp());
    }

    #[rstest]
    #[tokio::test]
    async fn undecodable_upload_is_a_validation_error() {
        let mut mocks = Mocks::default();
        mocks
            .cleaner
            .expect_clean()
            .return_once(|_, _| Err(SignatureImageError::decode("unknown format")));
        mocks.storage.expect_put().times(0);
        mocks.assets.expect_activate().times(0);

        let error = mocks
            .into_service()
            .upload_signature(UploadSignatureRequest {
                owner_id: UserId::random(),
                image: b"not an image".to_vec(),
                remove_background: false,
            })
            .await
            .expect_err("invalid image");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_active_signature_is_not_found() {
        let mut mocks = Mocks::default();
        mocks.assets.expect_find_active().return_once(|_| Ok(None));

        let error = mocks
            .into_service()
            .active_signature(&UserId::random())
            .await
            .expect_err("none active");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
