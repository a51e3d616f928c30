//! Port for stored signature images.

use async_trait::async_trait;

use crate::domain::{SignatureAsset, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by signature asset adapters.
    pub enum SignatureAssetRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "signature asset repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "signature asset repository query failed: {message}",
    }
}

/// Port for activating and reading signature assets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureAssetRepository: Send + Sync {
    /// Deactivate every asset the owner has and insert `asset` as active.
    ///
    /// Adapters perform both writes in one unit so that no reader ever sees
    /// two active rows for a user.
    async fn activate(&self, asset: &SignatureAsset) -> Result<(), SignatureAssetRepositoryError>;

    /// The user's active asset, if any.
    async fn find_active(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<SignatureAsset>, SignatureAssetRepositoryError>;
}
