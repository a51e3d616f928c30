//! Ports for the profile directory and the identity-assurance provider.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{KycStatus, SignerProfile, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by directory and KYC adapters.
    pub enum DirectoryError {
        /// Backend unreachable.
        Connection { message: String } =>
            "directory connection failed: {message}",
        /// Lookup failed.
        Query { message: String } =>
            "directory query failed: {message}",
    }
}

/// Port for signer display names and roles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignerDirectory: Send + Sync {
    /// One profile.
    async fn find_profile(&self, user_id: &UserId)
    -> Result<Option<SignerProfile>, DirectoryError>;

    /// Profiles for every known id; unknown ids are omitted.
    async fn find_profiles(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, SignerProfile>, DirectoryError>;
}

/// Port for identity-assurance status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KycStatusProvider: Send + Sync {
    /// Status per id; ids without a submission are omitted.
    async fn statuses(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, KycStatus>, DirectoryError>;
}
