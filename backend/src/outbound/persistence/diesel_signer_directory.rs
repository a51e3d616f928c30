//! PostgreSQL-backed directory: `user_profiles` and `kyc_submissions`.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{DirectoryError, KycStatusProvider, SignerDirectory};
use crate::domain::{KycStatus, SignerProfile, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::ProfileRow;
use super::pool::{DbPool, PoolError};
use super::schema::{kyc_submissions, user_profiles};

/// Diesel-backed implementation of the directory and KYC ports.
#[derive(Clone)]
pub struct DieselSignerDirectory {
    pool: DbPool,
}

impl DieselSignerDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DirectoryError {
    map_basic_pool_error(error, DirectoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> DirectoryError {
    map_basic_diesel_error(error, DirectoryError::query, DirectoryError::connection)
}

fn raw_ids(user_ids: &[UserId]) -> Vec<Uuid> {
    user_ids.iter().map(|id| *id.as_uuid()).collect()
}

#[async_trait]
impl SignerDirectory for DieselSignerDirectory {
    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SignerProfile>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProfileRow> = user_profiles::table
            .find(*user_id.as_uuid())
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(SignerProfile::from))
    }

    async fn find_profiles(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, SignerProfile>, DirectoryError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ProfileRow> = user_profiles::table
            .filter(user_profiles::user_id.eq_any(raw_ids(user_ids)))
            .select(ProfileRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(SignerProfile::from)
            .map(|profile| (profile.user_id, profile))
            .collect())
    }
}

#[async_trait]
impl KycStatusProvider for DieselSignerDirectory {
    async fn statuses(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, KycStatus>, DirectoryError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(Uuid, String)> = kyc_submissions::table
            .filter(kyc_submissions::user_id.eq_any(raw_ids(user_ids)))
            .select((kyc_submissions::user_id, kyc_submissions::status))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|(user_id, status)| (UserId::from_uuid(user_id), KycStatus::from_stored(&status)))
            .collect())
    }
}
