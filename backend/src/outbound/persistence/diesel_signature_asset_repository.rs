//! PostgreSQL-backed `SignatureAssetRepository` over `user_signatures`.
//!
//! Activation deactivates the owner's rows and inserts the new one inside a
//! single transaction; a partial unique index enforces one active row.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{SignatureAssetRepository, SignatureAssetRepositoryError};
use crate::domain::{SignatureAsset, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::SignatureRow;
use super::pool::{DbPool, PoolError};
use super::schema::user_signatures;

/// Diesel-backed implementation of the signature asset port.
#[derive(Clone)]
pub struct DieselSignatureAssetRepository {
    pool: DbPool,
}

impl DieselSignatureAssetRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SignatureAssetRepositoryError {
    map_basic_pool_error(error, SignatureAssetRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SignatureAssetRepositoryError {
    map_basic_diesel_error(
        error,
        SignatureAssetRepositoryError::query,
        SignatureAssetRepositoryError::connection,
    )
}

#[async_trait]
impl SignatureAssetRepository for DieselSignatureAssetRepository {
    async fn activate(&self, asset: &SignatureAsset) -> Result<(), SignatureAssetRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let row = SignatureRow {
            is_active: true,
            ..SignatureRow::from(asset)
        };
        let owner_id = row.owner_id;
        let replaced = conn
            .transaction(|conn| {
                async move {
                    let replaced = diesel::update(
                        user_signatures::table
                            .filter(user_signatures::owner_id.eq(owner_id))
                            .filter(user_signatures::is_active.eq(true)),
                    )
                    .set(user_signatures::is_active.eq(false))
                    .execute(conn)
                    .await?;
                    diesel::insert_into(user_signatures::table)
                        .values(&row)
                        .execute(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(replaced)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        debug!(owner_id = %asset.owner_id, replaced, "signature asset activated");
        Ok(())
    }

    async fn find_active(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<SignatureAsset>, SignatureAssetRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<SignatureRow> = user_signatures::table
            .filter(user_signatures::owner_id.eq(*owner_id.as_uuid()))
            .filter(user_signatures::is_active.eq(true))
            .select(SignatureRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(SignatureAsset::from))
    }
}
