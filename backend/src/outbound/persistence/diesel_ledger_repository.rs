//! PostgreSQL-backed `LedgerRepository` over the `document_signatures` table.
//!
//! The table is insert-only; database rules turn updates and deletes into
//! no-ops.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{LedgerRepository, LedgerRepositoryError};
use crate::domain::{DocumentId, LedgerEntry, VerificationCode};

use super::diesel_basic_error_mapping::{
    is_unique_violation_on, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::LedgerRow;
use super::pool::{DbPool, PoolError};
use super::schema::document_signatures;

/// Diesel-backed implementation of the ledger port.
#[derive(Clone)]
pub struct DieselLedgerRepository {
    pool: DbPool,
}

impl DieselLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LedgerRepositoryError {
    map_basic_pool_error(error, LedgerRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> LedgerRepositoryError {
    if is_unique_violation_on(&error, "verification_code") {
        return LedgerRepositoryError::duplicate_code();
    }
    map_basic_diesel_error(
        error,
        LedgerRepositoryError::query,
        LedgerRepositoryError::connection,
    )
}

fn decode(row: LedgerRow) -> Result<LedgerEntry, LedgerRepositoryError> {
    LedgerEntry::try_from(row).map_err(|err| LedgerRepositoryError::query(err.to_string()))
}

#[async_trait]
impl LedgerRepository for DieselLedgerRepository {
    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(document_signatures::table)
            .values(LedgerRow::from(entry))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn list_by_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<LedgerRow> = document_signatures::table
            .filter(document_signatures::document_id.eq(*document_id.as_uuid()))
            .order((
                document_signatures::signed_at.asc(),
                document_signatures::step_order.asc(),
            ))
            .select(LedgerRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(decode).collect()
    }

    async fn find_by_verification_code(
        &self,
        code: &VerificationCode,
    ) -> Result<Option<LedgerEntry>, LedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<LedgerRow> = document_signatures::table
            .filter(document_signatures::verification_code.eq(code.as_str()))
            .select(LedgerRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(decode).transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Error mapping coverage.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn missing_rows_map_to_query_errors() {
        let err = map_diesel_error(diesel::result::Error::NotFound);

        assert_eq!(err, LedgerRepositoryError::query("record not found"));
    }

    #[rstest]
    fn pool_failures_map_to_connection_errors() {
        let err = map_pool_error(PoolError::build("bad url"));

        assert_eq!(err, LedgerRepositoryError::connection("bad url"));
    }
}
