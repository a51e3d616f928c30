//! PostgreSQL-backed `AuditSink` writing to `audit_logs`.

use async_trait::async_trait;
use diesel_async::RunQueryDsl;

use crate::domain::AuditEvent;
use crate::domain::ports::{AuditSink, AuditSinkError};

use super::models::NewAuditRow;
use super::pool::DbPool;
use super::schema::audit_logs;

/// Diesel-backed implementation of the audit port.
#[derive(Clone)]
pub struct DieselAuditSink {
    pool: DbPool,
}

impl DieselAuditSink {
    /// Create a new sink with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for DieselAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditSinkError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AuditSinkError::write(err.to_string()))?;
        diesel::insert_into(audit_logs::table)
            .values(NewAuditRow::from(&event))
            .execute(&mut conn)
            .await
            .map_err(|err| AuditSinkError::write(err.to_string()))?;
        Ok(())
    }
}
