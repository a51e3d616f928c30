//! Port for the audit trail. Writes are fire-and-forget from the caller's
//! point of view: services log failures and carry on.

use async_trait::async_trait;

use crate::domain::AuditEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised by audit adapters.
    pub enum AuditSinkError {
        /// The event could not be written.
        Write { message: String } => "audit write failed: {message}",
    }
}

/// Port for recording audit events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one event.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditSinkError>;
}
