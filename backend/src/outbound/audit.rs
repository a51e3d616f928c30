//! Audit sink that writes events to the structured log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::AuditEvent;
use crate::domain::ports::{AuditSink, AuditSinkError};

/// Emits each audit event as an `info` record on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditSinkError> {
        info!(
            target: "audit",
            actor_id = %event.actor_id,
            action = event.action.as_str(),
            entity_type = event.action.entity_type(),
            entity_id = %event.entity_id,
            occurred_at = %event.occurred_at.to_rfc3339(),
            details = %event.details,
            "audit event"
        );
        Ok(())
    }
}
