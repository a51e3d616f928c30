//! Helpers shared by the document and workflow services.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::ports::{AuditSink, BlobStorage, Bucket, SignedUrl};
use crate::domain::service_errors::map_storage_read_error;
use crate::domain::{AuditEvent, Error, SigningError, UserId, WorkflowSnapshot};

/// Mint a URL for the document's latest artifact.
///
/// The signed bucket is always tried first. The original bucket is consulted
/// only while no round has completed; once one has, a miss in the signed
/// bucket means the artifact is gone rather than not yet produced.
pub(crate) async fn resolve_latest_file(
    storage: &dyn BlobStorage,
    snapshot: &WorkflowSnapshot,
    ttl: Duration,
) -> Result<SignedUrl, Error> {
    let key = snapshot.document.current_file_key.as_str();
    if let Some(url) = storage
        .signed_url(Bucket::Signed, key, ttl)
        .await
        .map_err(map_storage_read_error)?
    {
        return Ok(url);
    }
    if snapshot.chain.completed_count() > 0 {
        return Err(SigningError::FileUnavailable.into());
    }
    storage
        .signed_url(Bucket::Original, key, ttl)
        .await
        .map_err(map_storage_read_error)?
        .ok_or_else(|| SigningError::FileUnavailable.into())
}

/// Owner or assigned signer; everyone else is refused.
pub(crate) fn ensure_participant(
    snapshot: &WorkflowSnapshot,
    actor_id: &UserId,
) -> Result<(), Error> {
    if snapshot.document.is_owned_by(actor_id) || snapshot.chain.has_signer(actor_id) {
        Ok(())
    } else {
        Err(SigningError::forbidden("you are not a participant in this document").into())
    }
}

/// Write an audit event, logging and discarding any failure.
pub(crate) async fn emit_audit(audit: &Arc<dyn AuditSink>, event: AuditEvent) {
    let action = event.action.as_str();
    let entity_id = event.entity_id;
    if let Err(error) = audit.record(event).await {
        warn!(%error, action, %entity_id, "audit event dropped");
    }
}
