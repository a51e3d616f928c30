//! Audit trail events emitted by workflow actions.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::UserId;

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Draft uploaded.
    DocumentCreate,
    /// Workflow attached.
    DocumentSend,
    /// Step completed.
    DocumentSign,
    /// Step rejected.
    DocumentReject,
    /// Signature image replaced.
    SignatureUpload,
}

impl AuditAction {
    /// Stored action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DocumentCreate => "document.create",
            Self::DocumentSend => "document.send",
            Self::DocumentSign => "document.sign",
            Self::DocumentReject => "document.reject",
            Self::SignatureUpload => "signature.upload",
        }
    }

    /// Entity type the action applies to.
    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::SignatureUpload => "user_signature",
            Self::DocumentCreate
            | Self::DocumentSend
            | Self::DocumentSign
            | Self::DocumentReject => "document",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Acting user.
    pub actor_id: UserId,
    /// What happened.
    pub action: AuditAction,
    /// Affected entity.
    pub entity_id: Uuid,
    /// Action-specific context.
    pub details: Value,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}
