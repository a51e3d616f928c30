//! Documents routed for signing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DocumentHash, DocumentId, UserId};

/// Lifecycle state of a document.
///
/// `InProgress` is accepted when reading stored rows but never written: an
/// open workflow stays `PendingSign` until it terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Uploaded, no workflow attached.
    Draft,
    /// Workflow attached, not every step completed.
    PendingSign,
    /// Legacy synonym of `PendingSign`.
    InProgress,
    /// Every step completed.
    Signed,
    /// A step was rejected.
    Rejected,
}

/// Error raised when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document status: {0}")]
pub struct UnknownDocumentStatus(pub String);

impl DocumentStatus {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingSign => "pending_sign",
            Self::InProgress => "in_progress",
            Self::Signed => "signed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether signers may still act on the document.
    #[must_use]
    pub const fn accepts_actions(self) -> bool {
        matches!(self, Self::PendingSign | Self::InProgress)
    }

    /// Whether no further transition can leave this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Rejected)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = UnknownDocumentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_sign" => Ok(Self::PendingSign),
            "in_progress" => Ok(Self::InProgress),
            "signed" => Ok(Self::Signed),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownDocumentStatus(other.to_owned())),
        }
    }
}

/// A document and the pointer to its most recent artifact.
///
/// `revision` increases by one on every committed mutation and is the
/// compare-and-set token for workflow commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifier.
    pub id: DocumentId,
    /// Human title.
    pub title: String,
    /// Registry number, if the owner assigned one.
    pub document_number: Option<String>,
    /// Uploader and workflow owner.
    pub owner_id: UserId,
    /// Free-form category label.
    pub category: Option<String>,
    /// Storage key of the latest artifact.
    pub current_file_key: String,
    /// Fingerprint of the uploaded original.
    pub original_hash: Option<DocumentHash>,
    /// Lifecycle state.
    pub status: DocumentStatus,
    /// Optimistic concurrency token.
    pub revision: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Whether `user_id` owns the document.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DocumentStatus::Draft)]
    #[case(DocumentStatus::PendingSign)]
    #[case(DocumentStatus::InProgress)]
    #[case(DocumentStatus::Signed)]
    #[case(DocumentStatus::Rejected)]
    fn status_parses_its_storage_form(#[case] status: DocumentStatus) {
        assert_eq!(status.as_str().parse::<DocumentStatus>(), Ok(status));
    }

    #[rstest]
    fn unknown_status_is_an_error() {
        assert!("archived".parse::<DocumentStatus>().is_err());
    }

    #[rstest]
    #[case(DocumentStatus::Draft, false, false)]
    #[case(DocumentStatus::PendingSign, true, false)]
    #[case(DocumentStatus::InProgress, true, false)]
    #[case(DocumentStatus::Signed, false, true)]
    #[case(DocumentStatus::Rejected, false, true)]
    fn open_and_terminal_states(
        #[case] status: DocumentStatus,
        #[case] open: bool,
        #[case] terminal: bool,
    ) {
        assert_eq!(status.accepts_actions(), open);
        assert_eq!(status.is_terminal(), terminal);
    }
}
