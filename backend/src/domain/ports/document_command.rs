//! Driving ports for the owner side of a document: drafts, file access and
//! the timeline.

use async_trait::async_trait;

use crate::domain::{Document, DocumentId, Error, LedgerEntry, UserId, WorkflowStep};

use super::SignedUrl;

/// Request to upload a new draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDraftRequest {
    /// Uploading user, who becomes the owner.
    pub owner_id: UserId,
    /// Display title.
    pub title: String,
    /// Registry number.
    pub document_number: Option<String>,
    /// Free-form category.
    pub category: Option<String>,
    /// PDF bytes.
    pub pdf: Vec<u8>,
}

/// A step with its signer's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineStep {
    /// The step.
    pub step: WorkflowStep,
    /// Signer display name.
    pub signer_name: String,
}

/// A ledger entry with its signer's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// The entry.
    pub entry: LedgerEntry,
    /// Signer display name.
    pub signer_name: String,
}

/// The "who signed" view of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTimeline {
    /// The document.
    pub document: Document,
    /// Steps in order.
    pub steps: Vec<TimelineStep>,
    /// Ledger entries, oldest first.
    pub entries: Vec<TimelineEntry>,
}

/// Driving port for document mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentCommand: Send + Sync {
    /// Store the original and create a `draft`.
    async fn create_draft(&self, request: CreateDraftRequest) -> Result<Document, Error>;
}

/// Driving port for document reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentQuery: Send + Sync {
    /// A fresh short-lived URL for the latest artifact.
    async fn open_latest_file(
        &self,
        actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<SignedUrl, Error>;

    /// Steps and ledger entries of a document.
    async fn timeline(
        &self,
        actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<DocumentTimeline, Error>;
}

/// Fixture implementation for handler tests that do not touch documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDocumentService;

#[async_trait]
impl DocumentCommand for FixtureDocumentService {
    async fn create_draft(&self, _request: CreateDraftRequest) -> Result<Document, Error> {
        Err(Error::service_unavailable("document storage is not configured"))
    }
}

#[async_trait]
impl DocumentQuery for FixtureDocumentService {
    async fn open_latest_file(
        &self,
        _actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<SignedUrl, Error> {
        Err(Error::not_found(format!("document {document_id} not found")))
    }

    async fn timeline(
        &self,
        _actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<DocumentTimeline, Error> {
        Err(Error::not_found(format!("document {document_id} not found")))
    }
}
