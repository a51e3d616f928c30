//! Port for documents and their step chains.
//!
//! Every commit method is all-or-nothing: adapters lock the document, apply
//! the shared rules from [`crate::domain::workflow`] against the locked state
//! and persist the outcome in one unit. A stale `expected_revision` or an
//! out-of-turn completion surfaces as [`WorkflowRepositoryError::Conflict`]
//! and writes nothing.

use async_trait::async_trait;

use crate::domain::{
    AttachWorkflow, CommitConflict, CompletionCommit, Document, DocumentId, RejectionCommit,
    StepId, UserId, WorkflowSnapshot,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by workflow repository adapters.
    pub enum WorkflowRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "workflow repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "workflow repository query failed: {message}",
        /// The commit was refused against the locked state.
        Conflict { reason: CommitConflict } =>
            "workflow commit refused: {reason}",
        /// The addressed document does not exist.
        DocumentMissing { document_id: DocumentId } =>
            "document {document_id} does not exist",
    }
}

impl From<CommitConflict> for WorkflowRepositoryError {
    fn from(reason: CommitConflict) -> Self {
        Self::Conflict { reason }
    }
}

/// Port for reading and committing workflow state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Persist a new draft document.
    async fn insert_document(&self, document: &Document) -> Result<(), WorkflowRepositoryError>;

    /// Load a document with all its steps.
    async fn load(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<WorkflowSnapshot>, WorkflowRepositoryError>;

    /// Resolve the document owning a step.
    async fn find_document_for_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<DocumentId>, WorkflowRepositoryError>;

    /// Attach a chain to a draft and move it to `pending_sign`.
    async fn attach_workflow(
        &self,
        commit: AttachWorkflow,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError>;

    /// Append the ledger entry, complete the step and advance the document.
    async fn commit_completion(
        &self,
        commit: CompletionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError>;

    /// Append the rejection entry, cascade, and terminate the document.
    async fn commit_rejection(
        &self,
        commit: RejectionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError>;

    /// Every document on which the user holds a step.
    async fn list_for_signer(
        &self,
        signer_id: &UserId,
    ) -> Result<Vec<WorkflowSnapshot>, WorkflowRepositoryError>;
}
