//! Port for the append-only signing ledger.
//!
//! No update or delete operations exist. Completion and rejection commits
//! append their entry through [`super::WorkflowRepository`] so that the entry
//! and the step transition land together; `append` serves standalone writes.

use async_trait::async_trait;

use crate::domain::{DocumentId, LedgerEntry, VerificationCode};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger adapters.
    pub enum LedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "ledger connection failed: {message}",
        /// Query or insert failed during execution.
        Query { message: String } =>
            "ledger query failed: {message}",
        /// An entry with the same verification code already exists.
        DuplicateCode =>
            "verification code already recorded",
    }
}

/// Port for appending and reading ledger entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerRepositoryError>;

    /// Entries for a document, oldest first.
    async fn list_by_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError>;

    /// Resolve the entry a verification code was issued for.
    async fn find_by_verification_code(
        &self,
        code: &VerificationCode,
    ) -> Result<Option<LedgerEntry>, LedgerRepositoryError>;
}
