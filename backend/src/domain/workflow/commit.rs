//! Commit rules shared by every workflow repository adapter.
//!
//! Adapters load the locked document and its steps, hand them to these
//! functions together with the caller's expected revision, and persist the
//! returned snapshot. Keeping the rules here means the in-memory and
//! PostgreSQL adapters cannot drift on ordering or cascade semantics.

use chrono::{DateTime, Utc};

use crate::domain::{Document, DocumentId, DocumentStatus, LedgerEntry, StepId};

use super::{StepChain, StepChainError, TransitionError, WorkflowStep};

/// A document together with its full step chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    /// The document row.
    pub document: Document,
    /// Its steps in order.
    pub chain: StepChain,
}

/// Attach a freshly planned chain to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachWorkflow {
    /// Target document.
    pub document_id: DocumentId,
    /// Revision the caller observed.
    pub expected_revision: i64,
    /// Pending steps numbered from 1.
    pub steps: Vec<WorkflowStep>,
    /// Commit time.
    pub attached_at: DateTime<Utc>,
}

/// Complete one step with its freshly stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCommit {
    /// Target document.
    pub document_id: DocumentId,
    /// Revision the caller stamped against.
    pub expected_revision: i64,
    /// Step being completed.
    pub step_id: StepId,
    /// Ledger entry to append.
    pub entry: LedgerEntry,
    /// Storage key of the new artifact.
    pub new_file_key: String,
}

/// Reject one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionCommit {
    /// Target document.
    pub document_id: DocumentId,
    /// Revision the caller observed.
    pub expected_revision: i64,
    /// Step being rejected.
    pub step_id: StepId,
    /// Ledger entry to append.
    pub entry: LedgerEntry,
}

/// Why a commit was refused against the locked state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitConflict {
    /// Another action committed first.
    #[error("document revision changed (expected {expected}, found {actual})")]
    RevisionMismatch {
        /// Revision the caller observed.
        expected: i64,
        /// Revision found under lock.
        actual: i64,
    },
    /// The document is not in a state that permits this action.
    #[error("document is {status}")]
    InvalidDocumentState {
        /// Status found under lock.
        status: DocumentStatus,
    },
    /// The step transition itself was refused.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// The planned steps do not form a valid chain.
    #[error(transparent)]
    InvalidChain(#[from] StepChainError),
}

/// The state to persist after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Updated document and chain.
    pub snapshot: WorkflowSnapshot,
    /// Steps whose rows must be written.
    pub changed_steps: Vec<StepId>,
}

fn check_revision(document: &Document, expected: i64) -> Result<(), CommitConflict> {
    if document.revision == expected {
        Ok(())
    } else {
        Err(CommitConflict::RevisionMismatch {
            expected,
            actual: document.revision,
        })
    }
}

fn bump(document: &mut Document, at: DateTime<Utc>) {
    document.revision = document.revision.saturating_add(1);
    document.updated_at = at;
}

/// Attach steps to a draft and move it to `pending_sign`.
pub fn apply_attachment(
    snapshot: WorkflowSnapshot,
    commit: AttachWorkflow,
) -> Result<CommitOutcome, CommitConflict> {
    let WorkflowSnapshot { mut document, chain } = snapshot;
    check_revision(&document, commit.expected_revision)?;
    if document.status != DocumentStatus::Draft || !chain.is_empty() {
        return Err(CommitConflict::InvalidDocumentState {
            status: document.status,
        });
    }
    let chain = StepChain::new(commit.steps)?;
    let changed_steps = chain.steps().iter().map(|step| step.id).collect();
    document.status = DocumentStatus::PendingSign;
    bump(&mut document, commit.attached_at);
    Ok(CommitOutcome {
        snapshot: WorkflowSnapshot { document, chain },
        changed_steps,
    })
}

/// Complete a step, advance the file pointer and derive the new status.
pub fn apply_completion(
    snapshot: WorkflowSnapshot,
    commit: &CompletionCommit,
) -> Result<CommitOutcome, CommitConflict> {
    let WorkflowSnapshot {
        mut document,
        mut chain,
    } = snapshot;
    check_revision(&document, commit.expected_revision)?;
    if !document.status.accepts_actions() {
        return Err(CommitConflict::InvalidDocumentState {
            status: document.status,
        });
    }
    chain.complete(&commit.step_id, commit.entry.id, commit.entry.signed_at)?;
    document.current_file_key.clone_from(&commit.new_file_key);
    document.status = chain.document_status();
    bump(&mut document, commit.entry.signed_at);
    Ok(CommitOutcome {
        snapshot: WorkflowSnapshot { document, chain },
        changed_steps: vec![commit.step_id],
    })
}

/// Reject a step, cascade, and terminate the document.
pub fn apply_rejection(
    snapshot: WorkflowSnapshot,
    commit: &RejectionCommit,
) -> Result<CommitOutcome, CommitConflict> {
    let WorkflowSnapshot {
        mut document,
        mut chain,
    } = snapshot;
    check_revision(&document, commit.expected_revision)?;
    if !document.status.accepts_actions() {
        return Err(CommitConflict::InvalidDocumentState {
            status: document.status,
        });
    }
    let mut changed_steps = vec![commit.step_id];
    changed_steps.extend(chain.reject(&commit.step_id, commit.entry.signed_at)?);
    document.status = chain.document_status();
    bump(&mut document, commit.entry.signed_at);
    Ok(CommitOutcome {
        snapshot: WorkflowSnapshot { document, chain },
        changed_steps,
    })
}
