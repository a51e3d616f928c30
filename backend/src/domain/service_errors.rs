//! Port error translation shared by the domain services.

use crate::domain::ports::{
    BlobStorageError, DirectoryError, LedgerRepositoryError, PdfStampError,
    SignatureAssetRepositoryError, SignatureImageError, WorkflowRepositoryError,
};
use crate::domain::{CommitConflict, Error, SigningError, TransitionError};

pub(crate) fn map_workflow_error(error: WorkflowRepositoryError) -> Error {
    match error {
        WorkflowRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("workflow repository unavailable: {message}"))
        }
        WorkflowRepositoryError::Query { message } => {
            Error::internal(format!("workflow repository error: {message}"))
        }
        WorkflowRepositoryError::Conflict { reason } => map_commit_conflict(reason).into(),
        WorkflowRepositoryError::DocumentMissing { document_id } => {
            SigningError::not_found(format!("document {document_id} not found")).into()
        }
    }
}

/// Commit-time refusals. An out-of-turn completion reports the blocking
/// signers by id here; callers that know the names re-check eligibility
/// before committing, so this path is only reached by a lost race.
fn map_commit_conflict(reason: CommitConflict) -> SigningError {
    match reason {
        CommitConflict::RevisionMismatch { .. } => SigningError::Conflict,
        CommitConflict::InvalidDocumentState { status } => SigningError::DocumentClosed { status },
        CommitConflict::Transition(TransitionError::OutOfSequence { blocking_signers }) => {
            SigningError::OutOfSequence {
                blocking_signers: blocking_signers.iter().map(ToString::to_string).collect(),
            }
        }
        CommitConflict::Transition(TransitionError::NotPending { status }) => {
            SigningError::Validation {
                message: format!("step is already {status}"),
                field: None,
            }
        }
        CommitConflict::Transition(TransitionError::UnknownStep { step_id }) => {
            SigningError::not_found(format!("step {step_id} not found"))
        }
        CommitConflict::InvalidChain(err) => SigningError::Validation {
            message: err.to_string(),
            field: Some("signers"),
        },
    }
}

pub(crate) fn map_ledger_error(error: LedgerRepositoryError) -> Error {
    match error {
        LedgerRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("ledger unavailable: {message}"))
        }
        LedgerRepositoryError::Query { message } => {
            Error::internal(format!("ledger error: {message}"))
        }
        LedgerRepositoryError::DuplicateCode => Error::internal("verification code collision"),
    }
}

pub(crate) fn map_directory_error(error: DirectoryError) -> Error {
    match error {
        DirectoryError::Connection { message } => {
            Error::service_unavailable(format!("directory unavailable: {message}"))
        }
        DirectoryError::Query { message } => Error::internal(format!("directory error: {message}")),
    }
}

pub(crate) fn map_asset_error(error: SignatureAssetRepositoryError) -> Error {
    match error {
        SignatureAssetRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("signature store unavailable: {message}"))
        }
        SignatureAssetRepositoryError::Query { message } => {
            Error::internal(format!("signature store error: {message}"))
        }
    }
}

/// Storage failures on the read path surface as an unavailable file; the
/// write path reports the backend state instead.
pub(crate) fn map_storage_read_error(error: BlobStorageError) -> Error {
    match error {
        BlobStorageError::Connection { message } => {
            Error::service_unavailable(format!("blob storage unavailable: {message}"))
        }
        BlobStorageError::Io { .. }
        | BlobStorageError::InvalidKey { .. }
        | BlobStorageError::Expired
        | BlobStorageError::InvalidToken
        | BlobStorageError::NotFound { .. } => SigningError::FileUnavailable.into(),
    }
}

pub(crate) fn map_storage_write_error(error: BlobStorageError) -> Error {
    match error {
        BlobStorageError::Connection { message } => {
            Error::service_unavailable(format!("blob storage unavailable: {message}"))
        }
        other => Error::internal(format!("blob storage write failed: {other}")),
    }
}

pub(crate) fn map_stamp_error(error: PdfStampError) -> Error {
    match error {
        PdfStampError::CorruptDocument { message } => {
            SigningError::CorruptDocument { message }.into()
        }
        PdfStampError::PageOutOfRange { .. } => {
            SigningError::validation("pageIndex", error.to_string()).into()
        }
        PdfStampError::Render { message } => SigningError::Render { message }.into(),
    }
}

pub(crate) fn map_image_error(error: SignatureImageError) -> Error {
    match error {
        SignatureImageError::Decode { .. } => {
            SigningError::validation("image", error.to_string()).into()
        }
        SignatureImageError::Encode { message } => {
            Error::internal(format!("signature image encoding failed: {message}"))
        }
    }
}

pub(crate) fn map_join_error(error: tokio::task::JoinError) -> Error {
    Error::internal(format!("blocking task failed: {error}"))
}
