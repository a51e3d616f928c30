//! Domain primitives, aggregates, ports and services.
//!
//! Purpose: model the sequential co-signing workflow independently of any
//! transport or storage. Types here enforce the workflow invariants (dense
//! step ordering, single signer per step, cascade on rejection, append-only
//! ledger); adapters in `outbound` and `inbound` only move data across the
//! boundary.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic error envelope.
//! - SigningError: workflow failure taxonomy converted into `Error`.
//! - Document, WorkflowStep, StepChain, LedgerEntry, SignatureAsset: state.
//! - VerificationView: public reconstruction of a document's history.
//! - Services implementing the driving ports in `ports`.

pub mod audit;
pub mod document;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod placement;
pub mod ports;
pub mod signature_asset;
pub mod signing_error;
pub mod trace_id;
pub mod user;
pub mod verification;
pub mod workflow;

mod document_service;
mod service_errors;
mod service_support;
#[cfg(test)]
pub(crate) mod service_test_helpers;
mod signature_asset_service;
mod verification_service;
mod workflow_service;

pub use self::audit::{AuditAction, AuditEvent};
pub use self::document::{Document, DocumentStatus, UnknownDocumentStatus};
pub use self::document_service::{DocumentService, DocumentServiceDeps};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::ids::{DocumentId, LedgerEntryId, SignatureAssetId, StepId};
pub use self::ledger::{
    DocumentHash, InvalidDocumentHash, LedgerAction, LedgerEntry, MalformedVerificationCode,
    UnknownLedgerAction, VerificationCode, sort_ledger,
};
pub use self::placement::{PageBox, PdfPoint, Placement, PlacementError};
pub use self::signature_asset::{CleanedSignature, SignatureAsset};
pub use self::signature_asset_service::SignatureAssetService;
pub use self::signing_error::SigningError;
pub use self::trace_id::TraceId;
pub use self::user::{KycStatus, SignerProfile, SignerSnapshot, UserId, UserIdError};
pub use self::verification::{
    AggregateStatus, HashCheck, MatchedRound, VerificationInput, VerificationView, VerifiedRound,
    VerifiedStep,
};
pub use self::verification_service::VerificationService;
pub use self::workflow::{
    AttachWorkflow, CommitConflict, CommitOutcome, CompletionCommit, Eligibility,
    InvalidStepOrder, RejectionCommit, RequiredAction, SignerAssignment, StepChain,
    StepChainError, StepOrder, StepStatus, TransitionError, UnknownRequiredAction,
    UnknownStepStatus, WorkflowPlan, WorkflowPlanError, WorkflowSnapshot, WorkflowStep,
    apply_attachment, apply_completion, apply_rejection,
};
pub use self::workflow_service::{SigningSettings, WorkflowService, WorkflowServiceDeps};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use cosign_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
