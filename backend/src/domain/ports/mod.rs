//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, storage, stamping, directory, audit) are
//! implemented in `outbound`; driving ports (commands and queries) are
//! implemented by the domain services and consumed by `inbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_sink;
mod blob_storage;
mod document_command;
mod ledger_repository;
mod pdf_stamper;
mod signature_asset_command;
mod signature_asset_repository;
mod signature_image_cleaner;
mod signer_directory;
mod verification_query;
mod workflow_command;
mod workflow_repository;

#[cfg(test)]
pub use audit_sink::MockAuditSink;
pub use audit_sink::{AuditSink, AuditSinkError};
#[cfg(test)]
pub use blob_storage::MockBlobStorage;
pub use blob_storage::{BlobStorage, BlobStorageError, Bucket, SignedUrl, UnknownBucket};
#[cfg(test)]
pub use document_command::{MockDocumentCommand, MockDocumentQuery};
pub use document_command::{
    CreateDraftRequest, DocumentCommand, DocumentQuery, DocumentTimeline, FixtureDocumentService,
    TimelineEntry, TimelineStep,
};
#[cfg(test)]
pub use ledger_repository::MockLedgerRepository;
pub use ledger_repository::{LedgerRepository, LedgerRepositoryError};
#[cfg(test)]
pub use pdf_stamper::MockPdfStamper;
pub use pdf_stamper::{PdfStampError, PdfStamper, StampRequest, StampedPdf};
#[cfg(test)]
pub use signature_asset_command::{MockSignatureAssetCommand, MockSignatureAssetQuery};
pub use signature_asset_command::{
    FixtureSignatureAssetService, SignatureAssetCommand, SignatureAssetQuery,
    UploadSignatureRequest,
};
#[cfg(test)]
pub use signature_asset_repository::MockSignatureAssetRepository;
pub use signature_asset_repository::{SignatureAssetRepository, SignatureAssetRepositoryError};
#[cfg(test)]
pub use signature_image_cleaner::MockSignatureImageCleaner;
pub use signature_image_cleaner::{SignatureImageCleaner, SignatureImageError};
#[cfg(test)]
pub use signer_directory::{MockKycStatusProvider, MockSignerDirectory};
pub use signer_directory::{DirectoryError, KycStatusProvider, SignerDirectory};
#[cfg(test)]
pub use verification_query::MockVerificationQuery;
pub use verification_query::{FixtureVerificationQuery, VerificationQuery};
#[cfg(test)]
pub use workflow_command::{MockWorkflowCommand, MockWorkflowQuery};
pub use workflow_command::{
    CreateWorkflowRequest, FixtureWorkflowService, RejectOutcome, RejectStepRequest,
    SignOutcome, SignStepRequest, SigningTask, StepEligibility, WorkflowCommand, WorkflowQuery,
};
#[cfg(test)]
pub use workflow_repository::MockWorkflowRepository;
pub use workflow_repository::{WorkflowRepository, WorkflowRepositoryError};
