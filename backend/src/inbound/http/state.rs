//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    BlobStorage, DocumentCommand, DocumentQuery, FixtureDocumentService,
    FixtureSignatureAssetService, FixtureVerificationQuery, FixtureWorkflowService,
    SignatureAssetCommand, SignatureAssetQuery, VerificationQuery, WorkflowCommand, WorkflowQuery,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub documents: Arc<dyn DocumentCommand>,
    pub documents_query: Arc<dyn DocumentQuery>,
    pub workflow: Arc<dyn WorkflowCommand>,
    pub workflow_query: Arc<dyn WorkflowQuery>,
    pub signatures: Arc<dyn SignatureAssetCommand>,
    pub signatures_query: Arc<dyn SignatureAssetQuery>,
    pub verification: Arc<dyn VerificationQuery>,
    pub blobs: Arc<dyn BlobStorage>,
}

impl HttpStatePorts {
    /// Fixture ports for every use-case, serving blobs from `blobs`.
    ///
    /// Handler tests override the one port they exercise.
    pub fn fixtures(blobs: Arc<dyn BlobStorage>) -> Self {
        Self {
            documents: Arc::new(FixtureDocumentService),
            documents_query: Arc::new(FixtureDocumentService),
            workflow: Arc::new(FixtureWorkflowService),
            workflow_query: Arc::new(FixtureWorkflowService),
            signatures: Arc::new(FixtureSignatureAssetService),
            signatures_query: Arc::new(FixtureSignatureAssetService),
            verification: Arc::new(FixtureVerificationQuery),
            blobs,
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub documents: Arc<dyn DocumentCommand>,
    pub documents_query: Arc<dyn DocumentQuery>,
    pub workflow: Arc<dyn WorkflowCommand>,
    pub workflow_query: Arc<dyn WorkflowQuery>,
    pub signatures: Arc<dyn SignatureAssetCommand>,
    pub signatures_query: Arc<dyn SignatureAssetQuery>,
    pub verification: Arc<dyn VerificationQuery>,
    pub blobs: Arc<dyn BlobStorage>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use cosign_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use cosign_backend::outbound::storage::{MemoryBlobStorage, UrlSigner};
    /// use mockable::DefaultClock;
    ///
    /// let signer = UrlSigner::ephemeral(Arc::new(DefaultClock));
    /// let ports = HttpStatePorts::fixtures(Arc::new(MemoryBlobStorage::new(signer)));
    /// let state = HttpState::new(ports);
    /// let _verification = state.verification.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            documents,
            documents_query,
            workflow,
            workflow_query,
            signatures,
            signatures_query,
            verification,
            blobs,
        } = ports;
        Self {
            documents,
            documents_query,
            workflow,
            workflow_query,
            signatures,
            signatures_query,
            verification,
            blobs,
        }
    }
}
