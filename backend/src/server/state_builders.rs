//! Builders wiring outbound adapters into the HTTP state.
//!
//! A database pool selects the Diesel repositories; without one every
//! repository port is served by a shared [`MemoryStore`].

use std::sync::Arc;

use mockable::Clock;

use cosign_backend::domain::ports::{
    AuditSink, BlobStorage, KycStatusProvider, LedgerRepository, PdfStamper,
    SignatureAssetRepository, SignatureImageCleaner, SignerDirectory, WorkflowRepository,
};
use cosign_backend::domain::{
    DocumentService, DocumentServiceDeps, SignatureAssetService, SigningSettings,
    VerificationService, WorkflowService, WorkflowServiceDeps,
};
use cosign_backend::inbound::http::state::{HttpState, HttpStatePorts};
use cosign_backend::outbound::audit::TracingAuditSink;
use cosign_backend::outbound::imaging::BlueInkCleaner;
use cosign_backend::outbound::memory::MemoryStore;
use cosign_backend::outbound::pdf::LopdfStamper;
use cosign_backend::outbound::persistence::{
    DbPool, DieselAuditSink, DieselLedgerRepository, DieselSignatureAssetRepository,
    DieselSignerDirectory, DieselWorkflowRepository,
};

/// Repository-shaped ports shared by every service.
#[derive(Clone)]
pub struct Persistence {
    pub workflows: Arc<dyn WorkflowRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub assets: Arc<dyn SignatureAssetRepository>,
    pub directory: Arc<dyn SignerDirectory>,
    pub kyc: Arc<dyn KycStatusProvider>,
    pub audit: Arc<dyn AuditSink>,
}

impl Persistence {
    /// PostgreSQL repositories over `pool`.
    pub fn diesel(pool: &DbPool) -> Self {
        let directory = Arc::new(DieselSignerDirectory::new(pool.clone()));
        Self {
            workflows: Arc::new(DieselWorkflowRepository::new(pool.clone())),
            ledger: Arc::new(DieselLedgerRepository::new(pool.clone())),
            assets: Arc::new(DieselSignatureAssetRepository::new(pool.clone())),
            directory: directory.clone(),
            kyc: directory,
            audit: Arc::new(DieselAuditSink::new(pool.clone())),
        }
    }

    /// In-process repositories; audit events go to the log.
    pub fn in_memory(store: &MemoryStore) -> Self {
        let store = Arc::new(store.clone());
        Self {
            workflows: store.clone(),
            ledger: store.clone(),
            assets: store.clone(),
            directory: store.clone(),
            kyc: store,
            audit: Arc::new(TracingAuditSink),
        }
    }
}

/// Everything besides persistence that the services need.
#[derive(Clone)]
pub struct Infrastructure {
    pub blobs: Arc<dyn BlobStorage>,
    pub clock: Arc<dyn Clock>,
    pub signing: SigningSettings,
}

/// Build the HTTP state from persistence and infrastructure adapters.
pub fn build_http_state(persistence: Persistence, infrastructure: Infrastructure) -> HttpState {
    let Persistence {
        workflows,
        ledger,
        assets,
        directory,
        kyc,
        audit,
    } = persistence;
    let Infrastructure {
        blobs,
        clock,
        signing,
    } = infrastructure;
    let stamper: Arc<dyn PdfStamper> = Arc::new(LopdfStamper::new());
    let cleaner: Arc<dyn SignatureImageCleaner> = Arc::new(BlueInkCleaner::new());
    let file_url_ttl = signing.signed_url_ttl;

    let documents = Arc::new(DocumentService::new(DocumentServiceDeps {
        workflows: workflows.clone(),
        ledger: ledger.clone(),
        storage: blobs.clone(),
        stamper: stamper.clone(),
        directory: directory.clone(),
        audit: audit.clone(),
        clock: clock.clone(),
        signed_url_ttl: signing.signed_url_ttl,
    }));
    let workflow = Arc::new(WorkflowService::new(WorkflowServiceDeps {
        workflows: workflows.clone(),
        assets: assets.clone(),
        storage: blobs.clone(),
        stamper,
        directory: directory.clone(),
        audit: audit.clone(),
        clock: clock.clone(),
        settings: signing,
    }));
    let signatures = Arc::new(SignatureAssetService::new(
        assets,
        blobs.clone(),
        cleaner,
        audit,
        clock,
    ));
    let verification = Arc::new(VerificationService::new(
        ledger,
        workflows,
        directory,
        kyc,
        blobs.clone(),
        file_url_ttl,
    ));

    HttpState::new(HttpStatePorts {
        documents: documents.clone(),
        documents_query: documents,
        workflow: workflow.clone(),
        workflow_query: workflow,
        signatures: signatures.clone(),
        signatures_query: signatures,
        verification,
        blobs,
    })
}
