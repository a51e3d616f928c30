//! Shared harness for the workflow integration tests.
//!
//! Wires the real services over the in-memory repositories, the in-memory
//! blob store and the lopdf stamper. Time comes from a [`FixedClock`] that the
//! harness advances between actions so ledger ordering is deterministic.

use std::sync::Arc;
use std::time::Duration;

use cosign_backend::domain::ports::{
    BlobStorage, CreateDraftRequest, CreateWorkflowRequest, DocumentCommand, DocumentQuery, DocumentTimeline,
    RejectOutcome, RejectStepRequest, SignOutcome, SignStepRequest, SignatureAssetCommand,
    UploadSignatureRequest, WorkflowCommand,
};
use cosign_backend::domain::{
    Document, DocumentService, DocumentServiceDeps, Error, Placement, RequiredAction,
    SignatureAssetService, SignerAssignment, SignerProfile, SigningSettings, StepId, UserId,
    VerificationService, WorkflowService, WorkflowServiceDeps, WorkflowStep,
};
use cosign_backend::outbound::imaging::BlueInkCleaner;
use cosign_backend::outbound::memory::MemoryStore;
use cosign_backend::outbound::pdf::LopdfStamper;
use cosign_backend::outbound::storage::{MemoryBlobStorage, UrlSigner};
use cosign_backend::test_support::{FixedClock, sample_pdf, sample_signature_png};

/// Every service over one shared in-memory store.
pub struct Harness {
    pub store: MemoryStore,
    pub blobs: Arc<MemoryBlobStorage>,
    pub clock: Arc<FixedClock>,
    pub documents: DocumentService,
    pub workflow: WorkflowService,
    pub signatures: SignatureAssetService,
    pub verification: VerificationService,
}

impl Harness {
    /// Fresh services starting at 2026-03-02 09:15 UTC.
    pub fn new() -> Self {
        Self::with_storage(|blobs| blobs as Arc<dyn BlobStorage>)
    }

    /// Like [`Harness::new`], but the services see the store through `wrap`.
    ///
    /// `blobs` stays the raw in-memory store so assertions bypass the wrapper.
    pub fn with_storage(
        wrap: impl FnOnce(Arc<MemoryBlobStorage>) -> Arc<dyn BlobStorage>,
    ) -> Self {
        let clock = Arc::new(FixedClock::at_millis(1_772_442_900_000));
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let blobs = Arc::new(MemoryBlobStorage::new(UrlSigner::new(
            b"integration secret".to_vec(),
            clock.clone(),
        )));
        let storage = wrap(blobs.clone());
        let stamper = Arc::new(LopdfStamper::new());
        let ttl = Duration::from_secs(300);

        let documents = DocumentService::new(DocumentServiceDeps {
            workflows: shared.clone(),
            ledger: shared.clone(),
            storage: storage.clone(),
            stamper: stamper.clone(),
            directory: shared.clone(),
            audit: shared.clone(),
            clock: clock.clone(),
            signed_url_ttl: ttl,
        });
        let workflow = WorkflowService::new(WorkflowServiceDeps {
            workflows: shared.clone(),
            assets: shared.clone(),
            storage: storage.clone(),
            stamper,
            directory: shared.clone(),
            audit: shared.clone(),
            clock: clock.clone(),
            settings: SigningSettings {
                public_base_url: "https://sign.example.org".to_owned(),
                signed_url_ttl: ttl,
            },
        });
        let signatures = SignatureAssetService::new(
            shared.clone(),
            storage.clone(),
            Arc::new(BlueInkCleaner::new()),
            shared.clone(),
            clock.clone(),
        );
        let verification = VerificationService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            shared,
            storage,
            ttl,
        );

        Self {
            store,
            blobs,
            clock,
            documents,
            workflow,
            signatures,
            verification,
        }
    }

    /// A user with a directory profile but no signature image.
    pub async fn user(&self, full_name: &str, position: &str) -> UserId {
        let user_id = UserId::random();
        self.store
            .upsert_profile(SignerProfile {
                user_id,
                full_name: full_name.to_owned(),
                position: Some(position.to_owned()),
                department: Some("Finance".to_owned()),
            })
            .await;
        user_id
    }

    /// A user ready to sign: profile plus an active signature image.
    pub async fn signer(&self, full_name: &str) -> UserId {
        let user_id = self.user(full_name, "Director").await;
        self.signatures
            .upload_signature(UploadSignatureRequest {
                owner_id: user_id,
                image: sample_signature_png().expect("signature png"),
                remove_background: false,
            })
            .await
            .expect("signature uploaded");
        user_id
    }

    /// Upload a two-page draft.
    pub async fn draft(&self, owner: UserId) -> Document {
        self.documents
            .create_draft(CreateDraftRequest {
                owner_id: owner,
                title: "Annual budget".to_owned(),
                document_number: Some("FIN-2026-014".to_owned()),
                category: Some("finance".to_owned()),
                pdf: sample_pdf(2).expect("sample pdf"),
            })
            .await
            .expect("draft created")
    }

    /// Upload a draft and route it through `signers` in order.
    pub async fn routed(
        &self,
        owner: UserId,
        signers: &[(UserId, RequiredAction)],
    ) -> (Document, Vec<WorkflowStep>) {
        let document = self.draft(owner).await;
        let steps = self
            .workflow
            .create_workflow(CreateWorkflowRequest {
                document_id: document.id,
                owner_id: owner,
                signers: signers
                    .iter()
                    .map(|&(signer_id, action)| SignerAssignment { signer_id, action })
                    .collect(),
            })
            .await
            .expect("workflow created");
        (document, steps)
    }

    /// Sign `step_id` as `actor` near the top of the first page.
    pub async fn sign(&self, actor: UserId, step_id: StepId) -> Result<SignOutcome, Error> {
        self.clock.advance(Duration::from_secs(60));
        let placement = Placement::new(0, 300.0, 200.0, 1.0).expect("valid placement");
        self.workflow
            .sign_step(SignStepRequest {
                actor_id: actor,
                step_id,
                placement,
            })
            .await
    }

    /// Reject `step_id` as `actor`.
    pub async fn reject(
        &self,
        actor: UserId,
        step_id: StepId,
        reason: &str,
    ) -> Result<RejectOutcome, Error> {
        self.clock.advance(Duration::from_secs(60));
        self.workflow
            .reject_step(RejectStepRequest {
                actor_id: actor,
                step_id,
                reason: reason.to_owned(),
            })
            .await
    }

    /// The owner's view of steps and ledger.
    pub async fn timeline(&self, owner: UserId, document: &Document) -> DocumentTimeline {
        self.documents
            .timeline(&owner, &document.id)
            .await
            .expect("timeline readable")
    }

    /// Bytes of the document's current file as served to the owner.
    pub async fn latest_bytes(&self, owner: UserId, document: &Document) -> Vec<u8> {
        let link = self
            .documents
            .open_latest_file(&owner, &document.id)
            .await
            .expect("file link");
        self.blobs.fetch(&link).await.expect("file readable")
    }
}
