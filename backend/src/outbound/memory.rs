//! In-process adapters for local runs and behavioural tests.
//!
//! One mutex guards every table, so each commit observes and mutates a
//! consistent state exactly as the PostgreSQL adapter does inside its
//! row-locking transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::ports::{
    AuditSink, AuditSinkError, DirectoryError, KycStatusProvider, LedgerRepository,
    LedgerRepositoryError, SignatureAssetRepository, SignatureAssetRepositoryError,
    SignerDirectory, WorkflowRepository, WorkflowRepositoryError,
};
use crate::domain::{
    AttachWorkflow, AuditEvent, CommitOutcome, CompletionCommit, Document, DocumentId, KycStatus,
    LedgerEntry, RejectionCommit, SignatureAsset, SignerProfile, StepChain, StepId, UserId,
    VerificationCode, WorkflowSnapshot, apply_attachment, apply_completion, apply_rejection,
    sort_ledger,
};

#[derive(Debug, Default)]
struct Tables {
    documents: HashMap<DocumentId, WorkflowSnapshot>,
    step_index: HashMap<StepId, DocumentId>,
    ledger: Vec<LedgerEntry>,
    assets: Vec<SignatureAsset>,
    profiles: HashMap<UserId, SignerProfile>,
    kyc: HashMap<UserId, KycStatus>,
    audit: Vec<AuditEvent>,
}

impl Tables {
    fn locked_snapshot(
        &self,
        document_id: &DocumentId,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        self.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| WorkflowRepositoryError::document_missing(*document_id))
    }

    fn code_taken(&self, code: &VerificationCode) -> bool {
        self.ledger
            .iter()
            .any(|entry| &entry.verification_code == code)
    }

    fn store(&mut self, outcome: CommitOutcome) -> WorkflowSnapshot {
        let CommitOutcome {
            snapshot,
            changed_steps,
        } = outcome;
        for step_id in changed_steps {
            self.step_index.insert(step_id, snapshot.document.id);
        }
        self.documents
            .insert(snapshot.document.id, snapshot.clone());
        snapshot
    }

    fn append_checked(&mut self, entry: LedgerEntry) -> Result<(), WorkflowRepositoryError> {
        if self.code_taken(&entry.verification_code) {
            return Err(WorkflowRepositoryError::query(
                "verification code already recorded",
            ));
        }
        self.ledger.push(entry);
        Ok(())
    }
}

/// Shared in-memory state implementing every persistence port.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a directory profile.
    pub async fn upsert_profile(&self, profile: SignerProfile) {
        self.tables
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    /// Record the identity-assurance status for a user.
    pub async fn set_kyc_status(&self, user_id: UserId, status: KycStatus) {
        self.tables.lock().await.kyc.insert(user_id, status);
    }

    /// Audit events recorded so far, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.tables.lock().await.audit.clone()
    }
}

#[async_trait]
impl WorkflowRepository for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<(), WorkflowRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.documents.contains_key(&document.id) {
            return Err(WorkflowRepositoryError::query(format!(
                "document {} already exists",
                document.id
            )));
        }
        tables.documents.insert(
            document.id,
            WorkflowSnapshot {
                document: document.clone(),
                chain: StepChain::default(),
            },
        );
        Ok(())
    }

    async fn load(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<WorkflowSnapshot>, WorkflowRepositoryError> {
        Ok(self.tables.lock().await.documents.get(document_id).cloned())
    }

    async fn find_document_for_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<DocumentId>, WorkflowRepositoryError> {
        Ok(self.tables.lock().await.step_index.get(step_id).copied())
    }

    async fn attach_workflow(
        &self,
        commit: AttachWorkflow,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut tables = self.tables.lock().await;
        let snapshot = tables.locked_snapshot(&commit.document_id)?;
        let outcome = apply_attachment(snapshot, commit)?;
        Ok(tables.store(outcome))
    }

    async fn commit_completion(
        &self,
        commit: CompletionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut tables = self.tables.lock().await;
        let snapshot = tables.locked_snapshot(&commit.document_id)?;
        let outcome = apply_completion(snapshot, &commit)?;
        tables.append_checked(commit.entry)?;
        debug!(document_id = %commit.document_id, step_id = %commit.step_id, "completion stored");
        Ok(tables.store(outcome))
    }

    async fn commit_rejection(
        &self,
        commit: RejectionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut tables = self.tables.lock().await;
        let snapshot = tables.locked_snapshot(&commit.document_id)?;
        let outcome = apply_rejection(snapshot, &commit)?;
        tables.append_checked(commit.entry)?;
        debug!(document_id = %commit.document_id, step_id = %commit.step_id, "rejection stored");
        Ok(tables.store(outcome))
    }

    async fn list_for_signer(
        &self,
        signer_id: &UserId,
    ) -> Result<Vec<WorkflowSnapshot>, WorkflowRepositoryError> {
        Ok(self
            .tables
            .lock()
            .await
            .documents
            .values()
            .filter(|snapshot| snapshot.chain.has_signer(signer_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerRepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.code_taken(&entry.verification_code) {
            return Err(LedgerRepositoryError::duplicate_code());
        }
        tables.ledger.push(entry.clone());
        Ok(())
    }

    async fn list_by_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<LedgerEntry>, LedgerRepositoryError> {
        let mut entries: Vec<_> = self
            .tables
            .lock()
            .await
            .ledger
            .iter()
            .filter(|entry| &entry.document_id == document_id)
            .cloned()
            .collect();
        sort_ledger(&mut entries);
        Ok(entries)
    }

    async fn find_by_verification_code(
        &self,
        code: &VerificationCode,
    ) -> Result<Option<LedgerEntry>, LedgerRepositoryError> {
        Ok(self
            .tables
            .lock()
            .await
            .ledger
            .iter()
            .find(|entry| &entry.verification_code == code)
            .cloned())
    }
}

#[async_trait]
impl SignatureAssetRepository for MemoryStore {
    async fn activate(&self, asset: &SignatureAsset) -> Result<(), SignatureAssetRepositoryError> {
        let mut tables = self.tables.lock().await;
        for existing in tables
            .assets
            .iter_mut()
            .filter(|existing| existing.owner_id == asset.owner_id)
        {
            existing.is_active = false;
        }
        tables.assets.push(SignatureAsset {
            is_active: true,
            ..asset.clone()
        });
        Ok(())
    }

    async fn find_active(
        &self,
        owner_id: &UserId,
    ) -> Result<Option<SignatureAsset>, SignatureAssetRepositoryError> {
        Ok(self
            .tables
            .lock()
            .await
            .assets
            .iter()
            .find(|asset| &asset.owner_id == owner_id && asset.is_active)
            .cloned())
    }
}

#[async_trait]
impl SignerDirectory for MemoryStore {
    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SignerProfile>, DirectoryError> {
        Ok(self.tables.lock().await.profiles.get(user_id).cloned())
    }

    async fn find_profiles(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, SignerProfile>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).map(|profile| (*id, profile.clone())))
            .collect())
    }
}

#[async_trait]
impl KycStatusProvider for MemoryStore {
    async fn statuses(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, KycStatus>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.kyc.get(id).map(|status| (*id, *status)))
            .collect())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditSinkError> {
        self.tables.lock().await.audit.push(event);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
