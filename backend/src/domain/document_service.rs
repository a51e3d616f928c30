//! Document services: draft upload, latest-file access and the timeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    AuditSink, BlobStorage, Bucket, CreateDraftRequest, DocumentCommand, DocumentQuery,
    DocumentTimeline, LedgerRepository, PdfStamper, SignedUrl, SignerDirectory, TimelineEntry,
    TimelineStep, WorkflowRepository,
};
use crate::domain::service_errors::{
    map_directory_error, map_join_error, map_ledger_error, map_stamp_error,
    map_storage_write_error, map_workflow_error,
};
use crate::domain::service_support::{emit_audit, ensure_participant, resolve_latest_file};
use crate::domain::verification::display_name;
use crate::domain::{
    AuditAction, AuditEvent, Document, DocumentHash, DocumentId, DocumentStatus, Error,
    SigningError, TraceId, UserId, WorkflowSnapshot, sort_ledger,
};

/// Collaborators of [`DocumentService`].
#[derive(Clone)]
pub struct DocumentServiceDeps {
    /// Document and step storage.
    pub workflows: Arc<dyn WorkflowRepository>,
    /// Ledger reads for the timeline.
    pub ledger: Arc<dyn LedgerRepository>,
    /// Blob storage for originals and artifacts.
    pub storage: Arc<dyn BlobStorage>,
    /// PDF parser used to validate uploads.
    pub stamper: Arc<dyn PdfStamper>,
    /// Display names.
    pub directory: Arc<dyn SignerDirectory>,
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Validity of minted file URLs.
    pub signed_url_ttl: Duration,
}

/// Service implementing [`DocumentCommand`] and [`DocumentQuery`].
#[derive(Clone)]
pub struct DocumentService {
    deps: DocumentServiceDeps,
}

impl DocumentService {
    /// Create the service.
    pub fn new(deps: DocumentServiceDeps) -> Self {
        Self { deps }
    }

    async fn load_visible(
        &self,
        actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<WorkflowSnapshot, Error> {
        let snapshot = self
            .deps
            .workflows
            .load(document_id)
            .await
            .map_err(map_workflow_error)?
            .ok_or_else(|| SigningError::not_found(format!("document {document_id} not found")))?;
        ensure_participant(&snapshot, actor_id)?;
        Ok(snapshot)
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl DocumentCommand for DocumentService {
    async fn create_draft(&self, request: CreateDraftRequest) -> Result<Document, Error> {
        let title = request.title.trim().to_owned();
        if title.is_empty() {
            return Err(SigningError::validation("title", "title must not be empty").into());
        }
        if request.pdf.is_empty() {
            return Err(SigningError::validation("file", "file must not be empty").into());
        }

        let pdf = Arc::new(request.pdf);
        let stamper = Arc::clone(&self.deps.stamper);
        let probe = Arc::clone(&pdf);
        let pages = TraceId::spawn_blocking(move || stamper.page_count(&probe))
            .await
            .map_err(map_join_error)?
            .map_err(map_stamp_error)?;
        if pages == 0 {
            return Err(SigningError::CorruptDocument {
                message: "document has no pages".to_owned(),
            }
            .into());
        }

        let now = self.deps.clock.utc();
        let key = format!(
            "{}/{}_{}.pdf",
            request.owner_id,
            now.timestamp_millis(),
            Uuid::new_v4()
        );
        let pdf = Arc::unwrap_or_clone(pdf);
        let original_hash = DocumentHash::of(&pdf);
        self.deps
            .storage
            .put(Bucket::Original, &key, pdf)
            .await
            .map_err(map_storage_write_error)?;

        let document = Document {
            id: DocumentId::random(),
            title,
            document_number: optional_text(request.document_number),
            owner_id: request.owner_id,
            category: optional_text(request.category),
            current_file_key: key,
            original_hash: Some(original_hash),
            status: DocumentStatus::Draft,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.deps
            .workflows
            .insert_document(&document)
            .await
            .map_err(map_workflow_error)?;
        info!(document_id = %document.id, owner_id = %document.owner_id, pages, "draft created");

        emit_audit(
            &self.deps.audit,
            AuditEvent {
                actor_id: document.owner_id,
                action: AuditAction::DocumentCreate,
                entity_id: *document.id.as_uuid(),
                details: json!({ "title": document.title, "pages": pages }),
                occurred_at: now,
            },
        )
        .await;
        Ok(document)
    }
}

#[async_trait]
impl DocumentQuery for DocumentService {
    async fn open_latest_file(
        &self,
        actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<SignedUrl, Error> {
        let snapshot = self.load_visible(actor_id, document_id).await?;
        resolve_latest_file(
            self.deps.storage.as_ref(),
            &snapshot,
            self.deps.signed_url_ttl,
        )
        .await
    }

    async fn timeline(
        &self,
        actor_id: &UserId,
        document_id: &DocumentId,
    ) -> Result<DocumentTimeline, Error> {
        let WorkflowSnapshot { document, chain } =
            self.load_visible(actor_id, document_id).await?;
        let mut entries = self
            .deps
            .ledger
            .list_by_document(document_id)
            .await
            .map_err(map_ledger_error)?;
        sort_ledger(&mut entries);

        let mut user_ids: Vec<UserId> = chain.steps().iter().map(|step| step.signer_id).collect();
        user_ids.extend(entries.iter().map(|entry| entry.signer_id));
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self
            .deps
            .directory
            .find_profiles(&user_ids)
            .await
            .map_err(map_directory_error)?;

        let steps = chain
            .into_steps()
            .into_iter()
            .map(|step| TimelineStep {
                signer_name: display_name(&profiles, &step.signer_id),
                step,
            })
            .collect();
        let entries = entries
            .into_iter()
            .map(|entry| TimelineEntry {
                signer_name: display_name(&profiles, &entry.signer_id),
                entry,
            })
            .collect();
        Ok(DocumentTimeline {
            document,
            steps,
            entries,
        })
    }
}

#[cfg(test)]
#[path = "document_service_tests.rs"]
mod tests;
