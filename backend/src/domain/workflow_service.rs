//! Sequential signing workflow service.
//!
//! Implements routing (`create_workflow`), the signing commit path and
//! rejection. Every action re-reads the document and its chain, checks turn
//! order against that fresh state, and commits with the revision it read; the
//! repository re-applies the same rules under lock, so a stale eligibility
//! decision can never be committed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, instrument};

use crate::domain::ports::{
    AuditSink, BlobStorage, Bucket, CreateWorkflowRequest, PdfStamper, RejectOutcome,
    RejectStepRequest, SignOutcome, SignStepRequest, SignatureAssetRepository, SignerDirectory,
    SigningTask, StampRequest, StepEligibility, WorkflowCommand, WorkflowQuery,
    WorkflowRepository,
};
use crate::domain::service_errors::{
    map_asset_error, map_directory_error, map_join_error, map_stamp_error,
    map_storage_read_error, map_storage_write_error, map_workflow_error,
};
use crate::domain::service_support::{emit_audit, ensure_participant, resolve_latest_file};
use crate::domain::verification::display_name;
use crate::domain::{
    AttachWorkflow, AuditAction, AuditEvent, CompletionCommit, DocumentStatus, Error,
    LedgerAction, LedgerEntry, LedgerEntryId, Placement, RejectionCommit, SignerProfile,
    SigningError, StepId, StepStatus, TraceId, UserId, VerificationCode, WorkflowPlan,
    WorkflowPlanError, WorkflowSnapshot, WorkflowStep,
};

/// Settings that shape signing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningSettings {
    /// Base of the public verification URL encoded in each QR code.
    pub public_base_url: String,
    /// Validity of minted file URLs.
    pub signed_url_ttl: Duration,
}

impl SigningSettings {
    /// Public URL for a verification code.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use cosign_backend::domain::SigningSettings;
    ///
    /// let settings = SigningSettings {
    ///     public_base_url: "https://sign.example.org/".to_owned(),
    ///     signed_url_ttl: Duration::from_secs(300),
    /// };
    /// assert_eq!(settings.verify_url("abc"), "https://sign.example.org/verify/abc");
    /// ```
    #[must_use]
    pub fn verify_url(&self, code: &str) -> String {
        format!(
            "{}/verify/{code}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

/// Collaborators of [`WorkflowService`].
#[derive(Clone)]
pub struct WorkflowServiceDeps {
    /// Document and step storage with atomic commits.
    pub workflows: Arc<dyn WorkflowRepository>,
    /// Signature image metadata.
    pub assets: Arc<dyn SignatureAssetRepository>,
    /// Blob storage for artifacts and signature images.
    pub storage: Arc<dyn BlobStorage>,
    /// Stamping engine.
    pub stamper: Arc<dyn PdfStamper>,
    /// Display names and roles.
    pub directory: Arc<dyn SignerDirectory>,
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Output settings.
    pub settings: SigningSettings,
}

/// Service implementing [`WorkflowCommand`] and [`WorkflowQuery`].
#[derive(Clone)]
pub struct WorkflowService {
    deps: WorkflowServiceDeps,
}

/// Fresh state for one step, validated for the acting signer.
struct ActingStep {
    snapshot: WorkflowSnapshot,
    step: WorkflowStep,
}

impl WorkflowService {
    /// Create the service.
    pub fn new(deps: WorkflowServiceDeps) -> Self {
        Self { deps }
    }

    async fn load_for_step(&self, step_id: &StepId) -> Result<WorkflowSnapshot, Error> {
        let not_found = || SigningError::not_found(format!("step {step_id} not found"));
        let document_id = self
            .deps
            .workflows
            .find_document_for_step(step_id)
            .await
            .map_err(map_workflow_error)?
            .ok_or_else(not_found)?;
        self.deps
            .workflows
            .load(&document_id)
            .await
            .map_err(map_workflow_error)?
            .ok_or_else(|| not_found().into())
    }

    /// Load the step and check that `actor_id` may act on it right now.
    async fn acting_step(&self, actor_id: &UserId, step_id: &StepId) -> Result<ActingStep, Error> {
        let snapshot = self.load_for_step(step_id).await?;
        let step = snapshot
            .chain
            .step(step_id)
            .cloned()
            .ok_or_else(|| SigningError::not_found(format!("step {step_id} not found")))?;
        if &step.signer_id != actor_id {
            return Err(SigningError::forbidden("this step is assigned to another signer").into());
        }
        if !snapshot.document.status.accepts_actions() {
            return Err(SigningError::DocumentClosed {
                status: snapshot.document.status,
            }
            .into());
        }
        if step.status != StepStatus::Pending {
            return Err(SigningError::StepClosed {
                step_id: step.id,
                status: step.status,
            }
            .into());
        }
        Ok(ActingStep { snapshot, step })
    }

    async fn blocking_names(
        &self,
        snapshot: &WorkflowSnapshot,
        step_id: &StepId,
    ) -> Result<Vec<String>, Error> {
        let eligibility = snapshot
            .chain
            .eligibility(step_id)
            .map_err(|err| SigningError::not_found(err.to_string()))?;
        if eligibility.is_eligible() {
            return Ok(Vec::new());
        }
        let profiles = self
            .deps
            .directory
            .find_profiles(&eligibility.blocking_signers)
            .await
            .map_err(map_directory_error)?;
        Ok(eligibility
            .blocking_signers
            .iter()
            .map(|signer_id| display_name(&profiles, signer_id))
            .collect())
    }

    async fn signer_profile(&self, user_id: &UserId) -> Result<Option<SignerProfile>, Error> {
        self.deps
            .directory
            .find_profile(user_id)
            .await
            .map_err(map_directory_error)
    }

    async fn fetch(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, Error> {
        let url = self
            .deps
            .storage
            .signed_url(bucket, key, self.deps.settings.signed_url_ttl)
            .await
            .map_err(map_storage_read_error)?
            .ok_or(SigningError::FileUnavailable)?;
        self.deps
            .storage
            .fetch(&url)
            .await
            .map_err(map_storage_read_error)
    }
}

fn map_plan_error(error: WorkflowPlanError) -> Error {
    SigningError::validation("signers", error.to_string()).into()
}

fn committed_step(snapshot: &WorkflowSnapshot, step_id: &StepId) -> Result<WorkflowStep, Error> {
    snapshot
        .chain
        .step(step_id)
        .cloned()
        .ok_or_else(|| Error::internal(format!("committed step {step_id} missing from snapshot")))
}

#[async_trait]
impl WorkflowCommand for WorkflowService {
    #[instrument(skip(self, request), fields(document_id = %request.document_id, owner_id = %request.owner_id))]
    async fn create_workflow(
        &self,
        request: CreateWorkflowRequest,
    ) -> Result<Vec<WorkflowStep>, Error> {
        let CreateWorkflowRequest {
            document_id,
            owner_id,
            signers,
        } = request;
        let snapshot = self
            .deps
            .workflows
            .load(&document_id)
            .await
            .map_err(map_workflow_error)?
            .ok_or_else(|| SigningError::not_found(format!("document {document_id} not found")))?;
        if !snapshot.document.is_owned_by(&owner_id) {
            return Err(SigningError::forbidden("only the owner can send a document").into());
        }
        if snapshot.document.status != DocumentStatus::Draft {
            return Err(SigningError::DocumentClosed {
                status: snapshot.document.status,
            }
            .into());
        }

        let plan = WorkflowPlan::new(&owner_id, signers).map_err(map_plan_error)?;
        let steps = plan.into_steps(document_id).map_err(map_plan_error)?;
        let signer_count = steps.len();
        let now = self.deps.clock.utc();
        let committed = self
            .deps
            .workflows
            .attach_workflow(AttachWorkflow {
                document_id,
                expected_revision: snapshot.document.revision,
                steps,
                attached_at: now,
            })
            .await
            .map_err(map_workflow_error)?;
        info!(signer_count, "workflow attached");

        emit_audit(
            &self.deps.audit,
            AuditEvent {
                actor_id: owner_id,
                action: AuditAction::DocumentSend,
                entity_id: *document_id.as_uuid(),
                details: json!({ "signers": signer_count }),
                occurred_at: now,
            },
        )
        .await;
        Ok(committed.chain.into_steps())
    }

    #[instrument(skip(self, request), fields(step_id = %request.step_id, signer_id = %request.actor_id))]
    async fn sign_step(&self, request: SignStepRequest) -> Result<SignOutcome, Error> {
        let SignStepRequest {
            actor_id,
            step_id,
            placement,
        } = request;
        let placement = Placement::new(
            placement.page_index,
            placement.click_x,
            placement.click_y,
            placement.scale,
        )
        .map_err(|err| SigningError::validation("placement", err.to_string()))?;

        let ActingStep { snapshot, step } = self.acting_step(&actor_id, &step_id).await?;
        let blocking_signers = self.blocking_names(&snapshot, &step_id).await?;
        if !blocking_signers.is_empty() {
            return Err(SigningError::OutOfSequence { blocking_signers }.into());
        }

        let asset = self
            .deps
            .assets
            .find_active(&actor_id)
            .await
            .map_err(map_asset_error)?
            .ok_or(SigningError::NoActiveSignature)?;
        let profile = self.signer_profile(&actor_id).await?.ok_or_else(|| {
            SigningError::not_found(format!("no directory profile for signer {actor_id}"))
        })?;

        let base_url = resolve_latest_file(
            self.deps.storage.as_ref(),
            &snapshot,
            self.deps.settings.signed_url_ttl,
        )
        .await?;
        let base_pdf = self
            .deps
            .storage
            .fetch(&base_url)
            .await
            .map_err(map_storage_read_error)?;
        let signature_png = self.fetch(Bucket::Signatures, &asset.image_key).await?;

        let verification_code = VerificationCode::generate();
        let verify_url = self.deps.settings.verify_url(verification_code.as_str());
        let now = self.deps.clock.utc();
        let stamper = Arc::clone(&self.deps.stamper);
        let stamp_request = StampRequest {
            base_pdf,
            placement,
            signer_name: profile.full_name.clone(),
            signer_position: profile.position.clone(),
            signed_at: now,
            signature_png,
            verify_url: verify_url.clone(),
        };
        let stamped = TraceId::spawn_blocking(move || stamper.stamp(stamp_request))
            .await
            .map_err(map_join_error)?
            .map_err(map_stamp_error)?;

        // Keyed by the attempt's own code: a losing attempt can only orphan.
        let document_id = snapshot.document.id;
        let new_file_key = format!(
            "signed_{document_id}_step{}_{}.pdf",
            step.step_order,
            verification_code.as_str()
        );
        let hash = stamped.hash.clone();
        self.deps
            .storage
            .put(Bucket::Signed, &new_file_key, stamped.bytes)
            .await
            .map_err(map_storage_write_error)?;

        let entry = LedgerEntry {
            id: LedgerEntryId::random(),
            document_id,
            signer_id: actor_id,
            step_order: step.step_order,
            action: step.required_action.ledger_action(),
            document_hash: Some(hash),
            signer: profile.snapshot(),
            verification_code,
            rejection_reason: None,
            signature_asset_id: Some(asset.id),
            file_key: Some(new_file_key.clone()),
            signed_at: now,
        };
        let committed = self
            .deps
            .workflows
            .commit_completion(CompletionCommit {
                document_id,
                expected_revision: snapshot.document.revision,
                step_id,
                entry: entry.clone(),
                new_file_key,
            })
            .await
            .map_err(map_workflow_error)?;
        let step = committed_step(&committed, &step_id)?;
        info!(
            %document_id,
            step_order = %step.step_order,
            document_status = %committed.document.status,
            "step completed"
        );

        emit_audit(
            &self.deps.audit,
            AuditEvent {
                actor_id,
                action: AuditAction::DocumentSign,
                entity_id: *document_id.as_uuid(),
                details: json!({
                    "stepOrder": step.step_order.get(),
                    "action": entry.action.as_str(),
                    "documentHash": entry.document_hash.as_ref().map(|h| h.as_str().to_owned()),
                }),
                occurred_at: now,
            },
        )
        .await;
        Ok(SignOutcome {
            document: committed.document,
            step,
            entry,
            verify_url,
        })
    }

    #[instrument(skip(self, request), fields(step_id = %request.step_id, signer_id = %request.actor_id))]
    async fn reject_step(&self, request: RejectStepRequest) -> Result<RejectOutcome, Error> {
        let RejectStepRequest {
            actor_id,
            step_id,
            reason,
        } = request;
        let reason = reason.trim().to_owned();
        if reason.is_empty() {
            return Err(SigningError::validation("reason", "a rejection reason is required").into());
        }

        let ActingStep { snapshot, step } = self.acting_step(&actor_id, &step_id).await?;
        let signer = self
            .signer_profile(&actor_id)
            .await?
            .map(|profile| profile.snapshot())
            .unwrap_or_default();
        let now = self.deps.clock.utc();
        let document_id = snapshot.document.id;
        let entry = LedgerEntry {
            id: LedgerEntryId::random(),
            document_id,
            signer_id: actor_id,
            step_order: step.step_order,
            action: LedgerAction::Rejected,
            document_hash: None,
            signer,
            verification_code: VerificationCode::generate(),
            rejection_reason: Some(reason.clone()),
            signature_asset_id: None,
            file_key: None,
            signed_at: now,
        };
        let committed = self
            .deps
            .workflows
            .commit_rejection(RejectionCommit {
                document_id,
                expected_revision: snapshot.document.revision,
                step_id,
                entry: entry.clone(),
            })
            .await
            .map_err(map_workflow_error)?;

        let cascaded: Vec<StepId> = snapshot
            .chain
            .steps()
            .iter()
            .filter(|other| other.step_order > step.step_order && other.status == StepStatus::Pending)
            .map(|other| other.id)
            .filter(|id| {
                committed
                    .chain
                    .step(id)
                    .is_some_and(|after| after.status == StepStatus::Rejected)
            })
            .collect();
        let step = committed_step(&committed, &step_id)?;
        info!(
            %document_id,
            step_order = %step.step_order,
            cascaded = cascaded.len(),
            "step rejected"
        );

        emit_audit(
            &self.deps.audit,
            AuditEvent {
                actor_id,
                action: AuditAction::DocumentReject,
                entity_id: *document_id.as_uuid(),
                details: json!({
                    "stepOrder": step.step_order.get(),
                    "reason": reason,
                    "cascaded": cascaded.len(),
                }),
                occurred_at: now,
            },
        )
        .await;
        Ok(RejectOutcome {
            document: committed.document,
            step,
            cascaded,
            entry,
        })
    }
}

#[async_trait]
impl WorkflowQuery for WorkflowService {
    async fn can_act(
        &self,
        actor_id: &UserId,
        step_id: &StepId,
    ) -> Result<StepEligibility, Error> {
        let snapshot = self.load_for_step(step_id).await?;
        ensure_participant(&snapshot, actor_id)?;
        let blocking_signers = self.blocking_names(&snapshot, step_id).await?;
        Ok(StepEligibility {
            step_id: *step_id,
            eligible: blocking_signers.is_empty(),
            blocking_signers,
        })
    }

    async fn list_tasks(&self, signer_id: &UserId) -> Result<Vec<SigningTask>, Error> {
        let mut snapshots = self
            .deps
            .workflows
            .list_for_signer(signer_id)
            .await
            .map_err(map_workflow_error)?;
        snapshots.sort_by(|a, b| b.document.created_at.cmp(&a.document.created_at));

        let mut user_ids: Vec<UserId> = snapshots
            .iter()
            .flat_map(|snapshot| {
                std::iter::once(snapshot.document.owner_id)
                    .chain(snapshot.chain.steps().iter().map(|step| step.signer_id))
            })
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self
            .deps
            .directory
            .find_profiles(&user_ids)
            .await
            .map_err(map_directory_error)?;

        Ok(snapshots
            .into_iter()
            .filter_map(|snapshot| task_for(snapshot, signer_id, &profiles))
            .collect())
    }
}

fn task_for(
    snapshot: WorkflowSnapshot,
    signer_id: &UserId,
    profiles: &HashMap<UserId, SignerProfile>,
) -> Option<SigningTask> {
    let step = snapshot.chain.step_for_signer(signer_id)?.clone();
    let blocking = snapshot
        .chain
        .eligibility(&step.id)
        .map(|eligibility| eligibility.blocking_signers)
        .unwrap_or_default();
    let can_sign = blocking.is_empty()
        && step.status == StepStatus::Pending
        && snapshot.document.status.accepts_actions();
    Some(SigningTask {
        title: snapshot.document.title,
        document_number: snapshot.document.document_number,
        document_status: snapshot.document.status,
        owner_name: display_name(profiles, &snapshot.document.owner_id),
        total_steps: snapshot.chain.len(),
        can_sign,
        waiting_for: blocking
            .iter()
            .map(|id| display_name(profiles, id))
            .collect(),
        step,
    })
}

#[cfg(test)]
#[path = "workflow_service_tests.rs"]
mod tests;
