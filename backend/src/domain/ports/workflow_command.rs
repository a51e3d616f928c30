//! Driving ports for the signing workflow.

use async_trait::async_trait;

use crate::domain::{
    Document, DocumentId, DocumentStatus, Error, LedgerEntry, Placement, SignerAssignment, StepId,
    UserId, WorkflowStep,
};

/// Request to route a draft through an ordered signer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWorkflowRequest {
    /// The draft.
    pub document_id: DocumentId,
    /// Acting user; must own the draft.
    pub owner_id: UserId,
    /// Signers in signing order.
    pub signers: Vec<SignerAssignment>,
}

/// Request to sign or approve a step.
#[derive(Debug, Clone, PartialEq)]
pub struct SignStepRequest {
    /// Acting user; must be the step's signer.
    pub actor_id: UserId,
    /// The step.
    pub step_id: StepId,
    /// Where to place the stamp.
    pub placement: Placement,
}

/// Request to reject a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectStepRequest {
    /// Acting user; must be the step's signer.
    pub actor_id: UserId,
    /// The step.
    pub step_id: StepId,
    /// Non-empty explanation.
    pub reason: String,
}

/// Result of a successful signing round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    /// Document after the commit.
    pub document: Document,
    /// The completed step.
    pub step: WorkflowStep,
    /// The appended ledger entry.
    pub entry: LedgerEntry,
    /// Public verification URL embedded in the QR code.
    pub verify_url: String,
}

/// Result of a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectOutcome {
    /// Document after the commit.
    pub document: Document,
    /// The rejected step.
    pub step: WorkflowStep,
    /// Later steps rejected by the cascade.
    pub cascaded: Vec<StepId>,
    /// The appended ledger entry.
    pub entry: LedgerEntry,
}

/// Whether a signer may act on a step now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEligibility {
    /// The step.
    pub step_id: StepId,
    /// `true` when every lower-order step is completed.
    pub eligible: bool,
    /// Names of the signers still to act before this step, in order.
    pub blocking_signers: Vec<String>,
}

/// One entry in a signer's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTask {
    /// The signer's step.
    pub step: WorkflowStep,
    /// Document title.
    pub title: String,
    /// Registry number.
    pub document_number: Option<String>,
    /// Document status.
    pub document_status: DocumentStatus,
    /// Owner display name.
    pub owner_name: String,
    /// Number of steps in the chain.
    pub total_steps: usize,
    /// Whether the signer may act now.
    pub can_sign: bool,
    /// Names of the signers still to act first.
    pub waiting_for: Vec<String>,
}

/// Driving port for workflow mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowCommand: Send + Sync {
    /// Attach a signer chain to a draft.
    async fn create_workflow(
        &self,
        request: CreateWorkflowRequest,
    ) -> Result<Vec<WorkflowStep>, Error>;

    /// Stamp the latest artifact and complete the step.
    async fn sign_step(&self, request: SignStepRequest) -> Result<SignOutcome, Error>;

    /// Reject the step and cascade.
    async fn reject_step(&self, request: RejectStepRequest) -> Result<RejectOutcome, Error>;
}

/// Driving port for workflow reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowQuery: Send + Sync {
    /// Derive whether the step's signer may act now.
    async fn can_act(&self, actor_id: &UserId, step_id: &StepId)
    -> Result<StepEligibility, Error>;

    /// Every step assigned to the signer, newest document first.
    async fn list_tasks(&self, signer_id: &UserId) -> Result<Vec<SigningTask>, Error>;
}

/// Fixture implementation for handler tests that do not touch workflows.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWorkflowService;

#[async_trait]
impl WorkflowCommand for FixtureWorkflowService {
    async fn create_workflow(
        &self,
        request: CreateWorkflowRequest,
    ) -> Result<Vec<WorkflowStep>, Error> {
        Err(Error::not_found(format!(
            "document {} not found",
            request.document_id
        )))
    }

    async fn sign_step(&self, request: SignStepRequest) -> Result<SignOutcome, Error> {
        Err(Error::not_found(format!("step {} not found", request.step_id)))
    }

    async fn reject_step(&self, request: RejectStepRequest) -> Result<RejectOutcome, Error> {
        Err(Error::not_found(format!("step {} not found", request.step_id)))
    }
}

#[async_trait]
impl WorkflowQuery for FixtureWorkflowService {
    async fn can_act(
        &self,
        _actor_id: &UserId,
        step_id: &StepId,
    ) -> Result<StepEligibility, Error> {
        Err(Error::not_found(format!("step {step_id} not found")))
    }

    async fn list_tasks(&self, _signer_id: &UserId) -> Result<Vec<SigningTask>, Error> {
        Ok(Vec::new())
    }
}
