//! Sequential signing workflow.
//!
//! A document owner attaches an ordered list of signers. Each signer holds one
//! [`WorkflowStep`]; a step may complete only once every lower-order step has
//! completed, and a rejection terminates the remaining chain. Eligibility is
//! always derived from the step list ([`StepChain::eligibility`]) rather than
//! stored.

mod chain;
mod commit;
mod plan;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DocumentId, LedgerAction, LedgerEntryId, StepId, UserId};

pub use chain::{Eligibility, StepChain, StepChainError, TransitionError};
pub use commit::{
    AttachWorkflow, CommitConflict, CommitOutcome, CompletionCommit, RejectionCommit,
    WorkflowSnapshot, apply_attachment, apply_completion, apply_rejection,
};
pub use plan::{SignerAssignment, WorkflowPlan, WorkflowPlanError};

/// One-based position of a step within its document's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct StepOrder(u32);

/// Error returned for a zero step order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("step order must start at 1")]
pub struct InvalidStepOrder;

impl StepOrder {
    /// The first step.
    pub const FIRST: Self = Self(1);

    /// Validate a one-based order.
    pub const fn new(value: u32) -> Result<Self, InvalidStepOrder> {
        if value == 0 {
            Err(InvalidStepOrder)
        } else {
            Ok(Self(value))
        }
    }

    /// Order for the step at a zero-based list position.
    pub fn from_index(index: usize) -> Result<Self, InvalidStepOrder> {
        u32::try_from(index)
            .ok()
            .and_then(|value| value.checked_add(1))
            .map(Self)
            .ok_or(InvalidStepOrder)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for StepOrder {
    type Error = InvalidStepOrder;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepOrder> for u32 {
    fn from(value: StepOrder) -> Self {
        value.0
    }
}

impl std::fmt::Display for StepOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the owner asks a signer to do.
///
/// All three complete a step identically; they differ only in the ledger
/// action recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAction {
    /// Sign the document.
    Sign,
    /// Approve the document.
    Approve,
    /// Review the document.
    Review,
}

/// Error raised when an action string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown required action: {0}")]
pub struct UnknownRequiredAction(pub String);

impl RequiredAction {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Approve => "approve",
            Self::Review => "review",
        }
    }

    /// Ledger action written when a step with this requirement completes.
    #[must_use]
    pub const fn ledger_action(self) -> LedgerAction {
        match self {
            Self::Approve => LedgerAction::Approved,
            Self::Sign | Self::Review => LedgerAction::Signed,
        }
    }
}

impl std::str::FromStr for RequiredAction {
    type Err = UnknownRequiredAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign" => Ok(Self::Sign),
            "approve" => Ok(Self::Approve),
            "review" => Ok(Self::Review),
            other => Err(UnknownRequiredAction(other.to_owned())),
        }
    }
}

/// State of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Awaiting the signer.
    Pending,
    /// Signer acted.
    Completed,
    /// Signer rejected, or a lower-order step was rejected.
    Rejected,
}

/// Error raised when a stored step status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step status: {0}")]
pub struct UnknownStepStatus(pub String);

impl StepStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepStatus {
    type Err = UnknownStepStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownStepStatus(other.to_owned())),
        }
    }
}

/// One signer's obligation on one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    /// Identifier.
    pub id: StepId,
    /// Owning document.
    pub document_id: DocumentId,
    /// Assigned signer.
    pub signer_id: UserId,
    /// Position in the chain.
    pub step_order: StepOrder,
    /// Requested action.
    pub required_action: RequiredAction,
    /// Current state.
    pub status: StepStatus,
    /// Ledger entry written when the step completed.
    pub signature_ref: Option<LedgerEntryId>,
    /// Time the step left `Pending` by the signer's own action.
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    /// A fresh pending step.
    #[must_use]
    pub fn pending(
        document_id: DocumentId,
        signer_id: UserId,
        step_order: StepOrder,
        required_action: RequiredAction,
    ) -> Self {
        Self {
            id: StepId::random(),
            document_id,
            signer_id,
            step_order,
            required_action,
            status: StepStatus::Pending,
            signature_ref: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod chain_tests;
