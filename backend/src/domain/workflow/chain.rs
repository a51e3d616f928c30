//! The ordered step set of one document and its transitions.

use chrono::{DateTime, Utc};

use crate::domain::{DocumentId, DocumentStatus, LedgerEntryId, StepId, UserId};

use super::{StepOrder, StepStatus, WorkflowStep};

/// Structural problems found when assembling a chain from stored steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepChainError {
    /// Steps from different documents were mixed.
    #[error("steps belong to more than one document")]
    MixedDocuments,
    /// Orders are not the contiguous sequence 1..=n.
    #[error("expected step order {expected}, found {found}")]
    NonContiguousOrder {
        /// Order that should have come next.
        expected: u32,
        /// Order actually found.
        found: u32,
    },
    /// A signer holds two steps.
    #[error("signer {signer_id} holds more than one step")]
    DuplicateSigner {
        /// The repeated signer.
        signer_id: UserId,
    },
}

/// Reasons a step transition is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The step is not part of this chain.
    #[error("step {step_id} is not part of this workflow")]
    UnknownStep {
        /// The missing step.
        step_id: StepId,
    },
    /// The step already left `Pending`.
    #[error("step is already {status}")]
    NotPending {
        /// Its current status.
        status: StepStatus,
    },
    /// Lower-order steps have not completed.
    #[error("not your turn yet")]
    OutOfSequence {
        /// Signers of the incomplete lower-order steps, in step order.
        blocking_signers: Vec<UserId>,
    },
}

/// Result of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    /// Signers of incomplete lower-order steps, in step order.
    pub blocking_signers: Vec<UserId>,
}

impl Eligibility {
    /// Whether every lower-order step has completed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.blocking_signers.is_empty()
    }
}

/// A document's steps sorted by order, with the ordering invariants checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepChain {
    steps: Vec<WorkflowStep>,
}

impl StepChain {
    /// Assemble a chain, sorting by order and validating the sequence.
    pub fn new(mut steps: Vec<WorkflowStep>) -> Result<Self, StepChainError> {
        steps.sort_by_key(|step| step.step_order);
        let Some(document_id) = steps.first().map(|step| step.document_id) else {
            return Ok(Self::default());
        };
        let mut signers = std::collections::HashSet::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.document_id != document_id {
                return Err(StepChainError::MixedDocuments);
            }
            let expected = StepOrder::from_index(index).map_or(0, StepOrder::get);
            if step.step_order.get() != expected {
                return Err(StepChainError::NonContiguousOrder {
                    expected,
                    found: step.step_order.get(),
                });
            }
            if !signers.insert(step.signer_id) {
                return Err(StepChainError::DuplicateSigner {
                    signer_id: step.signer_id,
                });
            }
        }
        Ok(Self { steps })
    }

    /// Steps in order.
    #[must_use]
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Consume the chain, yielding its steps in order.
    #[must_use]
    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps
    }

    /// Document the chain belongs to, if it has any steps.
    #[must_use]
    pub fn document_id(&self) -> Option<DocumentId> {
        self.steps.first().map(|step| step.document_id)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no workflow has been attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a step.
    #[must_use]
    pub fn step(&self, step_id: &StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| &step.id == step_id)
    }

    /// Look up the step assigned to `signer_id`.
    #[must_use]
    pub fn step_for_signer(&self, signer_id: &UserId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| &step.signer_id == signer_id)
    }

    /// Whether `user_id` holds a step in this chain.
    #[must_use]
    pub fn has_signer(&self, user_id: &UserId) -> bool {
        self.step_for_signer(user_id).is_some()
    }

    /// Count of completed steps.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(StepStatus::Completed)
    }

    /// Count of rejected steps, cascaded ones included.
    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.count(StepStatus::Rejected)
    }

    fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|step| step.status == status).count()
    }

    /// The lowest-order pending step, i.e. whose turn it is.
    #[must_use]
    pub fn current(&self) -> Option<&WorkflowStep> {
        if self.rejected_count() > 0 {
            return None;
        }
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Pending)
    }

    /// Derive whether the step's signer may act now.
    pub fn eligibility(&self, step_id: &StepId) -> Result<Eligibility, TransitionError> {
        let step = self
            .step(step_id)
            .ok_or(TransitionError::UnknownStep { step_id: *step_id })?;
        let blocking_signers = self
            .steps
            .iter()
            .filter(|other| other.step_order < step.step_order)
            .filter(|other| other.status != StepStatus::Completed)
            .map(|other| other.signer_id)
            .collect();
        Ok(Eligibility { blocking_signers })
    }

    fn pending_index(&self, step_id: &StepId) -> Result<usize, TransitionError> {
        let index = self
            .steps
            .iter()
            .position(|step| &step.id == step_id)
            .ok_or(TransitionError::UnknownStep { step_id: *step_id })?;
        match self.steps.get(index).map(|step| step.status) {
            Some(StepStatus::Pending) => Ok(index),
            Some(status) => Err(TransitionError::NotPending { status }),
            None => Err(TransitionError::UnknownStep { step_id: *step_id }),
        }
    }

    /// Mark a step completed, re-checking ordering against this state.
    pub fn complete(
        &mut self,
        step_id: &StepId,
        signature_ref: LedgerEntryId,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let index = self.pending_index(step_id)?;
        let eligibility = self.eligibility(step_id)?;
        if !eligibility.is_eligible() {
            return Err(TransitionError::OutOfSequence {
                blocking_signers: eligibility.blocking_signers,
            });
        }
        if let Some(step) = self.steps.get_mut(index) {
            step.status = StepStatus::Completed;
            step.signature_ref = Some(signature_ref);
            step.completed_at = Some(at);
        }
        Ok(())
    }

    /// Reject a step and cascade to every later pending step.
    ///
    /// Returns the identifiers of the cascaded steps.
    pub fn reject(
        &mut self,
        step_id: &StepId,
        at: DateTime<Utc>,
    ) -> Result<Vec<StepId>, TransitionError> {
        let index = self.pending_index(step_id)?;
        let order = match self.steps.get_mut(index) {
            Some(step) => {
                step.status = StepStatus::Rejected;
                step.completed_at = Some(at);
                step.step_order
            }
            None => return Err(TransitionError::UnknownStep { step_id: *step_id }),
        };
        let cascaded = self
            .steps
            .iter_mut()
            .filter(|step| step.step_order > order && step.status == StepStatus::Pending)
            .map(|step| {
                step.status = StepStatus::Rejected;
                step.id
            })
            .collect();
        Ok(cascaded)
    }

    /// Document status implied by the steps.
    #[must_use]
    pub fn document_status(&self) -> DocumentStatus {
        if self.steps.is_empty() {
            DocumentStatus::Draft
        } else if self.rejected_count() > 0 {
            DocumentStatus::Rejected
        } else if self.completed_count() == self.steps.len() {
            DocumentStatus::Signed
        } else {
            DocumentStatus::PendingSign
        }
    }
}
