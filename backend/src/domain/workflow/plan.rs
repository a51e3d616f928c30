//! Validation of the owner's ordered signer list.

use std::collections::HashSet;

use crate::domain::{DocumentId, UserId};

use super::{RequiredAction, StepOrder, WorkflowStep};

/// One entry of the owner's routing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerAssignment {
    /// Who must act.
    pub signer_id: UserId,
    /// What they must do.
    pub action: RequiredAction,
}

/// Reasons a routing list is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowPlanError {
    /// No signers were supplied.
    #[error("a workflow needs at least one signer")]
    Empty,
    /// The owner listed themselves.
    #[error("the document owner cannot sign their own routing ({signer_id})")]
    SelfSigning {
        /// The offending entry.
        signer_id: UserId,
    },
    /// A signer appears more than once.
    #[error("signer {signer_id} appears more than once")]
    DuplicateSigner {
        /// The repeated signer.
        signer_id: UserId,
    },
    /// The list is longer than a step order can express.
    #[error("too many signers")]
    TooManySigners,
}

/// A validated, ordered routing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    assignments: Vec<SignerAssignment>,
}

impl WorkflowPlan {
    /// Validate `assignments` for a document owned by `owner_id`.
    ///
    /// # Examples
    /// ```
    /// use cosign_backend::domain::{RequiredAction, SignerAssignment, UserId, WorkflowPlan};
    ///
    /// let owner = UserId::random();
    /// let plan = WorkflowPlan::new(
    ///     &owner,
    ///     vec![SignerAssignment { signer_id: UserId::random(), action: RequiredAction::Sign }],
    /// );
    /// assert!(plan.is_ok());
    /// ```
    pub fn new(
        owner_id: &UserId,
        assignments: Vec<SignerAssignment>,
    ) -> Result<Self, WorkflowPlanError> {
        if assignments.is_empty() {
            return Err(WorkflowPlanError::Empty);
        }
        if u32::try_from(assignments.len()).is_err() {
            return Err(WorkflowPlanError::TooManySigners);
        }
        let mut seen = HashSet::with_capacity(assignments.len());
        for assignment in &assignments {
            if &assignment.signer_id == owner_id {
                return Err(WorkflowPlanError::SelfSigning {
                    signer_id: assignment.signer_id,
                });
            }
            if !seen.insert(assignment.signer_id) {
                return Err(WorkflowPlanError::DuplicateSigner {
                    signer_id: assignment.signer_id,
                });
            }
        }
        Ok(Self { assignments })
    }

    /// Validated assignments in routing order.
    #[must_use]
    pub fn assignments(&self) -> &[SignerAssignment] {
        &self.assignments
    }

    /// Materialise one pending step per assignment, numbered from 1.
    pub fn into_steps(self, document_id: DocumentId) -> Result<Vec<WorkflowStep>, WorkflowPlanError> {
        self.assignments
            .into_iter()
            .enumerate()
            .map(|(index, assignment)| {
                let order =
                    StepOrder::from_index(index).map_err(|_| WorkflowPlanError::TooManySigners)?;
                Ok(WorkflowStep::pending(
                    document_id,
                    assignment.signer_id,
                    order,
                    assignment.action,
                ))
            })
            .collect()
    }
}
