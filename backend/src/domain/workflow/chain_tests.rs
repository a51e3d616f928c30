//! Tests for the step chain, routing plan and commit rules.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::{
    Document, DocumentHash, DocumentStatus, LedgerAction, LedgerEntry, LedgerEntryId,
    SignerSnapshot, VerificationCode,
};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0)
        .single()
        .expect("valid timestamp")
}

struct Fixture {
    owner: UserId,
    signers: Vec<UserId>,
    chain: StepChain,
}

impl Fixture {
    fn step_id(&self, order: usize) -> StepId {
        self.chain
            .steps()
            .get(order - 1)
            .map(|step| step.id)
            .expect("step exists")
    }

    fn status(&self, order: usize) -> StepStatus {
        self.chain
            .steps()
            .get(order - 1)
            .map(|step| step.status)
            .expect("step exists")
    }
}

#[fixture]
fn three_steps() -> Fixture {
    let owner = UserId::random();
    let signers = vec![UserId::random(), UserId::random(), UserId::random()];
    let plan = WorkflowPlan::new(
        &owner,
        vec![
            SignerAssignment { signer_id: signers[0], action: RequiredAction::Sign },
            SignerAssignment { signer_id: signers[1], action: RequiredAction::Approve },
            SignerAssignment { signer_id: signers[2], action: RequiredAction::Review },
        ],
    )
    .expect("valid plan");
    let steps = plan.into_steps(DocumentId::random()).expect("steps");
    let chain = StepChain::new(steps).expect("valid chain");
    Fixture { owner, signers, chain }
}

#[rstest]
fn plan_rejects_empty_lists() {
    let owner = UserId::random();
    assert_eq!(WorkflowPlan::new(&owner, vec![]), Err(WorkflowPlanError::Empty));
}

#[rstest]
fn plan_rejects_self_signing() {
    let owner = UserId::random();
    let result = WorkflowPlan::new(
        &owner,
        vec![SignerAssignment { signer_id: owner, action: RequiredAction::Sign }],
    );
    assert_eq!(result, Err(WorkflowPlanError::SelfSigning { signer_id: owner }));
}

#[rstest]
fn plan_rejects_duplicate_signers() {
    let owner = UserId::random();
    let signer = UserId::random();
    let result = WorkflowPlan::new(
        &owner,
        vec![
            SignerAssignment { signer_id: signer, action: RequiredAction::Sign },
            SignerAssignment { signer_id: signer, action: RequiredAction::Approve },
        ],
    );
    assert_eq!(result, Err(WorkflowPlanError::DuplicateSigner { signer_id: signer }));
}

#[rstest]
fn plan_numbers_steps_densely_from_one(three_steps: Fixture) {
    let orders: Vec<u32> = three_steps
        .chain
        .steps()
        .iter()
        .map(|step| step.step_order.get())
        .collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert!(
        three_steps
            .chain
            .steps()
            .iter()
            .all(|step| step.status == StepStatus::Pending)
    );
    assert!(!three_steps.chain.has_signer(&three_steps.owner));
}

#[rstest]
fn chain_rejects_gaps_in_order(three_steps: Fixture) {
    let mut steps = three_steps.chain.into_steps();
    steps.remove(1);
    assert_eq!(
        StepChain::new(steps),
        Err(StepChainError::NonContiguousOrder { expected: 2, found: 3 })
    );
}

#[rstest]
fn chain_sorts_unordered_rows(three_steps: Fixture) {
    let mut steps = three_steps.chain.clone().into_steps();
    steps.reverse();
    let rebuilt = StepChain::new(steps).expect("valid chain");
    assert_eq!(rebuilt, three_steps.chain);
}

#[rstest]
fn first_step_is_always_eligible(three_steps: Fixture) {
    let eligibility = three_steps
        .chain
        .eligibility(&three_steps.step_id(1))
        .expect("known step");
    assert!(eligibility.is_eligible());
}

#[rstest]
fn blocking_signers_are_listed_in_step_order(three_steps: Fixture) {
    let eligibility = three_steps
        .chain
        .eligibility(&three_steps.step_id(3))
        .expect("known step");
    assert_eq!(
        eligibility.blocking_signers,
        vec![three_steps.signers[0], three_steps.signers[1]]
    );
}

#[rstest]
fn completing_out_of_turn_fails_without_mutation(mut three_steps: Fixture) {
    let before = three_steps.chain.clone();
    let step = three_steps.step_id(2);
    let result = three_steps.chain.complete(&step, LedgerEntryId::random(), at(1));
    assert_eq!(
        result,
        Err(TransitionError::OutOfSequence { blocking_signers: vec![three_steps.signers[0]] })
    );
    assert_eq!(three_steps.chain, before);
}

#[rstest]
fn completing_in_order_reaches_signed(mut three_steps: Fixture) {
    for order in 1..=3 {
        let step = three_steps.step_id(order);
        three_steps
            .chain
            .complete(&step, LedgerEntryId::random(), at(1))
            .expect("in-order completion");
        let expected = if order == 3 {
            DocumentStatus::Signed
        } else {
            DocumentStatus::PendingSign
        };
        assert_eq!(three_steps.chain.document_status(), expected);
    }
    assert!(three_steps.chain.current().is_none());
}

#[rstest]
fn completing_twice_is_refused(mut three_steps: Fixture) {
    let step = three_steps.step_id(1);
    three_steps
        .chain
        .complete(&step, LedgerEntryId::random(), at(1))
        .expect("first completion");
    assert_eq!(
        three_steps.chain.complete(&step, LedgerEntryId::random(), at(2)),
        Err(TransitionError::NotPending { status: StepStatus::Completed })
    );
}

#[rstest]
fn rejection_cascades_to_later_pending_steps(mut three_steps: Fixture) {
    let first = three_steps.step_id(1);
    three_steps
        .chain
        .complete(&first, LedgerEntryId::random(), at(1))
        .expect("first completion");
    let second = three_steps.step_id(2);
    let cascaded = three_steps.chain.reject(&second, at(2)).expect("rejection");

    assert_eq!(cascaded, vec![three_steps.step_id(3)]);
    assert_eq!(three_steps.status(1), StepStatus::Completed);
    assert_eq!(three_steps.status(2), StepStatus::Rejected);
    assert_eq!(three_steps.status(3), StepStatus::Rejected);
    assert_eq!(three_steps.chain.document_status(), DocumentStatus::Rejected);

    let third = three_steps.step_id(3);
    assert_eq!(
        three_steps.chain.complete(&third, LedgerEntryId::random(), at(3)),
        Err(TransitionError::NotPending { status: StepStatus::Rejected })
    );
}

#[rstest]
fn current_step_is_first_pending(mut three_steps: Fixture) {
    let first = three_steps.step_id(1);
    three_steps
        .chain
        .complete(&first, LedgerEntryId::random(), at(1))
        .expect("first completion");
    assert_eq!(
        three_steps.chain.current().map(|step| step.id),
        Some(three_steps.step_id(2))
    );
}

/// Every interleaving of completion attempts keeps the ordering invariant.
#[rstest]
#[case([1, 2, 3])]
#[case([1, 3, 2])]
#[case([2, 1, 3])]
#[case([2, 3, 1])]
#[case([3, 1, 2])]
#[case([3, 2, 1])]
fn ordering_invariant_holds_for_any_attempt_sequence(
    mut three_steps: Fixture,
    #[case] attempts: [usize; 3],
) {
    for _round in 0..3 {
        for order in attempts {
            let step = three_steps.step_id(order);
            let _outcome = three_steps.chain.complete(&step, LedgerEntryId::random(), at(1));
            let statuses: Vec<StepStatus> =
                three_steps.chain.steps().iter().map(|s| s.status).collect();
            for (index, status) in statuses.iter().enumerate() {
                if *status == StepStatus::Completed {
                    assert!(
                        statuses
                            .iter()
                            .take(index)
                            .all(|earlier| *earlier == StepStatus::Completed)
                    );
                }
            }
        }
    }
    assert_eq!(three_steps.chain.document_status(), DocumentStatus::Signed);
}

fn document(status: DocumentStatus, revision: i64) -> Document {
    Document {
        id: DocumentId::random(),
        title: "Budget 2026".to_owned(),
        document_number: None,
        owner_id: UserId::random(),
        category: None,
        current_file_key: "owner/original.pdf".to_owned(),
        original_hash: Some(DocumentHash::of(b"original")),
        status,
        revision,
        created_at: at(0),
        updated_at: at(0),
    }
}

fn entry_for(step: &WorkflowStep, action: LedgerAction) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::random(),
        document_id: step.document_id,
        signer_id: step.signer_id,
        step_order: step.step_order,
        action,
        document_hash: Some(DocumentHash::of(b"stamped")),
        signer: SignerSnapshot::default(),
        verification_code: VerificationCode::generate(),
        rejection_reason: None,
        signature_asset_id: None,
        file_key: Some("signed/round.pdf".to_owned()),
        signed_at: at(5),
    }
}

#[rstest]
fn attachment_requires_a_draft(three_steps: Fixture) {
    let snapshot = WorkflowSnapshot {
        document: document(DocumentStatus::Signed, 0),
        chain: StepChain::default(),
    };
    let commit = AttachWorkflow {
        document_id: snapshot.document.id,
        expected_revision: 0,
        steps: three_steps.chain.into_steps(),
        attached_at: at(1),
    };
    assert_eq!(
        apply_attachment(snapshot, commit),
        Err(CommitConflict::InvalidDocumentState { status: DocumentStatus::Signed })
    );
}

#[rstest]
fn attachment_moves_draft_to_pending_sign(three_steps: Fixture) {
    let snapshot = WorkflowSnapshot {
        document: document(DocumentStatus::Draft, 0),
        chain: StepChain::default(),
    };
    let commit = AttachWorkflow {
        document_id: snapshot.document.id,
        expected_revision: 0,
        steps: three_steps.chain.into_steps(),
        attached_at: at(1),
    };
    let outcome = apply_attachment(snapshot, commit).expect("attachment");
    assert_eq!(outcome.snapshot.document.status, DocumentStatus::PendingSign);
    assert_eq!(outcome.snapshot.document.revision, 1);
    assert_eq!(outcome.changed_steps.len(), 3);
}

#[rstest]
fn completion_with_stale_revision_is_refused(three_steps: Fixture) {
    let step = three_steps.chain.steps().first().cloned().expect("first step");
    let snapshot = WorkflowSnapshot {
        document: document(DocumentStatus::PendingSign, 4),
        chain: three_steps.chain,
    };
    let commit = CompletionCommit {
        document_id: snapshot.document.id,
        expected_revision: 3,
        step_id: step.id,
        entry: entry_for(&step, LedgerAction::Signed),
        new_file_key: "signed/round.pdf".to_owned(),
    };
    assert_eq!(
        apply_completion(snapshot, &commit),
        Err(CommitConflict::RevisionMismatch { expected: 3, actual: 4 })
    );
}

#[rstest]
fn completion_advances_pointer_and_revision(three_steps: Fixture) {
    let step = three_steps.chain.steps().first().cloned().expect("first step");
    let snapshot = WorkflowSnapshot {
        document: document(DocumentStatus::PendingSign, 1),
        chain: three_steps.chain,
    };
    let commit = CompletionCommit {
        document_id: snapshot.document.id,
        expected_revision: 1,
        step_id: step.id,
        entry: entry_for(&step, LedgerAction::Signed),
        new_file_key: "signed/round.pdf".to_owned(),
    };
    let outcome = apply_completion(snapshot, &commit).expect("completion");
    assert_eq!(outcome.snapshot.document.current_file_key, "signed/round.pdf");
    assert_eq!(outcome.snapshot.document.revision, 2);
    assert_eq!(outcome.snapshot.document.status, DocumentStatus::PendingSign);
    assert_eq!(
        outcome.snapshot.chain.step(&step.id).and_then(|s| s.signature_ref),
        Some(commit.entry.id)
    );
}

#[rstest]
fn rejection_on_closed_document_is_refused(three_steps: Fixture) {
    let step = three_steps.chain.steps().first().cloned().expect("first step");
    let snapshot = WorkflowSnapshot {
        document: document(DocumentStatus::Rejected, 2),
        chain: three_steps.chain,
    };
    let commit = RejectionCommit {
        document_id: snapshot.document.id,
        expected_revision: 2,
        step_id: step.id,
        entry: entry_for(&step, LedgerAction::Rejected),
    };
    assert_eq!(
        apply_rejection(snapshot, &commit),
        Err(CommitConflict::InvalidDocumentState { status: DocumentStatus::Rejected })
    );
}

#[rstest]
#[case(RequiredAction::Sign, LedgerAction::Signed)]
#[case(RequiredAction::Approve, LedgerAction::Approved)]
#[case(RequiredAction::Review, LedgerAction::Signed)]
fn required_action_maps_to_ledger_action(
    #[case] action: RequiredAction,
    #[case] expected: LedgerAction,
) {
    assert_eq!(action.ledger_action(), expected);
}
