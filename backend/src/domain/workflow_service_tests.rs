//! Tests for the workflow service.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    BlobStorageError, MockAuditSink, MockBlobStorage, MockPdfStamper,
    MockSignatureAssetRepository, MockSignerDirectory, MockWorkflowRepository, PdfStampError,
    SignedUrl, StampedPdf, WorkflowRepositoryError,
};
use crate::domain::service_test_helpers::{
    fixture_clock, fixture_timestamp, profile, profiles, snapshot_with_signers,
};
use crate::domain::{
    CommitConflict, DocumentHash, ErrorCode, RequiredAction, SignatureAsset, SignatureAssetId,
    SignerAssignment, apply_attachment, apply_completion, apply_rejection,
};

#[derive(Default)]
struct Mocks {
    workflows: MockWorkflowRepository,
    assets: MockSignatureAssetRepository,
    storage: MockBlobStorage,
    stamper: MockPdfStamper,
    directory: MockSignerDirectory,
    audit: MockAuditSink,
}

impl Mocks {
    fn allow_audit(mut self) -> Self {
        self.audit.expect_record().returning(|_| Ok(()));
        self
    }

    fn into_service(self) -> WorkflowService {
        WorkflowService::new(WorkflowServiceDeps {
            workflows: Arc::new(self.workflows),
            assets: Arc::new(self.assets),
            storage: Arc::new(self.storage),
            stamper: Arc::new(self.stamper),
            directory: Arc::new(self.directory),
            audit: Arc::new(self.audit),
            clock: fixture_clock(),
            settings: SigningSettings {
                public_base_url: "https://sign.example.org".to_owned(),
                signed_url_ttl: Duration::from_secs(300),
            },
        })
    }
}

struct ThreeSigners {
    owner: UserId,
    signers: [UserId; 3],
    snapshot: WorkflowSnapshot,
}

impl ThreeSigners {
    fn step_id(&self, index: usize) -> StepId {
        self.snapshot
            .chain
            .steps()
            .get(index)
            .map(|step| step.id)
            .expect("step exists")
    }

    fn complete(&mut self, index: usize) {
        let step_id = self.step_id(index);
        self.snapshot
            .chain
            .complete(&step_id, LedgerEntryId::random(), fixture_timestamp())
            .expect("complete in order");
    }
}

#[fixture]
fn three_signers() -> ThreeSigners {
    let owner = UserId::random();
    let signers = [UserId::random(), UserId::random(), UserId::random()];
    let snapshot = snapshot_with_signers(owner, &signers);
    ThreeSigners {
        owner,
        signers,
        snapshot,
    }
}

fn expect_snapshot(mocks: &mut Mocks, snapshot: &WorkflowSnapshot) {
    let document_id = snapshot.document.id;
    mocks
        .workflows
        .expect_find_document_for_step()
        .returning(move |_| Ok(Some(document_id)));
    let loaded = snapshot.clone();
    mocks
        .workflows
        .expect_load()
        .returning(move |_| Ok(Some(loaded.clone())));
}

fn active_asset(owner_id: UserId) -> SignatureAsset {
    SignatureAsset {
        id: SignatureAssetId::random(),
        owner_id,
        image_key: format!("{owner_id}/signature.png"),
        is_active: true,
        created_at: fixture_timestamp(),
    }
}

fn expect_files(mocks: &mut Mocks) {
    mocks.storage.expect_signed_url().returning(|bucket, key, _| {
        if bucket == Bucket::Signed {
            return Ok(None);
        }
        Ok(Some(SignedUrl {
            bucket,
            key: key.to_owned(),
            expires_at: fixture_timestamp(),
            token: "token".to_owned(),
        }))
    });
    mocks.storage.expect_fetch().returning(|url| {
        Ok(if url.bucket == Bucket::Signatures {
            b"signature png".to_vec()
        } else {
            b"%PDF base".to_vec()
        })
    });
}

fn sign_request(actor_id: UserId, step_id: StepId) -> SignStepRequest {
    SignStepRequest {
        actor_id,
        step_id,
        placement: Placement {
            page_index: 0,
            click_x: 300.0,
            click_y: 450.0,
            scale: 1.5,
        },
    }
}

#[rstest]
#[tokio::test]
async fn create_workflow_numbers_steps_densely() {
    let owner = UserId::random();
    let draft = snapshot_with_signers(owner, &[]);
    let document_id = draft.document.id;
    let signers = vec![
        SignerAssignment {
            signer_id: UserId::random(),
            action: RequiredAction::Sign,
        },
        SignerAssignment {
            signer_id: UserId::random(),
            action: RequiredAction::Approve,
        },
    ];
    let mut mocks = Mocks::default().allow_audit();
    let loaded = draft.clone();
    mocks
        .workflows
        .expect_load()
        .return_once(move |_| Ok(Some(loaded)));
    mocks
        .workflows
        .expect_attach_workflow()
        .withf(|commit| commit.expected_revision == 1)
        .times(1)
        .return_once(move |commit| {
            apply_attachment(draft, commit)
                .map(|outcome| outcome.snapshot)
                .map_err(Into::into)
        });

    let steps = mocks
        .into_service()
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id: owner,
            signers,
        })
        .await
        .expect("workflow created");

    let orders: Vec<u32> = steps.iter().map(|step| step.step_order.get()).collect();
    assert_eq!(orders, [1, 2]);
    assert!(steps.iter().all(|step| step.status == StepStatus::Pending));
    assert_eq!(steps.get(1).map(|s| s.required_action), Some(RequiredAction::Approve));
}

#[rstest]
#[case::empty(Vec::new())]
#[case::duplicate({
    let repeated = UserId::random();
    vec![
        SignerAssignment { signer_id: repeated, action: RequiredAction::Sign },
        SignerAssignment { signer_id: repeated, action: RequiredAction::Review },
    ]
})]
#[tokio::test]
async fn create_workflow_rejects_invalid_lists_before_writing(
    #[case] signers: Vec<SignerAssignment>,
) {
    let owner = UserId::random();
    let draft = snapshot_with_signers(owner, &[]);
    let document_id = draft.document.id;
    let mut mocks = Mocks::default();
    mocks
        .workflows
        .expect_load()
        .return_once(move |_| Ok(Some(draft)));
    mocks.workflows.expect_attach_workflow().times(0);

    let error = mocks
        .into_service()
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id: owner,
            signers,
        })
        .await
        .expect_err("validation");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.detail_code(), Some("validation_error"));
}

#[rstest]
#[tokio::test]
async fn create_workflow_refuses_self_signing() {
    let owner = UserId::random();
    let draft = snapshot_with_signers(owner, &[]);
    let document_id = draft.document.id;
    let mut mocks = Mocks::default();
    mocks
        .workflows
        .expect_load()
        .return_once(move |_| Ok(Some(draft)));
    mocks.workflows.expect_attach_workflow().times(0);

    let error = mocks
        .into_service()
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id: owner,
            signers: vec![SignerAssignment {
                signer_id: owner,
                action: RequiredAction::Sign,
            }],
        })
        .await
        .expect_err("self signing");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn create_workflow_is_owner_only(three_signers: ThreeSigners) {
    let mut draft = three_signers.snapshot.clone();
    draft.chain = crate::domain::StepChain::default();
    draft.document.status = DocumentStatus::Draft;
    let document_id = draft.document.id;
    let mut mocks = Mocks::default();
    mocks
        .workflows
        .expect_load()
        .return_once(move |_| Ok(Some(draft)));

    let error = mocks
        .into_service()
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id: UserId::random(),
            signers: vec![SignerAssignment {
                signer_id: UserId::random(),
                action: RequiredAction::Sign,
            }],
        })
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn create_workflow_refuses_documents_already_sent(three_signers: ThreeSigners) {
    let document_id = three_signers.snapshot.document.id;
    let mut mocks = Mocks::default();
    let loaded = three_signers.snapshot.clone();
    mocks
        .workflows
        .expect_load()
        .return_once(move |_| Ok(Some(loaded)));

    let error = mocks
        .into_service()
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id: three_signers.owner,
            signers: vec![SignerAssignment {
                signer_id: UserId::random(),
                action: RequiredAction::Sign,
            }],
        })
        .await
        .expect_err("already sent");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.detail_code(), Some("document_closed"));
}

#[rstest]
#[tokio::test]
async fn signing_out_of_turn_names_blockers_and_touches_nothing(three_signers: ThreeSigners) {
    let [first, second, _] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .directory
        .expect_find_profiles()
        .withf(move |ids| ids == [first])
        .return_once(move |_| Ok(profiles(&[(first, "Chai W.")])));
    mocks.assets.expect_find_active().times(0);
    mocks.stamper.expect_stamp().times(0);
    mocks.storage.expect_put().times(0);
    mocks.workflows.expect_commit_completion().times(0);

    let error = mocks
        .into_service()
        .sign_step(sign_request(second, three_signers.step_id(1)))
        .await
        .expect_err("out of sequence");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.detail_code(), Some("out_of_sequence"));
    let details = error.details().expect("details");
    assert_eq!(details["blockingSigners"], serde_json::json!(["Chai W."]));
}

#[rstest]
#[tokio::test]
async fn signing_requires_the_assigned_signer(three_signers: ThreeSigners) {
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);

    let error = mocks
        .into_service()
        .sign_step(sign_request(three_signers.owner, three_signers.step_id(0)))
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn signing_without_active_signature_blocks_before_render(three_signers: ThreeSigners) {
    let [first, ..] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks.assets.expect_find_active().return_once(|_| Ok(None));
    mocks.stamper.expect_stamp().times(0);
    mocks.storage.expect_fetch().times(0);

    let error = mocks
        .into_service()
        .sign_step(sign_request(first, three_signers.step_id(0)))
        .await
        .expect_err("no signature");

    assert_eq!(error.code(), ErrorCode::PreconditionFailed);
    assert_eq!(error.detail_code(), Some("no_active_signature"));
}

#[rstest]
#[case::zero_scale(0.0, 10.0)]
#[case::negative_click(1.0, -4.0)]
#[tokio::test]
async fn signing_validates_placement_first(#[case] scale: f64, #[case] click_x: f64) {
    let mut mocks = Mocks::default();
    mocks.workflows.expect_find_document_for_step().times(0);
    let mut request = sign_request(UserId::random(), StepId::random());
    request.placement.scale = scale;
    request.placement.click_x = click_x;

    let error = mocks
        .into_service()
        .sign_step(request)
        .await
        .expect_err("invalid placement");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn signing_commits_hash_of_uploaded_artifact(three_signers: ThreeSigners) {
    let [first, ..] = three_signers.signers;
    let step_id = three_signers.step_id(0);
    let document_id = three_signers.snapshot.document.id;
    let mut mocks = Mocks::default().allow_audit();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .assets
        .expect_find_active()
        .return_once(move |_| Ok(Some(active_asset(first))));
    mocks
        .directory
        .expect_find_profile()
        .return_once(move |_| Ok(Some(profile(first, "Chai W."))));
    expect_files(&mut mocks);
    mocks
        .stamper
        .expect_stamp()
        .withf(|request| {
            request.base_pdf == b"%PDF base"
                && request.signature_png == b"signature png"
                && request
                    .verify_url
                    .starts_with("https://sign.example.org/verify/")
                && request.signer_name == "Chai W."
        })
        .times(1)
        .return_once(|_| Ok(StampedPdf::new(b"%PDF stamped".to_vec())));
    mocks
        .storage
        .expect_put()
        .withf(move |bucket, key, bytes| {
            *bucket == Bucket::Signed
                && key.starts_with(&format!("signed_{document_id}_step1_"))
                && bytes.as_slice() == b"%PDF stamped"
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));
    let base = three_signers.snapshot.clone();
    mocks
        .workflows
        .expect_commit_completion()
        .withf(|commit| commit.expected_revision == 1)
        .times(1)
        .return_once(move |commit| {
            apply_completion(base, &commit)
                .map(|outcome| outcome.snapshot)
                .map_err(Into::into)
        });

    let outcome = mocks
        .into_service()
        .sign_step(sign_request(first, step_id))
        .await
        .expect("signed");

    assert_eq!(
        outcome.entry.document_hash,
        Some(DocumentHash::of(b"%PDF stamped"))
    );
    assert_eq!(outcome.entry.action, LedgerAction::Signed);
    assert_eq!(outcome.entry.signer.position.as_deref(), Some("Deputy Mayor"));
    assert_eq!(outcome.step.status, StepStatus::Completed);
    assert_eq!(outcome.document.status, DocumentStatus::PendingSign);
    assert_eq!(
        Some(outcome.document.current_file_key.as_str()),
        outcome.entry.file_key.as_deref()
    );
    assert!(outcome.verify_url.ends_with(outcome.entry.verification_code.as_str()));
    assert_eq!(
        outcome.entry.file_key,
        Some(format!(
            "signed_{document_id}_step1_{}.pdf",
            outcome.entry.verification_code.as_str()
        ))
    );
}

#[rstest]
#[tokio::test]
async fn corrupt_base_pdf_aborts_without_upload(three_signers: ThreeSigners) {
    let [first, ..] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .assets
        .expect_find_active()
        .return_once(move |_| Ok(Some(active_asset(first))));
    mocks
        .directory
        .expect_find_profile()
        .return_once(move |_| Ok(Some(profile(first, "Chai W."))));
    expect_files(&mut mocks);
    mocks
        .stamper
        .expect_stamp()
        .return_once(|_| Err(PdfStampError::corrupt_document("trailer not found")));
    mocks.storage.expect_put().times(0);
    mocks.workflows.expect_commit_completion().times(0);

    let error = mocks
        .into_service()
        .sign_step(sign_request(first, three_signers.step_id(0)))
        .await
        .expect_err("corrupt");

    assert_eq!(error.code(), ErrorCode::UnprocessableEntity);
}

#[rstest]
#[tokio::test]
async fn failed_upload_writes_no_ledger_entry(three_signers: ThreeSigners) {
    let [first, ..] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .assets
        .expect_find_active()
        .return_once(move |_| Ok(Some(active_asset(first))));
    mocks
        .directory
        .expect_find_profile()
        .return_once(move |_| Ok(Some(profile(first, "Chai W."))));
    expect_files(&mut mocks);
    mocks
        .stamper
        .expect_stamp()
        .return_once(|_| Ok(StampedPdf::new(b"%PDF stamped".to_vec())));
    mocks
        .storage
        .expect_put()
        .return_once(|_, _, _| Err(BlobStorageError::io("disk full")));
    mocks.workflows.expect_commit_completion().times(0);

    let error = mocks
        .into_service()
        .sign_step(sign_request(first, three_signers.step_id(0)))
        .await
        .expect_err("upload failed");

    assert_eq!(error.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn lost_race_surfaces_revision_conflict(three_signers: ThreeSigners) {
    let [first, ..] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .assets
        .expect_find_active()
        .return_once(move |_| Ok(Some(active_asset(first))));
    mocks
        .directory
        .expect_find_profile()
        .return_once(move |_| Ok(Some(profile(first, "Chai W."))));
    expect_files(&mut mocks);
    mocks
        .stamper
        .expect_stamp()
        .return_once(|_| Ok(StampedPdf::new(b"%PDF stamped".to_vec())));
    mocks.storage.expect_put().return_once(|_, _, _| Ok(()));
    mocks.workflows.expect_commit_completion().return_once(|_| {
        Err(WorkflowRepositoryError::from(
            CommitConflict::RevisionMismatch {
                expected: 1,
                actual: 2,
            },
        ))
    });

    let error = mocks
        .into_service()
        .sign_step(sign_request(first, three_signers.step_id(0)))
        .await
        .expect_err("conflict");

    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.detail_code(), Some("revision_mismatch"));
}

#[rstest]
#[tokio::test]
async fn rejection_requires_a_reason(three_signers: ThreeSigners) {
    let mut mocks = Mocks::default();
    mocks.workflows.expect_find_document_for_step().times(0);

    let error = mocks
        .into_service()
        .reject_step(RejectStepRequest {
            actor_id: three_signers.signers[0],
            step_id: three_signers.step_id(0),
            reason: "   ".to_owned(),
        })
        .await
        .expect_err("reason required");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn rejection_cascades_to_later_steps(mut three_signers: ThreeSigners) {
    three_signers.complete(0);
    let [_, second, _] = three_signers.signers;
    let step_id = three_signers.step_id(1);
    let third_step = three_signers.step_id(2);
    let mut mocks = Mocks::default().allow_audit();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .directory
        .expect_find_profile()
        .return_once(|_| Ok(None));
    let base = three_signers.snapshot.clone();
    mocks
        .workflows
        .expect_commit_rejection()
        .times(1)
        .return_once(move |commit| {
            apply_rejection(base, &commit)
                .map(|outcome| outcome.snapshot)
                .map_err(Into::into)
        });

    let outcome = mocks
        .into_service()
        .reject_step(RejectStepRequest {
            actor_id: second,
            step_id,
            reason: "incorrect figures".to_owned(),
        })
        .await
        .expect("rejected");

    assert_eq!(outcome.document.status, DocumentStatus::Rejected);
    assert_eq!(outcome.cascaded, vec![third_step]);
    assert_eq!(outcome.entry.action, LedgerAction::Rejected);
    assert!(outcome.entry.document_hash.is_none());
    assert_eq!(
        outcome.entry.rejection_reason.as_deref(),
        Some("incorrect figures")
    );
}

#[rstest]
#[tokio::test]
async fn can_act_reports_blockers_in_order(three_signers: ThreeSigners) {
    let [first, second, third] = three_signers.signers;
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);
    mocks
        .directory
        .expect_find_profiles()
        .return_once(move |_| Ok(profiles(&[(first, "Chai W."), (second, "Dao M.")])));

    let eligibility = mocks
        .into_service()
        .can_act(&third, &three_signers.step_id(2))
        .await
        .expect("eligibility");

    assert!(!eligibility.eligible);
    assert_eq!(eligibility.blocking_signers, ["Chai W.", "Dao M."]);
}

#[rstest]
#[tokio::test]
async fn can_act_is_hidden_from_outsiders(three_signers: ThreeSigners) {
    let mut mocks = Mocks::default();
    expect_snapshot(&mut mocks, &three_signers.snapshot);

    let error = mocks
        .into_service()
        .can_act(&UserId::random(), &three_signers.step_id(0))
        .await
        .expect_err("forbidden");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn task_list_marks_current_signer(mut three_signers: ThreeSigners) {
    three_signers.complete(0);
    let [first, second, third] = three_signers.signers;
    let owner = three_signers.owner;
    let mut mocks = Mocks::default();
    let listed = three_signers.snapshot.clone();
    mocks
        .workflows
        .expect_list_for_signer()
        .returning(move |_| Ok(vec![listed.clone()]));
    mocks.directory.expect_find_profiles().returning(move |_| {
        Ok(profiles(&[
            (owner, "Owner O."),
            (first, "Chai W."),
            (second, "Dao M."),
            (third, "Ek N."),
        ]))
    });
    let service = mocks.into_service();

    let second_tasks = service.list_tasks(&second).await.expect("tasks");
    let task = second_tasks.first().expect("one task");
    assert!(task.can_sign);
    assert!(task.waiting_for.is_empty());
    assert_eq!(task.owner_name, "Owner O.");
    assert_eq!((task.step.step_order.get(), task.total_steps), (2, 3));

    let third_tasks = service.list_tasks(&third).await.expect("tasks");
    let task = third_tasks.first().expect("one task");
    assert!(!task.can_sign);
    assert_eq!(task.waiting_for, ["Dao M."]);
}
