//! Public verification of a scanned code.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::ports::{
    BlobStorage, KycStatusProvider, LedgerRepository, SignerDirectory, VerificationQuery,
    WorkflowRepository,
};
use crate::domain::service_errors::{map_directory_error, map_ledger_error, map_workflow_error};
use crate::domain::service_support::resolve_latest_file;
use crate::domain::{
    Error, SigningError, UserId, VerificationCode, VerificationInput, VerificationView,
};

const NO_SUCH_RECORD: &str = "no such verification record";

/// Service implementing [`VerificationQuery`].
#[derive(Clone)]
pub struct VerificationService {
    ledger: Arc<dyn LedgerRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    directory: Arc<dyn SignerDirectory>,
    kyc: Arc<dyn KycStatusProvider>,
    storage: Arc<dyn BlobStorage>,
    file_url_ttl: Duration,
}

impl VerificationService {
    /// Create the service. File links in the view expire after `file_url_ttl`.
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        directory: Arc<dyn SignerDirectory>,
        kyc: Arc<dyn KycStatusProvider>,
        storage: Arc<dyn BlobStorage>,
        file_url_ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            workflows,
            directory,
            kyc,
            storage,
            file_url_ttl,
        }
    }
}

#[async_trait]
impl VerificationQuery for VerificationService {
    async fn verify(&self, code: &str) -> Result<VerificationView, Error> {
        // Malformed and unknown codes are indistinguishable to the caller.
        let code = VerificationCode::parse(code)
            .map_err(|_| SigningError::not_found(NO_SUCH_RECORD))?;
        let scanned = self
            .ledger
            .find_by_verification_code(&code)
            .await
            .map_err(map_ledger_error)?
            .ok_or_else(|| SigningError::not_found(NO_SUCH_RECORD))?;
        let snapshot = self
            .workflows
            .load(&scanned.document_id)
            .await
            .map_err(map_workflow_error)?
            .ok_or_else(|| SigningError::not_found(NO_SUCH_RECORD))?;
        let entries = self
            .ledger
            .list_by_document(&scanned.document_id)
            .await
            .map_err(map_ledger_error)?;

        let mut user_ids: Vec<UserId> = snapshot
            .chain
            .steps()
            .iter()
            .map(|step| step.signer_id)
            .chain(entries.iter().map(|entry| entry.signer_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self
            .directory
            .find_profiles(&user_ids)
            .await
            .map_err(map_directory_error)?;
        let kyc = self
            .kyc
            .statuses(&user_ids)
            .await
            .map_err(map_directory_error)?;
        debug!(document_id = %scanned.document_id, rounds = entries.len(), "verification resolved");

        let view = VerificationView::assemble(VerificationInput {
            document: &snapshot.document,
            chain: &snapshot.chain,
            entries,
            profiles: &profiles,
            kyc: &kyc,
            scanned: &scanned,
        });
        // The history stays readable when the artifact cannot be linked.
        match resolve_latest_file(self.storage.as_ref(), &snapshot, self.file_url_ttl).await {
            Ok(url) => Ok(view.with_file_url(url)),
            Err(error) => {
                warn!(document_id = %scanned.document_id, %error, "verification file link unavailable");
                Ok(view)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{
        BlobStorageError, Bucket, LedgerRepositoryError, MockBlobStorage, MockKycStatusProvider,
        MockLedgerRepository, MockSignerDirectory, MockWorkflowRepository, SignedUrl,
    };
    use crate::domain::service_test_helpers::{fixture_timestamp, profiles, snapshot_with_signers};
    use crate::domain::{
        AggregateStatus, DocumentHash, ErrorCode, KycStatus, LedgerAction, LedgerEntry,
        LedgerEntryId, SignerSnapshot, StepOrder,
    };

    struct Mocks {
        ledger: MockLedgerRepository,
        workflows: MockWorkflowRepository,
        directory: MockSignerDirectory,
        kyc: MockKycStatusProvider,
        storage: MockBlobStorage,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                ledger: MockLedgerRepository::new(),
                workflows: MockWorkflowRepository::new(),
                directory: MockSignerDirectory::new(),
                kyc: MockKycStatusProvider::new(),
                storage: MockBlobStorage::new(),
            }
        }

        fn into_service(self) -> VerificationService {
            VerificationService::new(
                Arc::new(self.ledger),
                Arc::new(self.workflows),
                Arc::new(self.directory),
                Arc::new(self.kyc),
                Arc::new(self.storage),
                Duration::from_secs(300),
            )
        }
    }

    #[rstest]
    #[case::malformed("not a code!")]
    #[case::too_short("abc")]
    #[tokio::test]
    async fn malformed_codes_are_not_found_without_lookup(#[case] code: &str) {
        let mut mocks = Mocks::new();
        mocks.ledger.expect_find_by_verification_code().times(0);

        let error = mocks.into_service().verify(code).await.expect_err("not found");

        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.message(), NO_SUCH_RECORD);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_code_is_terminal_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .ledger
            .expect_find_by_verification_code()
            .times(1)
            .return_once(|_| Ok(None));

        let error = mocks
            .into_service()
            .verify(VerificationCode::generate().as_str())
            .await
            .expect_err("not found");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn ledger_outage_is_service_unavailable() {
        let mut mocks = Mocks::new();
        mocks
            .ledger
            .expect_find_by_verification_code()
            .return_once(|_| Err(LedgerRepositoryError::connection("refused")));

        let error = mocks
            .into_service()
            .verify(VerificationCode::generate().as_str())
            .await
            .expect_err("unavailable");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    /// Two signers, the first has signed; storage is left to the caller.
    fn first_round_signed() -> (Mocks, VerificationCode) {
        let signers = [UserId::random(), UserId::random()];
        let mut snapshot = snapshot_with_signers(UserId::random(), &signers);
        let first_step = snapshot.chain.steps().first().map(|s| s.id).expect("step");
        let entry = LedgerEntry {
            id: LedgerEntryId::random(),
            document_id: snapshot.document.id,
            signer_id: signers[0],
            step_order: StepOrder::FIRST,
            action: LedgerAction::Signed,
            document_hash: Some(DocumentHash::of(b"round one")),
            signer: SignerSnapshot::default(),
            verification_code: VerificationCode::generate(),
            rejection_reason: None,
            signature_asset_id: None,
            file_key: None,
            signed_at: fixture_timestamp(),
        };
        snapshot
            .chain
            .complete(&first_step, entry.id, fixture_timestamp())
            .expect("complete");
        let code = entry.verification_code.clone();

        let mut mocks = Mocks::new();
        let expected = code.clone();
        let scanned = entry.clone();
        mocks
            .ledger
            .expect_find_by_verification_code()
            .withf(move |requested| requested == &expected)
            .return_once(move |_| Ok(Some(scanned)));
        mocks
            .ledger
            .expect_list_by_document()
            .return_once(move |_| Ok(vec![entry]));
        mocks
            .workflows
            .expect_load()
            .return_once(move |_| Ok(Some(snapshot)));
        let directory_entries = profiles(&[(signers[0], "Fah S."), (signers[1], "Gun T.")]);
        mocks
            .directory
            .expect_find_profiles()
            .return_once(move |_| Ok(directory_entries));
        let first_signer = signers[0];
        mocks
            .kyc
            .expect_statuses()
            .return_once(move |_| Ok(HashMap::from([(first_signer, KycStatus::Approved)])));
        (mocks, code)
    }

    #[rstest]
    #[tokio::test]
    async fn reconstructs_chain_with_kyc_status() {
        let (mut mocks, code) = first_round_signed();
        let link = SignedUrl {
            bucket: Bucket::Signed,
            key: "signed_round_one.pdf".to_owned(),
            expires_at: fixture_timestamp(),
            token: "ab".repeat(32),
        };
        let minted = link.clone();
        mocks
            .storage
            .expect_signed_url()
            .withf(|bucket, _, ttl| {
                *bucket == Bucket::Signed && *ttl == Duration::from_secs(300)
            })
            .times(1)
            .return_once(move |_, _, _| Ok(Some(minted)));

        let view = mocks
            .into_service()
            .verify(code.as_str())
            .await
            .expect("view");

        assert_eq!(view.total_count, 2);
        assert_eq!(view.completed_count, 1);
        assert_eq!(view.aggregate, AggregateStatus::InProgress);
        assert_eq!(view.scanned.signer_name, "Fah S.");
        let kyc: Vec<_> = view.steps.iter().map(|step| step.kyc_status).collect();
        assert_eq!(kyc, [KycStatus::Approved, KycStatus::Unknown]);
        assert_eq!(view.file_url, Some(link));
        assert!(!view.verify_file_hash(b"unrelated upload").is_match());
    }

    #[rstest]
    #[case::artifact_missing(Ok(None))]
    #[case::storage_down(Err(BlobStorageError::connection("timed out")))]
    #[tokio::test]
    async fn history_survives_without_file_link(
        #[case] minted: Result<Option<SignedUrl>, BlobStorageError>,
    ) {
        let (mut mocks, code) = first_round_signed();
        mocks
            .storage
            .expect_signed_url()
            .times(1)
            .return_once(move |_, _, _| minted);

        let view = mocks
            .into_service()
            .verify(code.as_str())
            .await
            .expect("view");

        assert_eq!(view.completed_count, 1);
        assert_eq!(view.file_url, None);
    }
}
