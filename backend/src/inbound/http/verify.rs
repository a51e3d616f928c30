//! Public verification of a scanned QR code.
//!
//! ```text
//! GET /api/v1/verify/{code}
//! GET /verify/{code}
//! ```
//!
//! No session is required: the code itself is the capability. The root-level
//! route is the one printed in stamped QR codes.

use actix_web::{get, web};

use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::VerificationBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Reconstruct a document's signing history from a verification code.
#[utoipa::path(
    get,
    path = "/api/v1/verify/{code}",
    params(("code" = String, Path, description = "Verification code printed in the QR payload")),
    responses(
        (status = 200, description = "Verification view", body = VerificationBody),
        (status = 404, description = "No such verification record", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["verification"],
    operation_id = "verifyCode",
    security([])
)]
#[get("/verify/{code}")]
pub async fn verify_code(
    state: web::Data<HttpState>,
    code: web::Path<String>,
) -> ApiResult<web::Json<VerificationBody>> {
    let view = state.verification.verify(&code).await?;
    Ok(web::Json(view.into()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::{Bucket, MockVerificationQuery, SignedUrl};
    use crate::domain::service_test_helpers::{
        fixture_timestamp, profiles, snapshot_with_signers,
    };
    use crate::domain::{
        AggregateStatus, DocumentHash, KycStatus, LedgerAction, LedgerEntry, LedgerEntryId,
        SignerSnapshot, UserId, VerificationCode, VerificationInput, VerificationView,
    };
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::test_app;
    use crate::outbound::storage::{MemoryBlobStorage, UrlSigner};

    #[fixture]
    fn ports() -> HttpStatePorts {
        let signer = UrlSigner::ephemeral(Arc::new(mockable::DefaultClock));
        HttpStatePorts::fixtures(Arc::new(MemoryBlobStorage::new(signer)))
    }

    fn first_round_view() -> (VerificationCode, VerificationView) {
        let first = UserId::random();
        let second = UserId::random();
        let snapshot = snapshot_with_signers(UserId::random(), &[first, second]);
        let step = snapshot.chain.steps().first().cloned().expect("first step");
        let code = VerificationCode::generate();
        let entry = LedgerEntry {
            id: LedgerEntryId::random(),
            document_id: snapshot.document.id,
            signer_id: first,
            step_order: step.step_order,
            action: LedgerAction::Signed,
            document_hash: Some(DocumentHash::of(b"round one")),
            signer: SignerSnapshot {
                position: Some("Deputy Mayor".to_owned()),
                department: Some("Finance".to_owned()),
            },
            verification_code: code.clone(),
            rejection_reason: None,
            signature_asset_id: None,
            file_key: None,
            signed_at: fixture_timestamp(),
        };
        let names = profiles(&[(first, "Somchai Prasert"), (second, "Anong Srisuk")]);
        let kyc = HashMap::from([(first, KycStatus::Approved)]);
        let view = VerificationView::assemble(VerificationInput {
            document: &snapshot.document,
            chain: &snapshot.chain,
            entries: vec![entry.clone()],
            profiles: &names,
            kyc: &kyc,
            scanned: &entry,
        });
        (code, view)
    }

    #[rstest]
    #[actix_web::test]
    async fn verification_needs_no_session(mut ports: HttpStatePorts) {
        let (code, view) = first_round_view();
        let view = view.with_file_url(SignedUrl {
            bucket: Bucket::Signed,
            key: "signed_round_one.pdf".to_owned(),
            expires_at: fixture_timestamp(),
            token: "cd".repeat(32),
        });
        let expected = code.as_str().to_owned();
        let mut query = MockVerificationQuery::new();
        query
            .expect_verify()
            .withf(move |raw| raw == expected)
            .return_once(move |_| Ok(view));
        ports.verification = Arc::new(query);
        let app = actix_test::init_service(
            test_app(HttpState::new(ports)).service(web::scope("/api/v1").service(verify_code)),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/verify/{code}"))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: VerificationBody = actix_test::read_body_json(response).await;
        assert_eq!(body.completed_count, 1);
        assert_eq!(body.total_count, 2);
        assert_eq!(body.aggregate, AggregateStatus::InProgress.as_str());
        assert_eq!(body.scanned.signer_name, "Somchai Prasert");
        let current: Vec<bool> = body.steps.iter().map(|step| step.is_current).collect();
        assert_eq!(current, vec![false, true]);
        let link = body.file_url.expect("file link");
        assert!(link.url.starts_with("/files/signed/signed_round_one.pdf?expires="));
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_codes_are_not_found(ports: HttpStatePorts) {
        let app = actix_test::init_service(
            test_app(HttpState::new(ports)).service(web::scope("/api/v1").service(verify_code)),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/verify/not-a-code")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
