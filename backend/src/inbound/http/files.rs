//! Serve blobs behind signed URLs.
//!
//! ```text
//! GET /files/{bucket}/{key}?expires=<unix seconds>&token=<hex>
//! ```
//!
//! The route sits outside the session scope: the token is the credential.

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use actix_web::{HttpResponse, get, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::domain::ports::{BlobStorageError, Bucket, SignedUrl};
use crate::domain::{Error, SigningError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Deserialize)]
struct FilePath {
    bucket: String,
    key: String,
}

/// Signature carried in the query string.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// Expiry as Unix seconds.
    pub expires: i64,
    /// Hex token minted with the URL.
    pub token: String,
}

const fn content_type(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Original | Bucket::Signed => "application/pdf",
        Bucket::Signatures => "image/png",
    }
}

fn map_fetch_error(error: BlobStorageError) -> Error {
    match error {
        BlobStorageError::Expired => {
            Error::forbidden("link expired").with_details(serde_json::json!({
                "code": "link_expired",
            }))
        }
        BlobStorageError::InvalidToken => {
            Error::forbidden("link signature mismatch").with_details(serde_json::json!({
                "code": "link_invalid",
            }))
        }
        BlobStorageError::NotFound { .. } => SigningError::FileUnavailable.into(),
        BlobStorageError::InvalidKey { key } => {
            SigningError::validation("key", format!("invalid object key: {key}")).into()
        }
        BlobStorageError::Connection { message } => {
            warn!(%message, "blob storage unreachable");
            Error::service_unavailable("blob storage unavailable")
        }
        BlobStorageError::Io { message } => {
            warn!(%message, "blob read failed");
            Error::internal("blob read failed")
        }
    }
}

/// Stream one object if its signed URL is still valid.
#[utoipa::path(
    get,
    path = "/files/{bucket}/{key}",
    params(
        ("bucket" = String, Path, description = "original, signed or signatures"),
        ("key" = String, Path, description = "Object key"),
        ("expires" = i64, Query, description = "Expiry, Unix seconds"),
        ("token" = String, Query, description = "URL signature")
    ),
    responses(
        (status = 200, description = "Object bytes", content_type = "application/pdf"),
        (status = 400, description = "Malformed key", body = ErrorSchema),
        (status = 403, description = "Expired or forged link", body = ErrorSchema),
        (status = 404, description = "Unknown bucket or object", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["files"],
    operation_id = "fetchFile",
    security([])
)]
#[get("/files/{bucket}/{key:.*}")]
pub async fn fetch_file(
    state: web::Data<HttpState>,
    path: web::Path<FilePath>,
    query: web::Query<FileQuery>,
) -> ApiResult<HttpResponse> {
    let FilePath { bucket, key } = path.into_inner();
    let bucket: Bucket = bucket
        .parse()
        .map_err(|_| Error::from(SigningError::FileUnavailable))?;
    let FileQuery { expires, token } = query.into_inner();
    let expires_at = DateTime::<Utc>::from_timestamp(expires, 0)
        .ok_or_else(|| SigningError::validation("expires", "expiry out of range"))?;
    let url = SignedUrl {
        bucket,
        key,
        expires_at,
        token,
    };

    let bytes = state.blobs.fetch(&url).await.map_err(map_fetch_error)?;
    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, HeaderValue::from_static(content_type(bucket))))
        .insert_header((CACHE_CONTROL, HeaderValue::from_static("private, no-store")))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::ports::BlobStorage;
    use crate::domain::service_test_helpers::fixture_timestamp;
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::test_app;
    use crate::outbound::storage::{MemoryBlobStorage, UrlSigner};
    use crate::test_support::FixedClock;

    struct Store {
        clock: Arc<FixedClock>,
        blobs: Arc<MemoryBlobStorage>,
    }

    #[fixture]
    fn store() -> Store {
        let clock = Arc::new(FixedClock::at(fixture_timestamp()));
        let signer = UrlSigner::new(b"files route secret".to_vec(), clock.clone());
        Store {
            clock,
            blobs: Arc::new(MemoryBlobStorage::new(signer)),
        }
    }

    async fn issued(store: &Store, bucket: Bucket, key: &str, bytes: &[u8]) -> SignedUrl {
        store
            .blobs
            .put(bucket, key, bytes.to_vec())
            .await
            .expect("put");
        store
            .blobs
            .signed_url(bucket, key, Duration::from_secs(300))
            .await
            .expect("signed url")
            .expect("object exists")
    }

    macro_rules! app_for {
        ($store:expr) => {
            actix_test::init_service(
                test_app(HttpState::new(HttpStatePorts::fixtures($store.blobs.clone())))
                    .service(fetch_file),
            )
            .await
        };
    }

    #[rstest]
    #[case(Bucket::Signed, "doc-1/doc-1_step1.pdf", "application/pdf")]
    #[case(Bucket::Signatures, "user-1/signature.png", "image/png")]
    #[actix_web::test]
    async fn valid_links_serve_the_object(
        store: Store,
        #[case] bucket: Bucket,
        #[case] key: &str,
        #[case] expected_type: &str,
    ) {
        let url = issued(&store, bucket, key, b"object bytes").await;
        let app = app_for!(store);

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(&url.path()).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some(expected_type)
        );
        assert_eq!(
            response
                .headers()
                .get(CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("private, no-store")
        );
        let body = actix_test::read_body(response).await;
        assert_eq!(body.as_ref(), b"object bytes");
    }

    #[rstest]
    #[actix_web::test]
    async fn tampered_tokens_are_forbidden(store: Store) {
        let url = issued(&store, Bucket::Original, "doc.pdf", b"%PDF").await;
        let forged = SignedUrl {
            token: "0".repeat(url.token.len()),
            ..url
        };
        let app = app_for!(store);

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(&forged.path()).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["code"], json!("link_invalid"));
    }

    #[rstest]
    #[actix_web::test]
    async fn expired_links_are_forbidden(store: Store) {
        let url = issued(&store, Bucket::Original, "doc.pdf", b"%PDF").await;
        store.clock.advance(Duration::from_secs(301));
        let app = app_for!(store);

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(&url.path()).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["code"], json!("link_expired"));
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_buckets_are_not_found(store: Store) {
        let app = app_for!(store);

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/files/drafts/doc.pdf?expires=1800000000&token=abc")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
