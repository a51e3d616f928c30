//! Handwritten signature image handlers.
//!
//! ```text
//! PUT /api/v1/signature?removeBackground=true   (raw PNG or JPEG body)
//! GET /api/v1/signature
//! ```

use actix_web::{get, put, web};
use serde::Deserialize;
use tracing::info;

use crate::domain::ports::UploadSignatureRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::SignatureAssetBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require_body};

/// Query string of a signature upload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignatureQuery {
    /// Keep only blue ink and make the paper transparent.
    #[serde(default)]
    pub remove_background: bool,
}

/// Replace the caller's active signature image.
#[utoipa::path(
    put,
    path = "/api/v1/signature",
    request_body(content = Vec<u8>, content_type = "image/png"),
    params(
        ("removeBackground" = Option<bool>, Query, description = "Extract blue ink from a photo")
    ),
    responses(
        (status = 200, description = "Signature stored and activated", body = SignatureAssetBody),
        (status = 400, description = "Not a decodable image", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["signature"],
    operation_id = "uploadSignature",
    security(("SessionCookie" = []))
)]
#[put("/signature")]
pub async fn upload_signature(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<UploadSignatureQuery>,
    body: web::Bytes,
) -> ApiResult<web::Json<SignatureAssetBody>> {
    let owner_id = session.require_user_id()?;
    require_body(&body, FieldName::new("body"))?;
    let asset = state
        .signatures
        .upload_signature(UploadSignatureRequest {
            owner_id,
            image: body.to_vec(),
            remove_background: query.remove_background,
        })
        .await?;
    info!(asset_id = %asset.id, "signature replaced");
    Ok(web::Json(asset.into()))
}

/// The caller's active signature image.
#[utoipa::path(
    get,
    path = "/api/v1/signature",
    responses(
        (status = 200, description = "Active signature", body = SignatureAssetBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "No active signature", body = ErrorSchema)
    ),
    tags = ["signature"],
    operation_id = "activeSignature",
    security(("SessionCookie" = []))
)]
#[get("/signature")]
pub async fn active_signature(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SignatureAssetBody>> {
    let owner_id = session.require_user_id()?;
    let asset = state.signatures_query.active_signature(&owner_id).await?;
    Ok(web::Json(asset.into()))
}
