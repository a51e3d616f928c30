//! Owner-side document handlers.
//!
//! ```text
//! POST /api/v1/documents?title=..&documentNumber=..&category=..   (raw PDF body)
//! GET  /api/v1/documents/{id}/file
//! GET  /api/v1/documents/{id}/timeline
//! POST /api/v1/documents/{id}/workflow
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{CreateDraftRequest, CreateWorkflowRequest};
use crate::domain::{DocumentId, Error, RequiredAction, SignerAssignment};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{DocumentBody, SignedUrlBody, StepBody, TimelineBody};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_action, parse_id, parse_user_id, require_body,
};

/// Largest accepted PDF upload.
pub const MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

/// Query string of a draft upload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftQuery {
    pub title: Option<String>,
    pub document_number: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentPath {
    id: String,
}

/// One signer in a new workflow.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignerBody {
    #[schema(format = "uuid")]
    pub signer_id: String,
    /// `sign` (default), `approve` or `review`.
    #[schema(example = "sign")]
    pub action: Option<String>,
}

/// Request payload for sending a draft for signing.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowBody {
    /// Signers in signing order.
    pub signers: Vec<SignerBody>,
}

/// Steps created for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepsBody {
    pub steps: Vec<StepBody>,
}

fn document_id(path: web::Path<DocumentPath>) -> Result<DocumentId, Error> {
    parse_id(&path.into_inner().id, FieldName::new("documentId"))
}

fn parse_signers(signers: Vec<SignerBody>) -> Result<Vec<SignerAssignment>, Error> {
    signers
        .into_iter()
        .map(|signer| {
            let signer_id = parse_user_id(&signer.signer_id, FieldName::new("signers.signerId"))?;
            let action = match signer.action.as_deref() {
                Some(raw) => parse_action(raw, FieldName::new("signers.action"))?,
                None => RequiredAction::Sign,
            };
            Ok(SignerAssignment { signer_id, action })
        })
        .collect()
}

/// Upload a PDF as a new draft owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body(content = Vec<u8>, content_type = "application/pdf"),
    params(
        ("title" = String, Query, description = "Display title"),
        ("documentNumber" = Option<String>, Query, description = "Registry number"),
        ("category" = Option<String>, Query, description = "Free-form category")
    ),
    responses(
        (status = 201, description = "Draft created", body = DocumentBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 422, description = "Not a readable PDF", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["documents"],
    operation_id = "createDraft",
    security(("SessionCookie" = []))
)]
#[post("/documents")]
pub async fn create_draft(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CreateDraftQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let owner_id = session.require_user_id()?;
    let CreateDraftQuery {
        title,
        document_number,
        category,
    } = query.into_inner();
    let title = title.ok_or_else(|| missing_field_error(FieldName::new("title")))?;
    require_body(&body, FieldName::new("body"))?;

    let document = state
        .documents
        .create_draft(CreateDraftRequest {
            owner_id,
            title,
            document_number,
            category,
            pdf: body.to_vec(),
        })
        .await?;
    info!(document_id = %document.id, "draft uploaded");

    Ok(HttpResponse::Created().json(DocumentBody::from(document)))
}

/// Short-lived link to the latest artifact of a document.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/file",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Signed file URL", body = SignedUrlBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a participant", body = ErrorSchema),
        (status = 404, description = "Document or file not found", body = ErrorSchema)
    ),
    tags = ["documents"],
    operation_id = "openLatestFile",
    security(("SessionCookie" = []))
)]
#[get("/documents/{id}/file")]
pub async fn open_latest_file(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DocumentPath>,
) -> ApiResult<web::Json<SignedUrlBody>> {
    let actor_id = session.require_user_id()?;
    let document_id = document_id(path)?;
    let url = state
        .documents_query
        .open_latest_file(&actor_id, &document_id)
        .await?;
    Ok(web::Json(url.into()))
}

/// Steps and ledger entries of a document.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/timeline",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document timeline", body = TimelineBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a participant", body = ErrorSchema),
        (status = 404, description = "Document not found", body = ErrorSchema)
    ),
    tags = ["documents"],
    operation_id = "documentTimeline",
    security(("SessionCookie" = []))
)]
#[get("/documents/{id}/timeline")]
pub async fn document_timeline(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DocumentPath>,
) -> ApiResult<web::Json<TimelineBody>> {
    let actor_id = session.require_user_id()?;
    let document_id = document_id(path)?;
    let timeline = state
        .documents_query
        .timeline(&actor_id, &document_id)
        .await?;
    Ok(web::Json(timeline.into()))
}

/// Send a draft for signing through an ordered signer list.
#[utoipa::path(
    post,
    path = "/api/v1/documents/{id}/workflow",
    params(("id" = String, Path, description = "Document identifier")),
    request_body = CreateWorkflowBody,
    responses(
        (status = 201, description = "Workflow created", body = WorkflowStepsBody),
        (status = 400, description = "Invalid signer list", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the owner", body = ErrorSchema),
        (status = 404, description = "Document not found", body = ErrorSchema),
        (status = 409, description = "Document is not a draft", body = ErrorSchema)
    ),
    tags = ["documents"],
    operation_id = "createWorkflow",
    security(("SessionCookie" = []))
)]
#[post("/documents/{id}/workflow")]
pub async fn create_workflow(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DocumentPath>,
    payload: web::Json<CreateWorkflowBody>,
) -> ApiResult<HttpResponse> {
    let owner_id = session.require_user_id()?;
    let document_id = document_id(path)?;
    let signers = parse_signers(payload.into_inner().signers)?;

    let steps = state
        .workflow
        .create_workflow(CreateWorkflowRequest {
            document_id,
            owner_id,
            signers,
        })
        .await?;

    Ok(HttpResponse::Created().json(WorkflowStepsBody {
        steps: steps.into_iter().map(StepBody::from).collect(),
    }))
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
