//! Signer-side handlers.
//!
//! ```text
//! GET  /api/v1/signing/tasks
//! GET  /api/v1/steps/{id}/eligibility
//! POST /api/v1/steps/{id}/sign
//! POST /api/v1/steps/{id}/reject
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ports::{RejectStepRequest, SignStepRequest};
use crate::domain::{Error, StepId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{EligibilityBody, RejectOutcomeBody, SignOutcomeBody, TaskBody};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_placement};

#[derive(Debug, Deserialize)]
struct StepPath {
    id: String,
}

/// Where the signer clicked on the rendered page.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignStepBody {
    /// Zero-based page index.
    pub page_index: u32,
    /// Horizontal click offset in rendered pixels.
    pub click_x: f64,
    /// Vertical click offset in rendered pixels, from the top.
    pub click_y: f64,
    /// Rendered pixels per PDF point.
    pub scale: f64,
}

/// Why the signer refuses the document.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectStepBody {
    pub reason: String,
}

/// The caller's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskListBody {
    pub tasks: Vec<TaskBody>,
}

fn step_id(path: web::Path<StepPath>) -> Result<StepId, Error> {
    parse_id(&path.into_inner().id, FieldName::new("stepId"))
}

/// Every step assigned to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/signing/tasks",
    responses(
        (status = 200, description = "Signing tasks", body = TaskListBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["signing"],
    operation_id = "listSigningTasks",
    security(("SessionCookie" = []))
)]
#[get("/signing/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<TaskListBody>> {
    let signer_id = session.require_user_id()?;
    let tasks = state.workflow_query.list_tasks(&signer_id).await?;
    Ok(web::Json(TaskListBody {
        tasks: tasks.into_iter().map(TaskBody::from).collect(),
    }))
}

/// Whether the caller may act on a step now, and who is still ahead.
#[utoipa::path(
    get,
    path = "/api/v1/steps/{id}/eligibility",
    params(("id" = String, Path, description = "Step identifier")),
    responses(
        (status = 200, description = "Eligibility", body = EligibilityBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the step's signer", body = ErrorSchema),
        (status = 404, description = "Step not found", body = ErrorSchema)
    ),
    tags = ["signing"],
    operation_id = "stepEligibility",
    security(("SessionCookie" = []))
)]
#[get("/steps/{id}/eligibility")]
pub async fn step_eligibility(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<StepPath>,
) -> ApiResult<web::Json<EligibilityBody>> {
    let actor_id = session.require_user_id()?;
    let step_id = step_id(path)?;
    let eligibility = state.workflow_query.can_act(&actor_id, &step_id).await?;
    Ok(web::Json(eligibility.into()))
}

/// Stamp the latest artifact and complete the caller's step.
#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/sign",
    params(("id" = String, Path, description = "Step identifier")),
    request_body = SignStepBody,
    responses(
        (status = 200, description = "Step completed", body = SignOutcomeBody),
        (status = 400, description = "Invalid placement", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the step's signer", body = ErrorSchema),
        (status = 404, description = "Step or file not found", body = ErrorSchema),
        (status = 409, description = "Out of sequence, closed or changed concurrently", body = ErrorSchema),
        (status = 412, description = "No active signature image", body = ErrorSchema),
        (status = 422, description = "Not a readable PDF", body = ErrorSchema)
    ),
    tags = ["signing"],
    operation_id = "signStep",
    security(("SessionCookie" = []))
)]
#[post("/steps/{id}/sign")]
pub async fn sign_step(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<StepPath>,
    payload: web::Json<SignStepBody>,
) -> ApiResult<web::Json<SignOutcomeBody>> {
    let actor_id = session.require_user_id()?;
    let step_id = step_id(path)?;
    let SignStepBody {
        page_index,
        click_x,
        click_y,
        scale,
    } = payload.into_inner();
    let placement = parse_placement(page_index, click_x, click_y, scale)?;

    let outcome = state
        .workflow
        .sign_step(SignStepRequest {
            actor_id,
            step_id,
            placement,
        })
        .await?;
    info!(
        document_id = %outcome.document.id,
        step_id = %outcome.step.id,
        status = outcome.document.status.as_str(),
        "step signed"
    );
    Ok(web::Json(outcome.into()))
}

/// Reject the caller's step; later steps are rejected with it.
#[utoipa::path(
    post,
    path = "/api/v1/steps/{id}/reject",
    params(("id" = String, Path, description = "Step identifier")),
    request_body = RejectStepBody,
    responses(
        (status = 200, description = "Step rejected", body = RejectOutcomeBody),
        (status = 400, description = "Missing reason", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the step's signer", body = ErrorSchema),
        (status = 404, description = "Step not found", body = ErrorSchema),
        (status = 409, description = "Already closed or changed concurrently", body = ErrorSchema)
    ),
    tags = ["signing"],
    operation_id = "rejectStep",
    security(("SessionCookie" = []))
)]
#[post("/steps/{id}/reject")]
pub async fn reject_step(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<StepPath>,
    payload: web::Json<RejectStepBody>,
) -> ApiResult<web::Json<RejectOutcomeBody>> {
    let actor_id = session.require_user_id()?;
    let step_id = step_id(path)?;
    let outcome = state
        .workflow
        .reject_step(RejectStepRequest {
            actor_id,
            step_id,
            reason: payload.into_inner().reason,
        })
        .await?;
    info!(
        document_id = %outcome.document.id,
        step_id = %outcome.step.id,
        cascaded = outcome.cascaded.len(),
        "step rejected"
    );
    Ok(web::Json(outcome.into()))
}

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;
