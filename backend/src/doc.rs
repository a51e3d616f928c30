//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: every handler of the inbound HTTP layer
//! - **Schemas**: request and response bodies plus the error wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`]) that keep domain types free of
//!   utoipa derives
//! - **Security**: Session cookie authentication scheme
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! printed by the `openapi_dump` binary for external tooling.

use crate::inbound::http::documents::{CreateWorkflowBody, SignerBody, WorkflowStepsBody};
use crate::inbound::http::dto::{
    DocumentBody, EligibilityBody, LedgerEntryBody, RejectOutcomeBody, SignOutcomeBody,
    SignatureAssetBody, SignedUrlBody, StepBody, TaskBody, TimelineBody, TimelineEntryBody,
    TimelineStepBody, VerificationBody, VerifiedRoundBody, VerifiedStepBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::signing::{RejectStepBody, SignStepBody, TaskListBody};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie written once the identity provider has authenticated the user.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Document co-signing API",
        description = "Sequential signing of municipal documents with public verification."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::documents::create_draft,
        crate::inbound::http::documents::open_latest_file,
        crate::inbound::http::documents::document_timeline,
        crate::inbound::http::documents::create_workflow,
        crate::inbound::http::signing::list_tasks,
        crate::inbound::http::signing::step_eligibility,
        crate::inbound::http::signing::sign_step,
        crate::inbound::http::signing::reject_step,
        crate::inbound::http::signature::upload_signature,
        crate::inbound::http::signature::active_signature,
        crate::inbound::http::verify::verify_code,
        crate::inbound::http::files::fetch_file,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        DocumentBody,
        StepBody,
        LedgerEntryBody,
        SignedUrlBody,
        TimelineBody,
        TimelineStepBody,
        TimelineEntryBody,
        TaskBody,
        TaskListBody,
        EligibilityBody,
        SignStepBody,
        SignOutcomeBody,
        RejectStepBody,
        RejectOutcomeBody,
        SignerBody,
        CreateWorkflowBody,
        WorkflowStepsBody,
        SignatureAssetBody,
        VerificationBody,
        VerifiedStepBody,
        VerifiedRoundBody,
    )),
    tags(
        (name = "documents", description = "Owner-side drafts, files and workflows"),
        (name = "signing", description = "Signer tasks, signing and rejection"),
        (name = "signature", description = "Handwritten signature images"),
        (name = "verification", description = "Public QR verification"),
        (name = "files", description = "Signed, expiring file links"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[rstest]
    #[case("/api/v1/documents")]
    #[case("/api/v1/documents/{id}/workflow")]
    #[case("/api/v1/steps/{id}/sign")]
    #[case("/api/v1/steps/{id}/reject")]
    #[case("/api/v1/signature")]
    #[case("/api/v1/verify/{code}")]
    #[case("/files/{bucket}/{key}")]
    #[case("/health/ready")]
    fn openapi_lists_every_route(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[test]
    fn session_cookie_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
