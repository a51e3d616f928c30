//! Server construction and middleware wiring.

mod config;
mod settings;
mod state_builders;

pub use config::ServerConfig;
pub use settings::{AppSettings, SettingsError};
pub use state_builders::{Infrastructure, Persistence, build_http_state};

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use cosign_backend::Trace;
#[cfg(debug_assertions)]
use cosign_backend::doc::ApiDoc;
use cosign_backend::inbound::http::documents::{
    MAX_DOCUMENT_BYTES, create_draft, create_workflow, document_timeline, open_latest_file,
};
use cosign_backend::inbound::http::files::fetch_file;
use cosign_backend::inbound::http::health::{HealthState, live, ready};
use cosign_backend::inbound::http::signature::{active_signature, upload_signature};
use cosign_backend::inbound::http::signing::{
    list_tasks, reject_step, sign_step, step_eligibility,
};
use cosign_backend::inbound::http::state::HttpState;
use cosign_backend::inbound::http::verify::verify_code;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(create_draft)
        .service(open_latest_file)
        .service(document_timeline)
        .service(create_workflow)
        .service(list_tasks)
        .service(step_eligibility)
        .service(sign_step)
        .service(reject_step)
        .service(upload_signature)
        .service(active_signature)
        .service(verify_code);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::PayloadConfig::new(MAX_DOCUMENT_BYTES))
        .wrap(Trace)
        .service(api)
        .service(verify_code)
        .service(fetch_file)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        http_state,
    } = config;
    let http_state = web::Data::new(http_state);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    //! Routing tests for the assembled application.

    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    use cosign_backend::domain::{Error, ErrorCode, SigningSettings, VerificationCode};
    use cosign_backend::inbound::http::state::HttpStatePorts;
    use cosign_backend::outbound::storage::{MemoryBlobStorage, UrlSigner};

    use super::*;

    #[fixture]
    fn deps() -> AppDependencies {
        let signer = UrlSigner::ephemeral(Arc::new(DefaultClock));
        let ports = HttpStatePorts::fixtures(Arc::new(MemoryBlobStorage::new(signer)));
        let health = HealthState::new();
        health.mark_ready();
        AppDependencies {
            health_state: web::Data::new(health),
            http_state: web::Data::new(HttpState::new(ports)),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[rstest]
    #[case("/health/ready", StatusCode::OK)]
    #[case("/health/live", StatusCode::OK)]
    #[case("/api/v1/signing/tasks", StatusCode::UNAUTHORIZED)]
    #[case("/api/v1/verify/unknown", StatusCode::NOT_FOUND)]
    #[case("/files/signed/doc.pdf?expires=1&token=00", StatusCode::FORBIDDEN)]
    #[actix_web::test]
    async fn routes_are_mounted(
        deps: AppDependencies,
        #[case] uri: &str,
        #[case] status: StatusCode,
    ) {
        let app = actix_test::init_service(build_app(deps)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(uri).to_request(),
        )
        .await;

        assert_eq!(response.status(), status, "{uri}");
        assert!(response.headers().contains_key("trace-id"), "{uri}");
    }

    #[rstest]
    #[actix_web::test]
    async fn stamped_verify_links_reach_the_handler(deps: AppDependencies) {
        let base = "https://sign.example.org";
        let settings = SigningSettings {
            public_base_url: format!("{base}/"),
            signed_url_ttl: Duration::from_secs(300),
        };
        let link = settings.verify_url(VerificationCode::generate().as_str());
        let path = link.strip_prefix(base).expect("link under the public base");
        let app = actix_test::init_service(build_app(deps)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(path).to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        let error: Error = actix_test::read_body_json(response).await;
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.message(), "no such verification record");
    }
}
