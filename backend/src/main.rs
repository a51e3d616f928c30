//! Backend entry-point: loads settings, wires adapters and serves the API.

mod server;

use std::path::Path;
use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::{Clock, DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cosign_backend::domain::SigningSettings;
use cosign_backend::domain::ports::BlobStorage;
use cosign_backend::inbound::http::health::HealthState;
use cosign_backend::inbound::http::session_config::fingerprint::key_fingerprint;
use cosign_backend::inbound::http::session_config::key_file::{
    KeyFilePolicy, LoadedKey, load_key_file,
};
use cosign_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use cosign_backend::outbound::memory::MemoryStore;
use cosign_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use cosign_backend::outbound::storage::{FilesystemBlobStorage, UrlSigner};

use server::{AppSettings, Infrastructure, Persistence, ServerConfig, build_http_state};

const URL_SECRET_MIN_LEN: usize = 32;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("failed to load settings")?;
    let mode = BuildMode::from_debug_assertions();
    let session = session_settings_from_env(&DefaultEnv::new(), mode)
        .wrap_err("invalid session configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let signer = url_signer(settings.storage_url_secret_file.as_deref(), mode, clock.clone())?;
    let storage_root = settings.storage_root();
    let blobs: Arc<dyn BlobStorage> = Arc::new(
        FilesystemBlobStorage::open(&storage_root, signer)
            .wrap_err_with(|| format!("failed to open blob store at {}", storage_root.display()))?,
    );

    let persistence = match settings.database_url() {
        Some(url) => {
            if settings.run_migrations {
                run_pending_migrations(url).await?;
            }
            let pool = DbPool::new(PoolConfig::new(url)).await?;
            info!("using PostgreSQL persistence");
            Persistence::diesel(&pool)
        }
        None => {
            warn!("COSIGN_DATABASE_URL not set; state is kept in memory and lost on exit");
            Persistence::in_memory(&MemoryStore::new())
        }
    };

    let http_state = build_http_state(
        persistence,
        Infrastructure {
            blobs,
            clock,
            signing: SigningSettings {
                public_base_url: settings.public_base_url(),
                signed_url_ttl: settings.signed_url_ttl()?,
            },
        },
    );

    let config = ServerConfig::new(session, settings.bind_addr()?, http_state);
    let health_state = web::Data::new(HealthState::new());
    info!(bind_addr = %config.bind_addr(), "starting server");
    let server = server::create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.map_err(|err| eyre!("server terminated: {err}"))
}

/// Signer for file URLs from the configured secret, or a per-process one.
fn url_signer(path: Option<&Path>, mode: BuildMode, clock: Arc<dyn Clock>) -> Result<UrlSigner> {
    let Some(path) = path else {
        if matches!(mode, BuildMode::Release) {
            return Err(eyre!("COSIGN_STORAGE_URL_SECRET_FILE is required in release builds"));
        }
        warn!("using an ephemeral file URL secret; links die with the process");
        return Ok(UrlSigner::ephemeral(clock));
    };
    let policy = KeyFilePolicy {
        min_len: URL_SECRET_MIN_LEN,
        allow_ephemeral: false,
    };
    match load_key_file(path, mode, policy)? {
        LoadedKey::File(secret) => {
            info!(fingerprint = %key_fingerprint(&secret), "file URL secret loaded");
            Ok(UrlSigner::new(secret.to_vec(), clock))
        }
        LoadedKey::Ephemeral => Ok(UrlSigner::ephemeral(clock)),
    }
}
