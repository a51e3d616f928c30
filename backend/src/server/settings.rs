//! Application settings loaded via OrthoConfig.
//!
//! Every field can be set from the command line, a `COSIGN_*` environment
//! variable or a configuration file. Unset fields fall back to local
//! development defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORAGE_ROOT: &str = "./var/blobs";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 300;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    /// A zero TTL would mint URLs that are already expired.
    #[error("signed URL TTL must be positive")]
    ZeroTtl,
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COSIGN")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Root directory of the filesystem blob store.
    pub storage_root: Option<PathBuf>,
    /// Base of the public verification URLs printed in QR codes.
    pub public_base_url: Option<String>,
    /// Lifetime of minted file URLs, in seconds.
    pub signed_url_ttl_secs: Option<u64>,
    /// Secret used to sign file URLs.
    pub storage_url_secret_file: Option<PathBuf>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    /// Blob store root, falling back to `./var/blobs`.
    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
    }

    /// Public base URL without a trailing slash.
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL)
            .trim_end_matches('/')
            .to_owned()
    }

    /// Lifetime of minted file URLs.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroTtl`] for a zero value.
    pub fn signed_url_ttl(&self) -> Result<Duration, SettingsError> {
        match self.signed_url_ttl_secs.unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS) {
            0 => Err(SettingsError::ZeroTtl),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    /// Configured database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
