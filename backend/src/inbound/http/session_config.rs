//! Session cookie configuration.
//!
//! The cookie is shared with the identity provider, so the key and cookie
//! attributes must match what it writes. Debug builds fall back to lenient
//! defaults with a warning; release builds require every toggle explicitly.

pub mod fingerprint;
pub mod key_file;

use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use mockable::Env;
use tracing::warn;

use self::key_file::{KeyFileError, KeyFilePolicy, LoadedKey, load_key_file};

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
const COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
const SAMESITE_ENV: &str = "SESSION_SAMESITE";
const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";

/// Build mode for configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Defaults and warnings for missing or malformed toggles.
    Debug,
    /// Explicit, valid toggles required.
    Release,
}

impl BuildMode {
    /// The mode of the running binary.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cosign_backend::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub const fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Cookie settings the session middleware is built from.
pub struct SessionSettings {
    /// Signing and encryption key.
    pub key: Key,
    /// Whether cookies carry `Secure`.
    pub cookie_secure: bool,
    /// `SameSite` policy.
    pub same_site: SameSite,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    /// A required variable is missing.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// A variable holds an unparseable value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// The key file could not be used.
    #[error(transparent)]
    Key(#[from] KeyFileError),
    /// `SameSite=None` without `Secure`.
    #[error("SESSION_SAMESITE=None requires SESSION_COOKIE_SECURE=1")]
    InsecureSameSiteNone,
    /// Ephemeral keys in a release build.
    #[error("SESSION_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Build session settings from the environment.
///
/// # Errors
///
/// Release builds fail on any missing or malformed toggle, on a short or
/// unreadable key file, and on `SameSite=None` without `Secure`.
///
/// # Examples
///
/// ```rust
/// use cosign_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("cosign_session_key_example");
/// std::fs::write(&key_path, vec![b'a'; 64])?;
///
/// let key_path_value = key_path.to_string_lossy().into_owned();
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "SESSION_KEY_FILE" => Some(key_path_value.clone()),
///     "SESSION_COOKIE_SECURE" => Some("1".to_owned()),
///     "SESSION_SAMESITE" => Some("Strict".to_owned()),
///     "SESSION_ALLOW_EPHEMERAL" => Some("0".to_owned()),
///     _ => None,
/// });
///
/// let settings = session_settings_from_env(&env, BuildMode::Release)?;
/// assert!(settings.cookie_secure);
///
/// std::fs::remove_file(&key_path)?;
/// # Ok(())
/// # }
/// ```
pub fn session_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let toggles = Toggles { env, mode };
    let cookie_secure = toggles.flag(COOKIE_SECURE_ENV, true)?;
    let same_site = toggles.same_site(cookie_secure)?;
    let allow_ephemeral = toggles.flag(ALLOW_EPHEMERAL_ENV, false)?;
    if allow_ephemeral && mode == BuildMode::Release {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }

    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SESSION_KEY_DEFAULT_PATH.to_owned()),
    );
    let policy = KeyFilePolicy {
        min_len: SESSION_KEY_MIN_LEN,
        allow_ephemeral,
    };
    let key = match load_key_file(&path, mode, policy)? {
        LoadedKey::File(bytes) => Key::derive_from(&bytes),
        LoadedKey::Ephemeral => Key::generate(),
    };

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
    })
}

struct Toggles<'a, E> {
    env: &'a E,
    mode: BuildMode,
}

impl<E: Env> Toggles<'_, E> {
    fn lenient(&self) -> bool {
        self.mode == BuildMode::Debug
    }

    fn required(&self, name: &'static str) -> Result<Option<String>, SessionConfigError> {
        match self.env.string(name) {
            Some(value) => Ok(Some(value)),
            None if self.lenient() => {
                warn!(variable = name, "not set; using default");
                Ok(None)
            }
            None => Err(SessionConfigError::MissingEnv { name }),
        }
    }

    fn invalid<T>(
        &self,
        name: &'static str,
        value: String,
        expected: &'static str,
        fallback: T,
    ) -> Result<T, SessionConfigError> {
        if self.lenient() {
            warn!(variable = name, value = %value, "invalid value; using default");
            Ok(fallback)
        } else {
            Err(SessionConfigError::InvalidEnv {
                name,
                value,
                expected,
            })
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, SessionConfigError> {
        let Some(value) = self.required(name)? else {
            return Ok(default);
        };
        match parse_bool(&value) {
            Some(flag) => Ok(flag),
            None => self.invalid(name, value, BOOL_EXPECTED, default),
        }
    }

    fn same_site(&self, cookie_secure: bool) -> Result<SameSite, SessionConfigError> {
        let default = if self.lenient() {
            SameSite::Lax
        } else {
            SameSite::Strict
        };
        let Some(value) = self.required(SAMESITE_ENV)? else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" if cookie_secure => Ok(SameSite::None),
            "none" if self.lenient() => {
                warn!("SESSION_SAMESITE=None without Secure; browsers may drop the cookie");
                Ok(SameSite::None)
            }
            "none" => Err(SessionConfigError::InsecureSameSiteNone),
            _ => self.invalid(SAMESITE_ENV, value, SAMESITE_EXPECTED, default),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
