//! Secret key files shared by the session cookie and the signed file URLs.
//!
//! Key bytes are held in [`Zeroizing`] buffers and wiped once the caller has
//! derived what it needs from them.

use std::path::{Path, PathBuf};

use tracing::warn;
use zeroize::Zeroizing;

use super::BuildMode;

/// How strictly a key file is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFilePolicy {
    /// Smallest accepted key length in release builds.
    pub min_len: usize,
    /// Whether an unreadable file may be replaced by a random key.
    pub allow_ephemeral: bool,
}

/// Errors raised while loading a key file.
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    /// The file could not be read and no fallback is allowed.
    #[error("failed to read key at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is too short for release builds.
    #[error("key at {path} too short: need >= {min_len} bytes, got {length}")]
    TooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Outcome of loading a key file.
#[derive(Debug)]
pub enum LoadedKey {
    /// Bytes read from disk.
    File(Zeroizing<Vec<u8>>),
    /// The file was unreadable and the caller should generate a key.
    Ephemeral,
}

/// Read `path`, enforcing `policy` according to `mode`.
///
/// Debug builds always fall back to [`LoadedKey::Ephemeral`] on read
/// failure; release builds only when the policy allows it.
///
/// # Errors
///
/// [`KeyFileError::Read`] when the file is unreadable and no fallback is
/// allowed, and [`KeyFileError::TooShort`] for short keys in release builds.
pub fn load_key_file(
    path: &Path,
    mode: BuildMode,
    policy: KeyFilePolicy,
) -> Result<LoadedKey, KeyFileError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            let length = bytes.len();
            if mode == BuildMode::Release && length < policy.min_len {
                return Err(KeyFileError::TooShort {
                    path: path.to_path_buf(),
                    length,
                    min_len: policy.min_len,
                });
            }
            Ok(LoadedKey::File(bytes))
        }
        Err(error) if mode == BuildMode::Debug || policy.allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary key (dev only)"
            );
            Ok(LoadedKey::Ephemeral)
        }
        Err(source) => Err(KeyFileError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
