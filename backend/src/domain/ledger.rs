//! Append-only hash-chain ledger records.
//!
//! One entry is written per completed or rejected step. Entries carry the
//! SHA-256 of the artifact produced by that round, a snapshot of the signer's
//! position, and the verification code printed into the QR payload.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{
    DocumentId, LedgerEntryId, SignatureAssetId, SignerSnapshot, StepOrder, UserId,
};

/// Bytes of entropy in a verification code.
const VERIFICATION_CODE_BYTES: usize = 24;

/// Hex-encoded SHA-256 fingerprint of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHash(String);

/// Error returned when a stored hash is not 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document hash must be 64 lowercase hex characters")]
pub struct InvalidDocumentHash;

impl DocumentHash {
    /// Fingerprint the exact bytes supplied.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Accept a previously computed fingerprint.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidDocumentHash> {
        let value = value.into();
        let well_formed = value.len() == 64
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(value))
        } else {
            Err(InvalidDocumentHash)
        }
    }

    /// Hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DocumentHash> for String {
    fn from(value: DocumentHash) -> Self {
        value.0
    }
}

impl TryFrom<String> for DocumentHash {
    type Error = InvalidDocumentHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Opaque capability token resolving to one ledger entry.
///
/// Codes are drawn from the operating system RNG and never derived from
/// document or sequence identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

/// Error returned when a presented code cannot possibly be valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("verification code is malformed")]
pub struct MalformedVerificationCode;

impl VerificationCode {
    /// Draw a fresh code.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; VERIFICATION_CODE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Validate a code presented by a caller.
    ///
    /// Only the alphabet and length are checked; existence is a ledger lookup.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, MalformedVerificationCode> {
        let raw = value.as_ref().trim();
        let plausible = (16..=128).contains(&raw.len())
            && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if plausible {
            Ok(Self(raw.to_owned()))
        } else {
            Err(MalformedVerificationCode)
        }
    }

    /// Textual form embedded in URLs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    /// A `sign` or `review` step completed.
    Signed,
    /// An `approve` step completed.
    Approved,
    /// The step was rejected.
    Rejected,
}

/// Error raised when a stored action string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ledger action: {0}")]
pub struct UnknownLedgerAction(pub String);

impl LedgerAction {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signed => "signed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for LedgerAction {
    type Err = UnknownLedgerAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signed" => Ok(Self::Signed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownLedgerAction(other.to_owned())),
        }
    }
}

/// Immutable record of one signing action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Identifier.
    pub id: LedgerEntryId,
    /// Document the action applied to.
    pub document_id: DocumentId,
    /// Acting signer.
    pub signer_id: UserId,
    /// Order of the step acted on.
    pub step_order: StepOrder,
    /// Outcome.
    pub action: LedgerAction,
    /// Fingerprint of the artifact produced; absent for rejections.
    pub document_hash: Option<DocumentHash>,
    /// Position and department at the time of action.
    pub signer: SignerSnapshot,
    /// Capability token printed into the QR payload.
    pub verification_code: VerificationCode,
    /// Reason given for a rejection.
    pub rejection_reason: Option<String>,
    /// Signature image used, for completed steps.
    pub signature_asset_id: Option<SignatureAssetId>,
    /// Storage key of the artifact produced, for completed steps.
    pub file_key: Option<String>,
    /// Time of action.
    pub signed_at: DateTime<Utc>,
}

/// Sort entries into ledger order (ascending `signed_at`, then step order).
pub fn sort_ledger(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| {
        a.signed_at
            .cmp(&b.signed_at)
            .then_with(|| a.step_order.cmp(&b.step_order))
    });
}
