//! Signer identity and profile snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    /// The identifier was blank.
    #[error("user id must not be empty")]
    Empty,
    /// The identifier was not a UUID.
    #[error("user id must be a valid UUID")]
    Invalid,
}

/// Stable user identifier issued by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from its string form.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserIdError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(UserIdError::Empty);
        }
        if raw.trim() != raw {
            return Err(UserIdError::Invalid);
        }
        Uuid::parse_str(raw).map(Self).map_err(|_| UserIdError::Invalid)
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Profile data supplied by the role directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerProfile {
    /// The user this profile describes.
    pub user_id: UserId,
    /// Display name printed under the signature.
    pub full_name: String,
    /// Job title, if any.
    pub position: Option<String>,
    /// Organisational unit, if any.
    pub department: Option<String>,
}

impl SignerProfile {
    /// Freeze the position and department at the moment of action.
    #[must_use]
    pub fn snapshot(&self) -> SignerSnapshot {
        SignerSnapshot {
            position: self.position.clone(),
            department: self.department.clone(),
        }
    }
}

/// Position and department as recorded on a ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSnapshot {
    /// Job title at the time of action.
    pub position: Option<String>,
    /// Organisational unit at the time of action.
    pub department: Option<String>,
}

/// Identity-assurance status reported by the KYC collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    /// Identity verified.
    Approved,
    /// Submission awaiting review.
    Pending,
    /// Submission refused.
    Rejected,
    /// No submission on record.
    #[default]
    Unknown,
}

impl KycStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a stored status, mapping unrecognised values to `Unknown`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        match value {
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "rejected" => Self::Rejected,
            _ => Self::Unknown,
        }
    }
}
