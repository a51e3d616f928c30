//! Stored handwritten-signature images.

use chrono::{DateTime, Utc};

use crate::domain::{SignatureAssetId, UserId};

/// One uploaded signature image. At most one per user is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureAsset {
    /// Identifier.
    pub id: SignatureAssetId,
    /// Owner.
    pub owner_id: UserId,
    /// Storage key in the signatures bucket.
    pub image_key: String,
    /// Whether this is the image used for new stamps.
    pub is_active: bool,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

/// A signature image after background removal and PNG re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSignature {
    /// PNG bytes with an alpha channel.
    pub png: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}
