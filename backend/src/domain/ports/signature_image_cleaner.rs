//! Port for turning an uploaded signature photo into a stampable PNG.

use crate::domain::CleanedSignature;

use super::define_port_error;

define_port_error! {
    /// Errors raised by image cleaning adapters.
    pub enum SignatureImageError {
        /// The upload is not a supported image.
        Decode { message: String } => "image could not be decoded: {message}",
        /// PNG encoding failed.
        Encode { message: String } => "image could not be encoded: {message}",
    }
}

/// Port for image clean-up.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureImageCleaner: Send + Sync {
    /// Decode, optionally strip the background, and re-encode as PNG.
    fn clean(
        &self,
        image: &[u8],
        remove_background: bool,
    ) -> Result<CleanedSignature, SignatureImageError>;
}
