//! Port for the PDF stamping engine.
//!
//! Stamping is CPU-bound and synchronous; services run it on the blocking
//! pool.

use chrono::{DateTime, Utc};

use crate::domain::{DocumentHash, Placement};

use super::define_port_error;

/// Everything needed to render one stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StampRequest {
    /// The latest artifact of the document.
    pub base_pdf: Vec<u8>,
    /// Where the signer clicked.
    pub placement: Placement,
    /// Signer display name.
    pub signer_name: String,
    /// Signer position, if known.
    pub signer_position: Option<String>,
    /// Date printed under the name.
    pub signed_at: DateTime<Utc>,
    /// Cleaned PNG of the handwritten signature.
    pub signature_png: Vec<u8>,
    /// URL encoded into the QR code.
    pub verify_url: String,
}

/// A freshly serialised artifact and its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedPdf {
    /// Serialised PDF.
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`.
    pub hash: DocumentHash,
}

impl StampedPdf {
    /// Wrap serialised bytes, fingerprinting them.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let hash = DocumentHash::of(&bytes);
        Self { bytes, hash }
    }
}

define_port_error! {
    /// Errors raised by stamping adapters.
    pub enum PdfStampError {
        /// The input is not a readable PDF.
        CorruptDocument { message: String } =>
            "corrupt document: {message}",
        /// The placement addresses a page the document does not have.
        PageOutOfRange { page_index: u32, page_count: usize } =>
            "page {page_index} is out of range for a {page_count}-page document",
        /// Image, font or serialisation failure.
        Render { message: String } =>
            "render failed: {message}",
    }
}

/// Port for reading and stamping PDFs.
#[cfg_attr(test, mockall::automock)]
pub trait PdfStamper: Send + Sync {
    /// Number of pages, or `CorruptDocument` when the bytes do not parse.
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfStampError>;

    /// Render the stamp onto the base PDF and re-serialise it.
    fn stamp(&self, request: StampRequest) -> Result<StampedPdf, PdfStampError>;
}
