//! Driving port for public verification.

use async_trait::async_trait;

use crate::domain::{Error, VerificationView};

/// Driving port resolving a scanned code. Needs no authenticated actor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationQuery: Send + Sync {
    /// Reconstruct the document's chain from a verification code.
    async fn verify(&self, code: &str) -> Result<VerificationView, Error>;
}

/// Fixture implementation that knows no codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVerificationQuery;

#[async_trait]
impl VerificationQuery for FixtureVerificationQuery {
    async fn verify(&self, _code: &str) -> Result<VerificationView, Error> {
        Err(Error::not_found("no such verification record"))
    }
}
