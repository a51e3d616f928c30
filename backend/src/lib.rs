//! Municipal document co-signing backend.
//!
//! Hexagonal layout: [`domain`] holds the workflow rules and ports,
//! [`outbound`] the adapters behind them and [`inbound`] the HTTP surface.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
