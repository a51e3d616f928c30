//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories translate between Diesel row structs and domain types and
//! hold no workflow rules of their own: commit paths lock the document row
//! and delegate to the shared rules in `domain::workflow`.
//!
//! Row structs (`models.rs`) and table definitions (`schema.rs`) stay private
//! to this module.
//!
//! # Example
//!
//! ```ignore
//! use cosign_backend::outbound::persistence::{DbPool, DieselWorkflowRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/cosign")).await?;
//! let workflows = DieselWorkflowRepository::new(pool);
//! ```

mod diesel_audit_sink;
mod diesel_basic_error_mapping;
mod diesel_ledger_repository;
mod diesel_signature_asset_repository;
mod diesel_signer_directory;
mod diesel_workflow_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_audit_sink::DieselAuditSink;
pub use diesel_ledger_repository::DieselLedgerRepository;
pub use diesel_signature_asset_repository::DieselSignatureAssetRepository;
pub use diesel_signer_directory::DieselSignerDirectory;
pub use diesel_workflow_repository::DieselWorkflowRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
