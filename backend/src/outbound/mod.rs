//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel ORM
//! - **memory**: in-process implementations of the same ports
//! - **storage**: blob storage with signed, expiring URLs
//! - **pdf**: lopdf stamping engine
//! - **imaging**: signature photo clean-up
//! - **audit**: structured-log audit sink
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no workflow rules.

pub mod audit;
pub mod imaging;
pub mod memory;
pub mod pdf;
pub mod persistence;
pub mod storage;
