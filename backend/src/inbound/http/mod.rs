//! HTTP inbound adapter exposing REST endpoints.

pub mod documents;
pub mod dto;
pub mod error;
pub mod files;
pub mod health;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod signature;
pub mod signing;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;
pub mod verify;

pub use error::ApiResult;
