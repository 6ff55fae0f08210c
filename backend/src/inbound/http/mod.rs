//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers translate requests into calls on the driving ports held by
//! [`state::HttpState`] and map domain errors through [`error`].

pub mod cache_control;
pub mod certificates;
pub mod error;
pub mod health;
pub mod identity;
pub mod progress;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
