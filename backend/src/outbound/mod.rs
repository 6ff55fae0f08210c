//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits for various infrastructure concerns:
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **cache**: Redis-backed progress cache invalidation
//! - **queue**: Tokio-backed background task dispatch
//! - **renderer**: HTTP client for the certificate document renderer
//! - **storage**: filesystem storage for rendered certificate documents
//! - **email**: SMTP delivery for certificate notification emails
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub mod email;
pub mod persistence;
pub mod queue;
pub mod renderer;
pub mod storage;
