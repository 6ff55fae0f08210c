//! Backend library modules.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the progress and
//! certificate services together with the ports they depend on, [`inbound`]
//! adapts HTTP requests onto those services and [`outbound`] implements the
//! driven ports against PostgreSQL, Redis, the document renderer, the
//! filesystem and SMTP.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
