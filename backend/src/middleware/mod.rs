//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route, currently the
//! trace identifier that correlates logs, error bodies and response headers.

pub mod trace;

pub use trace::Trace;
