//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for unit tests and when the
//! `test-support` feature is enabled.
//!
//! The in-memory adapters honour the same contracts as the PostgreSQL ones:
//! lesson completions are unique per (user, lesson), enrollment writes are
//! compare-and-swap on the revision, and certificates are unique per
//! enrollment and per code. Each adapter yields to the scheduler before
//! touching shared state so concurrent tests interleave realistically.

mod clock;
mod delivery;
mod learning_store;
mod pipeline;

pub use clock::MutableClock;
pub use delivery::{
    InMemoryCertificateStorage, InMemoryProgressCache, RecordingEmailSender, RecordingEventSink,
    StubDocumentRenderer,
};
pub use learning_store::InMemoryLearningStore;
pub use pipeline::{EnrolledLearner, TestPipeline, TestPipelineBuilder};

pub use crate::outbound::queue::InlineTaskDispatcher;
