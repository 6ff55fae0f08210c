//! Ports used to produce and deliver certificate documents.
//!
//! Rendering, storage and email all cross a network or filesystem boundary.
//! The issuer bounds rendering with a timeout and never calls any of them
//! inside a database transaction.

use async_trait::async_trait;

use crate::domain::{CertificateDocument, OutgoingEmail};

use super::define_port_error;

define_port_error! {
    /// Errors raised by document renderers.
    pub enum DocumentRenderError {
        /// The renderer could not be reached.
        Transport { message: String } => "document renderer unreachable: {message}",
        /// The renderer answered with an error.
        Rejected { status: u16, message: String } =>
            "document renderer rejected request with status {status}: {message}",
    }
}

define_port_error! {
    /// Errors raised by certificate storage adapters.
    pub enum CertificateStorageError {
        /// The storage path was rejected.
        InvalidPath { path: String } => "invalid certificate path: {path}",
        /// Writing the document failed.
        Io { message: String } => "certificate storage failed: {message}",
    }
}

define_port_error! {
    /// Errors raised by email senders.
    pub enum EmailSendError {
        /// The message could not be built from its parts.
        InvalidMessage { message: String } => "invalid email: {message}",
        /// The mail relay refused or failed the delivery.
        Transport { message: String } => "email delivery failed: {message}",
    }
}

/// Port that turns certificate fields into a printable document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, document: &CertificateDocument) -> Result<Vec<u8>, DocumentRenderError>;
}

/// Port that persists rendered documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateStorage: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing document, and return
    /// the reference stored on the certificate.
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<String, CertificateStorageError>;
}

/// Port that delivers HTML email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailSendError>;
}

/// Fixture renderer returning a fixed placeholder document.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDocumentRenderer;

#[async_trait]
impl DocumentRenderer for FixtureDocumentRenderer {
    async fn render(&self, document: &CertificateDocument) -> Result<Vec<u8>, DocumentRenderError> {
        Ok(format!("%PDF-fixture {}", document.code).into_bytes())
    }
}

/// Fixture storage that echoes the path as the reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCertificateStorage;

#[async_trait]
impl CertificateStorage for FixtureCertificateStorage {
    async fn store(&self, path: &str, _bytes: &[u8]) -> Result<String, CertificateStorageError> {
        Ok(path.to_owned())
    }
}

/// Fixture sender that drops every email.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEmailSender;

#[async_trait]
impl EmailSender for FixtureEmailSender {
    async fn send(&self, _email: &OutgoingEmail) -> Result<(), EmailSendError> {
        Ok(())
    }
}
