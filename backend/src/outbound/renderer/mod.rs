//! Reqwest-backed certificate renderer.
//!
//! The adapter posts the certificate fields as JSON to an HTML-to-PDF
//! rendering service and returns the response body. It owns transport details
//! only: request serialisation, client timeout and HTTP error mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::domain::CertificateDocument;
use crate::domain::ports::{DocumentRenderError, DocumentRenderer};

const USER_AGENT: &str = "course-progress-backend/0.1";

/// Renderer adapter calling one HTTP endpoint.
pub struct HttpDocumentRenderer {
    client: Client,
    endpoint: Url,
}

impl HttpDocumentRenderer {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    async fn render(&self, document: &CertificateDocument) -> Result<Vec<u8>, DocumentRenderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/pdf")
            .json(document)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        if body.is_empty() {
            return Err(DocumentRenderError::rejected(
                status.as_u16(),
                "renderer returned an empty document",
            ));
        }
        Ok(body.to_vec())
    }
}

fn map_transport_error(error: reqwest::Error) -> DocumentRenderError {
    if error.is_timeout() {
        DocumentRenderError::transport(format!("timed out: {error}"))
    } else {
        DocumentRenderError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DocumentRenderError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };
    DocumentRenderError::rejected(status.as_u16(), message)
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StatusCode::BAD_GATEWAY, b"upstream   exploded\n".as_slice(), "upstream exploded")]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, b"".as_slice(), "status 422")]
    fn status_errors_keep_code_and_preview(
        #[case] status: StatusCode,
        #[case] body: &[u8],
        #[case] expected_message: &str,
    ) {
        let error = map_status_error(status, body);
        assert_eq!(
            error,
            DocumentRenderError::rejected(status.as_u16(), expected_message)
        );
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), 163);
        assert!(preview.ends_with("..."));
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_renderer_maps_to_transport_error() {
        let endpoint = Url::parse("http://127.0.0.1:9/render").expect("valid url");
        let renderer =
            HttpDocumentRenderer::new(endpoint, Duration::from_millis(500)).expect("client");
        let document = CertificateDocument {
            code: "CERT-ABCDEFGHJKLM".to_owned(),
            student_name: "Ada".to_owned(),
            course_title: "Rust".to_owned(),
            completion_date: "16 October 2026".to_owned(),
        };

        let error = renderer.render(&document).await.expect_err("no listener");
        assert!(matches!(error, DocumentRenderError::Transport { .. }));
    }
}
