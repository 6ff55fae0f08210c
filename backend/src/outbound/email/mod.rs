//! Email adapters for the [`EmailSender`] port.
//!
//! [`SmtpEmailSender`] relays HTML mail through an SMTP server with
//! `lettre`. [`LoggingEmailSender`] is wired when SMTP is not configured and
//! only records that a message would have been sent.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::domain::OutgoingEmail;
use crate::domain::ports::{EmailSendError, EmailSender};

/// SMTP connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// SMTP-backed email sender.
#[derive(Clone)]
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build a TLS relay transport for `settings`.
    pub fn new(settings: &SmtpSettings) -> Result<Self, EmailSendError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|err| EmailSendError::invalid_message(format!("invalid sender: {err}")))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|err| EmailSendError::transport(format!("SMTP relay error: {err}")))?;
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

/// Build the MIME message for an outgoing email.
fn build_message(from: &Mailbox, email: &OutgoingEmail) -> Result<Message, EmailSendError> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|err| EmailSendError::invalid_message(format!("invalid recipient: {err}")))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|err| EmailSendError::invalid_message(err.to_string()))
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailSendError> {
        let message = build_message(&self.from, email)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| EmailSendError::transport(err.to_string()))?;
        info!(subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Sender that logs instead of delivering.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailSendError> {
        info!(
            subject = %email.subject,
            bytes = email.html.len(),
            "SMTP not configured; email not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ada@example.com".to_owned(),
            subject: "Your certificate".to_owned(),
            html: "<p>Congratulations</p>".to_owned(),
        }
    }

    #[rstest]
    fn message_carries_html_body(email: OutgoingEmail) {
        let from: Mailbox = "Courses <noreply@example.com>".parse().expect("mailbox");
        let message = build_message(&from, &email).expect("message builds");
        let raw = String::from_utf8(message.formatted()).expect("utf-8 message");

        assert!(raw.contains("Subject: Your certificate"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("To: ada@example.com"));
    }

    #[rstest]
    fn invalid_recipient_is_rejected(mut email: OutgoingEmail) {
        email.to = "not an address".to_owned();
        let from: Mailbox = "noreply@example.com".parse().expect("mailbox");
        let err = build_message(&from, &email).expect_err("recipient rejected");
        assert!(matches!(err, EmailSendError::InvalidMessage { .. }));
    }

    #[rstest]
    fn invalid_sender_is_rejected() {
        let settings = SmtpSettings {
            host: "smtp.example.com".to_owned(),
            username: None,
            password: None,
            from: "nobody".to_owned(),
        };
        assert!(matches!(
            SmtpEmailSender::new(&settings),
            Err(EmailSendError::InvalidMessage { .. })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn logging_sender_accepts_everything(email: OutgoingEmail) {
        LoggingEmailSender.send(&email).await.expect("logged");
    }
}
