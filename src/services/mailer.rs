use std::{future::Future, path::PathBuf};

use lettre::{
    address::AddressError,
    message::{
        header::{ContentType, ContentTypeErr},
        Attachment, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::{EmailSettings, SmtpSettings};

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("bad content type: {0}")]
    ContentType(#[from] ContentTypeErr),
    #[error("could not read attachment: {0}")]
    Attachment(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// Delivers one notification, one attempt.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse::<Mailbox>().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

impl SmtpMailer {
    /// Port 465 gets implicit TLS, anything else is upgraded with STARTTLS.
    pub fn new(smtp: &SmtpSettings, email: &EmailSettings) -> Result<Self, NotifyError> {
        let builder = if smtp.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        };

        let mut builder = builder.port(smtp.port);
        if !smtp.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: mailbox(&smtp.from)?,
            to: mailbox(&email.recipient)?,
        })
    }

    async fn build(&self, n: &Notification) -> Result<Message, NotifyError> {
        let attachment = match &n.attachment {
            Some(path) => {
                let bytes = tokio::fs::read(path).await?;
                let filename = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "chart.png".to_string());
                Some((filename, bytes))
            }
            None => None,
        };

        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(n.subject.clone());

        let Some((filename, bytes)) = attachment else {
            return Ok(builder
                .header(ContentType::TEXT_PLAIN)
                .body(n.body.clone())?);
        };

        let png = ContentType::parse("image/png")?;
        Ok(builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(n.body.clone()))
                .singlepart(Attachment::new(filename).body(bytes, png)),
        )?)
    }
}

impl Notifier for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.build(notification).await?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn settings(recipient: &str) -> (SmtpSettings, EmailSettings) {
        let smtp = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "alerts@example.com".to_string(),
            password: "hunter2".to_string(),
            from: "alerts@example.com".to_string(),
        };
        let email = EmailSettings {
            recipient: recipient.to_string(),
            currency: "R$".to_string(),
        };
        (smtp, email)
    }

    fn mailer() -> SmtpMailer {
        let (smtp, email) = settings("me@example.com");
        SmtpMailer::new(&smtp, &email).unwrap()
    }

    #[tokio::test]
    async fn plain_message_without_attachment() {
        let n = Notification::new("PETR4 sell signal", "price crossed 30.00");
        let raw = String::from_utf8(mailer().build(&n).await.unwrap().formatted()).unwrap();

        assert!(raw.contains("Subject: PETR4 sell signal"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(!raw.contains("multipart/mixed"));
        assert!(raw.contains("price crossed 30.00"));
    }

    #[tokio::test]
    async fn chart_is_attached_as_png() {
        let mut png = tempfile::Builder::new()
            .prefix("chart-")
            .suffix(".png")
            .tempfile()
            .unwrap();
        png.write_all(b"\x89PNG\r\n\x1a\nnot really a chart").unwrap();
        let filename = png.path().file_name().unwrap().to_string_lossy().into_owned();

        let n = Notification::new("PETR4 buy signal", "price crossed 25.00")
            .with_attachment(png.path());
        let raw = String::from_utf8(mailer().build(&n).await.unwrap().formatted()).unwrap();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("Content-Type: image/png"));
        assert!(raw.contains(&filename));
    }

    #[tokio::test]
    async fn missing_attachment_is_an_error() {
        let n = Notification::new("s", "b").with_attachment("/definitely/not/here/chart.png");
        assert!(matches!(
            mailer().build(&n).await,
            Err(NotifyError::Attachment(_))
        ));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let (smtp, email) = settings("not an address");
        match SmtpMailer::new(&smtp, &email) {
            Err(NotifyError::Address { address, .. }) => assert_eq!(address, "not an address"),
            Err(other) => panic!("expected address error, got {other:?}"),
            Ok(_) => panic!("expected address error"),
        }
    }
}
