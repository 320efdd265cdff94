// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::MailError;
use crate::retry::{RetryPolicy, Sleeper, run_with_retry};

/// Content type of an OOXML word-processing document
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Subject prefix for lesson emails
pub const SUBJECT_PREFIX: &str = "[English Daily]";

/// Plain-text body sent with every lesson
pub const MAIL_BODY: &str = "Your English lesson document is attached below.";

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (submission port 587)
    StartTls,
    /// TLS from the first byte (port 465)
    Implicit,
}

impl SmtpSecurity {
    pub fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::StartTls => 587,
            SmtpSecurity::Implicit => 465,
        }
    }
}

/// SMTP account used to send lessons
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

/// Delivers one message with one attachment
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Address the message goes to
    fn recipient(&self) -> &str;

    async fn send(&self, subject: &str, body: &str, attachment: &Path) -> Result<(), MailError>;
}

/// Notifier backed by an authenticated SMTP submission
pub struct SmtpNotifier<'a> {
    settings: SmtpSettings,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    retry: RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> SmtpNotifier<'a> {
    pub fn new(
        settings: SmtpSettings,
        retry: RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Result<Self, MailError> {
        let builder = match settings.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            }
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
        };
        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.sender.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            settings,
            transport,
            retry,
            sleeper,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier<'_> {
    fn recipient(&self) -> &str {
        &self.settings.recipient
    }

    async fn send(&self, subject: &str, body: &str, attachment: &Path) -> Result<(), MailError> {
        let message = build_message(
            &self.settings.sender,
            &self.settings.recipient,
            subject,
            body,
            attachment,
        )?;

        let transport = &self.transport;
        let message = &message;
        run_with_retry(&self.retry, self.sleeper, "smtp send", move || async move {
            transport.send(message.clone()).await?;
            Ok::<_, MailError>(())
        })
        .await?;

        tracing::info!(recipient = %self.settings.recipient, "lesson email sent");
        Ok(())
    }
}

/// Subject line for an episode title
pub fn subject_for(title: &str) -> String {
    format!("{SUBJECT_PREFIX} {title}")
}

/// Compose a plain-text message carrying `attachment` as a docx file
pub fn build_message(
    sender: &str,
    recipient: &str,
    subject: &str,
    body: &str,
    attachment: &Path,
) -> Result<Message, MailError> {
    let content = std::fs::read(attachment).map_err(|e| MailError::Attachment {
        path: attachment.to_path_buf(),
        source: e,
    })?;
    let filename = attachment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lesson.docx".to_string());
    let content_type = ContentType::parse(DOCX_CONTENT_TYPE).expect("valid docx content type");

    let message = Message::builder()
        .from(parse_mailbox(sender)?)
        .to(parse_mailbox(recipient)?)
        .subject(subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body.to_string()))
                .singlepart(Attachment::new(filename).body(content, content_type)),
        )?;

    Ok(message)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e| MailError::Address {
        address: address.to_string(),
        source: e,
    })
}
