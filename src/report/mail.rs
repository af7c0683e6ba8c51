//! Recap email assembly and SMTP delivery.

use super::render::{render_html, render_plain, subject};
use super::{Recap, ReportError};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender: String,
    pub recipient: String,
    pub username: String,
    pub password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

fn mailbox(address: &str) -> Result<Mailbox, ReportError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| ReportError::Mail(e.into()))
}

/// Builds the `multipart/alternative` recap message (plain text first,
/// HTML second).
pub fn build_message(settings: &MailSettings, recap: &Recap) -> Result<Message, ReportError> {
    Message::builder()
        .from(mailbox(&settings.sender)?)
        .to(mailbox(&settings.recipient)?)
        .subject(subject(recap))
        .multipart(MultiPart::alternative_plain_html(
            render_plain(recap),
            render_html(recap),
        ))
        .map_err(|e| ReportError::Mail(e.into()))
}

/// STARTTLS submission with username/password credentials.
pub fn smtp_transport(settings: &MailSettings) -> Result<SmtpTransport, ReportError> {
    let transport = SmtpTransport::starttls_relay(&settings.smtp_host)
        .map_err(|e| ReportError::Mail(e.into()))?
        .port(settings.smtp_port)
        .credentials(Credentials::new(
            settings.username.clone(),
            settings.password.clone(),
        ))
        .build();
    Ok(transport)
}

pub fn send_message<T>(transport: &T, message: &Message) -> Result<(), ReportError>
where
    T: Transport,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    transport
        .send(message)
        .map_err(|e| ReportError::Mail(e.into()))?;
    info!("Recap email sent");
    Ok(())
}
