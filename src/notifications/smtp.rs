use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error};

use super::{Mailer, OutgoingEmail};
use crate::config::SmtpSettings;
use crate::error::NotifyError;

/// Sends mail through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, display_name: &str) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| {
                error!("Failed to configure SMTP relay {}: {e}", settings.host);
                NotifyError::Transport(e.to_string())
            })?
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        let address: lettre::Address = settings
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(settings.from.clone()))?;
        let from = Mailbox::new(Some(display_name.to_string()), address);

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(email.to.clone()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        debug!("SMTP accepted message for {}: {:?}", email.to, response.code());
        Ok(())
    }
}
