use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::NotifyError;
use crate::event::PaymentConfirmation;
use crate::order_locator::LocatedOrder;

pub mod currency;
pub mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;
pub use templates::{ConfirmationDetails, NotificationOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError>;
}

/// Picks the customer address: stored shipping email, then the gateway
/// entity's email, then the email the checkout put into the gateway notes.
pub fn resolve_recipient(
    located: Option<&LocatedOrder>,
    event: &PaymentConfirmation,
) -> Option<String> {
    located
        .map(|l| l.order.shipping.email.trim().to_string())
        .filter(|email| !email.is_empty())
        .or_else(|| event.entity_email.clone())
        .or_else(|| event.notes_email.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub customer: SendStatus,
    pub merchant: SendStatus,
}

impl DispatchReport {
    pub fn customer_notified(&self) -> bool {
        self.customer == SendStatus::Sent
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Option<Arc<dyn Mailer>>,
    merchant_email: Option<String>,
    store_name: String,
}

impl NotificationDispatcher {
    pub fn new(
        mailer: Option<Arc<dyn Mailer>>,
        merchant_email: Option<String>,
        store_name: String,
    ) -> Self {
        Self {
            mailer,
            merchant_email,
            store_name,
        }
    }

    /// Sends the customer receipt and the merchant alert concurrently. One
    /// failing does not stop the other; the call only fails when nothing
    /// could be sent at all.
    pub async fn dispatch(
        &self,
        recipient: &str,
        details: &ConfirmationDetails,
    ) -> Result<DispatchReport, NotifyError> {
        let Some(mailer) = &self.mailer else {
            return Err(NotifyError::NotConfigured);
        };

        let receipt = templates::customer_receipt(&self.store_name, details);
        let customer_email = OutgoingEmail {
            to: recipient.to_string(),
            subject: receipt.subject,
            text: receipt.text,
            html: receipt.html,
        };
        let merchant_email = self.merchant_email.as_ref().map(|to| {
            let alert = templates::merchant_alert(&self.store_name, recipient, details);
            OutgoingEmail {
                to: to.clone(),
                subject: alert.subject,
                text: alert.text,
                html: alert.html,
            }
        });

        let customer_send = mailer.send(customer_email);
        let merchant_send = async {
            match merchant_email {
                Some(email) => Some(mailer.send(email).await),
                None => None,
            }
        };
        let (customer_result, merchant_result) = futures::join!(customer_send, merchant_send);

        let customer = match customer_result {
            Ok(()) => {
                info!("Sent order confirmation for {} to customer", details.order_ref);
                SendStatus::Sent
            }
            Err(e) => {
                error!(
                    "Customer confirmation for {} to {recipient} failed: {e}",
                    details.order_ref
                );
                SendStatus::Failed
            }
        };
        let merchant = match merchant_result {
            Some(Ok(())) => {
                info!("Sent merchant alert for {}", details.order_ref);
                SendStatus::Sent
            }
            Some(Err(e)) => {
                warn!("Merchant alert for {} failed: {e}", details.order_ref);
                SendStatus::Failed
            }
            None => {
                warn!("No merchant address configured, skipping alert for {}", details.order_ref);
                SendStatus::Skipped
            }
        };

        let report = DispatchReport { customer, merchant };
        if customer == SendStatus::Failed && merchant != SendStatus::Sent {
            return Err(NotifyError::Transport(format!(
                "no confirmation email could be sent for {}",
                details.order_ref
            )));
        }
        Ok(report)
    }
}
