use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::json;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::error::WebhookError;
use crate::event::{PaymentConfirmation, WebhookEnvelope};
use crate::notifications::{resolve_recipient, ConfirmationDetails, DispatchReport, NotificationOutcome};
use crate::order_locator::{locate_order, Lookup};
use crate::signature::verify_webhook_signature;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Extracts a gateway webhook whose signature has been checked against the raw body.
pub struct VerifiedEvent(pub WebhookEnvelope);

impl FromRequest<AppState> for VerifiedEvent {
    type Rejection = Response;

    #[tracing::instrument(name = "verify_webhook", skip_all)]
    async fn from_request(req: Request<Body>, state: &AppState) -> Result<Self, Self::Rejection> {
        trace!("Received webhook event");

        let signature = match req.headers().get(SIGNATURE_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|e| {
                        error!("Signature header is not valid text: {e}");
                        WebhookError::InvalidSignature.into_response()
                    })?
                    .to_string(),
            ),
            None => None,
        };

        let payload = Bytes::from_request(req, state).await.map_err(|e| {
            error!("Encountered error {e:?} when reading webhook body");
            WebhookError::Internal(e.body_text()).into_response()
        })?;
        trace!("Payload: {}", String::from_utf8_lossy(&payload));

        verify_webhook_signature(
            state.config.webhook_secret.as_deref(),
            signature.as_deref(),
            &payload,
        )
        .map_err(IntoResponse::into_response)?;
        debug!("Webhook signature verified");

        let envelope = WebhookEnvelope::from_slice(&payload).map_err(|e| {
            error!("Verified webhook body could not be parsed: {e}");
            e.into_response()
        })?;
        Ok(Self(envelope))
    }
}

/// How a delivery ended. Every variant is acknowledged with 200.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Ignored,
    Duplicate,
    NoRecipient,
    Notified {
        outcome: NotificationOutcome,
        report: DispatchReport,
    },
    DispatchFailed {
        outcome: NotificationOutcome,
    },
}

impl WebhookOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Duplicate => "duplicate",
            Self::NoRecipient => "no_recipient",
            Self::Notified { .. } => "processed",
            Self::DispatchFailed { .. } => "notification_failed",
        }
    }
}

/// Webhook handler for gateway payment confirmations.
#[tracing::instrument(skip_all)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    VerifiedEvent(envelope): VerifiedEvent,
) -> Response {
    match process_confirmation(&state, envelope).await {
        Ok(outcome) => {
            info!("Webhook handled: {outcome:?}");
            let body = json!({
                "status": outcome.status(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!("Webhook processing failed: {e:?}");
            e.into_response()
        }
    }
}

/// Reconciles a verified event with the stored order and sends the confirmation emails.
pub async fn process_confirmation(
    state: &AppState,
    envelope: WebhookEnvelope,
) -> Result<WebhookOutcome, WebhookError> {
    let kind = envelope.kind();
    if !kind.is_confirmation() {
        info!("Ignoring webhook event {}", kind.as_str());
        return Ok(WebhookOutcome::Ignored);
    }

    let event = envelope.normalize()?;
    info!(
        "Payment confirmed for gateway order {} ({})",
        event.gateway_order_id,
        kind.as_str()
    );

    let lookup = match locate_order(
        state.orders.as_ref(),
        &event.gateway_order_id,
        state.locator_policy,
    )
    .await
    {
        Ok(lookup) => lookup,
        Err(e) => {
            error!("Order lookup failed, continuing with gateway data only: {e}");
            Lookup::NotFound { attempts: e.attempt }
        }
    };
    let located = match &lookup {
        Lookup::Found(located) => Some(located),
        Lookup::NotFound { .. } => None,
    };

    let Some(recipient) = resolve_recipient(located, &event) else {
        error!(
            "No email address for gateway order {}, skipping confirmation",
            event.gateway_order_id
        );
        return Ok(WebhookOutcome::NoRecipient);
    };

    let details = match located {
        Some(located) => ConfirmationDetails::enriched(located),
        None => {
            warn!(
                "Sending degraded confirmation for gateway order {}",
                event.gateway_order_id
            );
            ConfirmationDetails::degraded(&event)
        }
    };

    let mut claimed = None;
    if let Some(located) = located {
        match state.orders.claim_confirmation_email(located.order.id).await {
            Ok(true) => claimed = Some(located.order.id),
            Ok(false) => {
                info!(
                    "Confirmation for order {} was already sent, skipping",
                    located.order.id
                );
                return Ok(WebhookOutcome::Duplicate);
            }
            Err(e) => warn!(
                "Could not mark order {} as notified, sending anyway: {e}",
                located.order.id
            ),
        }
    }

    dispatch(state, &event, &recipient, &details, claimed).await
}

async fn dispatch(
    state: &AppState,
    event: &PaymentConfirmation,
    recipient: &str,
    details: &ConfirmationDetails,
    claimed: Option<Uuid>,
) -> Result<WebhookOutcome, WebhookError> {
    let outcome = details.outcome;
    match state.notifier.dispatch(recipient, details).await {
        Ok(report) => {
            if !report.customer_notified() {
                release_claim(state, claimed).await;
            }
            Ok(WebhookOutcome::Notified { outcome, report })
        }
        Err(e) => {
            error!(
                "Confirmation emails for gateway order {} failed: {e}",
                event.gateway_order_id
            );
            release_claim(state, claimed).await;
            Ok(WebhookOutcome::DispatchFailed { outcome })
        }
    }
}

// Lets a gateway retry deliver the receipt that was not sent this time.
async fn release_claim(state: &AppState, claimed: Option<Uuid>) {
    let Some(order_id) = claimed else {
        return;
    };
    if let Err(e) = state.orders.release_confirmation_email(order_id).await {
        error!("Failed to reset email flag for order {order_id}: {e}");
    }
}
