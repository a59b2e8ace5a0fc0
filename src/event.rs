//! Gateway webhook envelope and its normalized form.

use serde::Deserialize;
use serde_json::Value;

use crate::error::WebhookError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PaymentCaptured,
    OrderPaid,
    Other(String),
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "payment.captured" => Self::PaymentCaptured,
            "order.paid" => Self::OrderPaid,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this event confirms a settled payment.
    pub fn is_confirmation(&self) -> bool {
        matches!(self, Self::PaymentCaptured | Self::OrderPaid)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentCaptured => "payment.captured",
            Self::OrderPaid => "order.paid",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    /// Kept raw so events that are ignored never have their entities parsed.
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvelopePayload {
    pub payment: Option<EntityWrapper<PaymentEntity>>,
    pub order: Option<EntityWrapper<OrderEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: Option<String>,
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Value,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    pub amount_paid: Option<i64>,
    #[serde(default)]
    pub notes: Value,
}

/// The two entity shapes the gateway may attach to a confirmation.
#[derive(Debug)]
pub enum GatewayEntity {
    Payment(PaymentEntity),
    Order(OrderEntity),
}

/// Canonical record every downstream step works from.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub kind: EventKind,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    /// Minor currency units as reported by the gateway.
    pub amount_minor: i64,
    pub entity_email: Option<String>,
    pub notes_email: Option<String>,
    pub notes_user_id: Option<String>,
}

impl WebhookEnvelope {
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }

    /// Parses the payload and picks the entity to reconcile against, preferring the payment shape.
    pub fn into_entity(self) -> Result<Option<GatewayEntity>, WebhookError> {
        let EnvelopePayload { payment, order } = if self.payload.is_null() {
            EnvelopePayload::default()
        } else {
            serde_json::from_value(self.payload)?
        };
        Ok(payment
            .map(|p| GatewayEntity::Payment(p.entity))
            .or_else(|| order.map(|o| GatewayEntity::Order(o.entity))))
    }

    pub fn normalize(self) -> Result<PaymentConfirmation, WebhookError> {
        let kind = self.kind();
        let entity = self.into_entity()?.ok_or_else(|| {
            WebhookError::InvalidPayload("payload carries neither payment nor order".into())
        })?;

        let (gateway_order_id, gateway_payment_id, amount_minor, entity_email, notes) =
            match entity {
                GatewayEntity::Payment(p) => (p.order_id, p.id, p.amount, p.email, p.notes),
                GatewayEntity::Order(o) => {
                    (o.id, None, o.amount_paid.unwrap_or(o.amount), None, o.notes)
                }
            };

        let gateway_order_id = gateway_order_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WebhookError::InvalidPayload("missing gateway order id".into()))?;

        Ok(PaymentConfirmation {
            kind,
            gateway_order_id,
            gateway_payment_id,
            amount_minor,
            entity_email: non_empty(entity_email),
            notes_email: note_str(&notes, "email"),
            notes_user_id: note_str(&notes, "userId").or_else(|| note_str(&notes, "user_id")),
        })
    }
}

// Notes arrive as an object, or as `[]` when none were set.
fn note_str(notes: &Value, key: &str) -> Option<String> {
    non_empty(notes.get(key)?.as_str().map(str::to_string))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
