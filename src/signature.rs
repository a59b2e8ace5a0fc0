//! HMAC-SHA256 checks for everything the payment gateway signs.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook body against the hex signature the gateway sent with it.
///
/// `body` must be the exact bytes received; re-serialized JSON will not match.
pub fn verify_webhook_signature(
    secret: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), WebhookError> {
    let Some(secret) = secret else {
        warn!("Rejecting webhook: no webhook secret configured");
        return Err(WebhookError::MissingSecret);
    };
    let Some(signature) = signature else {
        warn!("Rejecting webhook: signature header missing");
        return Err(WebhookError::MissingSignature);
    };

    if verify_hex_hmac(secret.as_bytes(), body, signature) {
        Ok(())
    } else {
        warn!("Rejecting webhook: signature mismatch");
        Err(WebhookError::InvalidSignature)
    }
}

/// Verifies the signature the browser checkout receives after a successful payment.
/// The gateway signs `"{order_id}|{payment_id}"` with the API key secret.
pub fn verify_checkout_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    let message = format!("{gateway_order_id}|{gateway_payment_id}");
    verify_hex_hmac(key_secret.as_bytes(), message.as_bytes(), signature)
}

#[cfg(test)]
pub fn sign(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn verify_hex_hmac(secret: &[u8], message: &[u8], provided: &str) -> bool {
    let Ok(provided) = hex::decode(provided.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message);
    // verify_slice compares in constant time
    mac.verify_slice(&provided).is_ok()
}
