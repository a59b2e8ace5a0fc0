use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::GatewayKeys;
use crate::database::models::{Order, OrderItem, ShippingDetails};
use crate::error::AppError;
use crate::signature::verify_checkout_signature;
use crate::state::AppState;

const GATEWAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Debug, Deserialize)]
pub struct GatewayOrderRequest {
    /// Minor currency units.
    pub amount: i64,
    pub receipt: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GatewayOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordOrderRequest {
    pub user_id: String,
    pub total_amount: i64,
    pub shipping: ShippingDetails,
    pub items: Vec<CheckoutItem>,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub payment_method: Option<String>,
}

fn gateway_keys(state: &AppState) -> Result<&GatewayKeys, AppError> {
    state
        .config
        .gateway_keys
        .as_ref()
        .ok_or(AppError::NotConfigured("payment gateway"))
}

/// POST /gateway_orders creates the gateway-side order the browser checkout pays against.
/// The purchaser's email and user id go into the notes so the webhook can find them.
#[tracing::instrument(skip(state))]
pub async fn create_gateway_order_handler(
    State(state): State<AppState>,
    Json(payload): Json<GatewayOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let keys = gateway_keys(&state)?;
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }

    let receipt = payload
        .receipt
        .unwrap_or_else(|| format!("rcpt_{}", chrono::Utc::now().timestamp_millis()));
    let body = json!({
        "amount": payload.amount,
        "currency": state.config.currency,
        "receipt": receipt,
        "notes": {
            "email": payload.email.unwrap_or_default(),
            "userId": payload.user_id.unwrap_or_default(),
        },
    });

    let response = state
        .http
        .post(GATEWAY_ORDERS_URL)
        .basic_auth(&keys.key_id, Some(&keys.key_secret))
        .json(&body)
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        error!("Gateway rejected order creation ({status}): {detail}");
        return Err(AppError::Gateway(format!("order creation failed with {status}")));
    }
    let order: GatewayOrderResponse = response.json().await?;
    info!("Created gateway order {} for receipt {receipt}", order.id);

    Ok(Json(json!({
        "id": order.id,
        "amount": order.amount,
        "currency": order.currency,
        "key_id": keys.key_id,
    })))
}

/// POST /orders records the order once the browser has seen the payment succeed.
#[tracing::instrument(skip_all)]
pub async fn record_order_handler(
    State(state): State<AppState>,
    Json(payload): Json<RecordOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let keys = gateway_keys(&state)?;
    if !verify_checkout_signature(
        &keys.key_secret,
        &payload.gateway_order_id,
        &payload.gateway_payment_id,
        &payload.gateway_signature,
    ) {
        warn!("Checkout signature mismatch for {}", payload.gateway_order_id);
        return Err(AppError::BadRequest("payment signature mismatch".to_string()));
    }
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("order has no items".to_string()));
    }
    if payload.total_amount <= 0 {
        return Err(AppError::BadRequest("total amount must be positive".to_string()));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("item quantity must be positive".to_string()));
        }
        if item.unit_price <= 0 {
            return Err(AppError::BadRequest("item price must be positive".to_string()));
        }
        if item.unit_price.checked_mul(i64::from(item.quantity)).is_none() {
            return Err(AppError::BadRequest(format!(
                "line total for {} is out of range",
                item.product_id
            )));
        }
    }

    let new_order = Order::new(
        payload.user_id,
        payload.total_amount,
        payload.shipping,
        payload.gateway_order_id,
        Some(payload.gateway_payment_id),
        payload.payment_method.unwrap_or_else(|| "Razorpay".to_string()),
    );
    let order_id = new_order.id;
    let gateway_order_id = new_order.gateway_order_id.clone();
    let items = payload
        .items
        .into_iter()
        .map(|item| {
            OrderItem::new(
                order_id,
                item.product_id,
                item.name,
                item.unit_price,
                item.quantity,
                item.image_url,
            )
        })
        .collect();

    if !state.orders.insert_order(new_order, items).await? {
        warn!("Order for {gateway_order_id} was already recorded");
        return Err(AppError::Conflict(format!(
            "order for {gateway_order_id} already exists"
        )));
    }
    info!("Recorded order {order_id} for {gateway_order_id}");

    Ok((StatusCode::CREATED, Json(json!({ "id": order_id }))))
}

/// GET /health endpoint returns a simple text message.
#[tracing::instrument]
pub async fn health_handler() -> impl IntoResponse {
    info!("Handling health request");
    "ok"
}

/// GET /gateway_key endpoint returns the public key id for the checkout widget.
#[tracing::instrument(skip(state))]
pub async fn gateway_key_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    info!("Handling gateway key request");
    let keys = gateway_keys(&state)?;
    Ok(Json(json!({ "key_id": keys.key_id })))
}
