//! In-memory fakes shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{NewOrder, Order, OrderItem, OrderStatus, ShippingDetails};
use crate::database::OrderStore;
use crate::error::{NotifyError, StoreError};
use crate::notifications::{Mailer, OutgoingEmail};
use crate::state::AppState;

struct StoredOrder {
    order: Order,
    items: Vec<OrderItem>,
    visible_from_lookup: usize,
}

#[derive(Default)]
struct StoreInner {
    orders: Vec<StoredOrder>,
    lookups: usize,
    fail_reads: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_order(&self, order: Order, items: Vec<OrderItem>) -> Order {
        self.add_order_visible_after(order, items, 1).await
    }

    /// The order only shows up from the `lookup`-th gateway id query onwards.
    pub async fn add_order_visible_after(
        &self,
        order: Order,
        items: Vec<OrderItem>,
        lookup: usize,
    ) -> Order {
        let items = items
            .into_iter()
            .map(|item| OrderItem {
                order_id: order.id,
                ..item
            })
            .collect();
        self.inner.lock().await.orders.push(StoredOrder {
            order: order.clone(),
            items,
            visible_from_lookup: lookup,
        });
        order
    }

    pub async fn lookups(&self) -> usize {
        self.inner.lock().await.lookups
    }

    pub async fn fail_reads(&self) {
        self.inner.lock().await.fail_reads = true;
    }

    pub async fn email_sent(&self, order_id: Uuid) -> Option<bool> {
        let inner = self.inner.lock().await;
        inner
            .orders
            .iter()
            .find(|s| s.order.id == order_id)
            .map(|s| s.order.email_sent)
    }

    pub async fn order_count(&self) -> usize {
        self.inner.lock().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_reads {
            return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
        }
        inner.lookups += 1;
        let lookup = inner.lookups;
        Ok(inner
            .orders
            .iter()
            .find(|s| s.order.gateway_order_id == gateway_order_id && s.visible_from_lookup <= lookup)
            .map(|s| s.order.clone()))
    }

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .find(|s| s.order.id == order_id)
            .map(|s| s.items.clone())
            .unwrap_or_default())
    }

    async fn claim_confirmation_email(&self, order_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.orders.iter_mut().find(|s| s.order.id == order_id) {
            Some(stored) if !stored.order.email_sent => {
                stored.order.email_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_confirmation_email(&self, order_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(stored) = inner.orders.iter_mut().find(|s| s.order.id == order_id) {
            stored.order.email_sent = false;
        }
        Ok(())
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        items: Vec<OrderItem>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .orders
            .iter()
            .any(|s| s.order.gateway_order_id == order.gateway_order_id)
        {
            return Ok(false);
        }
        inner.orders.push(StoredOrder {
            order: order.into(),
            items,
            visible_from_lookup: 1,
        });
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, address: &str) {
        self.failing.lock().await.push(address.to_string());
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        if self.failing.lock().await.contains(&email.to) {
            return Err(NotifyError::Transport(format!("connection refused for {}", email.to)));
        }
        self.sent.lock().await.push(email);
        Ok(())
    }
}

pub fn sample_shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Asha Rao".to_string(),
        phone: "9876543210".to_string(),
        alt_phone: None,
        address: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        postal_code: "560001".to_string(),
        email: "asha@example.com".to_string(),
    }
}

pub fn sample_order(gateway_order_id: &str, total_amount: i64) -> Order {
    Order {
        id: Uuid::new_v4(),
        user_id: "user_1".to_string(),
        created_at: Utc::now(),
        total_amount,
        status: OrderStatus::Pending,
        shipping: sample_shipping(),
        gateway_order_id: gateway_order_id.to_string(),
        gateway_payment_id: Some("pay_1".to_string()),
        payment_method: "Razorpay".to_string(),
        email_sent: false,
    }
}

pub fn sample_items(count: usize) -> Vec<OrderItem> {
    (0..count)
        .map(|i| {
            OrderItem::new(
                Uuid::nil(),
                format!("prod_{i}"),
                format!("Product {i}"),
                50000,
                1,
                None,
            )
        })
        .collect()
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://localhost/test".to_string()),
        "RAZORPAY_WEBHOOK_SECRET" => Some("whsec_test".to_string()),
        "RAZORPAY_KEY_ID" => Some("rzp_test_key".to_string()),
        "RAZORPAY_KEY_SECRET" => Some("rzp_test_secret".to_string()),
        "MERCHANT_EMAIL" => Some("merchant@example.com".to_string()),
        "STORE_NAME" => Some("Kirana".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn test_state(store: InMemoryOrderStore, mailer: Option<RecordingMailer>) -> AppState {
    AppState::new(
        test_config(),
        Arc::new(store),
        mailer.map(|m| Arc::new(m) as Arc<dyn Mailer>),
    )
}
