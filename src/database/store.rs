//! Order persistence seam used by the webhook and the checkout endpoints.

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tracing::debug;
use uuid::Uuid;

use super::models::{NewOrder, Order, OrderItem};
use super::schema::{order_items, orders};
use super::{get_conn, PgPool};
use crate::error::StoreError;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns the earliest order recorded for a gateway order id, if it is visible yet.
    async fn find_by_gateway_order_id(&self, gateway_order_id: &str)
        -> Result<Option<Order>, StoreError>;

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;

    /// Atomically flips `email_sent` from false to true. Returns false when
    /// another delivery already claimed it.
    async fn claim_confirmation_email(&self, order_id: Uuid) -> Result<bool, StoreError>;

    async fn release_confirmation_email(&self, order_id: Uuid) -> Result<(), StoreError>;

    /// Returns false if an order for the same gateway order id already exists.
    async fn insert_order(&self, order: NewOrder, items: Vec<OrderItem>)
        -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = get_conn(&pool)?;
            f(&mut *conn)
        })
        .await?
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let gateway_order_id = gateway_order_id.to_string();
        self.with_conn(move |conn| {
            let order = orders::table
                .filter(orders::gateway_order_id.eq(&gateway_order_id))
                .order(orders::created_at.asc())
                .select(Order::as_select())
                .first(conn)
                .optional()?;
            Ok(order)
        })
        .await
    }

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        self.with_conn(move |conn| {
            let items = order_items::table
                .filter(order_items::order_id.eq(order_id))
                .order(order_items::name.asc())
                .select(OrderItem::as_select())
                .load(conn)?;
            Ok(items)
        })
        .await
    }

    async fn claim_confirmation_email(&self, order_id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::email_sent.eq(false)),
            )
            .set(orders::email_sent.eq(true))
            .execute(conn)?;
            debug!("Claimed confirmation email for order {order_id}: {}", updated == 1);
            Ok(updated == 1)
        })
        .await
    }

    async fn release_confirmation_email(&self, order_id: Uuid) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            diesel::update(orders::table.filter(orders::id.eq(order_id)))
                .set(orders::email_sent.eq(false))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        items: Vec<OrderItem>,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            conn.transaction::<bool, StoreError, _>(|conn| {
                let inserted = diesel::insert_into(orders::table)
                    .values(&order)
                    .on_conflict(orders::gateway_order_id)
                    .do_nothing()
                    .execute(conn)?;
                if inserted == 0 {
                    return Ok(false);
                }
                diesel::insert_into(order_items::table)
                    .values(&items)
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
    }
}
