use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::schema::{order_items, orders};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, diesel_derive_enum::DbEnum)]
#[ExistingTypePath = "crate::database::schema::sql_types::OrderStatus"]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

/// Delivery contact captured at checkout, stored inline on the order row.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingDetails {
    #[diesel(column_name = shipping_full_name)]
    pub full_name: String,
    #[diesel(column_name = shipping_phone)]
    pub phone: String,
    #[diesel(column_name = shipping_alt_phone)]
    pub alt_phone: Option<String>,
    #[diesel(column_name = shipping_address)]
    pub address: String,
    #[diesel(column_name = shipping_city)]
    pub city: String,
    #[diesel(column_name = shipping_postal_code)]
    pub postal_code: String,
    #[diesel(column_name = shipping_email)]
    pub email: String,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Minor currency units.
    pub total_amount: i64,
    pub status: OrderStatus,
    #[diesel(embed)]
    pub shipping: ShippingDetails,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub payment_method: String,
    pub email_sent: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub total_amount: i64,
    pub status: OrderStatus,
    #[diesel(embed)]
    pub shipping: ShippingDetails,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub payment_method: String,
    pub email_sent: bool,
}

impl Order {
    pub fn new(
        user_id: String,
        total_amount: i64,
        shipping: ShippingDetails,
        gateway_order_id: String,
        gateway_payment_id: Option<String>,
        payment_method: String,
    ) -> NewOrder {
        NewOrder {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            total_amount,
            status: OrderStatus::Pending,
            shipping,
            gateway_order_id,
            gateway_payment_id,
            payment_method,
            email_sent: false,
        }
    }
}

impl From<NewOrder> for Order {
    fn from(new: NewOrder) -> Self {
        Order {
            id: new.id,
            user_id: new.user_id,
            created_at: new.created_at,
            total_amount: new.total_amount,
            status: new.status,
            shipping: new.shipping,
            gateway_order_id: new.gateway_order_id,
            gateway_payment_id: new.gateway_payment_id,
            payment_method: new.payment_method,
            email_sent: new.email_sent,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub name: String,
    /// Minor currency units.
    pub unit_price: i64,
    pub quantity: i32,
    pub image_url: Option<String>,
}

impl OrderItem {
    pub fn new(
        order_id: Uuid,
        product_id: String,
        name: String,
        unit_price: i64,
        quantity: i32,
        image_url: Option<String>,
    ) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            name,
            unit_price,
            quantity,
            image_url,
        }
    }

    /// `None` when the product does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}
