// Defines database schema for diesel to use

pub mod sql_types {
    #[derive(diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "order_status"))]
    pub struct OrderStatus;
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::OrderStatus;

    orders (id) {
        id -> Uuid,
        user_id -> Text,
        created_at -> Timestamptz,
        total_amount -> Int8,
        status -> OrderStatus,
        shipping_full_name -> Text,
        shipping_phone -> Text,
        shipping_alt_phone -> Nullable<Text>,
        shipping_address -> Text,
        shipping_city -> Text,
        shipping_postal_code -> Text,
        shipping_email -> Text,
        gateway_order_id -> Text,
        gateway_payment_id -> Nullable<Text>,
        payment_method -> Text,
        email_sent -> Bool,
    }
}

diesel::table! {
    order_items (id) {
        id -> Uuid,
        order_id -> Uuid,
        product_id -> Text,
        name -> Text,
        unit_price -> Int8,
        quantity -> Int4,
        image_url -> Nullable<Text>,
    }
}

diesel::joinable!(order_items -> orders (order_id));
diesel::allow_tables_to_appear_in_same_query!(orders, order_items);
