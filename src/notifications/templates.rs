//! Customer receipt and merchant alert bodies.

use super::currency::format_inr;
use crate::database::models::ShippingDetails;
use crate::event::PaymentConfirmation;
use crate::order_locator::LocatedOrder;

pub const PENDING_ITEMS_NOTE: &str =
    "Item details are still being processed and will appear in your order history shortly.";

/// Shown instead of a line total that cannot be computed.
pub const UNAVAILABLE_AMOUNT: &str = "n/a";

/// Whether the emails were built from the stored order or from the gateway event alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Enriched,
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
}

/// Everything both emails render, with amounts already formatted once.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationDetails {
    pub outcome: NotificationOutcome,
    pub order_ref: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    /// Storefront account of the buyer, from the order row or the gateway notes.
    pub customer_user_id: Option<String>,
    pub total: String,
    pub items: Vec<LineItem>,
    pub shipping: Option<ShippingDetails>,
}

impl ConfirmationDetails {
    pub fn enriched(located: &LocatedOrder) -> Self {
        let order = &located.order;
        Self {
            outcome: NotificationOutcome::Enriched,
            order_ref: order.id.to_string(),
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_payment_id: order.gateway_payment_id.clone(),
            customer_user_id: Some(order.user_id.clone()).filter(|id| !id.is_empty()),
            // The stored total is authoritative, never the sum of items.
            total: format_inr(order.total_amount),
            items: located
                .items
                .iter()
                .map(|item| LineItem {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: format_inr(item.unit_price),
                    line_total: item
                        .line_total()
                        .map(format_inr)
                        .unwrap_or_else(|| UNAVAILABLE_AMOUNT.to_string()),
                })
                .collect(),
            shipping: Some(order.shipping.clone()),
        }
    }

    pub fn degraded(event: &PaymentConfirmation) -> Self {
        Self {
            outcome: NotificationOutcome::Degraded,
            order_ref: event.gateway_order_id.clone(),
            gateway_order_id: event.gateway_order_id.clone(),
            gateway_payment_id: event.gateway_payment_id.clone(),
            customer_user_id: event.notes_user_id.clone(),
            total: format_inr(event.amount_minor),
            items: Vec::new(),
            shipping: None,
        }
    }
}

pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn customer_receipt(store_name: &str, details: &ConfirmationDetails) -> RenderedEmail {
    let greeting = details
        .shipping
        .as_ref()
        .map(|s| format!("Hi {},", s.full_name))
        .unwrap_or_else(|| "Hi,".to_string());

    let mut text = format!(
        "{greeting}\n\nThank you for shopping with {store_name}. Your payment was received.\n\n\
         Order: {}\n",
        details.order_ref
    );
    if let Some(payment_id) = &details.gateway_payment_id {
        text.push_str(&format!("Payment ID: {payment_id}\n"));
    }
    text.push('\n');
    text.push_str(&items_text(details));
    text.push_str(&format!("\nAuthorized Total: {}\n", details.total));
    if let Some(shipping) = &details.shipping {
        text.push_str(&format!("\nShipping to:\n{}\n", address_text(shipping)));
    }

    let mut html = format!(
        "<p>{}</p><p>Thank you for shopping with {}. Your payment was received.</p>\
         <p><strong>Order:</strong> {}</p>",
        escape(&greeting),
        escape(store_name),
        escape(&details.order_ref)
    );
    if let Some(payment_id) = &details.gateway_payment_id {
        html.push_str(&format!("<p><strong>Payment ID:</strong> {}</p>", escape(payment_id)));
    }
    html.push_str(&items_html(details));
    html.push_str(&format!(
        "<p><strong>Authorized Total:</strong> {}</p>",
        escape(&details.total)
    ));
    if let Some(shipping) = &details.shipping {
        html.push_str(&format!(
            "<p><strong>Shipping to:</strong><br>{}</p>",
            escape(&address_text(shipping)).replace('\n', "<br>")
        ));
    }

    RenderedEmail {
        subject: format!("{store_name}: order confirmed ({})", details.order_ref),
        text,
        html,
    }
}

pub fn merchant_alert(
    store_name: &str,
    customer_email: &str,
    details: &ConfirmationDetails,
) -> RenderedEmail {
    let mut text = format!(
        "New paid order on {store_name}.\n\nOrder: {}\nGateway order: {}\nCustomer: {customer_email}\n",
        details.order_ref, details.gateway_order_id
    );
    if let Some(user_id) = &details.customer_user_id {
        text.push_str(&format!("User: {user_id}\n"));
    }
    if let Some(payment_id) = &details.gateway_payment_id {
        text.push_str(&format!("Payment ID: {payment_id}\n"));
    }
    if details.outcome == NotificationOutcome::Degraded {
        text.push_str("Order record was not found; details come from the gateway event only.\n");
    }
    text.push('\n');
    text.push_str(&items_text(details));
    text.push_str(&format!("\nAuthorized Total: {}\n", details.total));
    if let Some(shipping) = &details.shipping {
        text.push_str(&format!(
            "\nShip to:\n{}\nPhone: {}\n",
            address_text(shipping),
            phones(shipping)
        ));
    }

    let mut html = format!(
        "<p>New paid order on {}.</p><p><strong>Order:</strong> {}<br>\
         <strong>Gateway order:</strong> {}<br><strong>Customer:</strong> {}</p>",
        escape(store_name),
        escape(&details.order_ref),
        escape(&details.gateway_order_id),
        escape(customer_email)
    );
    if let Some(user_id) = &details.customer_user_id {
        html.push_str(&format!("<p><strong>User:</strong> {}</p>", escape(user_id)));
    }
    if details.outcome == NotificationOutcome::Degraded {
        html.push_str(
            "<p><em>Order record was not found; details come from the gateway event only.</em></p>",
        );
    }
    html.push_str(&items_html(details));
    html.push_str(&format!(
        "<p><strong>Authorized Total:</strong> {}</p>",
        escape(&details.total)
    ));
    if let Some(shipping) = &details.shipping {
        html.push_str(&format!(
            "<p><strong>Ship to:</strong><br>{}<br>Phone: {}</p>",
            escape(&address_text(shipping)).replace('\n', "<br>"),
            escape(&phones(shipping))
        ));
    }

    RenderedEmail {
        subject: format!("[{store_name}] New order {} - {}", details.order_ref, details.total),
        text,
        html,
    }
}

fn items_text(details: &ConfirmationDetails) -> String {
    if details.items.is_empty() {
        return format!("{PENDING_ITEMS_NOTE}\n");
    }
    details
        .items
        .iter()
        .map(|item| {
            format!(
                "- {} x{} @ {} = {}\n",
                item.name, item.quantity, item.unit_price, item.line_total
            )
        })
        .collect()
}

fn items_html(details: &ConfirmationDetails) -> String {
    if details.items.is_empty() {
        return format!("<p>{}</p>", escape(PENDING_ITEMS_NOTE));
    }
    let rows: String = details
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&item.name),
                item.quantity,
                escape(&item.unit_price),
                escape(&item.line_total)
            )
        })
        .collect();
    format!(
        "<table><tr><th>Item</th><th>Qty</th><th>Price</th><th>Total</th></tr>{rows}</table>"
    )
}

fn address_text(shipping: &ShippingDetails) -> String {
    format!(
        "{}\n{}\n{} {}",
        shipping.full_name, shipping.address, shipping.city, shipping.postal_code
    )
}

fn phones(shipping: &ShippingDetails) -> String {
    match &shipping.alt_phone {
        Some(alt) => format!("{} / {alt}", shipping.phone),
        None => shipping.phone.clone(),
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::OrderItem;
    use crate::event::EventKind;
    use crate::testing::sample_order;
    use uuid::Uuid;

    fn located_with_two_items() -> LocatedOrder {
        let order = sample_order("order_abc", 130000);
        let items = vec![
            OrderItem::new(order.id, "p1".into(), "Tea".into(), 50000, 2, None),
            OrderItem::new(order.id, "p2".into(), "Mug".into(), 30000, 1, None),
        ];
        LocatedOrder { order, items }
    }

    fn degraded_event() -> PaymentConfirmation {
        PaymentConfirmation {
            kind: EventKind::PaymentCaptured,
            gateway_order_id: "order_abc".into(),
            gateway_payment_id: Some("pay_1".into()),
            amount_minor: 150000,
            entity_email: None,
            notes_email: Some("a@b.com".into()),
            notes_user_id: None,
        }
    }

    #[test]
    fn enriched_lines_and_total() {
        let details = ConfirmationDetails::enriched(&located_with_two_items());
        assert_eq!(details.outcome, NotificationOutcome::Enriched);
        assert_eq!(details.items[0].line_total, "₹1,000.00");
        assert_eq!(details.items[1].line_total, "₹300.00");
        assert_eq!(details.total, "₹1,300.00");
    }

    #[test]
    fn stored_total_is_used_verbatim() {
        let mut located = located_with_two_items();
        // e.g. a discount applied at checkout
        located.order.total_amount = 120000;
        let details = ConfirmationDetails::enriched(&located);
        let receipt = customer_receipt("Kirana", &details);
        assert!(receipt.text.contains("Authorized Total: ₹1,200.00"));
    }

    #[test]
    fn degraded_renders_placeholder_line() {
        let details = ConfirmationDetails::degraded(&degraded_event());
        assert_eq!(details.order_ref, "order_abc");
        assert_eq!(details.total, "₹1,500.00");

        let receipt = customer_receipt("Kirana", &details);
        assert!(receipt.text.contains(PENDING_ITEMS_NOTE));
        assert!(receipt.html.contains(PENDING_ITEMS_NOTE));
        assert!(!receipt.html.contains("<table>"));
    }

    #[test]
    fn both_emails_share_the_total_string() {
        let details = ConfirmationDetails::enriched(&located_with_two_items());
        let receipt = customer_receipt("Kirana", &details);
        let alert = merchant_alert("Kirana", "asha@example.com", &details);
        let line = format!("Authorized Total: {}", details.total);
        assert!(receipt.text.contains(&line));
        assert!(alert.text.contains(&line));
    }

    #[test]
    fn html_is_escaped() {
        let mut located = located_with_two_items();
        located.items[0].name = "<script>".into();
        located.order.id = Uuid::nil();
        let details = ConfirmationDetails::enriched(&located);
        let receipt = customer_receipt("Kirana", &details);
        assert!(receipt.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn oversized_line_total_renders_placeholder() {
        let order = sample_order("order_big", 100);
        let items = vec![OrderItem::new(
            order.id,
            "p1".into(),
            "Gold".into(),
            i64::MAX / 2 + 1,
            2,
            None,
        )];
        let details = ConfirmationDetails::enriched(&LocatedOrder { order, items });

        assert_eq!(details.items[0].line_total, UNAVAILABLE_AMOUNT);
        let receipt = customer_receipt("Kirana", &details);
        assert!(receipt.text.contains(&format!("= {UNAVAILABLE_AMOUNT}")));
    }

    #[test]
    fn degraded_alert_names_the_buyer_account() {
        let mut event = degraded_event();
        event.notes_user_id = Some("user_9".into());
        let details = ConfirmationDetails::degraded(&event);

        let alert = merchant_alert("Kirana", "a@b.com", &details);
        assert!(alert.text.contains("User: user_9"));
        assert!(alert.html.contains("<strong>User:</strong> user_9"));

        let receipt = customer_receipt("Kirana", &details);
        assert!(!receipt.text.contains("user_9"));
    }

    #[test]
    fn enriched_alert_uses_stored_user() {
        let located = located_with_two_items();
        let user_id = located.order.user_id.clone();
        let details = ConfirmationDetails::enriched(&located);
        let alert = merchant_alert("Kirana", "asha@example.com", &details);
        assert!(alert.text.contains(&format!("User: {user_id}")));
    }
}
