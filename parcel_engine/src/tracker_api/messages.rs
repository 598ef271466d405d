//! Texts sent to clients. Bold markers use the messaging platform's `*bold*` markdown.
use crate::db_types::{Order, OrderId};

pub const ORDER_NOT_FOUND: &str = "🙈 No such order was found. Check the number or try again later.";
pub const DEFAULT_REMINDER: &str = "Please pay for delivery. If you have already paid, you can ignore this message.";

/// Sent to subscribers when an order's status changes. `order` may be missing if it could not be read; the
/// notification still goes out with what is known.
pub fn status_update(order_id: &OrderId, order: Option<&Order>, status_text: &str) -> String {
    let mut text = format!("🔄 Update on order *{order_id}*");
    if let Some(order) = order {
        if !order.client_name.trim().is_empty() {
            text.push_str(&format!("\nClient: {}", order.client_name.trim()));
        }
        if let Some(country) = order.country.as_deref().filter(|c| !c.trim().is_empty()) {
            text.push_str(&format!("\nCountry: {country}"));
        }
    }
    text.push_str(&format!("\nNew status: *{status_text}*"));
    text
}

pub fn new_order(order_id: &OrderId, status_text: &str) -> String {
    format!("🆕 A new order *{order_id}* has been created. Current status: *{status_text}*")
}

pub fn unpaid_reminder(order_id: &OrderId, body: Option<&str>) -> String {
    let body = body.map(str::trim).filter(|b| !b.is_empty()).unwrap_or(DEFAULT_REMINDER);
    format!("💳 Payment reminder for order *{order_id}*\nStatus: *Delivery not paid*\n\n{body}")
}

pub fn client_status(order_id: &OrderId, status_text: &str, origin: Option<&str>) -> String {
    let mut text = format!("📦 Order *{order_id}*\nStatus: *{status_text}*");
    if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
        text.push_str(&format!("\nCountry/origin: {origin}"));
    }
    text
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    #[test]
    fn status_update_text() {
        let order = Order {
            id: 1,
            order_id: OrderId::from("CN-1"),
            client_name: "@alice_k".into(),
            phone: None,
            origin: None,
            status: "x".into(),
            note: None,
            country: Some("CN".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let text = status_update(&order.order_id, Some(&order), "🚚 Shipped to Kazakhstan");
        assert_eq!(
            text,
            "🔄 Update on order *CN-1*\nClient: @alice_k\nCountry: CN\nNew status: *🚚 Shipped to Kazakhstan*"
        );
        let bare = status_update(&order.order_id, None, "done");
        assert_eq!(bare, "🔄 Update on order *CN-1*\nNew status: *done*");
    }

    #[test]
    fn reminder_falls_back_to_default_body() {
        let text = unpaid_reminder(&OrderId::from("KR-2"), Some("   "));
        assert!(text.ends_with(DEFAULT_REMINDER));
        let custom = unpaid_reminder(&OrderId::from("KR-2"), Some("Pay by Friday"));
        assert!(custom.ends_with("Pay by Friday"));
    }
}
