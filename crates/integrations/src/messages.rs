//! SMS message bodies.
//!
//! Registered (DLT) bodies must match their template text exactly, so the
//! wording here is fixed.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use strives_core::{OrderId, Size};

/// DLT template a message was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DltTemplate {
    Otp,
    OrderPlaced,
}

/// An SMS ready to hand to [`crate::sms::SmsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub body: String,
    pub template: Option<DltTemplate>,
}

impl SmsMessage {
    fn plain(body: String) -> Self {
        Self {
            body,
            template: None,
        }
    }
}

/// One ordered line as listed in the confirmation SMS.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmedLine<'a> {
    pub name: &'a str,
    pub size: &'a Size,
    pub quantity: i32,
}

#[must_use]
pub fn otp(code: &str) -> SmsMessage {
    SmsMessage {
        body: format!(
            "Your 'The Strives' verification OTP code is {code}. Code valid for 10 minutes only, one-time use. Please DO NOT share this OTP with anyone."
        ),
        template: Some(DltTemplate::Otp),
    }
}

/// Sent to the customer right after checkout.
#[must_use]
pub fn order_placed_user(order_id: OrderId, link_base: &str) -> SmsMessage {
    let link = format!("{}/{order_id}", link_base.trim_end_matches('/'));
    SmsMessage {
        body: format!(
            "Hey there! Your 'The Strives' order {order_id}, is getting ready and will be dispatched soon. Sit back & relax while we have this delivered to you. For more details, please click here {link}."
        ),
        template: Some(DltTemplate::OrderPlaced),
    }
}

/// Sent to the customer when an admin confirms the order.
#[must_use]
pub fn order_confirmed_user(lines: &[ConfirmedLine<'_>], total: Decimal) -> SmsMessage {
    let mut items = String::new();
    for (i, line) in lines.iter().enumerate() {
        let _ = writeln!(
            items,
            "{}. {} - {} - {} Nos.",
            i + 1,
            line.name,
            line.size.label(),
            line.quantity
        );
    }
    SmsMessage::plain(format!(
        "Placed: Order for\n {items}\n worth Rs. {total} is placed & will be delivered within 2 weeks.\nYou will be notified once your order is dispatched."
    ))
}

/// Sent to each admin phone when an order comes in.
#[must_use]
pub fn order_placed_admin(order_id: OrderId, total: Decimal, contact: &str) -> SmsMessage {
    SmsMessage::plain(format!(
        "ORDER PLACED\n Order ID: {order_id}\nValue: {total}\nContact: {contact}"
    ))
}

/// Sent to the maintainer when another SMS could not be delivered.
#[must_use]
pub fn error_notification(topic: &str, details: &str) -> SmsMessage {
    SmsMessage::plain(format!("SMS Sending Error\nTopic: {topic}\nDetails: {details}"))
}

/// Diagnostics message; reuses the OTP template so it passes DLT filtering.
#[must_use]
pub fn test_message() -> SmsMessage {
    otp(&crate::otp::generate_otp())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_body() {
        let msg = otp("482913");
        assert!(msg.body.starts_with("Your 'The Strives' verification OTP code is 482913."));
        assert_eq!(msg.template, Some(DltTemplate::Otp));
    }

    #[test]
    fn test_order_placed_link() {
        let msg = order_placed_user(OrderId::new(57), "www.thestrives.com/order/");
        assert!(msg.body.contains("order 57, is getting ready"));
        assert!(msg.body.ends_with("click here www.thestrives.com/order/57."));
        assert_eq!(msg.template, Some(DltTemplate::OrderPlaced));
    }

    #[test]
    fn test_order_confirmed_lists_lines() {
        let custom = Size::parse("c").unwrap();
        let medium = Size::parse("m").unwrap();
        let lines = [
            ConfirmedLine {
                name: "Linen Kurta",
                size: &custom,
                quantity: 1,
            },
            ConfirmedLine {
                name: "Silk Dupatta",
                size: &medium,
                quantity: 2,
            },
        ];
        let msg = order_confirmed_user(&lines, Decimal::new(349_900, 2));
        assert!(msg.body.contains("1. Linen Kurta - Custom - 1 Nos.\n"));
        assert!(msg.body.contains("2. Silk Dupatta - M - 2 Nos.\n"));
        assert!(msg.body.contains("worth Rs. 3499.00 is placed"));
        assert!(msg.template.is_none());
    }

    #[test]
    fn test_admin_and_error_bodies() {
        let msg = order_placed_admin(OrderId::new(9), Decimal::new(1200, 0), "+919876543210");
        assert_eq!(
            msg.body,
            "ORDER PLACED\n Order ID: 9\nValue: 1200\nContact: +919876543210"
        );
        let msg = error_notification("OTP", "throttled");
        assert_eq!(msg.body, "SMS Sending Error\nTopic: OTP\nDetails: throttled");
    }
}
