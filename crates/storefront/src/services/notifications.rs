//! Order notifications by SMS. Sends are best effort: failures are logged
//! (and reported to the maintainer) but never fail the request.

use tracing::{info, instrument};

use strives_core::Phone;
use strives_db::orders::OrderView;
use strives_db::users::User;
use strives_integrations::messages;

use crate::state::AppState;

/// Phone to reach the customer on: their account phone, else the one on
/// the shipping address.
fn customer_phone(user: &User, order: &OrderView) -> Option<Phone> {
    user.phone.clone().or_else(|| {
        order
            .order
            .shipping_address
            .as_ref()
            .map(|address| address.0.phone.clone())
    })
}

/// Tell the customer and the admins about a new order.
#[instrument(skip_all, fields(order_id = %order.order.id))]
pub async fn order_placed(state: &AppState, user: &User, order: &OrderView) {
    let sms = state.sms();
    let config = state.config();
    let phone = customer_phone(user, order);

    if let Some(phone) = &phone {
        let message = messages::order_placed_user(order.order.id, &config.order_link_base);
        let _ = sms
            .send_reporting(std::slice::from_ref(phone), &message, "Order Placed (user)")
            .await;
    }

    if !config.admin_phones.is_empty() {
        let contact = phone.as_ref().map_or_else(|| user.email.to_string(), ToString::to_string);
        let message = messages::order_placed_admin(order.order.id, order.order.total, &contact);
        let _ = sms
            .send_reporting(&config.admin_phones, &message, "Order Placed (admin)")
            .await;
    }

    info!("order notifications sent");
}
