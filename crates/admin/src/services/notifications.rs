//! Customer SMS sent from the back office. Best effort.

use tracing::{info, instrument};

use strives_core::Phone;
use strives_db::orders::AdminOrderView;
use strives_integrations::messages::{self, ConfirmedLine};

use crate::state::AppState;

fn customer_phone(view: &AdminOrderView) -> Option<Phone> {
    view.customer.phone.clone().or_else(|| {
        view.order
            .order
            .shipping_address
            .as_ref()
            .map(|address| address.0.phone.clone())
    })
}

/// Tell the customer their order was confirmed, listing what they bought.
#[instrument(skip_all, fields(order_id = %view.order.order.id))]
pub async fn order_confirmed(state: &AppState, view: &AdminOrderView) {
    let Some(phone) = customer_phone(view) else {
        info!("no phone on file, confirmation SMS skipped");
        return;
    };

    let lines: Vec<ConfirmedLine<'_>> = view
        .order
        .items
        .iter()
        .map(|item| ConfirmedLine {
            name: &item.name,
            size: &item.size,
            quantity: item.quantity,
        })
        .collect();
    let message = messages::order_confirmed_user(&lines, view.order.order.total);

    if state
        .sms()
        .send_reporting(std::slice::from_ref(&phone), &message, "Order Confirmed")
        .await
        .is_ok()
    {
        info!("order confirmation sent");
    }
}
