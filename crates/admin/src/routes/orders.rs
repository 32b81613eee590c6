//! Order review and fulfilment status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::{Instrument, instrument};

use strives_core::{OrderId, OrderStatus};
use strives_db::orders::AdminOrderView;
use strives_db::{OrderRepository, RepositoryError};

use crate::error::{AppError, EntityResultExt, Result};
use crate::extract::JsonBody;
use crate::response::ApiResponse;
use crate::services::notifications;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

/// All orders, newest first, with the customer's contact details.
#[instrument(skip(state))]
pub async fn list_orders(State(state): State<AppState>) -> Result<ApiResponse<Vec<AdminOrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .list_all()
        .await
        .or_entity("Order", "Error fetching orders")?;
    Ok(ApiResponse::data(orders))
}

#[instrument(skip(state, req), fields(status = %req.status))]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    JsonBody(req): JsonBody<OrderStatusRequest>,
) -> Result<ApiResponse<AdminOrderView>> {
    let view = match OrderRepository::new(state.pool())
        .update_status(id, req.status)
        .await
    {
        Ok(view) => view,
        Err(RepositoryError::Conflict(reason)) => {
            return Err(AppError::Status {
                status: StatusCode::CONFLICT,
                message: "Order status can no longer be changed.".into(),
                source: Some(reason.into()),
            });
        }
        Err(e) => return Err(e).or_entity("Order", "Error updating order status"),
    };

    if req.status == OrderStatus::Confirmed {
        let notify_state = state.clone();
        let notify_view = view.clone();
        tokio::spawn(
            async move { notifications::order_confirmed(&notify_state, &notify_view).await }
                .in_current_span(),
        );
    }

    Ok(ApiResponse::data(view).with_message("Order Status Updated Successfully"))
}
