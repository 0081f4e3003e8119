//! Checkout order creation.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use validator::Validate;

use crate::{
    dtos::{CreateOrderResponse, OrderRequest},
    error::OrderError,
    AppState,
};

/// Create a checkout order with the provider and return its redirect URL.
///
/// Validation happens before any outbound call. A body that is not valid JSON
/// for [`OrderRequest`] is treated like one with missing fields.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>, OrderError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(reason = %rejection.body_text(), "Rejected malformed order request");
        OrderError::InvalidRequest
    })?;

    request.validate().map_err(|e| {
        tracing::warn!(errors = %e, "Rejected invalid order request");
        OrderError::InvalidRequest
    })?;

    tracing::info!(
        amount = ?request.amount,
        description = ?request.description,
        has_return_url = request.return_url().is_some(),
        "Creating provider order"
    );

    let redirect_url = state.provider.create_checkout(&request).await?;

    Ok(Json(CreateOrderResponse { redirect_url }))
}
