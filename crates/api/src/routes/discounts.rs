//! Discount listing for the QR code form.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::{
    error::AppError,
    middleware::CurrentTenant,
    services::DISCOUNT_LIMIT,
    shopify::DiscountSummary,
    state::AppState,
};

/// Response body of `GET /api/discounts`.
#[derive(Debug, Serialize)]
pub struct DiscountsResponse {
    pub discounts: Vec<DiscountSummary>,
}

/// `GET /api/discounts`
#[instrument(skip(state, tenant), fields(shop = %tenant.shop))]
pub async fn index(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<DiscountsResponse>, AppError> {
    let discounts = state.gateway().list_discounts(&tenant, DISCOUNT_LIMIT).await?;
    Ok(Json(DiscountsResponse { discounts }))
}
