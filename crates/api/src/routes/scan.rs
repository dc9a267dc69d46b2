//! Public scan endpoint encoded in printed QR codes.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::{error::AppError, state::AppState};

use super::qr_codes::parse_id;

/// `GET /qrcodes/{id}/scan`
///
/// Counts the scan and sends the customer to the storefront.
pub async fn scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id = parse_id(&id)?;
    let destination = state.qr_codes().scan(id).await?;
    Ok(Redirect::to(&destination))
}
