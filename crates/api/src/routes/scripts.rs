//! Theme script injection handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{error::AppError, middleware::CurrentTenant, shopify::ScriptTag, state::AppState};

/// Response body of `POST /api/create-script`.
#[derive(Debug, Serialize)]
pub struct CreatedScriptResponse {
    pub script_tag: ScriptTag,
}

/// `GET /api/get-script`
///
/// Loads the shop's script tags and answers `true` once Shopify responds.
pub async fn show(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<bool>, AppError> {
    state.script_tags().list(&tenant).await?;
    Ok(Json(true))
}

/// `POST /api/create-script`
pub async fn create(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<CreatedScriptResponse>, AppError> {
    let script_tag = state.script_tags().install(&tenant).await?;
    Ok(Json(CreatedScriptResponse { script_tag }))
}
