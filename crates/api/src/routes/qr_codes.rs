//! QR code CRUD handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use shop_qr_core::{QrCodeId, QrCodePatch, QrCodePayload};

use crate::{error::AppError, middleware::CurrentTenant, services::ClientQrCode, state::AppState};

/// Parse an ID path segment. Anything that is not an ID cannot name a record.
pub(super) fn parse_id(raw: &str) -> Result<QrCodeId, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidBody(rejection.body_text()))
}

/// `POST /api/qrcodes`
pub async fn create(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    body: Result<Json<QrCodePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let payload = json_body(body)?;
    let created = state.qr_codes().create(&tenant, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /api/qrcodes/{id}`
pub async fn update(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<String>,
    body: Result<Json<QrCodePatch>, JsonRejection>,
) -> Result<Json<ClientQrCode>, AppError> {
    let id = parse_id(&id)?;
    let patch = json_body(body)?;
    Ok(Json(state.qr_codes().update(&tenant, id, patch).await?))
}

/// `GET /api/qrcodes`
pub async fn index(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
) -> Result<Json<Vec<ClientQrCode>>, AppError> {
    Ok(Json(state.qr_codes().list(&tenant).await?))
}

/// `GET /api/qrcodes/{id}`
pub async fn show(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<String>,
) -> Result<Json<ClientQrCode>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.qr_codes().get(&tenant, id).await?))
}

/// `DELETE /api/qrcodes/{id}`
pub async fn delete(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.qr_codes().delete(&tenant, id).await?;
    Ok(StatusCode::OK)
}
